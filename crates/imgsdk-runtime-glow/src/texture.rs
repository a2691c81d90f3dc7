use std::rc::Rc;

use imgsdk_core::{Bitmap, SdkError};

use crate::gpu::{framebuffer_status_name, FramebufferId, Gpu, PixelLayout, TextureId};

/// A 2D texture with linear filtering and edge clamping. Deleted on drop.
#[derive(Debug)]
pub struct Texture<G: Gpu> {
    gpu: Rc<G>,
    id: TextureId,
    width: i32,
    height: i32,
}

impl<G: Gpu> Texture<G> {
    pub fn new(gpu: &Rc<G>) -> Result<Self, SdkError> {
        let id = gpu
            .create_texture()
            .map_err(|e| SdkError::GlCreate(format!("create_texture failed: {e}")))?;
        gpu.bind_texture(Some(id));
        gpu.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gpu.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gpu.tex_parameter_i32(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gpu.tex_parameter_i32(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gpu.bind_texture(None);
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            width: 0,
            height: 0,
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Uploads `bitmap` as level 0, replacing any previous storage.
    pub fn upload(&mut self, bitmap: &Bitmap) -> Result<(), SdkError> {
        let w = i32::try_from(bitmap.width())
            .map_err(|_| SdkError::invalid_argument("bitmap width exceeds i32"))?;
        let h = i32::try_from(bitmap.height())
            .map_err(|_| SdkError::invalid_argument("bitmap height exceeds i32"))?;
        let layout = PixelLayout::for_format(bitmap.format());
        self.gpu.bind_texture(Some(self.id));
        self.gpu.pixel_store_unpack_alignment(1);
        self.gpu.tex_image_2d(w, h, layout, Some(bitmap.bytes()));
        self.gpu.bind_texture(None);
        self.width = w;
        self.height = h;
        tracing::debug!(
            texture = self.id.get(),
            width = w,
            height = h,
            format = ?bitmap.format(),
            "texture uploaded"
        );
        Ok(())
    }

    /// Allocates empty RGBA storage (render destination).
    pub fn allocate(&mut self, width: i32, height: i32) {
        let (w, h) = (width.max(1), height.max(1));
        self.gpu.bind_texture(Some(self.id));
        self.gpu.tex_image_2d(w, h, PixelLayout::RGBA, None);
        self.gpu.bind_texture(None);
        self.width = w;
        self.height = h;
    }
}

impl<G: Gpu> Drop for Texture<G> {
    fn drop(&mut self) {
        self.gpu.delete_texture(self.id);
    }
}

/// Off-screen render target: framebuffer + destination texture on COLOR_ATTACHMENT0.
#[derive(Debug)]
pub struct RenderTarget<G: Gpu> {
    gpu: Rc<G>,
    fbo: FramebufferId,
    texture: Texture<G>,
}

impl<G: Gpu> RenderTarget<G> {
    pub fn new(gpu: &Rc<G>, width: i32, height: i32) -> Result<Self, SdkError> {
        let fbo = gpu
            .create_framebuffer()
            .map_err(|e| SdkError::GlCreate(format!("create_framebuffer failed: {e}")))?;
        let texture = match Texture::new(gpu) {
            Ok(t) => t,
            Err(e) => {
                gpu.delete_framebuffer(fbo);
                return Err(e);
            }
        };
        let mut target = Self {
            gpu: Rc::clone(gpu),
            fbo,
            texture,
        };
        target.texture.allocate(width, height);

        gpu.bind_framebuffer(Some(fbo));
        gpu.framebuffer_texture_2d(Some(target.texture.id()));
        let status = target.check_bound();
        gpu.bind_framebuffer(None);
        status?;

        tracing::debug!(
            fbo = fbo.get(),
            texture = target.texture.id().get(),
            width = target.width(),
            height = target.height(),
            "render target created"
        );
        Ok(target)
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.fbo
    }

    pub fn texture(&self) -> TextureId {
        self.texture.id()
    }

    pub fn width(&self) -> i32 {
        self.texture.size().0
    }

    pub fn height(&self) -> i32 {
        self.texture.size().1
    }

    /// Reallocates the destination texture and re-checks completeness.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), SdkError> {
        if self.texture.size() == (width.max(1), height.max(1)) {
            return Ok(());
        }
        self.texture.allocate(width, height);
        self.gpu.bind_framebuffer(Some(self.fbo));
        self.gpu.framebuffer_texture_2d(Some(self.texture.id()));
        let status = self.check_bound();
        self.gpu.bind_framebuffer(None);
        status
    }

    /// Binds the framebuffer and verifies it is complete. Leaves it bound on success.
    pub fn bind(&self) -> Result<(), SdkError> {
        self.gpu.bind_framebuffer(Some(self.fbo));
        let status = self.check_bound();
        if status.is_err() {
            self.gpu.bind_framebuffer(None);
        }
        status
    }

    pub fn unbind(&self) {
        self.gpu.bind_framebuffer(None);
    }

    fn check_bound(&self) -> Result<(), SdkError> {
        let status = self.gpu.check_framebuffer_status();
        if status != glow::FRAMEBUFFER_COMPLETE {
            tracing::error!(
                status = %format!("0x{status:04x}"),
                name = framebuffer_status_name(status),
                "framebuffer incomplete"
            );
            return Err(SdkError::FramebufferIncomplete(status));
        }
        Ok(())
    }
}

impl<G: Gpu> Drop for RenderTarget<G> {
    fn drop(&mut self) {
        self.gpu.delete_framebuffer(self.fbo);
    }
}
