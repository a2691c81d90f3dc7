//! The GL surface the runtime draws through.
//!
//! [`Gpu`] is a safe, object-safe slice of GLES 2.0: exactly the calls the shader manager,
//! textures, render target, quad and readback need. Every method assumes the context that
//! produced the implementation is current on the calling thread; the environment guarantees
//! this by tearing GL objects down before it releases the context.

use std::fmt;
use std::num::NonZeroU32;

use imgsdk_core::{PixelFormat, ShaderStage};

macro_rules! gl_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gl_id!(ShaderId);
gl_id!(ProgramId);
gl_id!(TextureId);
gl_id!(FramebufferId);
gl_id!(
    /// Vertex buffer object.
    BufferId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// `(internal_format, format, type)` triple for `glTexImage2D` on GLES 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    pub internal_format: i32,
    pub format: u32,
    pub ty: u32,
}

impl PixelLayout {
    pub const LUMINANCE: PixelLayout = PixelLayout {
        internal_format: glow::LUMINANCE as i32,
        format: glow::LUMINANCE,
        ty: glow::UNSIGNED_BYTE,
    };
    pub const RGB565: PixelLayout = PixelLayout {
        internal_format: glow::RGB as i32,
        format: glow::RGB,
        ty: glow::UNSIGNED_SHORT_5_6_5,
    };
    pub const RGB: PixelLayout = PixelLayout {
        internal_format: glow::RGB as i32,
        format: glow::RGB,
        ty: glow::UNSIGNED_BYTE,
    };
    pub const RGBA: PixelLayout = PixelLayout {
        internal_format: glow::RGBA as i32,
        format: glow::RGBA,
        ty: glow::UNSIGNED_BYTE,
    };

    pub fn for_format(format: PixelFormat) -> PixelLayout {
        match format {
            PixelFormat::Gray => PixelLayout::LUMINANCE,
            PixelFormat::Rgb16 => PixelLayout::RGB565,
            PixelFormat::Rgb24 => PixelLayout::RGB,
            PixelFormat::Rgba32 => PixelLayout::RGBA,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match (self.format, self.ty) {
            (_, glow::UNSIGNED_SHORT_5_6_5) => 2,
            (glow::LUMINANCE, _) => 1,
            (glow::RGB, _) => 3,
            _ => 4,
        }
    }
}

/// Strings reported by the driver, logged once per init.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuInfo {
    pub version: String,
    pub renderer: String,
    pub vendor: String,
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.version, self.renderer, self.vendor)
    }
}

pub trait Gpu: fmt::Debug {
    fn info(&self) -> GpuInfo;

    // ---- shaders ----
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, String>;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    // ---- programs ----
    fn create_program(&self) -> Result<ProgramId, String>;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn validate_program(&self, program: ProgramId);
    fn program_validate_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_1_i32(&self, location: UniformLocation, value: i32);
    fn uniform_4_f32(&self, location: UniformLocation, value: [f32; 4]);

    // ---- textures (TEXTURE_2D) ----
    fn create_texture(&self) -> Result<TextureId, String>;
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<TextureId>);
    fn tex_parameter_i32(&self, parameter: u32, value: i32);
    fn pixel_store_unpack_alignment(&self, alignment: i32);
    /// Specifies level 0 of the bound texture. `pixels = None` allocates without upload.
    fn tex_image_2d(&self, width: i32, height: i32, layout: PixelLayout, pixels: Option<&[u8]>);
    fn delete_texture(&self, texture: TextureId);

    // ---- framebuffers (FRAMEBUFFER, COLOR_ATTACHMENT0) ----
    fn create_framebuffer(&self) -> Result<FramebufferId, String>;
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);
    fn framebuffer_texture_2d(&self, texture: Option<TextureId>);
    fn check_framebuffer_status(&self) -> u32;
    fn delete_framebuffer(&self, framebuffer: FramebufferId);

    // ---- vertex buffers (ARRAY_BUFFER) ----
    fn create_buffer(&self) -> Result<BufferId, String>;
    fn bind_array_buffer(&self, buffer: Option<BufferId>);
    fn buffer_data_static(&self, data: &[u8]);
    fn delete_buffer(&self, buffer: BufferId);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);

    // ---- frame ----
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, rgba: [f32; 4]);
    /// Clears the color buffer.
    fn clear(&self);
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    /// Blocks until every submitted command has completed.
    fn finish(&self);
    /// Reads RGBA8 pixels from the bound read framebuffer into `dst`.
    fn read_pixels_rgba(&self, x: i32, y: i32, width: i32, height: i32, dst: &mut [u8]);
    fn get_error(&self) -> u32;
}

pub fn framebuffer_status_name(status: u32) -> &'static str {
    match status {
        glow::FRAMEBUFFER_COMPLETE => "FRAMEBUFFER_COMPLETE",
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
        }
        glow::FRAMEBUFFER_UNSUPPORTED => "FRAMEBUFFER_UNSUPPORTED",
        _ => "FRAMEBUFFER_STATUS_UNKNOWN",
    }
}

pub fn gl_error_name(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "NO_ERROR",
        glow::INVALID_ENUM => "INVALID_ENUM",
        glow::INVALID_VALUE => "INVALID_VALUE",
        glow::INVALID_OPERATION => "INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        _ => "UNKNOWN_ERROR",
    }
}
