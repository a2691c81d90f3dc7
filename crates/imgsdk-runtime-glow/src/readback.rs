use imgsdk_core::{Bitmap, PixelFormat, SdkError};

use crate::gpu::{gl_error_name, Gpu};
use crate::texture::RenderTarget;

/// Reads the render target back into an RGBA32 bitmap.
///
/// This stalls the pipeline; call it once per rendered image.
pub fn read_rgba<G: Gpu>(gpu: &G, target: &RenderTarget<G>) -> Result<Bitmap, SdkError> {
    let (w, h) = (target.width(), target.height());
    let mut bitmap = Bitmap::zeroed(PixelFormat::Rgba32, w as u32, h as u32)?;

    target.bind()?;
    gpu.read_pixels_rgba(0, 0, w, h, bitmap.bytes_mut());
    let err = gpu.get_error();
    target.unbind();

    if err != glow::NO_ERROR {
        tracing::warn!(
            code = err,
            name = gl_error_name(err),
            "gl error after read_pixels"
        );
    }
    tracing::debug!(width = w, height = h, "pixels read back");
    Ok(bitmap)
}
