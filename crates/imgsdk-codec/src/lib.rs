#![deny(missing_debug_implementations)]

//! PNG/JPEG codec for imgsdk, dispatched on the file extension.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use imgsdk_core::{Bitmap, CodecError, ImageCodec, ImageKind, PixelFormat};

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// The codec every environment starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardCodec {
    jpeg_quality: u8,
}

impl Default for StandardCodec {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StandardCodec {
    /// `quality` is clamped to 1..=100.
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

fn image_format(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Png => ImageFormat::Png,
        ImageKind::Jpeg => ImageFormat::Jpeg,
    }
}

fn to_bitmap(img: DynamicImage) -> Result<Bitmap, String> {
    let (w, h) = (img.width(), img.height());
    let (format, bytes) = match img {
        DynamicImage::ImageLuma8(buf) => (PixelFormat::Gray, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb24, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba32, buf.into_raw()),
        other => (PixelFormat::Rgba32, other.to_rgba8().into_raw()),
    };
    Bitmap::new(format, w, h, bytes).map_err(|e| e.to_string())
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    out
}

impl ImageCodec for StandardCodec {
    fn decode(&self, path: &Path) -> Result<Bitmap, CodecError> {
        let kind = ImageKind::from_path(path)?;
        let t0 = Instant::now();
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CodecError::FileNotFound(path.to_path_buf())
            } else {
                CodecError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let img = image::load_from_memory_with_format(&bytes, image_format(kind)).map_err(|e| {
            CodecError::Decode {
                path: path.to_path_buf(),
                msg: e.to_string(),
            }
        })?;
        let bitmap = to_bitmap(img).map_err(|msg| CodecError::Decode {
            path: path.to_path_buf(),
            msg,
        })?;
        tracing::debug!(
            path = %path.display(),
            width = bitmap.width(),
            height = bitmap.height(),
            format = ?bitmap.format(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "decoded image"
        );
        Ok(bitmap)
    }

    fn encode(&self, path: &Path, bitmap: &Bitmap) -> Result<(), CodecError> {
        let kind = ImageKind::from_path(path)?;
        let t0 = Instant::now();

        let expanded;
        let bitmap = if bitmap.format() == PixelFormat::Rgb16 {
            expanded = bitmap.clone().expand_rgb16();
            &expanded
        } else {
            bitmap
        };
        let (w, h) = (bitmap.width(), bitmap.height());
        let encode_err = |msg: String| CodecError::Encode {
            path: path.to_path_buf(),
            msg,
        };

        match kind {
            ImageKind::Png => {
                let color = match bitmap.format() {
                    PixelFormat::Gray => ExtendedColorType::L8,
                    PixelFormat::Rgb24 => ExtendedColorType::Rgb8,
                    PixelFormat::Rgba32 => ExtendedColorType::Rgba8,
                    PixelFormat::Rgb16 => {
                        return Err(CodecError::InvalidBitmap("unexpanded rgb565".to_string()))
                    }
                };
                image::save_buffer_with_format(path, bitmap.bytes(), w, h, color, ImageFormat::Png)
                    .map_err(|e| encode_err(e.to_string()))?;
            }
            ImageKind::Jpeg => {
                let rgb;
                let (data, color) = match bitmap.format() {
                    PixelFormat::Gray => (bitmap.bytes(), ExtendedColorType::L8),
                    PixelFormat::Rgb24 => (bitmap.bytes(), ExtendedColorType::Rgb8),
                    PixelFormat::Rgba32 => {
                        rgb = drop_alpha(bitmap.bytes());
                        (rgb.as_slice(), ExtendedColorType::Rgb8)
                    }
                    PixelFormat::Rgb16 => {
                        return Err(CodecError::InvalidBitmap("unexpanded rgb565".to_string()))
                    }
                };
                let file = File::create(path).map_err(|source| CodecError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                JpegEncoder::new_with_quality(BufWriter::new(file), self.jpeg_quality)
                    .write_image(data, w, h, color)
                    .map_err(|e| encode_err(e.to_string()))?;
            }
        }

        tracing::debug!(
            path = %path.display(),
            width = w,
            height = h,
            ?kind,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "encoded image"
        );
        Ok(())
    }
}
