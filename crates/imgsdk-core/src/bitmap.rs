use std::fmt;

use crate::SdkError;

/// Pixel layout of a host-side bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luminance.
    Gray,
    /// Packed RGB 5-6-5, native-endian `u16` per pixel.
    Rgb16,
    Rgb24,
    Rgba32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb16 => 2,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// Decoded image in host memory.
///
/// Rows are tightly packed, row 0 first. The buffer is owned: whoever holds the `Bitmap`
/// owns the pixels, and handing it over is a move.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    format: PixelFormat,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Bitmap {
    /// Wraps `bytes`, checking it holds exactly `width * height` pixels of `format`.
    pub fn new(format: PixelFormat, width: u32, height: u32, bytes: Vec<u8>) -> Result<Self, SdkError> {
        let expected = Self::byte_len(format, width, height)?;
        if bytes.len() != expected {
            return Err(SdkError::invalid_argument(format!(
                "bitmap {width}x{height} {format:?} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            format,
            width,
            height,
            bytes,
        })
    }

    /// A zero-filled bitmap, used as a readback destination.
    pub fn zeroed(format: PixelFormat, width: u32, height: u32) -> Result<Self, SdkError> {
        let len = Self::byte_len(format, width, height)?;
        Ok(Self {
            format,
            width,
            height,
            bytes: vec![0; len],
        })
    }

    fn byte_len(format: PixelFormat, width: u32, height: u32) -> Result<usize, SdkError> {
        if width == 0 || height == 0 {
            return Err(SdkError::invalid_argument(format!(
                "bitmap dimensions must be non-zero (got {width}x{height})"
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| SdkError::invalid_argument("bitmap size overflows usize"))
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.stride();
        let start = y as usize * stride;
        self.bytes.get(start..start + stride)
    }

    /// Expands packed 5-6-5 pixels to 8-bit RGB. Other formats are returned unchanged.
    pub fn expand_rgb16(self) -> Bitmap {
        if self.format != PixelFormat::Rgb16 {
            return self;
        }
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.bytes.chunks_exact(2) {
            let v = u16::from_ne_bytes([px[0], px[1]]);
            let r = ((v >> 11) & 0x1f) as u8;
            let g = ((v >> 5) & 0x3f) as u8;
            let b = (v & 0x1f) as u8;
            out.push((r << 3) | (r >> 2));
            out.push((g << 2) | (g >> 4));
            out.push((b << 3) | (b >> 2));
        }
        Bitmap {
            format: PixelFormat::Rgb24,
            width: self.width,
            height: self.height,
            bytes: out,
        }
    }
}
