//! Codec collaborator contract.
//!
//! The SDK environment never decodes or encodes by itself; it goes through an
//! [`ImageCodec`] so hosts (and tests) can swap the implementation.

use std::path::{Path, PathBuf};

use crate::Bitmap;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode {}: {msg}", path.display())]
    Decode { path: PathBuf, msg: String },

    #[error("failed to encode {}: {msg}", path.display())]
    Encode { path: PathBuf, msg: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid bitmap: {0}")]
    InvalidBitmap(String),
}

/// Container formats the standard codec dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Resolves the kind from the lower-cased file extension.
    pub fn from_path(path: &Path) -> Result<Self, CodecError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(ImageKind::Png),
            "jpg" | "jpeg" => Ok(ImageKind::Jpeg),
            "" => Err(CodecError::UnsupportedFormat("<none>".to_string())),
            _ => Err(CodecError::UnsupportedFormat(ext)),
        }
    }
}

/// Decode a file into a [`Bitmap`] / encode a [`Bitmap`] into a file.
pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<Bitmap, CodecError>;
    fn encode(&self, path: &Path, bitmap: &Bitmap) -> Result<(), CodecError>;
}

impl<C: ImageCodec + ?Sized> ImageCodec for Box<C> {
    fn decode(&self, path: &Path) -> Result<Bitmap, CodecError> {
        (**self).decode(path)
    }

    fn encode(&self, path: &Path, bitmap: &Bitmap) -> Result<(), CodecError> {
        (**self).encode(path, bitmap)
    }
}
