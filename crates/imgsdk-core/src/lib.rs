#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

//! Shared contract for the imgsdk crates.
//!
//! No GL, no EGL, no codecs: just the bitmap model, the error taxonomy, the collaborator
//! traits the SDK environment consumes, and the read-only configuration.

pub mod assets;
pub mod bitmap;
pub mod codec;
pub mod config;
pub mod error;
pub mod platform;

pub use assets::{AssetSource, AssetsRoot, MemoryAssets};
pub use bitmap::{Bitmap, PixelFormat};
pub use codec::{CodecError, ImageCodec, ImageKind};
pub use config::{load_sdk_config_from, load_typed_json, parse_loaded_json, LoadedJson, SdkConfig};
pub use error::{SdkError, ShaderStage};
pub use platform::Platform;
