//! imgsdk: GPU image processing for native Android hosts.
//!
//! An [`SdkEnv`] owns an EGL surface (window or pbuffer), the GLES 2 pipeline built on it,
//! and the image being processed. A host either drives it directly, through the handle
//! registry in [`api`], or through the lifecycle events in [`lifecycle`].
//!
//! ```no_run
//! use imgsdk::{BuiltinShaders, GlutinEgl, SdkEnv};
//!
//! # fn main() -> Result<(), imgsdk::SdkError> {
//! let mut env = SdkEnv::new_default(GlutinEgl::android(), BuiltinShaders)?;
//! env.set_output_path("/sdcard/out.png")?;
//! env.set_effect_command("/sdcard/in.png")?;
//! env.draw()?;
//! env.read_pixels()?;
//! env.save_output()?;
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]

pub mod api;
pub mod command;
pub mod env;
pub mod lifecycle;
pub mod thread;

pub use api::{ExecuteCallback, Handle, SdkRegistry};
pub use command::{ActiveSource, CommandChange, EffectCommandState, PendingCommand};
pub use env::{sdk_main, EnvCallback, RenderMode, SdkEnv, Stage};
pub use lifecycle::{handle_app_event, AppEvent};
pub use thread::ThreadBound;

pub use imgsdk_codec::StandardCodec;
pub use imgsdk_core::{
    AssetSource, AssetsRoot, Bitmap, CodecError, ImageCodec, MemoryAssets, PixelFormat, Platform,
    SdkConfig, SdkError,
};
pub use imgsdk_effect::{parse_command, EffectDescriptor, EffectKind};
pub use imgsdk_host_egl::{EglBackend, GlutinEgl, NativeWindow};
pub use imgsdk_runtime_glow::BuiltinShaders;
pub use raw_window_handle;
