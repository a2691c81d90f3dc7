//! imgsdk GL runtime (GLES 2.0 through glow).
//
// Only the GPU side of the pipeline lives here:
// - compile/link/validate the shader pair and resolve its variables
// - source texture upload and the off-screen render target (FBO + texture)
// - the full-surface quad and pixel readback
//
// No EGL, no file IO, no codecs.
#![allow(clippy::missing_safety_doc)]
#![deny(missing_debug_implementations)]

pub mod glow_gpu;
pub mod gpu;
pub mod program;
pub mod quad;
pub mod readback;
pub mod shaders;
pub mod texture;

pub use glow;
pub use imgsdk_core::SdkError;

pub use glow_gpu::GlowGpu;
pub use gpu::{
    BufferId, FramebufferId, Gpu, GpuInfo, PixelLayout, ProgramId, ShaderId, TextureId,
    UniformLocation,
};
pub use program::{
    compile_shader, create_program, Shader, ShaderProgram, VariableKind, INFO_LOG_LIMIT,
    STANDARD_LOCATIONS,
};
pub use quad::FullscreenQuad;
pub use readback::read_rgba;
pub use shaders::BuiltinShaders;
pub use texture::{RenderTarget, Texture};
