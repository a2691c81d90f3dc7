//! Host glue: EGL display/surface/context setup.
//!
//! [`EglBackend`] is the seam between the render-surface state machine and the platform.
//! [`GlutinEgl`] is the production backend; tests supply a fake. The runtime stays
//! embed-friendly because nothing here touches GL beyond loading it.
#![deny(missing_debug_implementations)]

use std::fmt;

use imgsdk_core::{SdkConfig, SdkError};
use imgsdk_runtime_glow::Gpu;
use raw_window_handle::RawWindowHandle;

pub mod glutin_egl;
pub mod surface;

pub use glutin_egl::{GlutinEgl, GlutinSurface};
pub use surface::RenderSurface;

/// A platform window the caller wants rendered into, with the size the platform reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    pub handle: RawWindowHandle,
    pub width: i32,
    pub height: i32,
}

impl NativeWindow {
    pub fn new(handle: RawWindowHandle, width: i32, height: i32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceMode {
    /// On-screen: presents to a native window.
    Window,
    /// Off-screen pixel buffer.
    Pbuffer,
}

/// Attributes a config and context must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRequest {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub gles_major: u8,
    pub gles_minor: u8,
}

impl ConfigRequest {
    pub const MIN_CHANNEL_BITS: u8 = 8;

    pub fn for_window() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 0,
            gles_major: 2,
            gles_minor: 0,
        }
    }

    pub fn for_pbuffer() -> Self {
        Self {
            alpha_bits: 8,
            ..Self::for_window()
        }
    }

    pub fn for_mode(mode: SurfaceMode, cfg: &SdkConfig) -> Self {
        let base = match mode {
            SurfaceMode::Window => Self::for_window(),
            SurfaceMode::Pbuffer => Self::for_pbuffer(),
        };
        Self {
            gles_major: cfg.gles_major,
            gles_minor: cfg.gles_minor,
            ..base
        }
    }

    /// A config qualifies only with at least 8 bits in every RGB channel.
    pub fn accepts(&self, red: u8, green: u8, blue: u8) -> bool {
        let floor = |want: u8| want.max(Self::MIN_CHANNEL_BITS);
        red >= floor(self.red_bits) && green >= floor(self.green_bits) && blue >= floor(self.blue_bits)
    }
}

impl Default for ConfigRequest {
    fn default() -> Self {
        Self::for_pbuffer()
    }
}

/// The EGL steps a [`RenderSurface`] walks through.
///
/// Destroying an object is dropping it; dropping the display terminates it. Every method is
/// fallible and maps its failure into the matching surface-setup [`SdkError`].
pub trait EglBackend {
    type Display: fmt::Debug;
    type Config: fmt::Debug;
    type Surface: fmt::Debug;
    /// A created context that is not current yet.
    type PendingContext;
    type Context: fmt::Debug;
    type Gpu: Gpu;

    fn open_display(&self) -> Result<Self::Display, SdkError>;

    /// Picks a config for a window surface when `window` is given, else for a pbuffer.
    fn choose_config(
        &self,
        display: &Self::Display,
        request: &ConfigRequest,
        window: Option<&NativeWindow>,
    ) -> Result<Self::Config, SdkError>;

    fn create_window_surface(
        &self,
        display: &Self::Display,
        config: &Self::Config,
        window: &NativeWindow,
    ) -> Result<Self::Surface, SdkError>;

    /// Requests the largest pbuffer available up to `max_width` x `max_height`.
    fn create_pbuffer_surface(
        &self,
        display: &Self::Display,
        config: &Self::Config,
        max_width: u32,
        max_height: u32,
    ) -> Result<Self::Surface, SdkError>;

    fn create_context(
        &self,
        display: &Self::Display,
        config: &Self::Config,
        request: &ConfigRequest,
        window: Option<&NativeWindow>,
    ) -> Result<Self::PendingContext, SdkError>;

    fn make_current(
        &self,
        pending: Self::PendingContext,
        surface: &Self::Surface,
    ) -> Result<Self::Context, SdkError>;

    /// Makes `context` not current on this thread and destroys it.
    fn release_current(&self, context: Self::Context) -> Result<(), SdkError>;

    fn surface_size(&self, surface: &Self::Surface) -> (i32, i32);

    fn swap_buffers(&self, surface: &Self::Surface, context: &Self::Context)
        -> Result<(), SdkError>;

    /// # Safety
    /// A context created from `display` must be current on the calling thread.
    unsafe fn load_gpu(&self, display: &Self::Display) -> Result<Self::Gpu, SdkError>;
}
