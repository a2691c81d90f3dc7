use std::ffi::CString;
use std::num::NonZeroU32;

use glutin::config::{Api, ColorBufferType, Config, ConfigSurfaceTypes, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentContext, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{PbufferSurface, Surface, SurfaceAttributesBuilder, WindowSurface};
use imgsdk_core::SdkError;
use imgsdk_runtime_glow::GlowGpu;
use raw_window_handle::{AndroidDisplayHandle, RawDisplayHandle};

use crate::{ConfigRequest, EglBackend, NativeWindow};

/// EGL through glutin.
#[derive(Debug, Clone, Copy)]
pub struct GlutinEgl {
    display_handle: RawDisplayHandle,
}

impl GlutinEgl {
    pub fn new(display_handle: RawDisplayHandle) -> Self {
        Self { display_handle }
    }

    /// The default Android display (`EGL_DEFAULT_DISPLAY`).
    pub fn android() -> Self {
        Self::new(RawDisplayHandle::Android(AndroidDisplayHandle::empty()))
    }
}

#[derive(Debug)]
pub enum GlutinSurface {
    Window(Surface<WindowSurface>),
    Pbuffer(Surface<PbufferSurface>),
}

fn non_zero(v: i64, what: &str) -> Result<NonZeroU32, SdkError> {
    u32::try_from(v)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| SdkError::SurfaceCreationFailed(format!("{what} must be positive (got {v})")))
}

impl EglBackend for GlutinEgl {
    type Display = Display;
    type Config = Config;
    type Surface = GlutinSurface;
    type PendingContext = NotCurrentContext;
    type Context = PossiblyCurrentContext;
    type Gpu = GlowGpu;

    fn open_display(&self) -> Result<Display, SdkError> {
        // SAFETY: the handle comes from the platform (or the host's event loop) and outlives
        // the display.
        let display = unsafe { Display::new(self.display_handle, DisplayApiPreference::Egl) }
            .map_err(|e| SdkError::DisplayUnavailable(e.to_string()))?;
        tracing::info!("egl display initialized");
        Ok(display)
    }

    fn choose_config(
        &self,
        display: &Display,
        request: &ConfigRequest,
        window: Option<&NativeWindow>,
    ) -> Result<Config, SdkError> {
        let surface_type = if window.is_some() {
            ConfigSurfaceTypes::WINDOW
        } else {
            ConfigSurfaceTypes::PBUFFER
        };
        let mut builder = ConfigTemplateBuilder::new()
            .with_buffer_type(ColorBufferType::Rgb {
                r_size: request.red_bits,
                g_size: request.green_bits,
                b_size: request.blue_bits,
            })
            .with_alpha_size(request.alpha_bits)
            .with_api(Api::GLES2)
            .with_surface_type(surface_type);
        if let Some(w) = window {
            builder = builder.compatible_with_native_window(w.handle);
        }

        // SAFETY: `display` is a live, initialized display.
        let mut configs = unsafe { display.find_configs(builder.build()) }
            .map_err(|e| SdkError::ConfigSelectionFailed(e.to_string()))?;
        configs
            .find(|c| match c.color_buffer_type() {
                Some(ColorBufferType::Rgb {
                    r_size,
                    g_size,
                    b_size,
                }) => request.accepts(r_size, g_size, b_size),
                _ => false,
            })
            .ok_or_else(|| SdkError::ConfigSelectionFailed("no matching config".to_string()))
    }

    fn create_window_surface(
        &self,
        display: &Display,
        config: &Config,
        window: &NativeWindow,
    ) -> Result<GlutinSurface, SdkError> {
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window.handle,
            non_zero(window.width as i64, "window width")?,
            non_zero(window.height as i64, "window height")?,
        );
        // SAFETY: the caller keeps the native window alive while the surface exists.
        unsafe { display.create_window_surface(config, &attrs) }
            .map(GlutinSurface::Window)
            .map_err(|e| SdkError::SurfaceCreationFailed(e.to_string()))
    }

    fn create_pbuffer_surface(
        &self,
        display: &Display,
        config: &Config,
        max_width: u32,
        max_height: u32,
    ) -> Result<GlutinSurface, SdkError> {
        let attrs = SurfaceAttributesBuilder::<PbufferSurface>::new()
            .with_largest_pbuffer(true)
            .build(
                non_zero(max_width as i64, "pbuffer width")?,
                non_zero(max_height as i64, "pbuffer height")?,
            );
        // SAFETY: `config` was chosen from `display`.
        unsafe { display.create_pbuffer_surface(config, &attrs) }
            .map(GlutinSurface::Pbuffer)
            .map_err(|e| SdkError::SurfaceCreationFailed(e.to_string()))
    }

    fn create_context(
        &self,
        display: &Display,
        config: &Config,
        request: &ConfigRequest,
        window: Option<&NativeWindow>,
    ) -> Result<NotCurrentContext, SdkError> {
        let version = Version::new(request.gles_major, request.gles_minor);
        let attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(version)))
            .build(window.map(|w| w.handle));
        // SAFETY: `config` was chosen from `display`.
        unsafe { display.create_context(config, &attrs) }
            .map_err(|e| SdkError::ContextCreationFailed(e.to_string()))
    }

    fn make_current(
        &self,
        pending: NotCurrentContext,
        surface: &GlutinSurface,
    ) -> Result<PossiblyCurrentContext, SdkError> {
        let current = match surface {
            GlutinSurface::Window(s) => pending.make_current(s),
            GlutinSurface::Pbuffer(s) => pending.make_current(s),
        };
        current.map_err(|e| SdkError::MakeCurrentFailed(e.to_string()))
    }

    fn release_current(&self, context: PossiblyCurrentContext) -> Result<(), SdkError> {
        context
            .make_not_current()
            .map(drop)
            .map_err(|e| SdkError::MakeCurrentFailed(e.to_string()))
    }

    fn surface_size(&self, surface: &GlutinSurface) -> (i32, i32) {
        let (w, h) = match surface {
            GlutinSurface::Window(s) => (s.width(), s.height()),
            GlutinSurface::Pbuffer(s) => (s.width(), s.height()),
        };
        (
            w.unwrap_or(0).min(i32::MAX as u32) as i32,
            h.unwrap_or(0).min(i32::MAX as u32) as i32,
        )
    }

    fn swap_buffers(
        &self,
        surface: &GlutinSurface,
        context: &PossiblyCurrentContext,
    ) -> Result<(), SdkError> {
        match surface {
            GlutinSurface::Window(s) => s
                .swap_buffers(context)
                .map_err(|e| SdkError::PresentFailed(e.to_string())),
            GlutinSurface::Pbuffer(_) => Ok(()),
        }
    }

    unsafe fn load_gpu(&self, display: &Display) -> Result<GlowGpu, SdkError> {
        let gpu = GlowGpu::from_loader_function(|name| match CString::new(name) {
            Ok(c) => display.get_proc_address(c.as_c_str()),
            Err(_) => std::ptr::null(),
        });
        Ok(gpu)
    }
}
