use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use imgsdk_core::SdkError;

use crate::{ConfigRequest, EglBackend, NativeWindow, SurfaceMode};

/// Display + surface + context for one environment.
///
/// Each piece is optional so a half-built surface can be dropped safely: `Drop` releases
/// the current context first, then the context, the surface and the display.
pub struct RenderSurface<B: EglBackend> {
    backend: Rc<B>,
    context: Option<B::Context>,
    surface: Option<B::Surface>,
    display: Option<B::Display>,
    width: i32,
    height: i32,
    mode: SurfaceMode,
    window: Option<NativeWindow>,
}

impl<B: EglBackend> fmt::Debug for RenderSurface<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSurface")
            .field("mode", &self.mode)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("display", &self.display)
            .field("surface", &self.surface)
            .field("context", &self.context)
            .field("window", &self.window)
            .finish()
    }
}

impl<B: EglBackend> RenderSurface<B> {
    fn empty(backend: Rc<B>, mode: SurfaceMode, window: Option<NativeWindow>) -> Self {
        Self {
            backend,
            context: None,
            surface: None,
            display: None,
            width: 0,
            height: 0,
            mode,
            window,
        }
    }

    /// On-screen setup. The surface must come out exactly the size of `window`.
    pub fn init_windowed(
        backend: Rc<B>,
        window: NativeWindow,
        request: &ConfigRequest,
    ) -> Result<Self, SdkError> {
        let t0 = Instant::now();
        let mut rs = Self::empty(backend, SurfaceMode::Window, Some(window));
        rs.build(request, 0, 0)?;

        let surface = (rs.width, rs.height);
        let native = (window.width, window.height);
        tracing::info!(
            width = surface.0,
            height = surface.1,
            window_width = native.0,
            window_height = native.1,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "egl window surface ready"
        );
        if surface != native {
            tracing::error!(?surface, window = ?native, "egl surface and native window differ");
            return Err(SdkError::SurfaceSizeMismatch {
                surface,
                window: native,
            });
        }
        Ok(rs)
    }

    /// Off-screen setup with a pbuffer of at most `max_width` x `max_height`.
    pub fn init_offscreen(
        backend: Rc<B>,
        max_width: u32,
        max_height: u32,
        request: &ConfigRequest,
    ) -> Result<Self, SdkError> {
        if max_width == 0 || max_height == 0 {
            return Err(SdkError::invalid_argument(format!(
                "pbuffer size must be non-zero (got {max_width}x{max_height})"
            )));
        }
        let t0 = Instant::now();
        let mut rs = Self::empty(backend, SurfaceMode::Pbuffer, None);
        rs.build(request, max_width, max_height)?;
        tracing::info!(
            width = rs.width,
            height = rs.height,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "egl pbuffer surface ready"
        );
        Ok(rs)
    }

    fn build(&mut self, request: &ConfigRequest, max_w: u32, max_h: u32) -> Result<(), SdkError> {
        let backend = Rc::clone(&self.backend);
        let display = self.display.insert(backend.open_display()?);
        let config = backend.choose_config(display, request, self.window.as_ref())?;
        tracing::debug!(?config, mode = ?self.mode, "egl config chosen");

        let surface = match &self.window {
            Some(window) => backend.create_window_surface(display, &config, window)?,
            None => backend.create_pbuffer_surface(display, &config, max_w, max_h)?,
        };
        let surface = self.surface.insert(surface);

        let pending = backend.create_context(display, &config, request, self.window.as_ref())?;
        let context = backend.make_current(pending, surface)?;
        self.context = Some(context);

        let (w, h) = backend.surface_size(surface);
        self.width = w;
        self.height = h;
        Ok(())
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn window(&self) -> Option<&NativeWindow> {
        self.window.as_ref()
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub fn is_current(&self) -> bool {
        self.context.is_some()
    }

    /// Loads the GL entry points of the current context.
    pub fn load_gpu(&self) -> Result<B::Gpu, SdkError> {
        let display = self.display.as_ref().ok_or(SdkError::NotReady)?;
        if self.context.is_none() {
            return Err(SdkError::NotReady);
        }
        // SAFETY: `context` was made current on `surface` in `build` and is only released by
        // `release`, which also clears `context`.
        unsafe { self.backend.load_gpu(display) }
    }

    /// Swaps buffers for window surfaces; pbuffers have nothing to present.
    pub fn present(&self) -> Result<(), SdkError> {
        if self.mode != SurfaceMode::Window {
            return Ok(());
        }
        let (Some(surface), Some(context)) = (&self.surface, &self.context) else {
            return Err(SdkError::NotReady);
        };
        self.backend.swap_buffers(surface, context).map_err(|e| {
            tracing::error!(error = %e, "swap buffers failed");
            e
        })
    }

    /// Releases everything that exists. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = self.backend.release_current(context) {
                tracing::warn!(error = %e, "failed to release egl context");
            }
        }
        let had_surface = self.surface.take().is_some();
        let had_display = self.display.take().is_some();
        if had_surface || had_display {
            tracing::debug!(mode = ?self.mode, "egl surface released");
        }
        self.width = 0;
        self.height = 0;
    }
}

impl<B: EglBackend> Drop for RenderSurface<B> {
    fn drop(&mut self) {
        self.release();
    }
}
