use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use imgsdk_codec::StandardCodec;
use imgsdk_core::{AssetSource, Bitmap, ImageCodec, Platform, SdkConfig, SdkError};
use imgsdk_effect::EffectDescriptor;
use imgsdk_host_egl::{ConfigRequest, EglBackend, NativeWindow, RenderSurface, SurfaceMode};
use imgsdk_runtime_glow::program::{UNIFORM_COLOR, UNIFORM_SAMPLER};
use imgsdk_runtime_glow::{
    create_program, read_rgba, FullscreenQuad, Gpu, GpuInfo, RenderTarget, ShaderProgram,
    Texture, TextureId, STANDARD_LOCATIONS,
};

use crate::command::{ActiveSource, EffectCommandState};

/// Hook fired by [`SdkEnv::notify_create`], [`SdkEnv::notify_draw`] or
/// [`SdkEnv::notify_destroy`].
pub type EnvCallback<B> = Box<dyn FnMut(&mut SdkEnv<B>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Blank,
    Ready,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Draws into the native window and presents.
    Windowed,
    /// Draws into a framebuffer-backed texture and reads it back.
    Offscreen,
}

enum RenderPath<G: Gpu> {
    Windowed { window: NativeWindow },
    Offscreen { target: RenderTarget<G> },
}

impl<G: Gpu> RenderPath<G> {
    fn mode(&self) -> RenderMode {
        match self {
            RenderPath::Windowed { .. } => RenderMode::Windowed,
            RenderPath::Offscreen { .. } => RenderMode::Offscreen,
        }
    }
}

/// Everything that only exists while the environment is `Ready`.
///
/// Field order is drop order: GL objects, then the GL function table, then the context,
/// surface and display.
struct Live<B: EglBackend> {
    path: RenderPath<B::Gpu>,
    source: Texture<B::Gpu>,
    quad: FullscreenQuad<B::Gpu>,
    program: ShaderProgram<B::Gpu>,
    gpu: Rc<B::Gpu>,
    info: GpuInfo,
    surface: RenderSurface<B>,
}

impl<B: EglBackend> Live<B> {
    fn build(
        backend: Rc<B>,
        window: Option<NativeWindow>,
        assets: &dyn AssetSource,
        cfg: &SdkConfig,
    ) -> Result<Self, SdkError> {
        // Locals drop in reverse order on `?`, so a failure part-way releases the GL
        // objects before the surface they were created on.
        let surface = match window {
            Some(window) => RenderSurface::init_windowed(
                backend,
                window,
                &ConfigRequest::for_mode(SurfaceMode::Window, cfg),
            )?,
            None => RenderSurface::init_offscreen(
                backend,
                cfg.max_surface_width,
                cfg.max_surface_height,
                &ConfigRequest::for_mode(SurfaceMode::Pbuffer, cfg),
            )?,
        };

        let gpu = Rc::new(surface.load_gpu()?);
        let info = gpu.info();
        tracing::info!(
            version = %info.version,
            renderer = %info.renderer,
            vendor = %info.vendor,
            "gl context ready"
        );

        let t0 = Instant::now();
        let vertex_src = assets.read_to_string(&cfg.vertex_shader)?;
        let fragment_src = assets.read_to_string(&cfg.fragment_shader)?;
        let mut program = create_program(&gpu, &vertex_src, &fragment_src)?;
        let missing = program.resolve_locations(&STANDARD_LOCATIONS);
        tracing::info!(
            vertex = %cfg.vertex_shader,
            fragment = %cfg.fragment_shader,
            missing_locations = missing,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "shaders loaded"
        );

        let quad = FullscreenQuad::new(&gpu)?;
        let source = Texture::new(&gpu)?;
        let path = match window {
            Some(window) => RenderPath::Windowed { window },
            None => {
                let (w, h) = surface.size();
                RenderPath::Offscreen {
                    target: RenderTarget::new(&gpu, w, h)?,
                }
            }
        };

        Ok(Self {
            path,
            source,
            quad,
            program,
            gpu,
            info,
            surface,
        })
    }

    /// Releases in dependency order and logs each step.
    fn teardown(self) {
        let Live {
            path,
            source,
            quad,
            program,
            gpu,
            info: _,
            surface,
        } = self;
        drop(path);
        drop(source);
        drop(quad);
        drop(program);
        tracing::debug!("gl objects released");
        drop(gpu);
        drop(surface);
        tracing::debug!("egl surface released");
    }
}

enum State<B: EglBackend> {
    Blank,
    Ready(Box<Live<B>>),
    Destroyed,
}

/// One SDK environment: an EGL surface, the GL pipeline on it, and the image being
/// processed.
///
/// The environment is bound to the thread that initialized it (it holds `Rc`s, so the
/// compiler enforces this). Dropping it runs [`SdkEnv::destroy`].
pub struct SdkEnv<B: EglBackend> {
    platform: Platform,
    backend: Rc<B>,
    state: State<B>,
    window: Option<NativeWindow>,
    assets: Option<Box<dyn AssetSource>>,
    codec: Box<dyn ImageCodec>,
    custom_codec: bool,
    config: SdkConfig,
    command: EffectCommandState,
    canvas: (i32, i32),
    on_create: Option<EnvCallback<B>>,
    on_draw: Option<EnvCallback<B>>,
    on_destroy: Option<EnvCallback<B>>,
}

impl<B: EglBackend> fmt::Debug for SdkEnv<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkEnv")
            .field("platform", &self.platform)
            .field("stage", &self.stage())
            .field("mode", &self.render_mode())
            .field("canvas", &self.canvas)
            .field("window", &self.window)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<B: EglBackend> SdkEnv<B> {
    /// A blank environment: nothing is allocated until [`SdkEnv::init`].
    pub fn new_blank(platform: i32, backend: B) -> Result<Self, SdkError> {
        let platform = Platform::try_from(platform)?;
        tracing::debug!(?platform, "sdk environment created");
        Ok(Self {
            platform,
            backend: Rc::new(backend),
            state: State::Blank,
            window: None,
            assets: None,
            codec: Box::new(StandardCodec::default()),
            custom_codec: false,
            config: SdkConfig::default(),
            command: EffectCommandState::new(),
            canvas: (0, 0),
            on_create: None,
            on_draw: None,
            on_destroy: None,
        })
    }

    /// A ready off-screen environment with the default configuration.
    pub fn new_default(backend: B, assets: impl AssetSource + 'static) -> Result<Self, SdkError> {
        Self::new_default_with_config(backend, assets, SdkConfig::default())
    }

    pub fn new_default_with_config(
        backend: B,
        assets: impl AssetSource + 'static,
        config: SdkConfig,
    ) -> Result<Self, SdkError> {
        let mut env = Self::new_blank(Platform::Android.into(), backend)?;
        env.set_config(config)?;
        env.set_platform_data(assets);
        env.init()?;
        Ok(env)
    }

    /// Records the window to render into. Only valid before `init`.
    pub fn set_native_window(&mut self, window: NativeWindow) -> Result<(), SdkError> {
        match self.state {
            State::Blank => {
                self.window = Some(window);
                Ok(())
            }
            State::Ready(_) => Err(SdkError::AlreadyInitialized),
            State::Destroyed => Err(SdkError::NotReady),
        }
    }

    /// Where shader sources are read from. Required before `init`.
    pub fn set_platform_data(&mut self, assets: impl AssetSource + 'static) {
        self.assets = Some(Box::new(assets));
    }

    pub fn set_codec(&mut self, codec: impl ImageCodec + 'static) {
        self.codec = Box::new(codec);
        self.custom_codec = true;
    }

    /// Replaces the configuration. Only valid before `init`.
    pub fn set_config(&mut self, config: SdkConfig) -> Result<(), SdkError> {
        match self.state {
            State::Blank => {}
            State::Ready(_) => return Err(SdkError::AlreadyInitialized),
            State::Destroyed => return Err(SdkError::NotReady),
        }
        if !self.custom_codec {
            self.codec = Box::new(StandardCodec::with_jpeg_quality(config.jpeg_quality));
        }
        self.config = config;
        Ok(())
    }

    /// Builds the surface and the GL pipeline: windowed if a window was recorded, else
    /// off-screen. On failure the environment stays blank and nothing is left allocated.
    pub fn init(&mut self) -> Result<(), SdkError> {
        match self.state {
            State::Blank => {}
            State::Ready(_) => return Err(SdkError::AlreadyInitialized),
            State::Destroyed => return Err(SdkError::NotReady),
        }
        let assets = self.assets.as_deref().ok_or(SdkError::MissingPlatformData)?;

        let t0 = Instant::now();
        let live = Live::build(Rc::clone(&self.backend), self.window, assets, &self.config)
            .map_err(|e| {
                tracing::error!(error = %e, "sdk init failed");
                e
            })?;
        self.canvas = match live.path {
            RenderPath::Windowed { .. } => live.surface.size(),
            RenderPath::Offscreen { .. } => (0, 0),
        };
        tracing::info!(
            mode = ?live.path.mode(),
            width = live.surface.size().0,
            height = live.surface.size().1,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "sdk environment ready"
        );
        self.state = State::Ready(Box::new(live));
        Ok(())
    }

    pub fn set_input_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SdkError> {
        if matches!(self.state, State::Destroyed) {
            return Err(SdkError::NotReady);
        }
        self.command.set_input_path(path);
        Ok(())
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SdkError> {
        if matches!(self.state, State::Destroyed) {
            return Err(SdkError::NotReady);
        }
        self.command.set_output_path(path);
        Ok(())
    }

    /// Applies an image path or an effect JSON command and uploads the resulting bitmap.
    ///
    /// Repeating the current command is a no-op.
    pub fn set_effect_command(&mut self, cmd: &str) -> Result<(), SdkError> {
        let State::Ready(live) = &mut self.state else {
            return Err(SdkError::NotReady);
        };
        let Some(pending) = self.command.prepare(cmd, self.codec.as_ref())? else {
            return Ok(());
        };
        let bitmap = self
            .command
            .bitmap_for(&pending)
            .ok_or(SdkError::NoInputConfigured)?;
        // Nothing is stored until the GPU accepts the bitmap, so a failed command can be retried.
        live.source.upload(bitmap)?;
        let canvas = match &mut live.path {
            RenderPath::Offscreen { target } => {
                let size = live.source.size();
                target.resize(size.0, size.1)?;
                size
            }
            RenderPath::Windowed { .. } => live.surface.size(),
        };
        self.command.commit(pending);
        self.canvas = canvas;
        tracing::debug!(canvas = ?self.canvas, "canvas updated");
        Ok(())
    }

    /// Renders the active bitmap once.
    pub fn draw(&mut self) -> Result<(), SdkError> {
        let State::Ready(live) = &self.state else {
            tracing::error!(stage = ?self.stage(), "draw called before init");
            return Err(SdkError::NotReady);
        };
        let bitmap = self.command.bitmap();
        let (cw, ch) = self.canvas;
        if let RenderPath::Offscreen { .. } = live.path {
            if bitmap.is_none() || cw <= 0 || ch <= 0 {
                tracing::error!(canvas = ?self.canvas, "nothing to draw off-screen");
                return Err(SdkError::NoInputConfigured);
            }
        }

        let t0 = Instant::now();
        let gpu = &live.gpu;
        live.program.bind();
        gpu.viewport(0, 0, cw, ch);
        if let RenderPath::Offscreen { target } = &live.path {
            target.bind().map_err(|e| {
                tracing::error!(error = %e, "draw aborted");
                e
            })?;
        }
        gpu.clear_color(self.config.clear_color);
        gpu.clear();

        if bitmap.is_some() {
            gpu.active_texture(0);
            gpu.bind_texture(Some(live.source.id()));
            live.program.set_uniform_i32(UNIFORM_SAMPLER, 0);
            live.program.set_uniform_vec4(UNIFORM_COLOR, [1.0; 4]);
            live.quad.draw(&live.program);
            gpu.bind_texture(None);
        }

        gpu.finish();
        tracing::info!(
            width = cw,
            height = ch,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "render finished"
        );

        match &live.path {
            RenderPath::Windowed { .. } => live.surface.present(),
            RenderPath::Offscreen { target } => {
                target.unbind();
                Ok(())
            }
        }
    }

    /// Copies the rendered image back to host memory and makes it the active bitmap.
    pub fn read_pixels(&mut self) -> Result<&Bitmap, SdkError> {
        let State::Ready(live) = &self.state else {
            return Err(SdkError::NotReady);
        };
        let RenderPath::Offscreen { target } = &live.path else {
            return Err(SdkError::invalid_argument(
                "read_pixels is only available off-screen",
            ));
        };
        let t0 = Instant::now();
        let bitmap = read_rgba(&*live.gpu, target)?;
        tracing::info!(
            width = bitmap.width(),
            height = bitmap.height(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "readback finished"
        );
        self.command.set_readback(bitmap);
        self.command.bitmap().ok_or(SdkError::NoInputConfigured)
    }

    /// Encodes the active bitmap to the output path.
    pub fn save_output(&self) -> Result<PathBuf, SdkError> {
        let path = self
            .command
            .output_path()
            .ok_or_else(|| SdkError::invalid_argument("no output path set"))?;
        let bitmap = self.command.bitmap().ok_or(SdkError::NoInputConfigured)?;
        let t0 = Instant::now();
        self.codec.encode(path, bitmap)?;
        tracing::info!(
            path = %path.display(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "output saved"
        );
        Ok(path.to_path_buf())
    }

    /// Swaps buffers when rendering to a window; otherwise does nothing.
    pub fn present(&self) -> Result<(), SdkError> {
        match &self.state {
            State::Ready(live) => live.surface.present(),
            _ => Ok(()),
        }
    }

    /// Releases every resource in dependency order. Safe to call more than once.
    pub fn destroy(&mut self) {
        match std::mem::replace(&mut self.state, State::Destroyed) {
            State::Destroyed => return,
            State::Blank => tracing::debug!("blank environment destroyed"),
            State::Ready(live) => {
                let t0 = Instant::now();
                live.teardown();
                tracing::info!(
                    elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
                    "sdk environment destroyed"
                );
            }
        }
        self.command.clear();
        self.canvas = (0, 0);
        self.window = None;
        self.on_create = None;
        self.on_draw = None;
        self.on_destroy = None;
    }

    pub fn set_on_create(&mut self, f: impl FnMut(&mut SdkEnv<B>) + 'static) {
        self.on_create = Some(Box::new(f));
    }

    pub fn set_on_draw(&mut self, f: impl FnMut(&mut SdkEnv<B>) + 'static) {
        self.on_draw = Some(Box::new(f));
    }

    pub fn set_on_destroy(&mut self, f: impl FnMut(&mut SdkEnv<B>) + 'static) {
        self.on_destroy = Some(Box::new(f));
    }

    pub fn notify_create(&mut self) {
        if let Some(mut f) = self.on_create.take() {
            f(self);
            // The callback may have installed a replacement.
            if self.on_create.is_none() && !matches!(self.state, State::Destroyed) {
                self.on_create = Some(f);
            }
        }
    }

    pub fn notify_draw(&mut self) {
        if let Some(mut f) = self.on_draw.take() {
            f(self);
            if self.on_draw.is_none() && !matches!(self.state, State::Destroyed) {
                self.on_draw = Some(f);
            }
        }
    }

    pub fn notify_destroy(&mut self) {
        if let Some(mut f) = self.on_destroy.take() {
            f(self);
            if self.on_destroy.is_none() && !matches!(self.state, State::Destroyed) {
                self.on_destroy = Some(f);
            }
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        match self.state {
            State::Blank => Stage::Blank,
            State::Ready(_) => Stage::Ready,
            State::Destroyed => Stage::Destroyed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn render_mode(&self) -> Option<RenderMode> {
        match &self.state {
            State::Ready(live) => Some(live.path.mode()),
            _ => None,
        }
    }

    pub fn canvas_size(&self) -> (i32, i32) {
        self.canvas
    }

    pub fn surface_size(&self) -> Option<(i32, i32)> {
        match &self.state {
            State::Ready(live) => Some(live.surface.size()),
            _ => None,
        }
    }

    pub fn native_window(&self) -> Option<&NativeWindow> {
        match &self.state {
            State::Ready(live) => match &live.path {
                RenderPath::Windowed { window } => Some(window),
                RenderPath::Offscreen { .. } => None,
            },
            _ => self.window.as_ref(),
        }
    }

    pub fn active_bitmap(&self) -> Option<&Bitmap> {
        self.command.bitmap()
    }

    pub fn active_source(&self) -> ActiveSource {
        self.command.source()
    }

    pub fn effect_command(&self) -> Option<&str> {
        self.command.command()
    }

    pub fn effect_descriptor(&self) -> Option<&EffectDescriptor> {
        self.command.descriptor()
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.command.input_path()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.command.output_path()
    }

    pub fn source_texture(&self) -> Option<TextureId> {
        match &self.state {
            State::Ready(live) => Some(live.source.id()),
            _ => None,
        }
    }

    pub fn render_target(&self) -> Option<&RenderTarget<B::Gpu>> {
        match &self.state {
            State::Ready(live) => match &live.path {
                RenderPath::Offscreen { target } => Some(target),
                RenderPath::Windowed { .. } => None,
            },
            _ => None,
        }
    }

    pub fn gpu_info(&self) -> Option<&GpuInfo> {
        match &self.state {
            State::Ready(live) => Some(&live.info),
            _ => None,
        }
    }
}

impl<B: EglBackend> Drop for SdkEnv<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Installs the default callbacks in any empty slot and fires `on_create`.
///
/// The default `on_draw` renders and logs failures; the defaults for create and destroy
/// only log.
pub fn sdk_main<B: EglBackend + 'static>(env: &mut SdkEnv<B>) {
    if env.on_create.is_none() {
        env.set_on_create(|env: &mut SdkEnv<B>| {
            tracing::info!(stage = ?env.stage(), mode = ?env.render_mode(), "on_create");
        });
    }
    if env.on_draw.is_none() {
        env.set_on_draw(|env: &mut SdkEnv<B>| {
            if let Err(e) = env.draw() {
                tracing::error!(error = %e, "draw failed");
            }
        });
    }
    if env.on_destroy.is_none() {
        env.set_on_destroy(|env: &mut SdkEnv<B>| {
            tracing::info!(stage = ?env.stage(), "on_destroy");
        });
    }
    env.notify_create();
}
