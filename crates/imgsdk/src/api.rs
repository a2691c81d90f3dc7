//! Handle-based entry points for a managed-runtime binding layer.
//!
//! Every environment is created on, and only usable from, the calling thread. The plain
//! functions log failures and return a sentinel (`Handle::NULL` or `false`); the `try_`
//! variants return the error.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use imgsdk_core::{AssetSource, SdkError};
use imgsdk_host_egl::{EglBackend, NativeWindow};

use crate::env::{sdk_main, RenderMode, SdkEnv};
use crate::thread::ThreadBound;

/// Opaque environment handle. `0` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Called after a successful `execute` with the saved output path, if any.
pub type ExecuteCallback<'a> = Box<dyn FnOnce(Option<&Path>) + 'a>;

pub struct SdkRegistry<B: EglBackend> {
    next: u64,
    envs: HashMap<u64, ThreadBound<SdkEnv<B>>>,
}

impl<B: EglBackend> fmt::Debug for SdkRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handles: Vec<_> = self.envs.keys().copied().map(Handle).collect();
        handles.sort();
        f.debug_struct("SdkRegistry")
            .field("next", &self.next)
            .field("handles", &handles)
            .finish()
    }
}

impl<B: EglBackend> Default for SdkRegistry<B> {
    fn default() -> Self {
        Self {
            next: 1,
            envs: HashMap::new(),
        }
    }
}

impl<B: EglBackend + 'static> SdkRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.envs.contains_key(&handle.0)
    }

    fn insert(&mut self, env: SdkEnv<B>) -> Handle {
        let mut id = self.next;
        while id == 0 || self.envs.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next = id.wrapping_add(1);
        self.envs.insert(id, ThreadBound::new(env));
        Handle(id)
    }

    pub fn env(&self, handle: Handle) -> Result<&SdkEnv<B>, SdkError> {
        self.envs
            .get(&handle.0)
            .ok_or_else(|| unknown(handle))?
            .get()
    }

    pub fn env_mut(&mut self, handle: Handle) -> Result<&mut SdkEnv<B>, SdkError> {
        self.envs
            .get_mut(&handle.0)
            .ok_or_else(|| unknown(handle))?
            .get_mut()
    }

    /// Creates and initializes an off-screen environment.
    pub fn try_create(
        &mut self,
        platform: i32,
        backend: B,
        assets: impl AssetSource + 'static,
    ) -> Result<Handle, SdkError> {
        let mut env = SdkEnv::new_blank(platform, backend)?;
        env.set_platform_data(assets);
        env.init()?;
        let handle = self.insert(env);
        tracing::info!(%handle, "environment created");
        Ok(handle)
    }

    pub fn create(
        &mut self,
        platform: i32,
        backend: B,
        assets: impl AssetSource + 'static,
    ) -> Handle {
        self.try_create(platform, backend, assets)
            .unwrap_or_else(|e| null_on("create", e))
    }

    /// Creates a windowed environment, runs `sdk_main` and renders one frame.
    pub fn try_create_windowed(
        &mut self,
        platform: i32,
        backend: B,
        assets: impl AssetSource + 'static,
        window: NativeWindow,
    ) -> Result<Handle, SdkError> {
        let mut env = SdkEnv::new_blank(platform, backend)?;
        env.set_platform_data(assets);
        env.set_native_window(window)?;
        env.init()?;
        sdk_main(&mut env);
        env.notify_draw();
        let handle = self.insert(env);
        tracing::info!(
            %handle,
            width = window.width,
            height = window.height,
            "windowed environment created"
        );
        Ok(handle)
    }

    pub fn create_windowed(
        &mut self,
        platform: i32,
        backend: B,
        assets: impl AssetSource + 'static,
        window: NativeWindow,
    ) -> Handle {
        self.try_create_windowed(platform, backend, assets, window)
            .unwrap_or_else(|e| null_on("create_windowed", e))
    }

    /// Fires `on_destroy`, releases the environment and forgets the handle.
    pub fn try_destroy(&mut self, handle: Handle) -> Result<(), SdkError> {
        // Check ownership before removing so a foreign thread cannot drop the entry.
        let env = self.env_mut(handle)?;
        env.notify_destroy();
        env.destroy();
        self.envs.remove(&handle.0);
        tracing::info!(%handle, "environment destroyed");
        Ok(())
    }

    pub fn destroy(&mut self, handle: Handle) {
        if let Err(e) = self.try_destroy(handle) {
            tracing::warn!(%handle, error = %e, "destroy failed");
        }
    }

    pub fn try_set_input_path(
        &mut self,
        handle: Handle,
        path: impl Into<PathBuf>,
    ) -> Result<(), SdkError> {
        self.env_mut(handle)?.set_input_path(path)
    }

    pub fn set_input_path(&mut self, handle: Handle, path: impl Into<PathBuf>) -> bool {
        report(handle, "set_input_path", self.try_set_input_path(handle, path))
    }

    pub fn try_set_output_path(
        &mut self,
        handle: Handle,
        path: impl Into<PathBuf>,
    ) -> Result<(), SdkError> {
        self.env_mut(handle)?.set_output_path(path)
    }

    pub fn set_output_path(&mut self, handle: Handle, path: impl Into<PathBuf>) -> bool {
        report(handle, "set_output_path", self.try_set_output_path(handle, path))
    }

    pub fn try_set_effect_command(&mut self, handle: Handle, cmd: &str) -> Result<(), SdkError> {
        self.env_mut(handle)?.set_effect_command(cmd)
    }

    pub fn set_effect_command(&mut self, handle: Handle, cmd: &str) -> bool {
        report(handle, "set_effect_command", self.try_set_effect_command(handle, cmd))
    }

    /// Draws; off-screen with an output path it also reads back and saves.
    ///
    /// `callback` only runs on success.
    pub fn try_execute(
        &mut self,
        handle: Handle,
        callback: Option<ExecuteCallback<'_>>,
    ) -> Result<Option<PathBuf>, SdkError> {
        let env = self.env_mut(handle)?;
        env.draw()?;
        let saved = match (env.render_mode(), env.output_path().is_some()) {
            (Some(RenderMode::Offscreen), true) => {
                env.read_pixels()?;
                Some(env.save_output()?)
            }
            _ => None,
        };
        if let Some(cb) = callback {
            cb(saved.as_deref());
        }
        Ok(saved)
    }

    pub fn execute(&mut self, handle: Handle, callback: Option<ExecuteCallback<'_>>) -> bool {
        report(handle, "execute", self.try_execute(handle, callback).map(drop))
    }
}

fn unknown(handle: Handle) -> SdkError {
    SdkError::invalid_argument(format!("unknown handle {handle}"))
}

fn null_on(op: &str, e: SdkError) -> Handle {
    tracing::error!(op, error = %e, "environment creation failed");
    Handle::NULL
}

fn report(handle: Handle, op: &str, result: Result<(), SdkError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(%handle, op, error = %e, "sdk call failed");
            false
        }
    }
}
