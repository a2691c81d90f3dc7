//! Scriptable `EglBackend`: any setup step can be made to fail, and every display, surface
//! and context it hands out is counted until dropped.

use std::cell::RefCell;
use std::rc::Rc;

use imgsdk_core::SdkError;
use imgsdk_host_egl::{ConfigRequest, EglBackend, NativeWindow};

use crate::fake_gpu::{FakeGpu, GpuState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EglStep {
    OpenDisplay,
    ChooseConfig,
    CreateSurface,
    CreateContext,
    MakeCurrent,
    LoadGpu,
}

impl EglStep {
    pub const ALL: [EglStep; 6] = [
        EglStep::OpenDisplay,
        EglStep::ChooseConfig,
        EglStep::CreateSurface,
        EglStep::CreateContext,
        EglStep::MakeCurrent,
        EglStep::LoadGpu,
    ];

    fn error(self) -> SdkError {
        let msg = format!("{self:?} failed (fake)");
        match self {
            EglStep::OpenDisplay => SdkError::DisplayUnavailable(msg),
            EglStep::ChooseConfig => SdkError::ConfigSelectionFailed(msg),
            EglStep::CreateSurface => SdkError::SurfaceCreationFailed(msg),
            EglStep::CreateContext => SdkError::ContextCreationFailed(msg),
            EglStep::MakeCurrent => SdkError::MakeCurrentFailed(msg),
            EglStep::LoadGpu => SdkError::GlCreate(msg),
        }
    }
}

#[derive(Debug, Default)]
pub struct EglState {
    pub fail_at: Option<EglStep>,
    /// Reported surface size; defaults to the window size or the requested pbuffer size.
    pub surface_size: Option<(i32, i32)>,
    pub live_displays: usize,
    pub live_surfaces: usize,
    pub live_contexts: usize,
    pub current: bool,
    pub swaps: usize,
    /// Makes every window swap fail.
    pub fail_swap: bool,
    pub last_request: Option<ConfigRequest>,
}

impl EglState {
    pub fn live_objects(&self) -> usize {
        self.live_displays + self.live_surfaces + self.live_contexts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Display,
    Surface,
    Context,
}

/// One counted EGL object. Decrements its counter on drop.
#[derive(Debug)]
pub struct FakeObject {
    state: Rc<RefCell<EglState>>,
    kind: ObjectKind,
    size: (i32, i32),
    windowed: bool,
}

impl FakeObject {
    fn new(state: &Rc<RefCell<EglState>>, kind: ObjectKind) -> Self {
        {
            let mut st = state.borrow_mut();
            match kind {
                ObjectKind::Display => st.live_displays += 1,
                ObjectKind::Surface => st.live_surfaces += 1,
                ObjectKind::Context => st.live_contexts += 1,
            }
        }
        Self {
            state: Rc::clone(state),
            kind,
            size: (0, 0),
            windowed: false,
        }
    }
}

impl Drop for FakeObject {
    fn drop(&mut self) {
        let mut st = self.state.borrow_mut();
        match self.kind {
            ObjectKind::Display => st.live_displays -= 1,
            ObjectKind::Surface => st.live_surfaces -= 1,
            ObjectKind::Context => {
                st.live_contexts -= 1;
                st.current = false;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeEgl {
    state: Rc<RefCell<EglState>>,
    gpu: Rc<RefCell<GpuState>>,
}

impl FakeEgl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(step: EglStep) -> Self {
        let egl = Self::default();
        egl.state.borrow_mut().fail_at = Some(step);
        egl
    }

    pub fn with_surface_size(self, width: i32, height: i32) -> Self {
        self.state.borrow_mut().surface_size = Some((width, height));
        self
    }

    pub fn egl(&self) -> Rc<RefCell<EglState>> {
        Rc::clone(&self.state)
    }

    pub fn gpu(&self) -> Rc<RefCell<GpuState>> {
        Rc::clone(&self.gpu)
    }

    fn step(&self, step: EglStep) -> Result<(), SdkError> {
        if self.state.borrow().fail_at == Some(step) {
            return Err(step.error());
        }
        Ok(())
    }

    fn surface(&self, windowed: bool, size: (i32, i32)) -> FakeObject {
        let mut obj = FakeObject::new(&self.state, ObjectKind::Surface);
        obj.size = self.state.borrow().surface_size.unwrap_or(size);
        obj.windowed = windowed;
        obj
    }
}

impl EglBackend for FakeEgl {
    type Display = FakeObject;
    type Config = ConfigRequest;
    type Surface = FakeObject;
    type PendingContext = FakeObject;
    type Context = FakeObject;
    type Gpu = FakeGpu;

    fn open_display(&self) -> Result<FakeObject, SdkError> {
        self.step(EglStep::OpenDisplay)?;
        Ok(FakeObject::new(&self.state, ObjectKind::Display))
    }

    fn choose_config(
        &self,
        _display: &FakeObject,
        request: &ConfigRequest,
        _window: Option<&NativeWindow>,
    ) -> Result<ConfigRequest, SdkError> {
        self.step(EglStep::ChooseConfig)?;
        self.state.borrow_mut().last_request = Some(*request);
        Ok(*request)
    }

    fn create_window_surface(
        &self,
        _display: &FakeObject,
        _config: &ConfigRequest,
        window: &NativeWindow,
    ) -> Result<FakeObject, SdkError> {
        self.step(EglStep::CreateSurface)?;
        Ok(self.surface(true, (window.width, window.height)))
    }

    fn create_pbuffer_surface(
        &self,
        _display: &FakeObject,
        _config: &ConfigRequest,
        max_width: u32,
        max_height: u32,
    ) -> Result<FakeObject, SdkError> {
        self.step(EglStep::CreateSurface)?;
        Ok(self.surface(false, (max_width as i32, max_height as i32)))
    }

    fn create_context(
        &self,
        _display: &FakeObject,
        _config: &ConfigRequest,
        _request: &ConfigRequest,
        _window: Option<&NativeWindow>,
    ) -> Result<FakeObject, SdkError> {
        self.step(EglStep::CreateContext)?;
        Ok(FakeObject::new(&self.state, ObjectKind::Context))
    }

    fn make_current(&self, pending: FakeObject, _surface: &FakeObject) -> Result<FakeObject, SdkError> {
        self.step(EglStep::MakeCurrent)?;
        self.state.borrow_mut().current = true;
        Ok(pending)
    }

    fn release_current(&self, context: FakeObject) -> Result<(), SdkError> {
        drop(context);
        Ok(())
    }

    fn surface_size(&self, surface: &FakeObject) -> (i32, i32) {
        surface.size
    }

    fn swap_buffers(&self, surface: &FakeObject, _context: &FakeObject) -> Result<(), SdkError> {
        let mut st = self.state.borrow_mut();
        if !surface.windowed {
            return Ok(());
        }
        if st.fail_swap {
            return Err(SdkError::PresentFailed("injected swap failure".into()));
        }
        st.swaps += 1;
        Ok(())
    }

    unsafe fn load_gpu(&self, _display: &FakeObject) -> Result<FakeGpu, SdkError> {
        self.step(EglStep::LoadGpu)?;
        Ok(FakeGpu::from_state(Rc::clone(&self.gpu)))
    }
}
