//! Native application lifecycle glue.

use imgsdk_core::SdkError;
use imgsdk_host_egl::{EglBackend, NativeWindow};

use crate::env::{sdk_main, SdkEnv};

/// Events a native activity delivers to the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    WindowCreated(NativeWindow),
    WindowDestroyed,
    GainedFocus,
    LostFocus,
    SaveState,
}

/// Drives `env` from one lifecycle event.
///
/// A new window initializes the environment on it and runs [`sdk_main`]; losing the window
/// tears it down; regaining focus renders a frame.
pub fn handle_app_event<B: EglBackend + 'static>(
    env: &mut SdkEnv<B>,
    event: AppEvent,
) -> Result<(), SdkError> {
    match event {
        AppEvent::WindowCreated(window) => {
            tracing::info!(width = window.width, height = window.height, "window created");
            env.set_native_window(window)?;
            env.init()?;
            sdk_main(env);
        }
        AppEvent::WindowDestroyed => {
            tracing::info!("window destroyed");
            env.notify_destroy();
            env.destroy();
        }
        AppEvent::GainedFocus => env.notify_draw(),
        AppEvent::LostFocus | AppEvent::SaveState => {
            tracing::debug!(?event, "lifecycle event ignored");
        }
    }
    Ok(())
}
