use std::cell::Cell;
use std::rc::Rc;

use imgsdk::{handle_app_event, AppEvent, RenderMode, SdkEnv, Stage};
use imgsdk_core::SdkError;
use imgsdk_runtime_glow::BuiltinShaders;

use crate::{android_window, FakeEgl};

fn blank(egl: &FakeEgl) -> SdkEnv<FakeEgl> {
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env
}

#[test]
fn window_lifecycle_builds_draws_and_tears_down() {
    let egl = FakeEgl::new();
    let mut env = blank(&egl);

    handle_app_event(&mut env, AppEvent::WindowCreated(android_window(48, 24)))
        .expect("window created");
    assert_eq!(env.stage(), Stage::Ready);
    assert_eq!(env.render_mode(), Some(RenderMode::Windowed));
    assert_eq!(env.native_window().map(|w| (w.width, w.height)), Some((48, 24)));

    handle_app_event(&mut env, AppEvent::GainedFocus).expect("focus");
    handle_app_event(&mut env, AppEvent::LostFocus).expect("lost focus");
    handle_app_event(&mut env, AppEvent::SaveState).expect("save state");
    assert_eq!(egl.egl().borrow().swaps, 1, "only focus renders");

    handle_app_event(&mut env, AppEvent::WindowDestroyed).expect("window destroyed");
    assert_eq!(env.stage(), Stage::Destroyed);
    assert_eq!(egl.egl().borrow().live_objects(), 0);
    assert_eq!(egl.gpu().borrow().live_objects(), 0);
}

#[test]
fn destroy_callback_runs_before_teardown() {
    let egl = FakeEgl::new();
    let mut env = blank(&egl);
    let saw_ready = Rc::new(Cell::new(false));
    let flag = Rc::clone(&saw_ready);
    env.set_on_destroy(move |env| flag.set(env.is_ready()));

    handle_app_event(&mut env, AppEvent::WindowCreated(android_window(8, 8)))
        .expect("window created");
    handle_app_event(&mut env, AppEvent::WindowDestroyed).expect("window destroyed");
    assert!(saw_ready.get());
}

#[test]
fn second_window_on_a_live_environment_is_refused() {
    let egl = FakeEgl::new();
    let mut env = blank(&egl);
    handle_app_event(&mut env, AppEvent::WindowCreated(android_window(8, 8)))
        .expect("window created");

    let err = handle_app_event(&mut env, AppEvent::WindowCreated(android_window(8, 8)))
        .expect_err("already initialized");
    assert!(matches!(err, SdkError::AlreadyInitialized));
    assert_eq!(egl.egl().borrow().live_surfaces, 1);
}

#[test]
fn focus_before_window_is_harmless() {
    let egl = FakeEgl::new();
    let mut env = blank(&egl);
    handle_app_event(&mut env, AppEvent::GainedFocus).expect("no callbacks yet");
    assert_eq!(env.stage(), Stage::Blank);
    assert_eq!(egl.gpu().borrow().calls, 0);
}
