use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use imgsdk::{Handle, SdkRegistry, Stage};
use imgsdk_core::SdkError;
use imgsdk_runtime_glow::BuiltinShaders;

use crate::{android_window, temp_path, write_png, EglStep, FakeEgl};

#[test]
fn handles_are_never_null_and_failures_return_null() {
    let mut reg = SdkRegistry::new();
    let a = reg.create(0, FakeEgl::new(), BuiltinShaders);
    let b = reg.create(1, FakeEgl::new(), BuiltinShaders);
    assert!(!a.is_null() && !b.is_null());
    assert_ne!(a, b);

    assert_eq!(reg.create(9, FakeEgl::new(), BuiltinShaders), Handle::NULL);
    assert_eq!(
        reg.create(0, FakeEgl::failing_at(EglStep::ChooseConfig), BuiltinShaders),
        Handle::NULL
    );
    assert_eq!(reg.len(), 2);
}

#[test]
fn execute_saves_and_reports_the_output_path() {
    let (input, expected) = write_png("api_in", 12, 9);
    let output = temp_path("api_out", "png");
    let mut reg = SdkRegistry::new();
    let h = reg.create(0, FakeEgl::new(), BuiltinShaders);

    assert!(reg.set_input_path(h, &input));
    assert!(reg.set_output_path(h, &output));
    assert!(reg.set_effect_command(h, r#"{"effect":"Normal"}"#));

    let seen: RefCell<Option<PathBuf>> = RefCell::new(None);
    assert!(reg.execute(
        h,
        Some(Box::new(|p: Option<&Path>| {
            *seen.borrow_mut() = p.map(Path::to_path_buf)
        }))
    ));
    assert_eq!(seen.into_inner(), Some(output.clone()));

    let env = reg.env(h).expect("env");
    assert_eq!(env.active_bitmap().map(|b| b.bytes().to_vec()), Some(expected.into_bytes()));

    let _ = fs::remove_file(input);
    let _ = fs::remove_file(output);
}

#[test]
fn failed_execute_skips_the_callback() {
    let mut reg = SdkRegistry::new();
    let h = reg.create(0, FakeEgl::new(), BuiltinShaders);
    let mut called = false;
    let err = reg
        .try_execute(h, Some(Box::new(|_: Option<&Path>| called = true)))
        .expect_err("nothing to draw");
    assert!(matches!(err, SdkError::NoInputConfigured));
    assert!(!called);
    assert!(!reg.execute(h, None));
}

#[test]
fn execute_without_output_path_only_draws() {
    let (input, _) = write_png("api_draw_only", 4, 4);
    let mut reg = SdkRegistry::new();
    let h = reg.create(0, FakeEgl::new(), BuiltinShaders);
    reg.try_set_effect_command(h, &input.to_string_lossy())
        .expect("command");
    assert_eq!(reg.try_execute(h, None).expect("execute"), None);
    let _ = fs::remove_file(input);
}

#[test]
fn destroy_forgets_the_handle() {
    let egl = FakeEgl::new();
    let mut reg = SdkRegistry::new();
    let h = reg.create(0, egl.clone(), BuiltinShaders);

    reg.destroy(h);
    assert!(!reg.contains(h));
    assert!(reg.is_empty());
    assert_eq!(egl.egl().borrow().live_objects(), 0);
    assert_eq!(egl.gpu().borrow().live_objects(), 0);

    assert!(matches!(reg.try_destroy(h), Err(SdkError::InvalidArgument(_))));
    reg.destroy(h);
    assert!(!reg.set_input_path(Handle::NULL, "x.png"));
}

#[test]
fn windowed_create_renders_one_frame() {
    let egl = FakeEgl::new();
    let mut reg = SdkRegistry::new();
    let h = reg.create_windowed(0, egl.clone(), BuiltinShaders, android_window(64, 32));
    assert!(!h.is_null());
    assert_eq!(egl.egl().borrow().swaps, 1);
    assert_eq!(reg.env(h).map(|e| e.stage()).ok(), Some(Stage::Ready));

    let bad = reg.create_windowed(
        0,
        FakeEgl::new().with_surface_size(1, 1),
        BuiltinShaders,
        android_window(64, 32),
    );
    assert!(bad.is_null());
}

#[test]
fn other_threads_are_refused() {
    let egl = FakeEgl::new();
    let mut reg = SdkRegistry::new();
    let h = reg.create(0, egl.clone(), BuiltinShaders);

    let mut reg = std::thread::spawn(move || {
        let mut reg = reg;
        assert!(matches!(reg.env(h).map(|_| ()), Err(SdkError::WrongThread)));
        assert!(matches!(
            reg.try_set_input_path(h, "x.png"),
            Err(SdkError::WrongThread)
        ));
        assert!(matches!(reg.try_destroy(h), Err(SdkError::WrongThread)));
        assert!(!reg.execute(h, None));
        reg
    })
    .join()
    .expect("worker thread");

    assert!(reg.contains(h), "a refused destroy keeps the entry");
    reg.try_destroy(h).expect("owner thread may destroy");
    assert_eq!(egl.egl().borrow().live_objects(), 0);
}
