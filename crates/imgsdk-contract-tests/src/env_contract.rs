use std::fs;

use imgsdk::{ActiveSource, RenderMode, SdkEnv, Stage};
use imgsdk_core::{ImageCodec, MemoryAssets, PixelFormat, SdkConfig, SdkError};
use imgsdk_runtime_glow::{glow, BuiltinShaders};

use crate::{android_window, temp_path, write_png, CountingCodec, EglStep, FakeEgl};

fn ready_env(egl: &FakeEgl, codec: &CountingCodec) -> SdkEnv<FakeEgl> {
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env.set_codec(codec.clone());
    env.init().expect("init off-screen");
    env
}

// ---- Construction and init ----

#[test]
fn unknown_platform_is_rejected() {
    let err = SdkEnv::new_blank(7, FakeEgl::new()).expect_err("platform 7 must fail");
    assert!(matches!(err, SdkError::InvalidPlatform(7)), "got {err:?}");
}

#[test]
fn blank_environment_allocates_and_releases_nothing() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(1, egl.clone()).expect("blank env");
    assert_eq!(env.stage(), Stage::Blank);

    env.destroy();
    env.destroy();
    assert_eq!(env.stage(), Stage::Destroyed);
    assert_eq!(egl.gpu().borrow().calls, 0, "blank destroy must not touch GL");
    assert_eq!(egl.egl().borrow().live_objects(), 0);
}

#[test]
fn default_environment_is_ready_off_screen() {
    let egl = FakeEgl::new();
    let env = SdkEnv::new_default(egl.clone(), BuiltinShaders).expect("default env");

    assert!(env.is_ready());
    assert_eq!(env.render_mode(), Some(RenderMode::Offscreen));
    assert_eq!(env.surface_size(), Some((2048, 2048)));
    assert_eq!(env.canvas_size(), (0, 0), "canvas waits for the first image");
    assert!(env.render_target().is_some());
    assert!(env.source_texture().is_some());
    assert!(env.gpu_info().is_some_and(|i| i.renderer == "FakeGpu"));

    let gpu = egl.gpu();
    let st = gpu.borrow();
    assert_eq!(st.shaders.len(), 2);
    assert_eq!(st.programs.len(), 1);
    // source texture + render target texture
    assert_eq!(st.textures.len(), 2);
    assert_eq!(st.framebuffers.len(), 1);
    assert_eq!(st.buffers.len(), 1);
    let egl_state = egl.egl();
    let es = egl_state.borrow();
    assert_eq!((es.live_displays, es.live_surfaces, es.live_contexts), (1, 1, 1));
    assert_eq!(es.last_request.map(|r| r.alpha_bits), Some(8));
}

#[test]
fn config_caps_the_pbuffer() {
    let egl = FakeEgl::new();
    let cfg = SdkConfig {
        max_surface_width: 512,
        max_surface_height: 256,
        ..SdkConfig::default()
    };
    let env = SdkEnv::new_default_with_config(egl, BuiltinShaders, cfg).expect("env");
    assert_eq!(env.surface_size(), Some((512, 256)));
    assert_eq!(env.config().max_surface_width, 512);
}

#[test]
fn destroy_releases_everything_in_order_and_is_idempotent() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_default(egl.clone(), BuiltinShaders).expect("default env");
    env.destroy();

    assert_eq!(env.stage(), Stage::Destroyed);
    assert_eq!(egl.gpu().borrow().live_objects(), 0);
    assert_eq!(egl.egl().borrow().live_objects(), 0);

    let calls = egl.gpu().borrow().calls;
    env.destroy();
    assert_eq!(egl.gpu().borrow().calls, calls, "second destroy must be a no-op");
}

#[test]
fn dropping_a_ready_environment_releases_everything() {
    let egl = FakeEgl::new();
    {
        let _env = SdkEnv::new_default(egl.clone(), BuiltinShaders).expect("default env");
    }
    assert_eq!(egl.gpu().borrow().live_objects(), 0);
    assert_eq!(egl.egl().borrow().live_objects(), 0);
}

#[test]
fn init_guards_its_preconditions() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    assert!(matches!(env.init(), Err(SdkError::MissingPlatformData)));
    assert_eq!(env.stage(), Stage::Blank);

    env.set_platform_data(BuiltinShaders);
    env.init().expect("init");
    assert!(matches!(env.init(), Err(SdkError::AlreadyInitialized)));
    assert!(matches!(
        env.set_native_window(android_window(10, 10)),
        Err(SdkError::AlreadyInitialized)
    ));

    env.destroy();
    assert!(matches!(env.init(), Err(SdkError::NotReady)));
    assert!(matches!(
        env.set_native_window(android_window(10, 10)),
        Err(SdkError::NotReady)
    ));
}

#[test]
fn failure_at_any_egl_step_leaves_nothing_allocated() {
    for step in EglStep::ALL {
        let egl = FakeEgl::failing_at(step);
        let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
        env.set_platform_data(BuiltinShaders);

        let err = env.init().expect_err("init must fail");
        assert!(
            err.is_surface_error() || matches!(err, SdkError::GlCreate(_)),
            "{step:?}: unexpected {err:?}"
        );
        assert_eq!(env.stage(), Stage::Blank, "{step:?}");
        assert_eq!(egl.egl().borrow().live_objects(), 0, "{step:?} leaked egl objects");
        assert_eq!(egl.gpu().borrow().live_objects(), 0, "{step:?} leaked gl objects");
    }
}

#[test]
fn missing_shader_asset_unwinds_partial_init() {
    let egl = FakeEgl::new();
    let assets =
        MemoryAssets::new().with("vert.shdr", imgsdk_runtime_glow::shaders::PASSTHROUGH_VERT);
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(assets);

    let err = env.init().expect_err("frag.shdr is missing");
    assert!(matches!(&err, SdkError::AssetNotFound(n) if n == "frag.shdr"), "got {err:?}");
    assert_eq!(env.stage(), Stage::Blank);
    assert_eq!(egl.egl().borrow().live_objects(), 0);
    assert_eq!(egl.gpu().borrow().live_objects(), 0);
}

#[test]
fn window_surface_must_match_window_size() {
    let egl = FakeEgl::new().with_surface_size(100, 100);
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env.set_native_window(android_window(200, 100)).expect("window");

    let err = env.init().expect_err("size mismatch must fail");
    assert!(
        matches!(
            err,
            SdkError::SurfaceSizeMismatch {
                surface: (100, 100),
                window: (200, 100)
            }
        ),
        "got {err:?}"
    );
    assert_eq!(egl.egl().borrow().live_objects(), 0);
}

// ---- Effect commands ----

#[test]
fn commands_require_a_ready_environment() {
    let mut env = SdkEnv::new_blank(0, FakeEgl::new()).expect("blank env");
    assert!(matches!(env.set_effect_command("a.png"), Err(SdkError::NotReady)));
    env.set_input_path("a.png").expect("paths are allowed while blank");
    assert_eq!(env.input_path(), Some(std::path::Path::new("a.png")));
}

#[test]
fn repeating_a_command_does_not_decode_or_upload_again() {
    let (input, _) = write_png("repeat", 16, 8);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    let cmd = input.to_string_lossy().into_owned();

    env.set_effect_command(&cmd).expect("first command");
    env.set_effect_command(&cmd).expect("same command");

    assert_eq!(codec.decodes(), 1);
    assert_eq!(egl.gpu().borrow().uploads, 1);
    assert_eq!(env.effect_command(), Some(cmd.as_str()));

    let _ = fs::remove_file(input);
}

#[test]
fn a_new_image_path_decodes_and_uploads_once() {
    let (a, _) = write_png("first", 16, 8);
    let (b, _) = write_png("second", 4, 4);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);

    env.set_effect_command(&a.to_string_lossy()).expect("a");
    env.set_effect_command(&b.to_string_lossy()).expect("b");

    assert_eq!(codec.decodes(), 2);
    assert_eq!(egl.gpu().borrow().uploads, 2);
    assert_eq!(env.input_path(), Some(b.as_path()));
    assert_eq!(env.canvas_size(), (4, 4));
    assert_eq!(env.render_target().map(|t| (t.width(), t.height())), Some((4, 4)));

    let _ = fs::remove_file(a);
    let _ = fs::remove_file(b);
}

#[test]
fn gpu_failure_during_a_command_stores_nothing_and_can_be_retried() {
    let (input, expected) = write_png("gpu_fail", 8, 8);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    let cmd = input.to_string_lossy().into_owned();

    egl.gpu().borrow_mut().framebuffer_status = Some(glow::FRAMEBUFFER_UNSUPPORTED);
    let err = env.set_effect_command(&cmd).expect_err("resize must fail");
    assert!(
        matches!(err, SdkError::FramebufferIncomplete(s) if s == glow::FRAMEBUFFER_UNSUPPORTED),
        "got {err:?}"
    );
    assert_eq!(env.effect_command(), None);
    assert!(env.active_bitmap().is_none());
    assert_eq!(env.canvas_size(), (0, 0));

    egl.gpu().borrow_mut().framebuffer_status = None;
    env.set_effect_command(&cmd).expect("retry");
    assert_eq!(codec.decodes(), 2, "the retry decodes again");
    assert_eq!(env.effect_command(), Some(cmd.as_str()));
    assert_eq!(env.canvas_size(), (8, 8));

    env.draw().expect("draw after retry");
    let pixels = env.read_pixels().expect("readback");
    assert_eq!(pixels.bytes(), expected.bytes());

    let _ = fs::remove_file(input);
}

#[test]
fn repeated_effect_json_renders_a_newly_set_input() {
    let (a, _) = write_png("switch_a", 8, 8);
    let (b, expected_b) = write_png("switch_b", 4, 4);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    let cmd = r#"{"effect":"Normal"}"#;

    env.set_input_path(&a).expect("input a");
    env.set_effect_command(cmd).expect("render a");
    env.set_input_path(&b).expect("input b");
    env.set_effect_command(cmd).expect("render b");

    assert_eq!(codec.decodes(), 2);
    assert_eq!(env.input_path(), Some(b.as_path()));
    assert_eq!(env.canvas_size(), (4, 4));

    env.draw().expect("draw");
    let pixels = env.read_pixels().expect("readback");
    assert_eq!((pixels.width(), pixels.height()), (4, 4));
    assert_eq!(pixels.bytes(), expected_b.bytes());

    let _ = fs::remove_file(a);
    let _ = fs::remove_file(b);
}

#[test]
fn effect_json_renders_the_configured_input() {
    let (input, _) = write_png("json_input", 8, 8);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);

    let err = env
        .set_effect_command(r#"{"effect":"Normal"}"#)
        .expect_err("no input yet");
    assert!(matches!(err, SdkError::NoInputConfigured));

    env.set_input_path(&input).expect("input");
    env.set_effect_command(r#"{"effect":"Rotate","degree":90}"#)
        .expect("rotate");
    let desc = env.effect_descriptor().expect("descriptor stored");
    assert_eq!(desc.param("degree"), Some(90));
    assert_eq!(codec.decodes(), 1);

    let _ = fs::remove_file(input);
}

#[test]
fn rejected_commands_leave_the_state_alone() {
    let (input, _) = write_png("rejected", 8, 8);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    let cmd = input.to_string_lossy().into_owned();
    env.set_effect_command(&cmd).expect("path");

    assert!(matches!(
        env.set_effect_command(r#"{"effect":"Eye"}"#),
        Err(SdkError::NotImplemented(_))
    ));
    assert!(matches!(
        env.set_effect_command(r#"{"effect":"Sepia"}"#),
        Err(SdkError::InvalidCommand(_))
    ));
    assert!(matches!(
        env.set_effect_command("/does/not/exist.png"),
        Err(SdkError::Codec(_))
    ));
    assert_eq!(env.effect_command(), Some(cmd.as_str()));
    assert_eq!(egl.gpu().borrow().uploads, 1);

    let _ = fs::remove_file(input);
}

// ---- Draw, readback, save ----

#[test]
fn draw_before_init_touches_nothing() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    assert!(matches!(env.draw(), Err(SdkError::NotReady)));
    assert_eq!(egl.gpu().borrow().calls, 0);
}

#[test]
fn off_screen_draw_without_an_image_is_refused() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_default(egl.clone(), BuiltinShaders).expect("env");
    let calls = egl.gpu().borrow().calls;
    assert!(matches!(env.draw(), Err(SdkError::NoInputConfigured)));
    assert_eq!(egl.gpu().borrow().calls, calls, "no GL calls on refusal");
}

#[test]
fn incomplete_framebuffer_aborts_the_draw() {
    let (input, _) = write_png("incomplete", 8, 8);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    env.set_effect_command(&input.to_string_lossy()).expect("path");

    egl.gpu().borrow_mut().framebuffer_status = Some(glow::FRAMEBUFFER_UNSUPPORTED);
    let err = env.draw().expect_err("draw must abort");
    assert!(
        matches!(err, SdkError::FramebufferIncomplete(s) if s == glow::FRAMEBUFFER_UNSUPPORTED),
        "got {err:?}"
    );
    assert_eq!(egl.gpu().borrow().draws, 0);

    let _ = fs::remove_file(input);
}

#[test]
fn pass_through_render_reproduces_the_input() {
    let (input, expected) = write_png("roundtrip_in", 64, 64);
    let output = temp_path("roundtrip_out", "png");
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);

    env.set_output_path(&output).expect("output");
    env.set_effect_command(&input.to_string_lossy()).expect("input");
    env.draw().expect("draw");
    assert_eq!(egl.gpu().borrow().last_viewport, Some((0, 0, 64, 64)));

    let pixels = env.read_pixels().expect("readback");
    assert_eq!(pixels.format(), PixelFormat::Rgba32);
    assert_eq!(pixels.bytes(), expected.bytes());
    assert_eq!(env.active_source(), ActiveSource::Readback);

    let saved = env.save_output().expect("save");
    assert_eq!(saved, output);
    let written = imgsdk::StandardCodec::default()
        .decode(&output)
        .expect("decode output");
    assert_eq!(written.bytes(), expected.bytes());
    assert_eq!(codec.encodes(), 1);

    let _ = fs::remove_file(input);
    let _ = fs::remove_file(output);
}

#[test]
fn save_output_needs_a_path_and_a_bitmap() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_default(egl, BuiltinShaders).expect("env");
    assert!(matches!(env.save_output(), Err(SdkError::InvalidArgument(_))));
    env.set_output_path(temp_path("never_written", "png")).expect("output");
    assert!(matches!(env.save_output(), Err(SdkError::NoInputConfigured)));
}

#[test]
fn windowed_draw_presents_and_refuses_readback() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env.set_native_window(android_window(320, 240)).expect("window");
    env.init().expect("windowed init");

    assert_eq!(env.render_mode(), Some(RenderMode::Windowed));
    assert_eq!(env.canvas_size(), (320, 240));
    assert!(env.render_target().is_none());
    assert_eq!(egl.egl().borrow().last_request.map(|r| r.alpha_bits), Some(0));

    env.draw().expect("clear-only draw");
    assert_eq!(egl.egl().borrow().swaps, 1);
    assert_eq!(egl.gpu().borrow().draws, 0, "no image, so no quad");
    assert!(matches!(env.read_pixels(), Err(SdkError::InvalidArgument(_))));
}

#[test]
fn failed_swap_is_reported_as_a_present_failure() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env.set_native_window(android_window(64, 64)).expect("window");
    env.init().expect("windowed init");

    egl.egl().borrow_mut().fail_swap = true;
    let err = env.draw().expect_err("swap fails");
    assert!(matches!(err, SdkError::PresentFailed(_)), "got {err:?}");
    assert!(!err.is_surface_error());
    assert!(env.is_ready(), "a failed present keeps the surface");

    egl.egl().borrow_mut().fail_swap = false;
    env.present().expect("present recovers");
    assert_eq!(egl.egl().borrow().swaps, 1);
}

// ---- Callbacks ----

#[test]
fn sdk_main_installs_default_callbacks() {
    let egl = FakeEgl::new();
    let mut env = SdkEnv::new_blank(0, egl.clone()).expect("blank env");
    env.set_platform_data(BuiltinShaders);
    env.set_native_window(android_window(32, 32)).expect("window");
    env.init().expect("init");

    imgsdk::sdk_main(&mut env);
    env.notify_draw();
    env.notify_draw();
    assert_eq!(egl.egl().borrow().swaps, 2);
}

#[test]
fn custom_callbacks_survive_sdk_main() {
    use std::cell::Cell;
    use std::rc::Rc;

    let created = Rc::new(Cell::new(0));
    let seen = Rc::clone(&created);
    let mut env = SdkEnv::new_default(FakeEgl::new(), BuiltinShaders).expect("env");
    env.set_on_create(move |env| {
        assert!(env.is_ready());
        seen.set(seen.get() + 1);
    });

    imgsdk::sdk_main(&mut env);
    env.notify_create();
    assert_eq!(created.get(), 2);

    env.destroy();
    env.notify_create();
    assert_eq!(created.get(), 2, "destroy drops the callbacks");
}

#[test]
fn readback_failure_paths_report_not_ready() {
    let mut env = SdkEnv::new_blank(0, FakeEgl::new()).expect("blank env");
    assert!(matches!(env.read_pixels(), Err(SdkError::NotReady)));
    env.destroy();
    assert!(matches!(env.set_input_path("x.png"), Err(SdkError::NotReady)));
}

#[test]
fn canvas_follows_each_new_image() {
    let (wide, _) = write_png("wide", 40, 10);
    let egl = FakeEgl::new();
    let codec = CountingCodec::new();
    let mut env = ready_env(&egl, &codec);
    env.set_effect_command(&wide.to_string_lossy()).expect("wide");
    env.draw().expect("draw");

    assert_eq!(env.canvas_size(), (40, 10));
    assert_eq!(egl.gpu().borrow().last_viewport, Some((0, 0, 40, 10)));
    let bitmap = env.active_bitmap().expect("bitmap");
    assert_eq!((bitmap.width(), bitmap.height()), (40, 10));

    let _ = fs::remove_file(wide);
}
