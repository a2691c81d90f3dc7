use std::rc::Rc;

use imgsdk_core::{SdkError, ShaderStage};
use imgsdk_runtime_glow::shaders::{PASSTHROUGH_FRAG, PASSTHROUGH_VERT};
use imgsdk_runtime_glow::{
    compile_shader, create_program, FullscreenQuad, RenderTarget, Texture, STANDARD_LOCATIONS,
};

use crate::{FakeGpu, FAIL_COMPILE_MARKER};

fn broken(src: &str) -> String {
    format!("{FAIL_COMPILE_MARKER}\n{src}")
}

#[test]
fn empty_source_is_rejected_before_any_gl_call() {
    let gpu = Rc::new(FakeGpu::new());
    let err = compile_shader(&gpu, ShaderStage::Vertex, "  \n").expect_err("empty source");
    assert!(matches!(err, SdkError::InvalidSource(ShaderStage::Vertex)));
    assert_eq!(gpu.state().borrow().calls, 0);
}

#[test]
fn failed_compile_deletes_the_shader_and_reports_the_log() {
    let gpu = Rc::new(FakeGpu::new());
    let err = compile_shader(&gpu, ShaderStage::Fragment, &broken(PASSTHROUGH_FRAG))
        .expect_err("compile must fail");
    match err {
        SdkError::CompileError { stage, log } => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(log.contains("error"), "log: {log}");
        }
        other => panic!("unexpected {other:?}"),
    }
    let st = gpu.state();
    let st = st.borrow();
    assert_eq!(st.live_objects(), 0);
    assert_eq!(st.deleted_shaders, 1);
}

#[test]
fn fragment_failure_releases_the_vertex_shader() {
    let gpu = Rc::new(FakeGpu::new());
    let err = create_program(&gpu, PASSTHROUGH_VERT, &broken(PASSTHROUGH_FRAG))
        .expect_err("fragment must fail");
    assert!(matches!(
        err,
        SdkError::CompileError {
            stage: ShaderStage::Fragment,
            ..
        }
    ));
    let st = gpu.state();
    let st = st.borrow();
    assert_eq!(st.live_objects(), 0);
    assert_eq!(st.deleted_shaders, 2);
    assert_eq!(st.deleted_programs, 0, "no program was created");
}

#[test]
fn link_failure_releases_program_and_shaders() {
    let gpu = Rc::new(FakeGpu::new());
    gpu.state().borrow_mut().fail_link = true;
    let err = create_program(&gpu, PASSTHROUGH_VERT, PASSTHROUGH_FRAG).expect_err("link");
    assert!(matches!(err, SdkError::LinkError(_)), "got {err:?}");

    let st = gpu.state();
    let st = st.borrow();
    assert_eq!(st.live_objects(), 0);
    assert_eq!((st.deleted_shaders, st.deleted_programs), (2, 1));
}

#[test]
fn validation_failure_releases_program_and_shaders() {
    let gpu = Rc::new(FakeGpu::new());
    gpu.state().borrow_mut().fail_validate = true;
    let err = create_program(&gpu, PASSTHROUGH_VERT, PASSTHROUGH_FRAG).expect_err("validate");
    assert!(matches!(err, SdkError::ValidationError(_)), "got {err:?}");
    assert_eq!(gpu.state().borrow().live_objects(), 0);
}

#[test]
fn linked_program_resolves_standard_locations_and_cleans_up() {
    let gpu = Rc::new(FakeGpu::new());
    {
        let mut program =
            create_program(&gpu, PASSTHROUGH_VERT, PASSTHROUGH_FRAG).expect("program");
        assert_eq!(program.resolve_locations(&STANDARD_LOCATIONS), 0);
        assert!(program.attribute("aPosition").is_some());
        assert!(program.uniform("uSampler2D").is_some());
        assert!(program.uniform("uNotThere").is_none());
        assert_eq!(gpu.state().borrow().live_objects(), 3);
    }
    let st = gpu.state();
    let st = st.borrow();
    assert_eq!(st.live_objects(), 0);
    assert_eq!((st.deleted_shaders, st.deleted_programs), (2, 1));
}

#[test]
fn gl_wrappers_delete_on_drop() {
    let gpu = Rc::new(FakeGpu::new());
    {
        let _quad = FullscreenQuad::new(&gpu).expect("quad");
        let _tex = Texture::new(&gpu).expect("texture");
        let target = RenderTarget::new(&gpu, 8, 4).expect("target");
        assert_eq!((target.width(), target.height()), (8, 4));
        assert_eq!(gpu.state().borrow().live_objects(), 4);
    }
    assert_eq!(gpu.state().borrow().live_objects(), 0);
}

#[test]
fn incomplete_target_is_not_created() {
    let gpu = Rc::new(FakeGpu::new());
    gpu.state().borrow_mut().framebuffer_status =
        Some(imgsdk_runtime_glow::glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
    let err = RenderTarget::new(&gpu, 8, 8).expect_err("incomplete");
    assert!(matches!(err, SdkError::FramebufferIncomplete(_)));
    assert_eq!(gpu.state().borrow().live_objects(), 0);
}
