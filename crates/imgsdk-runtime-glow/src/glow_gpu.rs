use std::ffi::c_void;
use std::fmt;

use glow::HasContext;
use imgsdk_core::ShaderStage;

use crate::gpu::{
    BufferId, FramebufferId, Gpu, GpuInfo, PixelLayout, ProgramId, ShaderId, TextureId,
    UniformLocation,
};

type ValidateProgramFn = unsafe extern "system" fn(program: u32);
type GetProgramivFn = unsafe extern "system" fn(program: u32, pname: u32, params: *mut i32);

/// [`Gpu`] over a `glow` context.
///
/// glow does not wrap `glValidateProgram`, so those two entry points are resolved through
/// the same loader the context was built from. A driver that does not expose them is
/// treated as always-valid.
pub struct GlowGpu {
    gl: glow::Context,
    validate_program: Option<ValidateProgramFn>,
    get_programiv: Option<GetProgramivFn>,
}

impl fmt::Debug for GlowGpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowGpu")
            .field("validate_program", &self.validate_program.is_some())
            .finish_non_exhaustive()
    }
}

impl GlowGpu {
    /// # Safety
    /// A GLES 2.0 context must be current on this thread, and `loader` must return valid
    /// function pointers for that context (or null).
    pub unsafe fn from_loader_function<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let gl = glow::Context::from_loader_function(&mut loader);
        let validate = loader("glValidateProgram");
        let programiv = loader("glGetProgramiv");
        let validate_program = if validate.is_null() {
            None
        } else {
            Some(std::mem::transmute::<*const c_void, ValidateProgramFn>(validate))
        };
        let get_programiv = if programiv.is_null() {
            None
        } else {
            Some(std::mem::transmute::<*const c_void, GetProgramivFn>(programiv))
        };
        if validate_program.is_none() || get_programiv.is_none() {
            tracing::warn!("glValidateProgram unavailable; program validation is skipped");
        }
        Self {
            gl,
            validate_program,
            get_programiv,
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn shader(id: ShaderId) -> glow::NativeShader {
    glow::NativeShader(id.0)
}
fn program(id: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(id.0)
}
fn texture(id: TextureId) -> glow::NativeTexture {
    glow::NativeTexture(id.0)
}
fn framebuffer(id: FramebufferId) -> glow::NativeFramebuffer {
    glow::NativeFramebuffer(id.0)
}
fn buffer(id: BufferId) -> glow::NativeBuffer {
    glow::NativeBuffer(id.0)
}

// SAFETY (all methods): `GlowGpu` is only constructed while its context is current, and the
// environment drops every GL object before it releases that context.
impl Gpu for GlowGpu {
    fn info(&self) -> GpuInfo {
        unsafe {
            GpuInfo {
                version: self.gl.get_parameter_string(glow::VERSION),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                vendor: self.gl.get_parameter_string(glow::VENDOR),
            }
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, String> {
        let ty = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl.create_shader(ty).map(|s| ShaderId(s.0)) }
    }

    fn shader_source(&self, id: ShaderId, source: &str) {
        unsafe { self.gl.shader_source(shader(id), source) }
    }

    fn compile_shader(&self, id: ShaderId) {
        unsafe { self.gl.compile_shader(shader(id)) }
    }

    fn shader_compile_status(&self, id: ShaderId) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader(id)) }
    }

    fn shader_info_log(&self, id: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(shader(id)) }
    }

    fn delete_shader(&self, id: ShaderId) {
        unsafe { self.gl.delete_shader(shader(id)) }
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        unsafe { self.gl.create_program().map(|p| ProgramId(p.0)) }
    }

    fn attach_shader(&self, p: ProgramId, s: ShaderId) {
        unsafe { self.gl.attach_shader(program(p), shader(s)) }
    }

    fn detach_shader(&self, p: ProgramId, s: ShaderId) {
        unsafe { self.gl.detach_shader(program(p), shader(s)) }
    }

    fn link_program(&self, p: ProgramId) {
        unsafe { self.gl.link_program(program(p)) }
    }

    fn program_link_status(&self, p: ProgramId) -> bool {
        unsafe { self.gl.get_program_link_status(program(p)) }
    }

    fn validate_program(&self, p: ProgramId) {
        if let Some(f) = self.validate_program {
            unsafe { f(p.get()) }
        }
    }

    fn program_validate_status(&self, p: ProgramId) -> bool {
        let Some(f) = self.get_programiv else {
            return true;
        };
        let mut status = 0i32;
        unsafe { f(p.get(), glow::VALIDATE_STATUS, &mut status) };
        status != 0
    }

    fn program_info_log(&self, p: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(program(p)) }
    }

    fn delete_program(&self, p: ProgramId) {
        unsafe { self.gl.delete_program(program(p)) }
    }

    fn use_program(&self, p: Option<ProgramId>) {
        unsafe { self.gl.use_program(p.map(program)) }
    }

    fn attrib_location(&self, p: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program(p), name) }
    }

    fn uniform_location(&self, p: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(program(p), name)
                .map(|l| UniformLocation(l.0))
        }
    }

    fn uniform_1_i32(&self, location: UniformLocation, value: i32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_i32(Some(&loc), value) }
    }

    fn uniform_4_f32(&self, location: UniformLocation, v: [f32; 4]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_4_f32(Some(&loc), v[0], v[1], v[2], v[3]) }
    }

    fn create_texture(&self) -> Result<TextureId, String> {
        unsafe { self.gl.create_texture().map(|t| TextureId(t.0)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, t: Option<TextureId>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, t.map(texture)) }
    }

    fn tex_parameter_i32(&self, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, parameter, value) }
    }

    fn pixel_store_unpack_alignment(&self, alignment: i32) {
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment) }
    }

    fn tex_image_2d(&self, width: i32, height: i32, layout: PixelLayout, pixels: Option<&[u8]>) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                layout.internal_format,
                width,
                height,
                0,
                layout.format,
                layout.ty,
                pixels,
            )
        }
    }

    fn delete_texture(&self, t: TextureId) {
        unsafe { self.gl.delete_texture(texture(t)) }
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        unsafe { self.gl.create_framebuffer().map(|f| FramebufferId(f.0)) }
    }

    fn bind_framebuffer(&self, f: Option<FramebufferId>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, f.map(framebuffer)) }
    }

    fn framebuffer_texture_2d(&self, t: Option<TextureId>) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                t.map(texture),
                0,
            )
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) }
    }

    fn delete_framebuffer(&self, f: FramebufferId) {
        unsafe { self.gl.delete_framebuffer(framebuffer(f)) }
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        unsafe { self.gl.create_buffer().map(|b| BufferId(b.0)) }
    }

    fn bind_array_buffer(&self, b: Option<BufferId>) {
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, b.map(buffer)) }
    }

    fn buffer_data_static(&self, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW)
        }
    }

    fn delete_buffer(&self, b: BufferId) {
        unsafe { self.gl.delete_buffer(buffer(b)) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset)
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, c: [f32; 4]) {
        unsafe { self.gl.clear_color(c[0], c[1], c[2], c[3]) }
    }

    fn clear(&self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn finish(&self) {
        unsafe { self.gl.finish() }
    }

    fn read_pixels_rgba(&self, x: i32, y: i32, width: i32, height: i32, dst: &mut [u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(dst),
            )
        }
    }

    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }
}
