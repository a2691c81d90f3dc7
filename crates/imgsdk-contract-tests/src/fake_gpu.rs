//! In-memory GLES 2.0 stand-in.
//!
//! Objects live in maps so tests can assert nothing leaks. Drawing is a pass-through copy of
//! the texture on unit 0 into the bound framebuffer's attachment, converted to RGBA8, which
//! is enough to check the pipeline end to end.

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::rc::Rc;

use imgsdk_core::ShaderStage;
use imgsdk_runtime_glow::glow;
use imgsdk_runtime_glow::{
    BufferId, FramebufferId, Gpu, GpuInfo, PixelLayout, ProgramId, ShaderId, TextureId,
    UniformLocation,
};

/// Marker that makes a shader source fail to compile.
pub const FAIL_COMPILE_MARKER: &str = "#error";

#[derive(Debug, Clone)]
pub struct FakeShader {
    pub stage: ShaderStage,
    pub source: String,
    pub compiled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeProgram {
    pub attached: Vec<u32>,
    pub linked: bool,
    pub validated: bool,
}

#[derive(Debug, Clone)]
pub struct FakeTexture {
    pub width: i32,
    pub height: i32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl Default for FakeTexture {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            layout: PixelLayout::RGBA,
            data: Vec::new(),
        }
    }
}

impl FakeTexture {
    fn rgba_at(&self, x: i32, y: i32) -> [u8; 4] {
        let bpp = self.layout.bytes_per_pixel();
        let i = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.data[i..i + bpp];
        match bpp {
            1 => [px[0], px[0], px[0], 255],
            2 => {
                let v = u16::from_ne_bytes([px[0], px[1]]);
                let r = ((v >> 11) & 0x1f) as u8;
                let g = ((v >> 5) & 0x3f) as u8;
                let b = (v & 0x1f) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
            }
            3 => [px[0], px[1], px[2], 255],
            _ => [px[0], px[1], px[2], px[3]],
        }
    }
}

/// Everything the fake knows, shared between the test and the code under test.
#[derive(Debug)]
pub struct GpuState {
    next_id: u32,
    pub shaders: HashMap<u32, FakeShader>,
    pub programs: HashMap<u32, FakeProgram>,
    pub textures: HashMap<u32, FakeTexture>,
    /// Framebuffer -> attached texture.
    pub framebuffers: HashMap<u32, Option<u32>>,
    pub buffers: HashMap<u32, Vec<u8>>,

    active_unit: u32,
    texture_units: HashMap<u32, u32>,
    bound_framebuffer: Option<u32>,
    bound_buffer: Option<u32>,
    current_program: Option<u32>,
    clear_color: [f32; 4],

    pub uploads: usize,
    pub draws: usize,
    pub clears: usize,
    pub finishes: usize,
    pub calls: usize,
    pub deleted_shaders: usize,
    pub deleted_programs: usize,
    pub deleted_textures: usize,
    pub deleted_framebuffers: usize,
    pub deleted_buffers: usize,
    pub last_viewport: Option<(i32, i32, i32, i32)>,

    pub fail_link: bool,
    pub fail_validate: bool,
    /// Forces `check_framebuffer_status` to report this value.
    pub framebuffer_status: Option<u32>,
}

impl Default for GpuState {
    fn default() -> Self {
        Self {
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            active_unit: 0,
            texture_units: HashMap::new(),
            bound_framebuffer: None,
            bound_buffer: None,
            current_program: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            uploads: 0,
            draws: 0,
            clears: 0,
            finishes: 0,
            calls: 0,
            deleted_shaders: 0,
            deleted_programs: 0,
            deleted_textures: 0,
            deleted_framebuffers: 0,
            deleted_buffers: 0,
            last_viewport: None,
            fail_link: false,
            fail_validate: false,
            framebuffer_status: None,
        }
    }
}

impl GpuState {
    fn alloc(&mut self) -> NonZeroU32 {
        let id = self.next_id;
        self.next_id += 1;
        NonZeroU32::new(id).unwrap_or(NonZeroU32::MIN)
    }

    /// Objects that still exist.
    pub fn live_objects(&self) -> usize {
        self.shaders.len()
            + self.programs.len()
            + self.textures.len()
            + self.framebuffers.len()
            + self.buffers.len()
    }

    fn attachment(&self) -> Option<u32> {
        self.bound_framebuffer
            .and_then(|fb| self.framebuffers.get(&fb).copied().flatten())
    }

    fn program_sources(&self, program: u32) -> Vec<&str> {
        self.programs
            .get(&program)
            .map(|p| {
                p.attached
                    .iter()
                    .filter_map(|s| self.shaders.get(s))
                    .map(|s| s.source.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn location_of(&self, program: u32, name: &str) -> Option<u32> {
        let sources = self.program_sources(program);
        sources.iter().find_map(|src| {
            src.split(|c: char| !c.is_alphanumeric() && c != '_')
                .filter(|w| !w.is_empty())
                .position(|w| w == name)
                .map(|p| p as u32)
        })
    }
}

/// A `Gpu` over shared [`GpuState`].
#[derive(Debug, Clone, Default)]
pub struct FakeGpu {
    state: Rc<RefCell<GpuState>>,
}

impl FakeGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: Rc<RefCell<GpuState>>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Rc<RefCell<GpuState>> {
        Rc::clone(&self.state)
    }

    fn with<R>(&self, f: impl FnOnce(&mut GpuState) -> R) -> R {
        let mut st = self.state.borrow_mut();
        st.calls += 1;
        f(&mut *st)
    }
}

impl Gpu for FakeGpu {
    fn info(&self) -> GpuInfo {
        GpuInfo {
            version: "OpenGL ES 2.0 (fake)".to_string(),
            renderer: "FakeGpu".to_string(),
            vendor: "imgsdk".to_string(),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, String> {
        self.with(|st| {
            let id = st.alloc();
            st.shaders.insert(
                id.get(),
                FakeShader {
                    stage,
                    source: String::new(),
                    compiled: false,
                },
            );
            Ok(ShaderId(id))
        })
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        self.with(|st| {
            if let Some(s) = st.shaders.get_mut(&shader.get()) {
                s.source = source.to_string();
            }
        })
    }

    fn compile_shader(&self, shader: ShaderId) {
        self.with(|st| {
            if let Some(s) = st.shaders.get_mut(&shader.get()) {
                s.compiled = !s.source.contains(FAIL_COMPILE_MARKER);
            }
        })
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.with(|st| st.shaders.get(&shader.get()).is_some_and(|s| s.compiled))
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.with(|st| match st.shaders.get(&shader.get()) {
            Some(s) if !s.compiled => format!("0:1: error: {FAIL_COMPILE_MARKER} directive"),
            _ => String::new(),
        })
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.with(|st| {
            if st.shaders.remove(&shader.get()).is_some() {
                st.deleted_shaders += 1;
            }
        })
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        self.with(|st| {
            let id = st.alloc();
            st.programs.insert(id.get(), FakeProgram::default());
            Ok(ProgramId(id))
        })
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.with(|st| {
            if let Some(p) = st.programs.get_mut(&program.get()) {
                p.attached.push(shader.get());
            }
        })
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.with(|st| {
            if let Some(p) = st.programs.get_mut(&program.get()) {
                p.attached.retain(|s| *s != shader.get());
            }
        })
    }

    fn link_program(&self, program: ProgramId) {
        self.with(|st| {
            let fail = st.fail_link;
            if let Some(p) = st.programs.get_mut(&program.get()) {
                p.linked = !fail;
            }
        })
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.with(|st| st.programs.get(&program.get()).is_some_and(|p| p.linked))
    }

    fn validate_program(&self, program: ProgramId) {
        self.with(|st| {
            let fail = st.fail_validate;
            if let Some(p) = st.programs.get_mut(&program.get()) {
                p.validated = p.linked && !fail;
            }
        })
    }

    fn program_validate_status(&self, program: ProgramId) -> bool {
        self.with(|st| st.programs.get(&program.get()).is_some_and(|p| p.validated))
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.with(|st| match st.programs.get(&program.get()) {
            Some(p) if !p.linked => "link failed (fake)".to_string(),
            Some(p) if !p.validated => "validation failed (fake)".to_string(),
            _ => String::new(),
        })
    }

    fn delete_program(&self, program: ProgramId) {
        self.with(|st| {
            if st.programs.remove(&program.get()).is_some() {
                st.deleted_programs += 1;
            }
            if st.current_program == Some(program.get()) {
                st.current_program = None;
            }
        })
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.with(|st| st.current_program = program.map(|p| p.get()))
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.with(|st| st.location_of(program.get(), name))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.with(|st| st.location_of(program.get(), name).map(UniformLocation))
    }

    fn uniform_1_i32(&self, _location: UniformLocation, _value: i32) {
        self.with(|_| ())
    }

    fn uniform_4_f32(&self, _location: UniformLocation, _value: [f32; 4]) {
        self.with(|_| ())
    }

    fn create_texture(&self) -> Result<TextureId, String> {
        self.with(|st| {
            let id = st.alloc();
            st.textures.insert(id.get(), FakeTexture::default());
            Ok(TextureId(id))
        })
    }

    fn active_texture(&self, unit: u32) {
        self.with(|st| st.active_unit = unit)
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        self.with(|st| {
            let unit = st.active_unit;
            match texture {
                Some(t) => st.texture_units.insert(unit, t.get()),
                None => st.texture_units.remove(&unit),
            };
        })
    }

    fn tex_parameter_i32(&self, _parameter: u32, _value: i32) {
        self.with(|_| ())
    }

    fn pixel_store_unpack_alignment(&self, _alignment: i32) {
        self.with(|_| ())
    }

    fn tex_image_2d(&self, width: i32, height: i32, layout: PixelLayout, pixels: Option<&[u8]>) {
        self.with(|st| {
            let unit = st.active_unit;
            let Some(id) = st.texture_units.get(&unit).copied() else {
                return;
            };
            let len = width.max(0) as usize * height.max(0) as usize * layout.bytes_per_pixel();
            let data = match pixels {
                Some(p) => {
                    st.uploads += 1;
                    p[..len.min(p.len())].to_vec()
                }
                None => vec![0; len],
            };
            if let Some(t) = st.textures.get_mut(&id) {
                *t = FakeTexture {
                    width,
                    height,
                    layout,
                    data,
                };
            }
        })
    }

    fn delete_texture(&self, texture: TextureId) {
        self.with(|st| {
            if st.textures.remove(&texture.get()).is_some() {
                st.deleted_textures += 1;
            }
            st.texture_units.retain(|_, t| *t != texture.get());
        })
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        self.with(|st| {
            let id = st.alloc();
            st.framebuffers.insert(id.get(), None);
            Ok(FramebufferId(id))
        })
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.with(|st| st.bound_framebuffer = framebuffer.map(|f| f.get()))
    }

    fn framebuffer_texture_2d(&self, texture: Option<TextureId>) {
        self.with(|st| {
            if let Some(fb) = st.bound_framebuffer {
                st.framebuffers.insert(fb, texture.map(|t| t.get()));
            }
        })
    }

    fn check_framebuffer_status(&self) -> u32 {
        self.with(|st| {
            if let Some(forced) = st.framebuffer_status {
                return forced;
            }
            match st.attachment() {
                Some(_) => glow::FRAMEBUFFER_COMPLETE,
                None => glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
            }
        })
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        self.with(|st| {
            if st.framebuffers.remove(&framebuffer.get()).is_some() {
                st.deleted_framebuffers += 1;
            }
            if st.bound_framebuffer == Some(framebuffer.get()) {
                st.bound_framebuffer = None;
            }
        })
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        self.with(|st| {
            let id = st.alloc();
            st.buffers.insert(id.get(), Vec::new());
            Ok(BufferId(id))
        })
    }

    fn bind_array_buffer(&self, buffer: Option<BufferId>) {
        self.with(|st| st.bound_buffer = buffer.map(|b| b.get()))
    }

    fn buffer_data_static(&self, data: &[u8]) {
        self.with(|st| {
            if let Some(b) = st.bound_buffer.and_then(|id| st.buffers.get_mut(&id)) {
                *b = data.to_vec();
            }
        })
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.with(|st| {
            if st.buffers.remove(&buffer.get()).is_some() {
                st.deleted_buffers += 1;
            }
        })
    }

    fn enable_vertex_attrib_array(&self, _index: u32) {
        self.with(|_| ())
    }

    fn disable_vertex_attrib_array(&self, _index: u32) {
        self.with(|_| ())
    }

    fn vertex_attrib_pointer_f32(&self, _index: u32, _size: i32, _stride: i32, _offset: i32) {
        self.with(|_| ())
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.with(|st| st.last_viewport = Some((x, y, width, height)))
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.with(|st| st.clear_color = rgba)
    }

    fn clear(&self) {
        self.with(|st| {
            st.clears += 1;
            let color = st.clear_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            if let Some(t) = st.attachment().and_then(|id| st.textures.get_mut(&id)) {
                for px in t.data.chunks_exact_mut(4) {
                    px.copy_from_slice(&color);
                }
            }
        })
    }

    fn draw_arrays(&self, _mode: u32, _first: i32, _count: i32) {
        self.with(|st| {
            st.draws += 1;
            let (Some(dst_id), Some(src_id)) = (st.attachment(), st.texture_units.get(&0).copied())
            else {
                return;
            };
            let Some(src) = st.textures.get(&src_id).cloned() else {
                return;
            };
            let Some(dst) = st.textures.get_mut(&dst_id) else {
                return;
            };
            if src.width <= 0 || src.height <= 0 {
                return;
            }
            for y in 0..dst.height {
                for x in 0..dst.width {
                    let sx = x * src.width / dst.width;
                    let sy = y * src.height / dst.height;
                    let i = (y as usize * dst.width as usize + x as usize) * 4;
                    dst.data[i..i + 4].copy_from_slice(&src.rgba_at(sx, sy));
                }
            }
        })
    }

    fn finish(&self) {
        self.with(|st| st.finishes += 1)
    }

    fn read_pixels_rgba(&self, x: i32, y: i32, width: i32, height: i32, dst: &mut [u8]) {
        self.with(|st| {
            let Some(t) = st.attachment().and_then(|id| st.textures.get(&id)) else {
                dst.fill(0);
                return;
            };
            for row in 0..height {
                for col in 0..width {
                    let o = (row as usize * width as usize + col as usize) * 4;
                    let px = t.rgba_at(x + col, y + row);
                    dst[o..o + 4].copy_from_slice(&px);
                }
            }
        })
    }

    fn get_error(&self) -> u32 {
        self.with(|_| glow::NO_ERROR)
    }
}
