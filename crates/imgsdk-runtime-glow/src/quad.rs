use std::rc::Rc;

use imgsdk_core::SdkError;

use crate::gpu::{BufferId, Gpu};
use crate::program::{ShaderProgram, ATTR_POSITION, ATTR_TEX_COORD};

/// Interleaved `(x, y, u, v)`, drawn as a triangle strip. Texture row 0 maps to clip-space
/// bottom, which is also where `glReadPixels` starts, so a pass-through draw preserves
/// row order end to end.
pub const QUAD_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, 1.0, 1.0, 1.0, //
];

const STRIDE: i32 = 4 * std::mem::size_of::<f32>() as i32;
const UV_OFFSET: i32 = 2 * std::mem::size_of::<f32>() as i32;

/// Full-surface quad in a vertex buffer. GLES 2.0 has no VAOs, so attribute state is set
/// up per draw from the program's resolved locations.
#[derive(Debug)]
pub struct FullscreenQuad<G: Gpu> {
    gpu: Rc<G>,
    vbo: BufferId,
}

impl<G: Gpu> FullscreenQuad<G> {
    pub fn new(gpu: &Rc<G>) -> Result<Self, SdkError> {
        let vbo = gpu
            .create_buffer()
            .map_err(|e| SdkError::GlCreate(format!("create_buffer failed: {e}")))?;
        gpu.bind_array_buffer(Some(vbo));
        gpu.buffer_data_static(bytemuck::cast_slice(&QUAD_VERTICES));
        gpu.bind_array_buffer(None);
        Ok(Self {
            gpu: Rc::clone(gpu),
            vbo,
        })
    }

    pub fn buffer(&self) -> BufferId {
        self.vbo
    }

    /// Draws with `program`, which must already be in use.
    pub fn draw(&self, program: &ShaderProgram<G>) {
        let position = program.attribute(ATTR_POSITION);
        let tex_coord = program.attribute(ATTR_TEX_COORD);

        self.gpu.bind_array_buffer(Some(self.vbo));
        if let Some(loc) = position {
            self.gpu.enable_vertex_attrib_array(loc);
            self.gpu.vertex_attrib_pointer_f32(loc, 2, STRIDE, 0);
        }
        if let Some(loc) = tex_coord {
            self.gpu.enable_vertex_attrib_array(loc);
            self.gpu.vertex_attrib_pointer_f32(loc, 2, STRIDE, UV_OFFSET);
        }

        self.gpu.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

        for loc in [position, tex_coord].into_iter().flatten() {
            self.gpu.disable_vertex_attrib_array(loc);
        }
        self.gpu.bind_array_buffer(None);
    }
}

impl<G: Gpu> Drop for FullscreenQuad<G> {
    fn drop(&mut self) {
        self.gpu.delete_buffer(self.vbo);
    }
}
