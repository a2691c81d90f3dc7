use std::collections::HashMap;
use std::rc::Rc;

use imgsdk_core::{SdkError, ShaderStage};

use crate::gpu::{Gpu, ProgramId, ShaderId, UniformLocation};

/// Info logs longer than this are cut (at a char boundary).
pub const INFO_LOG_LIMIT: usize = 1024;

pub const ATTR_POSITION: &str = "aPosition";
pub const ATTR_TEX_COORD: &str = "aTexCoord";
pub const UNIFORM_SAMPLER: &str = "uSampler2D";
pub const UNIFORM_COLOR: &str = "uColor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Attribute,
    Uniform,
}

/// Variables every imgsdk shader pair is expected to declare.
pub const STANDARD_LOCATIONS: [(VariableKind, &str); 4] = [
    (VariableKind::Attribute, ATTR_POSITION),
    (VariableKind::Attribute, ATTR_TEX_COORD),
    (VariableKind::Uniform, UNIFORM_SAMPLER),
    (VariableKind::Uniform, UNIFORM_COLOR),
];

pub(crate) fn truncate_log(mut log: String) -> String {
    if log.len() > INFO_LOG_LIMIT {
        let mut cut = INFO_LOG_LIMIT;
        while !log.is_char_boundary(cut) {
            cut -= 1;
        }
        log.truncate(cut);
    }
    log
}

/// A compiled shader object. Deleted on drop.
#[derive(Debug)]
pub struct Shader<G: Gpu> {
    gpu: Rc<G>,
    id: ShaderId,
    stage: ShaderStage,
}

impl<G: Gpu> Shader<G> {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl<G: Gpu> Drop for Shader<G> {
    fn drop(&mut self) {
        self.gpu.delete_shader(self.id);
    }
}

pub fn compile_shader<G: Gpu>(
    gpu: &Rc<G>,
    stage: ShaderStage,
    source: &str,
) -> Result<Shader<G>, SdkError> {
    if source.trim().is_empty() {
        return Err(SdkError::InvalidSource(stage));
    }
    let id = gpu
        .create_shader(stage)
        .map_err(|e| SdkError::GlCreate(format!("create_shader({stage}) failed: {e}")))?;
    let shader = Shader {
        gpu: Rc::clone(gpu),
        id,
        stage,
    };

    gpu.shader_source(id, source);
    gpu.compile_shader(id);
    if !gpu.shader_compile_status(id) {
        let log = truncate_log(gpu.shader_info_log(id));
        if log.trim().is_empty() {
            tracing::warn!(%stage, "shader failed to compile and produced no compile log");
        } else {
            tracing::error!(%stage, %log, "shader compile error");
        }
        // `shader` drops here and deletes the object.
        return Err(SdkError::CompileError { stage, log });
    }
    Ok(shader)
}

/// A linked + validated program together with the shaders attached to it.
#[derive(Debug)]
pub struct ShaderProgram<G: Gpu> {
    gpu: Rc<G>,
    id: ProgramId,
    vertex: Shader<G>,
    fragment: Shader<G>,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

/// Compiles, links and validates a program.
///
/// Each failure branch releases exactly the objects this call created: the shaders and the
/// program are owned by RAII values from the moment they exist.
pub fn create_program<G: Gpu>(
    gpu: &Rc<G>,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<ShaderProgram<G>, SdkError> {
    let vertex = compile_shader(gpu, ShaderStage::Vertex, vertex_src)?;
    let fragment = compile_shader(gpu, ShaderStage::Fragment, fragment_src)?;

    let id = gpu
        .create_program()
        .map_err(|e| SdkError::GlCreate(format!("create_program failed: {e}")))?;
    gpu.attach_shader(id, vertex.id());
    gpu.attach_shader(id, fragment.id());
    let program = ShaderProgram {
        gpu: Rc::clone(gpu),
        id,
        vertex,
        fragment,
        attributes: HashMap::new(),
        uniforms: HashMap::new(),
    };

    gpu.link_program(id);
    if !gpu.program_link_status(id) {
        let log = truncate_log(gpu.program_info_log(id));
        tracing::error!(%log, "program link error");
        return Err(SdkError::LinkError(log));
    }

    gpu.validate_program(id);
    if !gpu.program_validate_status(id) {
        let log = truncate_log(gpu.program_info_log(id));
        tracing::error!(%log, "program validation error");
        return Err(SdkError::ValidationError(log));
    }

    tracing::debug!(program = id.get(), "program linked");
    Ok(program)
}

impl<G: Gpu> ShaderProgram<G> {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn vertex_shader(&self) -> ShaderId {
        self.vertex.id()
    }

    pub fn fragment_shader(&self) -> ShaderId {
        self.fragment.id()
    }

    /// Looks up and caches each variable. Returns how many were missing; a missing variable
    /// is only a warning since the optimizer may strip unused ones.
    pub fn resolve_locations(&mut self, vars: &[(VariableKind, &str)]) -> usize {
        let mut missing = 0;
        for &(kind, name) in vars {
            let found = match kind {
                VariableKind::Attribute => self
                    .gpu
                    .attrib_location(self.id, name)
                    .map(|loc| self.attributes.insert(name.to_string(), loc))
                    .is_some(),
                VariableKind::Uniform => self
                    .gpu
                    .uniform_location(self.id, name)
                    .map(|loc| self.uniforms.insert(name.to_string(), loc))
                    .is_some(),
            };
            if !found {
                tracing::warn!(?kind, name, "shader variable location not found");
                missing += 1;
            }
        }
        missing
    }

    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn bind(&self) {
        self.gpu.use_program(Some(self.id));
    }

    pub fn set_uniform_i32(&self, name: &str, value: i32) {
        if let Some(loc) = self.uniform(name) {
            self.gpu.uniform_1_i32(loc, value);
        }
    }

    pub fn set_uniform_vec4(&self, name: &str, value: [f32; 4]) {
        if let Some(loc) = self.uniform(name) {
            self.gpu.uniform_4_f32(loc, value);
        }
    }
}

impl<G: Gpu> Drop for ShaderProgram<G> {
    fn drop(&mut self) {
        self.gpu.detach_shader(self.id, self.vertex.id());
        self.gpu.detach_shader(self.id, self.fragment.id());
        self.gpu.delete_program(self.id);
        // vertex/fragment shaders are deleted by their own Drop right after this.
    }
}
