use imgsdk_core::{AssetSource, SdkError};

pub const DEFAULT_VERTEX_NAME: &str = "vert.shdr";
pub const DEFAULT_FRAGMENT_NAME: &str = "frag.shdr";

pub const PASSTHROUGH_VERT: &str = r#"attribute vec2 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    gl_Position = vec4(aPosition, 0.0, 1.0);
}
"#;

pub const PASSTHROUGH_FRAG: &str = r#"precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D uSampler2D;
uniform vec4 uColor;
void main() {
    gl_FragColor = texture2D(uSampler2D, vTexCoord) * uColor;
}
"#;

/// Serves the pass-through GLSL ES 1.00 pair under the default asset names, for hosts
/// that ship no shader assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinShaders;

impl AssetSource for BuiltinShaders {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError> {
        match name {
            DEFAULT_VERTEX_NAME => Ok(PASSTHROUGH_VERT.as_bytes().to_vec()),
            DEFAULT_FRAGMENT_NAME => Ok(PASSTHROUGH_FRAG.as_bytes().to_vec()),
            other => Err(SdkError::AssetNotFound(other.to_string())),
        }
    }
}
