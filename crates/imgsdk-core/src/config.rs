//! Read-only SDK configuration plus the JSON helpers used to load it.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::SdkError;

/// A JSON document read from disk, kept alongside its path for error reporting.
#[derive(Debug, Clone)]
pub struct LoadedJson {
    pub path: PathBuf,
    pub value: serde_json::Value,
}

/// Tunables for an SDK environment. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdkConfig {
    pub max_surface_width: u32,
    pub max_surface_height: u32,
    /// Asset name of the vertex shader source.
    pub vertex_shader: String,
    /// Asset name of the fragment shader source.
    pub fragment_shader: String,
    pub jpeg_quality: u8,
    pub clear_color: [f32; 4],
    pub gles_major: u8,
    pub gles_minor: u8,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            max_surface_width: 2048,
            max_surface_height: 2048,
            vertex_shader: "vert.shdr".to_string(),
            fragment_shader: "frag.shdr".to_string(),
            jpeg_quality: 80,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            gles_major: 2,
            gles_minor: 0,
        }
    }
}

impl SdkConfig {
    pub fn validate(&self, path: &Path) -> Result<(), SdkError> {
        let invalid = |msg: String| SdkError::InvalidConfig {
            path: path.to_path_buf(),
            msg,
        };
        if self.max_surface_width == 0 || self.max_surface_height == 0 {
            return Err(invalid(format!(
                "max surface must be non-zero (got {}x{})",
                self.max_surface_width, self.max_surface_height
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid(format!(
                "jpeg_quality must be in 1..=100 (got {})",
                self.jpeg_quality
            )));
        }
        if self.vertex_shader.trim().is_empty() || self.fragment_shader.trim().is_empty() {
            return Err(invalid("shader asset names must not be empty".to_string()));
        }
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(invalid(format!(
                "clear_color components must be in 0..=1 (got {:?})",
                self.clear_color
            )));
        }
        if self.gles_major < 2 {
            return Err(invalid(format!(
                "gles_major must be at least 2 (got {})",
                self.gles_major
            )));
        }
        Ok(())
    }
}

/// Reads `path` as JSON without interpreting it.
pub fn load_typed_json(path: &Path) -> Result<LoadedJson, SdkError> {
    let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&text).map_err(|source| SdkError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LoadedJson {
        path: path.to_path_buf(),
        value,
    })
}

/// Deserializes a previously loaded document into `T`.
pub fn parse_loaded_json<T: DeserializeOwned>(loaded: LoadedJson) -> Result<T, SdkError> {
    let LoadedJson { path, value } = loaded;
    serde_json::from_value(value).map_err(|source| SdkError::Json { path, source })
}

pub fn load_sdk_config_from(path: &Path) -> Result<SdkConfig, SdkError> {
    let cfg: SdkConfig = parse_loaded_json(load_typed_json(path)?)?;
    cfg.validate(path)?;
    tracing::debug!(path = %path.display(), ?cfg, "sdk config loaded");
    Ok(cfg)
}
