use std::fmt;
use std::path::PathBuf;

use crate::codec::CodecError;

/// Pipeline stage a shader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// SDK-level errors used across imgsdk crates.
///
/// Contract rule: this type lives in `imgsdk-core` and is re-exported by the runtime,
/// host and environment crates so every layer reports through one taxonomy.
#[derive(Debug)]
pub enum SdkError {
    // ---- Arguments / lifecycle ----
    InvalidArgument(String),
    InvalidPlatform(i32),
    AlreadyInitialized,
    NotReady,
    MissingPlatformData,
    WrongThread,

    // ---- Surface setup (EGL) ----
    DisplayUnavailable(String),
    ConfigSelectionFailed(String),
    SurfaceCreationFailed(String),
    ContextCreationFailed(String),
    MakeCurrentFailed(String),
    /// `eglSwapBuffers` failed on a live window surface.
    PresentFailed(String),
    SurfaceSizeMismatch {
        surface: (i32, i32),
        window: (i32, i32),
    },

    // ---- Shader pipeline / GL objects ----
    InvalidSource(ShaderStage),
    CompileError {
        stage: ShaderStage,
        log: String,
    },
    LinkError(String),
    ValidationError(String),
    GlCreate(String),
    FramebufferIncomplete(u32),

    // ---- Image input / effect commands ----
    Codec(CodecError),
    NoInputConfigured,
    InvalidCommand(String),
    NotImplemented(String),

    // ---- Assets / config ----
    AssetNotFound(String),
    AssetsNotFound {
        start_dir: PathBuf,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidConfig {
        path: PathBuf,
        msg: String,
    },
}

impl SdkError {
    pub fn invalid_argument<T: Into<String>>(s: T) -> Self {
        SdkError::InvalidArgument(s.into())
    }

    pub fn invalid_command<T: Into<String>>(s: T) -> Self {
        SdkError::InvalidCommand(s.into())
    }

    /// True for the surface-setup family (display/config/surface/context/current).
    pub fn is_surface_error(&self) -> bool {
        matches!(
            self,
            SdkError::DisplayUnavailable(_)
                | SdkError::ConfigSelectionFailed(_)
                | SdkError::SurfaceCreationFailed(_)
                | SdkError::ContextCreationFailed(_)
                | SdkError::MakeCurrentFailed(_)
                | SdkError::SurfaceSizeMismatch { .. }
        )
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            SdkError::InvalidPlatform(raw) => write!(f, "invalid platform: {raw}"),
            SdkError::AlreadyInitialized => f.write_str("sdk environment is already initialized"),
            SdkError::NotReady => f.write_str("sdk environment is not ready"),
            SdkError::MissingPlatformData => {
                f.write_str("platform data (asset source) must be set before init")
            }
            SdkError::WrongThread => {
                f.write_str("sdk environment used from a thread other than its creator")
            }

            SdkError::DisplayUnavailable(msg) => write!(f, "display unavailable: {msg}"),
            SdkError::ConfigSelectionFailed(msg) => write!(f, "config selection failed: {msg}"),
            SdkError::SurfaceCreationFailed(msg) => write!(f, "surface creation failed: {msg}"),
            SdkError::ContextCreationFailed(msg) => write!(f, "context creation failed: {msg}"),
            SdkError::MakeCurrentFailed(msg) => write!(f, "make current failed: {msg}"),
            SdkError::PresentFailed(msg) => write!(f, "present failed: {msg}"),
            SdkError::SurfaceSizeMismatch { surface, window } => write!(
                f,
                "surface size {}x{} does not match native window {}x{}",
                surface.0, surface.1, window.0, window.1
            ),

            SdkError::InvalidSource(stage) => write!(f, "{stage} shader source is empty"),
            SdkError::CompileError { stage, log } => {
                write!(f, "{stage} shader compile error: {log}")
            }
            SdkError::LinkError(log) => write!(f, "program link error: {log}"),
            SdkError::ValidationError(log) => write!(f, "program validation error: {log}"),
            SdkError::GlCreate(msg) => write!(f, "gl object creation failed: {msg}"),
            SdkError::FramebufferIncomplete(status) => {
                write!(f, "framebuffer incomplete: 0x{status:04x}")
            }

            SdkError::Codec(e) => write!(f, "codec error: {e}"),
            SdkError::NoInputConfigured => f.write_str("no input image configured"),
            SdkError::InvalidCommand(msg) => write!(f, "invalid effect command: {msg}"),
            SdkError::NotImplemented(name) => write!(f, "effect not implemented: {name}"),

            SdkError::AssetNotFound(name) => write!(f, "asset not found: {name}"),
            SdkError::AssetsNotFound { start_dir } => {
                write!(f, "assets not found (starting at {})", start_dir.display())
            }
            SdkError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            SdkError::Json { path, source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }
            SdkError::InvalidConfig { path, msg } => {
                write!(f, "invalid config at {}: {}", path.display(), msg)
            }
        }
    }
}

impl std::error::Error for SdkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SdkError::Codec(source) => Some(source),
            SdkError::Io { source, .. } => Some(source),
            SdkError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<CodecError> for SdkError {
    fn from(e: CodecError) -> Self {
        SdkError::Codec(e)
    }
}
