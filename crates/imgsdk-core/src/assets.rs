use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::SdkError;

/// Read-only source of named resources (shader text, presets).
///
/// On Android this is backed by the application's asset manager; on desktop by a
/// directory or an in-memory table.
pub trait AssetSource {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError>;

    fn read_to_string(&self, name: &str) -> Result<String, SdkError> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes)
            .map_err(|e| SdkError::invalid_argument(format!("asset {name} is not utf-8: {e}")))
    }
}

impl<A: AssetSource + ?Sized> AssetSource for Box<A> {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError> {
        (**self).read(name)
    }
}

impl<A: AssetSource + ?Sized> AssetSource for std::rc::Rc<A> {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError> {
        (**self).read(name)
    }
}

/// A directory on disk holding assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetsRoot {
    dir: PathBuf,
}

impl AssetsRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Walks up from `start_dir` until a directory containing `assets/` is found.
    pub fn discover(start_dir: &Path) -> Result<Self, SdkError> {
        let mut cur = Some(start_dir);
        while let Some(dir) = cur {
            let candidate = dir.join("assets");
            if candidate.is_dir() {
                tracing::debug!(dir = %candidate.display(), "assets root discovered");
                return Ok(Self { dir: candidate });
            }
            cur = dir.parent();
        }
        Err(SdkError::AssetsNotFound {
            start_dir: start_dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl AssetSource for AssetsRoot {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError> {
        let path = self.path_of(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SdkError::AssetNotFound(name.to_string()))
            }
            Err(source) => Err(SdkError::Io { path, source }),
        }
    }
}

/// In-memory asset table.
#[derive(Default, Clone)]
pub struct MemoryAssets {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MemoryAssets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("MemoryAssets").field("names", &names).finish()
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, SdkError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| SdkError::AssetNotFound(name.to_string()))
    }
}
