//! Effect command state: which image is active, where output goes, and the last command.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use imgsdk_core::{Bitmap, ImageCodec, SdkError};
use imgsdk_effect::{looks_like_command, parse_command, EffectDescriptor};

/// Where the active bitmap came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActiveSource {
    #[default]
    None,
    Decoded,
    Readback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandChange {
    /// Same command as last time; nothing was decoded.
    Unchanged,
    /// A new command was stored and the active bitmap needs (re)uploading.
    Replaced,
}

/// A resolved command that has not been stored yet.
pub struct PendingCommand {
    command: String,
    descriptor: EffectDescriptor,
    input: Option<PathBuf>,
    decoded: Option<Bitmap>,
}

impl PendingCommand {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn descriptor(&self) -> &EffectDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand")
            .field("command", &self.command)
            .field("kind", &self.descriptor.kind)
            .field("input", &self.input)
            .field("decoded", &self.decoded)
            .finish()
    }
}

#[derive(Default)]
pub struct EffectCommandState {
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    command: Option<String>,
    descriptor: Option<EffectDescriptor>,
    bitmap: Option<Bitmap>,
    source: ActiveSource,
}

impl fmt::Debug for EffectCommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCommandState")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("command", &self.command)
            .field("kind", &self.descriptor.as_ref().map(|d| d.kind))
            .field("bitmap", &self.bitmap)
            .field("source", &self.source)
            .finish()
    }
}

impl EffectCommandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input path. The next command decodes again, even if it repeats the last one.
    pub fn set_input_path(&mut self, path: impl Into<PathBuf>) {
        self.input_path = Some(path.into());
        self.command = None;
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = Some(path.into());
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn descriptor(&self) -> Option<&EffectDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn source(&self) -> ActiveSource {
        self.source
    }

    /// Applies `cmd` in one step. See [`prepare`](Self::prepare).
    pub fn load(&mut self, cmd: &str, codec: &dyn ImageCodec) -> Result<CommandChange, SdkError> {
        match self.prepare(cmd, codec)? {
            Some(pending) => {
                self.commit(pending);
                Ok(CommandChange::Replaced)
            }
            None => Ok(CommandChange::Unchanged),
        }
    }

    /// Resolves `cmd` without changing any state. `None` means it repeats the current command.
    ///
    /// A command starting with `{` is an effect descriptor and renders the configured input
    /// path; anything else is itself the image path. The bitmap is decoded from the input
    /// path when there is one, otherwise the bitmap already held is reused.
    pub fn prepare(
        &self,
        cmd: &str,
        codec: &dyn ImageCodec,
    ) -> Result<Option<PendingCommand>, SdkError> {
        if self.command.as_deref() == Some(cmd) {
            tracing::debug!(cmd, "effect command unchanged");
            return Ok(None);
        }

        let (descriptor, input) = if looks_like_command(cmd) {
            (parse_command(cmd)?, self.input_path.clone())
        } else {
            if cmd.trim().is_empty() {
                return Err(SdkError::invalid_argument("effect command is empty"));
            }
            (EffectDescriptor::normal(), Some(PathBuf::from(cmd)))
        };

        let decoded = match &input {
            Some(path) => {
                let t0 = Instant::now();
                let bitmap = codec.decode(path)?;
                tracing::info!(
                    path = %path.display(),
                    width = bitmap.width(),
                    height = bitmap.height(),
                    elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
                    "input decoded"
                );
                Some(bitmap)
            }
            None if self.bitmap.is_some() => {
                tracing::debug!(source = ?self.source, "reusing bitmap held in memory");
                None
            }
            None => return Err(SdkError::NoInputConfigured),
        };

        Ok(Some(PendingCommand {
            command: cmd.to_string(),
            descriptor,
            input,
            decoded,
        }))
    }

    /// The bitmap `pending` will make active.
    pub fn bitmap_for<'a>(&'a self, pending: &'a PendingCommand) -> Option<&'a Bitmap> {
        pending.decoded.as_ref().or(self.bitmap.as_ref())
    }

    /// Stores a prepared command, replacing the previous bitmap if it decoded a new one.
    pub fn commit(&mut self, pending: PendingCommand) {
        let PendingCommand {
            command,
            descriptor,
            input,
            decoded,
        } = pending;
        if let Some(bitmap) = decoded {
            // The previous bitmap is released here.
            self.bitmap = Some(bitmap);
            self.source = ActiveSource::Decoded;
        }
        tracing::info!(cmd = %command, kind = ?descriptor.kind, "effect command applied");
        self.input_path = input;
        self.command = Some(command);
        self.descriptor = Some(descriptor);
    }

    /// Makes a rendered readback the active bitmap.
    pub fn set_readback(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
        self.source = ActiveSource::Readback;
    }

    /// Drops the active bitmap, then the command.
    pub fn clear(&mut self) {
        self.bitmap = None;
        self.source = ActiveSource::None;
        self.command = None;
        self.descriptor = None;
    }
}
