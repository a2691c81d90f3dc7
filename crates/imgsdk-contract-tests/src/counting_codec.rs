use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use imgsdk_codec::StandardCodec;
use imgsdk_core::{Bitmap, CodecError, ImageCodec};

/// `StandardCodec` that counts its calls. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct CountingCodec {
    inner: StandardCodec,
    decodes: Rc<Cell<usize>>,
    encodes: Rc<Cell<usize>>,
}

impl CountingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decodes(&self) -> usize {
        self.decodes.get()
    }

    pub fn encodes(&self) -> usize {
        self.encodes.get()
    }
}

impl ImageCodec for CountingCodec {
    fn decode(&self, path: &Path) -> Result<Bitmap, CodecError> {
        self.decodes.set(self.decodes.get() + 1);
        self.inner.decode(path)
    }

    fn encode(&self, path: &Path, bitmap: &Bitmap) -> Result<(), CodecError> {
        self.encodes.set(self.encodes.get() + 1);
        self.inner.encode(path, bitmap)
    }
}
