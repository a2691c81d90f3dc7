use std::fmt;
use std::mem::ManuallyDrop;
use std::thread::{self, ThreadId};

use imgsdk_core::SdkError;

/// Pins a value to the thread that created it.
///
/// The wrapper itself may move between threads (so a registry of them can sit behind a
/// `Mutex`), but the value is only reachable from the owning thread. Dropping the wrapper on
/// any other thread leaks the value instead of running its destructor there, since GL and
/// EGL teardown must happen on the thread the context is current on.
pub struct ThreadBound<T> {
    value: ManuallyDrop<T>,
    owner: ThreadId,
}

// SAFETY: the value is never accessed or dropped off the owning thread: `get`, `get_mut` and
// `into_inner` check the caller's thread id, and `Drop` leaks on a foreign thread.
unsafe impl<T> Send for ThreadBound<T> {}

impl<T> ThreadBound<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            owner: thread::current().id(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn get(&self) -> Result<&T, SdkError> {
        if self.is_owner() {
            Ok(&self.value)
        } else {
            Err(SdkError::WrongThread)
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T, SdkError> {
        if self.is_owner() {
            Ok(&mut self.value)
        } else {
            Err(SdkError::WrongThread)
        }
    }

    /// Unwraps the value on the owning thread; hands the wrapper back otherwise.
    pub fn into_inner(self) -> Result<T, Self> {
        if !self.is_owner() {
            return Err(self);
        }
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the value is taken exactly once.
        Ok(unsafe { ManuallyDrop::take(&mut this.value) })
    }
}

impl<T> fmt::Debug for ThreadBound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadBound")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for ThreadBound<T> {
    fn drop(&mut self) {
        if self.is_owner() {
            // SAFETY: dropped once, on the owning thread.
            unsafe { ManuallyDrop::drop(&mut self.value) }
        } else {
            tracing::error!(
                owner = ?self.owner,
                current = ?thread::current().id(),
                "thread-bound value dropped on a foreign thread; leaking it"
            );
        }
    }
}
