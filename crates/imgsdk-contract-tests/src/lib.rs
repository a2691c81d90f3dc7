//! Test doubles and contract suites for the imgsdk crates.
//!
//! The fakes stand in for the GPU, EGL and the codec so the environment lifecycle can be
//! checked without a display: every object they hand out is counted until released.
#![deny(missing_debug_implementations)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use imgsdk_codec::StandardCodec;
use imgsdk_core::{Bitmap, ImageCodec, PixelFormat};
use imgsdk_host_egl::NativeWindow;
use raw_window_handle::{AndroidNdkWindowHandle, RawWindowHandle};

pub mod counting_codec;
pub mod fake_egl;
pub mod fake_gpu;

pub use counting_codec::CountingCodec;
pub use fake_egl::{EglState, EglStep, FakeEgl};
pub use fake_gpu::{FakeGpu, GpuState, FAIL_COMPILE_MARKER};

#[cfg(test)]
mod api_contract;
#[cfg(test)]
mod codec_contract;
#[cfg(test)]
mod effect_contract;
#[cfg(test)]
mod env_contract;
#[cfg(test)]
mod lifecycle_contract;
#[cfg(test)]
mod shader_contract;

static FIXTURE_SEQ: AtomicUsize = AtomicUsize::new(0);

// ---- Fixtures ----

/// A unique path in the temp dir; nothing is created.
pub fn temp_path(name: &str, ext: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = FIXTURE_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut p = std::env::temp_dir();
    p.push(format!(
        "imgsdk_contract_tests_{name}_{}_{ts}_{seq}.{ext}",
        std::process::id()
    ));
    p
}

/// Opaque RGBA gradient; every pixel differs from its neighbours.
pub fn gradient(width: u32, height: u32) -> Bitmap {
    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            bytes.extend_from_slice(&[
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
                255,
            ]);
        }
    }
    Bitmap::new(PixelFormat::Rgba32, width, height, bytes).expect("gradient bitmap")
}

/// Writes a gradient PNG and returns its path and pixels.
pub fn write_png(name: &str, width: u32, height: u32) -> (PathBuf, Bitmap) {
    let path = temp_path(name, "png");
    let bitmap = gradient(width, height);
    StandardCodec::default()
        .encode(&path, &bitmap)
        .expect("write png fixture");
    (path, bitmap)
}

pub fn android_window(width: i32, height: i32) -> NativeWindow {
    NativeWindow::new(
        RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::empty()),
        width,
        height,
    )
}
