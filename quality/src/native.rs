//! Quality engine provided by a native library loaded at runtime.
//!
//! The library must export `quality_engine_compute` with the [`ComputeFn`]
//! ABI. Its location comes from `QUALITY_ENGINE_LIBRARY`, otherwise the
//! platform's default library name is searched on the loader path.
//!
//! No scorer ships this symbol. The expected backend is a thin C++ shim over
//! OpenCV's contrib `quality` module: wrap the raster in a `CV_8UC1` `cv::Mat`
//! with the given stride, call
//! `cv::quality::QualityBRISQUE::compute(mat, model_path, range_path)` and
//! copy the four `cv::Scalar` components to `out_scores`. Exceptions must be
//! caught in the shim and reported through `error_buf`. Without the shim every
//! score is [`SCORE_FAILED`](crate::SCORE_FAILED).

use std::ffi::{c_char, c_int, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;

use crate::engine::{GrayImage, QualityEngine, SCORE_COMPONENTS};
use crate::error::{Error, Result};

pub const LIBRARY_ENV: &str = "QUALITY_ENGINE_LIBRARY";

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["quality_engine.dll"];
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libquality_engine.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libquality_engine.so"];

const COMPUTE_SYMBOL: &[u8] = b"quality_engine_compute\0";
const ERROR_BUF_LEN: usize = 512;

/// Scores an 8-bit grayscale raster.
///
/// On success writes [`SCORE_COMPONENTS`] values to `out_scores` and returns 0.
/// On failure returns non-zero and writes a NUL-terminated message of at most
/// `error_buf_len` bytes into `error_buf`.
pub type ComputeFn = unsafe extern "C" fn(
    data: *const u8,
    width: u32,
    height: u32,
    stride: usize,
    model_path: *const c_char,
    range_path: *const c_char,
    out_scores: *mut f64,
    error_buf: *mut c_char,
    error_buf_len: usize,
) -> c_int;

pub struct NativeQualityEngine {
    _lib: Library,
    compute: ComputeFn,
    path: PathBuf,
}

impl NativeQualityEngine {
    /// Loads the engine library at `path` and resolves its entry point.
    ///
    /// # Safety
    /// The library at `path` must export `quality_engine_compute` with the exact
    /// [`ComputeFn`] signature and honor its buffer contract. Its initializers
    /// run on load.
    pub unsafe fn load(path: &Path) -> Result<Self> {
        let lib = Library::new(path)
            .map_err(|e| Error::EngineUnavailable(format!("{}: {}", path.display(), e)))?;
        let compute: ComputeFn = *lib
            .get::<ComputeFn>(COMPUTE_SYMBOL)
            .map_err(|e| Error::EngineUnavailable(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            _lib: lib,
            compute,
            path: path.to_path_buf(),
        })
    }

    /// Process-wide engine, loaded on first use. A failed load is remembered
    /// and reported on every call.
    pub fn shared() -> Result<&'static NativeQualityEngine> {
        static ENGINE: OnceLock<std::result::Result<NativeQualityEngine, String>> =
            OnceLock::new();

        ENGINE
            .get_or_init(load_default)
            .as_ref()
            .map_err(|e| Error::EngineUnavailable(e.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_default() -> std::result::Result<NativeQualityEngine, String> {
    let candidates: Vec<PathBuf> = match std::env::var_os(LIBRARY_ENV) {
        Some(path) => vec![PathBuf::from(path)],
        None => DEFAULT_LIBRARY_NAMES.iter().map(PathBuf::from).collect(),
    };

    let mut last_err = "no quality engine library candidates".to_string();
    for candidate in candidates {
        // SAFETY: candidates are quality engine builds exporting the ComputeFn ABI.
        match unsafe { NativeQualityEngine::load(&candidate) } {
            Ok(engine) => {
                tracing::info!("Quality engine loaded from '{}'", candidate.display());
                return Ok(engine);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                last_err = e.to_string();
            }
        }
    }

    Err(last_err)
}

impl QualityEngine for NativeQualityEngine {
    fn compute(
        &self,
        image: GrayImage<'_>,
        model_path: &str,
        range_path: &str,
    ) -> Result<[f64; SCORE_COMPONENTS]> {
        let model = CString::new(model_path).map_err(|_| Error::InvalidArgument("model_path"))?;
        let range = CString::new(range_path).map_err(|_| Error::InvalidArgument("range_path"))?;

        debug_assert!(image.data.len() >= image.stride * image.height as usize);

        let mut scores = [0f64; SCORE_COMPONENTS];
        let mut error_buf = [0u8; ERROR_BUF_LEN];

        // SAFETY: `data` covers `stride * height` bytes, both paths are
        // NUL-terminated and outlive the call, the output buffers have the
        // advertised sizes.
        let status = unsafe {
            (self.compute)(
                image.data.as_ptr(),
                image.width,
                image.height,
                image.stride,
                model.as_ptr(),
                range.as_ptr(),
                scores.as_mut_ptr(),
                error_buf.as_mut_ptr() as *mut c_char,
                error_buf.len(),
            )
        };

        if status != 0 {
            error_buf[ERROR_BUF_LEN - 1] = 0;
            let message = CStr::from_bytes_until_nul(&error_buf)
                .map(|msg| msg.to_string_lossy().into_owned())
                .unwrap_or_default();

            return Err(Error::Engine(format!("status {}: {}", status, message)));
        }

        Ok(scores)
    }
}
