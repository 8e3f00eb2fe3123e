#![deny(improper_ctypes_definitions)]

//! C ABI entry points for managed hosts.
//!
//! Every function absorbs its failures: scores fall back to `-1.0`, flags to
//! `false`, counts to `0`. Panics are caught here and never unwind into the
//! host. Diagnostics go to the log only.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use denoise::{DenoiseBridge, DenoiseConfig, DenoiseEngine, WeightsSource};

pub use crate::config::FfiDenoiseConfig;
pub use crate::ffi::{FfiBuf, FfiStr};

mod config;
mod ffi;


const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "imaging_bridge_logs";

fn guarded<T>(entry: &str, fallback: T, call: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!("Unknown error in {}: panicked", entry);
            fallback
        }
    }
}

/// Reads an optional string argument; `Err` for invalid UTF-8.
fn str_arg<'a>(name: &str, value: FfiStr) -> Result<Option<&'a str>, ()> {
    // SAFETY: the host keeps its strings alive for the duration of the call.
    unsafe { value.as_str() }.map_err(|e| {
        tracing::error!("Argument '{}' is not valid UTF-8: {}", name, e);
    })
}

fn weights_arg<'a>(weights_path: FfiStr) -> Result<WeightsSource<'a>, ()> {
    Ok(match str_arg("weights_path", weights_path)? {
        Some(path) => WeightsSource::File(Path::new(path)),
        None => WeightsSource::EngineDefault,
    })
}

fn config_arg(config: FfiDenoiseConfig) -> Result<DenoiseConfig, ()> {
    DenoiseConfig::try_from(config).map_err(|raw| {
        tracing::error!("Unknown device type {}", raw);
    })
}

/// Installs console and file logging. `log_dir` may be null for the default
/// directory under the system temp dir. Returns `false` when logging is
/// already set up or the arguments are invalid.
#[no_mangle]
pub extern "C" fn init_logging(level: FfiStr, log_dir: FfiStr) -> bool {
    guarded("init_logging", false, || {
        let (Ok(level), Ok(log_dir)) = (str_arg("level", level), str_arg("log_dir", log_dir))
        else {
            return false;
        };

        let log_dir = log_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR));

        match common::log_setup::setup_logging(level.unwrap_or(DEFAULT_LOG_LEVEL), log_dir) {
            Ok(()) => true,
            Err(err) => {
                // No subscriber is guaranteed to exist yet, so tracing may drop this.
                eprintln!("Logging setup failed: {}", err);
                false
            }
        }
    })
}

/// Scores the image at `image_path`. Returns `-1.0` on any failure.
#[no_mangle]
pub extern "C" fn compute_quality_score(
    image_path: FfiStr,
    model_path: FfiStr,
    range_path: FfiStr,
) -> f32 {
    guarded("compute_quality_score", quality::SCORE_FAILED, || {
        let args = (
            str_arg("image_path", image_path),
            str_arg("model_path", model_path),
            str_arg("range_path", range_path),
        );
        let (Ok(image_path), Ok(model_path), Ok(range_path)) = args else {
            return quality::SCORE_FAILED;
        };

        // Missing arguments are empty, which the scorer rejects.
        quality::compute_quality_score(
            image_path.unwrap_or_default(),
            model_path.unwrap_or_default(),
            range_path.unwrap_or_default(),
        )
    })
}

#[no_mangle]
pub extern "C" fn get_engine_device_count() -> i32 {
    guarded("get_engine_device_count", 0, denoise::device_count)
}

/// Name of the first denoise device, `"none"` without one. Free the result
/// with `destroy_ffi_buf`.
#[no_mangle]
pub extern "C" fn get_engine_device_name() -> FfiBuf {
    let name = guarded("get_engine_device_name", "none".to_string(), denoise::device_name);
    FfiBuf::from(name)
}

/// Denoises `len` floats at `color` in place. On `false` the buffer holds its
/// original contents.
///
/// # Safety
/// `color` must be null or point to `len` floats that the host does not touch
/// during the call.
#[no_mangle]
pub unsafe extern "C" fn denoise_buffer(
    color: *mut f32,
    len: usize,
    width: i32,
    height: i32,
    weights_path: FfiStr,
    config: FfiDenoiseConfig,
) -> bool {
    guarded("denoise_buffer", false, || match denoise::shared_bridge() {
        // SAFETY: forwarded from the caller.
        Ok(bridge) => unsafe {
            denoise_buffer_with(&bridge, color, len, width, height, weights_path, config)
        },
        Err(err) => {
            tracing::error!("{}", err);
            false
        }
    })
}

pub(crate) unsafe fn denoise_buffer_with<E: DenoiseEngine>(
    bridge: &DenoiseBridge<E>,
    color: *mut f32,
    len: usize,
    width: i32,
    height: i32,
    weights_path: FfiStr,
    config: FfiDenoiseConfig,
) -> bool {
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        tracing::error!("Invalid image dimensions {}x{}", width, height);
        return false;
    };
    let (Ok(weights), Ok(config)) = (weights_arg(weights_path), config_arg(config)) else {
        return false;
    };

    bridge.denoise_raw(color, len, width, height, weights, &config)
}

/// Reads `input`, denoises it and writes `output`, whose extension picks the
/// format.
#[no_mangle]
pub extern "C" fn denoise_image_file(
    input: FfiStr,
    output: FfiStr,
    weights_path: FfiStr,
    config: FfiDenoiseConfig,
) -> bool {
    guarded("denoise_image_file", false, || match denoise::shared_bridge() {
        Ok(bridge) => denoise_image_file_with(&bridge, input, output, weights_path, config),
        Err(err) => {
            tracing::error!("{}", err);
            false
        }
    })
}

pub(crate) fn denoise_image_file_with<E: DenoiseEngine>(
    bridge: &DenoiseBridge<E>,
    input: FfiStr,
    output: FfiStr,
    weights_path: FfiStr,
    config: FfiDenoiseConfig,
) -> bool {
    let (Ok(Some(input)), Ok(Some(output))) = (str_arg("input", input), str_arg("output", output))
    else {
        tracing::error!("Input and output paths are required");
        return false;
    };
    let (Ok(weights), Ok(config)) = (weights_arg(weights_path), config_arg(config)) else {
        return false;
    };

    match denoise::denoise_image_file(bridge, Path::new(input), Path::new(output), weights, &config)
    {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("Error denoising '{}': {}", input, err);
            false
        }
    }
}

#[no_mangle]
pub extern "C" fn destroy_ffi_buf(buf: FfiBuf) {
    drop(buf);
}
