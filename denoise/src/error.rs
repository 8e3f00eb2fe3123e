use std::path::PathBuf;

use common::file_utils::ReadBytesError;

use crate::engine::EngineFault;

/// One variant per step of a denoise call that can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Buffer length {actual} does not match {width}x{height}x3 = {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Could not load weights from '{}': {source}", path.display())]
    WeightsUnavailable {
        path: PathBuf,
        #[source]
        source: ReadBytesError,
    },

    #[error("Could not pin the pixel buffer")]
    PinFailed,

    #[error("Could not create a {0:?} device")]
    DeviceCreation(crate::DeviceType),

    #[error("Device commit failed: {0}")]
    DeviceCommit(EngineFault),

    #[error("Could not create a '{0}' filter")]
    FilterCreation(String),

    #[error("Filter commit failed: {0}")]
    FilterCommit(EngineFault),

    #[error("Filter execution failed: {0}")]
    Execution(EngineFault),

    #[error("Denoise engine is unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid denoise configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Image conversion failed: {0}")]
    Image(#[from] imaginarium::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
