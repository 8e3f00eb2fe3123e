//! In-place learned denoising of interleaved RGB float buffers.
//!
//! [`DenoiseBridge`] drives one engine device and one filter per call through
//! the typed lifecycle in [`lifecycle`]. The engine is reached through
//! [`DenoiseEngine`]; [`OidnLibrary`] is the production backend.

mod bridge;
mod config;
mod engine;
mod error;
mod image_denoise;
pub mod lifecycle;
mod oidn;
mod pinned;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use bridge::{DenoiseBridge, WeightsSource};
pub use config::{DenoiseConfig, QualityTier};
pub use engine::{names, DenoiseEngine, DeviceType, EngineFault, ImageFormat};
pub use error::{Error, Result};
pub use image_denoise::{denoise_image, denoise_image_file};
pub use lifecycle::{Device, Filter};
pub use oidn::{OidnDevice, OidnFilter, OidnLibrary, LIBRARY_ENV};
pub use pinned::PinnedBuffer;

/// Bridge over the process-wide engine library.
pub fn shared_bridge() -> Result<DenoiseBridge<&'static OidnLibrary>> {
    OidnLibrary::shared().map(DenoiseBridge::new)
}

/// Number of physical devices the engine reports, 0 when the engine library is
/// unavailable.
pub fn device_count() -> i32 {
    match shared_bridge() {
        Ok(bridge) => bridge.device_count(),
        Err(err) => {
            tracing::warn!("{}", err);
            0
        }
    }
}

/// Name of the first engine device, `"none"` when the engine library is
/// unavailable or reports no device.
pub fn device_name() -> String {
    match shared_bridge() {
        Ok(bridge) => bridge.device_name(),
        Err(err) => {
            tracing::warn!("{}", err);
            "none".to_string()
        }
    }
}
