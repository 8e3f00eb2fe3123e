//! No-reference image quality scoring behind a float-only boundary.
//!
//! The scoring algorithm is an external engine reached through
//! [`QualityEngine`]; this crate only prepares its input and normalizes every
//! failure.

mod bridge;
mod engine;
mod error;
mod native;

#[cfg(test)]
mod tests;

pub use bridge::{QualityBridge, SCORE_FAILED};
pub use engine::{GrayImage, QualityEngine, SCORE_COMPONENTS};
pub use error::{Error, Result};
pub use native::{ComputeFn, NativeQualityEngine, LIBRARY_ENV};

/// Scores `image_path` with the process-wide native engine.
/// Returns [`SCORE_FAILED`] when the engine library cannot be loaded.
pub fn compute_quality_score(image_path: &str, model_path: &str, range_path: &str) -> f32 {
    match NativeQualityEngine::shared() {
        Ok(engine) => {
            QualityBridge::new(engine).compute_quality_score(image_path, model_path, range_path)
        }
        Err(err) => {
            tracing::error!("Error computing quality score: {}", err);
            SCORE_FAILED
        }
    }
}
