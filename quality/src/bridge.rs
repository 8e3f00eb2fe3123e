use std::panic::{catch_unwind, AssertUnwindSafe};

use imaginarium::Image;

use crate::engine::{GrayImage, QualityEngine};
use crate::error::{Error, Result};

/// Score reported to callers that only understand a plain float.
pub const SCORE_FAILED: f32 = -1.0;

/// Drives one quality engine: decode, reduce to 8-bit gray, score.
///
/// `try_*` methods report the failure cause. The plain methods keep the
/// float-only contract: any failure, including a panic inside the engine,
/// becomes [`SCORE_FAILED`].
#[derive(Debug)]
pub struct QualityBridge<E> {
    engine: E,
}

impl<E: QualityEngine> QualityBridge<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn try_compute_quality_score(
        &self,
        image_path: &str,
        model_path: &str,
        range_path: &str,
    ) -> Result<f32> {
        require_non_empty("image_path", image_path)?;
        require_non_empty("model_path", model_path)?;
        require_non_empty("range_path", range_path)?;

        tracing::debug!("Loading image from '{}'", image_path);

        let image = Image::read_file(image_path).map_err(|source| match source {
            imaginarium::Error::EmptyImage => Error::EmptyImage(image_path.to_string()),
            source => Error::ImageLoad {
                path: image_path.to_string(),
                source,
            },
        })?;

        tracing::debug!("Image loaded: {}", image.desc());

        self.try_score_image(&image, model_path, range_path)
    }

    /// Scores an already decoded image.
    pub fn try_score_image(&self, image: &Image, model_path: &str, range_path: &str) -> Result<f32> {
        require_non_empty("model_path", model_path)?;
        require_non_empty("range_path", range_path)?;

        let gray = image.to_gray_u8().map_err(Error::Conversion)?;

        tracing::debug!("Computing quality score using model '{}'", model_path);

        let scores = self
            .engine
            .compute(GrayImage::try_from(&gray)?, model_path, range_path)?;

        let score = scores[0] as f32;
        if !score.is_finite() {
            return Err(Error::Engine(format!("non-finite score {}", scores[0])));
        }

        tracing::debug!("Quality score computed: {}", score);

        Ok(score)
    }

    pub fn compute_quality_score(&self, image_path: &str, model_path: &str, range_path: &str) -> f32 {
        score_or_sentinel(|| self.try_compute_quality_score(image_path, model_path, range_path))
    }

    pub fn score_image(&self, image: &Image, model_path: &str, range_path: &str) -> f32 {
        score_or_sentinel(|| self.try_score_image(image, model_path, range_path))
    }
}

fn require_non_empty(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::EmptyArgument(name));
    }
    Ok(())
}

fn score_or_sentinel(score: impl FnOnce() -> Result<f32>) -> f32 {
    match catch_unwind(AssertUnwindSafe(score)) {
        Ok(Ok(score)) => score,
        Ok(Err(err)) => {
            tracing::error!("Error computing quality score: {}", err);
            SCORE_FAILED
        }
        Err(_) => {
            tracing::error!("Unknown error computing quality score: engine panicked");
            SCORE_FAILED
        }
    }
}
