use imaginarium::{ColorFormat, Image};

use crate::error::{Error, Result};

/// Number of components in an engine result. Only the first one is the score.
pub const SCORE_COMPONENTS: usize = 4;

/// Borrowed single-channel 8-bit raster handed to a quality engine.
#[derive(Clone, Copy, Debug)]
pub struct GrayImage<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub data: &'a [u8],
}

impl<'a> TryFrom<&'a Image> for GrayImage<'a> {
    type Error = Error;

    fn try_from(image: &'a Image) -> Result<Self> {
        let desc = image.desc();
        if desc.color_format != ColorFormat::L_U8 {
            return Err(Error::Conversion(imaginarium::Error::UnsupportedColorType(
                format!("quality engines take {}, got {}", ColorFormat::L_U8, desc.color_format),
            )));
        }

        Ok(GrayImage {
            width: desc.width,
            height: desc.height,
            stride: desc.stride,
            data: image.bytes(),
        })
    }
}

/// A no-reference quality scorer. The model and range paths are opaque tokens
/// that only the engine interprets.
pub trait QualityEngine {
    fn compute(
        &self,
        image: GrayImage<'_>,
        model_path: &str,
        range_path: &str,
    ) -> Result<[f64; SCORE_COMPONENTS]>;
}

impl<E: QualityEngine + ?Sized> QualityEngine for &E {
    fn compute(
        &self,
        image: GrayImage<'_>,
        model_path: &str,
        range_path: &str,
    ) -> Result<[f64; SCORE_COMPONENTS]> {
        (**self).compute(image, model_path, range_path)
    }
}
