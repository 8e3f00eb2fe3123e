use imaginarium::{FloatRgb, Image};

use crate::bridge::{DenoiseBridge, WeightsSource};
use crate::config::DenoiseConfig;
use crate::engine::DenoiseEngine;
use crate::error::Result;

/// Denoises a decoded image: converts it to a float RGB map, runs the filter in
/// place and rebuilds an `RGBA_U8` image. Alpha is carried through untouched.
pub fn denoise_image<E: DenoiseEngine>(
    bridge: &DenoiseBridge<E>,
    image: &Image,
    weights: WeightsSource<'_>,
    config: &DenoiseConfig,
) -> Result<Image> {
    let (mut map, alpha) = FloatRgb::from_image(image)?;
    let (width, height) = (map.width(), map.height());

    tracing::debug!("Denoising {}x{} image", width, height);

    bridge.try_denoise(map.pixels_mut(), width, height, weights, config)?;

    Ok(map.to_image(alpha.as_deref())?)
}

/// Reads `input`, denoises it and writes the result to `output`. The output
/// format follows the extension of `output`.
pub fn denoise_image_file<E: DenoiseEngine>(
    bridge: &DenoiseBridge<E>,
    input: &std::path::Path,
    output: &std::path::Path,
    weights: WeightsSource<'_>,
    config: &DenoiseConfig,
) -> Result<()> {
    let image = Image::read_file(input)?;
    let denoised = denoise_image(bridge, &image, weights, config)?;
    denoised.save_file(output)?;

    tracing::info!("Denoised '{}' into '{}'", input.display(), output.display());

    Ok(())
}
