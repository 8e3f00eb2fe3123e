use std::path::Path;

use image as image_lib;
use image_lib::ImageReader;

use super::{Image, ImageDesc};
use crate::common::{ColorFormat, Error, Result};

pub(crate) fn load<P: AsRef<Path>>(filename: P) -> Result<Image> {
    let img = ImageReader::open(filename.as_ref())?
        .with_guessed_format()?
        .decode()?;

    let color_format = match img.color() {
        image_lib::ColorType::L8 => ColorFormat::L_U8,
        image_lib::ColorType::L16 => ColorFormat::L_U16,
        image_lib::ColorType::La8 => ColorFormat::LA_U8,
        image_lib::ColorType::La16 => ColorFormat::LA_U16,
        image_lib::ColorType::Rgb8 => ColorFormat::RGB_U8,
        image_lib::ColorType::Rgb16 => ColorFormat::RGB_U16,
        image_lib::ColorType::Rgb32F => ColorFormat::RGB_F32,
        image_lib::ColorType::Rgba8 => ColorFormat::RGBA_U8,
        image_lib::ColorType::Rgba16 => ColorFormat::RGBA_U16,
        image_lib::ColorType::Rgba32F => ColorFormat::RGBA_F32,
        other => return Err(Error::UnsupportedColorType(format!("{:?}", other))),
    };

    let desc = ImageDesc::new(img.width(), img.height(), color_format);

    tracing::debug!(
        "Decoded '{}' as {}",
        filename.as_ref().display(),
        desc
    );

    Image::new_with_data(desc, img.into_bytes())
}

/// Writes the image as 8-bit samples. JPEG output drops alpha.
pub(crate) fn save<P: AsRef<Path>>(image: &Image, filename: P) -> Result<()> {
    debug_assert!(
        image.desc().is_packed(),
        "Image must be packed before saving"
    );

    let filename = filename.as_ref();
    let rgba = image.to_rgba_u8()?;
    let (width, height) = (rgba.desc().width, rgba.desc().height);

    let is_jpeg = filename
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    if is_jpeg {
        let rgb: Vec<u8> = rgba
            .bytes()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        image_lib::save_buffer(filename, &rgb, width, height, image_lib::ColorType::Rgb8)?;
    } else {
        image_lib::save_buffer(filename, rgba.bytes(), width, height, image_lib::ColorType::Rgba8)?;
    }

    tracing::debug!("Saved {} to '{}'", rgba.desc(), filename.display());

    Ok(())
}
