use crate::image::{Image, ImageDesc};
use crate::prelude::*;

pub fn image_with(width: u32, height: u32, color_format: ColorFormat, bytes: Vec<u8>) -> Image {
    Image::new_with_data(ImageDesc::new(width, height, color_format), bytes).unwrap()
}

pub fn rgb_u8_image(width: u32, height: u32, bytes: &[u8]) -> Image {
    image_with(width, height, ColorFormat::RGB_U8, bytes.to_vec())
}

pub fn rgba_u8_image(width: u32, height: u32, bytes: &[u8]) -> Image {
    image_with(width, height, ColorFormat::RGBA_U8, bytes.to_vec())
}

/// Deterministic RGB gradient with some texture in every channel.
pub fn gradient_rgb_u8(width: u32, height: u32) -> Image {
    let mut bytes = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            bytes.push((x * 255 / width.max(1)) as u8);
            bytes.push((y * 255 / height.max(1)) as u8);
            bytes.push(((x * 7 + y * 13) % 256) as u8);
        }
    }
    rgb_u8_image(width, height, &bytes)
}
