//! Interleaved float RGB map, the pixel layout denoising engines consume.
//!
//! Samples are `r, g, b` in `[0, 1]`, rows stored bottom-up: bitmap row `r`
//! lands at map row `height - 1 - r`. Alpha does not take part in denoising and
//! travels next to the map in bitmap row order.

use crate::common::{ColorFormat, Error, Result};
use crate::image::{Image, ImageDesc};

#[derive(Clone, Debug, PartialEq)]
pub struct FloatRgb {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl FloatRgb {
    pub fn new(width: u32, height: u32, pixels: Vec<f32>) -> Result<FloatRgb> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage);
        }

        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(Error::InvalidDimensions(format!(
                "float map of {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }

        Ok(FloatRgb {
            width,
            height,
            pixels,
        })
    }

    /// Splits `image` into a float map and, when the image carries alpha, a
    /// separate alpha plane.
    pub fn from_image(image: &Image) -> Result<(FloatRgb, Option<Vec<f32>>)> {
        let has_alpha = image.desc().color_format.channels.has_alpha();
        let rgba = image.to_rgba_u8()?;

        let width = rgba.desc().width as usize;
        let height = rgba.desc().height as usize;
        let stride = rgba.desc().stride;

        let mut pixels = vec![0f32; width * height * 3];
        let mut alpha = has_alpha.then(|| vec![0f32; width * height]);

        for row in 0..height {
            let map_row = height - 1 - row;
            let src = &rgba.bytes()[row * stride..row * stride + width * 4];

            for (col, px) in src.chunks_exact(4).enumerate() {
                let i = (map_row * width + col) * 3;
                pixels[i] = px[0] as f32 / 255.0;
                pixels[i + 1] = px[1] as f32 / 255.0;
                pixels[i + 2] = px[2] as f32 / 255.0;

                if let Some(alpha) = alpha.as_mut() {
                    alpha[row * width + col] = px[3] as f32 / 255.0;
                }
            }
        }

        let map = FloatRgb {
            width: rgba.desc().width,
            height: rgba.desc().height,
            pixels,
        };

        Ok((map, alpha))
    }

    /// Rebuilds an `RGBA_U8` image. Samples are truncated after scaling to
    /// 255 and clamped; without an alpha plane the result is opaque.
    pub fn to_image(&self, alpha: Option<&[f32]>) -> Result<Image> {
        let width = self.width as usize;
        let height = self.height as usize;

        if let Some(alpha) = alpha {
            if alpha.len() != width * height {
                return Err(Error::InvalidDimensions(format!(
                    "alpha plane has {} samples, expected {}",
                    alpha.len(),
                    width * height
                )));
            }
        }

        let desc = ImageDesc::new(self.width, self.height, ColorFormat::RGBA_U8);
        let mut bytes = vec![0u8; desc.size_in_bytes()];

        for map_row in 0..height {
            let row = height - 1 - map_row;
            let dst = &mut bytes[row * desc.stride..row * desc.stride + width * 4];

            for (col, px) in dst.chunks_exact_mut(4).enumerate() {
                let i = (map_row * width + col) * 3;
                px[0] = clamp255(self.pixels[i] * 255.0);
                px[1] = clamp255(self.pixels[i + 1] * 255.0);
                px[2] = clamp255(self.pixels[i + 2] * 255.0);
                px[3] = alpha.map_or(255, |alpha| clamp255(alpha[row * width + col] * 255.0));
            }
        }

        Image::new_with_data(desc, bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<f32> {
        self.pixels
    }
}

#[inline]
fn clamp255(v: f32) -> u8 {
    (v as i32).clamp(0, 255) as u8
}
