
use rayon::prelude::*;

use crate::common::color_format::*;
use crate::common::error::Result;
use crate::image::{Image, ImageDesc};

// =============================================================================
// Per-sample access
// =============================================================================

/// One channel sample as stored in an image row (native endianness).
pub(crate) trait Sample: Copy + Send + Sync {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Self;

    /// Luma from RGB in the sample's own precision.
    fn luma(r: Self, g: Self, b: Self) -> Self;

    /// Rescales the sample intensity to the 8-bit range.
    fn to_u8(self) -> u8;
}

// ITU-R BT.601 luma weights in 14-bit fixed point:
// R: 0.299 * 16384 = 4899
// G: 0.587 * 16384 = 9617
// B: 0.114 * 16384 = 1868
// Total: 16384
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

#[inline]
fn fixed_point_luma(r: u32, g: u32, b: u32) -> u32 {
    (r * LUMA_R + g * LUMA_G + b * LUMA_B + LUMA_ROUND) >> LUMA_SHIFT
}

impl Sample for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn luma(r: Self, g: Self, b: Self) -> Self {
        fixed_point_luma(r as u32, g as u32, b as u32) as u8
    }

    #[inline]
    fn to_u8(self) -> u8 {
        self
    }
}

impl Sample for u16 {
    const SIZE: usize = 2;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        u16::from_ne_bytes([bytes[0], bytes[1]])
    }

    #[inline]
    fn luma(r: Self, g: Self, b: Self) -> Self {
        fixed_point_luma(r as u32, g as u32, b as u32) as u16
    }

    #[inline]
    fn to_u8(self) -> u8 {
        (self >> 8) as u8
    }
}

impl Sample for f32 {
    const SIZE: usize = 4;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline]
    fn luma(r: Self, g: Self, b: Self) -> Self {
        0.299 * r + 0.587 * g + 0.114 * b
    }

    #[inline]
    fn to_u8(self) -> u8 {
        // NaN saturates to 0 through the cast.
        (self.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

// =============================================================================
// Image conversion
// =============================================================================

macro_rules! dispatch_sample {
    ($from:expr, $to:expr, $func:ident) => {
        match $from.desc().color_format.sample {
            SampleType::U8 => $func::<u8>($from, $to),
            SampleType::U16 => $func::<u16>($from, $to),
            SampleType::F32 => $func::<f32>($from, $to),
        }
    };
}

/// Single-channel 8-bit copy of `from`. Color is reduced to BT.601 luma,
/// alpha is dropped and other bit depths are rescaled to 8 bits.
pub(crate) fn convert_to_gray_u8(from: &Image) -> Result<Image> {
    let desc = ImageDesc::new(from.desc().width, from.desc().height, ColorFormat::L_U8);
    let mut bytes = vec![0u8; desc.size_in_bytes()];

    dispatch_sample!(from, &mut bytes, gray_pixels);

    Image::new_with_data(desc, bytes)
}

/// 8-bit RGBA copy of `from`. Gray is replicated, missing alpha is opaque.
pub(crate) fn convert_to_rgba_u8(from: &Image) -> Result<Image> {
    let desc = ImageDesc::new(from.desc().width, from.desc().height, ColorFormat::RGBA_U8);
    let mut bytes = vec![0u8; desc.size_in_bytes()];

    dispatch_sample!(from, &mut bytes, rgba_pixels);

    Image::new_with_data(desc, bytes)
}

fn gray_pixels<S: Sample>(from: &Image, to: &mut [u8]) {
    let width = from.desc().width as usize;
    let channels = from.desc().color_format.channels.count();
    let stride = from.desc().stride;
    let pixel_bytes = channels * S::SIZE;

    to.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, to_row)| {
            let from_row = &from.bytes()[y * stride..y * stride + width * pixel_bytes];

            for (dst, src) in to_row.iter_mut().zip(from_row.chunks_exact(pixel_bytes)) {
                let channel = |i: usize| S::read(&src[i * S::SIZE..]);

                *dst = match channels {
                    1 | 2 => channel(0).to_u8(),
                    _ => S::luma(channel(0), channel(1), channel(2)).to_u8(),
                };
            }
        });
}

fn rgba_pixels<S: Sample>(from: &Image, to: &mut [u8]) {
    let width = from.desc().width as usize;
    let channels = from.desc().color_format.channels.count();
    let stride = from.desc().stride;
    let pixel_bytes = channels * S::SIZE;

    to.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, to_row)| {
            let from_row = &from.bytes()[y * stride..y * stride + width * pixel_bytes];

            for (dst, src) in to_row
                .chunks_exact_mut(4)
                .zip(from_row.chunks_exact(pixel_bytes))
            {
                let channel = |i: usize| S::read(&src[i * S::SIZE..]).to_u8();

                match channels {
                    1 => {
                        let v = channel(0);
                        dst.copy_from_slice(&[v, v, v, 255]);
                    }
                    2 => {
                        let v = channel(0);
                        dst.copy_from_slice(&[v, v, v, channel(1)]);
                    }
                    3 => dst.copy_from_slice(&[channel(0), channel(1), channel(2), 255]),
                    _ => dst.copy_from_slice(&[channel(0), channel(1), channel(2), channel(3)]),
                }
            }
        });
}
