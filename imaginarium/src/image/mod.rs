mod io;


use std::path::Path;

/// Image file extensions the encoder can write.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp", "webp"];

use crate::common::conversion::{convert_to_gray_u8, convert_to_rgba_u8};
use crate::common::{ColorFormat, Error, Result};

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub color_format: ColorFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    desc: ImageDesc,
    bytes: Vec<u8>,
}

impl Image {
    /// Returns the image descriptor.
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Returns the image bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn new_empty(desc: ImageDesc) -> Result<Image> {
        desc.validate()?;

        let bytes = vec![0; desc.size_in_bytes()];

        Ok(Image { desc, bytes })
    }

    pub fn new_with_data(desc: ImageDesc, bytes: Vec<u8>) -> Result<Image> {
        desc.validate()?;

        if bytes.len() != desc.size_in_bytes() {
            return Err(Error::InvalidDimensions(format!(
                "bytes length {} does not match expected size {}",
                bytes.len(),
                desc.size_in_bytes()
            )));
        }

        Ok(Image { desc, bytes })
    }

    /// Decodes an image file. The container format is sniffed from the file
    /// content, so the extension does not have to match.
    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Image> {
        io::load(filename)
    }

    pub fn save_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let extension = filename
            .as_ref()
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or_else(|| Error::UnsupportedFormat("missing extension".to_string()))?
            .to_ascii_lowercase();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedFormat(extension));
        }

        io::save(self, filename)
    }

    /// Single-channel 8-bit form used by scoring engines.
    /// An `L_U8` image is returned unchanged.
    pub fn to_gray_u8(&self) -> Result<Image> {
        if self.desc.color_format == ColorFormat::L_U8 {
            return Ok(self.clone());
        }

        tracing::debug!("Converting {} to {}", self.desc, ColorFormat::L_U8);

        convert_to_gray_u8(self)
    }

    pub fn to_rgba_u8(&self) -> Result<Image> {
        if self.desc.color_format == ColorFormat::RGBA_U8 {
            return Ok(self.clone());
        }

        convert_to_rgba_u8(self)
    }
}

impl ImageDesc {
    /// Descriptor with tightly packed rows.
    pub fn new(width: u32, height: u32, color_format: ColorFormat) -> Self {
        Self {
            width,
            height,
            stride: width as usize * color_format.pixel_bytes(),
            color_format,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.height as usize * self.stride
    }

    /// Returns the number of bytes per row without padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.color_format.pixel_bytes()
    }

    /// Returns true if stride equals row bytes (no padding).
    pub fn is_packed(&self) -> bool {
        self.stride == self.row_bytes()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::EmptyImage);
        }

        if self.stride < self.row_bytes() {
            return Err(Error::InvalidDimensions(format!(
                "stride {} is smaller than row size {}",
                self.stride,
                self.row_bytes()
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for ImageDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.color_format)
    }
}
