pub(crate) mod color_format;
pub(crate) mod conversion;
pub(crate) mod error;
#[cfg(test)]
pub(crate) mod test_utils;

// Public API
pub use color_format::{Channels, ColorFormat, SampleType};
pub use error::{Error, Result};
