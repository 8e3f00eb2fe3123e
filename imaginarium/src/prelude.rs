// Color formats
pub use crate::common::{Channels, ColorFormat, SampleType};

// Error handling
pub use crate::common::{Error, Result};

// Image types
pub use crate::float_rgb::FloatRgb;
pub use crate::image::{Image, ImageDesc, SUPPORTED_EXTENSIONS};
