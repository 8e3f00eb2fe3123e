mod common;
mod float_rgb;
mod image;

pub mod prelude;

pub use prelude::*;
