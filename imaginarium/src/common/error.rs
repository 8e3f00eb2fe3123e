use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    UnsupportedColorType(String),
    UnsupportedFormat(String),
    InvalidDimensions(String),
    Decoding(String),
    Encoding(String),
    EmptyImage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::UnsupportedColorType(msg) => write!(f, "Unsupported color type: {}", msg),
            Error::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            Error::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {}", msg),
            Error::Decoding(msg) => write!(f, "Decoding error: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::EmptyImage => write!(f, "Image has no pixels"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(e) => Error::Io(e),
            image::ImageError::Encoding(e) => Error::Encoding(e.to_string()),
            other => Error::Decoding(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
