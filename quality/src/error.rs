use thiserror::Error;

/// Reasons a quality score could not be produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Argument '{0}' is empty")]
    EmptyArgument(&'static str),

    #[error("Argument '{0}' contains an interior NUL byte")]
    InvalidArgument(&'static str),

    #[error("Could not load image from '{path}': {source}")]
    ImageLoad {
        path: String,
        #[source]
        source: imaginarium::Error,
    },

    #[error("Image '{0}' has no pixels")]
    EmptyImage(String),

    #[error("Grayscale conversion failed: {0}")]
    Conversion(#[source] imaginarium::Error),

    #[error("Quality engine failed: {0}")]
    Engine(String),

    #[error("Quality engine is unavailable: {0}")]
    EngineUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
