//! Error types for flowpulse-term

use thiserror::Error;

/// Terminal surface error
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot rasterize {item}: non-finite coordinates")]
    NonFinite { item: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
