//! Error types for the supply chain demo

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Overlay error: {0}")]
    Overlay(#[from] flowpulse_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("Could not find {0}")]
    ConfigNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_failure_wraps_as_overlay_error() {
        let err: Error = flowpulse_core::Error::Surface("closed".into()).into();
        assert!(matches!(err, Error::Overlay(flowpulse_core::Error::Surface(_))));
    }
}
