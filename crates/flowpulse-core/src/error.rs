//! Error types for flowpulse-core

use thiserror::Error;

/// Reason a pulse request was rejected at the scheduler boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseRequestError {
    #[error("pulse duration must be positive and finite, got {0} ms")]
    NonPositiveDuration(f64),

    #[error("pulse gap must be non-negative and finite, got {0} ms")]
    InvalidGap(f64),

    #[error("a train of {count} pulses exceeds the limit of {max}")]
    TrainTooLong { count: u32, max: u32 },
}

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid pulse request: {0}")]
    InvalidPulseRequest(#[from] PulseRequestError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout provider error: {0}")]
    Layout(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Overlay is already attached")]
    AlreadyAttached,

    #[error("Overlay has been disposed")]
    Disposed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
