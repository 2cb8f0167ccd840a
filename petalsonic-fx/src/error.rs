//! Error types for PetalSonic FX

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PetalSonicFxError {
    #[error("Invalid parameter index: {index}")]
    InvalidParameter { index: usize },

    #[error("Parameter {index} is not of type {expected}")]
    ParameterType { index: usize, expected: &'static str },

    #[error("Engine context is already initialized")]
    AlreadyInitialized,

    #[error("Resource creation error: {0}")]
    ResourceCreation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PetalSonicFxError>;
