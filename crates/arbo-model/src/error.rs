//! Error types for the mechanism model.

use arbo_math::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("configuration out of range: {0}")]
    ConfigurationOutOfRange(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error(transparent)]
    Frame(#[from] SpatialError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
