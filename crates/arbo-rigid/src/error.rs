//! Error types for the dynamics algorithms.

use arbo_math::SpatialError;
use arbo_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DynamicsError {
    #[error(transparent)]
    Frame(#[from] SpatialError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("result buffers were built for mechanism version {expected}, state has {got}")]
    StaleState { expected: u64, got: u64 },

    #[error("mass matrix is not positive definite")]
    SingularInertia,

    #[error("loop constraints are redundant; constraint Schur complement is singular")]
    RedundantConstraint,
}

pub type Result<T> = std::result::Result<T, DynamicsError>;
