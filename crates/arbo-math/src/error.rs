//! Error types for the spatial algebra layer.

use crate::Frame;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("frame mismatch in `{op}`: expected {expected}, got {got}")]
    FrameMismatch {
        op: &'static str,
        expected: Frame,
        got: Frame,
    },
}

pub type Result<T> = std::result::Result<T, SpatialError>;

/// Check that `got` is the frame `op` expects.
#[inline]
pub fn check_frame(op: &'static str, expected: Frame, got: Frame) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(SpatialError::FrameMismatch { op, expected, got })
    }
}
