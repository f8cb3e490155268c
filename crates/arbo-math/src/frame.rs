//! Coordinate frame identities.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_FRAME_ID: AtomicU32 = AtomicU32::new(0);

/// Identity tag for a right-handed orthonormal coordinate frame.
///
/// Frames are compared by identity only; two frames created separately are
/// never equal, even if they happen to coincide geometrically. Every
/// operation that combines spatial quantities requires their frame tags to
/// satisfy the operation's contract.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Frame(u32);

impl Frame {
    /// Allocate a fresh frame, distinct from every frame created so far.
    pub fn new() -> Self {
        Frame(NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw tag value.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_distinct() {
        let a = Frame::new();
        let b = Frame::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
