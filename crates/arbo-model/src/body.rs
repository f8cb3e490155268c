//! Rigid body definition.

use crate::error::{ModelError, Result};
use arbo_math::{Frame, SpatialInertia, Transform3D};

/// A rigid body in the mechanism.
///
/// Every body has a default body-fixed frame; its inertia is expressed in
/// that frame. Additional body-fixed frames (joint attachment frames, sensor
/// mounts, …) are recorded as transforms to the default frame.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub name: String,
    /// Spatial inertia in the default frame; `None` for the root body.
    pub inertia: Option<SpatialInertia>,
    /// The body's default frame.
    pub frame: Frame,
    /// Auxiliary body-fixed frames: transforms from each frame to `frame`.
    pub frame_definitions: Vec<Transform3D>,
}

impl RigidBody {
    /// Create a body from its spatial inertia; the inertia's frame becomes
    /// the body's default frame.
    pub fn new(name: &str, inertia: SpatialInertia) -> Self {
        Self {
            name: name.to_string(),
            frame: inertia.frame,
            inertia: Some(inertia),
            frame_definitions: Vec::new(),
        }
    }

    /// Create an inertia-less root body with a fresh default frame.
    pub fn root(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inertia: None,
            frame: Frame::new(),
            frame_definitions: Vec::new(),
        }
    }

    /// Register a body-fixed frame via its transform to the default frame.
    pub fn add_frame_definition(&mut self, tf: Transform3D) -> Result<()> {
        if tf.to != self.frame {
            return Err(ModelError::Topology(format!(
                "frame definition for body `{}` must map to its default frame {}, got {}",
                self.name, self.frame, tf.to
            )));
        }
        self.frame_definitions.push(tf);
        Ok(())
    }

    /// Transform from `frame` to the default frame, if `frame` is fixed to
    /// this body.
    pub fn frame_definition(&self, frame: Frame) -> Option<Transform3D> {
        if frame == self.frame {
            return Some(Transform3D::identity(frame, frame));
        }
        self.frame_definitions
            .iter()
            .find(|tf| tf.from == frame)
            .copied()
    }
}
