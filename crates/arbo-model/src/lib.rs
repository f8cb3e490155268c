//! Mechanism model: bodies, joints, topology, and cached state.
//!
//! `Mechanism` is the static description of an articulated system (spanning
//! tree of joints over rigid bodies, plus loop joints). `MechanismState`
//! owns the configuration and velocity vectors and the per-body caches the
//! dynamics algorithms run over.

pub mod body;
pub mod error;
pub mod joint;
pub mod mechanism;
pub mod state;

pub use body::RigidBody;
pub use error::ModelError;
pub use joint::{Joint, JointKind};
pub use mechanism::{BodyId, JointId, LoopJoint, Mechanism, TreeJoint};
pub use state::MechanismState;
