//! arbo — rigid-body dynamics for articulated mechanisms.
//!
//! This is the umbrella crate: it re-exports the frame-tagged spatial
//! algebra (`arbo-math`), the mechanism model and cached state
//! (`arbo-model`), and the dynamics algorithms (`arbo-rigid`).

pub use arbo_math::{
    self, Frame, GeometricJacobian, Momentum, MomentumMatrix, SpatialAcceleration, SpatialError,
    SpatialInertia, Transform3D, Twist, Wrench, WrenchMatrix,
};
pub use arbo_model::{
    self, BodyId, Joint, JointId, JointKind, LoopJoint, Mechanism, MechanismState, ModelError,
    RigidBody, TreeJoint,
};
pub use arbo_rigid::{
    self, center_of_mass, dynamics, dynamics_bias, geometric_jacobian,
    gravitational_potential_energy, inverse_dynamics, kinetic_energy, mass_matrix, momentum,
    momentum_matrix, total_energy, DynamicsError, DynamicsResult,
};
