//! Dynamics algorithms over cached mechanism states.
//!
//! Implements:
//! - Composite Rigid Body Algorithm (CRBA) for the mass matrix
//! - Recursive Newton–Euler Algorithm (RNEA) for inverse dynamics
//! - Forward dynamics with loop constraints via a Cholesky/Schur KKT solve
//! - Geometric Jacobians, momentum, center of mass, and energy utilities

pub mod crba;
pub mod dynamics;
pub mod energy;
pub mod error;
pub mod jacobian;
pub mod rnea;

pub use crba::mass_matrix;
pub use dynamics::{dynamics, DynamicsResult};
pub use energy::{
    center_of_mass, gravitational_potential_energy, kinetic_energy, momentum, momentum_matrix,
    total_energy,
};
pub use error::DynamicsError;
pub use jacobian::geometric_jacobian;
pub use rnea::{dynamics_bias, inverse_dynamics};
