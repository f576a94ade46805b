// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Gravitational acceleration solvers
//!
//! Two interchangeable strategies compute the acceleration of every particle
//! in an active set from the other active particles:
//!
//! - [`DirectGravitySolver`]: exact pairwise summation, O(n²) per step
//! - [`BarnesHutGravitySolver`]: octree approximation, close to O(n log n)
//!   for well-distributed particles
//!
//! # Physics Background
//!
//! Newton's law of universal gravitation gives the acceleration of a target
//! at position x_t caused by a source of mass m at position x_s:
//!
//! **a = G * m * (x_s - x_t) / |x_s - x_t|³**
//!
//! ## Softening Factor
//!
//! To prevent singularities when particles are very close or occupy the same
//! position, a softening length ε is added under the distance term:
//!
//! **a = G * m * (x_s - x_t) / (|x_s - x_t|² + ε²)^(3/2)**
//!
//! This is a standard technique in N-body simulations. See:
//! - Dehnen, W. (2001). "Towards optimal softening in three-dimensional N-body codes"
//! - Aarseth, S. J. (2003). "Gravitational N-Body Simulations"
//!
//! With ε = 0 two particles at the same position produce a non-finite
//! acceleration. Callers that can produce coincident particles must use
//! ε > 0.
//!
//! ## Barnes-Hut
//!
//! - Barnes, J. & Hut, P. (1986). "A hierarchical O(N log N) force-calculation
//!   algorithm". Nature, 324, 446-449.
//!
//! # Parallel Computation
//!
//! Both solvers fan out over the active particles with Rayon (feature
//! `parallel`). Each task accumulates the full acceleration of exactly one
//! particle, reading other particles from a snapshot, so no two tasks write
//! the same memory.

use crate::error::Result;
use crate::particle::{Particle, PointMass};
use crate::vector::Vector3;

mod barnes_hut;
mod direct;
pub mod octree;

pub use barnes_hut::BarnesHutGravitySolver;
pub use direct::DirectGravitySolver;
pub use octree::{InteractionList, NodeId, Octree, OctreeBuilder, OctreeNode};

/// Standard gravitational constant in SI units (m³/(kg⋅s²))
///
/// CODATA 2018 recommended value: 6.67430(15) × 10⁻¹¹ m³/(kg⋅s²)
/// Source: https://physics.nist.gov/cgi-bin/cuu/Value?bg
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11;

/// Common contract of the acceleration solvers
///
/// # Example
///
/// ```
/// use nbody_gravity::gravity::{DirectGravitySolver, GravitySolver};
/// use nbody_gravity::{Particle, Vector3};
///
/// let mut particles = vec![
///     Particle::new(1.0, Vector3::new(0.0, 0.0, 0.0)),
///     Particle::new(1.0, Vector3::new(1.0, 0.0, 0.0)),
/// ];
/// let solver = DirectGravitySolver::new(1.0, 0.0);
/// solver.compute_acceleration(&mut particles, &[0, 1]).unwrap();
///
/// assert_eq!(particles[0].acceleration, Vector3::new(1.0, 0.0, 0.0));
/// assert_eq!(particles[1].acceleration, Vector3::new(-1.0, 0.0, 0.0));
/// ```
pub trait GravitySolver: Send + Sync {
    /// Get the name of this solver
    fn name(&self) -> &str;

    /// Overwrite the acceleration of every particle named in `indices`
    ///
    /// Only active particles act as sources. Writes nothing but the
    /// `acceleration` field of active particles.
    ///
    /// # Errors
    ///
    /// Returns [`GravityError::IndexOutOfRange`](crate::GravityError::IndexOutOfRange)
    /// or [`GravityError::DuplicateIndex`](crate::GravityError::DuplicateIndex)
    /// for an invalid active set, before any particle is modified.
    fn compute_acceleration(&self, particles: &mut [Particle], indices: &[usize]) -> Result<()>;
}

/// Softened acceleration that `source` induces at `target`
///
/// `G * m * (x_s - x_t) / (|x_s - x_t|² + ε²)^(3/2)`
#[inline]
pub fn acceleration_from(
    source: PointMass,
    target: Vector3,
    g_constant: f64,
    softening: f64,
) -> Vector3 {
    let diff = source.position - target;
    let softened_r_squared = diff.norm_squared() + softening * softening;
    let inv_r_cubed = 1.0 / (softened_r_squared * softened_r_squared.sqrt());
    diff * (g_constant * source.mass * inv_r_cubed)
}

pub(crate) fn assert_gravitational_constant(g_constant: f64) {
    assert!(
        g_constant >= 0.0 && g_constant.is_finite(),
        "Gravitational constant must be non-negative and finite"
    );
}

pub(crate) fn assert_softening(softening: f64) {
    assert!(
        softening >= 0.0 && softening.is_finite(),
        "Softening factor must be non-negative and finite"
    );
}

/// Report a particle whose new acceleration is not finite
pub(crate) fn warn_if_invalid(warn_on_invalid: bool, index: usize, acceleration: Vector3) {
    if warn_on_invalid && !acceleration.is_valid() {
        eprintln!(
            "Warning: Non-finite acceleration for particle {} (coincident particles without softening?)",
            index
        );
    }
}
