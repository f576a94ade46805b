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
//! Point-mass state
//!
//! The particle store is a plain slice of [`Particle`] owned by the caller.
//! A particle's identity is its index in that slice; solvers and integrators
//! address particles only through indices.

use crate::vector::Vector3;

/// Point mass with Newtonian state
///
/// `acceleration` is transient: solvers overwrite it on every force
/// evaluation and integrators read it afterwards in the same step.
///
/// # Examples
///
/// ```
/// use nbody_gravity::{Particle, Vector3};
///
/// let p = Particle::new(2.0, Vector3::new(1.0, 0.0, 0.0))
///     .with_velocity(Vector3::new(0.0, 1.0, 0.0));
/// assert_eq!(p.mass, 2.0);
/// assert_eq!(p.acceleration, Vector3::zero());
/// assert!(p.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// Mass (positive by convention, not enforced)
    pub mass: f64,
    /// Position
    pub position: Vector3,
    /// Velocity
    pub velocity: Vector3,
    /// Acceleration from the most recent force evaluation
    pub acceleration: Vector3,
}

impl Particle {
    /// Create a particle at rest with zero acceleration
    pub fn new(mass: f64, position: Vector3) -> Self {
        Particle {
            mass,
            position,
            velocity: Vector3::zero(),
            acceleration: Vector3::zero(),
        }
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, velocity: Vector3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Check that mass and all vector fields are finite
    pub fn is_valid(&self) -> bool {
        self.mass.is_finite()
            && self.position.is_valid()
            && self.velocity.is_valid()
            && self.acceleration.is_valid()
    }

    /// Mass and position as a lightweight source entry
    pub fn point_mass(&self) -> PointMass {
        PointMass::new(self.mass, self.position)
    }
}

/// Lightweight (mass, position) pair
///
/// Returned by spatial queries for both real particles and aggregated
/// sub-trees. Carries no store index.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointMass {
    /// Mass
    pub mass: f64,
    /// Position (center of mass for aggregated entries)
    pub position: Vector3,
}

impl PointMass {
    /// Create a new point mass
    pub fn new(mass: f64, position: Vector3) -> Self {
        PointMass { mass, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_defaults() {
        let p = Particle::new(1.5, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p.velocity, Vector3::zero());
        assert_eq!(p.acceleration, Vector3::zero());
        assert_eq!(p.point_mass(), PointMass::new(1.5, Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_particle_validity() {
        let mut p = Particle::new(1.0, Vector3::zero());
        assert!(p.is_valid());

        p.acceleration = Vector3::new(f64::NAN, 0.0, 0.0);
        assert!(!p.is_valid());

        let p = Particle::new(f64::INFINITY, Vector3::zero());
        assert!(!p.is_valid());
    }
}
