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
//! Exact pairwise gravity

use super::{
    acceleration_from, assert_gravitational_constant, assert_softening, warn_if_invalid,
    GravitySolver,
};
use crate::error::Result;
use crate::parallel::{active_mask, for_each_active};
use crate::particle::{Particle, PointMass};
use crate::vector::Vector3;

/// Direct O(n²) summation over all pairs of active particles
///
/// Evaluation runs in two phases: every active acceleration is reset to
/// zero, then each particle accumulates the contribution of every other
/// active particle. The outer loop is parallel; the inner loop over sources
/// runs sequentially inside the task that owns the target particle.
///
/// # Example
///
/// ```
/// use nbody_gravity::gravity::{DirectGravitySolver, GravitySolver};
///
/// let mut solver = DirectGravitySolver::new(1e-3, 0.0);
/// solver.set_softening(1e-3);
/// assert_eq!(solver.name(), "direct");
/// assert_eq!(solver.softening(), 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct DirectGravitySolver {
    /// Gravitational constant
    g_constant: f64,
    /// Softening length ε
    softening: f64,
    /// Whether to warn about non-finite accelerations
    warn_on_invalid: bool,
}

impl DirectGravitySolver {
    /// Create a direct solver with the given gravitational constant and softening
    ///
    /// # Panics
    ///
    /// Panics if either value is negative or not finite.
    pub fn new(g_constant: f64, softening: f64) -> Self {
        assert_gravitational_constant(g_constant);
        assert_softening(softening);

        DirectGravitySolver {
            g_constant,
            softening,
            warn_on_invalid: true,
        }
    }

    /// Get the gravitational constant
    pub fn g_constant(&self) -> f64 {
        self.g_constant
    }

    /// Get the softening length
    pub fn softening(&self) -> f64 {
        self.softening
    }

    /// Set the softening length
    ///
    /// # Panics
    ///
    /// Panics if `softening` is negative or not finite.
    pub fn set_softening(&mut self, softening: f64) {
        assert_softening(softening);
        self.softening = softening;
    }

    /// Set whether to warn about non-finite accelerations
    pub fn set_warn_on_invalid(&mut self, warn: bool) {
        self.warn_on_invalid = warn;
    }

    /// Sum the contributions of `sources` on a target, skipping `target_index`
    fn accumulate(
        &self,
        target_index: usize,
        target: Vector3,
        sources: &[(usize, PointMass)],
    ) -> Vector3 {
        let mut total = Vector3::zero();
        for &(index, source) in sources {
            if index == target_index {
                continue;
            }
            total += acceleration_from(source, target, self.g_constant, self.softening);
        }
        total
    }
}

impl GravitySolver for DirectGravitySolver {
    fn name(&self) -> &str {
        "direct"
    }

    fn compute_acceleration(&self, particles: &mut [Particle], indices: &[usize]) -> Result<()> {
        let mask = active_mask(particles.len(), indices)?;

        for_each_active(particles, &mask, |_, particle| {
            particle.acceleration = Vector3::zero();
        });

        let sources: Vec<(usize, PointMass)> = indices
            .iter()
            .map(|&index| (index, particles[index].point_mass()))
            .collect();

        for_each_active(particles, &mask, |index, particle| {
            particle.acceleration += self.accumulate(index, particle.position, &sources);
            warn_if_invalid(self.warn_on_invalid, index, particle.acceleration);
        });

        Ok(())
    }
}
