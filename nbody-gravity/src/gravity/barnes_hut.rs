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
//! Barnes-Hut approximate gravity
//!
//! Each call builds a fresh [`Octree`] over the active particles, then
//! queries it once per particle for an interaction list and sums the force
//! law over that list. Distant groups of particles are replaced by their
//! total mass at their center of mass whenever
//! `node width / distance < θ`.

use super::octree::{InteractionList, Octree};
use super::{
    acceleration_from, assert_gravitational_constant, assert_softening, warn_if_invalid,
    GravitySolver,
};
use crate::error::Result;
use crate::parallel::{active_mask, for_each_active_with};
use crate::particle::Particle;
use crate::vector::Vector3;

/// Octree-accelerated solver
///
/// The bounding cube only seeds the tree: particles outside it grow the root
/// automatically, at the cost of a deeper tree. A cube that tightly encloses
/// the expected particle spread gives the best trees.
///
/// # Example
///
/// ```
/// use nbody_gravity::gravity::{BarnesHutGravitySolver, GravitySolver};
/// use nbody_gravity::{Particle, Vector3};
///
/// let solver = BarnesHutGravitySolver::new(1.0, 0.01, 0.5, 2.0, Vector3::zero());
/// let mut particles = vec![
///     Particle::new(1.0, Vector3::new(-0.5, 0.0, 0.0)),
///     Particle::new(1.0, Vector3::new(0.5, 0.0, 0.0)),
/// ];
/// solver.compute_acceleration(&mut particles, &[0, 1]).unwrap();
/// assert!(particles[0].acceleration.x > 0.0);
/// assert!(particles[1].acceleration.x < 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BarnesHutGravitySolver {
    /// Gravitational constant
    g_constant: f64,
    /// Softening length ε
    softening: f64,
    /// Opening angle θ
    opening_angle: f64,
    /// Edge length of the initial root cube
    width: f64,
    /// Center of the initial root cube
    center: Vector3,
    /// Whether to warn about non-finite accelerations and merged particles
    warn_on_invalid: bool,
}

impl BarnesHutGravitySolver {
    /// Create a Barnes-Hut solver
    ///
    /// # Arguments
    ///
    /// * `g_constant` - Gravitational constant
    /// * `softening` - Softening length ε
    /// * `opening_angle` - θ; 0 reproduces the direct sum, larger is faster
    /// * `width` - Edge length of the initial bounding cube
    /// * `center` - Center of the initial bounding cube
    ///
    /// # Panics
    ///
    /// Panics if `g_constant`, `softening` or `opening_angle` is negative or
    /// not finite, if `width` is not positive and finite, or if `center` is
    /// not finite.
    pub fn new(
        g_constant: f64,
        softening: f64,
        opening_angle: f64,
        width: f64,
        center: Vector3,
    ) -> Self {
        assert_gravitational_constant(g_constant);
        assert_softening(softening);
        assert_opening_angle(opening_angle);
        assert_bounds(width, center);

        BarnesHutGravitySolver {
            g_constant,
            softening,
            opening_angle,
            width,
            center,
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

    /// Get the opening angle
    pub fn opening_angle(&self) -> f64 {
        self.opening_angle
    }

    /// Get the initial bounding cube as `(width, center)`
    pub fn bounds(&self) -> (f64, Vector3) {
        (self.width, self.center)
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

    /// Set the opening angle
    ///
    /// # Panics
    ///
    /// Panics if `opening_angle` is negative or not finite.
    pub fn set_opening_angle(&mut self, opening_angle: f64) {
        assert_opening_angle(opening_angle);
        self.opening_angle = opening_angle;
    }

    /// Set the initial bounding cube
    ///
    /// # Panics
    ///
    /// Panics if `width` is not positive and finite or `center` is not finite.
    pub fn set_bounds(&mut self, width: f64, center: Vector3) {
        assert_bounds(width, center);
        self.width = width;
        self.center = center;
    }

    /// Set whether to warn about non-finite accelerations and merged particles
    pub fn set_warn_on_invalid(&mut self, warn: bool) {
        self.warn_on_invalid = warn;
    }

    /// Build the octree this solver would use for the given active set
    pub fn build_octree(&self, particles: &[Particle], indices: &[usize]) -> Result<Octree> {
        Octree::from_particles(particles, indices, self.width, self.center)
    }
}

fn assert_opening_angle(opening_angle: f64) {
    assert!(
        opening_angle >= 0.0 && opening_angle.is_finite(),
        "Opening angle must be non-negative and finite"
    );
}

fn assert_bounds(width: f64, center: Vector3) {
    assert!(
        width > 0.0 && width.is_finite(),
        "Bounding width must be positive and finite"
    );
    assert!(center.is_valid(), "Bounding center must be finite");
}

impl GravitySolver for BarnesHutGravitySolver {
    fn name(&self) -> &str {
        "barnes-hut"
    }

    fn compute_acceleration(&self, particles: &mut [Particle], indices: &[usize]) -> Result<()> {
        let mask = active_mask(particles.len(), indices)?;
        let tree = self.build_octree(particles, indices)?;

        if self.warn_on_invalid && tree.merged_count() > 0 {
            eprintln!(
                "Warning: {} particles share an octree leaf with a coincident particle",
                tree.merged_count()
            );
        }

        let theta = self.opening_angle;
        for_each_active_with(
            particles,
            &mask,
            InteractionList::new,
            |list, index, particle| {
                tree.collect_interactions(index, particle.position, theta, list);

                let mut total = Vector3::zero();
                for &source in list.entries() {
                    total += acceleration_from(
                        source,
                        particle.position,
                        self.g_constant,
                        self.softening,
                    );
                }
                particle.acceleration = total;

                warn_if_invalid(self.warn_on_invalid, index, particle.acceleration);
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GravityError;
    use crate::gravity::DirectGravitySolver;

    fn lattice(n: usize, spacing: f64) -> Vec<Particle> {
        let mut particles = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let position = Vector3::new(i as f64, j as f64, k as f64) * spacing;
                    let mass = 1.0 + ((i + 2 * j + 3 * k) % 5) as f64 * 0.25;
                    particles.push(Particle::new(mass, position));
                }
            }
        }
        particles
    }

    #[test]
    fn test_solver_creation() {
        let solver = BarnesHutGravitySolver::new(1.0, 0.1, 0.5, 4.0, Vector3::splat(1.0));
        assert_eq!(solver.name(), "barnes-hut");
        assert_eq!(solver.opening_angle(), 0.5);
        assert_eq!(solver.bounds(), (4.0, Vector3::splat(1.0)));
    }

    #[test]
    #[should_panic(expected = "Opening angle must be non-negative and finite")]
    fn test_negative_opening_angle_panics() {
        BarnesHutGravitySolver::new(1.0, 0.1, -0.5, 4.0, Vector3::zero());
    }

    #[test]
    #[should_panic(expected = "Bounding width must be positive and finite")]
    fn test_zero_width_panics() {
        let mut solver = BarnesHutGravitySolver::new(1.0, 0.1, 0.5, 4.0, Vector3::zero());
        solver.set_bounds(0.0, Vector3::zero());
    }

    #[test]
    fn test_zero_opening_angle_matches_direct() {
        let mut direct = lattice(4, 0.3);
        let mut tree = direct.clone();
        let indices: Vec<usize> = (0..direct.len()).collect();

        DirectGravitySolver::new(1.0, 0.01)
            .compute_acceleration(&mut direct, &indices)
            .unwrap();
        BarnesHutGravitySolver::new(1.0, 0.01, 0.0, 1.0, Vector3::splat(0.45))
            .compute_acceleration(&mut tree, &indices)
            .unwrap();

        let scale = direct
            .iter()
            .map(|p| p.acceleration.norm())
            .fold(0.0, f64::max);
        for (d, t) in direct.iter().zip(&tree) {
            assert!((d.acceleration - t.acceleration).norm() < 1e-10 * scale);
        }
    }

    #[test]
    fn test_only_acceleration_is_written() {
        let mut particles = lattice(3, 0.5);
        for (i, p) in particles.iter_mut().enumerate() {
            p.velocity = Vector3::new(i as f64, 0.0, -1.0);
        }
        let before = particles.clone();
        let indices: Vec<usize> = (0..particles.len()).collect();

        BarnesHutGravitySolver::new(1.0, 0.01, 0.7, 2.0, Vector3::splat(0.5))
            .compute_acceleration(&mut particles, &indices)
            .unwrap();

        for (after, before) in particles.iter().zip(&before) {
            assert_eq!(after.mass, before.mass);
            assert_eq!(after.position, before.position);
            assert_eq!(after.velocity, before.velocity);
            assert!(after.acceleration.is_valid());
        }
    }

    #[test]
    fn test_particles_outside_bounds_are_handled() {
        let mut particles = vec![
            Particle::new(1.0, Vector3::new(50.0, 0.0, 0.0)),
            Particle::new(1.0, Vector3::new(-50.0, 0.0, 0.0)),
            Particle::new(1.0, Vector3::new(0.0, 0.0, 0.0)),
        ];
        let solver = BarnesHutGravitySolver::new(1.0, 0.0, 0.0, 1.0, Vector3::zero());
        solver.compute_acceleration(&mut particles, &[0, 1, 2]).unwrap();

        // symmetric configuration: the middle particle feels no net pull
        assert!(particles[2].acceleration.norm() < 1e-15);
        assert!(particles[0].acceleration.x < 0.0);
        assert!(particles[1].acceleration.x > 0.0);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut particles = lattice(2, 1.0);
        let err = BarnesHutGravitySolver::new(1.0, 0.1, 0.5, 2.0, Vector3::zero())
            .compute_acceleration(&mut particles, &[0, 1, 0])
            .unwrap_err();
        assert_eq!(err, GravityError::DuplicateIndex { index: 0 });
    }

    #[test]
    fn test_non_finite_position_rejected() {
        let mut particles = lattice(2, 1.0);
        particles[3].position = Vector3::new(f64::NAN, 0.0, 0.0);
        let err = BarnesHutGravitySolver::new(1.0, 0.1, 0.5, 2.0, Vector3::zero())
            .compute_acceleration(&mut particles, &[0, 1, 2, 3])
            .unwrap_err();
        assert_eq!(err, GravityError::NonFinitePosition { index: 3 });
    }
}
