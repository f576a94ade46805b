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
//! Conserved quantities of an active set
//!
//! Used to monitor a simulation: for an isolated system the total energy
//! and momentum stay constant, so their drift over a run measures the error
//! of the solver and integrator together.
//!
//! The potential energy uses the same softened kernel as the solvers:
//!
//! **U = -Σ_{i<j} G * m_i * m_j / sqrt(|x_i - x_j|² + ε²)**

use crate::error::Result;
use crate::parallel::active_mask;
use crate::particle::Particle;
use crate::vector::Vector3;

/// Total kinetic energy `Σ ½ m v²` of the active particles
pub fn kinetic_energy(particles: &[Particle], indices: &[usize]) -> Result<f64> {
    active_mask(particles.len(), indices)?;

    Ok(indices
        .iter()
        .map(|&i| {
            let p = &particles[i];
            0.5 * p.mass * p.velocity.norm_squared()
        })
        .sum())
}

/// Total softened potential energy of the active particles
///
/// Each pair is counted once. O(n²).
pub fn potential_energy(
    particles: &[Particle],
    indices: &[usize],
    g_constant: f64,
    softening: f64,
) -> Result<f64> {
    active_mask(particles.len(), indices)?;

    let eps_squared = softening * softening;
    let mut energy = 0.0;
    for (n, &i) in indices.iter().enumerate() {
        let a = &particles[i];
        for &j in &indices[n + 1..] {
            let b = &particles[j];
            let r = ((a.position - b.position).norm_squared() + eps_squared).sqrt();
            energy -= g_constant * a.mass * b.mass / r;
        }
    }
    Ok(energy)
}

/// Kinetic plus potential energy
pub fn total_energy(
    particles: &[Particle],
    indices: &[usize],
    g_constant: f64,
    softening: f64,
) -> Result<f64> {
    Ok(kinetic_energy(particles, indices)?
        + potential_energy(particles, indices, g_constant, softening)?)
}

/// Total linear momentum `Σ m v`
pub fn total_momentum(particles: &[Particle], indices: &[usize]) -> Result<Vector3> {
    active_mask(particles.len(), indices)?;

    let mut momentum = Vector3::zero();
    for &i in indices {
        momentum += particles[i].velocity * particles[i].mass;
    }
    Ok(momentum)
}

/// Mass-weighted mean position, or the origin when the total mass is zero
pub fn center_of_mass(particles: &[Particle], indices: &[usize]) -> Result<Vector3> {
    active_mask(particles.len(), indices)?;

    let mut mass = 0.0;
    let mut weighted = Vector3::zero();
    for &i in indices {
        mass += particles[i].mass;
        weighted += particles[i].position * particles[i].mass;
    }

    if mass == 0.0 {
        Ok(Vector3::zero())
    } else {
        Ok(weighted / mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GravityError;

    fn pair() -> Vec<Particle> {
        vec![
            Particle::new(1.0, Vector3::new(0.0, 0.0, 0.0))
                .with_velocity(Vector3::new(0.0, 1.0, 0.0)),
            Particle::new(3.0, Vector3::new(4.0, 0.0, 0.0))
                .with_velocity(Vector3::new(0.0, -2.0, 0.0)),
        ]
    }

    #[test]
    fn test_kinetic_energy() {
        let particles = pair();
        // 0.5*1*1 + 0.5*3*4
        assert_eq!(kinetic_energy(&particles, &[0, 1]).unwrap(), 6.5);
        assert_eq!(kinetic_energy(&particles, &[0]).unwrap(), 0.5);
        assert_eq!(kinetic_energy(&particles, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_potential_energy() {
        let particles = pair();
        let u = potential_energy(&particles, &[0, 1], 2.0, 0.0).unwrap();
        // -2 * 1 * 3 / 4
        assert!((u + 1.5).abs() < 1e-15);

        // softening 3 turns the 4 separation into 5
        let u = potential_energy(&particles, &[0, 1], 2.0, 3.0).unwrap();
        assert!((u + 1.2).abs() < 1e-15);

        assert_eq!(potential_energy(&particles, &[1], 2.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_total_energy() {
        let particles = pair();
        let e = total_energy(&particles, &[0, 1], 2.0, 0.0).unwrap();
        assert!((e - 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_total_momentum() {
        let particles = pair();
        let p = total_momentum(&particles, &[0, 1]).unwrap();
        assert_eq!(p, Vector3::new(0.0, -5.0, 0.0));
    }

    #[test]
    fn test_center_of_mass() {
        let particles = pair();
        assert_eq!(
            center_of_mass(&particles, &[0, 1]).unwrap(),
            Vector3::new(3.0, 0.0, 0.0)
        );

        let massless = vec![Particle::new(0.0, Vector3::splat(5.0))];
        assert_eq!(center_of_mass(&massless, &[0]).unwrap(), Vector3::zero());
    }

    #[test]
    fn test_invalid_indices() {
        let particles = pair();
        assert_eq!(
            kinetic_energy(&particles, &[0, 2]).unwrap_err(),
            GravityError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(
            total_momentum(&particles, &[1, 1]).unwrap_err(),
            GravityError::DuplicateIndex { index: 1 }
        );
    }
}
