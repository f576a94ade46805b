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
//! Numerical integration methods for advancing particle state
//!
//! Integrators run after a solver has written fresh accelerations and advance
//! position and velocity of every active particle by one timestep. They never
//! evaluate forces themselves.
//!
//! # Integrators
//!
//! - **Leapfrog (drift-kick-drift)**: time-reversible under a fixed
//!   acceleration; one force evaluation per step
//!
//! # Timestep Guidelines
//!
//! - Too small: Numerical precision issues and wasted computation
//! - Too large: Instability and inaccuracy, especially in close encounters
//! - Negative timesteps run the system backwards in time

use crate::error::Result;
use crate::particle::Particle;

mod leapfrog;

pub use leapfrog::LeapfrogIntegrator;

/// Trait for numerical integration methods
///
/// Integrators update position and velocity of the particles named in an
/// active set, reading the acceleration computed earlier in the same step.
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Get the timestep used by this integrator
    fn timestep(&self) -> f64;

    /// Set the timestep for this integrator
    ///
    /// # Panics
    ///
    /// Panics if timestep is zero, NaN, or infinite
    fn set_timestep(&mut self, dt: f64);

    /// Validate the timestep for stability
    ///
    /// Returns warnings if the timestep might cause numerical issues.
    /// Extremely small timesteps may lead to precision loss, while large
    /// timesteps may cause instability.
    fn validate_timestep(&self) -> std::result::Result<(), String> {
        let dt = self.timestep();

        if dt == 0.0 || !dt.is_finite() {
            return Err(format!("Invalid timestep: {}. Must be finite and non-zero.", dt));
        }

        if dt.abs() < 1e-9 {
            return Err(format!(
                "Warning: Timestep {} is extremely small and may cause precision loss with f64. \
                Consider using larger timestep or higher precision types.",
                dt
            ));
        }

        if dt.abs() > 1.0 {
            return Err(format!(
                "Warning: Timestep {} is large and may cause instability. \
                Consider using smaller timesteps for better accuracy.",
                dt
            ));
        }

        Ok(())
    }

    /// Advance every particle named in `indices` by one timestep
    ///
    /// # Errors
    ///
    /// Returns [`GravityError::IndexOutOfRange`](crate::GravityError::IndexOutOfRange)
    /// or [`GravityError::DuplicateIndex`](crate::GravityError::DuplicateIndex)
    /// for an invalid active set, before any particle is modified.
    fn forward(&self, particles: &mut [Particle], indices: &[usize]) -> Result<()>;
}

pub(crate) fn assert_timestep(dt: f64) {
    assert!(
        dt != 0.0 && dt.is_finite(),
        "Timestep must be finite and non-zero"
    );
}
