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
//! Simulation parameters
//!
//! [`SimulationConfig`] gathers every scalar and vector parameter of a run.
//! The defaults describe a small demonstration system: a few hundred
//! particles of mass below one, scattered in a unit cube, in simulation units
//! where G = 0.001.

use crate::error::{GravityError, Result};
use crate::gravity::{BarnesHutGravitySolver, DirectGravitySolver, GravitySolver};
use crate::integration::LeapfrogIntegrator;
use crate::vector::Vector3;

/// Which force solver a simulation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Exact pairwise summation
    Direct,
    /// Octree approximation controlled by the opening angle
    #[default]
    BarnesHut,
}

/// Configuration for a simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Gravitational constant G
    pub gravitational_constant: f64,
    /// Softening length ε
    pub softening: f64,
    /// Barnes-Hut opening angle θ
    pub opening_angle: f64,
    /// Edge length of the initial octree root cube
    pub bounding_width: f64,
    /// Center of the initial octree root cube
    pub bounding_center: Vector3,
    /// Integration timestep (may be negative)
    pub timestep: f64,
    /// Number of steps [`Simulation::run_configured`](crate::Simulation::run_configured) performs
    pub step_count: usize,
    /// Force solver
    pub solver: SolverKind,
    /// Worker threads; 0 uses the global Rayon pool
    pub threads: usize,
    /// Whether solvers print warnings about non-finite results
    pub warn_on_invalid: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            gravitational_constant: 0.001,
            softening: 0.001,
            opening_angle: 0.5,
            bounding_width: 2.0,
            bounding_center: Vector3::zero(),
            timestep: 0.05,
            step_count: 100,
            solver: SolverKind::BarnesHut,
            threads: 0,
            warn_on_invalid: true,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with the given solver and default parameters
    pub fn new(solver: SolverKind) -> Self {
        SimulationConfig {
            solver,
            ..Default::default()
        }
    }

    /// Set the gravitational constant
    pub fn with_gravitational_constant(mut self, g_constant: f64) -> Self {
        self.gravitational_constant = g_constant;
        self
    }

    /// Set the softening length
    pub fn with_softening(mut self, softening: f64) -> Self {
        self.softening = softening;
        self
    }

    /// Set the opening angle
    pub fn with_opening_angle(mut self, opening_angle: f64) -> Self {
        self.opening_angle = opening_angle;
        self
    }

    /// Set the initial bounding cube
    pub fn with_bounds(mut self, width: f64, center: Vector3) -> Self {
        self.bounding_width = width;
        self.bounding_center = center;
        self
    }

    /// Set the timestep
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set the number of steps
    pub fn with_step_count(mut self, step_count: usize) -> Self {
        self.step_count = step_count;
        self
    }

    /// Set the number of worker threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Disable warnings about non-finite results
    pub fn without_warnings(mut self) -> Self {
        self.warn_on_invalid = false;
        self
    }

    /// Check every parameter
    ///
    /// Solver and integrator constructors panic on the values rejected here,
    /// so configurations from untrusted sources should be validated first.
    /// Opening angle and bounds are only checked for the Barnes-Hut solver.
    pub fn validate(&self) -> Result<()> {
        let g = self.gravitational_constant;
        if !(g >= 0.0 && g.is_finite()) {
            return Err(GravityError::InvalidConfig(format!(
                "gravitational constant must be non-negative and finite, got {}",
                g
            )));
        }

        if !(self.softening >= 0.0 && self.softening.is_finite()) {
            return Err(GravityError::InvalidConfig(format!(
                "softening must be non-negative and finite, got {}",
                self.softening
            )));
        }

        if self.timestep == 0.0 || !self.timestep.is_finite() {
            return Err(GravityError::InvalidConfig(format!(
                "timestep must be finite and non-zero, got {}",
                self.timestep
            )));
        }

        if self.solver == SolverKind::BarnesHut {
            if !(self.opening_angle >= 0.0 && self.opening_angle.is_finite()) {
                return Err(GravityError::InvalidConfig(format!(
                    "opening angle must be non-negative and finite, got {}",
                    self.opening_angle
                )));
            }

            if !(self.bounding_width > 0.0 && self.bounding_width.is_finite()) {
                return Err(GravityError::InvalidConfig(format!(
                    "bounding width must be positive and finite, got {}",
                    self.bounding_width
                )));
            }

            if !self.bounding_center.is_valid() {
                return Err(GravityError::InvalidConfig(
                    "bounding center must be finite".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Build the configured force solver
    pub fn build_solver(&self) -> Result<Box<dyn GravitySolver>> {
        self.validate()?;

        let solver: Box<dyn GravitySolver> = match self.solver {
            SolverKind::Direct => {
                let mut solver =
                    DirectGravitySolver::new(self.gravitational_constant, self.softening);
                solver.set_warn_on_invalid(self.warn_on_invalid);
                Box::new(solver)
            }
            SolverKind::BarnesHut => {
                let mut solver = BarnesHutGravitySolver::new(
                    self.gravitational_constant,
                    self.softening,
                    self.opening_angle,
                    self.bounding_width,
                    self.bounding_center,
                );
                solver.set_warn_on_invalid(self.warn_on_invalid);
                Box::new(solver)
            }
        };

        Ok(solver)
    }

    /// Build the leapfrog integrator for the configured timestep
    pub fn build_integrator(&self) -> Result<LeapfrogIntegrator> {
        self.validate()?;
        Ok(LeapfrogIntegrator::new(self.timestep))
    }
}
