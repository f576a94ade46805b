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
//! Simulation driver
//!
//! A [`Simulation`] pairs one force solver with one integrator. Each step
//! runs two phases in order:
//!
//! 1. `solver.compute_acceleration` overwrites every active acceleration
//! 2. `integrator.forward` advances every active position and velocity
//!
//! Both phases run to completion before the next begins. When a thread count
//! is configured the whole step executes inside a dedicated Rayon pool.

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::gravity::GravitySolver;
use crate::integration::Integrator;
use crate::parallel::WorkerPool;
use crate::particle::Particle;

/// Outcome of [`Simulation::run`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Number of steps performed
    pub steps: usize,
    /// Simulated time covered by the run (`steps * dt`)
    pub simulated_time: f64,
}

/// One solver and one integrator advancing a particle store
///
/// # Example
///
/// ```
/// use nbody_gravity::{Particle, Simulation, SimulationConfig, SolverKind, Vector3};
///
/// let config = SimulationConfig::new(SolverKind::Direct)
///     .with_gravitational_constant(1.0)
///     .with_softening(0.01)
///     .with_timestep(0.001);
/// let mut simulation = Simulation::from_config(&config).unwrap();
///
/// let mut particles = vec![
///     Particle::new(1.0, Vector3::new(-0.5, 0.0, 0.0)),
///     Particle::new(1.0, Vector3::new(0.5, 0.0, 0.0)),
/// ];
/// let summary = simulation.run(&mut particles, &[0, 1], 10).unwrap();
///
/// assert_eq!(summary.steps, 10);
/// assert!(particles[0].position.x > -0.5);
/// ```
pub struct Simulation {
    solver: Box<dyn GravitySolver>,
    integrator: Box<dyn Integrator>,
    pool: WorkerPool,
    step_count: usize,
    steps_taken: usize,
}

impl Simulation {
    /// Pair a solver with an integrator, running on the global Rayon pool
    ///
    /// The step count used by [`Simulation::run_configured`] starts at 0.
    pub fn new(solver: Box<dyn GravitySolver>, integrator: Box<dyn Integrator>) -> Self {
        Simulation {
            solver,
            integrator,
            pool: WorkerPool::global(),
            step_count: 0,
            steps_taken: 0,
        }
    }

    /// Build the solver, integrator and worker pool described by `config`
    ///
    /// Prints the integrator's timestep warning, if any, when
    /// `config.warn_on_invalid` is set.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let solver = config.build_solver()?;
        let integrator = config.build_integrator()?;

        if config.warn_on_invalid {
            if let Err(warning) = integrator.validate_timestep() {
                eprintln!("{}", warning);
            }
        }

        Simulation::new(solver, Box::new(integrator))
            .with_step_count(config.step_count)
            .with_threads(config.threads)
    }

    /// Set the number of steps [`Simulation::run_configured`] performs
    pub fn with_step_count(mut self, steps: usize) -> Self {
        self.step_count = steps;
        self
    }

    /// Run every step inside a dedicated pool of `threads` workers
    ///
    /// `threads == 0` returns to the global Rayon pool.
    pub fn with_threads(mut self, threads: usize) -> Result<Self> {
        self.pool = WorkerPool::new(threads)?;
        Ok(self)
    }

    /// Get the force solver
    pub fn solver(&self) -> &dyn GravitySolver {
        self.solver.as_ref()
    }

    /// Get the integrator
    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    /// Number of worker threads each step runs on
    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }

    /// Number of steps [`Simulation::run_configured`] performs
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Total number of successful steps since creation
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Advance the active particles by one timestep
    ///
    /// # Errors
    ///
    /// Propagates active-set and octree construction errors from the solver.
    /// On error the step is abandoned before any position or velocity
    /// changes.
    pub fn step(&mut self, particles: &mut [Particle], indices: &[usize]) -> Result<()> {
        let solver = self.solver.as_ref();
        let integrator = self.integrator.as_ref();

        self.pool.install(|| {
            solver.compute_acceleration(particles, indices)?;
            integrator.forward(particles, indices)
        })?;

        self.steps_taken += 1;
        Ok(())
    }

    /// Perform `steps` consecutive steps
    ///
    /// Stops at the first failing step and returns its error.
    pub fn run(
        &mut self,
        particles: &mut [Particle],
        indices: &[usize],
        steps: usize,
    ) -> Result<RunSummary> {
        for _ in 0..steps {
            self.step(particles, indices)?;
        }

        Ok(RunSummary {
            steps,
            simulated_time: steps as f64 * self.integrator.timestep(),
        })
    }

    /// Perform the configured number of steps
    ///
    /// Equivalent to [`Simulation::run`] with [`Simulation::step_count`].
    pub fn run_configured(
        &mut self,
        particles: &mut [Particle],
        indices: &[usize],
    ) -> Result<RunSummary> {
        self.run(particles, indices, self.step_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverKind;
    use crate::error::GravityError;
    use crate::gravity::DirectGravitySolver;
    use crate::integration::LeapfrogIntegrator;
    use crate::vector::Vector3;

    fn two_body() -> Vec<Particle> {
        vec![
            Particle::new(1.0, Vector3::new(-0.5, 0.0, 0.0)),
            Particle::new(1.0, Vector3::new(0.5, 0.0, 0.0)),
        ]
    }

    #[test]
    fn test_step_moves_particles_toward_each_other() {
        let mut simulation = Simulation::new(
            Box::new(DirectGravitySolver::new(1.0, 0.0)),
            Box::new(LeapfrogIntegrator::new(0.1)),
        );
        let mut particles = two_body();

        simulation.step(&mut particles, &[0, 1]).unwrap();

        // a = ±1, v = ±0.1, x moves by 0.5 * 0.1 * 0.1
        assert!((particles[0].velocity.x - 0.1).abs() < 1e-12);
        assert!((particles[1].velocity.x + 0.1).abs() < 1e-12);
        assert!((particles[0].position.x + 0.495).abs() < 1e-12);
        assert_eq!(simulation.steps_taken(), 1);
    }

    #[test]
    fn test_run_summary() {
        let config = SimulationConfig::new(SolverKind::BarnesHut)
            .with_timestep(0.25)
            .without_warnings();
        let mut simulation = Simulation::from_config(&config).unwrap();
        let mut particles = two_body();

        let summary = simulation.run(&mut particles, &[0, 1], 4).unwrap();
        assert_eq!(summary.steps, 4);
        assert_eq!(summary.simulated_time, 1.0);
        assert_eq!(simulation.steps_taken(), 4);
        assert_eq!(simulation.solver().name(), "barnes-hut");
        assert_eq!(simulation.integrator().name(), "Leapfrog");
    }

    #[test]
    fn test_run_configured_uses_config_step_count() {
        let config = SimulationConfig::new(SolverKind::Direct)
            .with_timestep(0.1)
            .with_step_count(7)
            .without_warnings();
        let mut simulation = Simulation::from_config(&config).unwrap();
        assert_eq!(simulation.step_count(), 7);

        let mut particles = two_body();
        let summary = simulation.run_configured(&mut particles, &[0, 1]).unwrap();
        assert_eq!(summary.steps, 7);
        assert!((summary.simulated_time - 0.7).abs() < 1e-12);
        assert_eq!(simulation.steps_taken(), 7);
    }

    #[test]
    fn test_new_simulation_has_no_configured_steps() {
        let mut simulation = Simulation::new(
            Box::new(DirectGravitySolver::new(1.0, 0.0)),
            Box::new(LeapfrogIntegrator::new(0.1)),
        );
        assert_eq!(simulation.step_count(), 0);

        let mut particles = two_body();
        let before = particles.clone();
        let summary = simulation.run_configured(&mut particles, &[0, 1]).unwrap();
        assert_eq!(summary.steps, 0);
        assert_eq!(particles, before);

        let simulation = simulation.with_step_count(3);
        assert_eq!(simulation.step_count(), 3);
    }

    #[test]
    fn test_failed_step_leaves_store_untouched() {
        let mut simulation = Simulation::from_config(&SimulationConfig::default()).unwrap();
        let mut particles = two_body();
        let before = particles.clone();

        let err = simulation.run(&mut particles, &[0, 1, 2], 3).unwrap_err();
        assert_eq!(err, GravityError::IndexOutOfRange { index: 2, len: 2 });
        assert_eq!(particles, before);
        assert_eq!(simulation.steps_taken(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig::default().with_softening(-1.0);
        assert!(matches!(
            Simulation::from_config(&config),
            Err(GravityError::InvalidConfig(_))
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_dedicated_pool() {
        let config = SimulationConfig::default().with_threads(3);
        let simulation = Simulation::from_config(&config).unwrap();
        assert_eq!(simulation.thread_count(), 3);
    }
}
