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
//! # N-Body Gravity
//!
//! Gravitational force evaluation and time integration for sets of point
//! masses, with exact and approximate solvers.
//!
//! ## Features
//!
//! - **Direct Summation**: Exact O(n²) pairwise forces
//! - **Barnes-Hut**: Octree approximation with a tunable opening angle
//! - **Leapfrog Integration**: Drift-kick-drift time stepping
//! - **Active Sets**: Every operation works on a caller-chosen subset of particles
//! - **Parallelization**: Optional Rayon integration for multi-threaded execution
//!
//! ## Example
//!
//! ```rust
//! use nbody_gravity::gravity::{BarnesHutGravitySolver, GravitySolver};
//! use nbody_gravity::integration::{Integrator, LeapfrogIntegrator};
//! use nbody_gravity::{Particle, Vector3};
//!
//! let mut particles = vec![
//!     Particle::new(1.0, Vector3::new(0.0, 0.0, 0.0)),
//!     Particle::new(0.5, Vector3::new(0.5, 0.0, 0.0)),
//!     Particle::new(0.5, Vector3::new(0.0, 0.5, 0.0)),
//! ];
//! let active = [0, 1, 2];
//!
//! let solver = BarnesHutGravitySolver::new(0.001, 0.001, 0.5, 2.0, Vector3::zero());
//! let integrator = LeapfrogIntegrator::new(0.05);
//!
//! for _ in 0..10 {
//!     solver.compute_acceleration(&mut particles, &active).unwrap();
//!     integrator.forward(&mut particles, &active).unwrap();
//! }
//! ```

#![warn(missing_docs)]

/// Simulation parameters
pub mod config;

/// Energy, momentum and center of mass
pub mod diagnostics;

/// Error types
pub mod error;

/// Gravitational acceleration solvers and the octree
pub mod gravity;

/// Numerical integration methods
pub mod integration;

/// Particle state
pub mod particle;

/// Simulation driver
pub mod simulation;

/// 3D vector math
pub mod vector;

mod parallel;

pub use config::{SimulationConfig, SolverKind};
pub use error::{GravityError, Result};
pub use gravity::{BarnesHutGravitySolver, DirectGravitySolver, GravitySolver};
pub use integration::{Integrator, LeapfrogIntegrator};
pub use particle::{Particle, PointMass};
pub use simulation::{RunSummary, Simulation};
pub use vector::Vector3;
