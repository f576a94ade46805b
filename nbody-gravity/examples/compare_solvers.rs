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
//! Direct vs Barnes-Hut Comparison Example
//!
//! Runs the same random particle system twice, once with exact direct
//! summation and once with the Barnes-Hut octree solver, and prints where
//! particle 0 ends up together with energy diagnostics for each run.
//!
//! # Running
//!
//! ```bash
//! # Run with default settings (300 particles, 100 steps)
//! cargo run --example compare_solvers --release
//!
//! # Larger system with a tighter opening angle
//! cargo run --example compare_solvers --release -- --particles 2000 --theta 0.3
//!
//! # Pin the worker pool size
//! cargo run --example compare_solvers --release -- --threads 4
//! ```

use std::time::Instant;

use nbody_gravity::diagnostics::{center_of_mass, kinetic_energy, potential_energy};
use nbody_gravity::{Particle, Simulation, SimulationConfig, SolverKind, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Command-line options
struct Options {
    particles: usize,
    steps: usize,
    theta: f64,
    threads: usize,
}

impl Default for Options {
    fn default() -> Self {
        let config = SimulationConfig::default();
        Options {
            particles: 300,
            steps: config.step_count,
            theta: config.opening_angle,
            threads: config.threads,
        }
    }
}

fn parse_args() -> Options {
    let mut options = Options::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        match (flag, value) {
            ("--particles", Some(v)) => match v.parse() {
                Ok(n) => options.particles = n,
                Err(_) => eprintln!("Warning: Invalid particle count '{}', using {}", v, options.particles),
            },
            ("--steps", Some(v)) => match v.parse() {
                Ok(n) => options.steps = n,
                Err(_) => eprintln!("Warning: Invalid step count '{}', using {}", v, options.steps),
            },
            ("--theta", Some(v)) => match v.parse() {
                Ok(t) => options.theta = t,
                Err(_) => eprintln!("Warning: Invalid opening angle '{}', using {}", v, options.theta),
            },
            ("--threads", Some(v)) => match v.parse() {
                Ok(n) => options.threads = n,
                Err(_) => eprintln!("Warning: Invalid thread count '{}', using {}", v, options.threads),
            },
            ("--particles" | "--steps" | "--theta" | "--threads", None) => {
                eprintln!("Error: {} requires an argument", flag);
                std::process::exit(1);
            }
            _ => {
                eprintln!("Warning: Unknown argument '{}'", flag);
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    options
}

/// Uniform cloud in the unit cube with masses in [0, 1), all at rest
fn generate(n: usize) -> (Vec<Particle>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(0);
    let particles = (0..n)
        .map(|_| {
            let mass = rng.gen::<f64>();
            let position = Vector3::new(rng.gen(), rng.gen(), rng.gen());
            Particle::new(mass, position)
        })
        .collect();
    let indices = (0..n).collect();
    (particles, indices)
}

fn print_diagnostics(particles: &[Particle], indices: &[usize], config: &SimulationConfig) {
    let g = config.gravitational_constant;
    let eps = config.softening;

    let ke = kinetic_energy(particles, indices).unwrap_or(f64::NAN);
    let pe = potential_energy(particles, indices, g, eps).unwrap_or(f64::NAN);
    let com = center_of_mass(particles, indices).unwrap_or(Vector3::zero());

    println!("  Kinetic Energy:   {:.6e}", ke);
    println!("  Potential Energy: {:.6e}", pe);
    println!("  Total Energy:     {:.6e}", ke + pe);
    println!("  Center of Mass:   ({:.6}, {:.6}, {:.6})", com.x, com.y, com.z);
}

fn run(kind: SolverKind, options: &Options) -> Result<Vec<Particle>, nbody_gravity::GravityError> {
    let config = SimulationConfig::new(kind)
        .with_opening_angle(options.theta)
        .with_step_count(options.steps)
        .with_threads(options.threads);
    let mut simulation = Simulation::from_config(&config)?;
    let (mut particles, indices) = generate(options.particles);

    println!("=== {} ({} threads) ===", simulation.solver().name(), simulation.thread_count());
    if let Some(p) = particles.first() {
        println!("  Particle 0 before: {:?}", p.position);
    }
    print_diagnostics(&particles, &indices, &config);

    let start = Instant::now();
    let summary = simulation.run_configured(&mut particles, &indices)?;
    let elapsed = start.elapsed();

    println!(
        "  {} steps, simulated time {:.2}, wall time {:.3} s",
        summary.steps,
        summary.simulated_time,
        elapsed.as_secs_f64()
    );
    if let Some(p) = particles.first() {
        println!("  Particle 0 after:  {:?}", p.position);
    }
    print_diagnostics(&particles, &indices, &config);
    println!();

    Ok(particles)
}

fn main() {
    let options = parse_args();

    println!("==========================================================");
    println!("       Direct vs Barnes-Hut N-Body Comparison");
    println!("==========================================================");
    println!();

    let direct = match run(SolverKind::Direct, &options) {
        Ok(particles) => particles,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let tree = match run(SolverKind::BarnesHut, &options) {
        Ok(particles) => particles,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let max_deviation = direct
        .iter()
        .zip(&tree)
        .map(|(a, b)| (a.position - b.position).norm())
        .fold(0.0, f64::max);
    println!("Largest position difference between solvers: {:.3e}", max_deviation);
}
