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
//! Integration tests checking structural invariants of the octree

use nbody_gravity::gravity::octree::{octant_sign, MAX_DEPTH};
use nbody_gravity::gravity::{NodeId, Octree, OctreeBuilder, OctreeNode};
use nbody_gravity::{GravityError, Particle, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn gaussian_ish_cloud(seed: u64, n: usize, spread: f64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            // sum of uniforms concentrates particles toward the middle
            let mut coord = || (0..3).map(|_| rng.gen::<f64>() - 0.5).sum::<f64>() * spread;
            let position = Vector3::new(coord(), coord(), coord());
            Particle::new(0.5 + rng.gen::<f64>(), position)
        })
        .collect()
}

/// Totals gathered while walking a subtree
struct Subtree {
    mass: f64,
    weighted: Vector3,
    particles: Vec<usize>,
}

/// Walk the subtree under `id`, asserting per-node invariants on the way
fn check_node(tree: &Octree, particles: &[Particle], id: NodeId, depth: usize) -> Subtree {
    let node = tree.node(id);
    assert!(node.width() > 0.0);
    assert!(depth <= MAX_DEPTH + 64, "tree deeper than expected");

    match node {
        OctreeNode::Leaf {
            width,
            center,
            particles: members,
        } => {
            assert!(!members.is_empty());
            let mut mass = 0.0;
            let mut weighted = Vector3::zero();
            for &index in &members {
                let p = &particles[index];
                assert!(
                    (p.position - center).max_abs() <= 0.5 * width,
                    "particle {} outside its leaf",
                    index
                );
                mass += p.mass;
                weighted += p.position * p.mass;
            }
            Subtree {
                mass,
                weighted,
                particles: members,
            }
        }
        OctreeNode::Branch {
            width,
            center,
            mass,
            mass_center,
            children,
        } => {
            let mut total = Subtree {
                mass: 0.0,
                weighted: Vector3::zero(),
                particles: Vec::new(),
            };

            for (octant, child) in children.iter().enumerate() {
                let Some(child) = *child else { continue };

                let child_node = tree.node(child);
                assert_eq!(child_node.width(), 0.5 * width);
                let expected_center = center + octant_sign(octant) * (0.25 * width);
                assert!((child_node.center() - expected_center).norm() < 1e-12 * width);

                let sub = check_node(tree, particles, child, depth + 1);
                total.mass += sub.mass;
                total.weighted += sub.weighted;
                total.particles.extend(sub.particles);
            }

            assert!((mass - total.mass).abs() <= 1e-12 * total.mass.max(1.0));
            if total.mass > 0.0 {
                let expected = total.weighted / total.mass;
                assert!((mass_center - expected).norm() <= 1e-10 * (1.0 + expected.norm()));
            }
            total
        }
    }
}

#[test]
fn test_mass_is_conserved_at_every_branch() {
    let particles = gaussian_ish_cloud(42, 500, 1.0);
    let indices: Vec<usize> = (0..particles.len()).collect();
    let tree = Octree::from_particles(&particles, &indices, 2.0, Vector3::zero()).unwrap();

    let total = check_node(&tree, &particles, tree.root(), 0);
    let expected_mass: f64 = particles.iter().map(|p| p.mass).sum();

    assert!((tree.mass() - expected_mass).abs() < 1e-10);
    assert!((total.mass - expected_mass).abs() < 1e-10);
    assert_eq!(tree.particle_count(), particles.len());
    assert_eq!(tree.merged_count(), 0);

    // every particle sits in exactly one leaf
    let mut seen = total.particles;
    seen.sort_unstable();
    assert_eq!(seen, indices);
}

#[test]
fn test_root_grows_to_contain_far_particles() {
    let mut particles = gaussian_ish_cloud(9, 200, 0.5);
    particles.push(Particle::new(1.0, Vector3::new(1000.0, -500.0, 7.0)));
    particles.push(Particle::new(2.0, Vector3::new(-3.0e4, 0.25, 9.0e3)));
    particles.push(Particle::new(0.5, Vector3::new(0.0, 0.0, -123.0)));
    let indices: Vec<usize> = (0..particles.len()).collect();

    let tree = Octree::from_particles(&particles, &indices, 1.0, Vector3::zero()).unwrap();

    assert!(tree.root_width() >= 3.1e4);
    for p in &particles {
        assert!(tree.contains(p.position));
    }

    let total = check_node(&tree, &particles, tree.root(), 0);
    assert_eq!(total.particles.len(), particles.len());
}

#[test]
fn test_subset_tree_only_holds_active_particles() {
    let particles = gaussian_ish_cloud(1, 100, 1.0);
    let active: Vec<usize> = (0..100).rev().step_by(4).collect();
    let tree = Octree::from_particles(&particles, &active, 4.0, Vector3::zero()).unwrap();

    let mut seen = check_node(&tree, &particles, tree.root(), 0).particles;
    seen.sort_unstable();
    let mut expected = active.clone();
    expected.sort_unstable();
    assert_eq!(seen, expected);

    let expected_mass: f64 = active.iter().map(|&i| particles[i].mass).sum();
    assert!((tree.mass() - expected_mass).abs() < 1e-12);
}

#[test]
fn test_builder_matches_from_particles() {
    let particles = gaussian_ish_cloud(5, 50, 1.0);
    let indices: Vec<usize> = (0..particles.len()).collect();

    let mut builder = OctreeBuilder::new(2.0, Vector3::zero());
    for &i in &indices {
        builder.insert(i, particles[i].mass, particles[i].position).unwrap();
    }
    assert_eq!(builder.len(), particles.len());
    let built = builder.build();

    let direct = Octree::from_particles(&particles, &indices, 2.0, Vector3::zero()).unwrap();
    assert_eq!(built.node_count(), direct.node_count());
    assert_eq!(built.root_width(), direct.root_width());
    for i in [0, 17, 49] {
        assert_eq!(
            built.interactions(i, particles[i].position, 0.7),
            direct.interactions(i, particles[i].position, 0.7)
        );
    }
}

#[test]
fn test_missing_index_is_reported() {
    let particles = gaussian_ish_cloud(3, 4, 1.0);
    let err = Octree::from_particles(&particles, &[0, 9], 2.0, Vector3::zero()).unwrap_err();
    assert_eq!(err, GravityError::IndexOutOfRange { index: 9, len: 4 });
}

#[test]
fn test_coincident_particles_share_a_leaf() {
    let mut particles = gaussian_ish_cloud(8, 20, 1.0);
    let shared = Vector3::new(0.125, -0.25, 0.375);
    for particle in particles.iter_mut().take(5) {
        particle.position = shared;
    }
    let indices: Vec<usize> = (0..particles.len()).collect();

    let tree = Octree::from_particles(&particles, &indices, 2.0, Vector3::zero()).unwrap();
    assert_eq!(tree.merged_count(), 4);

    let total = check_node(&tree, &particles, tree.root(), 0);
    assert_eq!(total.particles.len(), particles.len());

    // each merged particle still sees the other four individually
    let list = tree.interactions(2, shared, 0.0);
    let coincident = list.iter().filter(|pm| pm.position == shared).count();
    assert_eq!(coincident, 4);
    assert_eq!(list.len(), particles.len() - 1);
}
