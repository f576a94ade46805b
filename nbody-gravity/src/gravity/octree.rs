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
//! Octree spatial index for Barnes-Hut force approximation
//!
//! The tree partitions a cube into eight octants recursively. Each branch
//! stores the total mass and center of mass of everything below it, so a
//! distant branch can stand in for all of its particles as one
//! pseudo-particle.
//!
//! # Lifecycle
//!
//! A tree is built from scratch for every force evaluation:
//!
//! 1. [`OctreeBuilder::new`] creates an empty root cube.
//! 2. [`OctreeBuilder::insert`] adds particles one at a time. A particle
//!    outside the root cube first grows the root (doubling its width toward
//!    the particle) until it fits. The old root becomes a child of the new
//!    one unless it is still empty.
//! 3. [`OctreeBuilder::build`] runs the bottom-up mass aggregation and
//!    returns an immutable [`Octree`].
//! 4. [`Octree::collect_interactions`] answers per-particle queries; it only
//!    needs `&Octree`, so queries can run from many threads at once.
//!
//! # Octant numbering
//!
//! The octant of a point P relative to a center C is a 3-bit code: bit 0 is
//! set iff `P.x < C.x`, bit 1 iff `P.y < C.y`, bit 2 iff `P.z < C.z`. A set
//! bit means the child cube lies on the negative side of that axis.
//!
//! # Coincident particles
//!
//! Two particles at exactly the same position land in the same octant at
//! every depth and can never be separated by subdivision. A leaf is therefore
//! not split when the incoming particle has the same position as the leaf's
//! particle, or when the leaf is [`MAX_DEPTH`] levels below the root; the
//! particle is merged into that leaf instead. Merged particles still appear
//! individually in query results.
//!
//! Nodes live in a flat arena and refer to their children by index.

use crate::error::{GravityError, Result};
use crate::particle::{Particle, PointMass};
use crate::vector::Vector3;

/// Maximum depth below the root at which a leaf may still be split
pub const MAX_DEPTH: usize = 64;

/// Handle to a node inside an [`Octree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Snapshot of an inserted particle
#[derive(Debug, Clone, Copy)]
struct Body {
    index: usize,
    mass: f64,
    position: Vector3,
}

#[derive(Debug, Clone)]
enum NodeKind {
    /// `first` is the head of a chain of body slots linked through `next`
    Leaf { first: usize },
    Branch {
        mass: f64,
        mass_center: Vector3,
        children: [Option<usize>; 8],
    },
}

#[derive(Debug, Clone)]
struct Node {
    width: f64,
    center: Vector3,
    kind: NodeKind,
}

impl Node {
    fn branch(width: f64, center: Vector3, children: [Option<usize>; 8]) -> Self {
        Node {
            width,
            center,
            kind: NodeKind::Branch {
                mass: 0.0,
                mass_center: Vector3::zero(),
                children,
            },
        }
    }

    fn leaf(width: f64, center: Vector3, first: usize) -> Self {
        Node {
            width,
            center,
            kind: NodeKind::Leaf { first },
        }
    }
}

/// Read-only view of a node
#[derive(Debug, Clone, PartialEq)]
pub enum OctreeNode {
    /// Leaf holding one particle, or several that could not be separated
    Leaf {
        /// Edge length of the cube
        width: f64,
        /// Center of the cube
        center: Vector3,
        /// Store indices of the particles in this leaf
        particles: Vec<usize>,
    },
    /// Interior node with up to eight children
    Branch {
        /// Edge length of the cube
        width: f64,
        /// Center of the cube
        center: Vector3,
        /// Total mass below this node
        mass: f64,
        /// Center of mass below this node
        mass_center: Vector3,
        /// Child per octant, `None` for empty octants
        children: [Option<NodeId>; 8],
    },
}

impl OctreeNode {
    /// Edge length of the node's cube
    pub fn width(&self) -> f64 {
        match self {
            OctreeNode::Leaf { width, .. } | OctreeNode::Branch { width, .. } => *width,
        }
    }

    /// Center of the node's cube
    pub fn center(&self) -> Vector3 {
        match self {
            OctreeNode::Leaf { center, .. } | OctreeNode::Branch { center, .. } => *center,
        }
    }
}

/// Octant code of `position` relative to `center`
pub fn octant_index(position: Vector3, center: Vector3) -> usize {
    let mut index = 0;
    if position.x < center.x {
        index |= 1;
    }
    if position.y < center.y {
        index |= 2;
    }
    if position.z < center.z {
        index |= 4;
    }
    index
}

/// Per-axis direction (+1 or -1) of an octant
pub fn octant_sign(octant: usize) -> Vector3 {
    let sign = |bit: usize| if octant & (1 << bit) == 0 { 1.0 } else { -1.0 };
    Vector3::new(sign(0), sign(1), sign(2))
}

/// Width and center of child `octant` of the cube `(width, center)`
fn child_cube(width: f64, center: Vector3, octant: usize) -> (f64, Vector3) {
    let half = width / 2.0;
    (half, center + octant_sign(octant) * (half / 2.0))
}

fn is_outside(position: Vector3, center: Vector3, width: f64) -> bool {
    (position - center).max_abs() > width / 2.0
}

/// Incrementally constructs an [`Octree`]
///
/// # Example
///
/// ```
/// use nbody_gravity::gravity::OctreeBuilder;
/// use nbody_gravity::Vector3;
///
/// let mut builder = OctreeBuilder::new(2.0, Vector3::zero());
/// builder.insert(0, 1.0, Vector3::new(0.5, 0.5, 0.5)).unwrap();
/// builder.insert(1, 3.0, Vector3::new(-0.5, -0.5, -0.5)).unwrap();
/// let tree = builder.build();
///
/// assert_eq!(tree.mass(), 4.0);
/// assert_eq!(tree.mass_center(), Vector3::new(-0.25, -0.25, -0.25));
/// ```
#[derive(Debug, Clone)]
pub struct OctreeBuilder {
    nodes: Vec<Node>,
    bodies: Vec<Body>,
    next: Vec<Option<usize>>,
    root: usize,
    merged: usize,
}

impl OctreeBuilder {
    /// Create an empty tree whose root cube has the given width and center
    ///
    /// # Panics
    ///
    /// Panics if `width` is not positive and finite or `center` is not finite.
    pub fn new(width: f64, center: Vector3) -> Self {
        Self::with_capacity(width, center, 0)
    }

    /// Like [`OctreeBuilder::new`], reserving room for `particles` insertions
    pub fn with_capacity(width: f64, center: Vector3, particles: usize) -> Self {
        assert!(
            width > 0.0 && width.is_finite(),
            "Bounding width must be positive and finite"
        );
        assert!(center.is_valid(), "Bounding center must be finite");

        let mut nodes = Vec::with_capacity(2 * particles + 1);
        nodes.push(Node::branch(width, center, [None; 8]));

        OctreeBuilder {
            nodes,
            bodies: Vec::with_capacity(particles),
            next: Vec::with_capacity(particles),
            root: 0,
            merged: 0,
        }
    }

    /// Number of particles inserted so far
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether no particle has been inserted yet
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Number of particles merged into an existing leaf instead of splitting it
    pub fn merged_count(&self) -> usize {
        self.merged
    }

    /// Insert the particle with store index `index`
    ///
    /// Grows the root first if `position` lies outside the current root cube.
    ///
    /// # Errors
    ///
    /// Returns [`GravityError::NonFinitePosition`] if `position` has a NaN or
    /// infinite component. The tree is left unchanged in that case.
    pub fn insert(&mut self, index: usize, mass: f64, position: Vector3) -> Result<()> {
        if !position.is_valid() {
            return Err(GravityError::NonFinitePosition { index });
        }

        self.grow_to_contain(position);

        let slot = self.bodies.len();
        self.bodies.push(Body { index, mass, position });
        self.next.push(None);
        self.place(slot);

        Ok(())
    }

    /// Double the root toward `position` until the root cube contains it
    fn grow_to_contain(&mut self, position: Vector3) {
        loop {
            let root = &self.nodes[self.root];
            let (width, center) = (root.width, root.center);
            if !is_outside(position, center, width) {
                return;
            }

            let octant = octant_index(position, center);
            let new_center = center + octant_sign(octant) * (width / 2.0);

            // an empty root has nothing to keep, so it moves instead of
            // becoming a child
            if self.bodies.is_empty() {
                let root = &mut self.nodes[self.root];
                root.width = width * 2.0;
                root.center = new_center;
                continue;
            }

            let mut children = [None; 8];
            children[7 - octant] = Some(self.root);

            self.nodes.push(Node::branch(width * 2.0, new_center, children));
            self.root = self.nodes.len() - 1;
        }
    }

    /// Descend from the root and attach body `slot` to the tree
    fn place(&mut self, slot: usize) {
        let position = self.bodies[slot].position;
        let mut node = self.root;
        let mut depth = 0;

        loop {
            let (width, center) = (self.nodes[node].width, self.nodes[node].center);
            let octant = octant_index(position, center);
            let NodeKind::Branch { children, .. } = &self.nodes[node].kind else {
                unreachable!("insertion only descends through branches");
            };

            let Some(child) = children[octant] else {
                let (child_width, child_center) = child_cube(width, center, octant);
                let leaf = self.push(Node::leaf(child_width, child_center, slot));
                self.set_child(node, octant, leaf);
                return;
            };

            if let NodeKind::Leaf { first } = self.nodes[child].kind {
                if depth + 1 >= MAX_DEPTH || self.bodies[first].position == position {
                    self.merge(first, slot);
                    return;
                }
                self.split(child, first);
            }

            node = child;
            depth += 1;
        }
    }

    /// Turn leaf `node` into a branch covering the same cube and move its
    /// particles (headed by `first`) one level down
    fn split(&mut self, node: usize, first: usize) {
        let (width, center) = (self.nodes[node].width, self.nodes[node].center);
        self.nodes[node].kind = NodeKind::Branch {
            mass: 0.0,
            mass_center: Vector3::zero(),
            children: [None; 8],
        };

        let octant = octant_index(self.bodies[first].position, center);
        let (child_width, child_center) = child_cube(width, center, octant);
        let leaf = self.push(Node::leaf(child_width, child_center, first));
        self.set_child(node, octant, leaf);
    }

    fn merge(&mut self, first: usize, slot: usize) {
        self.next[slot] = self.next[first];
        self.next[first] = Some(slot);
        self.merged += 1;
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn set_child(&mut self, node: usize, octant: usize, child: usize) {
        if let NodeKind::Branch { children, .. } = &mut self.nodes[node].kind {
            children[octant] = Some(child);
        }
    }

    /// Aggregate masses bottom-up and freeze the tree for queries
    pub fn build(mut self) -> Octree {
        self.aggregate();
        Octree {
            nodes: self.nodes,
            bodies: self.bodies,
            next: self.next,
            root: self.root,
            merged: self.merged,
        }
    }

    /// Post-order pass computing every branch's mass and center of mass
    fn aggregate(&mut self) {
        let mut stack = vec![(self.root, false)];

        while let Some((node, children_done)) = stack.pop() {
            let NodeKind::Branch { children, .. } = self.nodes[node].kind else {
                continue;
            };

            if !children_done {
                stack.push((node, true));
                for &child in children.iter().flatten() {
                    if matches!(self.nodes[child].kind, NodeKind::Branch { .. }) {
                        stack.push((child, false));
                    }
                }
                continue;
            }

            let mut total_mass = 0.0;
            let mut weighted = Vector3::zero();
            for &child in children.iter().flatten() {
                match self.nodes[child].kind {
                    NodeKind::Leaf { first } => {
                        for slot in chain(&self.next, first) {
                            let body = &self.bodies[slot];
                            total_mass += body.mass;
                            weighted += body.position * body.mass;
                        }
                    }
                    NodeKind::Branch {
                        mass, mass_center, ..
                    } => {
                        total_mass += mass;
                        weighted += mass_center * mass;
                    }
                }
            }

            let center_of_mass = if total_mass != 0.0 {
                weighted / total_mass
            } else {
                Vector3::zero()
            };

            if let NodeKind::Branch {
                mass, mass_center, ..
            } = &mut self.nodes[node].kind
            {
                *mass = total_mass;
                *mass_center = center_of_mass;
            }
        }
    }
}

/// Body slots of a leaf, starting at `first`
fn chain(next: &[Option<usize>], first: usize) -> impl Iterator<Item = usize> + '_ {
    std::iter::successors(Some(first), move |&slot| next[slot])
}

/// Reusable buffers for [`Octree::collect_interactions`]
///
/// Keeping one list per worker avoids allocating for every query.
#[derive(Debug, Clone, Default)]
pub struct InteractionList {
    entries: Vec<PointMass>,
    stack: Vec<usize>,
}

impl InteractionList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries produced by the most recent query
    pub fn entries(&self) -> &[PointMass] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the last query produced no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the entries out, leaving the list empty
    pub fn into_entries(self) -> Vec<PointMass> {
        self.entries
    }
}

/// Immutable octree ready for Barnes-Hut queries
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<Node>,
    bodies: Vec<Body>,
    next: Vec<Option<usize>>,
    root: usize,
    merged: usize,
}

impl Octree {
    /// Build a tree over the particles named by `indices`
    ///
    /// # Errors
    ///
    /// Returns [`GravityError::IndexOutOfRange`] for an index outside
    /// `particles` and [`GravityError::NonFinitePosition`] for a particle
    /// whose position is not finite.
    pub fn from_particles(
        particles: &[Particle],
        indices: &[usize],
        width: f64,
        center: Vector3,
    ) -> Result<Octree> {
        let mut builder = OctreeBuilder::with_capacity(width, center, indices.len());
        for &index in indices {
            let particle = particles.get(index).ok_or(GravityError::IndexOutOfRange {
                index,
                len: particles.len(),
            })?;
            builder.insert(index, particle.mass, particle.position)?;
        }
        Ok(builder.build())
    }

    /// Handle to the root node
    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    /// Edge length of the root cube
    pub fn root_width(&self) -> f64 {
        self.nodes[self.root].width
    }

    /// Center of the root cube
    pub fn root_center(&self) -> Vector3 {
        self.nodes[self.root].center
    }

    /// Total mass of all inserted particles
    pub fn mass(&self) -> f64 {
        match self.nodes[self.root].kind {
            NodeKind::Branch { mass, .. } => mass,
            NodeKind::Leaf { .. } => 0.0,
        }
    }

    /// Center of mass of all inserted particles
    pub fn mass_center(&self) -> Vector3 {
        match self.nodes[self.root].kind {
            NodeKind::Branch { mass_center, .. } => mass_center,
            NodeKind::Leaf { .. } => Vector3::zero(),
        }
    }

    /// Number of nodes, leaves and branches together
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of inserted particles
    pub fn particle_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of particles merged into an existing leaf
    pub fn merged_count(&self) -> usize {
        self.merged
    }

    /// Whether `position` lies inside the root cube
    pub fn contains(&self, position: Vector3) -> bool {
        let root = &self.nodes[self.root];
        !is_outside(position, root.center, root.width)
    }

    /// Read-only view of a node
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this tree.
    pub fn node(&self, id: NodeId) -> OctreeNode {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Leaf { first } => OctreeNode::Leaf {
                width: node.width,
                center: node.center,
                particles: chain(&self.next, *first)
                    .map(|slot| self.bodies[slot].index)
                    .collect(),
            },
            NodeKind::Branch {
                mass,
                mass_center,
                children,
            } => OctreeNode::Branch {
                width: node.width,
                center: node.center,
                mass: *mass,
                mass_center: *mass_center,
                children: children.map(|child| child.map(NodeId)),
            },
        }
    }

    /// Approximate interaction list for the particle with store index `index`
    ///
    /// Convenience wrapper around [`Octree::collect_interactions`].
    pub fn interactions(&self, index: usize, position: Vector3, theta: f64) -> Vec<PointMass> {
        let mut list = InteractionList::new();
        self.collect_interactions(index, position, theta, &mut list);
        list.into_entries()
    }

    /// Fill `list` with the sources acting on particle `index` at `position`
    ///
    /// Walks the tree depth-first. A branch whose `width / distance` to its
    /// center of mass is below `theta` is emitted as a single pseudo-particle;
    /// otherwise its children are visited in octant order. Leaves emit their
    /// particles, skipping `index` itself. `theta == 0` visits every leaf and
    /// reproduces the direct sum.
    pub fn collect_interactions(
        &self,
        index: usize,
        position: Vector3,
        theta: f64,
        list: &mut InteractionList,
    ) {
        list.entries.clear();
        list.stack.clear();
        if self.bodies.is_empty() {
            return;
        }

        list.stack.push(self.root);
        while let Some(node) = list.stack.pop() {
            let node = &self.nodes[node];
            match &node.kind {
                NodeKind::Branch {
                    mass,
                    mass_center,
                    children,
                } => {
                    let distance = (position - *mass_center).norm();
                    if node.width / distance < theta {
                        list.entries.push(PointMass::new(*mass, *mass_center));
                    } else {
                        // reversed so octant 0 is popped first
                        list.stack.extend(children.iter().rev().flatten());
                    }
                }
                NodeKind::Leaf { first } => {
                    for slot in chain(&self.next, *first) {
                        let body = &self.bodies[slot];
                        if body.index != index {
                            list.entries.push(PointMass::new(body.mass, body.position));
                        }
                    }
                }
            }
        }
    }
}
