//! Force Simulation for the schema graph
//!
//! forceAtlas2-style physics, one fixed-size step at a time:
//! - Repulsion between all node pairs, scaled by degree (hubs push harder)
//! - Overlap avoidance: distances are measured from node edges, not centres
//! - Central gravity pulling every node toward the origin
//! - Springs along edges pulling toward `spring_length`
//! - Velocity damping and a hard velocity cap
//!
//! Designed for schema-sized graphs (tens to a few hundred nodes), so the
//! pairwise pass is direct rather than Barnes-Hut.
//!
//! # Usage
//! ```ignore
//! let mut sim = ForceSimulation::new(PhysicsConfig::default());
//! sim.add_node(SimNode::new("doc", NodeKind::Entity, 30.0));
//! sim.add_node(SimNode::new("doc#owner", NodeKind::Relation, 20.0));
//! sim.add_spring("doc", "doc#owner");
//!
//! // Each frame:
//! let max_speed = sim.step();
//! ```

use egui::{Pos2, Rect, Vec2};
use std::collections::HashMap;

use crate::config::PhysicsConfig;
use crate::graph::NodeKind;

/// Golden angle in radians, used to spread initial positions.
const GOLDEN_ANGLE: f32 = 2.399_963;

// =============================================================================
// SIM NODE
// =============================================================================

/// A node in the force simulation
#[derive(Debug, Clone)]
pub struct SimNode {
    /// Unique identifier (same as the graph node id)
    pub id: String,

    pub kind: NodeKind,

    /// Current position (updated by simulation)
    pub position: Pos2,

    /// Current velocity
    velocity: Vec2,

    /// Display radius, also used for overlap avoidance
    pub size: f32,

    /// Edges touching this node
    pub degree: usize,

    /// Pinned by a drag; forces are ignored while set
    pub fixed: bool,
}

impl SimNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, size: f32) -> Self {
        Self {
            id: id.into(),
            kind,
            position: Pos2::ZERO,
            velocity: Vec2::ZERO,
            size,
            degree: 0,
            fixed: false,
        }
    }

    /// Builder: set position
    pub fn with_position(mut self, pos: Pos2) -> Self {
        self.position = pos;
        self
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

// =============================================================================
// FORCE SIMULATION
// =============================================================================

#[derive(Debug, Clone)]
pub struct ForceSimulation {
    /// Nodes in the simulation
    nodes: Vec<SimNode>,

    /// Quick lookup by ID
    node_index: HashMap<String, usize>,

    /// Spring endpoints (indices into `nodes`)
    springs: Vec<(usize, usize)>,

    /// Simulation configuration
    pub config: PhysicsConfig,
}

impl ForceSimulation {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            springs: Vec::new(),
            config,
        }
    }

    // =========================================================================
    // NODE MANAGEMENT
    // =========================================================================

    /// Add a node; nodes left at the origin are placed on a golden-angle spiral.
    pub fn add_node(&mut self, mut node: SimNode) {
        if node.position == Pos2::ZERO {
            let i = self.nodes.len() as f32;
            let radius = 100.0 + i * 20.0;
            node.position = Pos2::ZERO + Vec2::angled(i * GOLDEN_ANGLE) * radius;
        }

        let idx = self.nodes.len();
        self.node_index.insert(node.id.clone(), idx);
        self.nodes.push(node);
    }

    /// Connect two nodes with a spring. Unknown ids are ignored.
    pub fn add_spring(&mut self, source: &str, target: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.node_index.get(source), self.node_index.get(target)) else {
            return false;
        };
        self.nodes[a].degree += 1;
        if a != b {
            self.nodes[b].degree += 1;
            self.springs.push((a, b));
        }
        true
    }

    pub fn get_node(&self, id: &str) -> Option<&SimNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut SimNode> {
        self.node_index
            .get(id)
            .copied()
            .map(|idx| &mut self.nodes[idx])
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [SimNode] {
        &mut self.nodes
    }

    pub fn springs(&self) -> &[(usize, usize)] {
        &self.springs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    /// Run one fixed-timestep step. Returns the highest node speed afterwards.
    pub fn step(&mut self) -> f32 {
        if self.nodes.is_empty() {
            return 0.0;
        }

        let forces = self.calculate_forces();
        let dt = self.config.timestep;
        let damping = self.config.damping;
        let max_velocity = self.config.max_velocity;
        let mut max_speed: f32 = 0.0;

        for (node, force) in self.nodes.iter_mut().zip(forces) {
            if node.fixed {
                node.velocity = Vec2::ZERO;
                continue;
            }

            // Unit mass: a = F - damping * v
            let acceleration = force - node.velocity * damping;
            node.velocity += acceleration * dt;

            let speed = node.velocity.length();
            if speed > max_velocity {
                node.velocity = node.velocity.normalized() * max_velocity;
            }

            node.position += node.velocity * dt;
            max_speed = max_speed.max(node.velocity.length());
        }

        max_speed
    }

    /// Net force on every node
    fn calculate_forces(&self) -> Vec<Vec2> {
        let n = self.nodes.len();
        let mut forces = vec![Vec2::ZERO; n];
        let overlap_factor = 1.0 - self.config.avoid_overlap.clamp(0.0, 1.0);

        // Repulsion between all pairs (gravitational_constant is negative)
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &self.nodes[i];
                let b = &self.nodes[j];
                let mut delta = b.position - a.position;
                let mut dist = delta.length();

                if dist < 1e-3 {
                    // Coincident centres: nudge apart along a per-pair angle
                    delta = Vec2::angled((i * n + j) as f32 * GOLDEN_ANGLE) * 0.1;
                    dist = 0.1;
                }

                // One magnitude per pair, applied equal and opposite
                let radii = a.size + b.size;
                let d = (dist - radii).max(0.1 + overlap_factor * radii);
                let mass = (a.degree as f32 + 1.0) * (b.degree as f32 + 1.0);
                let force = delta * (self.config.gravitational_constant * mass / (d * d));

                forces[i] += force;
                forces[j] -= force;
            }
        }

        // Central gravity
        for (i, node) in self.nodes.iter().enumerate() {
            let to_center = Pos2::ZERO - node.position;
            forces[i] += to_center * self.config.central_gravity * (node.degree as f32 + 1.0);
        }

        // Springs along edges
        for &(a, b) in &self.springs {
            let delta = self.nodes[a].position - self.nodes[b].position;
            let dist = delta.length().max(0.01);
            let spring = self.config.spring_constant * (self.config.spring_length - dist) / dist;
            let force = delta * spring;
            forces[a] += force;
            forces[b] -= force;
        }

        forces
    }

    /// Zero all velocities (used when positions are placed directly)
    pub fn halt(&mut self) {
        for node in &mut self.nodes {
            node.velocity = Vec2::ZERO;
        }
    }

    // =========================================================================
    // BOUNDS
    // =========================================================================

    /// World-space bounds of all nodes including their radius
    pub fn bounds(&self) -> Rect {
        self.nodes.iter().fold(Rect::NOTHING, |rect, node| {
            rect.union(Rect::from_center_size(
                node.position,
                Vec2::splat(node.size * 2.0),
            ))
        })
    }

    // =========================================================================
    // PINNING (for drag)
    // =========================================================================

    /// Pin a node (stops it from moving)
    pub fn pin(&mut self, id: &str) -> bool {
        match self.get_node_mut(id) {
            Some(node) => {
                node.fixed = true;
                node.velocity = Vec2::ZERO;
                true
            }
            None => false,
        }
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.get_node_mut(id) {
            Some(node) => {
                node.fixed = false;
                true
            }
            None => false,
        }
    }

    /// Move a pinned node. Unpinned nodes are left alone.
    pub fn move_node(&mut self, id: &str, new_pos: Pos2) -> bool {
        match self.get_node_mut(id) {
            Some(node) if node.fixed => {
                node.position = new_pos;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_with(nodes: &[(&str, Pos2)]) -> ForceSimulation {
        let mut sim = ForceSimulation::new(PhysicsConfig::default());
        for (id, pos) in nodes {
            sim.add_node(SimNode::new(*id, NodeKind::Relation, 20.0).with_position(*pos));
        }
        sim
    }

    #[test]
    fn test_add_nodes() {
        let mut sim = ForceSimulation::new(PhysicsConfig::default());
        sim.add_node(SimNode::new("a", NodeKind::Entity, 30.0));
        sim.add_node(SimNode::new("b", NodeKind::Relation, 20.0));

        assert_eq!(sim.len(), 2);
        assert!(sim.get_node("a").is_some());
        // Spiral placement keeps initial positions distinct
        assert_ne!(sim.nodes()[0].position, sim.nodes()[1].position);
    }

    #[test]
    fn test_repulsion_separates_close_nodes() {
        let mut sim = sim_with(&[("a", Pos2::new(0.0, 0.0)), ("b", Pos2::new(10.0, 0.0))]);
        for _ in 0..50 {
            sim.step();
        }
        let dist = (sim.nodes()[0].position - sim.nodes()[1].position).length();
        assert!(dist > 10.0, "distance {dist}");
    }

    #[test]
    fn test_spring_pulls_far_nodes_together() {
        let mut sim = sim_with(&[("a", Pos2::new(-1000.0, 0.0)), ("b", Pos2::new(1000.0, 0.0))]);
        assert!(sim.add_spring("a", "b"));
        for _ in 0..200 {
            sim.step();
        }
        let dist = (sim.nodes()[0].position - sim.nodes()[1].position).length();
        assert!(dist < 2000.0, "distance {dist}");
    }

    #[test]
    fn test_velocity_is_capped() {
        let mut sim = sim_with(&[("a", Pos2::new(0.0, 0.0)), ("b", Pos2::new(0.5, 0.0))]);
        let max_speed = sim.step();
        assert!(max_speed <= sim.config.max_velocity + 1e-3);
    }

    #[test]
    fn test_coincident_nodes_split() {
        let mut sim = sim_with(&[("a", Pos2::new(5.0, 5.0)), ("b", Pos2::new(5.0, 5.0))]);
        for _ in 0..20 {
            sim.step();
        }
        let dist = (sim.nodes()[0].position - sim.nodes()[1].position).length();
        assert!(dist > 1.0);
        assert!(sim.nodes().iter().all(|n| n.position.x.is_finite() && n.position.y.is_finite()));
    }

    #[test]
    fn test_fixed_node_does_not_move() {
        let mut sim = sim_with(&[("a", Pos2::new(0.0, 0.0)), ("b", Pos2::new(10.0, 0.0))]);
        sim.pin("a");
        for _ in 0..20 {
            sim.step();
        }
        assert_eq!(sim.get_node("a").unwrap().position, Pos2::new(0.0, 0.0));
        assert!(sim.move_node("a", Pos2::new(50.0, 50.0)));
        assert!(!sim.move_node("b", Pos2::new(50.0, 50.0)));
    }

    #[test]
    fn test_pair_repulsion_is_equal_and_opposite() {
        let mut sim = ForceSimulation::new(PhysicsConfig::default());
        sim.add_node(SimNode::new("big", NodeKind::Entity, 60.0).with_position(Pos2::new(-40.0, 10.0)));
        sim.add_node(SimNode::new("small", NodeKind::Relation, 20.0).with_position(Pos2::new(90.0, -30.0)));
        sim.config.central_gravity = 0.0;

        sim.step();
        let total = sim.nodes()[0].velocity() + sim.nodes()[1].velocity();
        assert!(sim.nodes()[0].speed() > 0.0);
        assert!(total.length() < 1e-4, "net velocity {total:?}");
    }

    #[test]
    fn test_mixed_sizes_come_to_rest() {
        let mut sim = ForceSimulation::new(PhysicsConfig::default());
        sim.add_node(SimNode::new("user", NodeKind::Entity, 20.0));
        sim.add_node(SimNode::new("document", NodeKind::Entity, 60.0));
        sim.add_node(SimNode::new("document#owner", NodeKind::Relation, 20.0));
        sim.add_node(SimNode::new("document#edit", NodeKind::Permission, 20.0));
        sim.add_spring("document", "document#owner");
        sim.add_spring("document", "document#edit");
        sim.add_spring("document#edit", "document#owner");
        sim.add_spring("document#owner", "user");

        let mut max_speed = f32::MAX;
        for _ in 0..600 {
            max_speed = sim.step();
        }
        assert!(max_speed < 0.1, "still moving at {max_speed}");
    }

    #[test]
    fn test_unknown_spring_ignored() {
        let mut sim = sim_with(&[("a", Pos2::new(0.0, 0.0))]);
        assert!(!sim.add_spring("a", "ghost"));
        assert!(sim.springs().is_empty());
    }
}
