//! Layout engine
//!
//! Owns node positions for the current graph and drives them toward a
//! stable arrangement, either by physics (bounded stabilization run) or by
//! one-shot hierarchical placement.
//!
//! Stabilization: a step is *calm* when the fastest node moves slower than
//! `stabilization.min_velocity`. `stable_window` consecutive calm steps end
//! the run as [`LayoutStatus::Stable`]; hitting `stabilization.iterations`
//! first ends it as [`LayoutStatus::TimedOut`]. Either way the run stops and
//! an event is queued; nothing loops forever.

use egui::{Pos2, Rect};

use super::force_sim::{ForceSimulation, SimNode};
use super::hierarchical;
use super::types::{Graph, Node};
use crate::config::{LayoutMode, VisualizerConfig};
use crate::error::ConfigError;

// =============================================================================
// STATUS / EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    /// No graph, or an empty one.
    Idle,
    /// Stabilization in progress.
    Running,
    /// Settled within the window.
    Stable,
    /// Iteration cap reached before settling.
    TimedOut,
}

impl LayoutStatus {
    /// True when the run has ended (settled or gave up).
    pub fn is_settled(&self) -> bool {
        matches!(self, LayoutStatus::Stable | LayoutStatus::TimedOut)
    }
}

/// Progress notifications, polled with [`LayoutEngine::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    StabilizationProgress { iterations: u32, total: u32 },
    Stabilized { iterations: u32 },
    StabilizationTimeout { iterations: u32 },
}

/// Drag input forwarded from the interaction controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DragCommand {
    /// Grab a node: it stops responding to forces.
    Pin(String),
    /// Move the grabbed node to a world position.
    MoveTo(String, Pos2),
    /// Drop the node back into the simulation.
    Release(String),
}

// =============================================================================
// LAYOUT STATE
// =============================================================================

/// Positions, velocities and run bookkeeping for the current graph.
#[derive(Debug, Clone)]
pub struct LayoutState {
    sim: ForceSimulation,
    mode: LayoutMode,
    status: LayoutStatus,
    iterations: u32,
    calm_steps: u32,
}

impl LayoutState {
    pub fn nodes(&self) -> &[SimNode] {
        self.sim.nodes()
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.sim.get_node(id)
    }

    pub fn position(&self, id: &str) -> Option<Pos2> {
        self.sim.get_node(id).map(|n| n.position)
    }

    /// Spring endpoints as node indices.
    pub fn links(&self) -> &[(usize, usize)] {
        self.sim.springs()
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn status(&self) -> LayoutStatus {
        self.status
    }

    /// Steps taken in the current run.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn bounds(&self) -> Rect {
        self.sim.bounds()
    }

    pub fn is_empty(&self) -> bool {
        self.sim.is_empty()
    }
}

// =============================================================================
// LAYOUT ENGINE
// =============================================================================

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: VisualizerConfig,
    state: LayoutState,
    events: Vec<LayoutEvent>,
}

impl LayoutEngine {
    /// Engine with no graph. The config is validated once here.
    pub fn new(config: &VisualizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            state: LayoutState {
                sim: ForceSimulation::new(config.physics.clone()),
                mode: config.layout.mode,
                status: LayoutStatus::Idle,
                iterations: 0,
                calm_steps: 0,
            },
            events: Vec::new(),
        })
    }

    /// Replace the graph. Nodes that survive (same id) keep their position;
    /// new ones are seeded on a spiral. Starts a new run.
    pub fn set_graph(&mut self, graph: &Graph) {
        let previous = std::mem::replace(
            &mut self.state.sim,
            ForceSimulation::new(self.config.physics.clone()),
        );

        let sizes = node_sizes(graph, &self.config);
        for (node, size) in graph.nodes().iter().zip(sizes) {
            let mut sim_node = SimNode::new(node.id.clone(), node.kind, size);
            if let Some(old) = previous.get_node(&node.id) {
                sim_node = sim_node.with_position(old.position);
            }
            self.state.sim.add_node(sim_node);
        }
        for edge in graph.edges() {
            self.state.sim.add_spring(&edge.source, &edge.target);
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            mode = ?self.state.mode,
            "layout graph replaced"
        );
        self.restart();
    }

    /// Begin a fresh run over the current graph.
    pub fn restart(&mut self) {
        self.state.iterations = 0;
        self.state.calm_steps = 0;
        self.state.status = if self.state.sim.is_empty() {
            LayoutStatus::Idle
        } else {
            LayoutStatus::Running
        };
    }

    /// One layout step. No-op unless a run is in progress.
    pub fn step(&mut self) -> LayoutStatus {
        if self.state.status != LayoutStatus::Running {
            return self.state.status;
        }

        match self.state.mode {
            LayoutMode::Hierarchical => self.place_hierarchical(),
            LayoutMode::Physics => self.step_physics(),
        }
        self.state.status
    }

    /// Up to `max_steps` steps, stopping early once the run ends.
    pub fn tick(&mut self, max_steps: u32) -> LayoutStatus {
        for _ in 0..max_steps {
            if self.step() != LayoutStatus::Running {
                break;
            }
        }
        self.state.status
    }

    /// Step until the run ends. Bounded by the iteration cap.
    pub fn run_to_completion(&mut self) -> LayoutStatus {
        while self.step() == LayoutStatus::Running {}
        self.state.status
    }

    fn step_physics(&mut self) {
        let max_speed = self.state.sim.step();
        let stabilization = &self.config.stabilization;
        let state = &mut self.state;
        state.iterations += 1;

        if max_speed < stabilization.min_velocity {
            state.calm_steps += 1;
        } else {
            state.calm_steps = 0;
        }

        if state.iterations % stabilization.update_interval == 0 {
            self.events.push(LayoutEvent::StabilizationProgress {
                iterations: state.iterations,
                total: stabilization.iterations,
            });
        }

        if state.calm_steps >= stabilization.stable_window {
            state.status = LayoutStatus::Stable;
            tracing::debug!(iterations = state.iterations, "layout stabilized");
            self.events.push(LayoutEvent::Stabilized {
                iterations: state.iterations,
            });
        } else if state.iterations >= stabilization.iterations {
            state.status = LayoutStatus::TimedOut;
            tracing::warn!(
                iterations = state.iterations,
                max_speed,
                "layout stabilization timed out"
            );
            self.events.push(LayoutEvent::StabilizationTimeout {
                iterations: state.iterations,
            });
        }
    }

    fn place_hierarchical(&mut self) {
        let positions = hierarchical::place(
            self.state.sim.len(),
            self.state.sim.springs(),
            &self.config.layout.hierarchical,
        );
        for (node, pos) in self.state.sim.nodes_mut().iter_mut().zip(positions) {
            node.position = pos;
        }
        self.state.sim.halt();

        self.state.iterations += 1;
        self.state.status = LayoutStatus::Stable;
        tracing::debug!(nodes = self.state.sim.len(), "hierarchical layout placed");
        self.events.push(LayoutEvent::Stabilized {
            iterations: self.state.iterations,
        });
    }

    /// Apply a drag command. Rejected (false) in hierarchical mode or for
    /// unknown nodes. An accepted command resumes the simulation.
    pub fn apply_drag(&mut self, command: DragCommand) -> bool {
        if self.state.mode == LayoutMode::Hierarchical {
            return false;
        }

        let accepted = match &command {
            DragCommand::Pin(id) => self.state.sim.pin(id),
            DragCommand::MoveTo(id, pos) => self.state.sim.move_node(id, *pos),
            DragCommand::Release(id) => self.state.sim.unpin(id),
        };

        if accepted && self.state.status != LayoutStatus::Running {
            self.restart();
        }
        accepted
    }

    /// Take queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn status(&self) -> LayoutStatus {
        self.state.status
    }

    pub fn mode(&self) -> LayoutMode {
        self.state.mode
    }

    pub fn position(&self, id: &str) -> Option<Pos2> {
        self.state.position(id)
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }
}

/// Display size per node: the weight scaled linearly into the group's
/// scaling bounds, relative to the other weighted nodes of the same kind.
/// Unweighted nodes use the group's base size; if all weights of a kind are
/// equal every node of that kind gets the midpoint.
pub fn node_sizes(graph: &Graph, config: &VisualizerConfig) -> Vec<f32> {
    let range = |kind| {
        graph
            .nodes()
            .iter()
            .filter(|n| n.kind == kind)
            .filter_map(|n| n.weight)
            .fold(None, |acc: Option<(f32, f32)>, w| match acc {
                None => Some((w, w)),
                Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
            })
    };

    graph
        .nodes()
        .iter()
        .map(|node| {
            let Some(weight) = node.weight else {
                return config.size_for(node.kind);
            };
            let bounds = config.scaling_for(node.kind);
            match range(node.kind) {
                Some((lo, hi)) if hi > lo => {
                    let t = (weight - lo) / (hi - lo);
                    bounds.min + t * (bounds.max - bounds.min)
                }
                _ => (bounds.min + bounds.max) / 2.0,
            }
        })
        .collect()
}

/// Label font size for a node drawn at display `size`. A weighted node's
/// label sits in `nodes.label_scaling` at the fraction its size sits in the
/// group's scaling bounds; unweighted nodes use `nodes.font_size`.
pub fn label_size(node: &Node, size: f32, config: &VisualizerConfig) -> f32 {
    if node.weight.is_none() {
        return config.nodes.font_size;
    }
    let bounds = config.scaling_for(node.kind);
    let labels = config.nodes.label_scaling;
    let t = if bounds.max > bounds.min {
        ((size - bounds.min) / (bounds.max - bounds.min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    labels.min + t * (labels.max - labels.min)
}
