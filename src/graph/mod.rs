//! Authorization schema graph visualization
//!
//! # Architecture
//!
//! ```text
//! Schema (schema / relationships / assertions)
//!        │
//!        ▼
//! build() ──► Graph (typed nodes + edges, rebuilt on every schema change)
//!        │
//!        ▼
//! LayoutEngine (physics or hierarchical, bounded stabilization)
//!        │
//!        ├──► GraphRenderer (draws to egui::Painter)
//!        │
//!        └──► InteractionController (hover / selection / drag state machine)
//!                    │
//!                    ▼
//!              Camera2D (pan/zoom transform)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut widget = SchemaGraphWidget::new(&VisualizerConfig::default())?;
//! widget.set_schema(&schema)?;
//! widget.ui(ui);
//! ```

pub mod animation;
pub mod builder;
pub mod camera;
pub mod colors;
pub mod force_sim;
pub mod hierarchical;
pub mod input;
pub mod layout;
pub mod render;
pub mod spatial;
pub mod types;

pub use builder::build;
pub use camera::Camera2D;
pub use input::{InteractionController, InteractionEvent, SelectionState};
pub use layout::{DragCommand, LayoutEngine, LayoutEvent, LayoutState, LayoutStatus};
pub use render::{GraphRenderer, RenderOptions};
pub use spatial::SpatialIndex;
pub use types::*;

use egui::{Key, Pos2, Rect, Sense, Vec2};

use crate::config::VisualizerConfig;
use crate::error::{ConfigError, SchemaError};
use crate::schema::Schema;

/// Layout steps run per frame while stabilizing.
const STEPS_PER_FRAME: u32 = 10;
/// Screen padding when fitting the graph into view.
const FIT_PADDING: f32 = 50.0;
/// Extra pointer slack for hit testing, in screen pixels.
const HIT_SLOP: f32 = 4.0;
/// Keyboard pan distance per key press, in screen pixels.
const KEY_PAN: f32 = 40.0;

// =============================================================================
// SCHEMA GRAPH WIDGET
// =============================================================================

/// Main graph widget: owns the graph, layout, camera and interaction state.
pub struct SchemaGraphWidget {
    config: VisualizerConfig,
    graph: Graph,
    engine: LayoutEngine,
    camera: Camera2D,
    interaction: InteractionController,
    spatial: SpatialIndex,
    renderer: GraphRenderer,
    needs_fit: bool,
}

impl SchemaGraphWidget {
    /// Validates the config once; a different config needs a new widget.
    pub fn new(config: &VisualizerConfig) -> Result<Self, ConfigError> {
        let engine = LayoutEngine::new(config)?;
        Ok(Self {
            config: config.clone(),
            graph: Graph::default(),
            engine,
            camera: Camera2D::new(&config.interaction),
            interaction: InteractionController::new(&config.interaction),
            spatial: SpatialIndex::new(),
            renderer: GraphRenderer::new(config),
            needs_fit: false,
        })
    }

    /// Rebuild the graph from a schema. On error the current graph, layout
    /// and selection are left as they were.
    pub fn set_schema(&mut self, schema: &Schema) -> Result<(), SchemaError> {
        let graph = build(schema)?;
        self.engine.set_graph(&graph);
        self.graph = graph;
        self.interaction.reset();
        self.spatial.rebuild_from_layout(self.engine.state());
        self.needs_fit = true;
        Ok(())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Re-run stabilization over the current graph.
    pub fn relayout(&mut self) {
        self.engine.restart();
        self.needs_fit = true;
    }

    /// Advance the layout by one frame's worth of steps and log any events.
    pub fn advance_layout(&mut self) -> LayoutStatus {
        if self.engine.status() != LayoutStatus::Running {
            return self.engine.status();
        }

        let status = self.engine.tick(STEPS_PER_FRAME);
        for event in self.engine.drain_events() {
            match event {
                LayoutEvent::StabilizationProgress { iterations, total } => {
                    tracing::trace!(iterations, total, "stabilization progress");
                }
                LayoutEvent::Stabilized { iterations } => {
                    tracing::info!(iterations, nodes = self.graph.node_count(), "graph stabilized");
                }
                LayoutEvent::StabilizationTimeout { iterations } => {
                    tracing::warn!(iterations, "stabilization timed out, keeping best-effort layout");
                }
            }
        }
        self.spatial.rebuild_from_layout(self.engine.state());
        status
    }

    /// Feed one interaction event; drag commands are forwarded to the engine.
    pub fn handle_event(&mut self, event: InteractionEvent, now: f64) {
        let Some(command) = self.interaction.handle(event, now) else {
            return;
        };
        let pin = matches!(command, DragCommand::Pin(_));
        if !self.engine.apply_drag(command) && pin {
            tracing::warn!(mode = ?self.engine.mode(), "node drag rejected");
        }
        self.spatial.rebuild_from_layout(self.engine.state());
    }

    // =========================================================================
    // EGUI
    // =========================================================================

    /// Draw the graph into all available space and process input.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let screen_rect = response.rect;
        let (now, dt) = ui.input(|i| (i.time, i.stable_dt));

        let status = self.advance_layout();
        if self.needs_fit && !self.engine.state().is_empty() {
            self.camera
                .fit_to_bounds(self.engine.state().bounds(), screen_rect, FIT_PADDING);
            if status != LayoutStatus::Running {
                self.needs_fit = false;
            }
        }
        self.camera.update(dt);

        self.handle_input(ui, &response, screen_rect, now);

        self.renderer.render(
            &painter,
            &self.graph,
            self.engine.state(),
            &self.camera,
            screen_rect,
            &RenderOptions {
                interaction: &self.interaction,
                now,
            },
        );

        if response.hovered() {
            ui.ctx().set_cursor_icon(self.interaction.cursor());
        }

        if self.engine.status() == LayoutStatus::Running || self.camera.is_animating() {
            ui.ctx().request_repaint();
        } else if let Some(due) = self.interaction.tooltip_due_in(now) {
            ui.ctx()
                .request_repaint_after(std::time::Duration::from_secs_f64(due));
        }

        response
    }

    fn node_at_screen(&self, pos: Pos2, screen_rect: Rect) -> Option<String> {
        let world = self.camera.screen_to_world(pos, screen_rect);
        self.spatial
            .hit_test(world, HIT_SLOP / self.camera.zoom())
            .map(|node| node.id.clone())
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        screen_rect: Rect,
        now: f64,
    ) {
        let pointer = response.hover_pos();
        let hit = pointer.and_then(|pos| self.node_at_screen(pos, screen_rect));

        // Hover (suspended while a node is being dragged)
        if self.interaction.dragging().is_none() {
            let event = match (&hit, self.interaction.hovered()) {
                (Some(id), hovered) if hovered != Some(id.as_str()) => {
                    Some(InteractionEvent::PointerEnter(id.clone()))
                }
                (None, Some(_)) => Some(InteractionEvent::PointerLeave),
                _ => None,
            };
            if let Some(event) = event {
                self.handle_event(event, now);
            }
        }

        // Drag: a node drag pins the node, a canvas drag pans
        if response.drag_started() {
            let origin = ui.input(|i| i.pointer.press_origin()).or(pointer);
            let grabbed = origin.and_then(|pos| self.node_at_screen(pos, screen_rect));
            if let (Some(node), Some(pos)) = (grabbed, origin) {
                let pos = self.camera.screen_to_world(pos, screen_rect);
                self.handle_event(InteractionEvent::DragStart { node, pos }, now);
            }
        }
        if response.dragged() {
            if self.interaction.dragging().is_some() {
                if let Some(pos) = pointer.or_else(|| response.interact_pointer_pos()) {
                    let world = self.camera.screen_to_world(pos, screen_rect);
                    self.handle_event(InteractionEvent::DragMove(world), now);
                }
            } else {
                self.camera.pan(response.drag_delta());
            }
        }
        if response.drag_stopped() {
            self.handle_event(InteractionEvent::DragEnd, now);
        }

        // Click: select / toggle / clear
        if response.clicked() {
            let multi = ui.input(|i| i.modifiers.command || i.modifiers.shift);
            self.handle_event(InteractionEvent::Click { node: hit, multi }, now);
        }

        // Scroll zooms around the pointer
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta);
            if scroll.y != 0.0 {
                if let Some(pos) = pointer {
                    let factor = 1.0 + scroll.y * self.config.interaction.zoom_speed;
                    self.camera.zoom_at(factor, pos, screen_rect);
                }
            }
        }

        if self.config.interaction.keyboard && response.hovered() {
            self.handle_keyboard(ui, screen_rect);
        }
    }

    fn handle_keyboard(&mut self, ui: &egui::Ui, screen_rect: Rect) {
        let (pan, zoom_in, zoom_out, fit) = ui.input(|i| {
            let mut pan = Vec2::ZERO;
            if i.key_pressed(Key::ArrowLeft) {
                pan.x += KEY_PAN;
            }
            if i.key_pressed(Key::ArrowRight) {
                pan.x -= KEY_PAN;
            }
            if i.key_pressed(Key::ArrowUp) {
                pan.y += KEY_PAN;
            }
            if i.key_pressed(Key::ArrowDown) {
                pan.y -= KEY_PAN;
            }
            (
                pan,
                i.key_pressed(Key::Plus) || i.key_pressed(Key::Equals),
                i.key_pressed(Key::Minus),
                i.key_pressed(Key::Home),
            )
        });

        if pan != Vec2::ZERO {
            self.camera.pan(pan);
        }
        if zoom_in {
            self.camera.zoom_at(1.2, screen_rect.center(), screen_rect);
        }
        if zoom_out {
            self.camera.zoom_at(1.0 / 1.2, screen_rect.center(), screen_rect);
        }
        if fit {
            self.camera
                .fit_to_bounds(self.engine.state().bounds(), screen_rect, FIT_PADDING);
        }
    }
}
