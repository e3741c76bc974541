//! Interaction controller: pointer events to selection, hover and drag
//!
//! A plain state machine with no rendering surface, so it can be driven
//! from tests as easily as from the egui widget. It never touches layout
//! positions itself; drags come back as [`DragCommand`]s for the engine.

use std::collections::BTreeSet;

use egui::{CursorIcon, Pos2};

use super::layout::DragCommand;
use crate::config::InteractionConfig;

// =============================================================================
// STATE / EVENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Hovering(String),
    Selected(BTreeSet<String>),
}

/// Input already resolved against node hit testing.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    PointerEnter(String),
    PointerLeave,
    /// `node` is `None` for a click on empty canvas.
    Click {
        node: Option<String>,
        multi: bool,
    },
    DragStart {
        node: String,
        pos: Pos2,
    },
    DragMove(Pos2),
    DragEnd,
}

/// Pending tooltip for the hovered node.
#[derive(Debug, Clone, PartialEq)]
struct Tooltip {
    node: String,
    since: f64,
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Debug, Clone)]
pub struct InteractionController {
    config: InteractionConfig,
    state: SelectionState,
    /// Node under the pointer. Tracked apart from `state` so hovering a
    /// node keeps an existing selection intact.
    hovered: Option<String>,
    tooltip: Option<Tooltip>,
    dragging: Option<String>,
}

impl InteractionController {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            config: config.clone(),
            state: SelectionState::Idle,
            hovered: None,
            tooltip: None,
            dragging: None,
        }
    }

    /// Apply one event at time `now` (seconds). Returns a command for the
    /// layout engine when the event is part of a node drag.
    pub fn handle(&mut self, event: InteractionEvent, now: f64) -> Option<DragCommand> {
        match event {
            InteractionEvent::PointerEnter(node) => {
                self.pointer_enter(node, now);
                None
            }
            InteractionEvent::PointerLeave => {
                self.pointer_leave();
                None
            }
            InteractionEvent::Click { node, multi } => {
                self.click(node, multi);
                None
            }
            InteractionEvent::DragStart { node, pos } => {
                if !self.config.drag_nodes {
                    return None;
                }
                tracing::trace!(%node, ?pos, "drag start");
                self.tooltip = None;
                self.dragging = Some(node.clone());
                Some(DragCommand::Pin(node))
            }
            InteractionEvent::DragMove(pos) => self
                .dragging
                .as_ref()
                .map(|node| DragCommand::MoveTo(node.clone(), pos)),
            InteractionEvent::DragEnd => self.dragging.take().map(DragCommand::Release),
        }
    }

    fn pointer_enter(&mut self, node: String, now: f64) {
        if !self.config.hover {
            return;
        }
        if self.hovered.as_deref() == Some(node.as_str()) {
            return;
        }
        self.tooltip = Some(Tooltip {
            node: node.clone(),
            since: now,
        });
        if !matches!(self.state, SelectionState::Selected(_)) {
            self.state = SelectionState::Hovering(node.clone());
        }
        self.hovered = Some(node);
    }

    fn pointer_leave(&mut self) {
        self.hovered = None;
        self.tooltip = None;
        if matches!(self.state, SelectionState::Hovering(_)) {
            self.state = SelectionState::Idle;
        }
    }

    fn click(&mut self, node: Option<String>, multi: bool) {
        let Some(node) = node else {
            self.state = SelectionState::Idle;
            return;
        };

        if multi && self.config.multiselect {
            if let SelectionState::Selected(selected) = &mut self.state {
                if !selected.remove(&node) {
                    selected.insert(node);
                }
                if selected.is_empty() {
                    // Still under the pointer: no new PointerEnter will come
                    self.state = match &self.hovered {
                        Some(hovered) => SelectionState::Hovering(hovered.clone()),
                        None => SelectionState::Idle,
                    };
                }
                return;
            }
        }

        self.state = SelectionState::Selected(BTreeSet::from([node]));
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Selected node ids (empty unless in `Selected`).
    pub fn selection(&self) -> Vec<&str> {
        match &self.state {
            SelectionState::Selected(set) => set.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        matches!(&self.state, SelectionState::Selected(set) if set.contains(id))
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    /// Node whose tooltip should be showing at time `now`.
    pub fn tooltip(&self, now: f64) -> Option<&str> {
        let tooltip = self.tooltip.as_ref()?;
        let delay = self.config.tooltip_delay_ms as f64 / 1000.0;
        (now - tooltip.since >= delay).then_some(tooltip.node.as_str())
    }

    /// Seconds until the pending tooltip shows, for repaint scheduling.
    pub fn tooltip_due_in(&self, now: f64) -> Option<f64> {
        let tooltip = self.tooltip.as_ref()?;
        let delay = self.config.tooltip_delay_ms as f64 / 1000.0;
        let remaining = tooltip.since + delay - now;
        (remaining > 0.0).then_some(remaining)
    }

    pub fn cursor(&self) -> CursorIcon {
        if self.dragging.is_some() {
            CursorIcon::Grabbing
        } else if self.hovered.is_some() {
            CursorIcon::PointingHand
        } else {
            CursorIcon::Default
        }
    }

    /// Forget all selection and hover state (used when the graph is replaced).
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
        self.hovered = None;
        self.tooltip = None;
        self.dragging = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InteractionController {
        InteractionController::new(&InteractionConfig::default())
    }

    fn click(node: &str, multi: bool) -> InteractionEvent {
        InteractionEvent::Click {
            node: Some(node.to_string()),
            multi,
        }
    }

    #[test]
    fn hover_then_leave_returns_to_idle() {
        let mut c = controller();
        c.handle(InteractionEvent::PointerEnter("a".into()), 0.0);
        assert_eq!(c.state(), &SelectionState::Hovering("a".into()));
        c.handle(InteractionEvent::PointerEnter("b".into()), 0.1);
        assert_eq!(c.state(), &SelectionState::Hovering("b".into()));
        c.handle(InteractionEvent::PointerLeave, 0.2);
        assert_eq!(c.state(), &SelectionState::Idle);
    }

    #[test]
    fn click_replaces_selection() {
        let mut c = controller();
        c.handle(click("a", false), 0.0);
        c.handle(click("b", false), 0.1);
        assert_eq!(c.selection(), vec!["b"]);
    }

    #[test]
    fn multi_click_toggles_membership() {
        let mut c = controller();
        c.handle(click("a", false), 0.0);
        c.handle(click("b", true), 0.1);
        assert_eq!(c.selection(), vec!["a", "b"]);
        c.handle(click("a", true), 0.2);
        assert_eq!(c.selection(), vec!["b"]);
        c.handle(click("b", true), 0.3);
        assert_eq!(c.state(), &SelectionState::Idle);
    }

    #[test]
    fn deselecting_the_last_node_under_the_pointer_keeps_hover() {
        let mut c = controller();
        c.handle(InteractionEvent::PointerEnter("a".into()), 0.0);
        c.handle(click("a", false), 0.1);
        c.handle(click("a", true), 0.2);
        assert_eq!(c.state(), &SelectionState::Hovering("a".into()));
        assert!(c.selection().is_empty());

        c.handle(InteractionEvent::PointerLeave, 0.3);
        assert_eq!(c.state(), &SelectionState::Idle);
    }

    #[test]
    fn multiselect_disabled_replaces() {
        let config = InteractionConfig {
            multiselect: false,
            ..InteractionConfig::default()
        };
        let mut c = InteractionController::new(&config);
        c.handle(click("a", false), 0.0);
        c.handle(click("b", true), 0.1);
        assert_eq!(c.selection(), vec!["b"]);
    }

    #[test]
    fn hover_keeps_selection() {
        let mut c = controller();
        c.handle(click("a", false), 0.0);
        c.handle(InteractionEvent::PointerEnter("b".into()), 0.1);
        assert!(c.is_selected("a"));
        assert_eq!(c.hovered(), Some("b"));
        c.handle(InteractionEvent::PointerLeave, 0.2);
        assert!(c.is_selected("a"));
    }

    #[test]
    fn empty_canvas_click_clears() {
        let mut c = controller();
        c.handle(click("a", false), 0.0);
        c.handle(
            InteractionEvent::Click {
                node: None,
                multi: false,
            },
            0.1,
        );
        assert_eq!(c.state(), &SelectionState::Idle);
        assert!(c.selection().is_empty());
    }

    #[test]
    fn tooltip_waits_for_delay() {
        let mut c = controller();
        c.handle(InteractionEvent::PointerEnter("a".into()), 1.0);
        assert_eq!(c.tooltip(5.0), None);
        assert_eq!(c.tooltip_due_in(5.0), Some(6.0));
        assert_eq!(c.tooltip(11.0), Some("a"));
    }

    #[test]
    fn leaving_cancels_tooltip() {
        let mut c = controller();
        c.handle(InteractionEvent::PointerEnter("a".into()), 0.0);
        c.handle(InteractionEvent::PointerLeave, 3.0);
        assert_eq!(c.tooltip(20.0), None);
    }

    #[test]
    fn hover_disabled_ignores_enter() {
        let config = InteractionConfig {
            hover: false,
            ..InteractionConfig::default()
        };
        let mut c = InteractionController::new(&config);
        c.handle(InteractionEvent::PointerEnter("a".into()), 0.0);
        assert_eq!(c.state(), &SelectionState::Idle);
        assert_eq!(c.tooltip(60.0), None);
    }

    #[test]
    fn drag_emits_pin_move_release() {
        let mut c = controller();
        let pin = c.handle(
            InteractionEvent::DragStart {
                node: "a".into(),
                pos: Pos2::ZERO,
            },
            0.0,
        );
        assert_eq!(pin, Some(DragCommand::Pin("a".into())));
        assert_eq!(c.cursor(), CursorIcon::Grabbing);

        let moved = c.handle(InteractionEvent::DragMove(Pos2::new(3.0, 4.0)), 0.1);
        assert_eq!(moved, Some(DragCommand::MoveTo("a".into(), Pos2::new(3.0, 4.0))));

        let release = c.handle(InteractionEvent::DragEnd, 0.2);
        assert_eq!(release, Some(DragCommand::Release("a".into())));
        assert_eq!(c.dragging(), None);
        assert_eq!(c.handle(InteractionEvent::DragMove(Pos2::ZERO), 0.3), None);
    }
}
