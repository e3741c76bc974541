//! Rendering: draws nodes, edges, and the tooltip with egui::Painter
//!
//! Positions come from the layout state in world coordinates and are mapped
//! through the camera. Nothing here mutates layout or selection.

use egui::{Align2, Color32, FontId, Pos2, Rect, Shape, Stroke, Vec2};

use super::camera::Camera2D;
use super::colors::{with_opacity, NodeStyle, Palette};
use super::input::InteractionController;
use super::layout::{label_size, LayoutState};
use super::types::{ArrowDirection, Edge, Graph, Node};
use crate::config::{NodeShape, VisualizerConfig};

// =============================================================================
// RENDER CONSTANTS
// =============================================================================

const ARROW_SIZE: f32 = 10.0;
const DASH_LENGTH: f32 = 8.0;
const GAP_LENGTH: f32 = 6.0;
const LABEL_GAP: f32 = 4.0;
const BOX_PADDING: Vec2 = Vec2::new(10.0, 6.0);
const TOOLTIP_PADDING: Vec2 = Vec2::new(8.0, 6.0);
/// Labels smaller than this (in screen pixels) are skipped.
const MIN_LABEL_PX: f32 = 4.0;

// =============================================================================
// GRAPH RENDERER
// =============================================================================

pub struct GraphRenderer {
    palette: Palette,
    config: VisualizerConfig,
    edge_width: f32,
    edge_hover_width: f32,
    edge_font_size: f32,
    edge_font_color: Color32,
    arrow_scale: f32,
    hover_connected_edges: bool,
    /// Opacity for elements outside the current selection
    pub blur_opacity: f32,
}

/// Per-frame inputs for [`GraphRenderer::render`]
pub struct RenderOptions<'a> {
    pub interaction: &'a InteractionController,
    /// Seconds, same clock as the interaction events
    pub now: f64,
}

impl GraphRenderer {
    pub fn new(config: &VisualizerConfig) -> Self {
        let palette = Palette::from_config(config);
        let edge_font_color = super::colors::parse_hex_color(&config.edges.font_color)
            .unwrap_or(palette.font);
        Self {
            palette,
            config: config.clone(),
            edge_width: config.edges.width,
            edge_hover_width: config.edges.hover_width,
            edge_font_size: config.edges.font_size,
            edge_font_color,
            arrow_scale: config.edges.arrow_scale,
            hover_connected_edges: config.interaction.hover_connected_edges,
            blur_opacity: 0.35,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Draw the whole graph: edges first, then nodes, then the tooltip.
    pub fn render(
        &self,
        painter: &egui::Painter,
        graph: &Graph,
        state: &LayoutState,
        camera: &Camera2D,
        screen_rect: Rect,
        opts: &RenderOptions<'_>,
    ) {
        let interaction = opts.interaction;
        let selection = interaction.selection();
        let has_selection = !selection.is_empty();

        for edge in graph.edges() {
            let touches_selection = selection
                .iter()
                .any(|id| *id == edge.source || *id == edge.target);
            let touches_hover = self.hover_connected_edges
                && interaction
                    .hovered()
                    .is_some_and(|id| id == edge.source || id == edge.target);
            let opacity = if !has_selection || touches_selection {
                1.0
            } else {
                self.blur_opacity
            };
            self.render_edge(
                painter,
                graph,
                state,
                edge,
                camera,
                screen_rect,
                touches_selection || touches_hover,
                opacity,
            );
        }

        for node in graph.nodes() {
            let selected = interaction.is_selected(&node.id);
            let hovered = interaction.hovered() == Some(node.id.as_str());
            let opacity = if !has_selection || selected {
                1.0
            } else {
                self.blur_opacity
            };
            self.render_node(
                painter,
                node,
                state,
                camera,
                screen_rect,
                selected,
                hovered,
                opacity,
            );
        }

        if let Some(id) = interaction.tooltip(opts.now) {
            if let (Some(node), Some(pos)) = (graph.get_node(id), state.position(id)) {
                let anchor = camera.world_to_screen(pos, screen_rect);
                self.render_tooltip(painter, node, graph.degree(id), anchor);
            }
        }
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn render_edge(
        &self,
        painter: &egui::Painter,
        graph: &Graph,
        state: &LayoutState,
        edge: &Edge,
        camera: &Camera2D,
        screen_rect: Rect,
        highlighted: bool,
        opacity: f32,
    ) {
        let (Some(source), Some(target)) = (state.node(&edge.source), state.node(&edge.target))
        else {
            return;
        };
        if edge.source == edge.target {
            // Reflexive: a small loop above the node
            let center = camera.world_to_screen(source.position, screen_rect);
            let radius = source.size * camera.zoom() * 0.6;
            let color = with_opacity(self.edge_base_color(graph, edge), opacity);
            painter.circle_stroke(
                center - Vec2::new(0.0, source.size * camera.zoom()),
                radius,
                Stroke::new(self.edge_width * camera.zoom(), color),
            );
            return;
        }

        let zoom = camera.zoom();
        let from = camera.world_to_screen(source.position, screen_rect);
        let to = camera.world_to_screen(target.position, screen_rect);
        let bounds = Rect::from_two_pos(from, to);
        if !screen_rect.expand(ARROW_SIZE * zoom).intersects(bounds) {
            return;
        }

        let dir = (to - from).normalized();
        if !dir.x.is_finite() || !dir.y.is_finite() {
            return;
        }
        // Clip to the node discs so arrows touch the outline
        let start = from + dir * source.size * zoom;
        let end = to - dir * target.size * zoom;

        let (color, width) = if highlighted {
            (self.palette.edge_highlight, self.edge_width + self.edge_hover_width)
        } else {
            (self.edge_base_color(graph, edge), self.edge_width)
        };
        let stroke = Stroke::new(width * zoom, with_opacity(color, opacity));

        if edge.exclusion {
            render_dashed_line(painter, start, end, zoom, stroke);
            self.render_edge_label(painter, start + (end - start) * 0.5, "not", zoom, opacity);
        } else {
            painter.line_segment([start, end], stroke);
        }

        let (tip, direction) = match edge.kind.arrow() {
            ArrowDirection::ToTarget => (end, dir),
            ArrowDirection::ToSource => (start, -dir),
        };
        render_arrow_head(
            painter,
            tip,
            direction,
            ARROW_SIZE * self.arrow_scale * zoom,
            stroke.color,
        );
    }

    /// Unhighlighted colour of an edge, self-loops included.
    fn edge_base_color(&self, graph: &Graph, edge: &Edge) -> Color32 {
        match (graph.get_node(&edge.source), graph.get_node(&edge.target)) {
            (Some(s), Some(t)) => self.palette.edge_color(s.kind, t.kind),
            _ => self.palette.edge,
        }
    }

    fn render_edge_label(
        &self,
        painter: &egui::Painter,
        position: Pos2,
        label: &str,
        zoom: f32,
        opacity: f32,
    ) {
        let font_size = self.edge_font_size * zoom;
        if font_size < MIN_LABEL_PX {
            return;
        }
        let galley = painter.layout_no_wrap(
            label.to_string(),
            FontId::proportional(font_size),
            with_opacity(self.edge_font_color, opacity),
        );
        let rect = Rect::from_center_size(position, galley.size() + Vec2::splat(4.0 * zoom));
        painter.rect_filled(
            rect,
            2.0 * zoom,
            with_opacity(self.palette.edge_label_stroke, opacity),
        );
        painter.galley(rect.center() - galley.size() / 2.0, galley, Color32::WHITE);
    }

    // =========================================================================
    // NODES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn render_node(
        &self,
        painter: &egui::Painter,
        node: &Node,
        state: &LayoutState,
        camera: &Camera2D,
        screen_rect: Rect,
        selected: bool,
        hovered: bool,
        opacity: f32,
    ) {
        let Some(sim) = state.node(&node.id) else {
            return;
        };
        let zoom = camera.zoom();
        let center = camera.world_to_screen(sim.position, screen_rect);
        let radius = sim.size * zoom;

        let visible = Rect::from_center_size(center, Vec2::splat(radius * 4.0));
        if !screen_rect.intersects(visible) {
            return;
        }

        let style = self.palette.style(node.kind);
        let fill = with_opacity(style.background, opacity);
        let border_color = if selected || hovered {
            self.palette.hover
        } else {
            style.border
        };
        let border = Stroke::new(
            (if selected { 3.0 } else { 1.5 }) * zoom.max(0.5),
            with_opacity(border_color, opacity),
        );
        let font_size = label_size(node, sim.size, &self.config) * zoom;
        let label_color = with_opacity(self.palette.font, opacity);

        match style.shape {
            NodeShape::Dot => {
                painter.circle(center, radius, fill, border);
                self.render_label_below(painter, &node.label, center, radius, font_size, label_color);
            }
            NodeShape::Diamond => {
                painter.add(diamond(center, radius, fill, border));
                self.render_label_below(painter, &node.label, center, radius, font_size, label_color);
            }
            NodeShape::Box => {
                let label = (font_size, label_color);
                self.render_box(painter, node, style, center, radius, zoom, fill, border, label);
            }
            NodeShape::Icon => {
                self.render_icon(painter, style, center, radius, zoom, opacity, border);
                self.render_label_below(painter, &node.label, center, radius, font_size, label_color);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_box(
        &self,
        painter: &egui::Painter,
        node: &Node,
        style: &NodeStyle,
        center: Pos2,
        radius: f32,
        zoom: f32,
        fill: Color32,
        border: Stroke,
        (font_size, label_color): (f32, Color32),
    ) {
        let font_size = font_size.max(1.0);
        let galley = painter.layout_no_wrap(
            node.label.clone(),
            FontId::proportional(font_size),
            label_color,
        );
        let size = (galley.size() + BOX_PADDING * 2.0 * zoom).max(Vec2::splat(radius * 2.0));
        let rect = Rect::from_center_size(center, size);
        let rounding = style.border_radius * zoom * 4.0;

        painter.rect_filled(rect, rounding, fill);
        painter.rect_stroke(rect, rounding, border);
        if font_size >= MIN_LABEL_PX {
            painter.galley(center - galley.size() / 2.0, galley, label_color);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_icon(
        &self,
        painter: &egui::Painter,
        style: &NodeStyle,
        center: Pos2,
        radius: f32,
        zoom: f32,
        opacity: f32,
        border: Stroke,
    ) {
        let Some(icon) = style.icon.as_ref() else {
            painter.add(diamond(center, radius, with_opacity(style.background, opacity), border));
            return;
        };

        let font_id = FontId::proportional(icon.size * zoom);
        let color = with_opacity(icon.color, opacity);
        let renderable = icon
            .glyph
            .chars()
            .next()
            .is_some_and(|c| painter.ctx().fonts(|f| f.has_glyph(&font_id, c)));

        if renderable {
            painter.text(center, Align2::CENTER_CENTER, &icon.glyph, font_id, color);
        } else {
            // Icon font not installed: fall back to a marker in the icon colour
            painter.add(diamond(center, radius.max(icon.size * zoom * 0.4), color, border));
        }
    }

    fn render_label_below(
        &self,
        painter: &egui::Painter,
        label: &str,
        center: Pos2,
        radius: f32,
        font_size: f32,
        color: Color32,
    ) {
        if font_size < MIN_LABEL_PX {
            return;
        }
        painter.text(
            center + Vec2::new(0.0, radius + LABEL_GAP),
            Align2::CENTER_TOP,
            label,
            FontId::proportional(font_size),
            color,
        );
    }

    // =========================================================================
    // TOOLTIP
    // =========================================================================

    fn render_tooltip(&self, painter: &egui::Painter, node: &Node, degree: usize, anchor: Pos2) {
        let text = format!("{}\n{} · {} edges\n{}", node.label, node.kind, degree, node.id);
        let galley = painter.layout_no_wrap(text, FontId::proportional(13.0), Color32::WHITE);
        let rect = Rect::from_min_size(
            anchor + Vec2::new(12.0, 12.0),
            galley.size() + TOOLTIP_PADDING * 2.0,
        );
        painter.rect_filled(rect, 4.0, self.palette.edge_label_stroke);
        painter.rect_stroke(rect, 4.0, Stroke::new(1.0, self.palette.style(node.kind).border));
        painter.galley(rect.min + TOOLTIP_PADDING, galley, Color32::WHITE);
    }
}

// =============================================================================
// SHAPE HELPERS
// =============================================================================

fn diamond(center: Pos2, radius: f32, fill: Color32, stroke: Stroke) -> Shape {
    Shape::convex_polygon(
        vec![
            center + Vec2::new(0.0, -radius),
            center + Vec2::new(radius, 0.0),
            center + Vec2::new(0.0, radius),
            center + Vec2::new(-radius, 0.0),
        ],
        fill,
        stroke,
    )
}

/// Filled triangle with its point at `tip`
pub fn render_arrow_head(
    painter: &egui::Painter,
    tip: Pos2,
    direction: Vec2,
    size: f32,
    color: Color32,
) {
    let dir = direction.normalized();
    let perp = Vec2::new(-dir.y, dir.x);

    painter.add(Shape::convex_polygon(
        vec![
            tip,
            tip - dir * size + perp * size * 0.5,
            tip - dir * size - perp * size * 0.5,
        ],
        color,
        Stroke::NONE,
    ));
}

/// Straight dashed line, dash length scaled by zoom
fn render_dashed_line(painter: &egui::Painter, from: Pos2, to: Pos2, zoom: f32, stroke: Stroke) {
    let length = (to - from).length();
    if length <= f32::EPSILON {
        return;
    }
    let dir = (to - from) / length;
    let dash = DASH_LENGTH * zoom.max(0.1);
    let gap = GAP_LENGTH * zoom.max(0.1);

    let mut dist = 0.0;
    while dist < length {
        let end = (dist + dash).min(length);
        painter.line_segment([from + dir * dist, from + dir * end], stroke);
        dist = end + gap;
    }
}
