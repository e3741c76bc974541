//! Colour palettes for the graph visualization
//!
//! Config colours are `#RRGGBB` / `#RRGGBBAA` strings; they are parsed once
//! into [`NodeStyle`]s per node kind when the renderer is built.

use egui::Color32;

use crate::config::{ColorInherit, NodeShape, ScalingBounds, VisualizerConfig};
use crate::graph::NodeKind;

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(value: &str) -> Option<Color32> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Color32::from_rgb(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 => Some(Color32::from_rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color32::from_rgba_unmultiplied(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)?,
        )),
        _ => None,
    }
}

/// Parse a colour that validation already accepted.
fn resolved(value: &str) -> Color32 {
    parse_hex_color(value).unwrap_or(Color32::GRAY)
}

/// Icon glyph drawn for icon-shaped nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct IconGlyph {
    pub glyph: String,
    pub size: f32,
    pub color: Color32,
}

/// Fully resolved visual attributes of one node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub background: Color32,
    pub border: Color32,
    pub shape: NodeShape,
    pub size: f32,
    pub scaling: ScalingBounds,
    pub border_radius: f32,
    pub border_dashes: bool,
    pub icon: Option<IconGlyph>,
}

/// Styles for every node kind plus edge/label colours.
#[derive(Debug, Clone)]
pub struct Palette {
    entity: NodeStyle,
    relation: NodeStyle,
    permission: NodeStyle,
    logic: NodeStyle,
    pub hover: Color32,
    pub font: Color32,
    pub edge: Color32,
    pub edge_highlight: Color32,
    pub edge_hover: Color32,
    pub edge_label_stroke: Color32,
    pub edge_inherit: ColorInherit,
}

impl Palette {
    /// Resolve from a validated config.
    pub fn from_config(config: &VisualizerConfig) -> Self {
        let style = |kind: NodeKind| {
            let group = config.groups.get(kind);
            let default_fill = resolved(&config.edges.color);
            let background = group.background.as_deref().map(resolved).unwrap_or(default_fill);
            NodeStyle {
                background,
                border: group.border.as_deref().map(resolved).unwrap_or(background),
                shape: config.shape_for(kind),
                size: config.size_for(kind),
                scaling: config.scaling_for(kind),
                border_radius: group.border_radius,
                border_dashes: group.border_dashes,
                icon: group.icon.as_ref().map(|icon| IconGlyph {
                    glyph: icon.code.clone(),
                    size: icon.size,
                    color: resolved(&icon.color),
                }),
            }
        };

        Self {
            entity: style(NodeKind::Entity),
            relation: style(NodeKind::Relation),
            permission: style(NodeKind::Permission),
            logic: style(NodeKind::Logic),
            hover: resolved(&config.nodes.hover_color),
            font: resolved(&config.nodes.font_color),
            edge: resolved(&config.edges.color),
            edge_highlight: resolved(&config.edges.highlight),
            edge_hover: resolved(&config.edges.hover),
            edge_label_stroke: resolved(&config.edges.font_stroke_color),
            edge_inherit: config.edges.inherit,
        }
    }

    pub fn style(&self, kind: NodeKind) -> &NodeStyle {
        match kind {
            NodeKind::Entity => &self.entity,
            NodeKind::Relation => &self.relation,
            NodeKind::Permission => &self.permission,
            NodeKind::Logic => &self.logic,
        }
    }

    /// Edge colour given its endpoint kinds and the inherit rule.
    pub fn edge_color(&self, source: NodeKind, target: NodeKind) -> Color32 {
        match self.edge_inherit {
            ColorInherit::From => self.style(source).border,
            ColorInherit::To => self.style(target).border,
            ColorInherit::None => self.edge,
        }
    }
}

/// Fade a colour toward transparent (for de-emphasised elements).
/// Scales all four premultiplied channels, alpha included.
pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}
