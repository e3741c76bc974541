//! Visualizer configuration
//!
//! One typed object read once when the layout engine and renderer are built.
//! Changing it afterwards means building a new engine.
//!
//! Loaded from YAML (see `config/visualizer.yaml`); every section is optional
//! and falls back to the defaults below. Unknown keys are rejected, including
//! unknown visual group names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::colors::parse_hex_color;
use crate::graph::NodeKind;

/// Shortest share id accepted by validation.
pub const MIN_SHARE_ID_LENGTH: usize = 21;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualizerConfig {
    pub layout: LayoutConfig,
    pub physics: PhysicsConfig,
    pub stabilization: StabilizationConfig,
    pub interaction: InteractionConfig,
    pub nodes: NodeDefaults,
    pub edges: EdgeStyle,
    pub groups: GroupStyles,
    pub share: ShareConfig,
}

// =============================================================================
// LAYOUT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Physics,
    Hierarchical,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub mode: LayoutMode,
    pub hierarchical: HierarchicalConfig,
}

/// Level axis and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Up-down: level 0 at the top.
    #[default]
    #[serde(rename = "UD")]
    UpDown,
    #[serde(rename = "DU")]
    DownUp,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

/// How levels are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMethod {
    /// Best-connected node first, neighbours one level further.
    #[default]
    Hubsize,
    /// Follow edge direction from sources.
    Directed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShakeTowards {
    #[default]
    Roots,
    Leaves,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HierarchicalConfig {
    pub direction: Direction,
    pub sort_method: SortMethod,
    pub shake_towards: ShakeTowards,
    pub level_separation: f32,
    pub node_spacing: f32,
    pub tree_spacing: f32,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            direction: Direction::UpDown,
            sort_method: SortMethod::Hubsize,
            shake_towards: ShakeTowards::Roots,
            level_separation: 150.0,
            node_spacing: 150.0,
            tree_spacing: 200.0,
        }
    }
}

// =============================================================================
// PHYSICS / STABILIZATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Negative = repulsive.
    pub gravitational_constant: f32,
    pub central_gravity: f32,
    pub spring_length: f32,
    pub spring_constant: f32,
    /// 0 = point masses, 1+ = node radii push apart.
    pub avoid_overlap: f32,
    pub damping: f32,
    pub max_velocity: f32,
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravitational_constant: -26.0,
            central_gravity: 0.005,
            spring_length: 250.0,
            spring_constant: 0.18,
            avoid_overlap: 1.5,
            damping: 0.4,
            max_velocity: 30.0,
            timestep: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilizationConfig {
    /// Iteration cap; reaching it without settling is a timeout.
    pub iterations: u32,
    /// Steps between progress events.
    pub update_interval: u32,
    /// Max node speed considered settled.
    pub min_velocity: f32,
    /// Consecutive settled steps required.
    pub stable_window: u32,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            update_interval: 25,
            min_velocity: 0.1,
            stable_window: 5,
        }
    }
}

// =============================================================================
// INTERACTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractionConfig {
    pub tooltip_delay_ms: u64,
    pub hover: bool,
    pub hover_connected_edges: bool,
    pub multiselect: bool,
    pub keyboard: bool,
    pub drag_nodes: bool,
    pub zoom_speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            tooltip_delay_ms: 10_000,
            hover: true,
            hover_connected_edges: false,
            multiselect: true,
            keyboard: false,
            drag_nodes: true,
            zoom_speed: 0.001,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

// =============================================================================
// NODE / EDGE STYLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    #[default]
    Dot,
    Box,
    Diamond,
    Icon,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalingBounds {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeDefaults {
    pub shape: NodeShape,
    pub size: f32,
    pub scaling: ScalingBounds,
    pub label_scaling: ScalingBounds,
    pub font_color: String,
    pub font_size: f32,
    pub hover_color: String,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            shape: NodeShape::Dot,
            size: 25.0,
            scaling: ScalingBounds {
                min: 10.0,
                max: 60.0,
            },
            label_scaling: ScalingBounds {
                min: 20.0,
                max: 32.0,
            },
            font_color: "#ffffff".into(),
            font_size: 20.0,
            hover_color: "#8246FF".into(),
        }
    }
}

/// Which endpoint an edge takes its colour from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorInherit {
    #[default]
    From,
    To,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeStyle {
    pub color: String,
    pub highlight: String,
    pub hover: String,
    pub inherit: ColorInherit,
    pub width: f32,
    pub hover_width: f32,
    pub arrow_scale: f32,
    pub font_size: f32,
    pub font_color: String,
    pub font_stroke_color: String,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            color: "#8246FF".into(),
            highlight: "#8246FF".into(),
            hover: "#8246FF".into(),
            inherit: ColorInherit::From,
            width: 3.0,
            hover_width: 1.0,
            arrow_scale: 1.0,
            font_size: 20.0,
            font_color: "#ffffff".into(),
            font_stroke_color: "#141517".into(),
        }
    }
}

// =============================================================================
// VISUAL GROUPS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconStyle {
    pub face: String,
    pub code: String,
    pub size: f32,
    pub color: String,
}

/// Per-kind overrides layered over [`NodeDefaults`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupStyle {
    pub background: Option<String>,
    pub border: Option<String>,
    pub shape: Option<NodeShape>,
    pub size: Option<f32>,
    pub scaling_min: Option<f32>,
    pub scaling_max: Option<f32>,
    pub border_radius: f32,
    pub border_dashes: bool,
    pub icon: Option<IconStyle>,
}

/// One visual group per node kind. No other keys are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupStyles {
    pub entity: GroupStyle,
    pub relation: GroupStyle,
    pub permission: GroupStyle,
    pub logic: GroupStyle,
}

impl Default for GroupStyles {
    fn default() -> Self {
        Self {
            entity: GroupStyle {
                background: Some("#6318FF".into()),
                border: Some("#6318FF".into()),
                shape: Some(NodeShape::Dot),
                size: Some(30.0),
                scaling_min: Some(20.0),
                ..Default::default()
            },
            relation: GroupStyle {
                background: Some("#93F1EE".into()),
                border: Some("#93F1EE".into()),
                shape: Some(NodeShape::Dot),
                size: Some(20.0),
                scaling_min: Some(10.0),
                ..Default::default()
            },
            permission: GroupStyle {
                background: Some("#5bcc63".into()),
                border: Some("#5bcc63".into()),
                shape: Some(NodeShape::Box),
                size: Some(20.0),
                border_radius: 1.0,
                ..Default::default()
            },
            logic: GroupStyle {
                background: Some("#e53472".into()),
                border: Some("#e53472".into()),
                shape: Some(NodeShape::Icon),
                size: Some(15.0),
                icon: Some(IconStyle {
                    face: "FontAwesome".into(),
                    code: "\u{f286}".into(),
                    size: 50.0,
                    color: "#e53472".into(),
                }),
                ..Default::default()
            },
        }
    }
}

impl GroupStyles {
    pub fn get(&self, kind: NodeKind) -> &GroupStyle {
        match kind {
            NodeKind::Entity => &self.entity,
            NodeKind::Relation => &self.relation,
            NodeKind::Permission => &self.permission,
            NodeKind::Logic => &self.logic,
        }
    }
}

// =============================================================================
// SHARING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShareConfig {
    /// Object path prefix, documents land at `<prefix>/<id>.<extension>`.
    pub path_prefix: String,
    pub extension: String,
    pub content_type: String,
    /// Base of the link shown after a successful share (`<base>?s=<id>`).
    pub link_base: String,
    pub id_length: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            path_prefix: "shapes".into(),
            extension: "yaml".into(),
            content_type: "text/x-yaml".into(),
            link_base: "http://localhost:3000/".into(),
            id_length: MIN_SHARE_ID_LENGTH,
        }
    }
}

// =============================================================================
// LOADING / VALIDATION
// =============================================================================

impl VisualizerConfig {
    /// Parse and validate a YAML config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), mode = ?config.layout.mode, "loaded visualizer config");
        Ok(config)
    }

    /// Check every colour and numeric bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        finite("physics.gravitational_constant", p.gravitational_constant)?;
        positive("physics.timestep", p.timestep)?;
        positive("physics.max_velocity", p.max_velocity)?;
        positive("physics.spring_length", p.spring_length)?;
        non_negative("physics.spring_constant", p.spring_constant)?;
        non_negative("physics.central_gravity", p.central_gravity)?;
        non_negative("physics.avoid_overlap", p.avoid_overlap)?;
        if !(0.0..1.0).contains(&p.damping) {
            return Err(ConfigError::invalid("physics.damping", "must be in [0, 1)"));
        }

        let s = &self.stabilization;
        if s.iterations == 0 {
            return Err(ConfigError::invalid("stabilization.iterations", "must be > 0"));
        }
        if s.update_interval == 0 {
            return Err(ConfigError::invalid("stabilization.update_interval", "must be > 0"));
        }
        if s.stable_window == 0 {
            return Err(ConfigError::invalid("stabilization.stable_window", "must be > 0"));
        }
        non_negative("stabilization.min_velocity", s.min_velocity)?;

        let h = &self.layout.hierarchical;
        positive("layout.hierarchical.level_separation", h.level_separation)?;
        positive("layout.hierarchical.node_spacing", h.node_spacing)?;
        positive("layout.hierarchical.tree_spacing", h.tree_spacing)?;

        let i = &self.interaction;
        finite("interaction.zoom_speed", i.zoom_speed)?;
        positive("interaction.min_zoom", i.min_zoom)?;
        finite("interaction.max_zoom", i.max_zoom)?;
        if i.max_zoom < i.min_zoom {
            return Err(ConfigError::invalid("interaction.max_zoom", "must be >= min_zoom"));
        }

        let n = &self.nodes;
        positive("nodes.size", n.size)?;
        bounds("nodes.scaling", n.scaling)?;
        bounds("nodes.label_scaling", n.label_scaling)?;
        color("nodes.font_color", &n.font_color)?;
        color("nodes.hover_color", &n.hover_color)?;

        let e = &self.edges;
        positive("edges.width", e.width)?;
        for (field, value) in [
            ("edges.color", &e.color),
            ("edges.highlight", &e.highlight),
            ("edges.hover", &e.hover),
            ("edges.font_color", &e.font_color),
            ("edges.font_stroke_color", &e.font_stroke_color),
        ] {
            color(field, value)?;
        }

        for kind in NodeKind::ALL {
            self.validate_group(kind)?;
        }

        if self.share.id_length < MIN_SHARE_ID_LENGTH {
            return Err(ConfigError::invalid(
                "share.id_length",
                format!("must be at least {}", MIN_SHARE_ID_LENGTH),
            ));
        }
        if self.share.path_prefix.is_empty() || self.share.extension.is_empty() {
            return Err(ConfigError::invalid("share", "path_prefix and extension are required"));
        }
        Ok(())
    }

    fn validate_group(&self, kind: NodeKind) -> Result<(), ConfigError> {
        let group = self.groups.get(kind);
        let field = |name: &str| format!("groups.{}.{}", kind, name);

        if let Some(ref value) = group.background {
            color(&field("background"), value)?;
        }
        if let Some(ref value) = group.border {
            color(&field("border"), value)?;
        }
        if let Some(size) = group.size {
            positive(&field("size"), size)?;
        }
        bounds(&field("scaling"), self.scaling_for(kind))?;
        if let Some(ref icon) = group.icon {
            color(&field("icon.color"), &icon.color)?;
            positive(&field("icon.size"), icon.size)?;
            if icon.code.chars().count() != 1 {
                return Err(ConfigError::invalid(field("icon.code"), "must be a single glyph"));
            }
        }
        Ok(())
    }

    /// Size bounds for a kind: group overrides over node defaults.
    pub fn scaling_for(&self, kind: NodeKind) -> ScalingBounds {
        let group = self.groups.get(kind);
        ScalingBounds {
            min: group.scaling_min.unwrap_or(self.nodes.scaling.min),
            max: group.scaling_max.unwrap_or(self.nodes.scaling.max),
        }
    }

    /// Base size for a kind.
    pub fn size_for(&self, kind: NodeKind) -> f32 {
        self.groups.get(kind).size.unwrap_or(self.nodes.size)
    }

    pub fn shape_for(&self, kind: NodeKind) -> NodeShape {
        self.groups.get(kind).shape.unwrap_or(self.nodes.shape)
    }
}

fn finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be a finite number"))
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be a positive number"))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be >= 0"))
    }
}

fn bounds(field: &str, value: ScalingBounds) -> Result<(), ConfigError> {
    positive(field, value.min)?;
    finite(field, value.max)?;
    if value.max < value.min {
        return Err(ConfigError::invalid(field, "max must be >= min"));
    }
    Ok(())
}

fn color(field: &str, value: &str) -> Result<(), ConfigError> {
    parse_hex_color(value)
        .map(|_| ())
        .ok_or_else(|| ConfigError::InvalidColor {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        VisualizerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = VisualizerConfig::from_yaml_str(
            "layout:\n  mode: hierarchical\nphysics:\n  max_velocity: 12\n",
        )
        .unwrap();
        assert_eq!(config.layout.mode, LayoutMode::Hierarchical);
        assert_eq!(config.physics.max_velocity, 12.0);
        assert_eq!(config.physics.spring_length, 250.0);
        assert_eq!(config.stabilization.iterations, 1000);
    }

    #[test]
    fn unknown_group_key_is_rejected() {
        let err = VisualizerConfig::from_yaml_str("groups:\n  role:\n    size: 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_colour_is_rejected() {
        let err = VisualizerConfig::from_yaml_str("groups:\n  entity:\n    background: purple\n")
            .unwrap_err();
        match err {
            ConfigError::InvalidColor { field, value } => {
                assert_eq!(field, "groups.entity.background");
                assert_eq!(value, "purple");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn group_overrides_layer_over_node_defaults() {
        let config = VisualizerConfig::default();
        assert_eq!(config.scaling_for(NodeKind::Entity).min, 20.0);
        assert_eq!(config.scaling_for(NodeKind::Entity).max, 60.0);
        assert_eq!(config.scaling_for(NodeKind::Permission).min, 10.0);
        assert_eq!(config.size_for(NodeKind::Logic), 15.0);
        assert_eq!(config.shape_for(NodeKind::Permission), NodeShape::Box);
    }

    #[test]
    fn inverted_scaling_is_rejected() {
        let err = VisualizerConfig::from_yaml_str("groups:\n  relation:\n    scaling_min: 80\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for (yaml, field) in [
            ("physics:\n  gravitational_constant: .nan\n", "physics.gravitational_constant"),
            ("interaction:\n  zoom_speed: .inf\n", "interaction.zoom_speed"),
            ("interaction:\n  max_zoom: .inf\n", "interaction.max_zoom"),
            ("nodes:\n  label_scaling: { min: 10, max: .inf }\n", "nodes.label_scaling"),
        ] {
            match VisualizerConfig::from_yaml_str(yaml) {
                Err(ConfigError::InvalidValue { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{yaml:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn short_share_ids_are_rejected() {
        let err = VisualizerConfig::from_yaml_str("share:\n  id_length: 8\n").unwrap_err();
        assert!(err.to_string().contains("share.id_length"));
    }

    #[test]
    fn bundled_config_file_is_valid() {
        let config = VisualizerConfig::load(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/visualizer.yaml"
        ))
        .unwrap();
        assert_eq!(config.groups, GroupStyles::default());
        assert_eq!(config.physics, PhysicsConfig::default());
    }
}
