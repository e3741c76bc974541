//! Authorization schema document
//!
//! The document has three top-level sections, always written in this order:
//!
//! ```yaml
//! schema:
//!   user: entity
//!   document: entity
//!   document#owner: { kind: relation, label: owner }
//! relationships:
//!   - { source: document, target: "document#owner" }
//! assertions: []
//! ```
//!
//! Declaration kinds are kept as raw text here; the graph builder is the one
//! place that checks them against the node taxonomy.

pub mod definition;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::EdgeKind;

pub use definition::{EntityDefinition, PermissionDefinition, RelationDefinition, Rule, RuleOp};

/// Schema document: declarations, relationships and assertions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Declared elements keyed by id.
    #[serde(default)]
    pub schema: BTreeMap<String, Declaration>,
    /// Edges between declared elements.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Validation statements carried alongside the model (opaque to the core).
    #[serde(default)]
    pub assertions: Vec<serde_yaml::Value>,
}

/// One declared schema element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Declaration {
    /// Short form: `id: entity`
    Kind(String),
    /// Long form with display overrides.
    Detailed {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<f32>,
    },
}

impl Declaration {
    pub fn kind(&self) -> &str {
        match self {
            Declaration::Kind(kind) => kind,
            Declaration::Detailed { kind, .. } => kind,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Declaration::Kind(_) => None,
            Declaration::Detailed { label, .. } => label.as_deref(),
        }
    }

    pub fn weight(&self) -> Option<f32> {
        match self {
            Declaration::Kind(_) => None,
            Declaration::Detailed { weight, .. } => *weight,
        }
    }
}

/// Edge between two declared elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    /// Inferred from endpoint kinds when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
    /// Excluded operand (`not` / `but not`).
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusion: bool,
    /// Allows `source == target`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reflexive: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Relationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: None,
            exclusion: false,
            reflexive: false,
        }
    }

    /// Builder: set explicit edge kind
    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Builder: mark as excluded operand
    pub fn excluded(mut self) -> Self {
        self.exclusion = true;
        self
    }

    /// Builder: allow a self edge
    pub fn reflexive(mut self) -> Self {
        self.reflexive = true;
        self
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare an element using the short form
    pub fn declare(mut self, id: impl Into<String>, kind: impl Into<String>) -> Self {
        self.schema.insert(id.into(), Declaration::Kind(kind.into()));
        self
    }

    /// Builder: declare an element with a display label
    pub fn declare_labeled(
        mut self,
        id: impl Into<String>,
        kind: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.schema.insert(
            id.into(),
            Declaration::Detailed {
                kind: kind.into(),
                label: Some(label.into()),
                weight: None,
            },
        );
        self
    }

    /// Builder: append a relationship
    pub fn relate(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Builder: append an assertion
    pub fn assert(mut self, assertion: serde_yaml::Value) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse raw YAML bytes. Invalid UTF-8 is an error, never replaced.
    pub fn from_yaml_slice(yaml: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(yaml)
    }

    /// Serialize to YAML (top-level keys in schema, relationships, assertions order).
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.schema.contains_key(id)
    }
}
