//! Core types for the authorization graph
//!
//! A [`Graph`] is produced by the builder and never mutated afterwards; a
//! schema change produces a fresh graph.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// NODE KINDS
// =============================================================================

/// Fixed node taxonomy. Each kind maps to exactly one visual group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    Relation,
    Permission,
    Logic,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Entity,
        NodeKind::Relation,
        NodeKind::Permission,
        NodeKind::Logic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entity => "entity",
            NodeKind::Relation => "relation",
            NodeKind::Permission => "permission",
            NodeKind::Logic => "logic",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity" => Ok(Self::Entity),
            "relation" => Ok(Self::Relation),
            "permission" => Ok(Self::Permission),
            "logic" => Ok(Self::Logic),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EDGE KINDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Entity owns a relation (or a relation admits a subject).
    Membership,
    /// Entity exposes a permission.
    Grants,
    /// Permission or logic node composes over an operand.
    Composes,
}

/// Which end of an edge carries the arrow head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowDirection {
    ToTarget,
    ToSource,
}

impl EdgeKind {
    /// Kind used when a relationship does not name one.
    pub fn infer(source: NodeKind, target: NodeKind) -> Self {
        match (source, target) {
            (NodeKind::Entity, NodeKind::Permission) => EdgeKind::Grants,
            (NodeKind::Permission | NodeKind::Logic, _) => EdgeKind::Composes,
            _ => EdgeKind::Membership,
        }
    }

    pub fn arrow(&self) -> ArrowDirection {
        match self {
            EdgeKind::Membership | EdgeKind::Grants => ArrowDirection::ToTarget,
            EdgeKind::Composes => ArrowDirection::ToSource,
        }
    }
}

// =============================================================================
// NODES / EDGES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Drives size scaling inside the group's bounds.
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// Excluded operand, drawn dashed.
    pub exclusion: bool,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Typed node/edge set handed to the layout engine.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
}

impl Graph {
    /// Assemble a graph. Callers guarantee unique ids and resolved endpoints.
    pub(crate) fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        Self {
            nodes,
            edges,
            index,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges touching the node (either direction).
    pub fn degree(&self, id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_parses_taxonomy_only() {
        assert_eq!("entity".parse::<NodeKind>(), Ok(NodeKind::Entity));
        assert_eq!("logic".parse::<NodeKind>(), Ok(NodeKind::Logic));
        assert!("role".parse::<NodeKind>().is_err());
        assert!("Entity".parse::<NodeKind>().is_err());
    }

    #[test]
    fn edge_kind_inference() {
        assert_eq!(
            EdgeKind::infer(NodeKind::Entity, NodeKind::Relation),
            EdgeKind::Membership
        );
        assert_eq!(
            EdgeKind::infer(NodeKind::Entity, NodeKind::Permission),
            EdgeKind::Grants
        );
        assert_eq!(
            EdgeKind::infer(NodeKind::Logic, NodeKind::Relation),
            EdgeKind::Composes
        );
        assert_eq!(EdgeKind::Composes.arrow(), ArrowDirection::ToSource);
    }
}
