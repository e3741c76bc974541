//! Schema-to-graph builder
//!
//! Pure transform: the same schema always yields the same node and edge sets
//! (nodes in declaration-id order, edges in relationship order). Validation
//! happens before anything is assembled, so an error never leaves a partial graph.

use std::collections::HashMap;

use super::types::{Edge, EdgeKind, Graph, Node, NodeKind};
use crate::error::SchemaError;
use crate::schema::Schema;

/// Build a typed graph from a schema document.
pub fn build(schema: &Schema) -> Result<Graph, SchemaError> {
    let mut nodes = Vec::with_capacity(schema.schema.len());
    for (id, declaration) in &schema.schema {
        let kind = declaration
            .kind()
            .parse::<NodeKind>()
            .map_err(|kind| SchemaError::UnknownKind {
                id: id.clone(),
                kind,
            })?;
        nodes.push(Node {
            id: id.clone(),
            kind,
            label: declaration
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| default_label(id).to_string()),
            weight: declaration.weight(),
        });
    }

    let kinds: HashMap<&str, NodeKind> = nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();
    let resolve = |relationship: usize, endpoint: &str| {
        kinds
            .get(endpoint)
            .copied()
            .ok_or_else(|| SchemaError::UnresolvedReference {
                relationship,
                endpoint: endpoint.to_string(),
            })
    };

    let mut edges = Vec::with_capacity(schema.relationships.len());
    let mut out_degree: HashMap<&str, usize> = HashMap::new();
    for (i, relationship) in schema.relationships.iter().enumerate() {
        let source_kind = resolve(i, &relationship.source)?;
        let target_kind = resolve(i, &relationship.target)?;

        if relationship.source == relationship.target && !relationship.reflexive {
            return Err(SchemaError::SelfLoop {
                relationship: i,
                id: relationship.source.clone(),
            });
        }

        *out_degree.entry(relationship.source.as_str()).or_default() += 1;
        edges.push(Edge {
            source: relationship.source.clone(),
            target: relationship.target.clone(),
            kind: relationship
                .kind
                .unwrap_or_else(|| EdgeKind::infer(source_kind, target_kind)),
            exclusion: relationship.exclusion,
        });
    }

    // Entities without an explicit weight are sized by how much hangs off them.
    for node in nodes.iter_mut() {
        if node.kind == NodeKind::Entity && node.weight.is_none() {
            let degree = out_degree.get(node.id.as_str()).copied().unwrap_or(0);
            node.weight = Some(degree as f32);
        }
    }

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        assertions = schema.assertions.len(),
        "built schema graph"
    );

    Ok(Graph::from_parts(nodes, edges))
}

/// Last `:`/`#` separated segment of an id.
fn default_label(id: &str) -> &str {
    id.rsplit(|c: char| c == ':' || c == '#')
        .next()
        .unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Relationship;

    fn sample() -> Schema {
        Schema::new()
            .declare("user", "entity")
            .declare("document", "entity")
            .declare("document#owner", "relation")
            .declare("document#edit", "permission")
            .declare_labeled("document#edit:or", "logic", "or")
            .relate(Relationship::new("document", "document#owner"))
            .relate(Relationship::new("document", "document#edit"))
            .relate(Relationship::new("document#edit", "document#edit:or"))
            .relate(Relationship::new("document#edit:or", "document#owner"))
    }

    #[test]
    fn builds_one_node_per_declaration() {
        let graph = build(&sample()).unwrap();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.get_node("document#owner").unwrap().label, "owner");
        assert_eq!(graph.get_node("document#edit:or").unwrap().label, "or");
    }

    #[test]
    fn infers_edge_kinds() {
        let graph = build(&sample()).unwrap();
        let kinds: Vec<EdgeKind> = graph.edges().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EdgeKind::Membership,
                EdgeKind::Grants,
                EdgeKind::Composes,
                EdgeKind::Composes
            ]
        );
    }

    #[test]
    fn entity_weight_defaults_to_out_degree() {
        let graph = build(&sample()).unwrap();
        assert_eq!(graph.get_node("document").unwrap().weight, Some(2.0));
        assert_eq!(graph.get_node("user").unwrap().weight, Some(0.0));
        assert_eq!(graph.get_node("document#owner").unwrap().weight, None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let schema = Schema::new().declare("admin", "role");
        assert_eq!(
            build(&schema).unwrap_err(),
            SchemaError::UnknownKind {
                id: "admin".into(),
                kind: "role".into()
            }
        );
    }

    #[test]
    fn unresolved_endpoint_is_rejected() {
        let schema = sample().relate(Relationship::new("document", "folder"));
        assert_eq!(
            build(&schema).unwrap_err(),
            SchemaError::UnresolvedReference {
                relationship: 4,
                endpoint: "folder".into()
            }
        );
    }

    #[test]
    fn self_loop_requires_reflexive_flag() {
        let looped = sample().relate(Relationship::new("document", "document"));
        assert!(matches!(
            build(&looped).unwrap_err(),
            SchemaError::SelfLoop { .. }
        ));

        let reflexive = sample().relate(Relationship::new("document", "document").reflexive());
        assert_eq!(build(&reflexive).unwrap().edge_count(), 5);
    }

    #[test]
    fn default_label_uses_last_segment() {
        assert_eq!(default_label("entity:doc:relation:owner"), "owner");
        assert_eq!(default_label("doc#viewer"), "viewer");
        assert_eq!(default_label("a"), "a");
    }
}
