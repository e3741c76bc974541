//! Schema document to graph: structure preserved, errors reported whole.

use std::collections::BTreeSet;

use authz_graph::schema::{EntityDefinition, RelationDefinition, Rule};
use authz_graph::{build, EdgeKind, NodeKind, Relationship, Schema, SchemaError};
use proptest::prelude::*;

const KINDS: [&str; 4] = ["entity", "relation", "permission", "logic"];

/// Random well-formed schema: `n` declarations and relationships between them.
fn arb_schema() -> impl Strategy<Value = Schema> {
    (1usize..12)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(0usize..KINDS.len(), n),
                prop::collection::vec((0..n, 0..n, any::<bool>()), 0..24),
            )
        })
        .prop_map(|(kinds, links)| {
            let mut schema = Schema::new();
            for (i, kind) in kinds.iter().enumerate() {
                schema = schema.declare(format!("n{i}"), KINDS[*kind]);
            }
            for (source, target, exclusion) in links {
                let mut relationship = Relationship::new(format!("n{source}"), format!("n{target}"));
                if source == target {
                    relationship = relationship.reflexive();
                }
                if exclusion {
                    relationship = relationship.excluded();
                }
                schema = schema.relate(relationship);
            }
            schema
        })
}

proptest! {
    #[test]
    fn graph_mirrors_schema(schema in arb_schema()) {
        let graph = build(&schema).unwrap();

        let declared: BTreeSet<&str> = schema.schema.keys().map(String::as_str).collect();
        let nodes: BTreeSet<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(nodes, declared);
        prop_assert_eq!(graph.node_count(), schema.schema.len());
        prop_assert_eq!(graph.edge_count(), schema.relationships.len());

        for (edge, relationship) in graph.edges().iter().zip(&schema.relationships) {
            prop_assert_eq!(&edge.source, &relationship.source);
            prop_assert_eq!(&edge.target, &relationship.target);
            prop_assert_eq!(edge.exclusion, relationship.exclusion);
        }
    }

    #[test]
    fn building_twice_gives_the_same_graph(schema in arb_schema()) {
        let first = build(&schema).unwrap();
        let second = build(&schema).unwrap();
        prop_assert_eq!(first.nodes(), second.nodes());
        prop_assert_eq!(first.edges(), second.edges());
    }

    #[test]
    fn yaml_document_survives_a_reload(schema in arb_schema()) {
        let yaml = schema.to_yaml_string().unwrap();
        let reloaded = Schema::from_yaml_str(&yaml).unwrap();
        let reloaded_graph = build(&reloaded).unwrap();
        let original_graph = build(&schema).unwrap();
        prop_assert_eq!(reloaded_graph.edges(), original_graph.edges());
    }
}

#[test]
fn single_entity_document() {
    let schema = Schema::from_yaml_str("schema:\n  a: entity\nrelationships: []\nassertions: []\n")
        .unwrap();
    let graph = build(&schema).unwrap();

    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    let node = graph.get_node("a").unwrap();
    assert_eq!(node.kind, NodeKind::Entity);
    assert_eq!(node.label, "a");
}

#[test]
fn empty_document_builds_empty_graph() {
    let graph = build(&Schema::new()).unwrap();
    assert!(graph.is_empty());
}

#[test]
fn undeclared_endpoint_fails_the_whole_build() {
    let schema = Schema::new()
        .declare("document", "entity")
        .declare("document#owner", "relation")
        .relate(Relationship::new("document", "document#owner"))
        .relate(Relationship::new("document#owner", "user"));

    let err = build(&schema).unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnresolvedReference {
            relationship: 1,
            endpoint: "user".into(),
        }
    );
}

#[test]
fn unknown_kind_is_rejected() {
    let schema = Schema::new().declare("team", "group");
    assert!(matches!(
        build(&schema),
        Err(SchemaError::UnknownKind { ref kind, .. }) if kind == "group"
    ));
}

#[test]
fn self_loop_needs_reflexive_flag() {
    let plain = Schema::new()
        .declare("a", "relation")
        .relate(Relationship::new("a", "a"));
    assert!(matches!(build(&plain), Err(SchemaError::SelfLoop { .. })));

    let reflexive = Schema::new()
        .declare("a", "relation")
        .relate(Relationship::new("a", "a").reflexive());
    assert_eq!(build(&reflexive).unwrap().edge_count(), 1);
}

#[test]
fn edge_kinds_follow_endpoints_unless_given() {
    let schema = Schema::new()
        .declare("doc", "entity")
        .declare("doc#owner", "relation")
        .declare("doc#edit", "permission")
        .relate(Relationship::new("doc", "doc#owner"))
        .relate(Relationship::new("doc", "doc#edit"))
        .relate(Relationship::new("doc#edit", "doc#owner").with_kind(EdgeKind::Composes));
    let graph = build(&schema).unwrap();

    let kinds: Vec<EdgeKind> = graph.edges().iter().map(|e| e.kind).collect();
    assert_eq!(kinds[0], EdgeKind::infer(NodeKind::Entity, NodeKind::Relation));
    assert_eq!(kinds[1], EdgeKind::infer(NodeKind::Entity, NodeKind::Permission));
    assert_eq!(kinds[2], EdgeKind::Composes);
}

#[test]
fn lowered_definitions_build_cleanly() {
    let entities = vec![
        EntityDefinition::new("user"),
        EntityDefinition::new("organization")
            .with_relation(RelationDefinition::new("admin", &["user"])),
        EntityDefinition::new("repository")
            .with_relation(RelationDefinition::new("parent", &["organization"]))
            .with_relation(RelationDefinition::new("owner", &["user"]))
            .with_permission(
                "push",
                Rule::or(vec![Rule::leaf("owner"), Rule::leaf("parent.admin")]),
            ),
    ];
    let schema = Schema::from_definitions(&entities).unwrap();
    let graph = build(&schema).unwrap();

    let logic = graph
        .get_node("entity:repository:permission:push:logic:0")
        .unwrap();
    assert_eq!(logic.kind, NodeKind::Logic);
    assert_eq!(logic.label, "OR");
    assert!(graph
        .edges()
        .iter()
        .any(|e| e.source == logic.id && e.target == "entity:organization:relation:admin"));
}

#[test]
fn unknown_relation_in_rule_is_reported() {
    let entities = vec![EntityDefinition::new("doc").with_permission("view", Rule::leaf("reader"))];
    assert_eq!(
        Schema::from_definitions(&entities).unwrap_err(),
        SchemaError::RelationNotFound {
            entity: "doc".into(),
            relation: "reader".into(),
        }
    );
}
