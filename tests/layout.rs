//! Layout runs end in a settled state with distinct, finite positions.

use authz_graph::config::{Direction, SortMethod};
use authz_graph::{
    build, DragCommand, LayoutEngine, LayoutEvent, LayoutMode, LayoutStatus, Relationship, Schema,
    VisualizerConfig,
};
use egui::pos2;
use proptest::prelude::*;

fn document_model() -> Schema {
    Schema::new()
        .declare("user", "entity")
        .declare("document", "entity")
        .declare("document#owner", "relation")
        .declare("document#viewer", "relation")
        .declare("document#edit", "permission")
        .declare("document#view", "permission")
        .declare_labeled("document#view:or", "logic", "or")
        .relate(Relationship::new("document", "document#owner"))
        .relate(Relationship::new("document", "document#viewer"))
        .relate(Relationship::new("document", "document#edit"))
        .relate(Relationship::new("document", "document#view"))
        .relate(Relationship::new("document#edit", "document#owner"))
        .relate(Relationship::new("document#view", "document#view:or"))
        .relate(Relationship::new("document#view:or", "document#viewer"))
        .relate(Relationship::new("document#view:or", "document#edit"))
        .relate(Relationship::new("document#owner", "user"))
        .relate(Relationship::new("document#viewer", "user"))
}

fn settle(schema: &Schema, config: &VisualizerConfig) -> LayoutEngine {
    let graph = build(schema).unwrap();
    let mut engine = LayoutEngine::new(config).unwrap();
    engine.set_graph(&graph);
    engine.run_to_completion();
    engine
}

fn assert_spread_out(engine: &LayoutEngine) {
    let nodes = engine.state().nodes();
    for node in nodes {
        assert!(
            node.position.x.is_finite() && node.position.y.is_finite(),
            "{} has a non-finite position",
            node.id
        );
    }
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            assert!(
                a.position.distance(b.position) > 1.0,
                "{} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

#[test]
fn physics_run_settles_within_the_cap() {
    let config = VisualizerConfig::default();
    let engine = settle(&document_model(), &config);

    assert_eq!(engine.status(), LayoutStatus::Stable);
    assert!(engine.state().iterations() < config.stabilization.iterations);
    assert_spread_out(&engine);
}

#[test]
fn mixed_node_sizes_stabilize_and_stay_put() {
    // Entity sizes 20 and 60 next to size-20 relations and permissions
    let schema = Schema::new()
        .declare("user", "entity")
        .declare("document", "entity")
        .declare("document#owner", "relation")
        .declare("document#edit", "permission")
        .relate(Relationship::new("document", "document#owner"))
        .relate(Relationship::new("document", "document#edit"))
        .relate(Relationship::new("document#edit", "document#owner"))
        .relate(Relationship::new("document#owner", "user"));
    let config = VisualizerConfig::default();
    let mut engine = settle(&schema, &config);

    assert_eq!(engine.status(), LayoutStatus::Stable);
    assert!(engine.state().iterations() < config.stabilization.iterations / 2);
    assert!(matches!(
        engine.drain_events().last(),
        Some(LayoutEvent::Stabilized { .. })
    ));

    // A settled layout is not drifting: more physics barely moves anything
    let before = engine.position("document").unwrap();
    engine.restart();
    engine.tick(100);
    assert!(engine.position("document").unwrap().distance(before) < 5.0);
}

#[test]
fn physics_run_reports_exactly_one_outcome() {
    let graph = build(&document_model()).unwrap();
    let mut engine = LayoutEngine::new(&VisualizerConfig::default()).unwrap();
    engine.set_graph(&graph);
    let status = engine.run_to_completion();

    let events = engine.drain_events();
    let outcomes: Vec<&LayoutEvent> = events
        .iter()
        .filter(|e| !matches!(e, LayoutEvent::StabilizationProgress { .. }))
        .collect();
    assert_eq!(outcomes.len(), 1);
    match (status, outcomes[0]) {
        (LayoutStatus::Stable, LayoutEvent::Stabilized { iterations })
        | (LayoutStatus::TimedOut, LayoutEvent::StabilizationTimeout { iterations }) => {
            assert_eq!(*iterations, engine.state().iterations());
        }
        other => panic!("status and event disagree: {other:?}"),
    }

    // Further steps on a settled run are no-ops
    let iterations = engine.state().iterations();
    engine.tick(50);
    assert_eq!(engine.state().iterations(), iterations);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn tiny_cap_times_out() {
    let mut config = VisualizerConfig::default();
    config.stabilization.iterations = 3;
    config.stabilization.update_interval = 1;
    let mut engine = settle(&document_model(), &config);

    assert_eq!(engine.status(), LayoutStatus::TimedOut);
    assert_eq!(engine.state().iterations(), 3);
    let events = engine.drain_events();
    assert_eq!(
        events.last(),
        Some(&LayoutEvent::StabilizationTimeout { iterations: 3 })
    );
}

#[test]
fn hierarchical_levels_do_not_overlap() {
    let mut config = VisualizerConfig::default();
    config.layout.mode = LayoutMode::Hierarchical;
    let engine = settle(&document_model(), &config);

    assert_eq!(engine.status(), LayoutStatus::Stable);
    assert_eq!(engine.state().iterations(), 1);
    assert_spread_out(&engine);

    // Level coordinates sit on multiples of the separation
    let separation = config.layout.hierarchical.level_separation;
    for node in engine.state().nodes() {
        let level = node.position.y / separation;
        assert!((level - level.round()).abs() < 1e-3, "{} is between levels", node.id);
    }
}

#[test]
fn hierarchical_left_right_uses_x_for_levels() {
    let mut config = VisualizerConfig::default();
    config.layout.mode = LayoutMode::Hierarchical;
    config.layout.hierarchical.direction = Direction::LeftRight;
    config.layout.hierarchical.sort_method = SortMethod::Directed;
    let engine = settle(&document_model(), &config);

    let document = engine.position("document").unwrap();
    let user = engine.position("user").unwrap();
    assert!(document.x < user.x);
    assert_spread_out(&engine);
}

#[test]
fn dragged_node_stays_where_it_was_dropped() {
    let mut engine = settle(&document_model(), &VisualizerConfig::default());

    assert!(engine.apply_drag(DragCommand::Pin("user".into())));
    assert!(engine.apply_drag(DragCommand::MoveTo("user".into(), pos2(900.0, -400.0))));
    engine.tick(20);
    assert_eq!(engine.position("user"), Some(pos2(900.0, -400.0)));

    assert!(engine.apply_drag(DragCommand::Release("user".into())));
    engine.run_to_completion();
    assert!(engine.status().is_settled());
    assert_spread_out(&engine);
}

#[test]
fn replacing_the_graph_keeps_known_positions() {
    let mut engine = settle(&document_model(), &VisualizerConfig::default());
    let before = engine.position("document").unwrap();

    let grown = document_model().declare("folder", "entity");
    engine.set_graph(&build(&grown).unwrap());
    assert_eq!(engine.status(), LayoutStatus::Running);
    assert_eq!(engine.position("document"), Some(before));
    assert!(engine.position("folder").is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_graphs_settle_without_collapsing(
        n in 1usize..10,
        links in prop::collection::vec((0usize..10, 0usize..10), 0..15),
    ) {
        let mut schema = Schema::new();
        for i in 0..n {
            schema = schema.declare(format!("n{i}"), "relation");
        }
        for (a, b) in links {
            let (a, b) = (a % n, b % n);
            if a != b {
                schema = schema.relate(Relationship::new(format!("n{a}"), format!("n{b}")));
            }
        }

        let config = VisualizerConfig::default();
        let engine = settle(&schema, &config);
        prop_assert!(engine.status().is_settled());
        prop_assert!(engine.state().iterations() <= config.stabilization.iterations);
        assert_spread_out(&engine);
    }
}
