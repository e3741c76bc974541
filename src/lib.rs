//! Authorization Model Graph Visualizer
//!
//! Turns an authorization schema (entities, relations, permissions and the
//! boolean logic between them) into an interactive egui graph widget, and
//! shares schema snapshots through a pluggable object store.
//!
//! This crate contains the widget and its services only, no app shell;
//! the host application owns the frame loop.

pub mod config;
pub mod error;
pub mod graph;
pub mod schema;
pub mod share;

pub use config::{LayoutMode, VisualizerConfig};
pub use error::{ConfigError, SchemaError, ShareError, UploadError};
pub use graph::{
    build,
    // Camera / animation
    animation::{Spring, SpringConfig, SpringF32, SpringVec2},
    Camera2D,
    // Layout
    DragCommand,
    // Core graph types
    Edge,
    EdgeKind,
    Graph,
    // Interaction
    InteractionController,
    InteractionEvent,
    LayoutEngine,
    LayoutEvent,
    LayoutState,
    LayoutStatus,
    Node,
    NodeKind,
    SchemaGraphWidget,
    SelectionState,
};
pub use schema::{Declaration, Relationship, Schema};
pub use share::{
    load_shared, ShareHandle, ShareService, SharedFile, Snapshot, SnapshotSource, Uploader,
};
