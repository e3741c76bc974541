//! Pointer hit testing over laid-out nodes
//!
//! Nodes are indexed as discs in world space in an `rstar` R-tree, rebuilt
//! from the layout after every frame that moves something.

use egui::Pos2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::layout::LayoutState;
use super::NodeKind;

/// One node as the index sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDisc {
    pub id: String,
    pub kind: NodeKind,
    pub center: Pos2,
    pub radius: f32,
}

impl NodeDisc {
    /// Gap between `point` and the disc edge, zero when inside.
    fn gap(&self, point: Pos2) -> f32 {
        (self.center.distance(point) - self.radius).max(0.0)
    }
}

fn square(center: Pos2, half: f32) -> AABB<[f32; 2]> {
    AABB::from_corners(
        [center.x - half, center.y - half],
        [center.x + half, center.y + half],
    )
}

impl RTreeObject for NodeDisc {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        square(self.center, self.radius)
    }
}

impl PointDistance for NodeDisc {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        self.gap(Pos2::new(point[0], point[1])).powi(2)
    }
}

#[derive(Clone)]
pub struct SpatialIndex {
    tree: RTree<NodeDisc>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("nodes", &self.tree.size())
            .finish()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, discs: Vec<NodeDisc>) {
        self.tree = RTree::bulk_load(discs);
    }

    pub fn rebuild_from_layout(&mut self, state: &LayoutState) {
        let discs = state
            .nodes()
            .iter()
            .map(|node| NodeDisc {
                id: node.id.clone(),
                kind: node.kind,
                center: node.position,
                radius: node.size,
            })
            .collect();
        self.rebuild(discs);
    }

    /// Nearest node whose edge is within `slop` of `point`.
    pub fn hit_test(&self, point: Pos2, slop: f32) -> Option<&NodeDisc> {
        self.tree
            .locate_in_envelope_intersecting(&square(point, slop))
            .map(|disc| (disc.gap(point), disc))
            .filter(|(gap, _)| *gap <= slop)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, disc)| disc)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
