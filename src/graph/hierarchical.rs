//! Hierarchical (layered) placement
//!
//! Computes positions in one pass; there is no simulation to settle.
//!
//! 1. Assign a level to every node (hub-size crawl or edge direction)
//! 2. Split the graph into connected trees, laid out side by side
//! 3. Order each level by the mean slot of its neighbours on the previous level
//! 4. Map (level, slot) onto the configured direction

use egui::Pos2;
use std::collections::VecDeque;

use crate::config::{Direction, HierarchicalConfig, ShakeTowards, SortMethod};

/// Positions for `node_count` nodes connected by directed `edges` (indices).
pub fn place(node_count: usize, edges: &[(usize, usize)], config: &HierarchicalConfig) -> Vec<Pos2> {
    if node_count == 0 {
        return Vec::new();
    }

    let neighbours = undirected(node_count, edges);
    let levels = match config.sort_method {
        SortMethod::Hubsize => levels_by_hubsize(&neighbours),
        SortMethod::Directed => levels_directed(node_count, edges, config.shake_towards),
    };

    let mut positions = vec![Pos2::ZERO; node_count];
    let mut offset = 0.0;

    for tree in components(&neighbours) {
        let rows = order_levels(&tree, &levels, &neighbours);
        let widest = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let width = (widest - 1) as f32 * config.node_spacing;

        for (level, row) in rows.iter().enumerate() {
            let row_width = row.len().saturating_sub(1) as f32 * config.node_spacing;
            let start = offset + (width - row_width) / 2.0;
            for (slot, &node) in row.iter().enumerate() {
                let across = start + slot as f32 * config.node_spacing;
                let along = level as f32 * config.level_separation;
                positions[node] = orient(config.direction, along, across);
            }
        }

        offset += width + config.tree_spacing;
    }

    positions
}

fn orient(direction: Direction, along: f32, across: f32) -> Pos2 {
    match direction {
        Direction::UpDown => Pos2::new(across, along),
        Direction::DownUp => Pos2::new(across, -along),
        Direction::LeftRight => Pos2::new(along, across),
        Direction::RightLeft => Pos2::new(-along, across),
    }
}

fn undirected(node_count: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut neighbours = vec![Vec::new(); node_count];
    for &(a, b) in edges {
        if a == b {
            continue;
        }
        if !neighbours[a].contains(&b) {
            neighbours[a].push(b);
        }
        if !neighbours[b].contains(&a) {
            neighbours[b].push(a);
        }
    }
    neighbours
}

/// Highest-degree unlevelled node becomes a root; a breadth-first crawl puts
/// each neighbour one level further out. Repeats until every node has a level.
fn levels_by_hubsize(neighbours: &[Vec<usize>]) -> Vec<usize> {
    let n = neighbours.len();
    let mut levels: Vec<Option<usize>> = vec![None; n];

    while let Some(hub) = (0..n)
        .filter(|&i| levels[i].is_none())
        // max_by_key keeps the last maximum; reverse so ties go to the lowest index
        .rev()
        .max_by_key(|&i| neighbours[i].len())
    {
        levels[hub] = Some(0);
        let mut queue = VecDeque::from([hub]);
        while let Some(node) = queue.pop_front() {
            let level = levels[node].unwrap_or(0);
            for &next in &neighbours[node] {
                if levels[next].is_none() {
                    levels[next] = Some(level + 1);
                    queue.push_back(next);
                }
            }
        }
    }

    levels.into_iter().map(|l| l.unwrap_or(0)).collect()
}

/// Longest-path levels along edge direction. Cycles are bounded by capping
/// levels at `node_count - 1`.
fn levels_directed(node_count: usize, edges: &[(usize, usize)], shake: ShakeTowards) -> Vec<usize> {
    let cap = node_count.saturating_sub(1);

    let longest = |forward: bool| {
        let mut depth = vec![0usize; node_count];
        for _ in 0..node_count {
            let mut changed = false;
            for &(a, b) in edges {
                if a == b {
                    continue;
                }
                let (from, to) = if forward { (a, b) } else { (b, a) };
                let candidate = (depth[from] + 1).min(cap);
                if candidate > depth[to] {
                    depth[to] = candidate;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        depth
    };

    match shake {
        ShakeTowards::Roots => longest(true),
        ShakeTowards::Leaves => {
            // Height above the sinks, flipped so sinks share the deepest level.
            let height = longest(false);
            let max = height.iter().copied().max().unwrap_or(0);
            height.into_iter().map(|h| max - h).collect()
        }
    }
}

/// Connected components in order of their lowest node index.
fn components(neighbours: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; neighbours.len()];
    let mut trees = Vec::new();

    for start in 0..neighbours.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut tree = vec![start];
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &next in &neighbours[node] {
                if !seen[next] {
                    seen[next] = true;
                    tree.push(next);
                    stack.push(next);
                }
            }
        }
        tree.sort_unstable();
        trees.push(tree);
    }

    trees
}

/// Rows of one tree indexed by level (re-based so the tree starts at 0).
fn order_levels(tree: &[usize], levels: &[usize], neighbours: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let base = tree.iter().map(|&n| levels[n]).min().unwrap_or(0);
    let depth = tree.iter().map(|&n| levels[n] - base).max().unwrap_or(0);

    let mut rows = vec![Vec::new(); depth + 1];
    for &node in tree {
        rows[levels[node] - base].push(node);
    }

    // Barycentre pass: place each node under the mean slot of its parents.
    let mut slot = vec![f32::NAN; levels.len()];
    for (i, &node) in rows[0].iter().enumerate() {
        slot[node] = i as f32;
    }
    for level in 1..rows.len() {
        let mut keyed: Vec<(f32, usize)> = rows[level]
            .iter()
            .map(|&node| {
                let parents: Vec<f32> = neighbours[node]
                    .iter()
                    .filter(|&&p| levels[p] + 1 == levels[node])
                    .map(|&p| slot[p])
                    .filter(|s| !s.is_nan())
                    .collect();
                let key = if parents.is_empty() {
                    f32::MAX
                } else {
                    parents.iter().sum::<f32>() / parents.len() as f32
                };
                (key, node)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        rows[level] = keyed.into_iter().map(|(_, node)| node).collect();
        for (i, &node) in rows[level].iter().enumerate() {
            slot[node] = i as f32;
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HierarchicalConfig {
        HierarchicalConfig::default()
    }

    #[test]
    fn hub_sits_on_top_level() {
        // 0 is the hub: 0-1, 0-2, 0-3, 3-4
        let edges = [(0, 1), (0, 2), (0, 3), (3, 4)];
        let positions = place(5, &edges, &config());

        assert_eq!(positions[0].y, 0.0);
        assert_eq!(positions[1].y, 150.0);
        assert_eq!(positions[2].y, 150.0);
        assert_eq!(positions[3].y, 150.0);
        assert_eq!(positions[4].y, 300.0);
    }

    #[test]
    fn same_level_nodes_are_spaced() {
        let edges = [(0, 1), (0, 2), (0, 3)];
        let positions = place(4, &edges, &config());
        let mut xs: Vec<f32> = positions[1..].iter().map(|p| p.x).collect();
        xs.sort_by(f32::total_cmp);
        assert_eq!(xs[1] - xs[0], 150.0);
        assert_eq!(xs[2] - xs[1], 150.0);
    }

    #[test]
    fn separate_trees_do_not_overlap() {
        let edges = [(0, 1), (2, 3)];
        let positions = place(4, &edges, &config());
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(positions[i], positions[j], "{i} and {j} collide");
            }
        }
        assert!(positions[2].x >= positions[0].x + 200.0);
    }

    #[test]
    fn directed_levels_follow_edges() {
        let config = HierarchicalConfig {
            sort_method: SortMethod::Directed,
            ..config()
        };
        // 0 -> 1 -> 2, 0 -> 2
        let positions = place(3, &[(0, 1), (1, 2), (0, 2)], &config);
        assert_eq!(positions[0].y, 0.0);
        assert_eq!(positions[1].y, 150.0);
        assert_eq!(positions[2].y, 300.0);
    }

    #[test]
    fn directed_shake_to_leaves_aligns_sinks() {
        let config = HierarchicalConfig {
            sort_method: SortMethod::Directed,
            shake_towards: ShakeTowards::Leaves,
            ..config()
        };
        // 0 -> 1 -> 2 and 3 -> 2: 3 sits just above the sink
        let positions = place(4, &[(0, 1), (1, 2), (3, 2)], &config);
        assert_eq!(positions[2].y, 300.0);
        assert_eq!(positions[3].y, 150.0);
    }

    #[test]
    fn directed_cycle_terminates() {
        let config = HierarchicalConfig {
            sort_method: SortMethod::Directed,
            ..config()
        };
        let positions = place(3, &[(0, 1), (1, 2), (2, 0)], &config);
        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|p| p.y <= 300.0));
    }

    #[test]
    fn direction_rotates_axes() {
        let config = HierarchicalConfig {
            direction: Direction::LeftRight,
            ..config()
        };
        let positions = place(2, &[(0, 1)], &config);
        assert_eq!(positions[0].x, 0.0);
        assert_eq!(positions[1].x, 150.0);
        assert_eq!(positions[0].y, positions[1].y);
    }

    #[test]
    fn empty_graph_places_nothing() {
        assert!(place(0, &[], &config()).is_empty());
    }
}
