use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::node::FlamegraphNode;
use super::zoom::ZoomRegion;

/// One immutable result of a tree-provider query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlamegraphData {
    pub nodes: Vec<FlamegraphNode>,
    /// Width of the root's children actually shown.
    pub all_roots_cumulative_value: f64,
    /// Total mass before the show/hide stack filters.
    pub unfiltered_cumulative_value: f64,
    pub min_depth: i32,
    pub max_depth: i32,
}

impl FlamegraphData {
    /// Assemble a snapshot, deriving the depth bounds from the nodes.
    pub fn new(
        nodes: Vec<FlamegraphNode>,
        all_roots_cumulative_value: f64,
        unfiltered_cumulative_value: f64,
    ) -> Self {
        let min_depth = nodes.iter().map(|n| n.depth).min().unwrap_or(0).min(0);
        let max_depth = nodes.iter().map(|n| n.depth).max().unwrap_or(0).max(0);
        Self {
            nodes,
            all_roots_cumulative_value,
            unfiltered_cumulative_value,
            min_depth,
            max_depth,
        }
    }

    /// Zoom region covering every root.
    pub fn root_region(&self) -> ZoomRegion {
        ZoomRegion::root(self.all_roots_cumulative_value)
    }

    /// Pixel height of every depth row plus the root row.
    pub fn content_height(&self, node_height: f64) -> f64 {
        f64::from(self.max_depth - self.min_depth + 1) * node_height
    }

    pub fn node(&self, index: usize) -> Option<&FlamegraphNode> {
        self.nodes.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A delivered data snapshot together with its identity.
///
/// `generation` is what "data identity changed" compares: two snapshots with
/// the same generation are the same delivery.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub data: Arc<FlamegraphData>,
}

impl Snapshot {
    pub fn new(generation: u64, data: FlamegraphData) -> Self {
        Self {
            generation,
            data: Arc::new(data),
        }
    }
}
