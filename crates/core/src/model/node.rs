use ember_protocol::SharedStr;
use serde::{Deserialize, Serialize};

/// Stable node identity assigned by the tree provider.
pub type NodeId = i64;

/// One node of the weighted tree, as delivered by a tree provider.
///
/// Nodes arrive as a flat list with parent references rather than as an
/// owned tree: layout walks them once, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlamegraphNode {
    pub id: NodeId,
    /// Identity of the parent node (not an index into the node list).
    pub parent_id: NodeId,
    /// Never 0: the root is synthetic. Positive depths are descendants of
    /// the root, negative depths are ancestors.
    pub depth: i32,
    pub name: SharedStr,
    pub self_value: f64,
    /// Not guaranteed to equal self plus children: filters may drop children.
    pub cumulative_value: f64,
    #[serde(default)]
    pub parent_cumulative_value: Option<f64>,
    /// Extent in query space; `x_end - x_start == cumulative_value`.
    pub x_start: f64,
    pub x_end: f64,
    /// Extra display attributes, in display order.
    #[serde(default)]
    pub properties: Vec<(String, String)>,
}
