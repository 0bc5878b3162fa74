use std::collections::HashMap;

use ember_protocol::Point;
use serde::{Deserialize, Serialize};

use crate::config::FlamegraphConfig;
use crate::model::{FlamegraphData, NodeId, ZoomAxis, ZoomRegion};

/// What a render node was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderSource {
    /// The synthetic root spanning the viewport.
    Root,
    /// A tree node; `index` points into `FlamegraphData::nodes`.
    Node { index: usize },
    /// Several sibling nodes too narrow to draw individually.
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderState {
    Normal,
    /// Extends past the zoom window; drawn greyed.
    Partial,
    /// Exactly the zoom window.
    Selected,
}

/// Query-space interval a render node covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExtent {
    pub query_x_start: f64,
    pub query_x_end: f64,
    #[serde(rename = "type")]
    pub axis: ZoomAxis,
}

/// A pixel-space rectangle ready for painting and hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub source: RenderSource,
    pub state: RenderState,
    pub extent: QueryExtent,
}

impl RenderNode {
    pub fn contains(&self, p: Point, node_height: f64) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + node_height
    }

    /// Zoom region a double-click on this node selects. Merged groups are
    /// not zoomable.
    pub fn zoom_region(&self) -> Option<ZoomRegion> {
        match self.source {
            RenderSource::Merged => None,
            RenderSource::Root | RenderSource::Node { .. } => Some(ZoomRegion {
                query_x_start: self.extent.query_x_start,
                query_x_end: self.extent.query_x_end,
                axis: self.extent.axis,
            }),
        }
    }

    /// Same logical node, ignoring geometry (survives relayout).
    pub fn same_target(&self, other: &RenderNode) -> bool {
        self.source == other.source && self.extent == other.extent
    }
}

/// First render node under `p`, in list order.
pub fn hit_test(nodes: &[RenderNode], p: Point, node_height: f64) -> Option<usize> {
    nodes.iter().position(|n| n.contains(p, node_height))
}

/// Lay out `data` into pixel rectangles for a viewport `width` pixels wide.
///
/// Single pass over the node list. Nodes narrower than
/// `config.min_pixel_displayed` are folded into one merged rectangle per
/// `(parent_id, depth)`, which bounds the output size independently of
/// tree size. Pure: identical inputs give identical output.
///
/// # Panics
///
/// If any node has depth 0; the root is synthetic and never in the list.
pub fn compute_render_nodes(
    data: &FlamegraphData,
    zoom: &ZoomRegion,
    width: f64,
    config: &FlamegraphConfig,
) -> Vec<RenderNode> {
    let all_roots = data.all_roots_cumulative_value;
    let node_height = config.node_height;
    let min_px = config.min_pixel_displayed;

    let mut out = Vec::with_capacity(data.nodes.len().min(4096) + 1);
    out.push(RenderNode {
        x: 0.0,
        y: f64::from(-data.min_depth) * node_height,
        width,
        source: RenderSource::Root,
        state: if zoom.query_x_start == 0.0 && zoom.query_x_end == all_roots {
            RenderState::Normal
        } else {
            RenderState::Partial
        },
        extent: QueryExtent {
            query_x_start: 0.0,
            query_x_end: all_roots,
            axis: ZoomAxis::Root,
        },
    });

    if width <= 0.0 || all_roots <= 0.0 {
        return out;
    }

    let global_per_px = all_roots / width;
    let zoom_width = zoom.width();
    let zoom_per_px = zoom_width / width;

    // (parent_id, depth) -> index of the merged rect collecting that parent's
    // narrow children at that depth.
    let mut open_groups: HashMap<(NodeId, i32), usize> = HashMap::new();
    // (id, child depth) -> x of the merged rect that absorbed `id`, so the
    // children of a merged node start their own group at the same x.
    let mut merged_x: HashMap<(NodeId, i32), f64> = HashMap::new();

    for (index, node) in data.nodes.iter().enumerate() {
        assert_ne!(
            node.depth, 0,
            "flamegraph node {} has depth 0; the root is synthetic",
            node.id
        );

        let on_axis = zoom.matches_depth(node.depth);
        let window = if on_axis {
            if zoom_width <= 0.0
                || node.x_end <= zoom.query_x_start
                || node.x_start >= zoom.query_x_end
            {
                continue;
            }
            Window {
                start: zoom.query_x_start,
                end: zoom.query_x_end,
                per_px: zoom_per_px,
            }
        } else {
            Window {
                start: 0.0,
                end: f64::INFINITY,
                per_px: global_per_px,
            }
        };

        let x = window.px(node.x_start);
        let y = f64::from(node.depth - data.min_depth) * node_height;
        let w = window.span_px(node.x_start, node.x_end);
        let state = node_state(node.x_start, node.x_end, zoom, on_axis);
        let axis = ZoomAxis::for_depth(node.depth);
        let child_depth = if node.depth > 0 {
            node.depth + 1
        } else {
            node.depth - 1
        };

        if w >= min_px {
            out.push(RenderNode {
                x,
                y,
                width: w,
                source: RenderSource::Node { index },
                state,
                extent: QueryExtent {
                    query_x_start: node.x_start,
                    query_x_end: node.x_end,
                    axis,
                },
            });
            continue;
        }

        let group_key = (node.parent_id, node.depth);
        if let Some(&group_idx) = open_groups.get(&group_key) {
            let group = &mut out[group_idx];
            group.extent.query_x_end = node.x_end;
            group.width = window
                .span_px(group.extent.query_x_start, node.x_end)
                .max(min_px);
            merged_x.insert((node.id, child_depth), group.x);
            continue;
        }

        let group_x = merged_x.get(&group_key).copied().unwrap_or(x);
        out.push(RenderNode {
            x: group_x,
            y,
            width: w.max(min_px),
            source: RenderSource::Merged,
            state,
            extent: QueryExtent {
                query_x_start: node.x_start,
                query_x_end: node.x_end,
                axis,
            },
        });
        open_groups.insert(group_key, out.len() - 1);
        merged_x.insert((node.id, child_depth), group_x);
    }

    tracing::debug!(
        nodes = data.nodes.len(),
        rects = out.len(),
        merged = open_groups.len(),
        width,
        "layout pass"
    );
    out
}

/// Query-space window mapped onto the viewport for one axis.
struct Window {
    start: f64,
    end: f64,
    per_px: f64,
}

impl Window {
    fn px(&self, query_x: f64) -> f64 {
        (query_x - self.start).max(0.0) / self.per_px
    }

    /// Pixel width of `[start, end)` clipped to the window.
    fn span_px(&self, start: f64, end: f64) -> f64 {
        let visible = end.min(self.end) - start.max(self.start);
        visible.max(0.0) / self.per_px
    }
}

fn node_state(x_start: f64, x_end: f64, zoom: &ZoomRegion, on_axis: bool) -> RenderState {
    if !on_axis {
        RenderState::Normal
    } else if x_start == zoom.query_x_start && x_end == zoom.query_x_end {
        RenderState::Selected
    } else if x_start < zoom.query_x_start || x_end > zoom.query_x_end {
        RenderState::Partial
    } else {
        RenderState::Normal
    }
}
