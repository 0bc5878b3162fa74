use serde::{Deserialize, Serialize};

/// Which side of the synthetic root a zoom applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoomAxis {
    /// Unzoomed: the whole root span on both sides.
    Root,
    /// Negative depths (ancestors, e.g. callers of a pivot).
    AboveRoot,
    /// Positive depths (descendants).
    BelowRoot,
}

impl ZoomAxis {
    /// Axis a node at `depth` lives on.
    pub fn for_depth(depth: i32) -> Self {
        if depth > 0 {
            ZoomAxis::BelowRoot
        } else {
            ZoomAxis::AboveRoot
        }
    }
}

/// The sub-interval of query space currently stretched over the full
/// viewport width. Transient widget state, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomRegion {
    pub query_x_start: f64,
    pub query_x_end: f64,
    #[serde(rename = "type")]
    pub axis: ZoomAxis,
}

impl ZoomRegion {
    /// The unzoomed region covering every root.
    pub fn root(all_roots_cumulative_value: f64) -> Self {
        Self {
            query_x_start: 0.0,
            query_x_end: all_roots_cumulative_value,
            axis: ZoomAxis::Root,
        }
    }

    pub fn width(&self) -> f64 {
        self.query_x_end - self.query_x_start
    }

    /// Whether nodes at `depth` are rescaled by this zoom. The root region
    /// rescales nothing: its scale is the global one.
    pub fn matches_depth(&self, depth: i32) -> bool {
        match self.axis {
            ZoomAxis::Root => false,
            ZoomAxis::BelowRoot => depth > 0,
            ZoomAxis::AboveRoot => depth < 0,
        }
    }
}
