pub mod data;
pub mod node;
pub mod state;
pub mod zoom;

pub use data::{FlamegraphData, Snapshot};
pub use node::{FlamegraphNode, NodeId};
pub use state::{
    FilterKind, FlamegraphFilter, FlamegraphMetric, FlamegraphState, FlamegraphView, StateError,
};
pub use zoom::{ZoomAxis, ZoomRegion};
