//! Where flame graph data comes from.
//!
//! A `TreeProvider` answers `FlamegraphQuery`s with complete
//! `FlamegraphData` snapshots. The widget never mutates a snapshot; every
//! state change issues a new query through a `QueryTracker`, which drops
//! answers to superseded queries.

mod stacks;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    FlamegraphData, FlamegraphFilter, FlamegraphMetric, FlamegraphState, FlamegraphView, Snapshot,
};
use crate::parsers::CollapsedParseError;

pub use stacks::StackProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown metric: {0:?}")]
    UnknownMetric(String),
    #[error("collapsed: {0}")]
    Collapsed(#[from] CollapsedParseError),
    #[error("query failed: {0}")]
    Failed(String),
}

/// The data-shaping half of a `FlamegraphState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlamegraphQuery {
    pub metric: String,
    pub filters: Vec<FlamegraphFilter>,
    pub view: FlamegraphView,
}

impl From<&FlamegraphState> for FlamegraphQuery {
    fn from(state: &FlamegraphState) -> Self {
        Self {
            metric: state.selected_metric_name.clone(),
            filters: state.filters.clone(),
            view: state.view.clone(),
        }
    }
}

pub trait TreeProvider {
    /// Metric variants this provider can answer for, in display order.
    fn metrics(&self) -> Vec<FlamegraphMetric>;

    fn query(&self, query: &FlamegraphQuery) -> Result<FlamegraphData, ProviderError>;
}

/// Identity of one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryTicket(u64);

impl QueryTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Serializes asynchronous query results: only the answer to the most
/// recently issued ticket becomes a snapshot.
#[derive(Debug, Default)]
pub struct QueryTracker {
    issued: u64,
    outstanding: Option<QueryTicket>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, query: &FlamegraphQuery) -> QueryTicket {
        self.issued += 1;
        let ticket = QueryTicket(self.issued);
        self.outstanding = Some(ticket);
        tracing::debug!(
            ticket = ticket.0,
            metric = %query.metric,
            filters = query.filters.len(),
            "query issued"
        );
        ticket
    }

    /// Turn a provider answer into a snapshot, or drop it.
    ///
    /// Answers to any ticket but the outstanding one are stale. Failures are
    /// logged and leave the tracker with nothing outstanding; the widget stays
    /// pending until the next state change.
    pub fn accept(
        &mut self,
        ticket: QueryTicket,
        result: Result<FlamegraphData, ProviderError>,
    ) -> Option<Snapshot> {
        if self.outstanding != Some(ticket) {
            tracing::warn!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale query result"
            );
            return None;
        }
        self.outstanding = None;
        match result {
            Ok(data) => {
                tracing::debug!(ticket = ticket.0, nodes = data.nodes.len(), "query accepted");
                Some(Snapshot::new(ticket.0, data))
            }
            Err(err) => {
                tracing::warn!(ticket = ticket.0, error = %err, "flamegraph query failed");
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }
}
