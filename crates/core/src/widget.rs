use ember_protocol::ValueUnit;

use crate::cache::RenderCache;
use crate::canvas::{self, CanvasFrame, Viewport};
use crate::config::FlamegraphConfig;
use crate::interaction::{DataIdentity, SessionContext, SessionEvent, Tooltip, TooltipState, WidgetSession};
use crate::layout::RenderNode;
use crate::model::{FlamegraphData, FlamegraphMetric, FlamegraphState, FlamegraphView, Snapshot};
use crate::provider::{FlamegraphQuery, ProviderError, QueryTicket, QueryTracker, TreeProvider};
use crate::tooltip::{TooltipContent, tooltip_content};

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetOutput {
    /// The user changed metric, filters or view. The host persists the new
    /// state; the widget re-queries on the next `refresh`.
    StateChanged(FlamegraphState),
}

/// One flame graph instance: state, session, current snapshot and layout
/// cache. Driven from a single frame loop.
#[derive(Debug)]
pub struct FlamegraphWidget {
    config: FlamegraphConfig,
    metrics: Vec<FlamegraphMetric>,
    state: FlamegraphState,
    session: WidgetSession,
    snapshot: Option<Snapshot>,
    cache: RenderCache,
    tracker: QueryTracker,
    width: f64,
    stale: bool,
}

impl FlamegraphWidget {
    pub fn new(config: FlamegraphConfig, metrics: Vec<FlamegraphMetric>) -> Self {
        Self {
            config,
            state: FlamegraphState::default_for(&metrics),
            metrics,
            session: WidgetSession::default(),
            snapshot: None,
            cache: RenderCache::new(),
            tracker: QueryTracker::new(),
            width: 0.0,
            stale: true,
        }
    }

    /// Restore a persisted state; it falls back to the default if its metric
    /// is not offered.
    pub fn with_state(mut self, state: FlamegraphState) -> Self {
        self.state = state.reconciled(&self.metrics);
        self.stale = true;
        self
    }

    pub fn state(&self) -> &FlamegraphState {
        &self.state
    }

    pub fn session(&self) -> &WidgetSession {
        &self.session
    }

    pub fn metrics(&self) -> &[FlamegraphMetric] {
        &self.metrics
    }

    pub fn config(&self) -> &FlamegraphConfig {
        &self.config
    }

    pub fn data(&self) -> Option<&FlamegraphData> {
        self.snapshot.as_ref().map(|s| s.data.as_ref())
    }

    pub fn unit(&self) -> ValueUnit {
        self.state
            .selected_metric(&self.metrics)
            .map(|m| m.unit)
            .unwrap_or_default()
    }

    /// Layout passes run so far.
    pub fn layout_passes(&self) -> u64 {
        self.cache.passes()
    }

    /// Whether the state changed since the last issued query.
    pub fn needs_query(&self) -> bool {
        self.stale
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    pub fn set_metrics(&mut self, metrics: Vec<FlamegraphMetric>) {
        self.metrics = metrics;
        let reconciled = self.state.clone().reconciled(&self.metrics);
        if reconciled != self.state {
            self.state = reconciled;
            self.stale = true;
        }
    }

    pub fn set_config(&mut self, config: FlamegraphConfig) {
        self.config = config;
    }

    // Data.

    /// Start a query for the current state. Drops the current snapshot so
    /// the canvas shows the loading placeholder.
    pub fn begin_query(&mut self) -> (QueryTicket, FlamegraphQuery) {
        let query = FlamegraphQuery::from(&self.state);
        let ticket = self.tracker.issue(&query);
        self.stale = false;
        self.snapshot = None;
        self.handle(SessionEvent::DataChanged(None));
        (ticket, query)
    }

    /// Deliver a provider answer. Returns whether it became the displayed
    /// snapshot.
    pub fn finish_query(
        &mut self,
        ticket: QueryTicket,
        result: Result<FlamegraphData, ProviderError>,
    ) -> bool {
        let Some(snapshot) = self.tracker.accept(ticket, result) else {
            return false;
        };
        let identity = DataIdentity {
            generation: snapshot.generation,
            root: snapshot.data.root_region(),
        };
        self.snapshot = Some(snapshot);
        self.handle(SessionEvent::DataChanged(Some(identity)));
        true
    }

    /// Query `provider` synchronously if the state changed.
    pub fn refresh(&mut self, provider: &dyn TreeProvider) {
        if !self.stale {
            return;
        }
        let (ticket, query) = self.begin_query();
        let result = provider.query(&query);
        self.finish_query(ticket, result);
    }

    // State changes.

    pub fn select_metric(&mut self, name: &str) -> Option<WidgetOutput> {
        if self.state.selected_metric_name == name {
            return None;
        }
        Some(self.set_state(self.state.with_metric(name)))
    }

    pub fn select_view(&mut self, view: FlamegraphView) -> Option<WidgetOutput> {
        if self.state.view == view {
            return None;
        }
        Some(self.set_state(self.state.with_view(view)))
    }

    /// Parse and append filter text. Blank text changes nothing.
    pub fn add_filter_text(&mut self, text: &str) -> Option<WidgetOutput> {
        let state = self.state.with_filter_text(text)?;
        Some(self.set_state(state))
    }

    pub fn remove_tag(&mut self, index: usize) -> Option<WidgetOutput> {
        let state = self.state.without_tag(index)?;
        Some(self.set_state(state))
    }

    fn set_state(&mut self, state: FlamegraphState) -> WidgetOutput {
        tracing::debug!(?state, "state changed");
        self.state = state;
        self.stale = true;
        WidgetOutput::StateChanged(self.state.clone())
    }

    // Interaction.

    pub fn handle(&mut self, event: SessionEvent) -> Option<WidgetOutput> {
        let nodes: &[RenderNode] = match &self.snapshot {
            Some(snapshot) => self.cache.render_nodes(snapshot, &self.session.zoom, self.width, &self.config),
            None => &[],
        };
        let transition = self.session.reduce(
            &event,
            &SessionContext {
                nodes,
                data: self.snapshot.as_ref().map(|s| s.data.as_ref()),
                state: &self.state,
                node_height: self.config.node_height,
            },
        );
        self.session = transition.session;
        transition.state_change.map(|state| self.set_state(state))
    }

    pub fn reset_zoom(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.session.zoom = snapshot.data.root_region();
        }
    }

    /// Render nodes for the current zoom at the last painted width.
    pub fn render_nodes(&mut self) -> &[RenderNode] {
        match &self.snapshot {
            Some(snapshot) => self.cache.render_nodes(snapshot, &self.session.zoom, self.width, &self.config),
            None => &[],
        }
    }

    /// Paint one frame and end it.
    pub fn paint(&mut self, viewport: &Viewport) -> CanvasFrame {
        self.width = viewport.width;
        let unit = self.unit();
        let frame = match &self.snapshot {
            Some(snapshot) => {
                let nodes = self.cache.render_nodes(snapshot, &self.session.zoom, self.width, &self.config);
                canvas::paint(nodes, &snapshot.data, &self.session, viewport, &self.config, unit)
            }
            None => canvas::paint_loading(viewport, &self.config),
        };
        self.handle(SessionEvent::FrameEnded);
        frame
    }

    /// The open tooltip and its text. Unpinned-this-frame tooltips are
    /// not shown.
    pub fn tooltip(&self) -> Option<(Tooltip, TooltipContent)> {
        let tooltip = self.session.tooltip.filter(|t| t.state != TooltipState::Declick)?;
        let data = self.data()?;
        Some((tooltip, tooltip_content(&tooltip.node, data, self.unit())))
    }
}
