//! Hover / click / zoom lifecycle of one flame graph widget.
//!
//! `WidgetSession` is an immutable value. Every input is a `SessionEvent`
//! reduced against the current render nodes into a new session, plus an
//! optional replacement `FlamegraphState` for the caller to persist and
//! re-query with.

use ember_protocol::Point;
use serde::{Deserialize, Serialize};

use crate::layout::{RenderNode, RenderSource, hit_test};
use crate::model::{FlamegraphData, FlamegraphFilter, FlamegraphState, FlamegraphView, ZoomRegion};
use crate::tooltip::{TooltipAction, exact_match_pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipState {
    /// Follows the pointer.
    Hover,
    /// Pinned by a click; ignores pointer movement.
    Click,
    /// Unpinned by a second click; gone after the current frame.
    Declick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip {
    /// Pointer position that opened the tooltip.
    pub anchor: Point,
    pub node: RenderNode,
    pub state: TooltipState,
}

impl Tooltip {
    pub fn is_pinned(&self) -> bool {
        self.state == TooltipState::Click
    }
}

/// Identity of the data currently shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataIdentity {
    pub generation: u64,
    pub root: ZoomRegion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    PointerMoved(Point),
    PointerLeft,
    Clicked(Point),
    DoubleClicked(Point),
    Action(TooltipAction),
    /// `None` while a query is in flight.
    DataChanged(Option<DataIdentity>),
    FrameEnded,
}

/// What a reduction can look at besides the session itself.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    /// Layout of the current data under the session's zoom.
    pub nodes: &'a [RenderNode],
    pub data: Option<&'a FlamegraphData>,
    pub state: &'a FlamegraphState,
    pub node_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: WidgetSession,
    pub state_change: Option<FlamegraphState>,
}

impl Transition {
    fn to(session: WidgetSession) -> Self {
        Self {
            session,
            state_change: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSession {
    pub zoom: ZoomRegion,
    pub tooltip: Option<Tooltip>,
    /// Last pointer position in canvas content coordinates.
    pub pointer: Option<Point>,
    pub generation: Option<u64>,
}

impl Default for WidgetSession {
    fn default() -> Self {
        Self {
            zoom: ZoomRegion::root(0.0),
            tooltip: None,
            pointer: None,
            generation: None,
        }
    }
}

impl WidgetSession {
    pub fn reduce(&self, event: &SessionEvent, ctx: &SessionContext<'_>) -> Transition {
        let mut next = self.clone();
        match *event {
            SessionEvent::PointerMoved(p) => {
                next.pointer = Some(p);
                if self.tooltip.is_some_and(|t| t.is_pinned()) {
                    return Transition::to(next);
                }
                next.tooltip = hit_test(ctx.nodes, p, ctx.node_height).map(|i| Tooltip {
                    anchor: p,
                    node: ctx.nodes[i],
                    state: TooltipState::Hover,
                });
            }
            SessionEvent::PointerLeft => {
                next.pointer = None;
                if self.tooltip.is_some_and(|t| !t.is_pinned()) {
                    next.tooltip = None;
                }
            }
            SessionEvent::Clicked(p) => {
                next.tooltip = hit_test(ctx.nodes, p, ctx.node_height).map(|i| {
                    let node = ctx.nodes[i];
                    match self.tooltip {
                        Some(t) if t.is_pinned() && t.node.same_target(&node) => Tooltip {
                            state: TooltipState::Declick,
                            ..t
                        },
                        _ => Tooltip {
                            anchor: p,
                            node,
                            state: TooltipState::Click,
                        },
                    }
                });
            }
            SessionEvent::DoubleClicked(p) => {
                if let Some(region) = hit_test(ctx.nodes, p, ctx.node_height)
                    .and_then(|i| ctx.nodes[i].zoom_region())
                {
                    tracing::debug!(?region, "zoom");
                    next.zoom = region;
                }
            }
            SessionEvent::Action(action) => return self.apply_action(action, ctx),
            SessionEvent::DataChanged(identity) => match identity {
                Some(id) if self.generation != Some(id.generation) => {
                    tracing::debug!(generation = id.generation, "new data, zoom reset");
                    next.generation = Some(id.generation);
                    next.zoom = id.root;
                    next.tooltip = None;
                }
                Some(_) => {}
                None => {
                    next.generation = None;
                    next.tooltip = None;
                }
            },
            SessionEvent::FrameEnded => {
                if self.tooltip.is_some_and(|t| t.state == TooltipState::Declick) {
                    next.tooltip = None;
                }
            }
        }
        Transition::to(next)
    }

    fn apply_action(&self, action: TooltipAction, ctx: &SessionContext<'_>) -> Transition {
        let mut next = self.clone();
        let Some(tooltip) = self.tooltip else {
            return Transition::to(next);
        };

        if action == TooltipAction::Zoom {
            if let Some(region) = tooltip.node.zoom_region() {
                tracing::debug!(?region, "zoom from tooltip");
                next.zoom = region;
            }
            return Transition::to(next);
        }

        let RenderSource::Node { index } = tooltip.node.source else {
            return Transition::to(next);
        };
        let Some(node) = ctx.data.and_then(|d| d.node(index)) else {
            return Transition::to(next);
        };

        let pattern = exact_match_pattern(&node.name);
        let state = match action.filter_kind() {
            Some(kind) => ctx.state.with_filter(FlamegraphFilter::new(kind, pattern)),
            None => ctx.state.with_view(FlamegraphView::Pivot { pivot: pattern }),
        };
        next.tooltip = None;
        Transition {
            session: next,
            state_change: Some(state),
        }
    }

    /// Index of the render node under the pointer, if any.
    pub fn hovered(&self, nodes: &[RenderNode], node_height: f64) -> Option<usize> {
        self.pointer.and_then(|p| hit_test(nodes, p, node_height))
    }

    /// The node whose tooltip is pinned, if any.
    pub fn pinned(&self) -> Option<&RenderNode> {
        self.tooltip.as_ref().filter(|t| t.is_pinned()).map(|t| &t.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlamegraphConfig;
    use crate::layout::compute_render_nodes;
    use crate::model::{FilterKind, FlamegraphNode, ZoomAxis};

    fn node(id: i64, parent_id: i64, depth: i32, name: &str, x_start: f64, x_end: f64) -> FlamegraphNode {
        FlamegraphNode {
            id,
            parent_id,
            depth,
            name: name.into(),
            self_value: 0.0,
            cumulative_value: x_end - x_start,
            parent_cumulative_value: None,
            x_start,
            x_end,
            properties: Vec::new(),
        }
    }

    struct Fixture {
        data: FlamegraphData,
        state: FlamegraphState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                data: FlamegraphData::new(
                    vec![
                        node(1, 0, 1, "main", 0.0, 8.0),
                        node(2, 1, 2, "parse", 0.0, 5.0),
                        node(3, 1, 2, "malloc", 5.0, 8.0),
                        node(4, 0, 1, "idle", 8.0, 10.0),
                        node(5, 0, 1, "tiny", 10.0, 10.0001),
                    ],
                    10.0001,
                    10.0001,
                ),
                state: FlamegraphState::default(),
            }
        }

        fn nodes(&self, session: &WidgetSession) -> Vec<RenderNode> {
            compute_render_nodes(&self.data, &session.zoom, 100.0, &FlamegraphConfig::default())
        }

        fn apply(&self, session: &WidgetSession, event: SessionEvent) -> Transition {
            let nodes = self.nodes(session);
            session.reduce(
                &event,
                &SessionContext {
                    nodes: &nodes,
                    data: Some(&self.data),
                    state: &self.state,
                    node_height: 20.0,
                },
            )
        }

        fn loaded(&self) -> WidgetSession {
            self.apply(
                &WidgetSession::default(),
                SessionEvent::DataChanged(Some(DataIdentity {
                    generation: 1,
                    root: self.data.root_region(),
                })),
            )
            .session
        }
    }

    // Depth-2 row is y in [40, 60); malloc covers x in [~50, ~80).
    const ON_MALLOC: Point = Point { x: 60.0, y: 45.0 };
    const ON_PARSE: Point = Point { x: 10.0, y: 45.0 };
    const NOWHERE: Point = Point { x: 95.0, y: 45.0 };

    #[test]
    fn hover_follows_pointer() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::PointerMoved(ON_MALLOC)).session;
        let t = s.tooltip.unwrap_or_else(|| unreachable!());
        assert_eq!(t.state, TooltipState::Hover);
        assert_eq!(t.node.source, RenderSource::Node { index: 2 });

        let s = f.apply(&s, SessionEvent::PointerMoved(ON_PARSE)).session;
        assert_eq!(
            s.tooltip.map(|t| t.node.source),
            Some(RenderSource::Node { index: 1 })
        );

        let s = f.apply(&s, SessionEvent::PointerMoved(NOWHERE)).session;
        assert!(s.tooltip.is_none());
    }

    #[test]
    fn click_pins_and_second_click_declicks() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::Clicked(ON_MALLOC)).session;
        assert_eq!(s.tooltip.map(|t| t.state), Some(TooltipState::Click));

        // Pinned tooltips ignore movement and leaving.
        let s = f.apply(&s, SessionEvent::PointerMoved(ON_PARSE)).session;
        let s = f.apply(&s, SessionEvent::PointerLeft).session;
        assert_eq!(
            s.tooltip.map(|t| (t.state, t.node.source)),
            Some((TooltipState::Click, RenderSource::Node { index: 2 }))
        );

        let s = f.apply(&s, SessionEvent::Clicked(ON_MALLOC)).session;
        assert_eq!(s.tooltip.map(|t| t.state), Some(TooltipState::Declick));

        let s = f.apply(&s, SessionEvent::FrameEnded).session;
        assert!(s.tooltip.is_none());
    }

    #[test]
    fn click_elsewhere_moves_pin_and_empty_space_clears() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::Clicked(ON_MALLOC)).session;
        let s = f.apply(&s, SessionEvent::Clicked(ON_PARSE)).session;
        assert_eq!(
            s.tooltip.map(|t| (t.state, t.node.source)),
            Some((TooltipState::Click, RenderSource::Node { index: 1 }))
        );
        let s = f.apply(&s, SessionEvent::Clicked(NOWHERE)).session;
        assert!(s.tooltip.is_none());
    }

    #[test]
    fn leaving_clears_hover() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::PointerMoved(ON_MALLOC)).session;
        let s = f.apply(&s, SessionEvent::PointerLeft).session;
        assert!(s.tooltip.is_none());
        assert!(s.pointer.is_none());
    }

    #[test]
    fn double_click_zooms_into_node() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::DoubleClicked(ON_MALLOC)).session;
        assert_eq!(
            s.zoom,
            ZoomRegion {
                query_x_start: 5.0,
                query_x_end: 8.0,
                axis: ZoomAxis::BelowRoot,
            }
        );
        let nodes = f.nodes(&s);
        let malloc = nodes
            .iter()
            .find(|n| n.source == RenderSource::Node { index: 2 })
            .map(|n| n.state);
        assert_eq!(malloc, Some(crate::layout::RenderState::Selected));

        // Root double-click resets.
        let s = f.apply(&s, SessionEvent::DoubleClicked(Point::new(1.0, 1.0))).session;
        assert_eq!(s.zoom, f.data.root_region());
    }

    #[test]
    fn double_click_on_merged_does_nothing() {
        let f = Fixture::new();
        let loaded = f.loaded();
        let nodes = f.nodes(&loaded);
        let merged = nodes
            .iter()
            .find(|n| n.source == RenderSource::Merged)
            .copied()
            .unwrap_or_else(|| unreachable!());
        let inside = Point::new(merged.x + 1.0, merged.y + 1.0);
        let s = f.apply(&loaded, SessionEvent::DoubleClicked(inside)).session;
        assert_eq!(s.zoom, loaded.zoom);
    }

    #[test]
    fn new_generation_resets_zoom_and_tooltip() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::DoubleClicked(ON_MALLOC)).session;
        let s = f.apply(&s, SessionEvent::Clicked(ON_PARSE)).session;

        let same = f.apply(
            &s,
            SessionEvent::DataChanged(Some(DataIdentity {
                generation: 1,
                root: f.data.root_region(),
            })),
        );
        assert_eq!(same.session, s);

        let fresh = f
            .apply(
                &s,
                SessionEvent::DataChanged(Some(DataIdentity {
                    generation: 2,
                    root: ZoomRegion::root(42.0),
                })),
            )
            .session;
        assert_eq!(fresh.zoom, ZoomRegion::root(42.0));
        assert!(fresh.tooltip.is_none());
    }

    #[test]
    fn filter_action_emits_state_and_closes_tooltip() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::Clicked(ON_MALLOC)).session;
        let t = f.apply(&s, SessionEvent::Action(TooltipAction::HideFrame));
        assert!(t.session.tooltip.is_none());
        assert_eq!(
            t.state_change.map(|s| s.filters),
            Some(vec![FlamegraphFilter::new(FilterKind::HideFrame, "^malloc$")])
        );
    }

    #[test]
    fn pivot_action_replaces_view() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::Clicked(ON_PARSE)).session;
        let t = f.apply(&s, SessionEvent::Action(TooltipAction::Pivot));
        assert_eq!(
            t.state_change.map(|s| s.view),
            Some(FlamegraphView::Pivot {
                pivot: "^parse$".into()
            })
        );
    }

    #[test]
    fn zoom_action_matches_double_click() {
        let f = Fixture::new();
        let s = f.apply(&f.loaded(), SessionEvent::Clicked(ON_MALLOC)).session;
        let via_action = f.apply(&s, SessionEvent::Action(TooltipAction::Zoom)).session;
        let via_dblclick = f.apply(&s, SessionEvent::DoubleClicked(ON_MALLOC)).session;
        assert_eq!(via_action.zoom, via_dblclick.zoom);
        assert!(via_action.tooltip.is_some());
    }

    #[test]
    fn actions_without_tooltip_are_ignored() {
        let f = Fixture::new();
        let loaded = f.loaded();
        let t = f.apply(&loaded, SessionEvent::Action(TooltipAction::HideStack));
        assert_eq!(t.session, loaded);
        assert!(t.state_change.is_none());
    }
}
