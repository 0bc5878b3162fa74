//! Turns render nodes into `RenderCommand`s for one frame.
//!
//! Commands are in content coordinates: `y = 0` is the top of the tallest
//! row, regardless of scrolling. Rows outside the visible band are culled
//! and the band is installed as the clip rectangle.

use ember_protocol::{
    Color, CursorIcon, Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken, ValueUnit,
    format_percentage,
};

use crate::color::{MERGED_NAME, node_color};
use crate::config::FlamegraphConfig;
use crate::interaction::WidgetSession;
use crate::layout::{RenderNode, RenderSource, RenderState};
use crate::model::FlamegraphData;

pub const LOADING_TEXT: &str = "Loading…";

/// The visible window onto the canvas content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Content y shown at the top edge.
    pub scroll_top: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_top: 0.0,
        }
    }

    pub fn scrolled_to(self, scroll_top: f64) -> Self {
        Self { scroll_top, ..self }
    }

    fn shows_row(&self, y: f64, node_height: f64) -> bool {
        y + node_height > self.scroll_top && y < self.scroll_top + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasFrame {
    pub commands: Vec<RenderCommand>,
    pub cursor: CursorIcon,
    /// Render node under the pointer.
    pub hovered: Option<usize>,
    /// Height of the whole flame graph, for scroll extents.
    pub content_height: f64,
}

/// Placeholder frame while a query is in flight.
pub fn paint_loading(viewport: &Viewport, config: &FlamegraphConfig) -> CanvasFrame {
    CanvasFrame {
        commands: vec![RenderCommand::DrawText {
            position: Point::new(viewport.width / 2.0, viewport.scroll_top + config.node_height),
            text: LOADING_TEXT.into(),
            color: ThemeToken::TextMuted,
            font_size: config.font_size,
            align: TextAlign::Center,
        }],
        cursor: CursorIcon::Default,
        hovered: None,
        content_height: config.node_height,
    }
}

pub fn paint(
    nodes: &[RenderNode],
    data: &FlamegraphData,
    session: &WidgetSession,
    viewport: &Viewport,
    config: &FlamegraphConfig,
    unit: ValueUnit,
) -> CanvasFrame {
    let h = config.node_height;
    let hovered = session.hovered(nodes, h);
    let pinned = session.pinned();
    let root_label = root_label(data, unit);

    let mut commands = Vec::with_capacity(nodes.len() * 2 + 4);
    commands.push(RenderCommand::BeginGroup {
        id: "flamegraph".into(),
        label: None,
    });
    commands.push(RenderCommand::SetClip {
        rect: Rect::new(0.0, viewport.scroll_top, viewport.width, viewport.height),
    });

    for (i, node) in nodes.iter().enumerate() {
        if !viewport.shows_row(node.y, h) {
            continue;
        }

        let name = match node.source {
            RenderSource::Root => SharedStr::from("root"),
            RenderSource::Merged => SharedStr::from(MERGED_NAME),
            RenderSource::Node { index } => data
                .node(index)
                .map_or_else(|| SharedStr::from("unknown"), |n| n.name.clone()),
        };
        let fill: Color = node_color(&name, node.state == RenderState::Partial, hovered == Some(i));
        let outlined = pinned.is_some_and(|p| p.same_target(node));
        let label = match node.source {
            RenderSource::Root => root_label.clone(),
            _ => name,
        };

        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(node.x, node.y, (node.width - 1.0).max(0.0), h - 1.0),
            fill,
            border_color: outlined.then_some(ThemeToken::SelectionOutline),
            label: Some(label.clone()),
            frame_id: Some(i as u64),
        });

        if let Some(text) = fitted_label(&label, node.width, config) {
            commands.push(RenderCommand::DrawText {
                position: Point::new(node.x + config.label_padding, node.y + h / 2.0),
                text: text.into(),
                color: ThemeToken::NodeLabel,
                font_size: config.font_size,
                align: TextAlign::Left,
            });
        }
    }

    commands.push(RenderCommand::ClearClip);
    commands.push(RenderCommand::EndGroup);

    CanvasFrame {
        commands,
        cursor: if hovered.is_some() {
            CursorIcon::Pointer
        } else {
            CursorIcon::Default
        },
        hovered,
        content_height: data.content_height(h),
    }
}

fn root_label(data: &FlamegraphData, unit: ValueUnit) -> SharedStr {
    let all = data.all_roots_cumulative_value;
    format!(
        "root: {} ({})",
        unit.format_value(all),
        format_percentage(all, data.unfiltered_cumulative_value)
    )
    .into()
}

/// Leftmost characters of `label` that fit in a rectangle `width` wide, or
/// `None` when not even one character fits.
pub fn fitted_label<'a>(label: &'a SharedStr, width: f64, config: &FlamegraphConfig) -> Option<&'a str> {
    let budget = width - 2.0 * config.label_padding;
    if budget < config.label_min_width {
        return None;
    }
    let chars = (budget / config.label_char_width).floor();
    if chars < 1.0 {
        return None;
    }
    let text = label.prefix_chars(chars as usize);
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Tooltip, TooltipState};
    use crate::layout::compute_render_nodes;
    use crate::model::FlamegraphNode;

    fn data() -> FlamegraphData {
        let node = |id: i64, depth: i32, name: &str, x_start: f64, x_end: f64| FlamegraphNode {
            id,
            parent_id: if depth == 1 { 0 } else { id - 1 },
            depth,
            name: name.into(),
            self_value: 0.0,
            cumulative_value: x_end - x_start,
            parent_cumulative_value: None,
            x_start,
            x_end,
            properties: Vec::new(),
        };
        FlamegraphData::new(
            vec![
                node(1, 1, "main", 0.0, 10.0),
                node(2, 2, "compute_checksum", 0.0, 2.0),
                node(3, 3, "crc32", 0.0, 1.0),
            ],
            10.0,
            20.0,
        )
    }

    fn rects(frame: &CanvasFrame) -> Vec<(&Rect, Option<&SharedStr>)> {
        frame
            .commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect { rect, label, .. } => Some((rect, label.as_ref())),
                _ => None,
            })
            .collect()
    }

    fn texts(frame: &CanvasFrame) -> Vec<&str> {
        frame
            .commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn paint_default(session: &WidgetSession, viewport: &Viewport) -> CanvasFrame {
        let data = data();
        let config = FlamegraphConfig::default();
        let nodes = compute_render_nodes(&data, &data.root_region(), viewport.width, &config);
        paint(&nodes, &data, session, viewport, &config, ValueUnit::Count)
    }

    #[test]
    fn draws_inset_rects_and_fitted_labels() {
        let frame = paint_default(&WidgetSession::default(), &Viewport::new(300.0, 200.0));
        let rects = rects(&frame);
        assert_eq!(rects.len(), 4);
        assert_eq!(*rects[1].0, Rect::new(0.0, 20.0, 299.0, 19.0));
        // 60px: (60 - 10) / 7 -> 7 characters; 30px -> 2.
        assert_eq!(
            texts(&frame),
            vec!["root: 10 (50.00%)", "main", "compute", "cr"]
        );
        assert_eq!(frame.content_height, 80.0);
        assert_eq!(frame.cursor, CursorIcon::Default);
    }

    #[test]
    fn culls_rows_outside_band() {
        let viewport = Viewport::new(100.0, 20.0).scrolled_to(40.0);
        let frame = paint_default(&WidgetSession::default(), &viewport);
        let labels: Vec<_> = rects(&frame)
            .into_iter()
            .filter_map(|(_, l)| l.map(|s| s.to_string()))
            .collect();
        assert_eq!(labels, vec!["compute_checksum"]);
    }

    #[test]
    fn hover_sets_pointer_cursor() {
        let session = WidgetSession {
            pointer: Some(Point::new(50.0, 25.0)),
            ..WidgetSession::default()
        };
        let frame = paint_default(&session, &Viewport::new(100.0, 200.0));
        assert_eq!(frame.hovered, Some(1));
        assert_eq!(frame.cursor, CursorIcon::Pointer);
    }

    #[test]
    fn pinned_node_is_outlined() {
        let data = data();
        let config = FlamegraphConfig::default();
        let nodes = compute_render_nodes(&data, &data.root_region(), 100.0, &config);
        let session = WidgetSession {
            tooltip: Some(Tooltip {
                anchor: Point::new(1.0, 21.0),
                node: nodes[1],
                state: TooltipState::Click,
            }),
            ..WidgetSession::default()
        };
        let frame = paint(&nodes, &data, &session, &Viewport::new(100.0, 200.0), &config, ValueUnit::Count);
        let outlined: Vec<_> = frame
            .commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    border_color: Some(ThemeToken::SelectionOutline),
                    frame_id,
                    ..
                } => *frame_id,
                _ => None,
            })
            .collect();
        assert_eq!(outlined, vec![1]);
    }

    #[test]
    fn label_budget() {
        let config = FlamegraphConfig::default();
        let label = SharedStr::from("malloc");
        assert_eq!(fitted_label(&label, 14.0, &config), None);
        assert_eq!(fitted_label(&label, 16.0, &config), None);
        assert_eq!(fitted_label(&label, 17.0, &config), Some("m"));
        assert_eq!(fitted_label(&label, 200.0, &config), Some("malloc"));
    }

    #[test]
    fn loading_frame() {
        let frame = paint_loading(&Viewport::new(300.0, 100.0), &FlamegraphConfig::default());
        assert_eq!(texts(&frame), vec![LOADING_TEXT]);
        assert_eq!(frame.cursor, CursorIcon::Default);
    }
}
