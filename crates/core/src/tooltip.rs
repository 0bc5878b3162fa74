use ember_protocol::{SharedStr, ValueUnit, format_percentage};
use serde::{Deserialize, Serialize};

use crate::color::MERGED_NAME;
use crate::layout::{RenderNode, RenderSource};
use crate::model::{FilterKind, FlamegraphData};

/// Buttons offered by a pinned tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TooltipAction {
    Zoom,
    ShowStack,
    HideStack,
    ShowFromFrame,
    HideFrame,
    Pivot,
}

impl TooltipAction {
    pub const ALL: [TooltipAction; 6] = [
        TooltipAction::Zoom,
        TooltipAction::ShowStack,
        TooltipAction::HideStack,
        TooltipAction::ShowFromFrame,
        TooltipAction::HideFrame,
        TooltipAction::Pivot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TooltipAction::Zoom => "Zoom",
            TooltipAction::ShowStack => "Show Stack",
            TooltipAction::HideStack => "Hide Stack",
            TooltipAction::ShowFromFrame => "Show From Frame",
            TooltipAction::HideFrame => "Hide Frame",
            TooltipAction::Pivot => "Pivot",
        }
    }

    /// The filter this action appends, if it is a filter action.
    pub fn filter_kind(self) -> Option<FilterKind> {
        match self {
            TooltipAction::ShowStack => Some(FilterKind::ShowStack),
            TooltipAction::HideStack => Some(FilterKind::HideStack),
            TooltipAction::ShowFromFrame => Some(FilterKind::ShowFromFrame),
            TooltipAction::HideFrame => Some(FilterKind::HideFrame),
            TooltipAction::Zoom | TooltipAction::Pivot => None,
        }
    }
}

/// Filter text matching exactly `name`.
pub fn exact_match_pattern(name: &str) -> String {
    format!("^{}$", regex::escape(name))
}

/// Text shown in a tooltip panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipContent {
    pub title: SharedStr,
    pub lines: Vec<String>,
    pub properties: Vec<(String, String)>,
    pub actions: Vec<TooltipAction>,
}

pub fn tooltip_content(node: &RenderNode, data: &FlamegraphData, unit: ValueUnit) -> TooltipContent {
    let root = data.all_roots_cumulative_value;
    let all = data.unfiltered_cumulative_value;

    match node.source {
        RenderSource::Root => TooltipContent {
            title: "root".into(),
            lines: vec![format!(
                "Cumulative: {} ({} of all)",
                unit.format_value(root),
                format_percentage(root, all)
            )],
            properties: Vec::new(),
            actions: vec![TooltipAction::Zoom],
        },
        RenderSource::Merged => {
            let mass = node.extent.query_x_end - node.extent.query_x_start;
            TooltipContent {
                title: MERGED_NAME.into(),
                lines: vec![
                    "Nodes too small to show, zoom in to see more detail".to_string(),
                    format!(
                        "Cumulative: {} ({} of root)",
                        unit.format_value(mass),
                        format_percentage(mass, root)
                    ),
                ],
                properties: Vec::new(),
                actions: Vec::new(),
            }
        }
        RenderSource::Node { index } => {
            let Some(n) = data.node(index) else {
                return TooltipContent {
                    title: "unknown".into(),
                    lines: Vec::new(),
                    properties: Vec::new(),
                    actions: Vec::new(),
                };
            };
            let mut lines = vec![format!(
                "Cumulative: {} ({} of root, {} of all)",
                unit.format_value(n.cumulative_value),
                format_percentage(n.cumulative_value, root),
                format_percentage(n.cumulative_value, all)
            )];
            if let Some(parent) = n.parent_cumulative_value {
                lines.push(format!(
                    "{} of parent",
                    format_percentage(n.cumulative_value, parent)
                ));
            }
            lines.push(format!(
                "Self: {} ({} of root)",
                unit.format_value(n.self_value),
                format_percentage(n.self_value, root)
            ));
            TooltipContent {
                title: n.name.clone(),
                lines,
                properties: n.properties.clone(),
                actions: TooltipAction::ALL.to_vec(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlamegraphConfig;
    use crate::layout::compute_render_nodes;
    use crate::model::FlamegraphNode;

    fn data() -> FlamegraphData {
        FlamegraphData::new(
            vec![FlamegraphNode {
                id: 1,
                parent_id: 0,
                depth: 1,
                name: "malloc".into(),
                self_value: 256.0,
                cumulative_value: 1024.0,
                parent_cumulative_value: Some(2048.0),
                x_start: 0.0,
                x_end: 1024.0,
                properties: vec![("file".into(), "alloc.c".into())],
            }],
            2048.0,
            4096.0,
        )
    }

    #[test]
    fn node_tooltip_reports_percentages() {
        let data = data();
        let nodes = compute_render_nodes(&data, &data.root_region(), 100.0, &FlamegraphConfig::default());
        let content = tooltip_content(&nodes[1], &data, ValueUnit::Bytes);
        assert_eq!(content.title, "malloc");
        assert_eq!(
            content.lines,
            vec![
                "Cumulative: 1.0 KiB (50.00% of root, 25.00% of all)",
                "50.00% of parent",
                "Self: 256 B (12.50% of root)",
            ]
        );
        assert_eq!(content.properties, vec![("file".to_string(), "alloc.c".to_string())]);
        assert_eq!(content.actions.len(), 6);
    }

    #[test]
    fn root_tooltip_only_zooms() {
        let data = data();
        let nodes = compute_render_nodes(&data, &data.root_region(), 100.0, &FlamegraphConfig::default());
        let content = tooltip_content(&nodes[0], &data, ValueUnit::Bytes);
        assert_eq!(content.title, "root");
        assert_eq!(content.lines, vec!["Cumulative: 2.0 KiB (50.00% of all)"]);
        assert_eq!(content.actions, vec![TooltipAction::Zoom]);
    }

    #[test]
    fn exact_pattern_escapes_metacharacters() {
        assert_eq!(exact_match_pattern("std::vec::Vec<T>::push"), "^std::vec::Vec<T>::push$");
        assert_eq!(exact_match_pattern("a.b(c)"), r"^a\.b\(c\)$");
    }
}
