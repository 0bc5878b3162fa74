use ember_protocol::ValueUnit;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a filter reshapes the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterKind {
    /// Keep only stacks containing a matching frame.
    ShowStack,
    /// Drop stacks containing a matching frame.
    HideStack,
    /// Drop the frames above the first matching frame of each stack.
    ShowFromFrame,
    /// Remove matching frames, keeping the rest of the stack.
    HideFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlamegraphFilter {
    pub kind: FilterKind,
    pub filter: String,
}

impl FlamegraphFilter {
    pub fn new(kind: FilterKind, filter: impl Into<String>) -> Self {
        Self {
            kind,
            filter: filter.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlamegraphView {
    #[default]
    TopDown,
    BottomUp,
    /// Treat every occurrence of the named frame as a new root.
    Pivot { pivot: String },
}

/// A metric variant the tree provider can answer for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlamegraphMetric {
    pub name: String,
    pub unit: ValueUnit,
}

impl FlamegraphMetric {
    pub fn new(name: impl Into<String>, unit: ValueUnit) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }
}

/// Serializable description of which tree the provider should return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlamegraphState {
    #[serde(default, deserialize_with = "lenient_name")]
    pub selected_metric_name: String,
    #[serde(default, deserialize_with = "lenient_filters")]
    pub filters: Vec<FlamegraphFilter>,
    #[serde(default, deserialize_with = "lenient_view")]
    pub view: FlamegraphView,
}

impl FlamegraphState {
    /// First metric selected, no filters, top-down.
    pub fn default_for(metrics: &[FlamegraphMetric]) -> Self {
        Self {
            selected_metric_name: metrics.first().map(|m| m.name.clone()).unwrap_or_default(),
            filters: Vec::new(),
            view: FlamegraphView::TopDown,
        }
    }

    /// Falls back to the default state when the selected metric is gone.
    pub fn reconciled(self, metrics: &[FlamegraphMetric]) -> Self {
        if metrics.iter().any(|m| m.name == self.selected_metric_name) {
            self
        } else {
            Self::default_for(metrics)
        }
    }

    pub fn with_metric(&self, name: impl Into<String>) -> Self {
        Self {
            selected_metric_name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_view(&self, view: FlamegraphView) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    pub fn selected_metric<'a>(&self, metrics: &'a [FlamegraphMetric]) -> Option<&'a FlamegraphMetric> {
        metrics.iter().find(|m| m.name == self.selected_metric_name)
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Missing fields take their defaults; malformed filters are skipped and
    /// a malformed view reads as top-down. Only non-JSON input fails.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn lenient_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(name) => Ok(name),
        _ => Ok(String::new()),
    }
}

fn lenient_filters<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FlamegraphFilter>, D::Error> {
    let serde_json::Value::Array(raw) = serde_json::Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(raw
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

fn lenient_view<'de, D: Deserializer<'de>>(d: D) -> Result<FlamegraphView, D::Error> {
    let raw = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Vec<FlamegraphMetric> {
        vec![
            FlamegraphMetric::new("Unreleased Malloc Size", ValueUnit::Bytes),
            FlamegraphMetric::new("Total Malloc Count", ValueUnit::Count),
        ]
    }

    #[test]
    fn default_selects_first_metric() {
        let state = FlamegraphState::default_for(&metrics());
        assert_eq!(state.selected_metric_name, "Unreleased Malloc Size");
        assert!(state.filters.is_empty());
        assert_eq!(state.view, FlamegraphView::TopDown);
    }

    #[test]
    fn reconcile_resets_unknown_metric() {
        let state = FlamegraphState {
            selected_metric_name: "gone".into(),
            filters: vec![FlamegraphFilter::new(FilterKind::HideFrame, "x")],
            view: FlamegraphView::BottomUp,
        };
        assert_eq!(
            state.reconciled(&metrics()),
            FlamegraphState::default_for(&metrics())
        );
    }

    #[test]
    fn reconcile_keeps_known_metric() {
        let state = FlamegraphState::default_for(&metrics())
            .with_metric("Total Malloc Count")
            .with_view(FlamegraphView::BottomUp);
        assert_eq!(state.clone().reconciled(&metrics()), state);
    }

    #[test]
    fn json_uses_wire_names() {
        let state = FlamegraphState {
            selected_metric_name: "m".into(),
            filters: vec![FlamegraphFilter::new(FilterKind::ShowFromFrame, "main")],
            view: FlamegraphView::Pivot {
                pivot: "alloc".into(),
            },
        };
        let json = state.to_json().unwrap_or_default();
        assert_eq!(
            json,
            r#"{"selectedMetricName":"m","filters":[{"kind":"SHOW_FROM_FRAME","filter":"main"}],"view":{"kind":"PIVOT","pivot":"alloc"}}"#
        );
        assert_eq!(FlamegraphState::from_json(&json).ok(), Some(state));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let state = FlamegraphState::from_json(r#"{"selectedMetricName":"m"}"#).ok();
        assert_eq!(
            state,
            Some(FlamegraphState {
                selected_metric_name: "m".into(),
                filters: Vec::new(),
                view: FlamegraphView::TopDown,
            })
        );
    }

    #[test]
    fn malformed_entries_do_not_fail() {
        let json = r#"{
            "selectedMetricName": "m",
            "filters": [{"kind":"SHOW_STACK","filter":"a"}, {"kind":"BOGUS"}, 7],
            "view": {"kind":"SIDEWAYS"},
            "extra": true
        }"#;
        let state = FlamegraphState::from_json(json).ok();
        assert_eq!(
            state.as_ref().map(|s| s.filters.len()),
            Some(1),
            "only the well-formed filter survives"
        );
        assert_eq!(state.map(|s| s.view), Some(FlamegraphView::TopDown));
    }

    #[test]
    fn wrongly_typed_fields_take_defaults() {
        for json in [
            r#"{"selectedMetricName": null, "filters": 5}"#,
            r#"{"selectedMetricName": 7, "filters": {"kind": "HIDE_STACK"}}"#,
            r#"{"selectedMetricName": ["m"], "filters": null, "view": 3}"#,
        ] {
            assert_eq!(
                FlamegraphState::from_json(json).ok(),
                Some(FlamegraphState::default()),
                "{json}"
            );
        }

        let kept = FlamegraphState::from_json(r#"{"selectedMetricName": "m", "filters": "x"}"#).ok();
        assert_eq!(kept.map(|s| s.selected_metric_name), Some("m".to_string()));
    }

    #[test]
    fn non_json_is_an_error() {
        assert!(FlamegraphState::from_json("not json").is_err());
    }
}
