use std::sync::Mutex;

use ember_core::FlamegraphConfig;
use ember_core::layout::compute_render_nodes;
use ember_core::model::{FlamegraphData, FlamegraphState, StateError, ZoomRegion};
use ember_core::provider::{FlamegraphQuery, ProviderError, StackProvider, TreeProvider};
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;

static PROVIDERS: Mutex<Vec<StackProvider>> = Mutex::new(Vec::new());

#[derive(Debug, Error)]
enum BridgeError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node {0} has depth 0; the root is synthetic")]
    DepthZero(i64),
    #[error("width must be a positive number, got {0}")]
    Width(f64),
    #[error("invalid provider handle {0}")]
    Handle(usize),
    #[error("provider registry poisoned")]
    Poisoned,
}

fn to_json(value: &impl Serialize) -> Result<String, BridgeError> {
    Ok(serde_json::to_string(value)?)
}

fn add_filter_json(state_json: &str, text: &str) -> Result<String, BridgeError> {
    let state = FlamegraphState::from_json(state_json)?;
    let next = state.with_filter_text(text).unwrap_or(state);
    Ok(next.to_json()?)
}

fn remove_tag_json(state_json: &str, index: usize) -> Result<String, BridgeError> {
    let state = FlamegraphState::from_json(state_json)?;
    let next = state.without_tag(index).unwrap_or(state);
    Ok(next.to_json()?)
}

fn compute_layout_json(data_json: &str, zoom_json: &str, width: f64) -> Result<String, BridgeError> {
    if width.is_nan() || width <= 0.0 {
        return Err(BridgeError::Width(width));
    }
    let data: FlamegraphData = serde_json::from_str(data_json)?;
    if let Some(node) = data.nodes.iter().find(|n| n.depth == 0) {
        return Err(BridgeError::DepthZero(node.id));
    }
    let zoom = if zoom_json.trim().is_empty() {
        data.root_region()
    } else {
        serde_json::from_str::<ZoomRegion>(zoom_json)?
    };
    let nodes = compute_render_nodes(&data, &zoom, width, &FlamegraphConfig::default());
    to_json(&nodes)
}

fn query_json(handle: usize, state_json: &str) -> Result<String, BridgeError> {
    let state = FlamegraphState::from_json(state_json)?;
    let providers = PROVIDERS.lock().map_err(|_| BridgeError::Poisoned)?;
    let provider = providers.get(handle).ok_or(BridgeError::Handle(handle))?;
    let data = provider.query(&FlamegraphQuery::from(&state))?;
    to_json(&data)
}

/// Parse filter text (`"HS: malloc"`, a bare pattern, `"Pivot: main"`) into
/// the state; returns the new state JSON. Blank text returns it unchanged.
#[wasm_bindgen]
pub fn add_filter(state_json: &str, text: &str) -> Result<String, JsError> {
    Ok(add_filter_json(state_json, text)?)
}

/// Remove the tag at `index` (filters first, then the pivot tag).
#[wasm_bindgen]
pub fn remove_tag(state_json: &str, index: usize) -> Result<String, JsError> {
    Ok(remove_tag_json(state_json, index)?)
}

/// Lay out a data snapshot. An empty `zoom_json` means the root region.
/// Returns the render nodes as JSON.
#[wasm_bindgen]
pub fn compute_layout(data_json: &str, zoom_json: &str, width: f64) -> Result<String, JsError> {
    Ok(compute_layout_json(data_json, zoom_json, width)?)
}

/// Load folded stacks. Returns a handle for `query`.
#[wasm_bindgen]
pub fn load_collapsed(data: &[u8]) -> Result<usize, JsError> {
    let provider = StackProvider::from_collapsed(data).map_err(BridgeError::from)?;
    let mut providers = PROVIDERS.lock().map_err(|_| BridgeError::Poisoned)?;
    providers.push(provider);
    Ok(providers.len() - 1)
}

/// Metrics offered by a loaded provider, as JSON.
#[wasm_bindgen]
pub fn metrics(handle: usize) -> Result<String, JsError> {
    let providers = PROVIDERS.lock().map_err(|_| BridgeError::Poisoned)?;
    let provider = providers.get(handle).ok_or(BridgeError::Handle(handle))?;
    Ok(to_json(&provider.metrics())?)
}

/// Answer a state against a loaded provider; returns the data snapshot JSON.
#[wasm_bindgen]
pub fn query(handle: usize, state_json: &str) -> Result<String, JsError> {
    Ok(query_json(handle, state_json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::layout::RenderNode;
    use ember_core::model::FlamegraphNode;

    fn data() -> FlamegraphData {
        let node = |id: i64, parent_id: i64, depth: i32, name: &str, x_start: f64, x_end: f64| {
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
        };
        FlamegraphData::new(
            vec![
                node(1, 0, 1, "main", 0.0, 10.0),
                node(2, 1, 2, "parse", 0.0, 6.0),
                node(3, 1, 2, "emit", 6.0, 10.0),
            ],
            10.0,
            10.0,
        )
    }

    #[test]
    fn add_filter_appends_and_ignores_blank() {
        let empty = FlamegraphState::default().to_json().unwrap();
        let json = add_filter_json(&empty, "HS: malloc").unwrap();
        let state = FlamegraphState::from_json(&json).unwrap();
        let expected = FlamegraphState::default().with_filter_text("HS: malloc").unwrap();
        assert_eq!(state, expected);

        let unchanged = add_filter_json(&json, "   ").unwrap();
        assert_eq!(FlamegraphState::from_json(&unchanged).unwrap(), expected);
    }

    #[test]
    fn remove_tag_drops_filter() {
        let state = FlamegraphState::default()
            .with_filter_text("HS: malloc")
            .unwrap()
            .with_filter_text("free")
            .unwrap();
        let json = remove_tag_json(&state.to_json().unwrap(), 0).unwrap();
        let next = FlamegraphState::from_json(&json).unwrap();
        assert_eq!(next.filters.len(), 1);
        assert_eq!(next.filters[0], state.filters[1]);

        // Out of range leaves the state alone.
        let same = remove_tag_json(&json, 9).unwrap();
        assert_eq!(FlamegraphState::from_json(&same).unwrap(), next);
    }

    #[test]
    fn lays_out_snapshot_json() {
        let data_json = serde_json::to_string(&data()).unwrap();
        let json = compute_layout_json(&data_json, "", 100.0).unwrap();
        let nodes: Vec<RenderNode> = serde_json::from_str(&json).unwrap();
        let widths: Vec<f64> = nodes.iter().map(|n| n.width).collect();
        assert_eq!(widths, vec![100.0, 100.0, 60.0, 40.0]);

        let zoom = serde_json::to_string(&ZoomRegion {
            query_x_start: 6.0,
            query_x_end: 10.0,
            axis: ember_core::model::ZoomAxis::BelowRoot,
        })
        .unwrap();
        let zoomed: Vec<RenderNode> =
            serde_json::from_str(&compute_layout_json(&data_json, &zoom, 100.0).unwrap()).unwrap();
        let emit = zoomed.last().unwrap();
        assert_eq!((emit.x, emit.width), (0.0, 100.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            compute_layout_json("{}", "", 0.0),
            Err(BridgeError::Width(_))
        ));
        assert!(matches!(
            compute_layout_json("not json", "", 100.0),
            Err(BridgeError::Json(_))
        ));
        assert!(matches!(add_filter_json("][", "x"), Err(BridgeError::State(_))));

        let mut flat = data();
        flat.nodes[1].depth = 0;
        let flat_json = serde_json::to_string(&flat).unwrap();
        assert!(matches!(
            compute_layout_json(&flat_json, "", 100.0),
            Err(BridgeError::DepthZero(2))
        ));
    }

    #[test]
    fn queries_loaded_stacks() {
        let provider = StackProvider::from_collapsed(b"main;parse 3\nmain;emit 1\n").unwrap();
        let handle = {
            let mut providers = PROVIDERS.lock().unwrap();
            providers.push(provider);
            providers.len() - 1
        };
        let state = FlamegraphState::default_for(&PROVIDERS.lock().unwrap()[handle].metrics());
        let json = query_json(handle, &state.to_json().unwrap()).unwrap();
        let data: FlamegraphData = serde_json::from_str(&json).unwrap();
        assert_eq!(data.all_roots_cumulative_value, 4.0);
        assert!(matches!(query_json(usize::MAX, "{}"), Err(BridgeError::Handle(_))));
    }
}
