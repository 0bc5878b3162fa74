use crate::config::FlamegraphConfig;
use crate::layout::{RenderNode, compute_render_nodes};
use crate::model::{Snapshot, ZoomRegion};

/// Everything a layout pass depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutKey {
    pub generation: u64,
    pub width: f64,
    pub zoom: ZoomRegion,
    pub config: FlamegraphConfig,
}

/// Reruns layout only when its inputs change. Hover and tooltip updates
/// reuse the previous render nodes.
#[derive(Debug, Default)]
pub struct RenderCache {
    entry: Option<(LayoutKey, Vec<RenderNode>)>,
    passes: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_nodes(
        &mut self,
        snapshot: &Snapshot,
        zoom: &ZoomRegion,
        width: f64,
        config: &FlamegraphConfig,
    ) -> &[RenderNode] {
        let key = LayoutKey {
            generation: snapshot.generation,
            width,
            zoom: *zoom,
            config: *config,
        };
        let stale = self.entry.as_ref().is_none_or(|(k, _)| *k != key);
        if stale {
            self.passes += 1;
            let nodes = compute_render_nodes(&snapshot.data, zoom, width, config);
            self.entry = Some((key, nodes));
        }
        match &self.entry {
            Some((_, nodes)) => nodes,
            None => &[],
        }
    }

    /// Number of layout passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlamegraphData, FlamegraphNode};

    fn snapshot(generation: u64) -> Snapshot {
        Snapshot::new(
            generation,
            FlamegraphData::new(
                vec![FlamegraphNode {
                    id: 1,
                    parent_id: 0,
                    depth: 1,
                    name: "main".into(),
                    self_value: 4.0,
                    cumulative_value: 4.0,
                    parent_cumulative_value: None,
                    x_start: 0.0,
                    x_end: 4.0,
                    properties: Vec::new(),
                }],
                4.0,
                4.0,
            ),
        )
    }

    #[test]
    fn identical_inputs_reuse_layout() {
        let snap = snapshot(1);
        let zoom = snap.data.root_region();
        let config = FlamegraphConfig::default();
        let mut cache = RenderCache::new();

        let first = cache.render_nodes(&snap, &zoom, 100.0, &config).to_vec();
        let second = cache.render_nodes(&snap, &zoom, 100.0, &config).to_vec();
        assert_eq!(first, second);
        assert_eq!(cache.passes(), 1);
    }

    #[test]
    fn any_input_change_recomputes() {
        let snap = snapshot(1);
        let zoom = snap.data.root_region();
        let config = FlamegraphConfig::default();
        let mut cache = RenderCache::new();

        cache.render_nodes(&snap, &zoom, 100.0, &config);
        cache.render_nodes(&snap, &zoom, 120.0, &config);
        cache.render_nodes(&snapshot(2), &zoom, 120.0, &config);
        let taller = FlamegraphConfig {
            node_height: 30.0,
            ..config
        };
        cache.render_nodes(&snapshot(2), &zoom, 120.0, &taller);
        assert_eq!(cache.passes(), 4);

        cache.clear();
        cache.render_nodes(&snapshot(2), &zoom, 120.0, &taller);
        assert_eq!(cache.passes(), 5);
    }
}
