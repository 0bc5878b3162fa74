use std::collections::HashMap;

use ember_protocol::{SharedStr, ValueUnit};
use regex::Regex;

use super::{FlamegraphQuery, ProviderError, TreeProvider};
use crate::model::{FilterKind, FlamegraphData, FlamegraphMetric, FlamegraphNode, FlamegraphView, NodeId};
use crate::parsers::{StackSample, parse_collapsed};

/// In-memory provider over weighted stack samples, one sample list per
/// metric.
#[derive(Debug, Clone, Default)]
pub struct StackProvider {
    metrics: Vec<(FlamegraphMetric, Vec<StackSample>)>,
}

impl StackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the samples answering `metric`.
    pub fn with_metric(mut self, metric: FlamegraphMetric, samples: Vec<StackSample>) -> Self {
        self.metrics.retain(|(m, _)| m.name != metric.name);
        self.metrics.push((metric, samples));
        self
    }

    /// Single-metric provider over a folded stack file.
    pub fn from_collapsed(data: &[u8]) -> Result<Self, ProviderError> {
        let samples = parse_collapsed(data)?;
        Ok(Self::new().with_metric(FlamegraphMetric::new("samples", ValueUnit::Samples), samples))
    }
}

impl TreeProvider for StackProvider {
    fn metrics(&self) -> Vec<FlamegraphMetric> {
        self.metrics.iter().map(|(m, _)| m.clone()).collect()
    }

    fn query(&self, query: &FlamegraphQuery) -> Result<FlamegraphData, ProviderError> {
        let samples = self
            .metrics
            .iter()
            .find(|(m, _)| m.name == query.metric)
            .map(|(_, s)| s)
            .ok_or_else(|| ProviderError::UnknownMetric(query.metric.clone()))?;

        let filters: Vec<(FilterKind, Matcher)> = query
            .filters
            .iter()
            .map(|f| (f.kind, Matcher::new(&f.filter)))
            .collect();
        let pivot = match &query.view {
            FlamegraphView::Pivot { pivot } => Some(Matcher::new(pivot)),
            FlamegraphView::TopDown | FlamegraphView::BottomUp => None,
        };

        let unfiltered: f64 = samples.iter().map(|s| s.weight).sum();
        let mut below = Trie::default();
        let mut above = Trie::default();
        let mut total = 0.0;

        for sample in samples {
            let Some(frames) = apply_filters(&sample.frames, &filters) else {
                continue;
            };
            match (&query.view, &pivot) {
                (FlamegraphView::BottomUp, _) => below.insert(frames.iter().rev().copied(), sample.weight),
                (_, Some(pivot)) => {
                    let Some(at) = frames.iter().position(|f| pivot.is_match(f)) else {
                        continue;
                    };
                    below.insert(frames[at..].iter().copied(), sample.weight);
                    above.insert(frames[..at].iter().rev().copied(), sample.weight);
                }
                _ => below.insert(frames.iter().copied(), sample.weight),
            }
            total += sample.weight;
        }

        let mut nodes = Vec::with_capacity(below.nodes.len() + above.nodes.len());
        let mut next_id: NodeId = 1;
        below.emit(1, total, &mut next_id, &mut nodes);
        above.emit(-1, total, &mut next_id, &mut nodes);

        tracing::debug!(
            metric = %query.metric,
            samples = samples.len(),
            nodes = nodes.len(),
            total,
            "stack query"
        );
        Ok(FlamegraphData::new(nodes, total, unfiltered))
    }
}

/// Frame-name predicate. Filter text is a regular expression; text that
/// does not compile matches as a literal substring.
enum Matcher {
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    fn new(text: &str) -> Self {
        match Regex::new(text) {
            Ok(re) => Matcher::Pattern(re),
            Err(err) => {
                tracing::debug!(pattern = text, error = %err, "filter is not a regex, matching literally");
                Matcher::Literal(text.to_string())
            }
        }
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(name),
            Matcher::Literal(text) => name.contains(text.as_str()),
        }
    }
}

/// Filters in list order. `None` drops the sample.
fn apply_filters<'a>(frames: &'a [SharedStr], filters: &[(FilterKind, Matcher)]) -> Option<Vec<&'a SharedStr>> {
    let mut kept: Vec<&SharedStr> = frames.iter().collect();
    for (kind, matcher) in filters {
        match kind {
            FilterKind::ShowStack => {
                if !kept.iter().any(|f| matcher.is_match(f)) {
                    return None;
                }
            }
            FilterKind::HideStack => {
                if kept.iter().any(|f| matcher.is_match(f)) {
                    return None;
                }
            }
            FilterKind::ShowFromFrame => {
                let at = kept.iter().position(|f| matcher.is_match(f))?;
                kept.drain(..at);
            }
            FilterKind::HideFrame => kept.retain(|f| !matcher.is_match(f)),
        }
    }
    (!kept.is_empty()).then_some(kept)
}

struct TrieNode<'a> {
    name: &'a SharedStr,
    cumulative: f64,
    self_value: f64,
    children: Vec<usize>,
}

/// Prefix tree of frame paths, siblings merged by name.
#[derive(Default)]
struct Trie<'a> {
    nodes: Vec<TrieNode<'a>>,
    roots: Vec<usize>,
    index: HashMap<(Option<usize>, &'a str), usize>,
}

impl<'a> Trie<'a> {
    fn insert(&mut self, path: impl Iterator<Item = &'a SharedStr>, weight: f64) {
        let mut parent = None;
        for name in path {
            let idx = match self.index.get(&(parent, name.as_str())) {
                Some(&idx) => idx,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(TrieNode {
                        name,
                        cumulative: 0.0,
                        self_value: 0.0,
                        children: Vec::new(),
                    });
                    match parent {
                        Some(p) => self.nodes[p].children.push(idx),
                        None => self.roots.push(idx),
                    }
                    self.index.insert((parent, name.as_str()), idx);
                    idx
                }
            };
            self.nodes[idx].cumulative += weight;
            parent = Some(idx);
        }
        if let Some(leaf) = parent {
            self.nodes[leaf].self_value += weight;
        }
    }

    /// Heaviest first, ties by name.
    fn sorted(&self, siblings: &[usize]) -> Vec<usize> {
        let mut out = siblings.to_vec();
        out.sort_by(|&a, &b| {
            let (a, b) = (&self.nodes[a], &self.nodes[b]);
            b.cumulative
                .total_cmp(&a.cumulative)
                .then_with(|| a.name.as_str().cmp(b.name.as_str()))
        });
        out
    }

    /// Queue `siblings` for emission, laid out left to right from `x`.
    fn push_children(&self, stack: &mut Vec<Pending>, siblings: &[usize], depth: i32, x: f64, parent: (NodeId, f64)) {
        let mut x = x;
        let start = stack.len();
        for idx in self.sorted(siblings) {
            stack.push(Pending {
                idx,
                depth,
                x_start: x,
                parent_id: parent.0,
                parent_cumulative: parent.1,
            });
            x += self.nodes[idx].cumulative;
        }
        // Popped in order.
        stack[start..].reverse();
    }

    /// Depth-first, parents before children. `direction` is the sign of the
    /// emitted depths.
    fn emit(&self, direction: i32, root_total: f64, next_id: &mut NodeId, out: &mut Vec<FlamegraphNode>) {
        let mut stack = Vec::new();
        self.push_children(&mut stack, &self.roots, direction, 0.0, (0, root_total));
        while let Some(p) = stack.pop() {
            let node = &self.nodes[p.idx];
            let id = *next_id;
            *next_id += 1;
            out.push(FlamegraphNode {
                id,
                parent_id: p.parent_id,
                depth: p.depth,
                name: node.name.clone(),
                self_value: node.self_value,
                cumulative_value: node.cumulative,
                parent_cumulative_value: Some(p.parent_cumulative),
                x_start: p.x_start,
                x_end: p.x_start + node.cumulative,
                properties: Vec::new(),
            });
            self.push_children(
                &mut stack,
                &node.children,
                p.depth + direction,
                p.x_start,
                (id, node.cumulative),
            );
        }
    }
}

struct Pending {
    idx: usize,
    depth: i32,
    x_start: f64,
    parent_id: NodeId,
    parent_cumulative: f64,
}
