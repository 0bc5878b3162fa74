//! The filter sublanguage typed into the flame graph's tag box.
//!
//! A filter expression is `<prefix>: <text>` where the prefix is matched
//! case-insensitively in long or short form:
//!
//! | long              | short  | effect                    |
//! |-------------------|--------|---------------------------|
//! | `Show Stack`      | `SS`   | add `SHOW_STACK`          |
//! | `Hide Stack`      | `HS`   | add `HIDE_STACK`          |
//! | `Show From Frame` | `SFF`  | add `SHOW_FROM_FRAME`     |
//! | `Hide Frame`      | `HF`   | add `HIDE_FRAME`          |
//! | `Pivot`           | `P`    | replace the view          |
//!
//! Anything else, prefix or not, is a `SHOW_STACK` filter on the whole text.

use std::fmt;

use crate::model::{FilterKind, FlamegraphFilter, FlamegraphState, FlamegraphView};

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Filter(FilterKind),
    Pivot,
}

const PREFIXES: &[(&str, &str, Target)] = &[
    ("show stack", "ss", Target::Filter(FilterKind::ShowStack)),
    ("hide stack", "hs", Target::Filter(FilterKind::HideStack)),
    ("show from frame", "sff", Target::Filter(FilterKind::ShowFromFrame)),
    ("hide frame", "hf", Target::Filter(FilterKind::HideFrame)),
    ("pivot", "p", Target::Pivot),
];

/// What a filter expression asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    Filter(FlamegraphFilter),
    Pivot(String),
}

impl FilterKind {
    /// Long-form prefix used in the canonical string.
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::ShowStack => "Show Stack",
            FilterKind::HideStack => "Hide Stack",
            FilterKind::ShowFromFrame => "Show From Frame",
            FilterKind::HideFrame => "Hide Frame",
        }
    }
}

impl fmt::Display for FlamegraphFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.kind.label(), self.filter)
    }
}

/// Parse one filter expression. Returns `None` when there is nothing to
/// apply (blank input, or a recognised prefix with empty text).
pub fn parse_filter(text: &str) -> Option<FilterInput> {
    if text.trim().is_empty() {
        return None;
    }

    let Some((prefix, rest)) = text.split_once(SEPARATOR) else {
        return Some(show_stack(text));
    };

    let prefix = prefix.trim().to_lowercase();
    let target = PREFIXES
        .iter()
        .find(|(long, short, _)| prefix == *long || prefix == *short)
        .map(|(_, _, target)| *target);

    match target {
        None => Some(show_stack(text)),
        Some(_) if rest.is_empty() => None,
        Some(Target::Filter(kind)) => Some(FilterInput::Filter(FlamegraphFilter::new(kind, rest))),
        Some(Target::Pivot) => Some(FilterInput::Pivot(rest.to_string())),
    }
}

fn show_stack(text: &str) -> FilterInput {
    FilterInput::Filter(FlamegraphFilter::new(FilterKind::ShowStack, text))
}

impl FlamegraphState {
    /// The state after applying a typed filter expression, or `None` if the
    /// expression changes nothing. Filters are appended, never merged; a
    /// pivot replaces the view.
    pub fn with_filter_text(&self, text: &str) -> Option<Self> {
        let input = parse_filter(text)?;
        tracing::debug!(?input, "filter expression parsed");
        Some(match input {
            FilterInput::Filter(filter) => self.with_filter(filter),
            FilterInput::Pivot(pivot) => self.with_view(FlamegraphView::Pivot { pivot }),
        })
    }

    pub fn with_filter(&self, filter: FlamegraphFilter) -> Self {
        let mut next = self.clone();
        next.filters.push(filter);
        next
    }

    /// Display tags: every filter in order, then the pivot if any.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.filters.iter().map(ToString::to_string).collect();
        if let FlamegraphView::Pivot { pivot } = &self.view {
            tags.push(format!("Pivot{SEPARATOR}{pivot}"));
        }
        tags
    }

    /// Remove the tag at `index`. The tag one past the last filter is the
    /// pivot; removing it returns the view to top-down. `None` if no tag
    /// lives at `index`.
    pub fn without_tag(&self, index: usize) -> Option<Self> {
        let mut next = self.clone();
        if index < next.filters.len() {
            next.filters.remove(index);
            return Some(next);
        }
        if index == next.filters.len() && matches!(next.view, FlamegraphView::Pivot { .. }) {
            next.view = FlamegraphView::TopDown;
            return Some(next);
        }
        None
    }
}
