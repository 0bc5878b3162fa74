use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
///
/// Node fills are data-derived `Color`s; everything else on the canvas
/// goes through a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    /// Label text drawn on top of node fills.
    NodeLabel,
    /// Outline of the node whose tooltip is pinned.
    SelectionOutline,

    TextPrimary,
    TextMuted,

    Background,
    Surface,
    Border,

    // Toolbar
    ToolbarBackground,
    ToolbarText,

    // Tags / tooltip panel
    TagBackground,
    TagText,
    TooltipBackground,
    TooltipBorder,
}
