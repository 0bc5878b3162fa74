use ember_protocol::Color;

/// Label of merged rectangles; also keys their neutral fill.
pub const MERGED_NAME: &str = "(merged)";

/// Deterministic fill for a node name.
///
/// Hue is the sum of `char code mod 64` over the name, mod 360, so equal
/// names get equal colors across snapshots. Greyed (partially zoomed-out)
/// nodes and the neutral names ("root", "unknown", merged groups) use fixed
/// greys. Hovered nodes are lighter.
pub fn node_color(name: &str, greyed: bool, hovered: bool) -> Color {
    if greyed {
        return Color::from_hsl(0.0, 0.0, if hovered { 85.0 } else { 80.0 });
    }
    let lightness = if hovered { 78.0 } else { 73.0 };
    if matches!(name, "root" | "unknown" | MERGED_NAME) {
        return Color::from_hsl(0.0, 0.0, lightness);
    }
    Color::from_hsl(f64::from(name_hue(name)), 45.0, lightness)
}

fn name_hue(name: &str) -> u32 {
    name.chars().map(|c| u32::from(c) % 64).sum::<u32>() % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_color() {
        assert_eq!(node_color("malloc", false, false), node_color("malloc", false, false));
    }

    #[test]
    fn hue_sums_codes_mod_64() {
        // 'a' = 97 -> 33, 'b' = 98 -> 34
        assert_eq!(name_hue("ab"), 67);
        assert_eq!(node_color("ab", false, false), Color::from_hsl(67.0, 45.0, 73.0));
    }

    #[test]
    fn neutral_names_are_grey() {
        let root = node_color("root", false, false);
        assert_eq!(root.r, root.g);
        assert_eq!(root.g, root.b);
        assert_eq!(node_color(MERGED_NAME, false, false), root);
    }

    #[test]
    fn hover_lightens() {
        let plain = node_color("main", false, false).to_rgba8();
        let hovered = node_color("main", false, true).to_rgba8();
        let sum = |c: [u8; 4]| u32::from(c[0]) + u32::from(c[1]) + u32::from(c[2]);
        assert!(sum(hovered) > sum(plain));
    }

    #[test]
    fn greyed_ignores_name() {
        assert_eq!(node_color("a", true, false), node_color("zzz", true, false));
        assert_eq!(node_color("a", true, false).to_rgba8(), [204, 204, 204, 255]);
    }
}
