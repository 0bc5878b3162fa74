//! SVG renderer: converts `RenderCommand` lists into standalone SVG strings.

use std::fmt::Write as _;

use ember_protocol::{RenderCommand, TextAlign, ThemeToken};

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` define the SVG viewBox dimensions.
/// `dark` selects the palette for theme tokens; node fills are literal.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64, dark: bool) -> String {
    let mut svg = String::with_capacity(commands.len() * 160);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="font-family:ui-monospace,Menlo,monospace">"#,
    );
    let _ = write!(
        svg,
        r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
        resolve_color(ThemeToken::Background, dark)
    );

    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect,
                fill,
                border_color,
                label,
                ..
            } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}""#,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h,
                    fill.to_hex()
                );
                if let Some(token) = border_color {
                    let _ = write!(
                        svg,
                        r#" stroke="{}" stroke-width="2""#,
                        resolve_color(*token, dark)
                    );
                }
                svg.push('>');
                // Full name as a hover title; the visible label is a DrawText.
                if let Some(label) = label {
                    let _ = write!(svg, "<title>{}</title>", escape_xml(label));
                }
                svg.push_str("</rect>");
            }
            RenderCommand::DrawLine {
                from,
                to,
                color,
                width: line_width,
            } => {
                let _ = write!(
                    svg,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{line_width}"/>"#,
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    resolve_color(*color, dark),
                );
            }
            RenderCommand::DrawText {
                text,
                position,
                color,
                font_size,
                align,
            } => {
                let anchor = match align {
                    TextAlign::Left => "start",
                    TextAlign::Center => "middle",
                    TextAlign::Right => "end",
                };
                let _ = write!(
                    svg,
                    r#"<text x="{}" y="{}" fill="{}" font-size="{font_size}" text-anchor="{anchor}" dominant-baseline="central" style="pointer-events:none">{}</text>"#,
                    position.x,
                    position.y,
                    resolve_color(*color, dark),
                    escape_xml(text),
                );
            }
            // Clips and groups don't affect a static export of one frame.
            RenderCommand::SetClip { .. }
            | RenderCommand::ClearClip
            | RenderCommand::BeginGroup { .. }
            | RenderCommand::EndGroup => {}
        }
    }

    svg.push_str("</svg>");
    svg
}

fn resolve_color(token: ThemeToken, dark: bool) -> &'static str {
    if dark {
        match token {
            ThemeToken::NodeLabel => "#1a1a1a",
            ThemeToken::SelectionOutline => "#448aff",
            ThemeToken::TextPrimary | ThemeToken::ToolbarText | ThemeToken::TagText => "#ececec",
            ThemeToken::TextMuted => "#9e9e9e",
            ThemeToken::Background => "#181818",
            ThemeToken::Surface | ThemeToken::ToolbarBackground | ThemeToken::TooltipBackground => {
                "#242424"
            }
            ThemeToken::Border | ThemeToken::TooltipBorder => "#303030",
            ThemeToken::TagBackground => "#37474f",
        }
    } else {
        match token {
            ThemeToken::NodeLabel => "#1a1a1a",
            ThemeToken::SelectionOutline => "#1565c0",
            ThemeToken::TextPrimary | ThemeToken::ToolbarText | ThemeToken::TagText => "#1a1a2e",
            ThemeToken::TextMuted => "#666677",
            ThemeToken::Background => "#ffffff",
            ThemeToken::Surface | ThemeToken::ToolbarBackground | ThemeToken::TooltipBackground => {
                "#f8f9fa"
            }
            ThemeToken::Border | ThemeToken::TooltipBorder => "#dee2e6",
            ThemeToken::TagBackground => "#e3f2fd",
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_protocol::{Color, Point, Rect};

    #[test]
    fn basic_svg_output() {
        let commands = vec![RenderCommand::DrawRect {
            rect: Rect::new(10.0, 20.0, 100.0, 19.0),
            fill: Color::rgba(1.0, 0.0, 0.0, 1.0),
            border_color: Some(ThemeToken::SelectionOutline),
            label: Some("main".into()),
            frame_id: Some(1),
        }];
        let svg = render_svg(&commands, 800.0, 400.0, true);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<title>main</title>"));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r##"stroke="#448aff""##));
    }

    #[test]
    fn text_alignment_maps_to_anchor() {
        let commands = vec![RenderCommand::DrawText {
            position: Point::new(150.0, 20.0),
            text: "Loading…".into(),
            color: ThemeToken::TextMuted,
            font_size: 12.0,
            align: TextAlign::Center,
        }];
        let svg = render_svg(&commands, 300.0, 100.0, false);
        assert!(svg.contains(r#"text-anchor="middle""#));
        assert!(svg.contains("Loading…"));
    }

    #[test]
    fn escapes_xml_entities() {
        let commands = vec![RenderCommand::DrawRect {
            rect: Rect::new(0.0, 0.0, 200.0, 18.0),
            fill: Color::rgba(0.5, 0.5, 0.5, 1.0),
            border_color: None,
            label: Some("fn<T>(&self)".into()),
            frame_id: None,
        }];
        let svg = render_svg(&commands, 400.0, 100.0, false);
        assert!(svg.contains("fn&lt;T&gt;(&amp;self)"));
    }
}
