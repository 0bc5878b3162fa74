use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Stroke, StrokeKind};
use ember_protocol::{Color, RenderCommand, TextAlign};

use crate::theme::{self, ThemeMode};

fn to_color32(color: Color) -> Color32 {
    let [r, g, b, a] = color.to_rgba8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn to_rect(rect: &ember_protocol::Rect, offset: Pos2) -> Rect {
    Rect::from_min_size(
        Pos2::new(offset.x + rect.x as f32, offset.y + rect.y as f32),
        egui::vec2(rect.w as f32, rect.h as f32),
    )
}

/// Render a list of `RenderCommand` into an egui `Painter`.
///
/// `offset` is the screen position of canvas content coordinate (0, 0).
pub fn render_commands(
    painter: &mut egui::Painter,
    commands: &[RenderCommand],
    offset: Pos2,
    mode: ThemeMode,
) {
    let mut clip_stack: Vec<Rect> = Vec::new();

    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect, fill, border_color, ..
            } => {
                let egui_rect = to_rect(rect, offset);
                if egui_rect.width() < 0.5 || egui_rect.height() < 0.5 {
                    continue;
                }
                if !painter.clip_rect().intersects(egui_rect) {
                    continue;
                }

                painter.rect_filled(egui_rect, CornerRadius::ZERO, to_color32(*fill));

                if let Some(bc) = border_color {
                    painter.rect_stroke(
                        egui_rect,
                        CornerRadius::ZERO,
                        Stroke::new(2.0, theme::resolve(*bc, mode)),
                        StrokeKind::Inside,
                    );
                }
            }

            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                align,
            } => {
                let size = *font_size as f32;
                if size < 1.0 {
                    continue;
                }
                let anchor = match align {
                    TextAlign::Left => Align2::LEFT_CENTER,
                    TextAlign::Center => Align2::CENTER_CENTER,
                    TextAlign::Right => Align2::RIGHT_CENTER,
                };
                painter.text(
                    Pos2::new(offset.x + position.x as f32, offset.y + position.y as f32),
                    anchor,
                    text.as_str(),
                    FontId::monospace(size),
                    theme::resolve(*color, mode),
                );
            }

            RenderCommand::DrawLine {
                from,
                to,
                color,
                width,
            } => {
                let p1 = Pos2::new(offset.x + from.x as f32, offset.y + from.y as f32);
                let p2 = Pos2::new(offset.x + to.x as f32, offset.y + to.y as f32);
                painter.line_segment([p1, p2], Stroke::new(*width as f32, theme::resolve(*color, mode)));
            }

            RenderCommand::SetClip { rect } => {
                clip_stack.push(painter.clip_rect());
                let clip = painter.clip_rect().intersect(to_rect(rect, offset));
                painter.set_clip_rect(clip);
            }

            RenderCommand::ClearClip => {
                if let Some(prev) = clip_stack.pop() {
                    painter.set_clip_rect(prev);
                }
            }

            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {
                // Semantic only.
            }
        }
    }
}
