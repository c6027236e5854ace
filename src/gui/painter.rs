use egui::{Align2, Color32, FontId, Painter, Pos2, Shape, Stroke, Vec2};

use super::render::DrawCommand;
use crate::graph_utils::text::TextMeasure;

const CURVE_SEGMENTS: usize = 16;

/// Measures text with the fonts egui will actually draw with.
pub struct EguiTextMeasure<'a> {
    painter: &'a Painter,
}

impl<'a> EguiTextMeasure<'a> {
    pub fn new(painter: &'a Painter) -> Self {
        Self { painter }
    }
}

impl TextMeasure for EguiTextMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        self.painter
            .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
            .size()
            .x
    }
}

/// Replay `commands`. Command positions are canvas-local; `origin` is the
/// canvas' top-left corner in window coordinates.
pub fn paint(painter: &Painter, origin: Vec2, commands: &[DrawCommand]) {
    let clip = painter.clip_rect();
    for cmd in commands {
        match cmd {
            DrawCommand::Clear { color } => {
                painter.rect_filled(clip, 0.0, *color);
            }
            DrawCommand::Circle { center, radius, fill, stroke } => {
                painter.circle_filled(*center + origin, *radius, *fill);
                if let Some(s) = stroke {
                    painter.circle_stroke(*center + origin, *radius, *s);
                }
            }
            DrawCommand::Curve { from, ctrl, to, stroke } => {
                painter.add(Shape::line(sample_quadratic(*from + origin, *ctrl + origin, *to + origin), *stroke));
            }
            DrawCommand::Text { pos, text, size, color } => {
                if *size >= 4.0 {
                    painter.text(*pos + origin, Align2::CENTER_CENTER, text, FontId::proportional(*size), *color);
                }
            }
            DrawCommand::Glyph { center, glyph, size, color } => {
                if *size >= 4.0 {
                    painter.text(*center + origin, Align2::CENTER_CENTER, *glyph, FontId::proportional(*size), *color);
                }
            }
            DrawCommand::Badge { center, radius, count, fill, color } => {
                let center = *center + origin;
                painter.circle_filled(center, *radius, *fill);
                painter.circle_stroke(center, *radius, Stroke::new(1.0, Color32::BLACK));
                let label = if *count > 99 { "99+".to_string() } else { count.to_string() };
                painter.text(center, Align2::CENTER_CENTER, label, FontId::proportional(*radius * 1.1), *color);
            }
        }
    }
}

fn sample_quadratic(a: Pos2, c: Pos2, b: Pos2) -> Vec<Pos2> {
    (0..=CURVE_SEGMENTS)
        .map(|i| {
            let t = i as f32 / CURVE_SEGMENTS as f32;
            let u = 1.0 - t;
            Pos2::new(
                u * u * a.x + 2.0 * u * t * c.x + t * t * b.x,
                u * u * a.y + 2.0 * u * t * c.y + t * t * b.y,
            )
        })
        .collect()
}
