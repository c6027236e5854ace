// Label measurement and wrapping shared by hit-testing, layout fitting and rendering.

use serde::{Deserialize, Serialize};

pub trait TextMeasure {
    /// Width in points of `text` laid out on a single line.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Font-free approximation: every glyph is `em_ratio * font_size` wide.
#[derive(Copy, Clone, Debug)]
pub struct ApproxTextMeasure {
    pub em_ratio: f32,
}

impl Default for ApproxTextMeasure {
    fn default() -> Self {
        Self { em_ratio: 0.55 }
    }
}

impl TextMeasure for ApproxTextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.em_ratio
    }
}

/// Sizing rules for circular nodes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub base_radius: f32,
    pub padding: f32,
    pub max_radius: f32,
    pub font_size: f32,
    pub max_lines: usize,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self { base_radius: 32.0, padding: 14.0, max_radius: 90.0, font_size: 14.0, max_lines: 4 }
    }
}

impl NodeMetrics {
    /// World-space radius: half the label width plus padding, kept within
    /// `[base_radius, max_radius]`.
    pub fn radius_for(&self, label: &str, measure: &dyn TextMeasure) -> f32 {
        let half = measure.text_width(label.trim(), self.font_size) * 0.5;
        (half + self.padding).clamp(self.base_radius, self.max_radius.max(self.base_radius))
    }

    /// Line width available for the label inside a node of `radius`.
    pub fn wrap_width(&self, radius: f32) -> f32 {
        (radius * 2.0 - self.padding * 2.0).max(self.font_size)
    }
}

/// Greedy word wrap. Words longer than a line are split by characters; if
/// more than `max_lines` are needed the last kept line ends with an ellipsis.
pub fn wrap_label(
    text: &str,
    max_width: f32,
    font_size: f32,
    max_lines: usize,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() { word.to_string() } else { format!("{} {}", current, word) };
        if measure.text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure.text_width(word, font_size) <= max_width {
            current = word.to_string();
            continue;
        }
        // break an over-long word
        for ch in word.chars() {
            current.push(ch);
            if measure.text_width(&current, font_size) > max_width && current.chars().count() > 1 {
                let overflow = current.pop();
                lines.push(std::mem::take(&mut current));
                if let Some(c) = overflow {
                    current.push(c);
                }
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if max_lines > 0 && lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && measure.text_width(&format!("{}…", last), font_size) > max_width {
                last.pop();
            }
            last.push('…');
        }
    }
    lines
}
