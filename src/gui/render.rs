//! Frame construction as data.
//!
//! `render` turns the current graph, viewport and selection into an ordered
//! list of [`DrawCommand`]s in screen space. It holds no state between frames,
//! so a frame can be compared in tests without any drawing surface; the egui
//! backend in `painter` replays the list.

use egui::{Color32, Pos2, Stroke, Vec2};

use crate::graph_utils::content::ContentStore;
use crate::graph_utils::graph::{LocalId, MindmapGraph, NodeType};
use crate::graph_utils::text::{NodeMetrics, TextMeasure, wrap_label};
use crate::graph_utils::transform::Viewport;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear { color: Color32 },
    Circle { center: Pos2, radius: f32, fill: Color32, stroke: Option<Stroke> },
    /// Quadratic Bézier from `from` to `to` bent towards `ctrl`.
    Curve { from: Pos2, ctrl: Pos2, to: Pos2, stroke: Stroke },
    Text { pos: Pos2, text: String, size: f32, color: Color32 },
    Glyph { center: Pos2, glyph: &'static str, size: f32, color: Color32 },
    Badge { center: Pos2, radius: f32, count: usize, fill: Color32, color: Color32 },
}

#[derive(Clone, Debug)]
pub struct RenderStyle {
    pub background: Color32,
    pub ambient: Color32,
    pub ambient_blobs: usize,
    pub edge: Stroke,
    pub edge_curvature: f32,
    pub node_stroke: Stroke,
    pub selected_stroke: Stroke,
    pub text: Color32,
    pub badge_fill: Color32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(0x16, 0x18, 0x22),
            ambient: Color32::from_rgba_premultiplied(40, 60, 110, 28),
            ambient_blobs: 6,
            edge: Stroke::new(1.8, Color32::from_rgb(0x8a, 0x94, 0xb0)),
            edge_curvature: 0.12,
            node_stroke: Stroke::new(1.5, Color32::from_rgb(0x2a, 0x2e, 0x3c)),
            selected_stroke: Stroke::new(3.5, Color32::from_rgb(255, 200, 80)),
            text: Color32::WHITE,
            badge_fill: Color32::from_rgb(0xe0, 0x4f, 0x5f),
        }
    }
}

impl RenderStyle {
    pub fn fill_for(node_type: NodeType) -> Color32 {
        match node_type {
            NodeType::Concept => Color32::from_rgb(0x3b, 0x6e, 0xd8),
            NodeType::Formula => Color32::from_rgb(0x8e, 0x4f, 0xc9),
            NodeType::Exercise => Color32::from_rgb(0x2f, 0x9e, 0x6a),
            NodeType::Example => Color32::from_rgb(0xc9, 0x84, 0x2f),
        }
    }

    pub fn glyph_for(node_type: NodeType) -> &'static str {
        match node_type {
            NodeType::Concept => "💡",
            NodeType::Formula => "∑",
            NodeType::Exercise => "✏",
            NodeType::Example => "📘",
        }
    }
}

pub struct Scene<'a> {
    pub graph: &'a MindmapGraph,
    pub viewport: &'a Viewport,
    pub selection: Option<LocalId>,
    pub content: &'a ContentStore,
    pub metrics: &'a NodeMetrics,
    /// Screen-space canvas size, used by the ambient decoration.
    pub canvas: Vec2,
    /// Seconds since the editor opened; `None` disables the ambient decoration.
    pub ambient_time: Option<f64>,
}

pub fn render(scene: &Scene<'_>, style: &RenderStyle, measure: &dyn TextMeasure) -> Vec<DrawCommand> {
    let mut out = Vec::with_capacity(2 + scene.graph.node_count() * 5);
    out.push(DrawCommand::Clear { color: style.background });
    if let Some(t) = scene.ambient_time {
        draw_ambient(&mut out, scene.canvas, t, style);
    }
    draw_edges(&mut out, scene, style);
    draw_nodes(&mut out, scene, style, measure);
    out
}

// Slow drifting blobs; a pure function of time so they never touch layout or hit-testing.
fn draw_ambient(out: &mut Vec<DrawCommand>, canvas: Vec2, t: f64, style: &RenderStyle) {
    let min_side = canvas.x.min(canvas.y).max(1.0);
    for i in 0..style.ambient_blobs {
        let k = i as f64;
        let phase = t * (0.05 + 0.013 * k) + k * 1.7;
        let x = (0.5 + 0.4 * (phase * 1.3).sin()) as f32 * canvas.x;
        let y = (0.5 + 0.4 * (phase * 0.9 + k).cos()) as f32 * canvas.y;
        out.push(DrawCommand::Circle {
            center: Pos2::new(x, y),
            radius: min_side * (0.08 + 0.02 * (i % 3) as f32),
            fill: style.ambient,
            stroke: None,
        });
    }
}

fn draw_edges(out: &mut Vec<DrawCommand>, scene: &Scene<'_>, style: &RenderStyle) {
    let zoom = scene.viewport.zoom();
    let stroke = Stroke::new((style.edge.width * zoom).max(0.75), style.edge.color);
    for edge in scene.graph.derive_edges() {
        let (Some(src), Some(dst)) = (scene.graph.get(edge.source), scene.graph.get(edge.target)) else {
            continue;
        };
        let a = scene.viewport.world_to_screen(src.pos);
        let b = scene.viewport.world_to_screen(dst.pos);
        out.push(DrawCommand::Curve { from: a, ctrl: edge_control_point(a, b, style.edge_curvature), to: b, stroke });
    }
}

/// Midpoint pushed sideways along the perpendicular of a→b by `curvature * |ab|`.
pub fn edge_control_point(a: Pos2, b: Pos2, curvature: f32) -> Pos2 {
    let dir = b - a;
    let len = dir.length();
    let mid = a + dir * 0.5;
    if len <= f32::EPSILON {
        return mid;
    }
    mid + dir.rot90().normalized() * (len * curvature)
}

fn draw_nodes(out: &mut Vec<DrawCommand>, scene: &Scene<'_>, style: &RenderStyle, measure: &dyn TextMeasure) {
    let zoom = scene.viewport.zoom();
    let metrics = scene.metrics;
    for node in scene.graph.nodes() {
        let radius_world = metrics.radius_for(&node.label, measure);
        let center = scene.viewport.world_to_screen(node.pos);
        let radius = radius_world * zoom;
        let selected = scene.selection == Some(node.local_id);
        let stroke = if selected {
            style.selected_stroke
        } else {
            Stroke::new(style.node_stroke.width * zoom.max(0.5), style.node_stroke.color)
        };
        out.push(DrawCommand::Circle {
            center,
            radius,
            fill: RenderStyle::fill_for(node.node_type),
            stroke: Some(stroke),
        });

        let font = metrics.font_size * zoom;
        let lines = wrap_label(
            &node.label,
            metrics.wrap_width(radius_world),
            metrics.font_size,
            metrics.max_lines,
            measure,
        );
        let line_h = font * 1.2;
        let block_h = line_h * lines.len() as f32;
        out.push(DrawCommand::Glyph {
            center: Pos2::new(center.x, center.y - block_h * 0.5 - font * 0.6),
            glyph: RenderStyle::glyph_for(node.node_type),
            size: font * 0.9,
            color: style.text,
        });
        let first_y = center.y - block_h * 0.5 + line_h * 0.5;
        for (i, line) in lines.into_iter().enumerate() {
            out.push(DrawCommand::Text {
                pos: Pos2::new(center.x, first_y + line_h * i as f32),
                text: line,
                size: font,
                color: style.text,
            });
        }

        let count = scene.content.count(node.local_id);
        if count > 0 {
            let offset = Vec2::angled(-std::f32::consts::FRAC_PI_4) * radius;
            out.push(DrawCommand::Badge {
                center: center + offset,
                radius: (9.0 * zoom).max(6.0),
                count,
                fill: style.badge_fill,
                color: style.text,
            });
        }
    }
}
