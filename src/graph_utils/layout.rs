use std::collections::{BTreeMap, HashMap};
use std::f32::consts::{FRAC_PI_2, TAU};

use egui::{Pos2, Rect, Vec2, pos2};
use serde::{Deserialize, Serialize};

use super::graph::{LocalId, MindmapGraph};
use super::transform::Viewport;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialLayoutConfig {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub base_radius_per_level: f32,
    /// Minimum arc length between neighbours on the same ring.
    pub min_arc_spacing: f32,
    pub fit_padding: f32,
}

impl Default for RadialLayoutConfig {
    fn default() -> Self {
        Self {
            anchor_x: 400.0,
            anchor_y: 300.0,
            base_radius_per_level: 220.0,
            min_arc_spacing: 140.0,
            fit_padding: 60.0,
        }
    }
}

impl RadialLayoutConfig {
    pub fn anchor(&self) -> Pos2 {
        pos2(self.anchor_x, self.anchor_y)
    }

    /// Ring radius for `level` holding `count` nodes.
    pub fn ring_radius(&self, level: u32, count: usize) -> f32 {
        let by_level = self.base_radius_per_level * level as f32;
        let by_crowding = (count as f32 * self.min_arc_spacing) / TAU;
        by_level.max(by_crowding)
    }
}

/// Angle of slot `i` of `n` on a ring, starting at 12 o'clock.
pub fn slot_angle(i: usize, n: usize) -> f32 {
    -FRAC_PI_2 + TAU * i as f32 / n.max(1) as f32
}

/// Positions for every node on concentric rings around the anchor. Within a
/// ring nodes follow their parent's slot order, then model order.
pub fn compute_radial_positions(graph: &MindmapGraph, cfg: &RadialLayoutConfig) -> HashMap<LocalId, Pos2> {
    let anchor = cfg.anchor();
    let mut out: HashMap<LocalId, Pos2> = HashMap::with_capacity(graph.node_count());
    out.insert(graph.root(), anchor);

    let mut by_level: BTreeMap<u32, Vec<(usize, LocalId, Option<LocalId>)>> = BTreeMap::new();
    for (model_idx, n) in graph.nodes().iter().enumerate() {
        if n.local_id == graph.root() {
            continue;
        }
        by_level.entry(n.level).or_default().push((model_idx, n.local_id, n.parent));
    }

    let mut slot_of: HashMap<LocalId, usize> = HashMap::new();
    slot_of.insert(graph.root(), 0);

    for (level, mut members) in by_level {
        members.sort_by_key(|(model_idx, _, parent)| {
            let parent_slot = parent.and_then(|p| slot_of.get(&p).copied()).unwrap_or(usize::MAX);
            (parent_slot, *model_idx)
        });
        let n = members.len();
        let radius = cfg.ring_radius(level, n);
        for (i, (_, id, _)) in members.iter().enumerate() {
            let angle = slot_angle(i, n);
            out.insert(*id, anchor + Vec2::angled(angle) * radius);
            slot_of.insert(*id, i);
        }
    }
    out
}

/// Place every node radially around the anchor. Deterministic: running it
/// twice without other edits yields the same positions.
pub fn apply_radial_layout(graph: &mut MindmapGraph, cfg: &RadialLayoutConfig) {
    let targets = compute_radial_positions(graph, cfg);
    for (id, pos) in graph.positions_mut() {
        if let Some(p) = targets.get(&id) {
            *pos = *p;
        }
    }
    log::debug!("radial layout placed {} node(s)", targets.len());
}

/// Stepped zoom target by node count, so fit results are predictable.
pub fn target_zoom_for(node_count: usize) -> f32 {
    match node_count {
        0..=10 => 1.0,
        11..=25 => 0.8,
        26..=50 => 0.6,
        51..=100 => 0.45,
        _ => 0.3,
    }
}

/// World-space box around all nodes, each expanded by its radius, plus padding.
pub fn content_bounds(graph: &MindmapGraph, padding: f32) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for n in graph.nodes() {
        let r = Rect::from_center_size(n.pos, Vec2::splat(n.radius_hint * 2.0));
        bounds = Some(match bounds {
            Some(b) => b.union(r),
            None => r,
        });
    }
    bounds.map(|b| b.expand(padding))
}

/// Center the whole graph in `canvas` (screen rect) at the stepped zoom, or
/// smaller if that is needed for everything to be visible.
pub fn fit_view(graph: &MindmapGraph, viewport: &mut Viewport, canvas: Rect, padding: f32) {
    let Some(bounds) = content_bounds(graph, padding) else {
        viewport.reset();
        return;
    };
    let fit_x = canvas.width() / bounds.width().max(1.0);
    let fit_y = canvas.height() / bounds.height().max(1.0);
    let zoom = target_zoom_for(graph.node_count()).min(fit_x).min(fit_y);
    viewport.set_zoom(zoom);
    viewport.pan = canvas.center().to_vec2() - bounds.center().to_vec2() * viewport.zoom();
}
