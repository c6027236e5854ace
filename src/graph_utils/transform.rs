// World <-> screen mapping, node hit-testing and the pointer gesture state machine.

use egui::{Pos2, Vec2};

use super::graph::{LocalId, MindmapGraph};
use super::text::{NodeMetrics, TextMeasure};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 2.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    zoom: f32,
    pub pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, pan: Vec2::ZERO }
    }
}

impl Viewport {
    pub fn new(zoom: f32, pan: Vec2) -> Self {
        let mut v = Self { zoom: 1.0, pan };
        v.set_zoom(zoom);
        v
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Clamp into `[MIN_ZOOM, MAX_ZOOM]`; non-finite input leaves zoom as is.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn world_to_screen(&self, p: Pos2) -> Pos2 {
        Pos2::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    pub fn screen_to_world(&self, p: Pos2) -> Pos2 {
        Pos2::new((p.x - self.pan.x) / self.zoom, (p.y - self.pan.y) / self.zoom)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom by `factor` keeping the world point under `anchor` (screen) fixed.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        let world = self.screen_to_world(anchor);
        self.set_zoom(self.zoom * factor);
        self.pan = anchor.to_vec2() - world.to_vec2() * self.zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Topmost node (last in draw order) whose measured circle contains the
/// screen point.
pub fn hit_test(
    graph: &MindmapGraph,
    viewport: &Viewport,
    metrics: &NodeMetrics,
    measure: &dyn TextMeasure,
    screen: Pos2,
) -> Option<LocalId> {
    let world = viewport.screen_to_world(screen);
    graph
        .nodes()
        .iter()
        .rev()
        .find(|n| n.pos.distance(world) <= metrics.radius_for(&n.label, measure))
        .map(|n| n.local_id)
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// `offset` is pointer world position minus node world position at grab time.
    Dragging { node: LocalId, offset: Vec2 },
    Panning { last: Pos2, moved: bool },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerDown {
    Node(LocalId),
    Background,
}

/// Turns raw pointer events into selection, node drags and panning.
#[derive(Clone, Debug, Default)]
pub struct PointerController {
    state: DragState,
}

impl PointerController {
    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dragging(&self) -> Option<LocalId> {
        match self.state {
            DragState::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        screen: Pos2,
        graph: &mut MindmapGraph,
        viewport: &Viewport,
        metrics: &NodeMetrics,
        measure: &dyn TextMeasure,
    ) -> PointerDown {
        match hit_test(graph, viewport, metrics, measure, screen) {
            Some(id) => {
                let node_pos = graph.get(id).map(|n| n.pos).unwrap_or_default();
                let offset = viewport.screen_to_world(screen) - node_pos;
                self.state = DragState::Dragging { node: id, offset };
                if let Err(e) = graph.select(Some(id)) {
                    log::debug!("select on grab: {}", e);
                }
                PointerDown::Node(id)
            }
            None => {
                self.state = DragState::Panning { last: screen, moved: false };
                PointerDown::Background
            }
        }
    }

    /// Returns true when the graph or viewport changed.
    pub fn pointer_move(&mut self, screen: Pos2, graph: &mut MindmapGraph, viewport: &mut Viewport) -> bool {
        match self.state {
            DragState::Idle => false,
            DragState::Dragging { node, offset } => {
                let target = viewport.screen_to_world(screen) - offset;
                if graph.set_position(node, target).is_err() {
                    // node vanished mid-gesture
                    self.state = DragState::Idle;
                    return false;
                }
                true
            }
            DragState::Panning { last, .. } => {
                let delta = screen - last;
                if delta == Vec2::ZERO {
                    return false;
                }
                viewport.pan_by(delta);
                self.state = DragState::Panning { last: screen, moved: true };
                true
            }
        }
    }

    /// Ends any gesture. A background press released without movement counts
    /// as a click and clears the selection.
    pub fn pointer_up(&mut self, graph: &mut MindmapGraph) {
        if let DragState::Panning { moved: false, .. } = self.state {
            if let Err(e) = graph.select(None) {
                log::debug!("clear selection: {}", e);
            }
        }
        self.state = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.state = DragState::Idle;
    }
}
