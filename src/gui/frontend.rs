#![allow(clippy::collapsible_if)]
use std::collections::HashSet;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};

use super::painter::{EguiTextMeasure, paint};
use super::render::{RenderStyle, Scene, render};
use crate::api::generator::{Difficulty, GenerateRequest};
use crate::api::store::StoreError;
use crate::api::sync::{LoadOutcome, SyncAdapter, SyncStatus};
use crate::api::worker::{SyncEvent, SyncJob, SyncWorker};
use crate::api::{self, Backend};
use crate::graph_utils::content::{ContentKind, ContentStore};
use crate::graph_utils::graph::{DEFAULT_ROOT_LABEL, GraphError, LocalId, MindmapGraph, MindmapId, NodePatch, NodeType};
use crate::graph_utils::layout::{apply_radial_layout, fit_view};
use crate::graph_utils::text::TextMeasure;
use crate::graph_utils::transform::{DragState, PointerController, PointerDown, Viewport};
use crate::persistence::settings::AppSettings;

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Prominent,
}

pub struct MindmapApp {
    graph: MindmapGraph,
    viewport: Viewport,
    pointer: PointerController,
    content: ContentStore,
    sync: SyncAdapter,
    worker: Option<SyncWorker>,
    backend_label: String,
    settings: AppSettings,
    style: RenderStyle,
    started: Instant,
    canvas_size: Vec2,
    fit_pending: bool,
    // editor buffers for the selected node
    edit_for: Option<LocalId>,
    edit_label: String,
    edit_content: String,
    gen_topic: String,
    gen_count: u32,
    gen_difficulty: Option<Difficulty>,
    gen_pending: HashSet<LocalId>,
    // transient notices
    last_error: Option<String>,
    last_info: Option<String>,
    last_info_time: Option<Instant>,
    last_info_style: NoticeStyle,
}

impl MindmapApp {
    pub fn new(ctx: &egui::Context, settings: AppSettings, mindmap: MindmapId) -> Self {
        let backend = match api::backend_from_settings(&settings) {
            Ok(b) => b,
            Err(e) => {
                log::error!("backend setup failed, running offline: {:#}", e);
                api::offline_backend()
            }
        };
        let Backend { store, generator, describe } = backend;
        let repaint_ctx = ctx.clone();
        let worker = match SyncWorker::spawn(store, generator, move || repaint_ctx.request_repaint()) {
            Ok(w) => Some(w),
            Err(e) => {
                log::error!("sync worker failed to start: {:#}", e);
                None
            }
        };
        let anchor = settings.layout.anchor();
        let gen_count = settings.generate_count.max(1);
        let mut app = Self {
            graph: MindmapGraph::default(),
            viewport: Viewport::default(),
            pointer: PointerController::default(),
            content: ContentStore::new(),
            sync: SyncAdapter::new(mindmap).with_new_root(DEFAULT_ROOT_LABEL, anchor),
            worker,
            backend_label: describe,
            settings,
            style: RenderStyle::default(),
            started: Instant::now(),
            canvas_size: Vec2::new(800.0, 600.0),
            fit_pending: true,
            edit_for: None,
            edit_label: String::new(),
            edit_content: String::new(),
            gen_topic: String::new(),
            gen_count,
            gen_difficulty: None,
            gen_pending: HashSet::new(),
            last_error: None,
            last_info: None,
            last_info_time: None,
            last_info_style: NoticeStyle::Subtle,
        };
        log::info!("opening mindmap {} via {}", mindmap, app.backend_label);
        app.start_load();
        app
    }

    fn notify(&mut self, msg: impl Into<String>, style: NoticeStyle) {
        self.last_info = Some(msg.into());
        self.last_info_time = Some(Instant::now());
        self.last_info_style = style;
    }

    fn submit(&self, job: SyncJob) -> Result<(), String> {
        match &self.worker {
            Some(w) => w.submit(job).map_err(|e| e.to_string()),
            None => Err("sync worker is not running".to_string()),
        }
    }

    fn start_load(&mut self) {
        let ticket = match self.sync.begin_load(&self.graph) {
            Ok(t) => t,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return;
            }
        };
        if let Err(msg) = self.submit(SyncJob::Load(ticket.clone())) {
            // apply the failure right away so the editor still gets a root
            let outcome = self.sync.finish_load(ticket, Err(StoreError::Transport(msg)), &mut self.graph);
            self.after_load(outcome);
        }
    }

    fn start_save(&mut self) {
        let plan = match self.sync.begin_save(&self.graph) {
            Ok(p) => p,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return;
            }
        };
        if let Err(msg) = self.submit(SyncJob::Save(plan)) {
            if let Err(e) = self.sync.finish_save(Err(StoreError::Transport(msg))) {
                log::debug!("{}", e);
            }
        }
    }

    fn after_load(&mut self, outcome: LoadOutcome) {
        let (nodes, fell_back, repaired) = match outcome {
            LoadOutcome::Applied { nodes, fell_back, repaired } => (nodes, fell_back, repaired),
            LoadOutcome::Merged { absorbed } => {
                log::debug!("kept local edits, {} node(s) now stored", absorbed);
                self.notify("Kept changes made while saving; save again to store them", NoticeStyle::Subtle);
                return;
            }
            LoadOutcome::Kept => {
                if let Some(w) = self.sync.load_warning() {
                    let w = w.to_string();
                    self.notify(w, NoticeStyle::Subtle);
                }
                return;
            }
            LoadOutcome::Stale => return,
        };
        self.content.retain_nodes(&self.graph);
        self.gen_pending.retain(|id| self.graph.contains(*id));
        self.pointer.pointer_leave();
        self.edit_for = None;
        if let Some(w) = self.sync.load_warning() {
            let w = w.to_string();
            self.notify(w, NoticeStyle::Subtle);
        } else if repaired > 0 {
            self.notify(format!("Loaded {} node(s), repaired {} link(s)", nodes, repaired), NoticeStyle::Subtle);
        } else if fell_back {
            self.notify("New mindmap", NoticeStyle::Subtle);
        }
    }

    fn on_event(&mut self, ev: SyncEvent) {
        match ev {
            SyncEvent::Loaded { ticket, result } => {
                let outcome = self.sync.finish_load(ticket, result, &mut self.graph);
                self.after_load(outcome);
            }
            SyncEvent::Saved { result } => match self.sync.finish_save(result) {
                Ok(()) => {
                    let fmt = time::macros::format_description!("[hour]:[minute]:[second]");
                    let stamp = time::OffsetDateTime::now_utc().format(&fmt).unwrap_or_else(|_| "now".into());
                    self.notify(format!("Saved at {} UTC", stamp), NoticeStyle::Prominent);
                    self.last_error = None;
                    self.start_load();
                }
                Err(e) => log::debug!("{}", e),
            },
            SyncEvent::Generated { node, kind, result } => {
                self.gen_pending.remove(&node);
                match result {
                    Ok(records) if self.graph.contains(node) => {
                        let added = self.content.attach(node, records);
                        self.notify(format!("Added {} {}", added, kind.path_segment()), NoticeStyle::Prominent);
                    }
                    Ok(_) => log::debug!("dropping generated content for removed node {}", node),
                    Err(e) => self.last_error = Some(format!("Generation failed: {}", e)),
                }
            }
        }
    }

    fn canvas_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, self.canvas_size)
    }

    fn fit(&mut self) {
        let canvas = self.canvas_rect();
        fit_view(&self.graph, &mut self.viewport, canvas, self.settings.layout.fit_padding);
    }

    fn auto_layout(&mut self) {
        apply_radial_layout(&mut self.graph, &self.settings.layout);
        self.fit();
    }

    fn add_child(&mut self, node_type: NodeType) {
        let parent = self.graph.selected().unwrap_or(self.graph.root());
        match self.graph.add_node(parent, node_type) {
            Ok(id) => {
                if let Err(e) = self.graph.select(Some(id)) {
                    log::debug!("select after add: {}", e);
                }
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.graph.selected() else { return };
        match self.graph.delete_node(id) {
            Ok(removed) => {
                self.content.remove_all(&removed);
                self.notify(format!("Deleted {} node(s)", removed.len()), NoticeStyle::Subtle);
            }
            Err(GraphError::RootDeletionForbidden) => {
                self.notify("The central topic cannot be deleted", NoticeStyle::Subtle);
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    fn sync_edit_buffers(&mut self) {
        let selected = self.graph.selected();
        if selected == self.edit_for {
            return;
        }
        self.edit_for = selected;
        if let Some(n) = selected.and_then(|id| self.graph.get(id)) {
            self.edit_label = n.label.clone();
            self.edit_content = n.content.clone();
            self.gen_topic = n.label.clone();
        }
    }

    fn start_generate(&mut self, node: LocalId) {
        let Some(n) = self.graph.get(node) else { return };
        let Some(node_id) = n.server_id else {
            self.notify("Save the mindmap before generating content", NoticeStyle::Subtle);
            return;
        };
        let kind = ContentKind::for_node_type(n.node_type);
        let topic = if self.gen_topic.trim().is_empty() { n.label.clone() } else { self.gen_topic.trim().to_string() };
        let request = GenerateRequest {
            node_id,
            topic,
            count: self.gen_count.max(1),
            difficulty: self.gen_difficulty,
            cognitive_level: None,
        };
        match self.submit(SyncJob::Generate { node, kind, request }) {
            Ok(()) => {
                self.gen_pending.insert(node);
            }
            Err(msg) => self.last_error = Some(msg),
        }
    }

    fn status_text(&self) -> String {
        match self.sync.status() {
            SyncStatus::Idle => "idle".into(),
            SyncStatus::Loading => "loading…".into(),
            SyncStatus::Loaded if self.sync.holds_placeholder() => "not loaded".into(),
            SyncStatus::Loaded => "ready".into(),
            SyncStatus::Saving => "saving…".into(),
            SyncStatus::SaveFailed { .. } => "save failed".into(),
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let text_focused = ctx.memory(|m| m.focused().is_some());
        if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S))) {
            if self.sync.can_save() {
                self.start_save();
            }
        }
        if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Num0))) {
            self.fit();
        }
        if !text_focused && ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            self.delete_selected();
        }

        ui.horizontal(|ui| {
            ui.label("Mind-Loom");
            ui.separator();
            for t in NodeType::CREATABLE {
                if ui.button(format!("{} {}", RenderStyle::glyph_for(t), t.display_name())).clicked() {
                    self.add_child(t);
                }
            }
            let can_delete = self.graph.selected().is_some_and(|id| id != self.graph.root());
            if ui.add_enabled(can_delete, egui::Button::new("Delete")).clicked() {
                self.delete_selected();
            }
            ui.separator();
            if ui.button("Auto layout").clicked() {
                self.auto_layout();
            }
            if ui.add(egui::Button::new("Fit view").shortcut_text(ctx.format_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Num0)))).clicked() {
                self.fit();
            }
            ui.separator();
            let save_btn = egui::Button::new("Save").shortcut_text(ctx.format_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S)));
            if ui.add_enabled(self.sync.can_save(), save_btn).clicked() {
                self.start_save();
            }
            if ui.add_enabled(self.sync.can_load(), egui::Button::new("Reload")).clicked() {
                self.start_load();
            }
            if self.sync.holds_placeholder() {
                let start_new = ui
                    .button("Start new")
                    .on_hover_text("The stored mindmap could not be loaded. Saving this one replaces it.");
                if start_new.clicked() {
                    self.sync.start_new();
                    self.notify("New mindmap", NoticeStyle::Subtle);
                }
            }
            ui.separator();
            ui.small(format!(
                "{:.0}% | N:{} | {} | {}",
                self.viewport.zoom() * 100.0,
                self.graph.node_count(),
                self.status_text(),
                self.backend_label
            ));
            if let Some(err) = &self.last_error {
                ui.separator();
                ui.colored_label(Color32::RED, err);
            }
        });
    }

    fn editor_panel(&mut self, ui: &mut egui::Ui) {
        let Some(id) = self.graph.selected() else {
            ui.label("Select a node to edit it.");
            ui.small("Drag nodes to move them, drag the background to pan, scroll to zoom.");
            return;
        };
        let Some(node) = self.graph.get(id).cloned() else { return };

        ui.heading(format!("{} {}", RenderStyle::glyph_for(node.node_type), node.node_type.display_name()));
        ui.small(match node.server_id {
            Some(sid) => format!("{} · level {}", sid, node.level),
            None => format!("unsaved · level {}", node.level),
        });
        ui.separator();

        ui.label("Label");
        if ui.text_edit_singleline(&mut self.edit_label).changed() {
            let patch = NodePatch { label: Some(self.edit_label.clone()), ..Default::default() };
            if let Err(e) = self.graph.update_node(id, patch) {
                self.last_error = Some(e.to_string());
            }
        }
        ui.label("Notes");
        if ui.text_edit_multiline(&mut self.edit_content).changed() {
            let patch = NodePatch { content: Some(self.edit_content.clone()), ..Default::default() };
            if let Err(e) = self.graph.update_node(id, patch) {
                self.last_error = Some(e.to_string());
            }
        }

        if id != self.graph.root() {
            let mut node_type = node.node_type;
            egui::ComboBox::from_label("Type")
                .selected_text(node_type.display_name())
                .show_ui(ui, |ui| {
                    for t in NodeType::CREATABLE {
                        ui.selectable_value(&mut node_type, t, t.display_name());
                    }
                });
            if node_type != node.node_type {
                let patch = NodePatch { node_type: Some(node_type), ..Default::default() };
                if let Err(e) = self.graph.update_node(id, patch) {
                    self.last_error = Some(e.to_string());
                }
            }

            let current_parent = node.parent;
            let mut new_parent = current_parent;
            let parent_label = current_parent
                .and_then(|p| self.graph.get(p))
                .map(|p| p.label.clone())
                .unwrap_or_default();
            egui::ComboBox::from_label("Parent")
                .selected_text(parent_label)
                .show_ui(ui, |ui| {
                    for candidate in self.graph.nodes() {
                        if self.graph.is_descendant_or_self(candidate.local_id, id) {
                            continue;
                        }
                        ui.selectable_value(&mut new_parent, Some(candidate.local_id), candidate.label.as_str());
                    }
                });
            if new_parent != current_parent {
                let patch = NodePatch { parent: new_parent, ..Default::default() };
                if let Err(e) = self.graph.update_node(id, patch) {
                    self.last_error = Some(e.to_string());
                }
            }
        }

        ui.separator();
        self.content_section(ui, id);
        ui.separator();
        self.generate_section(ui, id, node.node_type);
    }

    fn content_section(&self, ui: &mut egui::Ui, id: LocalId) {
        let Some(c) = self.content.get(id).filter(|c| !c.is_empty()) else {
            ui.small("No attached content.");
            return;
        };
        egui::CollapsingHeader::new(format!("Content ({})", c.len()))
            .default_open(true)
            .show(ui, |ui| {
                for r in &c.concepts {
                    ui.label(egui::RichText::new(r.title.as_str()).strong());
                    if !r.description.is_empty() {
                        ui.small(r.description.as_str());
                    }
                }
                for r in &c.formulas {
                    ui.label(egui::RichText::new(r.name.as_str()).strong());
                    ui.monospace(r.expression.as_str());
                    if !r.explanation.is_empty() {
                        ui.small(r.explanation.as_str());
                    }
                }
                for r in &c.exercises {
                    ui.label(r.question.as_str());
                    if let Some(d) = &r.difficulty {
                        ui.small(d.as_str());
                    }
                }
                for r in &c.examples {
                    ui.label(egui::RichText::new(r.title.as_str()).strong());
                    ui.small(r.body.as_str());
                }
            });
    }

    fn generate_section(&mut self, ui: &mut egui::Ui, id: LocalId, node_type: NodeType) {
        let kind = ContentKind::for_node_type(node_type);
        ui.label(format!("Generate {}", kind.path_segment()));
        ui.horizontal(|ui| {
            ui.label("Topic");
            ui.text_edit_singleline(&mut self.gen_topic);
        });
        ui.horizontal(|ui| {
            ui.label("Count");
            ui.add(egui::DragValue::new(&mut self.gen_count).range(1..=20));
            egui::ComboBox::from_id_salt("gen_difficulty")
                .selected_text(match self.gen_difficulty {
                    None => "any",
                    Some(Difficulty::Easy) => "easy",
                    Some(Difficulty::Medium) => "medium",
                    Some(Difficulty::Hard) => "hard",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.gen_difficulty, None, "any");
                    ui.selectable_value(&mut self.gen_difficulty, Some(Difficulty::Easy), "easy");
                    ui.selectable_value(&mut self.gen_difficulty, Some(Difficulty::Medium), "medium");
                    ui.selectable_value(&mut self.gen_difficulty, Some(Difficulty::Hard), "hard");
                });
        });
        let pending = self.gen_pending.contains(&id);
        let saved = self.graph.get(id).is_some_and(|n| n.server_id.is_some());
        let label = if pending { "Generating…" } else { "Generate" };
        if ui.add_enabled(!pending && saved, egui::Button::new(label)).clicked() {
            self.start_generate(id);
        }
        if !saved {
            ui.small("Save first; generation needs a stored node.");
        }
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, resp: &egui::Response, origin: Vec2, measure: &dyn TextMeasure) {
        let (pressed, released, press_pos, latest, scroll) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
                i.pointer.latest_pos(),
                i.raw_scroll_delta.y,
            )
        });
        let metrics = self.settings.metrics;
        if pressed && resp.hovered() {
            if let Some(p) = press_pos {
                if let PointerDown::Node(id) = self.pointer.pointer_down(p - origin, &mut self.graph, &self.viewport, &metrics, measure) {
                    log::trace!("grabbed {}", id);
                }
            }
        }
        if self.pointer.state() != DragState::Idle {
            match latest {
                Some(p) => {
                    if self.pointer.pointer_move(p - origin, &mut self.graph, &mut self.viewport) {
                        ui.ctx().request_repaint();
                    }
                }
                None => self.pointer.pointer_leave(),
            }
        }
        if released {
            self.pointer.pointer_up(&mut self.graph);
        }
        // Zoom with scroll only when pointer is over the canvas area
        if resp.hovered() && scroll != 0.0 {
            if let Some(p) = resp.hover_pos() {
                let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                self.viewport.zoom_at(factor, p - origin);
            }
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        let resp = ui.allocate_rect(rect, Sense::click_and_drag());
        let origin = rect.min.to_vec2();
        let painter = ui.painter_at(rect);
        let measure = EguiTextMeasure::new(&painter);
        self.canvas_size = rect.size();

        self.graph.refresh_radii(&self.settings.metrics, &measure);
        if self.fit_pending && matches!(self.sync.status(), SyncStatus::Loaded) {
            self.fit();
            self.fit_pending = false;
        }
        self.handle_pointer(ui, &resp, origin, &measure);

        let ambient_time = self.settings.ambient_motion.then(|| self.started.elapsed().as_secs_f64());
        let scene = Scene {
            graph: &self.graph,
            viewport: &self.viewport,
            selection: self.graph.selected(),
            content: &self.content,
            metrics: &self.settings.metrics,
            canvas: rect.size(),
            ambient_time,
        };
        let commands = render(&scene, &self.style, &measure);
        paint(&painter, origin, &commands);

        if matches!(self.sync.status(), SyncStatus::Loading) && self.fit_pending {
            painter.text(rect.center(), egui::Align2::CENTER_CENTER, "Loading…", egui::FontId::proportional(18.0), Color32::from_gray(200));
        }
        if ambient_time.is_some() {
            ui.ctx().request_repaint_after(Duration::from_millis(33));
        }
    }

    fn save_error_window(&mut self, ctx: &egui::Context) {
        let SyncStatus::SaveFailed { message } = self.sync.status() else { return };
        let message = message.clone();
        let mut retry = false;
        let mut dismiss = false;
        egui::Area::new("save_error_toast".into())
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 48.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .corner_radius(egui::CornerRadius::same(8))
                    .stroke(Stroke { width: 1.5, color: Color32::from_rgb(200, 80, 80) })
                    .inner_margin(egui::Margin::symmetric(12, 8))
                    .show(ui, |ui| {
                        ui.colored_label(Color32::from_rgb(255, 120, 120), format!("Save failed: {}", message));
                        ui.horizontal(|ui| {
                            retry = ui.button("Retry").clicked();
                            dismiss = ui.button("Dismiss").clicked();
                        });
                    });
            });
        if retry {
            self.start_save();
        } else if dismiss {
            self.sync.acknowledge_error();
        }
    }

    fn info_toast(&self, ctx: &egui::Context) {
        // Bottom-right transient info toast (visible for 3 seconds)
        let (Some(msg), Some(when)) = (&self.last_info, self.last_info_time) else { return };
        if Instant::now().duration_since(when) > Duration::from_secs(3) {
            return;
        }
        let margin = egui::vec2(12.0, 12.0);
        egui::Area::new("bottom_right_toast".into())
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-margin.x, -margin.y))
            .interactable(false)
            .show(ctx, |ui| {
                let (fill, stroke_col, stroke_w, text_col, inner_margin) = match self.last_info_style {
                    NoticeStyle::Subtle => (
                        Color32::from_rgba_premultiplied(20, 20, 20, 170),
                        Color32::from_gray(60),
                        0.5,
                        Color32::from_gray(200),
                        egui::Margin::symmetric(8, 6),
                    ),
                    NoticeStyle::Prominent => (
                        Color32::from_rgba_premultiplied(30, 30, 30, 230),
                        Color32::from_gray(100),
                        1.5,
                        Color32::LIGHT_GREEN,
                        egui::Margin::symmetric(12, 8),
                    ),
                };
                egui::Frame::popup(ui.style())
                    .corner_radius(egui::CornerRadius::same(8))
                    .stroke(Stroke { width: stroke_w, color: stroke_col })
                    .fill(fill)
                    .inner_margin(inner_margin)
                    .show(ui, |ui| match self.last_info_style {
                        NoticeStyle::Subtle => {
                            ui.small(egui::RichText::new(msg).color(text_col));
                        }
                        NoticeStyle::Prominent => {
                            ui.colored_label(text_col, msg);
                        }
                    });
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl eframe::App for MindmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let events = self.worker.as_ref().map(SyncWorker::poll).unwrap_or_default();
        for ev in events {
            self.on_event(ev);
        }
        self.sync_edit_buffers();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ctx, ui);
        });
        egui::SidePanel::right("node_editor")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.editor_panel(ui));
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.canvas(ui));

        self.save_error_window(ctx);
        self.info_toast(ctx);
    }
}
