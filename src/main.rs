use eframe::egui;
use uuid::Uuid;

use mind_loom::graph_utils::graph::MindmapId;
use mind_loom::gui::frontend::MindmapApp;
use mind_loom::persistence::settings::AppSettings;

fn main() -> eframe::Result {
    env_logger::init();
    let settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        let mut s = AppSettings::default();
        s.apply_env(|k| std::env::var(k).ok());
        s
    });

    // First CLI argument wins, then settings/env, else a brand new mindmap
    let mindmap = std::env::args()
        .nth(1)
        .and_then(|arg| match arg.parse::<MindmapId>() {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("ignoring mindmap argument {:?}: {}", arg, e);
                None
            }
        })
        .or(settings.default_mindmap)
        .unwrap_or_else(|| MindmapId(Uuid::now_v7()));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 760.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Mind-Loom",
        options,
        Box::new(move |cc| Ok(Box::new(MindmapApp::new(&cc.egui_ctx, settings, mindmap)) as Box<dyn eframe::App>)),
    )
}
