use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use egui::pos2;
use uuid::Uuid;

use mind_loom::api::generator::{ContentGenerator, GenerateRequest, OfflineGenerator};
use mind_loom::api::memory::MemoryStore;
use mind_loom::api::store::{StoreError, StoreNode, TreeStore};
use mind_loom::api::sync::{LoadOutcome, SyncAdapter, SyncError, SyncStatus, graph_from_store, graph_to_store};
use mind_loom::api::worker::{SyncEvent, SyncJob, SyncWorker};
use mind_loom::graph_utils::content::{ConceptRecord, ContentKind, ContentRecord, ContentStore};
use mind_loom::graph_utils::graph::{LocalId, MindmapGraph, MindmapId, NodePatch, NodeType, ServerId};
use mind_loom::graph_utils::text::{ApproxTextMeasure, NodeMetrics};

fn mindmap() -> MindmapId {
    MindmapId(Uuid::now_v7())
}

fn stored(id: ServerId, title: &str, parent: Option<ServerId>) -> StoreNode {
    StoreNode {
        id: Some(id),
        title: title.to_string(),
        content: String::new(),
        node_type: NodeType::Concept,
        position_x: 0.0,
        position_y: 0.0,
        width: 64.0,
        height: 64.0,
        parent_node_id: parent,
        level: 0,
        client_key: None,
        parent_client_key: None,
    }
}

fn sid() -> ServerId {
    ServerId(Uuid::now_v7())
}

// root -> a -> b, root -> c; all unsaved
fn three_levels(g: &mut MindmapGraph) -> (LocalId, LocalId, LocalId) {
    let root = g.root();
    let a = g.add_node(root, NodeType::Concept).expect("a");
    let b = g.add_node(a, NodeType::Formula).expect("b");
    let c = g.add_node(root, NodeType::Exercise).expect("c");
    g.update_node(b, NodePatch { label: Some("Chain rule".into()), ..Default::default() }).expect("label");
    (a, b, c)
}

#[tokio::test]
async fn missing_mindmap_starts_fresh_without_warning() {
    let store = MemoryStore::new();
    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    let outcome = sync.load(&store, &mut g).await.expect("load");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 1, fell_back: true, .. }));
    assert_eq!(sync.status(), &SyncStatus::Loaded);
    assert!(sync.load_warning().is_none());
    assert_eq!(g.node_count(), 1);
    assert!(sync.can_save());
}

#[tokio::test]
async fn failed_first_load_leaves_an_unsaveable_placeholder() {
    let store = MemoryStore::new();
    store.fail_loads_with(Some(StoreError::Unauthorized("bad key".into())));
    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    let outcome = sync.load(&store, &mut g).await.expect("load");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 1, fell_back: true, .. }));
    assert!(sync.load_warning().is_some_and(|w| w.contains("bad key")));
    assert!(g.validate_tree().is_ok());

    // the placeholder must not overwrite whatever the store really holds
    assert!(sync.holds_placeholder());
    assert!(!sync.can_save());
    assert_eq!(sync.begin_save(&g).unwrap_err(), SyncError::Unconfirmed);
    assert_eq!(store.save_calls(), 0);

    sync.start_new();
    assert!(sync.can_save());
    assert!(sync.load_warning().is_none());
}

#[tokio::test]
async fn successful_retry_replaces_the_placeholder() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut seed_sync = SyncAdapter::new(map);
    let mut seed = MindmapGraph::default();
    seed_sync.load(&store, &mut seed).await.expect("seed load");
    three_levels(&mut seed);
    seed_sync.save(&store, &mut seed).await.expect("seed save");

    store.fail_loads_with(Some(StoreError::Transport("timeout".into())));
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("failed load");
    assert!(sync.holds_placeholder());
    let scratch = g.add_node(g.root(), NodeType::Concept).expect("edit the placeholder");
    assert_eq!(sync.load(&store, &mut g).await.expect("failed again"), LoadOutcome::Kept);
    assert!(g.contains(scratch));
    assert!(sync.holds_placeholder());

    store.fail_loads_with(None);
    let outcome = sync.load(&store, &mut g).await.expect("retry");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 4, fell_back: false, .. }));
    assert!(!sync.holds_placeholder());
    assert!(sync.can_save());
}

#[tokio::test]
async fn failed_reload_keeps_the_loaded_tree() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    three_levels(&mut g);
    sync.save(&store, &mut g).await.expect("save");
    assert_eq!(g.node_count(), 4);
    let before = g.clone();

    store.fail_loads_with(Some(StoreError::Transport("timeout".into())));
    let outcome = sync.load(&store, &mut g).await.expect("reload");
    assert_eq!(outcome, LoadOutcome::Kept);
    assert_eq!(g.nodes(), before.nodes());
    assert!(sync.load_warning().is_some_and(|w| w.contains("timeout")));
    assert_eq!(sync.status(), &SyncStatus::Loaded);
    assert!(!sync.holds_placeholder());

    // saving after the failed reload still writes the whole tree
    store.fail_loads_with(None);
    sync.save(&store, &mut g).await.expect("save again");
    assert_eq!(store.snapshot(map).len(), 4);
    assert_eq!(g.node_count(), 4);
    assert!(sync.load_warning().is_none());
}

#[tokio::test]
async fn save_then_reload_assigns_server_ids_and_keeps_shape() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("initial load");
    let root = g.root();
    let (a, b, c) = three_levels(&mut g);

    let outcome = sync.save(&store, &mut g).await.expect("save");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 4, fell_back: false, repaired: 0 }));
    assert_eq!(sync.status(), &SyncStatus::Loaded);

    // local identity survives the round trip
    for id in [root, a, b, c] {
        let n = g.get(id).expect("node kept its local id");
        assert!(n.server_id.is_some(), "{} has no server id", id);
    }
    assert_eq!(g.get(a).and_then(|n| n.parent), Some(root));
    assert_eq!(g.get(b).and_then(|n| n.parent), Some(a));
    assert_eq!(g.get(c).and_then(|n| n.parent), Some(root));
    assert_eq!(g.get(b).map(|n| n.level), Some(2));
    assert_eq!(g.get(b).map(|n| n.label.as_str()), Some("Chain rule"));
    assert!(g.validate_tree().is_ok());

    let snap = store.snapshot(map);
    assert_eq!(snap.len(), 4);
    assert_eq!(snap.iter().filter(|n| n.parent_node_id.is_none()).count(), 1);
    let mut levels: Vec<u32> = snap.iter().map(|n| n.level).collect();
    levels.sort();
    assert_eq!(levels, vec![0, 1, 1, 2]);

    // saving again updates in place
    let ids_before: Vec<_> = g.nodes().iter().map(|n| n.server_id).collect();
    sync.save(&store, &mut g).await.expect("second save");
    let ids_after: Vec<_> = g.nodes().iter().map(|n| n.server_id).collect();
    assert_eq!(ids_before, ids_after);
    assert_eq!(store.snapshot(map).len(), 4);
    assert_eq!(store.save_calls(), 2);
}

#[tokio::test]
async fn positions_are_saved_in_world_coordinates() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    let root = g.root();
    g.set_position(root, pos2(-120.5, 33.25)).expect("move");
    sync.save(&store, &mut g).await.expect("save");
    let snap = store.snapshot(map);
    assert_eq!(snap.len(), 1);
    assert_eq!((snap[0].position_x, snap[0].position_y), (-120.5, 33.25));
    assert_eq!(g.get(root).map(|n| n.pos), Some(pos2(-120.5, 33.25)));
}

#[tokio::test]
async fn failed_save_keeps_graph_and_can_be_retried() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    let (a, ..) = three_levels(&mut g);

    store.fail_next_saves(1);
    let before = g.clone();
    let err = sync.save(&store, &mut g).await.unwrap_err();
    assert!(matches!(err, SyncError::SaveFailed(_)));
    assert!(matches!(sync.status(), SyncStatus::SaveFailed { .. }));
    assert_eq!(g.nodes(), before.nodes(), "a failed save leaves the model alone");
    assert!(store.snapshot(map).is_empty());
    assert!(sync.can_save());

    sync.save(&store, &mut g).await.expect("retry");
    assert_eq!(store.snapshot(map).len(), 4);
    assert!(g.get(a).is_some_and(|n| n.server_id.is_some()));
}

#[test]
fn acknowledging_a_save_error_returns_to_loaded() {
    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    let ticket = sync.begin_load(&g).expect("begin load");
    sync.finish_load(ticket, Err(StoreError::NotFound), &mut g);
    sync.begin_save(&g).expect("begin save");
    assert!(sync.finish_save(Err(StoreError::Status(500, "boom".into()))).is_err());
    sync.acknowledge_error();
    assert_eq!(sync.status(), &SyncStatus::Loaded);
}

#[test]
fn stale_load_results_are_discarded() {
    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    let first = sync.begin_load(&g).expect("first");
    let second = sync.begin_load(&g).expect("second");

    let root = sid();
    let old = vec![stored(root, "old", None), stored(sid(), "old child", Some(root))];
    assert_eq!(sync.finish_load(first, Ok(old), &mut g), LoadOutcome::Stale);
    assert_eq!(g.node_count(), 1);
    assert_eq!(sync.status(), &SyncStatus::Loading);

    let fresh = vec![stored(root, "new", None)];
    assert!(matches!(sync.finish_load(second, Ok(fresh), &mut g), LoadOutcome::Applied { nodes: 1, .. }));
    assert_eq!(g.get(g.root()).map(|n| n.label.as_str()), Some("new"));
}

#[tokio::test]
async fn edits_made_while_saving_survive_the_follow_up_load() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    let root = g.root();
    let (a, ..) = three_levels(&mut g);

    let plan = sync.begin_save(&g).expect("begin save");
    // edits land while the request is on the wire
    let late = g.add_node(a, NodeType::Concept).expect("late child");
    g.update_node(root, NodePatch { label: Some("Calculus".into()), ..Default::default() }).expect("rename");
    let saved = store.save(plan.mindmap, &plan.nodes).await;
    sync.finish_save(saved).expect("finish save");

    let ticket = sync.begin_load(&g).expect("begin load");
    let fetched = store.load(ticket.mindmap).await;
    let outcome = sync.finish_load(ticket, fetched, &mut g);
    assert_eq!(outcome, LoadOutcome::Merged { absorbed: 4 });

    assert!(g.contains(late), "node added during the save was dropped");
    assert_eq!(g.get(late).and_then(|n| n.server_id), None);
    assert_eq!(g.get(root).map(|n| n.label.as_str()), Some("Calculus"));
    assert!(g.get(a).is_some_and(|n| n.server_id.is_some()));
    assert!(g.validate_tree().is_ok());

    // the next save stores the late edits without duplicating saved nodes
    sync.save(&store, &mut g).await.expect("second save");
    let snap = store.snapshot(map);
    assert_eq!(snap.len(), 5);
    assert!(snap.iter().any(|n| n.title == "Calculus" && n.parent_node_id.is_none()));
    assert!(g.get(late).is_some_and(|n| n.server_id.is_some()));
}

#[tokio::test]
async fn edits_made_during_a_reload_are_not_overwritten() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    three_levels(&mut g);
    sync.save(&store, &mut g).await.expect("save");

    let ticket = sync.begin_load(&g).expect("begin reload");
    let extra = g.add_node(g.root(), NodeType::Formula).expect("extra");
    let fetched = store.load(ticket.mindmap).await;
    assert_eq!(sync.finish_load(ticket, fetched, &mut g), LoadOutcome::Merged { absorbed: 0 });
    assert!(g.contains(extra));
    assert_eq!(g.node_count(), 5);

    // an untouched graph is replaced by the store copy as usual
    let outcome = sync.load(&store, &mut g).await.expect("plain reload");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 4, .. }));
}

#[tokio::test]
async fn saved_tree_opens_intact_in_a_new_session() {
    let store = MemoryStore::new();
    let map = mindmap();
    let mut sync = SyncAdapter::new(map);
    let mut g = MindmapGraph::default();
    sync.load(&store, &mut g).await.expect("load");
    let (a, b, c) = three_levels(&mut g);
    g.set_position(b, pos2(512.0, -64.5)).expect("move b");
    sync.save(&store, &mut g).await.expect("save");
    let sid_of = |g: &MindmapGraph, id: LocalId| g.get(id).and_then(|n| n.server_id).expect("server id");
    let (sa, sb, sc, sroot) = (sid_of(&g, a), sid_of(&g, b), sid_of(&g, c), sid_of(&g, g.root()));

    let mut fresh_sync = SyncAdapter::new(map);
    let mut fresh = MindmapGraph::default();
    let outcome = fresh_sync.load(&store, &mut fresh).await.expect("fresh load");
    assert!(matches!(outcome, LoadOutcome::Applied { nodes: 4, fell_back: false, repaired: 0 }));
    assert!(fresh.validate_tree().is_ok());
    assert_eq!(fresh.get(fresh.root()).and_then(|n| n.server_id), Some(sroot));

    let node = |sid: ServerId| fresh.find_by_server_id(sid).expect("stored node").clone();
    let (na, nb, nc) = (node(sa), node(sb), node(sc));
    assert_eq!(na.parent, Some(fresh.root()));
    assert_eq!(nb.parent, Some(na.local_id));
    assert_eq!(nc.parent, Some(fresh.root()));
    assert_eq!((na.level, nb.level, nc.level), (1, 2, 1));
    assert_eq!(nb.label, "Chain rule");
    assert_eq!(nb.node_type, NodeType::Formula);
    assert_eq!(nc.node_type, NodeType::Exercise);
    assert_eq!(nb.pos, pos2(512.0, -64.5));
    assert_eq!(fresh.derive_edges().len(), 3);
}

#[test]
fn save_and_load_are_mutually_exclusive() {
    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    assert_eq!(sync.begin_save(&g).unwrap_err(), SyncError::NotLoaded);

    let ticket = sync.begin_load(&g).expect("load");
    assert_eq!(sync.begin_save(&g).unwrap_err(), SyncError::LoadInFlight);
    sync.finish_load(ticket, Err(StoreError::NotFound), &mut g);

    sync.begin_save(&g).expect("save");
    assert!(!sync.can_load());
    assert_eq!(sync.begin_load(&g).unwrap_err(), SyncError::SaveInFlight);
    assert_eq!(sync.begin_save(&g).unwrap_err(), SyncError::SaveInFlight);
}

#[test]
fn unsaved_parents_are_referenced_by_client_key() {
    let mut g = MindmapGraph::default();
    let (a, b, _) = three_levels(&mut g);
    let out = graph_to_store(&g);
    assert_eq!(out.len(), 4);
    let row_b = out.iter().find(|n| n.title == "Chain rule").expect("b row");
    assert!(row_b.id.is_none());
    assert!(row_b.parent_node_id.is_none());
    assert_eq!(row_b.parent_client_key.as_deref(), Some(a.0.to_string().as_str()));
    assert_eq!(row_b.client_key.as_deref(), Some(b.0.to_string().as_str()));
    assert_eq!(out.iter().filter(|n| n.parent_node_id.is_none() && n.parent_client_key.is_none()).count(), 1);
}

#[test]
fn saved_size_follows_refreshed_label_radius() {
    let mut g = MindmapGraph::default();
    let (_, b, _) = three_levels(&mut g);
    g.update_node(b, NodePatch { label: Some("Fundamental theorem of calculus".into()), ..Default::default() })
        .expect("long label");
    let metrics = NodeMetrics::default();
    let measure = ApproxTextMeasure::default();
    g.refresh_radii(&metrics, &measure);
    let expected = metrics.radius_for("Fundamental theorem of calculus", &measure);
    assert!(expected > metrics.base_radius);

    let row = graph_to_store(&g).into_iter().find(|n| n.client_key.as_deref() == Some(b.0.to_string().as_str())).expect("row");
    assert_eq!(row.width, (expected * 2.0) as f64);
    assert_eq!(row.height, row.width);
}

#[test]
fn malformed_store_data_is_repaired_into_a_tree() {
    let root = sid();
    let a = sid();
    let b = sid();
    let c = sid();
    let d = sid();
    let mut nameless = stored(sid(), "no id", Some(root));
    nameless.id = None;
    let fetched = vec![
        stored(root, "root", None),
        stored(a, "a", Some(root)),
        stored(b, "dangling", Some(sid())),
        stored(c, "cycle c", Some(d)),
        stored(d, "cycle d", Some(c)),
        nameless,
        stored(a, "duplicate a", Some(root)),
    ];
    let (g, repaired) = graph_from_store(fetched, &MindmapGraph::default(), "Central Topic", pos2(0.0, 0.0));
    assert_eq!(g.node_count(), 5);
    assert_eq!(repaired, 2);
    assert!(g.validate_tree().is_ok());
    assert_eq!(g.get(g.root()).map(|n| n.label.as_str()), Some("root"));
    let dangling = g.find_by_server_id(b).expect("dangling kept");
    assert_eq!(dangling.parent, Some(g.root()));
    assert_eq!(g.find_by_server_id(a).map(|n| n.label.as_str()), Some("a"));
}

#[test]
fn reload_keeps_local_ids_of_known_nodes() {
    let root = sid();
    let child = sid();
    let rows = || vec![stored(root, "root", None), stored(child, "child", Some(root))];
    let (first, _) = graph_from_store(rows(), &MindmapGraph::default(), "Central Topic", pos2(0.0, 0.0));
    let (second, _) = graph_from_store(rows(), &first, "Central Topic", pos2(0.0, 0.0));
    let ids = |g: &MindmapGraph| -> Vec<(LocalId, Option<ServerId>)> {
        g.nodes().iter().map(|n| (n.local_id, n.server_id)).collect()
    };
    assert_eq!(ids(&first), ids(&second));

    // a node new to this client gets a fresh id above everything seen so far
    let newcomer = sid();
    let mut more = rows();
    more.push(stored(newcomer, "new", Some(child)));
    let (third, _) = graph_from_store(more, &second, "Central Topic", pos2(0.0, 0.0));
    let fresh = third.find_by_server_id(newcomer).map(|n| n.local_id).expect("newcomer");
    assert!(second.nodes().iter().all(|n| n.local_id.0 < fresh.0));
}

struct CannedGenerator;

#[async_trait]
impl ContentGenerator for CannedGenerator {
    async fn generate(&self, _kind: ContentKind, request: &GenerateRequest) -> Result<Vec<ContentRecord>, StoreError> {
        Ok((0..request.count)
            .map(|i| {
                ContentRecord::Concept(ConceptRecord {
                    title: format!("{} #{}", request.topic, i + 1),
                    description: String::new(),
                })
            })
            .collect())
    }
}

fn wait_for_events(worker: &SyncWorker, want: usize) -> Vec<SyncEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut got = Vec::new();
    while got.len() < want && Instant::now() < deadline {
        got.extend(worker.poll());
        std::thread::sleep(Duration::from_millis(10));
    }
    got
}

#[test]
fn worker_runs_jobs_off_thread_and_wakes_the_gui() {
    let store: Arc<dyn TreeStore> = Arc::new(MemoryStore::new());
    let repaints = Arc::new(AtomicUsize::new(0));
    let counter = repaints.clone();
    let worker = SyncWorker::spawn(store, Arc::new(CannedGenerator), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .expect("spawn worker");

    let mut sync = SyncAdapter::new(mindmap());
    let mut g = MindmapGraph::default();
    worker.submit(SyncJob::Load(sync.begin_load(&g).expect("ticket"))).expect("submit load");
    let events = wait_for_events(&worker, 1);
    assert_eq!(events.len(), 1);
    for ev in events {
        let SyncEvent::Loaded { ticket, result } = ev else { panic!("expected a load event") };
        assert_eq!(result, Err(StoreError::NotFound));
        assert!(matches!(sync.finish_load(ticket, result, &mut g), LoadOutcome::Applied { .. }));
    }
    assert!(repaints.load(Ordering::SeqCst) >= 1);

    let node = g.root();
    let request = GenerateRequest {
        node_id: sid(),
        topic: "Limits".into(),
        count: 2,
        difficulty: None,
        cognitive_level: None,
    };
    worker
        .submit(SyncJob::Generate { node, kind: ContentKind::Concepts, request })
        .expect("submit generate");
    let mut content = ContentStore::new();
    for ev in wait_for_events(&worker, 1) {
        let SyncEvent::Generated { node: target, result, .. } = ev else { panic!("expected a generate event") };
        content.attach(target, result.expect("generated"));
    }
    assert_eq!(content.count(node), 2);
}

#[tokio::test]
async fn offline_generator_reports_missing_backend() {
    let request = GenerateRequest {
        node_id: sid(),
        topic: "Limits".into(),
        count: 1,
        difficulty: None,
        cognitive_level: None,
    };
    let err = OfflineGenerator.generate(ContentKind::Formulas, &request).await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

#[test]
fn generate_request_wire_format() {
    let request = GenerateRequest {
        node_id: ServerId(Uuid::nil()),
        topic: "Limits".into(),
        count: 3,
        difficulty: Some(mind_loom::api::generator::Difficulty::Hard),
        cognitive_level: None,
    };
    let v = serde_json::to_value(&request).expect("encode");
    assert_eq!(v["nodeId"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(v["difficulty"], "HARD");
    assert!(v.get("cognitiveLevel").is_none());
}
