//! Bridges the editable graph and the tree store.
//!
//! The store only knows parent pointers keyed by server ids; the editor only
//! uses local ids. Conversion happens here and nowhere else. Loads and saves
//! are split into `begin_*`/`finish_*` halves so the GUI can run the network
//! part on the worker and apply results on its own thread; a generation
//! counter makes late answers from superseded loads harmless.
//!
//! Local edits win over the store: a load that finds the graph edited since
//! its baseline only absorbs server ids, and a failed load never replaces a
//! graph that came from the store.

use std::collections::{HashMap, HashSet};

use egui::{Pos2, pos2};
use thiserror::Error;

use super::store::{StoreError, StoreNode, TreeStore};
use crate::graph_utils::graph::{
    DEFAULT_ROOT_LABEL, LocalId, MindNode, MindmapGraph, MindmapId, ServerId,
};
use crate::graph_utils::text::NodeMetrics;

#[derive(Clone, Debug, PartialEq)]
pub enum SyncStatus {
    Idle,
    Loading,
    Loaded,
    Saving,
    SaveFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("a load is still in progress")]
    LoadInFlight,
    #[error("a save is still in progress")]
    SaveInFlight,
    #[error("nothing has been loaded yet")]
    NotLoaded,
    #[error("save failed: {0}")]
    SaveFailed(String),
    #[error("the mindmap could not be loaded; reload or start a new one before saving")]
    Unconfirmed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub mindmap: MindmapId,
    generation: u64,
    // graph revision the store answer is known to match
    base_revision: u64,
}

#[derive(Clone, Debug)]
pub struct SavePlan {
    pub mindmap: MindmapId,
    pub nodes: Vec<StoreNode>,
    pub revision: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The graph was replaced. `fell_back` is set when the store had nothing
    /// usable and a fresh root was created instead.
    Applied { nodes: usize, fell_back: bool, repaired: usize },
    /// The graph was edited after the load baseline. Local nodes were kept
    /// and `absorbed` of them picked up their server id.
    Merged { absorbed: usize },
    /// The load failed after a tree had already been loaded; the graph was
    /// left untouched and a warning set.
    Kept,
    /// A newer load started after this one; the result was discarded.
    Stale,
}

pub struct SyncAdapter {
    mindmap: MindmapId,
    status: SyncStatus,
    generation: u64,
    root_label: String,
    root_center: Pos2,
    load_warning: Option<String>,
    loaded_once: bool,
    placeholder: bool,
    saving_revision: Option<u64>,
    saved_revision: Option<u64>,
}

impl SyncAdapter {
    pub fn new(mindmap: MindmapId) -> Self {
        Self {
            mindmap,
            status: SyncStatus::Idle,
            generation: 0,
            root_label: DEFAULT_ROOT_LABEL.to_string(),
            root_center: pos2(400.0, 300.0),
            load_warning: None,
            loaded_once: false,
            placeholder: false,
            saving_revision: None,
            saved_revision: None,
        }
    }

    /// Label and position used for the root of a brand-new mindmap.
    pub fn with_new_root(mut self, label: impl Into<String>, center: Pos2) -> Self {
        self.root_label = label.into();
        self.root_center = center;
        self
    }

    pub fn mindmap(&self) -> MindmapId { self.mindmap }
    pub fn status(&self) -> &SyncStatus { &self.status }

    /// Set when the last load failed for a reason other than "not found".
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    /// True while the graph is a stand-in root created because the first
    /// load failed. Saving it would overwrite whatever the store holds.
    pub fn holds_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn can_load(&self) -> bool {
        !matches!(self.status, SyncStatus::Saving)
    }

    pub fn can_save(&self) -> bool {
        !self.placeholder && matches!(self.status, SyncStatus::Loaded | SyncStatus::SaveFailed { .. })
    }

    /// Accept the placeholder root as a new mindmap, enabling saves.
    pub fn start_new(&mut self) {
        if self.placeholder {
            log::info!("starting mindmap {} from scratch after a failed load", self.mindmap);
            self.placeholder = false;
            self.loaded_once = true;
            self.load_warning = None;
        }
    }

    pub fn begin_load(&mut self, graph: &MindmapGraph) -> Result<LoadTicket, SyncError> {
        if matches!(self.status, SyncStatus::Saving) {
            return Err(SyncError::SaveInFlight);
        }
        self.generation += 1;
        self.status = SyncStatus::Loading;
        // after a save the store holds the save snapshot, not the current graph
        let base_revision = self.saved_revision.take().unwrap_or(graph.revision());
        log::info!("loading mindmap {} (generation {})", self.mindmap, self.generation);
        Ok(LoadTicket { mindmap: self.mindmap, generation: self.generation, base_revision })
    }

    /// Apply a load result.
    ///
    /// A failure before anything was loaded leaves a placeholder root (a
    /// fresh root without warning if the store said "not found"). A failure
    /// later keeps the graph as is. A success replaces the graph, unless it was edited
    /// after the ticket's baseline, in which case only server ids are
    /// absorbed.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<StoreNode>, StoreError>,
        graph: &mut MindmapGraph,
    ) -> LoadOutcome {
        if ticket.generation != self.generation || ticket.mindmap != self.mindmap {
            log::debug!("dropping stale load (generation {}, current {})", ticket.generation, self.generation);
            return LoadOutcome::Stale;
        }

        self.status = SyncStatus::Loaded;
        let fetched = match result {
            Ok(nodes) => nodes,
            Err(StoreError::NotFound) => {
                log::info!("mindmap {} has no nodes yet", self.mindmap);
                Vec::new()
            }
            Err(e) if self.loaded_once || self.placeholder => {
                log::warn!("reload of {} failed, keeping the current graph: {}", self.mindmap, e);
                self.load_warning = Some(format!("Could not reload mindmap: {}", e));
                return LoadOutcome::Kept;
            }
            Err(e) => {
                log::warn!("load of {} failed, starting with a placeholder root: {}", self.mindmap, e);
                self.load_warning = Some(format!("Could not load mindmap: {}", e));
                self.placeholder = true;
                *graph = MindmapGraph::with_root_from(graph.next_id_hint(), self.root_label.clone(), self.root_center);
                return LoadOutcome::Applied { nodes: 1, fell_back: true, repaired: 0 };
            }
        };
        self.load_warning = None;
        self.placeholder = false;

        if self.loaded_once && graph.revision() != ticket.base_revision {
            let absorbed = absorb_server_ids(&fetched, graph);
            log::info!(
                "graph of {} changed while loading; kept local edits, absorbed {} server id(s)",
                self.mindmap,
                absorbed
            );
            return LoadOutcome::Merged { absorbed };
        }

        let (built, repaired) = graph_from_store(fetched, graph, &self.root_label, self.root_center);
        let fell_back = built.node_count() == 1 && built.get(built.root()).is_some_and(|r| r.server_id.is_none());
        let nodes = built.node_count();
        *graph = built;
        self.loaded_once = true;
        LoadOutcome::Applied { nodes, fell_back, repaired }
    }

    pub fn begin_save(&mut self, graph: &MindmapGraph) -> Result<SavePlan, SyncError> {
        match self.status {
            SyncStatus::Loading => return Err(SyncError::LoadInFlight),
            SyncStatus::Saving => return Err(SyncError::SaveInFlight),
            SyncStatus::Idle => return Err(SyncError::NotLoaded),
            SyncStatus::Loaded | SyncStatus::SaveFailed { .. } => {}
        }
        if self.placeholder {
            return Err(SyncError::Unconfirmed);
        }
        self.status = SyncStatus::Saving;
        let nodes = graph_to_store(graph);
        let revision = graph.revision();
        self.saving_revision = Some(revision);
        log::info!("saving {} node(s) to mindmap {}", nodes.len(), self.mindmap);
        Ok(SavePlan { mindmap: self.mindmap, nodes, revision })
    }

    /// On success the caller should reload so unsaved nodes pick up their
    /// server ids. Failure is recorded and can be retried.
    pub fn finish_save(&mut self, result: Result<(), StoreError>) -> Result<(), SyncError> {
        match result {
            Ok(()) => {
                self.status = SyncStatus::Loaded;
                self.saved_revision = self.saving_revision.take();
                Ok(())
            }
            Err(e) => {
                self.saving_revision = None;
                let message = e.to_string();
                log::warn!("save of mindmap {} failed: {}", self.mindmap, message);
                self.status = SyncStatus::SaveFailed { message: message.clone() };
                Err(SyncError::SaveFailed(message))
            }
        }
    }

    /// Dismiss a save failure notice.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.status, SyncStatus::SaveFailed { .. }) {
            self.status = SyncStatus::Loaded;
        }
    }

    pub async fn load(&mut self, store: &dyn TreeStore, graph: &mut MindmapGraph) -> Result<LoadOutcome, SyncError> {
        let ticket = self.begin_load(graph)?;
        let result = store.load(ticket.mindmap).await;
        Ok(self.finish_load(ticket, result, graph))
    }

    /// Save the whole graph, then reload to absorb server-assigned ids.
    pub async fn save(&mut self, store: &dyn TreeStore, graph: &mut MindmapGraph) -> Result<LoadOutcome, SyncError> {
        let plan = self.begin_save(graph)?;
        let result = store.save(plan.mindmap, &plan.nodes).await;
        self.finish_save(result)?;
        self.load(store, graph).await
    }
}

/// Store shape of every node. Parent references are always re-derived from
/// the current in-model parent; positions are world coordinates.
pub fn graph_to_store(graph: &MindmapGraph) -> Vec<StoreNode> {
    graph
        .nodes()
        .iter()
        .map(|n| {
            let parent = n.parent.and_then(|p| graph.get(p));
            let parent_node_id = parent.and_then(|p| p.server_id);
            let parent_client_key = match (parent, parent_node_id) {
                (Some(p), None) => Some(client_key(p.local_id)),
                _ => None,
            };
            StoreNode {
                id: n.server_id,
                title: n.label.clone(),
                content: n.content.clone(),
                node_type: n.node_type,
                position_x: n.pos.x as f64,
                position_y: n.pos.y as f64,
                width: (n.radius_hint * 2.0) as f64,
                height: (n.radius_hint * 2.0) as f64,
                parent_node_id,
                level: n.level,
                client_key: Some(client_key(n.local_id)),
                parent_client_key,
            }
        })
        .collect()
}

fn client_key(id: LocalId) -> String {
    id.0.to_string()
}

/// Give unsaved local nodes the server id the store assigned to their client
/// key. Nodes, links and positions are otherwise left alone. Returns how many
/// nodes were updated.
pub fn absorb_server_ids(fetched: &[StoreNode], graph: &mut MindmapGraph) -> usize {
    let mut absorbed = 0usize;
    for sn in fetched {
        let Some(sid) = sn.id else { continue };
        if graph.find_by_server_id(sid).is_some() {
            continue;
        }
        let Some(local) = sn.client_key.as_deref().and_then(|k| k.parse::<u64>().ok()).map(LocalId) else {
            continue;
        };
        if graph.get(local).is_some_and(|n| n.server_id.is_none()) && graph.assign_server_id(local, sid).is_ok() {
            absorbed += 1;
        }
    }
    absorbed
}

/// Build a graph from store nodes, keeping local ids of nodes `previous`
/// already knew (by server id, or by echoed client key for unsaved nodes).
/// Broken parent links, extra roots and cycles are re-attached to the root.
/// Returns the graph and the number of repaired links.
pub fn graph_from_store(
    fetched: Vec<StoreNode>,
    previous: &MindmapGraph,
    root_label: &str,
    root_center: Pos2,
) -> (MindmapGraph, usize) {
    let mut next = previous.next_id_hint();
    let mut seen: HashSet<ServerId> = HashSet::new();
    let mut used: HashSet<LocalId> = HashSet::new();
    let mut rows: Vec<(LocalId, ServerId, StoreNode)> = Vec::with_capacity(fetched.len());

    for sn in fetched {
        let Some(sid) = sn.id else {
            log::warn!("skipping stored node without id: {:?}", sn.title);
            continue;
        };
        if !seen.insert(sid) {
            log::warn!("skipping duplicate stored node {}", sid);
            continue;
        }
        let by_server = previous.find_by_server_id(sid).map(|n| n.local_id);
        let by_key = sn
            .client_key
            .as_deref()
            .and_then(|k| k.parse::<u64>().ok())
            .map(LocalId)
            .filter(|id| previous.get(*id).is_some_and(|n| n.server_id.is_none()));
        let local = match by_server.or(by_key) {
            Some(id) if !used.contains(&id) => id,
            _ => {
                let id = LocalId(next);
                next += 1;
                id
            }
        };
        used.insert(local);
        rows.push((local, sid, sn));
    }

    if rows.is_empty() {
        return (MindmapGraph::with_root_from(next, root_label, root_center), 0);
    }

    let local_of: HashMap<ServerId, LocalId> = rows.iter().map(|(l, s, _)| (*s, *l)).collect();
    let root = rows
        .iter()
        .find(|(_, _, sn)| sn.parent_node_id.is_none())
        .map(|(l, _, _)| *l)
        .unwrap_or(rows[0].0);

    let mut repaired = 0usize;
    let mut parent_of: HashMap<LocalId, LocalId> = HashMap::new();
    for (local, _, sn) in &rows {
        if *local == root {
            continue;
        }
        let parent = sn.parent_node_id.and_then(|p| local_of.get(&p).copied()).filter(|p| p != local);
        match parent {
            Some(p) => {
                parent_of.insert(*local, p);
            }
            None => {
                log::warn!("stored node {:?} has no resolvable parent; attaching to root", sn.title);
                parent_of.insert(*local, root);
                repaired += 1;
            }
        }
    }

    // Anything not reachable from the root sits on a cycle; cut it there.
    loop {
        let mut children: HashMap<LocalId, Vec<LocalId>> = HashMap::new();
        for (c, p) in &parent_of {
            children.entry(*p).or_default().push(*c);
        }
        let mut reachable: HashSet<LocalId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(cur) = stack.pop() {
            if reachable.insert(cur) {
                if let Some(kids) = children.get(&cur) {
                    stack.extend(kids.iter().copied());
                }
            }
        }
        let Some(orphan) = rows.iter().map(|(l, _, _)| *l).find(|l| !reachable.contains(l)) else {
            break;
        };
        log::warn!("stored parent links form a cycle at {}; attaching to root", orphan);
        parent_of.insert(orphan, root);
        repaired += 1;
    }

    let default_radius = NodeMetrics::default().base_radius;
    let nodes: Vec<MindNode> = rows
        .into_iter()
        .map(|(local, sid, sn)| {
            let radius = (sn.width.max(sn.height) / 2.0) as f32;
            MindNode {
                local_id: local,
                server_id: Some(sid),
                label: sn.title,
                content: sn.content,
                node_type: sn.node_type,
                pos: pos2(sn.position_x as f32, sn.position_y as f32),
                radius_hint: if radius > 0.0 { radius } else { default_radius },
                level: 0,
                parent: if local == root { None } else { parent_of.get(&local).copied() },
            }
        })
        .collect();

    match MindmapGraph::from_parts(nodes, root, next) {
        Ok(g) => (g, repaired),
        Err(e) => {
            log::warn!("stored tree unusable ({}); starting fresh", e);
            (MindmapGraph::with_root_from(next, root_label, root_center), repaired)
        }
    }
}
