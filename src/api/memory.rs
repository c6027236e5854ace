// In-process tree store used offline and by tests. Behaves like the backend:
// assigns ids on save, resolves parents and derives levels.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::store::{StoreError, StoreNode, TreeStore};
use crate::graph_utils::graph::{MindmapId, ServerId};

#[derive(Default)]
pub struct MemoryStore {
    maps: Mutex<HashMap<MindmapId, Vec<StoreNode>>>,
    fail_saves: AtomicUsize,
    fail_loads: Mutex<Option<StoreError>>,
    save_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` saves fail with a transport error.
    pub fn fail_next_saves(&self, n: usize) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }

    /// Every load fails with `err` until cleared with `None`.
    pub fn fail_loads_with(&self, err: Option<StoreError>) {
        if let Ok(mut slot) = self.fail_loads.lock() {
            *slot = err;
        }
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, mindmap: MindmapId) -> Vec<StoreNode> {
        self.maps
            .lock()
            .map(|m| m.get(&mindmap).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn poisoned() -> StoreError {
        StoreError::Transport("memory store lock poisoned".into())
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn load(&self, mindmap: MindmapId) -> Result<Vec<StoreNode>, StoreError> {
        if let Some(err) = self.fail_loads.lock().map_err(|_| Self::poisoned())?.clone() {
            return Err(err);
        }
        let maps = self.maps.lock().map_err(|_| Self::poisoned())?;
        maps.get(&mindmap).cloned().ok_or(StoreError::NotFound)
    }

    async fn save(&self, mindmap: MindmapId, nodes: &[StoreNode]) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.fail_saves.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_saves.store(pending_failures - 1, Ordering::SeqCst);
            return Err(StoreError::Transport("connection reset by peer".into()));
        }

        let mut stored: Vec<StoreNode> = nodes.to_vec();
        let mut by_key: HashMap<String, ServerId> = HashMap::new();
        for n in &mut stored {
            let id = *n.id.get_or_insert_with(|| ServerId(Uuid::now_v7()));
            if let Some(k) = &n.client_key {
                by_key.insert(k.clone(), id);
            }
        }
        for n in &mut stored {
            if n.parent_node_id.is_none() {
                if let Some(k) = n.parent_client_key.take() {
                    n.parent_node_id = by_key.get(&k).copied();
                }
            }
            n.parent_client_key = None;
        }

        // level = depth below the parentless node
        let parent_of: HashMap<ServerId, Option<ServerId>> =
            stored.iter().filter_map(|n| n.id.map(|id| (id, n.parent_node_id))).collect();
        for n in &mut stored {
            let mut depth = 0u32;
            let mut cur = n.parent_node_id;
            while let Some(p) = cur {
                depth += 1;
                if depth as usize > parent_of.len() {
                    break;
                }
                cur = parent_of.get(&p).copied().flatten();
            }
            n.level = depth;
        }

        self.maps.lock().map_err(|_| Self::poisoned())?.insert(mindmap, stored);
        Ok(())
    }
}
