use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph_utils::graph::{MindmapId, NodeType, ServerId};

/// A node as the tree store sees it: parent pointers only, no edge list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreNode {
    #[serde(default)]
    pub id: Option<ServerId>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub node_type: NodeType,
    pub position_x: f64,
    pub position_y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub parent_node_id: Option<ServerId>,
    #[serde(default)]
    pub level: u32,
    /// Client-side key of a node sent without `id`; echoed back by stores
    /// that support it so the client can keep its local identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Set instead of `parent_node_id` when the parent is itself unsaved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_client_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("mindmap not found")]
    NotFound,
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("store returned {0}: {1}")]
    Status(u16, String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode store response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TreeStore: Send + Sync {
    async fn load(&self, mindmap: MindmapId) -> Result<Vec<StoreNode>, StoreError>;
    /// Replace the mindmap's node set.
    async fn save(&self, mindmap: MindmapId, nodes: &[StoreNode]) -> Result<(), StoreError>;
}
