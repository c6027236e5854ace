use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::store::StoreError;
use crate::graph_utils::content::{ContentKind, ContentRecord};
use crate::graph_utils::graph::ServerId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CognitiveLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub node_id: ServerId,
    pub topic: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_level: Option<CognitiveLevel>,
}

/// Produces content records for one node. Results are only ever appended to
/// the node's attached content; they never touch the graph.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, kind: ContentKind, request: &GenerateRequest) -> Result<Vec<ContentRecord>, StoreError>;
}

/// Used when no backend is configured.
pub struct OfflineGenerator;

#[async_trait]
impl ContentGenerator for OfflineGenerator {
    async fn generate(&self, _kind: ContentKind, _request: &GenerateRequest) -> Result<Vec<ContentRecord>, StoreError> {
        Err(StoreError::Transport("content generation needs a configured backend".into()))
    }
}
