//! REST clients for the mindmap backend (feature `remote`).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::generator::{ContentGenerator, GenerateRequest};
use super::store::{StoreError, StoreNode, TreeStore};
use crate::graph_utils::content::{ConceptRecord, ContentKind, ContentRecord, ExerciseRecord, FormulaRecord};
use crate::graph_utils::graph::MindmapId;
use crate::persistence::settings::AppSettings;

#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    pub fn from_settings(settings: &AppSettings) -> anyhow::Result<Option<Self>> {
        match settings.store_base_url.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(url) => Ok(Some(Self::new(url, settings.api_key.clone(), settings.request_timeout())?)),
            None => Ok(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header("Accept", "application/json");
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(200).collect();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(body),
            other => StoreError::Status(other.as_u16(), body),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response.json::<T>().await.map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

#[async_trait]
impl TreeStore for HttpBackend {
    async fn load(&self, mindmap: MindmapId) -> Result<Vec<StoreNode>, StoreError> {
        let url = self.url(&format!("/api/mindmaps/{}/nodes", mindmap));
        log::debug!("GET {}", url);
        let resp = self.authorize(self.http.get(&url)).send().await.map_err(transport)?;
        let resp = Self::check(resp).await?;
        Self::decode(resp).await
    }

    async fn save(&self, mindmap: MindmapId, nodes: &[StoreNode]) -> Result<(), StoreError> {
        let url = self.url(&format!("/api/mindmaps/{}/nodes", mindmap));
        log::debug!("PUT {} ({} nodes)", url, nodes.len());
        let resp = self
            .authorize(self.http.put(&url))
            .json(nodes)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await.map(|_| ())
    }
}

#[async_trait]
impl ContentGenerator for HttpBackend {
    async fn generate(&self, kind: ContentKind, request: &GenerateRequest) -> Result<Vec<ContentRecord>, StoreError> {
        let url = self.url(&format!("/api/mindmap-nodes/{}/generate/{}", request.node_id, kind.path_segment()));
        log::debug!("POST {}", url);
        let resp = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let resp = Self::check(resp).await?;
        let records = match kind {
            ContentKind::Concepts => Self::decode::<Vec<ConceptRecord>>(resp)
                .await?
                .into_iter()
                .map(ContentRecord::Concept)
                .collect(),
            ContentKind::Formulas => Self::decode::<Vec<FormulaRecord>>(resp)
                .await?
                .into_iter()
                .map(ContentRecord::Formula)
                .collect(),
            ContentKind::Exercises => Self::decode::<Vec<ExerciseRecord>>(resp)
                .await?
                .into_iter()
                .map(ContentRecord::Exercise)
                .collect(),
        };
        Ok(records)
    }
}
