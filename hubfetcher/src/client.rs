//! Hugging Face model hub listing API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL for the model listing endpoint
const HUB_MODELS_URL: &str = "https://huggingface.co/api/models";

#[derive(Error, Debug)]
pub enum HubError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, HubError>;

/// One listed model. Responses may carry `id`, `modelId` or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "modelId")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
}

impl HubModel {
    pub fn identifier(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.model_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub task: String,
    pub sort: String,
    pub limit: u32,
}

#[async_trait]
pub trait ModelListing: Send + Sync {
    async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>>;
}

#[derive(Clone, Debug)]
pub struct HubClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl Default for HubClient {
    fn default() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: HUB_MODELS_URL.to_string(),
        }
    }
}

impl HubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the client at a different listing endpoint, e.g. a mirror.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ModelListing for HubClient {
    async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>> {
        if query.limit == 0 {
            return Err(HubError::InvalidParameters("limit must be positive".into()));
        }
        let limit = query.limit.to_string();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("pipeline_tag", query.task.as_str()),
                ("sort", query.sort.as_str()),
                ("direction", "-1"),
                ("limit", limit.as_str()),
                ("full", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HubError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let data: serde_json::Value = response.json().await?;
        serde_json::from_value(data).map_err(HubError::JsonError)
    }
}
