//! Wikimedia REST per-article pageviews.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

const PAGEVIEWS_URL: &str =
    "https://wikimedia.org/api/rest_v1/metrics/pageviews/per-article/en.wikipedia/all-access/all-agents";

/// Wikimedia rejects requests without an identifying agent.
const USER_AGENT: &str = "horizon-trends/0.1 (https://github.com/horizon-trends/horizon)";

#[derive(Error, Debug)]
pub enum PageviewError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not enough data: {0}")]
    InsufficientData(String),
}

pub type Result<T> = std::result::Result<T, PageviewError>;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DailyViews {
    /// `YYYYMMDDHH` as returned by the API.
    pub timestamp: String,
    pub views: u64,
}

#[derive(Debug, Deserialize)]
struct PageviewResponse {
    #[serde(default)]
    items: Vec<DailyViews>,
}

#[async_trait]
pub trait PageviewProvider: Send + Sync {
    /// Daily views for `title`, oldest first, over `[start, end]`.
    async fn daily_views(&self, title: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyViews>>;
}

#[derive(Clone, Debug)]
pub struct WikimediaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl Default for WikimediaClient {
    fn default() -> Self {
        Self::with_base_url(PAGEVIEWS_URL)
    }
}

impl WikimediaClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the per-article URL. The title becomes a single encoded path
    /// segment, so titles containing `/` or `?` stay intact.
    pub fn article_url(&self, title: &str, start: NaiveDate, end: NaiveDate) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| PageviewError::InvalidUrl(e.to_string()))?;
        let start = format!("{}00", start.format("%Y%m%d"));
        let end = format!("{}00", end.format("%Y%m%d"));
        url.path_segments_mut()
            .map_err(|_| PageviewError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .extend([title, "daily", start.as_str(), end.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl PageviewProvider for WikimediaClient {
    async fn daily_views(&self, title: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyViews>> {
        let url = self.article_url(title, start, end)?;
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PageviewError::ApiError(format!(
                "HTTP {} for '{}'",
                response.status(),
                title
            )));
        }

        let data: PageviewResponse = response.json().await?;
        Ok(data.items)
    }
}
