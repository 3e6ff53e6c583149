use chrono::{DateTime, Utc};
use serde::Serialize;

/// One repository-search hit, reduced to the fields a trend row needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRepository {
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
}
