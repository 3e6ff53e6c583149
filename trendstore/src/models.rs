use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

/// One of the three independently collected sources. Each maps to its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Repositories,
    Models,
    Keywords,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Repositories,
        SourceKind::Models,
        SourceKind::Keywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Repositories => "repositories",
            SourceKind::Models => "models",
            SourceKind::Keywords => "keywords",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            SourceKind::Repositories => "github_repos",
            SourceKind::Models => "hf_models",
            SourceKind::Keywords => "keyword_trends",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "repositories" | "repos" | "github" => Ok(SourceKind::Repositories),
            "models" | "hf" | "huggingface" => Ok(SourceKind::Models),
            "keywords" | "pageviews" => Ok(SourceKind::Keywords),
            other => Err(StorageError::InvalidArg(format!("unknown source '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        }
    }
}

impl FromStr for Trend {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rising" => Ok(Trend::Rising),
            "falling" => Ok(Trend::Falling),
            "stable" => Ok(Trend::Stable),
            other => Err(StorageError::InvalidArg(format!("unknown trend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "LLM")]
    Llm,
    Image,
    Audio,
    Multimodal,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Llm => "LLM",
            Category::Image => "Image",
            Category::Audio => "Audio",
            Category::Multimodal => "Multimodal",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LLM" => Ok(Category::Llm),
            "Image" => Ok(Category::Image),
            "Audio" => Ok(Category::Audio),
            "Multimodal" => Ok(Category::Multimodal),
            "Other" => Ok(Category::Other),
            other => Err(StorageError::InvalidArg(format!("unknown category '{other}'"))),
        }
    }
}

/// The normalized trend record persisted per identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub identifier: String,
    pub primary_metric: u64,
    /// Prior snapshot value. Equal to `primary_metric` when `has_history` is false.
    pub previous_metric: u64,
    pub has_history: bool,
    pub change_pct: i64,
    pub trend: Trend,
    pub category: Option<Category>,
    pub rank: Option<u32>,
    pub collected_at: DateTime<Utc>,
    pub details: EntityDetails,
}

impl TrackedEntity {
    pub fn metric_delta(&self) -> i64 {
        self.primary_metric as i64 - self.previous_metric as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetails {
    Repository {
        description: String,
        language: String,
        url: String,
        stars_delta: i64,
    },
    Model {
        tags: Vec<String>,
        pipeline_tag: Option<String>,
    },
    Keyword {
        topic_title: String,
        score_prev: u64,
        views_recent: u64,
        views_prev: u64,
        week_start: String,
    },
}

/// A provider record after the adapter has mapped it into the common shape,
/// before any filtering or scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    pub identifier: String,
    pub metric: Option<u64>,
    /// History reported by the provider itself (the previous pageview window).
    pub prior_metric: Option<u64>,
    pub tags: Vec<String>,
    pub payload: RawPayload,
}

impl RawEntity {
    pub fn metric_or_zero(&self) -> u64 {
        self.metric.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Repository {
        description: Option<String>,
        language: Option<String>,
        url: String,
    },
    Model {
        pipeline_tag: Option<String>,
    },
    Keyword {
        topic_title: String,
    },
}

/// Why an entity did not make it from the provider into the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub blocked: usize,
    pub inactive: usize,
    pub capped: usize,
    pub truncated: usize,
    pub duplicates: usize,
}

/// Result of one `run_cycle` call, returned to the trigger.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub source: SourceKind,
    pub collected_count: usize,
    pub deleted_count: usize,
    pub skipped_count: usize,
    pub failed_buckets: Vec<String>,
    /// Category counts for models, trend counts for the other sources.
    pub distribution: BTreeMap<String, usize>,
    pub trends: BTreeMap<String, usize>,
    pub dropped: DropCounts,
    pub notes: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleLog {
    pub cycle_id: String,
    pub source: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: String,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_aliases() {
        assert_eq!("github".parse::<SourceKind>().unwrap(), SourceKind::Repositories);
        assert_eq!("Models".parse::<SourceKind>().unwrap(), SourceKind::Models);
        assert_eq!("keywords".parse::<SourceKind>().unwrap(), SourceKind::Keywords);
        assert!("papers".parse::<SourceKind>().is_err());
    }

    #[test]
    fn category_serializes_with_display_names() {
        let value = serde_json::to_value(Category::Llm).unwrap();
        assert_eq!(value, serde_json::json!("LLM"));
        assert_eq!("Multimodal".parse::<Category>().unwrap(), Category::Multimodal);
    }
}
