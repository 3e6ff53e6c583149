use async_trait::async_trait;
use serde::Serialize;

use crate::models::{RawEntity, SourceKind};
use crate::rules::SourceRules;

/// The result of one sub-query (a task filter, a search, a keyword list).
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub label: String,
    pub entities: Vec<RawEntity>,
    /// Set when the whole bucket failed at the transport layer.
    pub failed: bool,
    /// Individual items within the bucket that could not be fetched.
    pub skipped: Vec<SkippedItem>,
}

impl Bucket {
    pub fn ok(label: impl Into<String>, entities: Vec<RawEntity>) -> Self {
        Self {
            label: label.into(),
            entities,
            failed: false,
            skipped: Vec::new(),
        }
    }

    /// An empty bucket standing in for a failed request.
    pub fn failed(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entities: Vec::new(),
            failed: true,
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedItem {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub buckets: Vec<Bucket>,
}

impl FetchOutcome {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.entities.is_empty())
    }

    pub fn failed_labels(&self) -> Vec<String> {
        self.buckets
            .iter()
            .filter(|bucket| bucket.failed)
            .map(|bucket| bucket.label.clone())
            .collect()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedItem> {
        self.buckets.iter().flat_map(|bucket| bucket.skipped.iter())
    }
}

/// A pure I/O adapter for one external provider.
///
/// Implementations must not fail past this boundary: a request that cannot be
/// completed yields a `Bucket::failed` (or a `SkippedItem` for a single keyword)
/// and the cycle carries on with whatever else came back.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self, rules: &SourceRules) -> FetchOutcome;
}
