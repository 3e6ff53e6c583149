use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use trendstore::{
    fetch::{Bucket, FetchOutcome, SkippedItem, SourceFetcher},
    models::{RawEntity, RawPayload, SourceKind},
    rules::{QueryDescriptor, SourceRules},
};

use crate::client::{HubClient, HubModel, ListingQuery, ModelListing};

/// Fetches one bucket per configured task filter, all concurrently. A failed
/// task contributes an empty bucket and the others carry on.
pub struct HubFetcher {
    client: Arc<dyn ModelListing>,
}

impl HubFetcher {
    pub fn new(client: Arc<dyn ModelListing>) -> Self {
        Self { client }
    }

    pub fn with_default_client() -> Self {
        Self::new(Arc::new(HubClient::new()))
    }

    async fn fetch_task(&self, query: &QueryDescriptor) -> Bucket {
        let (label, listing) = match query {
            QueryDescriptor::ModelTask {
                label,
                task,
                sort,
                limit,
            } => (
                label.clone(),
                ListingQuery {
                    task: task.clone(),
                    sort: sort.clone(),
                    limit: *limit,
                },
            ),
            other => {
                log::warn!("hubfetcher: '{}' is not a model task query", other.label());
                return Bucket::failed(other.label());
            }
        };

        match self.client.list_models(&listing).await {
            Ok(models) => {
                log::info!("hubfetcher: task '{}' listed {} models", listing.task, models.len());
                let mut bucket = Bucket::ok(label, Vec::with_capacity(models.len()));
                for model in &models {
                    match to_raw_entity(model) {
                        Some(entity) => bucket.entities.push(entity),
                        None => bucket.skipped.push(SkippedItem {
                            identifier: format!("{}#unnamed", listing.task),
                            reason: "listing entry without an id".to_string(),
                        }),
                    }
                }
                bucket
            }
            Err(err) => {
                log::warn!("hubfetcher: task '{}' failed: {err}", listing.task);
                Bucket::failed(label)
            }
        }
    }
}

pub fn to_raw_entity(model: &HubModel) -> Option<RawEntity> {
    let identifier = model.identifier()?;
    Some(RawEntity {
        identifier: identifier.to_string(),
        metric: model.downloads,
        prior_metric: None,
        tags: model.tags.clone(),
        payload: RawPayload::Model {
            pipeline_tag: model.pipeline_tag.clone(),
        },
    })
}

#[async_trait]
impl SourceFetcher for HubFetcher {
    fn name(&self) -> &'static str {
        "hubfetcher"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Models
    }

    async fn fetch(&self, rules: &SourceRules) -> FetchOutcome {
        let buckets = join_all(rules.queries.iter().map(|query| self.fetch_task(query))).await;
        FetchOutcome::new(buckets)
    }
}
