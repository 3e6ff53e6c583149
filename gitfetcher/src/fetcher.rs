use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use trendstore::{
    errors::{Result as StorageResult, StorageError},
    fetch::{Bucket, FetchOutcome, SourceFetcher},
    models::SourceKind,
    rules::{QueryDescriptor, SourceRules},
};

use crate::{
    client::{GitHubService, OctocrabService},
    mapper,
    params::SearchRepoParams,
};

pub struct GitFetcher {
    client: Arc<dyn GitHubService>,
}

impl GitFetcher {
    pub fn new(client: Arc<dyn GitHubService>) -> Self {
        Self { client }
    }

    pub fn with_default_client(token: Option<String>) -> StorageResult<Self> {
        let client = OctocrabService::new(token).map_err(|err| {
            StorageError::Config(format!("failed to create Octocrab client: {err}"))
        })?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn fetch_search_repo(&self, query: &QueryDescriptor) -> Bucket {
        let params = match SearchRepoParams::from_query(query) {
            Ok(params) => params,
            Err(err) => {
                log::warn!("gitfetcher: skipping query '{}': {err}", query.label());
                return Bucket::failed(query.label());
            }
        };

        match self.client.search_repositories(&params).await {
            Ok(results) => {
                log::info!(
                    "gitfetcher: '{}' returned {} repositories",
                    params.label,
                    results.len()
                );
                Bucket::ok(params.label, mapper::to_raw_entities(&results))
            }
            Err(err) => {
                log::warn!("gitfetcher: search '{}' failed: {err}", params.label);
                Bucket::failed(params.label)
            }
        }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    fn name(&self) -> &'static str {
        "gitfetcher"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Repositories
    }

    async fn fetch(&self, rules: &SourceRules) -> FetchOutcome {
        let buckets = join_all(rules.queries.iter().map(|query| self.fetch_search_repo(query))).await;
        FetchOutcome::new(buckets)
    }
}
