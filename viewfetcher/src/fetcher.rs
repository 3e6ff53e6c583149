use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use trendstore::{
    fetch::{Bucket, FetchOutcome, SkippedItem, SourceFetcher},
    models::{RawEntity, RawPayload, SourceKind},
    pacing::{CallPacer, FixedIntervalPacer},
    rules::{KeywordTerm, QueryDescriptor, SourceRules},
};

use crate::client::{PageviewProvider, WikimediaClient};
use crate::window::window_sums;

/// Looks up every configured keyword one at a time, pacing between calls.
/// A keyword whose lookup fails or comes back short is skipped, not retried.
pub struct PageviewFetcher {
    provider: Arc<dyn PageviewProvider>,
    pacer: Option<Arc<dyn CallPacer>>,
}

impl PageviewFetcher {
    pub fn new(provider: Arc<dyn PageviewProvider>) -> Self {
        Self {
            provider,
            pacer: None,
        }
    }

    pub fn with_default_client() -> Self {
        Self::new(Arc::new(WikimediaClient::new()))
    }

    /// Overrides the pacing taken from the rule table.
    pub fn with_pacer(mut self, pacer: Arc<dyn CallPacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    async fn fetch_terms(
        &self,
        label: &str,
        terms: &[KeywordTerm],
        window_days: u32,
        pacer: &dyn CallPacer,
    ) -> Bucket {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(window_days));
        let mut bucket = Bucket::ok(label, Vec::with_capacity(terms.len()));

        for term in terms {
            pacer.pace().await;
            match self.lookup(term, start, end).await {
                Ok(entity) => bucket.entities.push(entity),
                Err(reason) => {
                    log::warn!("viewfetcher: skipping '{}' ({}): {reason}", term.keyword, term.title);
                    bucket.skipped.push(SkippedItem {
                        identifier: term.keyword.clone(),
                        reason,
                    });
                }
            }
        }

        log::info!(
            "viewfetcher: '{label}' collected {} of {} keywords",
            bucket.entities.len(),
            terms.len()
        );
        bucket
    }

    async fn lookup(
        &self,
        term: &KeywordTerm,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawEntity, String> {
        let series = self
            .provider
            .daily_views(&term.title, start, end)
            .await
            .map_err(|e| e.to_string())?;
        let sums = window_sums(&series).map_err(|e| e.to_string())?;
        Ok(RawEntity {
            identifier: term.keyword.clone(),
            metric: Some(sums.recent),
            prior_metric: Some(sums.prev),
            tags: Vec::new(),
            payload: RawPayload::Keyword {
                topic_title: term.title.clone(),
            },
        })
    }
}

#[async_trait]
impl SourceFetcher for PageviewFetcher {
    fn name(&self) -> &'static str {
        "viewfetcher"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Keywords
    }

    async fn fetch(&self, rules: &SourceRules) -> FetchOutcome {
        let pacer: Arc<dyn CallPacer> = match &self.pacer {
            Some(pacer) => Arc::clone(pacer),
            None => Arc::new(FixedIntervalPacer::from_millis(rules.pacing_ms)),
        };

        let mut buckets = Vec::with_capacity(rules.queries.len());
        for query in &rules.queries {
            match query {
                QueryDescriptor::Keywords {
                    label,
                    terms,
                    window_days,
                } => {
                    buckets.push(
                        self.fetch_terms(label, terms, *window_days, pacer.as_ref())
                            .await,
                    );
                }
                other => {
                    log::warn!("viewfetcher: '{}' is not a keyword query", other.label());
                    buckets.push(Bucket::failed(other.label()));
                }
            }
        }
        FetchOutcome::new(buckets)
    }
}
