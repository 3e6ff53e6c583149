use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use trendstore::{
    catalog::Catalog,
    fetch::{Bucket, FetchOutcome, SourceFetcher},
    models::{RawEntity, RawPayload, SourceKind},
    rules::{RuleTable, SourceRules},
    store::PersistentStore,
    sync::CycleRunner,
};

/// Replays queued outcomes in order; the last one repeats once the queue runs dry.
pub struct ScriptedFetcher {
    kind: SourceKind,
    outcomes: Mutex<VecDeque<FetchOutcome>>,
    last: Mutex<FetchOutcome>,
    gate: Option<Arc<Notify>>,
    pub entered: Arc<Notify>,
}

impl ScriptedFetcher {
    pub fn new(kind: SourceKind, outcomes: Vec<FetchOutcome>) -> Self {
        Self {
            kind,
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(FetchOutcome::default()),
            gate: None,
            entered: Arc::new(Notify::new()),
        }
    }

    /// Blocks every fetch until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _rules: &SourceRules) -> FetchOutcome {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = outcome.clone();
                outcome
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

pub fn runner_with(store: Arc<dyn PersistentStore>) -> anyhow::Result<(CycleRunner, Arc<Catalog>)> {
    let catalog = Arc::new(Catalog::in_memory()?);
    catalog.initialize_schema()?;
    let runner = CycleRunner::new(store, Arc::clone(&catalog), Arc::new(RuleTable::default()));
    Ok((runner, catalog))
}

pub fn model(identifier: &str, downloads: u64, tags: &[&str]) -> RawEntity {
    RawEntity {
        identifier: identifier.to_string(),
        metric: Some(downloads),
        prior_metric: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        payload: RawPayload::Model { pipeline_tag: None },
    }
}

pub fn repo(identifier: &str, stars: u64) -> RawEntity {
    RawEntity {
        identifier: identifier.to_string(),
        metric: Some(stars),
        prior_metric: None,
        tags: Vec::new(),
        payload: RawPayload::Repository {
            description: None,
            language: Some("Rust".to_string()),
            url: format!("https://github.com/{identifier}"),
        },
    }
}

pub fn keyword(identifier: &str, recent: u64, prev: u64) -> RawEntity {
    RawEntity {
        identifier: identifier.to_string(),
        metric: Some(recent),
        prior_metric: Some(prev),
        tags: Vec::new(),
        payload: RawPayload::Keyword {
            topic_title: identifier.to_string(),
        },
    }
}

pub fn single(label: &str, entities: Vec<RawEntity>) -> FetchOutcome {
    FetchOutcome::new(vec![Bucket::ok(label, entities)])
}
