use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use horizon::{build_router, AppState};
use serde_json::Value;
use tower::util::ServiceExt;
use trendstore::{
    catalog::Catalog,
    config::StorageConfig,
    fetch::{Bucket, FetchOutcome, SourceFetcher},
    models::{RawEntity, RawPayload, SourceKind},
    rules::{RuleTable, SourceRules},
    store::{MemoryStore, PersistentStore},
    TrendStorage,
};

const BODY_LIMIT: usize = 1 << 20;

struct FixedModels(Vec<RawEntity>);

#[async_trait]
impl SourceFetcher for FixedModels {
    fn name(&self) -> &'static str {
        "fixed-models"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Models
    }

    async fn fetch(&self, _rules: &SourceRules) -> FetchOutcome {
        FetchOutcome::new(vec![Bucket::ok("text-generation", self.0.clone())])
    }
}

fn model(identifier: &str, downloads: u64) -> RawEntity {
    RawEntity {
        identifier: identifier.to_string(),
        metric: Some(downloads),
        prior_metric: None,
        tags: vec!["text-generation".to_string()],
        payload: RawPayload::Model {
            pipeline_tag: Some("text-generation".to_string()),
        },
    }
}

fn test_app(
    store: Arc<MemoryStore>,
    models: Vec<RawEntity>,
) -> anyhow::Result<(axum::Router, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let catalog = Arc::new(Catalog::in_memory()?);
    catalog.initialize_schema()?;
    let storage = TrendStorage::with_parts(
        StorageConfig::new(dir.path()),
        catalog,
        store,
        Arc::new(RuleTable::default()),
    );
    storage.runner.register_fetcher(Arc::new(FixedModels(models)));
    Ok((build_router(AppState::new(Arc::new(storage))), dir))
}

async fn post(app: axum::Router, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
    let response = app
        .oneshot(Request::builder().method("POST").uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), BODY_LIMIT).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

#[tokio::test]
async fn cycle_endpoint_returns_the_report() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (app, _dir) = test_app(store.clone(), vec![model("org/a", 10), model("org/b", 5)])?;

    let (status, value) = post(app, "/api/cycles/models").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["source"], "models");
    assert_eq!(value["collected_count"], 2);
    assert_eq!(value["distribution"]["LLM"], 2);
    assert_eq!(store.count(SourceKind::Models).await?, 2);
    Ok(())
}

#[tokio::test]
async fn cycle_errors_map_to_status_codes() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (app, _dir) = test_app(store.clone(), Vec::new())?;

    let (status, value) = post(app.clone(), "/api/cycles/models").await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(value["error"].as_str().unwrap_or_default().contains("empty"));

    let (status, _) = post(app.clone(), "/api/cycles/keywords").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(app.clone(), "/api/cycles/papers").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    store.set_available(false);
    let (status, _) = post(app, "/api/cycles/models").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn status_and_sources_describe_the_runner() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (app, _dir) = test_app(store, vec![model("org/a", 10)])?;

    let (status, _) = post(app.clone(), "/api/cycles/models").await?;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/status").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), BODY_LIMIT).await?;
    let value: Value = serde_json::from_slice(&body)?;
    assert_eq!(value["store_available"], true);
    assert_eq!(value["recent_cycles"][0]["status"], "SUCCESS");
    let models = value["sources"]
        .as_array()
        .and_then(|sources| sources.iter().find(|s| s["source"] == "models"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(models["rows"], 1);

    let response = app
        .oneshot(Request::builder().uri("/api/sources").body(Body::empty())?)
        .await?;
    let body = to_bytes(response.into_body(), BODY_LIMIT).await?;
    let value: Value = serde_json::from_slice(&body)?;
    let fetchers: Vec<_> = value
        .as_array()
        .map(|sources| sources.iter().map(|s| s["fetcher"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(
        fetchers,
        vec![Value::Null, Value::from("fixed-models"), Value::Null]
    );
    Ok(())
}
