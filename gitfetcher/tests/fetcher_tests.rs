use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use gitfetcher::{
    client::GitHubService,
    error::{GitFetcherError, Result},
    models::SearchRepository,
    params::SearchRepoParams,
    GitFetcher,
};
use trendstore::{
    catalog::Catalog,
    fetch::SourceFetcher,
    models::{EntityDetails, SourceKind},
    rules::{QueryDescriptor, RuleTable},
    store::{MemoryStore, PersistentStore},
    sync::CycleRunner,
};

/// Answers by query string; unknown queries fail like a rate-limited call.
struct MockGitHubService {
    results: HashMap<String, Vec<SearchRepository>>,
}

#[async_trait]
impl GitHubService for MockGitHubService {
    async fn search_repositories(&self, params: &SearchRepoParams) -> Result<Vec<SearchRepository>> {
        self.results
            .get(&params.query)
            .cloned()
            .ok_or_else(|| GitFetcherError::InvalidParam("API rate limit exceeded".into()))
    }
}

fn hit(full_name: &str, stars: u64) -> SearchRepository {
    SearchRepository {
        full_name: full_name.into(),
        html_url: format!("https://github.com/{full_name}"),
        description: Some("Demo".into()),
        language: None,
        stargazers: Some(stars),
        updated_at: None,
    }
}

fn search(label: &str, query: &str) -> QueryDescriptor {
    QueryDescriptor::RepositorySearch {
        label: label.into(),
        query: query.into(),
        sort: "stars".into(),
        order: "desc".into(),
        per_page: 30,
    }
}

#[tokio::test]
async fn search_results_become_raw_entities() {
    let service = Arc::new(MockGitHubService {
        results: HashMap::from([(
            "topic:llm".to_string(),
            vec![hit("octocat/hello-world", 99), hit("rust-lang/rust", 10)],
        )]),
    });
    let fetcher = GitFetcher::new(service);
    let mut rules = RuleTable::default().repositories;
    rules.queries = vec![search("llm", "topic:llm")];

    let outcome = fetcher.fetch(&rules).await;
    assert_eq!(outcome.buckets.len(), 1);
    let bucket = &outcome.buckets[0];
    assert_eq!(bucket.label, "llm");
    assert!(!bucket.failed);
    let ids: Vec<_> = bucket.entities.iter().map(|e| e.identifier.as_str()).collect();
    assert_eq!(ids, vec!["octocat/hello-world", "rust-lang/rust"]);
    assert_eq!(bucket.entities[0].metric, Some(99));
}

#[tokio::test]
async fn failed_search_degrades_to_an_empty_bucket() {
    let service = Arc::new(MockGitHubService {
        results: HashMap::from([("topic:llm".to_string(), vec![hit("octocat/hello-world", 99)])]),
    });
    let fetcher = GitFetcher::new(service);
    let mut rules = RuleTable::default().repositories;
    rules.queries = vec![search("llm", "topic:llm"), search("broken", "topic:missing")];

    let outcome = fetcher.fetch(&rules).await;
    assert_eq!(outcome.failed_labels(), vec!["broken".to_string()]);
    assert!(!outcome.is_empty());
    assert!(outcome.buckets[1].entities.is_empty());
}

#[tokio::test]
async fn cycle_applies_blocklist_and_org_cap() -> anyhow::Result<()> {
    let query = "topic:machine-learning topic:artificial-intelligence";
    let service = Arc::new(MockGitHubService {
        results: HashMap::from([(
            query.to_string(),
            vec![
                hit("someone/awesome-llm", 9_000),
                hit("big/one", 5_000),
                hit("big/two", 4_000),
                hit("big/three", 3_000),
                hit("big/four", 2_000),
                hit("small/tutorial-notes", 1_500),
                hit("small/tool", 1_000),
            ],
        )]),
    });

    let store = Arc::new(MemoryStore::new());
    let catalog = Arc::new(Catalog::in_memory()?);
    catalog.initialize_schema()?;
    let runner = CycleRunner::new(store.clone(), catalog, Arc::new(RuleTable::default()));
    runner.register_fetcher(Arc::new(GitFetcher::new(service)));

    let report = runner.run_cycle(SourceKind::Repositories).await?;
    assert_eq!(report.collected_count, 4);
    assert_eq!(report.dropped.blocked, 2);
    assert_eq!(report.dropped.capped, 1);

    let rows = store.read_all(SourceKind::Repositories).await?;
    let ids: Vec<_> = rows.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["big/one", "big/three", "big/two", "small/tool"]);
    match &rows[0].details {
        EntityDetails::Repository { language, .. } => assert_eq!(language, "Unknown"),
        other => panic!("unexpected details: {other:?}"),
    }
    Ok(())
}
