use async_trait::async_trait;
use octocrab::Octocrab;

use crate::error::{GitFetcherError, Result};
use crate::models::SearchRepository;
use crate::params::SearchRepoParams;

/// The slice of the GitHub API the fetcher relies on. Tests substitute a mock.
#[async_trait]
pub trait GitHubService: Send + Sync {
    async fn search_repositories(&self, params: &SearchRepoParams) -> Result<Vec<SearchRepository>>;
}

/// Octocrab-backed client, responsible for authentication and the search call.
pub struct OctocrabService {
    octocrab: Octocrab,
}

impl OctocrabService {
    /// Optionally uses a personal access token to raise the search rate limit.
    pub fn new(token: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        let octocrab = builder.build().map_err(GitFetcherError::GitHub)?;
        Ok(Self { octocrab })
    }
}

#[async_trait]
impl GitHubService for OctocrabService {
    async fn search_repositories(&self, params: &SearchRepoParams) -> Result<Vec<SearchRepository>> {
        let order = if params.descending {
            "desc"
        } else {
            "asc"
        };
        let page = self
            .octocrab
            .search()
            .repositories(&params.query)
            .sort(params.sort.as_str())
            .order(order)
            .per_page(params.per_page)
            .send()
            .await?;

        page.items
            .into_iter()
            .map(|repo| {
                let full_name = repo
                    .full_name
                    .ok_or(GitFetcherError::MissingField("full_name"))?;
                let html_url = repo
                    .html_url
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| format!("https://github.com/{full_name}"));
                Ok(SearchRepository {
                    full_name,
                    html_url,
                    description: repo.description,
                    language: repo
                        .language
                        .and_then(|value| value.as_str().map(str::to_string)),
                    stargazers: repo.stargazers_count.map(u64::from),
                    updated_at: repo.updated_at,
                })
            })
            .collect()
    }
}
