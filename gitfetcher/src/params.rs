use trendstore::rules::QueryDescriptor;

use crate::error::{GitFetcherError, Result};

/// The search API caps pages at 100.
const MAX_PER_PAGE: u8 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRepoParams {
    pub label: String,
    pub query: String,
    pub sort: String,
    pub descending: bool,
    pub per_page: u8,
}

impl SearchRepoParams {
    pub fn from_query(query: &QueryDescriptor) -> Result<Self> {
        match query {
            QueryDescriptor::RepositorySearch {
                label,
                query,
                sort,
                order,
                per_page,
            } => {
                if query.trim().is_empty() {
                    return Err(GitFetcherError::InvalidParam(format!(
                        "query for '{label}' is empty"
                    )));
                }
                let descending = match order.as_str() {
                    "desc" => true,
                    "asc" => false,
                    other => {
                        return Err(GitFetcherError::InvalidParam(format!(
                            "order must be 'asc' or 'desc', got '{other}'"
                        )))
                    }
                };
                Ok(Self {
                    label: label.clone(),
                    query: query.clone(),
                    sort: sort.clone(),
                    descending,
                    per_page: MAX_PER_PAGE,
                }
                .with_per_page(*per_page))
            }
            other => Err(GitFetcherError::InvalidParam(format!(
                "'{}' is not a repository search",
                other.label()
            ))),
        }
    }

    pub fn with_per_page(mut self, per_page: u8) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }
}
