use trendstore::models::{RawEntity, RawPayload};

use crate::models::SearchRepository;

/// Maps a search hit onto the pipeline's raw record. The star count is the
/// tracked metric; a missing count stays `None` so the filter can drop it.
pub fn to_raw_entity(repo: &SearchRepository) -> RawEntity {
    RawEntity {
        identifier: repo.full_name.clone(),
        metric: repo.stargazers,
        prior_metric: None,
        tags: Vec::new(),
        payload: RawPayload::Repository {
            description: repo.description.clone(),
            language: repo.language.clone(),
            url: repo.html_url.clone(),
        },
    }
}

pub fn to_raw_entities(results: &[SearchRepository]) -> Vec<RawEntity> {
    results.iter().map(to_raw_entity).collect()
}
