//! The in-memory stages of a cycle, from raw buckets to a classified batch.
//!
//! `select` runs per bucket: filter, organization cap, top-N. The surviving
//! buckets are then unioned, deduplicated, capped again across the whole
//! batch and sorted. `build_batch` turns the
//! selection into scored, classified `TrackedEntity` records.

pub mod categorize;
pub mod classify;
pub mod dedup;
pub mod filter;
pub mod org_cap;
pub mod score;

use chrono::{DateTime, Utc};

use crate::fetch::Bucket;
use crate::models::{
    DropCounts, EntityDetails, RawEntity, RawPayload, SourceKind, TrackedEntity, Trend,
};
use crate::reconcile::Reconciler;
use crate::rules::SourceRules;

use self::categorize::Categorizer;
use self::filter::{EntityFilter, Rejection};
use self::org_cap::OrganizationCap;

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Deduplicated, sorted descending by metric.
    pub entities: Vec<RawEntity>,
    pub dropped: DropCounts,
}

pub fn select(buckets: Vec<Bucket>, rules: &SourceRules) -> Selection {
    let filter = EntityFilter::from_rules(rules);
    let mut dropped = DropCounts::default();
    let mut union = Vec::new();

    for bucket in buckets {
        let mut cap = rules.org_cap.map(OrganizationCap::new);
        let mut kept = 0usize;
        for entity in bucket.entities {
            match filter.check(&entity) {
                Err(Rejection::Blocked) => {
                    log::debug!("[{}] blocked {}", bucket.label, entity.identifier);
                    dropped.blocked += 1;
                    continue;
                }
                Err(Rejection::Inactive) => {
                    log::debug!("[{}] inactive {}", bucket.label, entity.identifier);
                    dropped.inactive += 1;
                    continue;
                }
                Ok(()) => {}
            }
            if let Some(cap) = cap.as_mut() {
                if !cap.admit(&entity) {
                    log::debug!("[{}] org cap dropped {}", bucket.label, entity.identifier);
                    dropped.capped += 1;
                    continue;
                }
            }
            if rules.top_n.is_some_and(|limit| kept >= limit) {
                dropped.truncated += 1;
                continue;
            }
            kept += 1;
            union.push(entity);
        }
    }

    let (deduped, duplicates) = dedup::dedup_first_seen(union);
    dropped.duplicates = duplicates;

    let mut entities = match rules.org_cap {
        Some(limit) => {
            let mut cap = OrganizationCap::new(limit);
            let mut kept = Vec::with_capacity(deduped.len());
            for entity in deduped {
                if cap.admit(&entity) {
                    kept.push(entity);
                } else {
                    log::debug!("batch org cap dropped {}", entity.identifier);
                    dropped.capped += 1;
                }
            }
            kept
        }
        None => deduped,
    };
    entities.sort_by(|a, b| b.metric_or_zero().cmp(&a.metric_or_zero()));

    Selection { entities, dropped }
}

/// Scores and classifies a selection. History is taken from the reconciler for
/// store-backed sources and from the provider for keywords.
pub fn build_batch(
    kind: SourceKind,
    selection: &Selection,
    reconciler: &Reconciler,
    rules: &SourceRules,
    categorizer: &Categorizer,
    now: DateTime<Utc>,
) -> Vec<TrackedEntity> {
    let mut batch = match kind {
        SourceKind::Keywords => score_keywords(selection, reconciler, now),
        SourceKind::Repositories | SourceKind::Models => selection
            .entities
            .iter()
            .enumerate()
            .map(|(idx, raw)| score_linear(kind, idx, raw, reconciler, categorizer, now))
            .collect(),
    };
    classify::assign_trends(&mut batch, &rules.trend);
    batch
}

fn score_linear(
    kind: SourceKind,
    idx: usize,
    raw: &RawEntity,
    reconciler: &Reconciler,
    categorizer: &Categorizer,
    now: DateTime<Utc>,
) -> TrackedEntity {
    let current = raw.metric_or_zero();
    let (previous, has_history) = reconciler.previous_metric(&raw.identifier, current);
    let stars_delta = current as i64 - previous as i64;

    let (category, rank, details) = match &raw.payload {
        RawPayload::Repository {
            description,
            language,
            url,
        } => (
            None,
            None,
            EntityDetails::Repository {
                description: description.clone().unwrap_or_default(),
                language: language.clone().unwrap_or_else(|| "Unknown".to_string()),
                url: url.clone(),
                stars_delta,
            },
        ),
        RawPayload::Model { pipeline_tag } => {
            let mut tags = raw.tags.clone();
            if let Some(tag) = pipeline_tag {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            let category = categorizer.categorize(&raw.identifier, &tags);
            (
                Some(category),
                Some(idx as u32 + 1),
                EntityDetails::Model {
                    tags: raw.tags.clone(),
                    pipeline_tag: pipeline_tag.clone(),
                },
            )
        }
        RawPayload::Keyword { topic_title } => {
            log::warn!(
                "{kind}: keyword payload for {} ({topic_title}) in a linear source",
                raw.identifier
            );
            (None, None, keyword_details(topic_title, 0, 0, 0, now))
        }
    };

    TrackedEntity {
        identifier: raw.identifier.clone(),
        primary_metric: current,
        previous_metric: previous,
        has_history,
        change_pct: score::change_pct(current, previous),
        trend: Trend::Stable,
        category,
        rank,
        collected_at: reconciler.collected_at(&raw.identifier, now),
        details,
    }
}

fn score_keywords(
    selection: &Selection,
    reconciler: &Reconciler,
    now: DateTime<Utc>,
) -> Vec<TrackedEntity> {
    let max = score::max_magnitude(selection.entities.iter().map(RawEntity::metric_or_zero));
    selection
        .entities
        .iter()
        .map(|raw| {
            let recent = raw.metric_or_zero();
            let prev = raw.prior_metric.unwrap_or(recent);
            let score = score::sqrt_score(recent, max);
            let score_prev = score::sqrt_score(prev, max);
            let topic_title = match &raw.payload {
                RawPayload::Keyword { topic_title } => topic_title.as_str(),
                _ => raw.identifier.as_str(),
            };
            TrackedEntity {
                identifier: raw.identifier.clone(),
                primary_metric: score,
                previous_metric: score_prev,
                has_history: raw.prior_metric.is_some(),
                change_pct: score::change_pct(score, score_prev),
                trend: Trend::Stable,
                category: None,
                rank: None,
                collected_at: reconciler.collected_at(&raw.identifier, now),
                details: keyword_details(topic_title, score_prev, recent, prev, now),
            }
        })
        .collect()
}

fn keyword_details(
    topic_title: &str,
    score_prev: u64,
    views_recent: u64,
    views_prev: u64,
    now: DateTime<Utc>,
) -> EntityDetails {
    EntityDetails::Keyword {
        topic_title: topic_title.to_string(),
        score_prev,
        views_recent,
        views_prev,
        week_start: now.format("%Y-%m-%d").to_string(),
    }
}
