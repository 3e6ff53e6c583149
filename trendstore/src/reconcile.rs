use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::TrackedEntity;

/// What a cycle will write: every current entity, and every prior identifier
/// that is no longer present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub upserts: Vec<TrackedEntity>,
    pub deletes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub upserted: usize,
    pub deleted: usize,
}

/// Holds the prior snapshot for one source, read once before anything is
/// written in the cycle.
#[derive(Debug, Default)]
pub struct Reconciler {
    prior: HashMap<String, TrackedEntity>,
}

impl Reconciler {
    pub fn new(prior: Vec<TrackedEntity>) -> Self {
        Self {
            prior: prior
                .into_iter()
                .map(|entity| (entity.identifier.clone(), entity))
                .collect(),
        }
    }

    pub fn prior_len(&self) -> usize {
        self.prior.len()
    }

    /// The stored metric, or `current` with `has_history = false`.
    pub fn previous_metric(&self, identifier: &str, current: u64) -> (u64, bool) {
        match self.prior.get(identifier) {
            Some(prior) => (prior.primary_metric, true),
            None => (current, false),
        }
    }

    /// Keeps `collected_at` strictly increasing per identifier even if the
    /// clock has not moved since the prior cycle.
    pub fn collected_at(&self, identifier: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.prior.get(identifier) {
            Some(prior) if prior.collected_at >= now => prior.collected_at + Duration::milliseconds(1),
            _ => now,
        }
    }

    pub fn plan(&self, batch: Vec<TrackedEntity>) -> ReconcilePlan {
        let current: HashSet<&str> = batch.iter().map(|e| e.identifier.as_str()).collect();
        let mut deletes: Vec<String> = self
            .prior
            .keys()
            .filter(|identifier| !current.contains(identifier.as_str()))
            .cloned()
            .collect();
        deletes.sort();
        ReconcilePlan {
            upserts: batch,
            deletes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityDetails, Trend};

    fn entity(identifier: &str, metric: u64) -> TrackedEntity {
        TrackedEntity {
            identifier: identifier.to_string(),
            primary_metric: metric,
            previous_metric: metric,
            has_history: false,
            change_pct: 0,
            trend: Trend::Stable,
            category: None,
            rank: None,
            collected_at: Utc::now(),
            details: EntityDetails::Model {
                tags: Vec::new(),
                pipeline_tag: None,
            },
        }
    }

    #[test]
    fn stale_identifiers_are_deleted() {
        let reconciler = Reconciler::new(vec![entity("X", 10), entity("Y", 20), entity("Z", 30)]);
        assert_eq!(reconciler.previous_metric("X", 15), (10, true));
        assert_eq!(reconciler.previous_metric("W", 7), (7, false));

        let plan = reconciler.plan(vec![entity("X", 15), entity("W", 7)]);
        assert_eq!(plan.deletes, vec!["Y".to_string(), "Z".to_string()]);
        let upserted: Vec<_> = plan.upserts.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(upserted, vec!["X", "W"]);
    }

    #[test]
    fn empty_prior_deletes_nothing() {
        let plan = Reconciler::new(Vec::new()).plan(vec![entity("A", 1)]);
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.upserts.len(), 1);
    }

    #[test]
    fn collected_at_moves_forward() {
        let mut prior = entity("A", 1);
        let later = Utc::now() + Duration::seconds(30);
        prior.collected_at = later;
        let reconciler = Reconciler::new(vec![prior]);
        let stamped = reconciler.collected_at("A", Utc::now());
        assert!(stamped > later);
        let fresh = Utc::now();
        assert_eq!(reconciler.collected_at("B", fresh), fresh);
    }
}
