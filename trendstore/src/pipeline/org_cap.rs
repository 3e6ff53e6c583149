use std::collections::HashMap;

use crate::models::RawEntity;

/// Text before the first `/`, or the whole identifier when there is none.
pub fn organization_of(identifier: &str) -> &str {
    identifier
        .split_once('/')
        .map(|(org, _)| org)
        .unwrap_or(identifier)
}

/// Streaming, order-preserving cap on entities per organization.
///
/// Upstream order decides who survives: once an organization has `cap`
/// entities, every later entity from it is dropped.
#[derive(Debug)]
pub struct OrganizationCap {
    cap: usize,
    seen: HashMap<String, usize>,
}

impl OrganizationCap {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: HashMap::new(),
        }
    }

    pub fn admit(&mut self, entity: &RawEntity) -> bool {
        let count = self
            .seen
            .entry(organization_of(&entity.identifier).to_lowercase())
            .or_insert(0);
        if *count >= self.cap {
            return false;
        }
        *count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPayload;

    fn entity(identifier: &str) -> RawEntity {
        RawEntity {
            identifier: identifier.to_string(),
            metric: Some(1),
            prior_metric: None,
            tags: Vec::new(),
            payload: RawPayload::Model { pipeline_tag: None },
        }
    }

    #[test]
    fn organization_is_prefix_before_first_separator() {
        assert_eq!(organization_of("meta-llama/Llama-3/variant"), "meta-llama");
        assert_eq!(organization_of("standalone"), "standalone");
    }

    #[test]
    fn keeps_first_entities_in_order() {
        let ids = ["a/1", "b/1", "a/2", "a/3", "b/2", "a/4", "c", "c"];
        let mut cap = OrganizationCap::new(2);
        let kept: Vec<_> = ids
            .iter()
            .map(|id| entity(id))
            .filter(|e| cap.admit(e))
            .map(|e| e.identifier)
            .collect();
        assert_eq!(kept, vec!["a/1", "b/1", "a/2", "b/2", "c", "c"]);
    }

    #[test]
    fn never_exceeds_cap_for_any_value() {
        let ids: Vec<String> = (0..60)
            .map(|i| format!("org{}/model{}", i % 4, i))
            .collect();
        for cap_value in 1..=8 {
            let mut cap = OrganizationCap::new(cap_value);
            let mut counts: HashMap<String, usize> = HashMap::new();
            for id in &ids {
                let e = entity(id);
                if cap.admit(&e) {
                    *counts.entry(organization_of(id).to_string()).or_default() += 1;
                }
            }
            assert!(counts.values().all(|&n| n <= cap_value));
            assert_eq!(counts.len(), 4);
        }
    }
}
