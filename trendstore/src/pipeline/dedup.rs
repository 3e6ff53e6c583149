use std::collections::HashSet;

use crate::models::RawEntity;

/// Keeps the first occurrence of each identifier; returns the survivors and
/// how many duplicates were discarded.
pub fn dedup_first_seen(entities: impl IntoIterator<Item = RawEntity>) -> (Vec<RawEntity>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut duplicates = 0;
    for entity in entities {
        if seen.insert(entity.identifier.clone()) {
            kept.push(entity);
        } else {
            duplicates += 1;
        }
    }
    (kept, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPayload;

    fn entity(identifier: &str, metric: u64, tag: &str) -> RawEntity {
        RawEntity {
            identifier: identifier.to_string(),
            metric: Some(metric),
            prior_metric: None,
            tags: vec![tag.to_string()],
            payload: RawPayload::Model { pipeline_tag: None },
        }
    }

    #[test]
    fn retains_first_bucket_data() {
        let first = vec![entity("org/shared", 10, "text-generation"), entity("org/a", 5, "x")];
        let second = vec![entity("org/shared", 999, "image-text-to-text"), entity("org/b", 2, "y")];
        let (kept, duplicates) = dedup_first_seen(first.into_iter().chain(second));
        assert_eq!(duplicates, 1);
        assert_eq!(kept.len(), 3);
        let shared: Vec<_> = kept.iter().filter(|e| e.identifier == "org/shared").collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].metric, Some(10));
        assert_eq!(shared[0].tags, vec!["text-generation".to_string()]);
    }
}
