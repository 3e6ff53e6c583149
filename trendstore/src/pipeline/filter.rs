use crate::models::RawEntity;
use crate::rules::SourceRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Blocked,
    Inactive,
}

/// Drops blocklisted identifiers and entities without meaningful activity.
#[derive(Debug, Clone)]
pub struct EntityFilter {
    blocklist: Vec<String>,
    drop_inactive: bool,
    min_metric: u64,
}

impl EntityFilter {
    pub fn new(blocklist: &[String], drop_inactive: bool, min_metric: u64) -> Self {
        Self {
            blocklist: blocklist
                .iter()
                .map(|entry| entry.trim().to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
            drop_inactive,
            min_metric,
        }
    }

    pub fn from_rules(rules: &SourceRules) -> Self {
        Self::new(&rules.blocklist, rules.drop_inactive, rules.min_metric)
    }

    pub fn check(&self, entity: &RawEntity) -> Result<(), Rejection> {
        let identifier = entity.identifier.to_lowercase();
        if self
            .blocklist
            .iter()
            .any(|fragment| identifier.contains(fragment.as_str()))
        {
            return Err(Rejection::Blocked);
        }
        if self.drop_inactive {
            match entity.metric {
                None | Some(0) => return Err(Rejection::Inactive),
                Some(metric) if metric < self.min_metric => return Err(Rejection::Inactive),
                Some(_) => {}
            }
        }
        Ok(())
    }
}
