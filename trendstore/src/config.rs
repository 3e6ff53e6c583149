use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfig {
    pub trends_path: PathBuf,
    pub catalog_path: PathBuf,
    pub rules_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            trends_path: base_path.join("trends.sqlite"),
            catalog_path: base_path.join("catalog.sqlite"),
            rules_path: None,
        }
    }

    pub fn with_rules(mut self, rules_path: Option<PathBuf>) -> Self {
        self.rules_path = rules_path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_paths_from_base() {
        let config = StorageConfig::new("/tmp/horizon");
        assert_eq!(config.trends_path, PathBuf::from("/tmp/horizon/trends.sqlite"));
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/horizon/catalog.sqlite"));
        assert!(config.rules_path.is_none());
    }
}
