use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

use crate::algorithms::SearchOptions;
use crate::analysis::{CriticalityWeights, MatrixOptions};
use crate::error::AnalysisError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchOptions,
    pub matrix: MatrixOptions,
    pub criticality: CriticalityWeights,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.search.limit == 0 {
            return Err(AnalysisError::InvalidConfig("search.limit must be at least 1".to_string()));
        }
        if self.search.exploration_budget == 0 {
            return Err(AnalysisError::InvalidConfig(
                "search.exploration_budget must be at least 1".to_string(),
            ));
        }
        if self.search.max_hops == Some(0) {
            return Err(AnalysisError::InvalidConfig("search.max_hops must be at least 1".to_string()));
        }
        if self.matrix.max_pairs == 0 {
            return Err(AnalysisError::InvalidConfig("matrix.max_pairs must be at least 1".to_string()));
        }
        self.criticality.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.search.exploration_budget, 100_000);
        assert_eq!(config.matrix.max_pairs, 250_000);
        assert_eq!(config.criticality.usage_weight, 70.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"search": {"limit": 3}}"#).unwrap();
        assert_eq!(config.search.limit, 3);
        assert_eq!(config.search.exploration_budget, 100_000);
        assert_eq!(config.criticality, CriticalityWeights::default());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let mut config = EngineConfig::default();
        config.search = config.search.with_limit(25).with_max_hops(8);
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"search": {"limit": 0}}"#).unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
