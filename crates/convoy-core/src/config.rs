//! convoy.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ConciliationStrategy, DeploymentStrategy, NodeId};

/// Default number of samples kept per statistics subject.
pub const DEFAULT_STATS_DEPTH: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvoyConfig {
    pub fleet: FleetConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub conciliation: ConciliationConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Node identifiers, in preference order.
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub strategy: DeploymentStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConciliationConfig {
    #[serde(default)]
    pub strategy: ConciliationStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Samples kept per node or process.
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_STATS_DEPTH,
        }
    }
}

fn default_depth() -> usize {
    DEFAULT_STATS_DEPTH
}

impl ConvoyConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ConvoyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the fleet is usable: at least one node, no duplicates, a
    /// statistics window long enough to compute a trend.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fleet.nodes.is_empty() {
            return Err(CoreError::Config("fleet.nodes is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for node in &self.fleet.nodes {
            if !seen.insert(node.as_str()) {
                return Err(CoreError::DuplicateNode(node.clone()));
            }
        }
        if self.statistics.depth < 2 {
            return Err(CoreError::Config(format!(
                "statistics.depth must be at least 2, got {}",
                self.statistics.depth
            )));
        }
        Ok(())
    }

    /// Scaffold a minimal convoy.toml for the given nodes.
    pub fn scaffold(nodes: &[&str]) -> Self {
        ConvoyConfig {
            fleet: FleetConfig {
                nodes: nodes.iter().map(|n| n.to_string()).collect(),
            },
            deployment: DeploymentConfig::default(),
            conciliation: ConciliationConfig::default(),
            statistics: StatisticsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = ConvoyConfig::scaffold(&["10.0.0.1", "10.0.0.2"]);
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("10.0.0.2"));
        assert!(toml_str.contains("config"));
        assert!(toml_str.contains("user"));
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[fleet]
nodes = ["a", "b"]
"#;
        let config = ConvoyConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.fleet.nodes, ["a", "b"]);
        assert_eq!(config.deployment.strategy, DeploymentStrategy::Config);
        assert_eq!(config.conciliation.strategy, ConciliationStrategy::User);
        assert_eq!(config.statistics.depth, DEFAULT_STATS_DEPTH);
    }

    #[test]
    fn test_parse_strategies() {
        let toml_str = r#"
[fleet]
nodes = ["a"]

[deployment]
strategy = "most_loaded"

[conciliation]
strategy = "restart"

[statistics]
depth = 10
"#;
        let config = ConvoyConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.deployment.strategy, DeploymentStrategy::MostLoaded);
        assert_eq!(config.conciliation.strategy, ConciliationStrategy::Restart);
        assert_eq!(config.statistics.depth, 10);
    }

    #[test]
    fn test_unknown_strategy_fails() {
        let toml_str = r#"
[fleet]
nodes = ["a"]

[deployment]
strategy = "random"
"#;
        assert!(ConvoyConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = ConvoyConfig::scaffold(&["a", "a"]);
        assert!(matches!(config.validate(), Err(CoreError::DuplicateNode(_))));

        config.fleet.nodes = Vec::new();
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        config.fleet.nodes = vec!["a".to_string()];
        config.statistics.depth = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convoy.toml");
        let config = ConvoyConfig::scaffold(&["x", "y"]);
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = ConvoyConfig::from_file(&path).unwrap();
        assert_eq!(loaded.fleet.nodes, ["x", "y"]);
    }
}
