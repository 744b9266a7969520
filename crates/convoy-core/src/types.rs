//! Domain types shared by the Convoy engines.
//!
//! Node loads are owned by the registry and only read by the engines.
//! Process instances and conflicts are built by the caller right before
//! a conciliation pass and dropped afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Unique identifier for a managed node.
pub type NodeId = String;

/// Upper bound of a node loading, in percent of its capacity.
pub const MAX_LOADING: u32 = 100;

// ── Node ──────────────────────────────────────────────────────────

/// Liveness state of a node as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    #[default]
    Unknown,
    Silent,
    Running,
    Isolating,
    Isolated,
}

impl NodeState {
    pub fn label(&self) -> &'static str {
        match self {
            NodeState::Unknown => "UNKNOWN",
            NodeState::Silent => "SILENT",
            NodeState::Running => "RUNNING",
            NodeState::Isolating => "ISOLATING",
            NodeState::Isolated => "ISOLATED",
        }
    }

    /// Only running nodes may receive new process instances.
    pub fn is_deployment_candidate(&self) -> bool {
        matches!(self, NodeState::Running)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(NodeState::Unknown),
            "SILENT" => Ok(NodeState::Silent),
            "RUNNING" => Ok(NodeState::Running),
            "ISOLATING" => Ok(NodeState::Isolating),
            "ISOLATED" => Ok(NodeState::Isolated),
            _ => Err(CoreError::UnknownNodeState(s.to_string())),
        }
    }
}

/// Current state and loading of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub identifier: NodeId,
    #[serde(default)]
    pub state: NodeState,
    /// Percent of capacity in use (0..=100).
    #[serde(default)]
    pub loading: u8,
}

impl NodeLoad {
    pub fn new(identifier: &str, state: NodeState, loading: u8) -> Self {
        Self {
            identifier: identifier.to_string(),
            state,
            loading,
        }
    }
}

/// Validity of a node for an additional load, with its current loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingValidity {
    pub valid: bool,
    pub loading: u8,
}

impl LoadingValidity {
    pub fn new(valid: bool, loading: u8) -> Self {
        Self { valid, loading }
    }

    /// Result reported for unknown or non-running nodes.
    pub fn rejected() -> Self {
        Self::new(false, 0)
    }
}

/// Which nodes a placement request may consider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSelection {
    /// Every node known to the registry (the `*` wildcard).
    #[default]
    All,
    /// An explicit set of node identifiers.
    Only(Vec<NodeId>),
}

impl NodeSelection {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        NodeSelection::Only(ids.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, node_id: &str) -> bool {
        match self {
            NodeSelection::All => true,
            NodeSelection::Only(ids) => ids.iter().any(|id| id == node_id),
        }
    }
}

impl FromStr for NodeSelection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" || s.is_empty() {
            return Ok(NodeSelection::All);
        }
        Ok(NodeSelection::only(
            s.split(',').map(str::trim).filter(|id| !id.is_empty()),
        ))
    }
}

// ── Process ───────────────────────────────────────────────────────

/// One running occurrence of a logical process on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInstance {
    pub node_identifier: NodeId,
    pub process_name: String,
    /// Seconds the instance has been running. Lower means younger.
    pub uptime: u64,
    #[serde(default)]
    pub restart_requested: bool,
}

impl ProcessInstance {
    pub fn new(node_identifier: &str, process_name: &str, uptime: u64) -> Self {
        Self {
            node_identifier: node_identifier.to_string(),
            process_name: process_name.to_string(),
            uptime,
            restart_requested: false,
        }
    }
}

/// The same logical process running on two or more nodes at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    process_name: String,
    instances: Vec<ProcessInstance>,
}

impl Conflict {
    /// Build a conflict, checking it spans at least two distinct nodes
    /// and that every instance belongs to `process_name`.
    pub fn new(process_name: &str, instances: Vec<ProcessInstance>) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::InvalidConflict {
            process: process_name.to_string(),
            reason: reason.to_string(),
        };

        if instances.len() < 2 {
            return Err(invalid("fewer than two instances"));
        }
        if instances.iter().any(|i| i.process_name != process_name) {
            return Err(invalid("instance of another process"));
        }
        let nodes: BTreeSet<&str> = instances
            .iter()
            .map(|i| i.node_identifier.as_str())
            .collect();
        if nodes.len() != instances.len() {
            return Err(invalid("two instances on the same node"));
        }

        Ok(Self {
            process_name: process_name.to_string(),
            instances,
        })
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn instances(&self) -> &[ProcessInstance] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [ProcessInstance] {
        &mut self.instances
    }

    pub fn is_marked_for_restart(&self) -> bool {
        self.instances.iter().all(|i| i.restart_requested)
    }
}

// ── Strategies ────────────────────────────────────────────────────

/// Policy used to choose the node hosting a new process instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStrategy {
    /// First eligible node in the configured preference order.
    #[default]
    Config,
    /// Eligible node with the lowest loading.
    LessLoaded,
    /// Eligible node with the highest loading.
    MostLoaded,
}

impl DeploymentStrategy {
    pub const ALL: [DeploymentStrategy; 3] = [
        DeploymentStrategy::Config,
        DeploymentStrategy::LessLoaded,
        DeploymentStrategy::MostLoaded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeploymentStrategy::Config => "CONFIG",
            DeploymentStrategy::LessLoaded => "LESS_LOADED",
            DeploymentStrategy::MostLoaded => "MOST_LOADED",
        }
    }
}

impl fmt::Display for DeploymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeploymentStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label() == key)
            .ok_or_else(|| CoreError::UnknownStrategy(s.to_string()))
    }
}

/// Policy used to resolve a process running on several nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConciliationStrategy {
    /// Keep the youngest instance, stop the elders.
    Senicide,
    /// Keep the oldest instance, stop the younger ones.
    Infanticide,
    /// Leave the conflict to an operator.
    #[default]
    User,
    /// Stop every instance.
    Stop,
    /// Stop every instance and ask for a fresh deployment.
    Restart,
}

impl ConciliationStrategy {
    pub const ALL: [ConciliationStrategy; 5] = [
        ConciliationStrategy::Senicide,
        ConciliationStrategy::Infanticide,
        ConciliationStrategy::User,
        ConciliationStrategy::Stop,
        ConciliationStrategy::Restart,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ConciliationStrategy::Senicide => "SENICIDE",
            ConciliationStrategy::Infanticide => "INFANTICIDE",
            ConciliationStrategy::User => "USER",
            ConciliationStrategy::Stop => "STOP",
            ConciliationStrategy::Restart => "RESTART",
        }
    }
}

impl fmt::Display for ConciliationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConciliationStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label() == key)
            .ok_or_else(|| CoreError::UnknownStrategy(s.to_string()))
    }
}

/// `less-loaded`, `less_loaded` and `LESS_LOADED` all name the same policy.
fn normalize_label(s: &str) -> String {
    s.trim().replace('-', "_").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_labels_parse_case_insensitively() {
        assert_eq!(
            "less-loaded".parse::<DeploymentStrategy>().unwrap(),
            DeploymentStrategy::LessLoaded
        );
        assert_eq!(
            "MOST_LOADED".parse::<DeploymentStrategy>().unwrap(),
            DeploymentStrategy::MostLoaded
        );
        assert_eq!(
            "senicide".parse::<ConciliationStrategy>().unwrap(),
            ConciliationStrategy::Senicide
        );
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = "round_robin".parse::<DeploymentStrategy>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownStrategy(s) if s == "round_robin"));
        assert!("kill_all".parse::<ConciliationStrategy>().is_err());
    }

    #[test]
    fn strategies_serialize_snake_case() {
        let json = serde_json::to_string(&DeploymentStrategy::LessLoaded).unwrap();
        assert_eq!(json, "\"less_loaded\"");
        let back: ConciliationStrategy = serde_json::from_str("\"infanticide\"").unwrap();
        assert_eq!(back, ConciliationStrategy::Infanticide);
    }

    #[test]
    fn node_state_json_uses_upper_case() {
        let node: NodeLoad =
            serde_json::from_str(r#"{"identifier":"n1","state":"ISOLATING","loading":30}"#)
                .unwrap();
        assert_eq!(node.state, NodeState::Isolating);
        assert_eq!("running".parse::<NodeState>().unwrap(), NodeState::Running);
        assert!(!NodeState::Silent.is_deployment_candidate());
    }

    #[test]
    fn node_selection_parses_wildcard_and_lists() {
        assert_eq!("*".parse::<NodeSelection>().unwrap(), NodeSelection::All);
        let only: NodeSelection = "a, b,,c".parse().unwrap();
        assert_eq!(only, NodeSelection::only(["a", "b", "c"]));
        assert!(only.contains("b"));
        assert!(!only.contains("d"));
    }

    #[test]
    fn conflict_requires_two_distinct_nodes() {
        let single = Conflict::new("web", vec![ProcessInstance::new("n1", "web", 3)]);
        assert!(single.is_err());

        let same_node = Conflict::new(
            "web",
            vec![
                ProcessInstance::new("n1", "web", 3),
                ProcessInstance::new("n1", "web", 4),
            ],
        );
        assert!(same_node.is_err());

        let mixed = Conflict::new(
            "web",
            vec![
                ProcessInstance::new("n1", "web", 3),
                ProcessInstance::new("n2", "db", 4),
            ],
        );
        assert!(mixed.is_err());

        let ok = Conflict::new(
            "web",
            vec![
                ProcessInstance::new("n1", "web", 3),
                ProcessInstance::new("n2", "web", 4),
            ],
        )
        .unwrap();
        assert_eq!(ok.process_name(), "web");
        assert_eq!(ok.instances().len(), 2);
        assert!(!ok.is_marked_for_restart());
    }
}
