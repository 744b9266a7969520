//! Collaborator traits and the in-memory node table.
//!
//! The engines never own fleet state. They read it through
//! [`NodeRegistry`] and emit stop intents through [`ProcessController`].
//! [`NodeTable`] is the owned registry view the control loop mutates
//! between ticks and lends to the engines for the duration of a call.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::config::ConvoyConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::{MAX_LOADING, NodeId, NodeLoad, NodeState};

/// Read access to node liveness and loading.
pub trait NodeRegistry {
    /// State of a node, `None` when the identifier is unknown.
    fn node_state(&self, node_id: &str) -> Option<NodeState>;

    /// Current loading of a node, 0 when unknown.
    fn node_loading(&self, node_id: &str) -> u8;

    /// Every node identifier the registry knows about.
    fn known_node_ids(&self) -> BTreeSet<NodeId>;

    /// Total preference order over the known nodes.
    fn configured_node_order(&self) -> Vec<NodeId>;
}

/// Fire-and-forget process control on remote nodes.
pub trait ProcessController {
    /// Ask the agent on `node_id` to stop `process_name`.
    fn request_stop(&mut self, node_id: &str, process_name: &str);
}

/// Owned table of node loads, in configured preference order.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: HashMap<NodeId, NodeLoad>,
    order: Vec<NodeId>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every configured node as `UNKNOWN` with no loading.
    pub fn from_config(config: &ConvoyConfig) -> CoreResult<Self> {
        let mut table = Self::new();
        for node_id in &config.fleet.nodes {
            table.insert(NodeLoad::new(node_id, NodeState::Unknown, 0))?;
        }
        debug!(nodes = table.len(), "node table built from config");
        Ok(table)
    }

    /// Build a table from explicit loads; their order is the preference order.
    pub fn from_loads<I>(loads: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = NodeLoad>,
    {
        let mut table = Self::new();
        for load in loads {
            table.insert(load)?;
        }
        Ok(table)
    }

    /// Add a node at the end of the preference order.
    pub fn insert(&mut self, load: NodeLoad) -> CoreResult<()> {
        if self.nodes.contains_key(&load.identifier) {
            return Err(CoreError::DuplicateNode(load.identifier));
        }
        check_loading(&load.identifier, u32::from(load.loading))?;
        self.order.push(load.identifier.clone());
        self.nodes.insert(load.identifier.clone(), load);
        Ok(())
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeLoad> {
        self.nodes.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeLoad> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn set_state(&mut self, node_id: &str, state: NodeState) -> CoreResult<()> {
        let node = self.node_mut(node_id)?;
        if node.state != state {
            info!(node = %node_id, from = %node.state, to = %state, "node state changed");
            node.state = state;
        }
        Ok(())
    }

    pub fn set_loading(&mut self, node_id: &str, loading: u32) -> CoreResult<()> {
        check_loading(node_id, loading)?;
        let node = self.node_mut(node_id)?;
        // check_loading bounds the value to MAX_LOADING, which fits in u8.
        node.loading = loading as u8;
        Ok(())
    }

    /// Overwrite state and loading of an already declared node.
    pub fn update(&mut self, load: &NodeLoad) -> CoreResult<()> {
        self.set_loading(&load.identifier, u32::from(load.loading))?;
        self.set_state(&load.identifier, load.state)
    }

    fn node_mut(&mut self, node_id: &str) -> CoreResult<&mut NodeLoad> {
        self.nodes
            .get_mut(node_id)
            .ok_or_else(|| CoreError::NodeNotFound(node_id.to_string()))
    }
}

impl NodeRegistry for NodeTable {
    fn node_state(&self, node_id: &str) -> Option<NodeState> {
        self.nodes.get(node_id).map(|n| n.state)
    }

    fn node_loading(&self, node_id: &str) -> u8 {
        self.nodes.get(node_id).map_or(0, |n| n.loading)
    }

    fn known_node_ids(&self) -> BTreeSet<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    fn configured_node_order(&self) -> Vec<NodeId> {
        self.order.clone()
    }
}

fn check_loading(node_id: &str, loading: u32) -> CoreResult<()> {
    if loading > MAX_LOADING {
        return Err(CoreError::LoadingOutOfRange {
            node: node_id.to_string(),
            loading,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NodeTable {
        NodeTable::from_loads([
            NodeLoad::new("n2", NodeState::Running, 40),
            NodeLoad::new("n1", NodeState::Silent, 0),
        ])
        .unwrap()
    }

    #[test]
    fn keeps_insertion_order_as_preference() {
        let t = table();
        assert_eq!(t.configured_node_order(), vec!["n2", "n1"]);
        let ids: Vec<&str> = t.iter().map(|n| n.identifier.as_str()).collect();
        assert_eq!(ids, ["n2", "n1"]);
        assert_eq!(t.known_node_ids().into_iter().collect::<Vec<_>>(), ["n1", "n2"]);
    }

    #[test]
    fn unknown_node_reads_as_absent() {
        let t = table();
        assert_eq!(t.node_state("nope"), None);
        assert_eq!(t.node_loading("nope"), 0);
        assert_eq!(t.node_state("n2"), Some(NodeState::Running));
        assert_eq!(t.node_loading("n2"), 40);
    }

    #[test]
    fn rejects_duplicates_and_overload() {
        let mut t = table();
        assert!(matches!(
            t.insert(NodeLoad::new("n1", NodeState::Running, 0)),
            Err(CoreError::DuplicateNode(_))
        ));
        assert!(matches!(
            t.set_loading("n2", 101),
            Err(CoreError::LoadingOutOfRange { loading: 101, .. })
        ));
        assert_eq!(t.node_loading("n2"), 40);
        assert!(matches!(
            t.set_state("ghost", NodeState::Running),
            Err(CoreError::NodeNotFound(_))
        ));
    }

    #[test]
    fn update_overwrites_state_and_loading() {
        let mut t = table();
        t.update(&NodeLoad::new("n1", NodeState::Running, 75)).unwrap();
        assert_eq!(t.get("n1"), Some(&NodeLoad::new("n1", NodeState::Running, 75)));
    }

    #[test]
    fn from_config_declares_unknown_nodes() {
        let config = ConvoyConfig::scaffold(&["a", "b"]);
        let t = NodeTable::from_config(&config).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.node_state("a"), Some(NodeState::Unknown));
        assert_eq!(t.configured_node_order(), vec!["a", "b"]);
    }
}
