//! Fleet snapshot — the registry's view of nodes and running processes.
//!
//! Read from a JSON file on every tick; whatever maintains that file
//! (agent listener, event bus bridge) lives outside the daemon.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use convoy_core::{CoreError, NodeLoad, NodeTable, ProcessInstance};

/// One running process instance and the load it asks for when placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    #[serde(flatten)]
    pub instance: ProcessInstance,
    /// Loading the process adds to the node it runs on.
    #[serde(default)]
    pub expected_loading: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeLoad>,
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
}

impl FleetSnapshot {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Copy node states and loadings into `table`.
    ///
    /// Nodes missing from the configuration are skipped; a loading above
    /// the ceiling is an error. On error `table` is left as it was.
    pub fn apply_to(&self, table: &mut NodeTable) -> anyhow::Result<usize> {
        let mut staged = table.clone();
        let mut applied = 0;
        for load in &self.nodes {
            match staged.update(load) {
                Ok(()) => applied += 1,
                Err(CoreError::NodeNotFound(node)) => {
                    warn!(%node, "snapshot node not in fleet config");
                }
                Err(e) => return Err(e.into()),
            }
        }
        *table = staged;
        Ok(applied)
    }

    pub fn instances(&self) -> impl Iterator<Item = ProcessInstance> + '_ {
        self.processes.iter().map(|p| p.instance.clone())
    }

    /// Highest expected loading recorded for each process.
    pub fn expected_loadings(&self) -> BTreeMap<String, u32> {
        let mut loadings: BTreeMap<String, u32> = BTreeMap::new();
        for record in &self.processes {
            let entry = loadings
                .entry(record.instance.process_name.clone())
                .or_default();
            *entry = (*entry).max(record.expected_loading);
        }
        loadings
    }

    pub fn is_running(&self, process_name: &str) -> bool {
        self.processes
            .iter()
            .any(|p| p.instance.process_name == process_name)
    }
}
