//! Queue-backed process controller.
//!
//! Collects stop intents in issue order so the control loop can drain
//! and deliver them after the engine returns.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use convoy_core::{NodeId, ProcessController};

/// A request to stop one process on one node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopIntent {
    pub node_id: NodeId,
    pub process_name: String,
}

impl StopIntent {
    pub fn new(node_id: &str, process_name: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            process_name: process_name.to_string(),
        }
    }
}

/// FIFO of pending stop intents.
#[derive(Debug, Default)]
pub struct StopQueue {
    pending: VecDeque<StopIntent>,
}

impl StopQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending intents, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &StopIntent> {
        self.pending.iter()
    }

    /// Take every pending intent, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<StopIntent> {
        self.pending.drain(..).collect()
    }
}

impl ProcessController for StopQueue {
    fn request_stop(&mut self, node_id: &str, process_name: &str) {
        info!(node = %node_id, process = %process_name, "stop requested");
        self.pending.push_back(StopIntent::new(node_id, process_name));
    }
}
