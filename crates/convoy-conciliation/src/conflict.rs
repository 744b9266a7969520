//! Conflict detection over a flat snapshot of running instances.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use convoy_core::{Conflict, ProcessInstance};

/// Group instances by process and keep the processes running on at
/// least two nodes, ordered by process name.
///
/// A second record for the same process on the same node is ignored.
pub fn detect_conflicts<I>(instances: I) -> Vec<Conflict>
where
    I: IntoIterator<Item = ProcessInstance>,
{
    let mut by_process: BTreeMap<String, Vec<ProcessInstance>> = BTreeMap::new();

    for instance in instances {
        let group = by_process.entry(instance.process_name.clone()).or_default();
        if group
            .iter()
            .any(|i| i.node_identifier == instance.node_identifier)
        {
            warn!(
                process = %instance.process_name,
                node = %instance.node_identifier,
                "duplicate instance record ignored"
            );
            continue;
        }
        group.push(instance);
    }

    let conflicts: Vec<Conflict> = by_process
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .filter_map(|(process, group)| match Conflict::new(&process, group) {
            Ok(conflict) => Some(conflict),
            Err(e) => {
                warn!(error = %e, "skipping malformed conflict");
                None
            }
        })
        .collect();

    debug!(conflicts = conflicts.len(), "conflict detection done");
    conflicts
}
