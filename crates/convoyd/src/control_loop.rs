//! Control loop — one decision pass per tick.
//!
//! Each tick refreshes the node table from the fleet snapshot, records
//! node loadings, conciliates duplicate processes and places processes
//! whose restart was requested once their old instances are gone. The
//! engines are only ever entered from this single task.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use convoy_conciliation::{
    ConciliationReport, StopIntent, StopQueue, conciliate, detect_conflicts,
};
use convoy_core::{ConvoyConfig, NodeId, NodeRegistry, NodeSelection, NodeTable};
use convoy_placement::select_node;
use convoy_stats::SampleHistory;

use crate::snapshot::FleetSnapshot;

/// Where a restarted process should go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub process_name: String,
    pub node_id: NodeId,
    pub expected_loading: u32,
}

/// Decisions taken during one tick.
#[derive(Debug, Default, Serialize)]
pub struct TickOutcome {
    pub conciliation: Option<ConciliationReport>,
    pub stops: Vec<StopIntent>,
    pub placements: Vec<Placement>,
}

pub struct ControlLoop {
    config: ConvoyConfig,
    nodes: NodeTable,
    history: SampleHistory,
    stops: StopQueue,
    /// Stops already issued for instances the snapshot still lists.
    issued: BTreeSet<StopIntent>,
    /// Processes waiting for their stops to land: name → expected loading.
    pending_restarts: BTreeMap<String, u32>,
}

impl ControlLoop {
    pub fn new(config: ConvoyConfig) -> anyhow::Result<Self> {
        let nodes = NodeTable::from_config(&config)?;
        let history = SampleHistory::new(config.statistics.depth);
        Ok(Self {
            config,
            nodes,
            history,
            stops: StopQueue::new(),
            issued: BTreeSet::new(),
            pending_restarts: BTreeMap::new(),
        })
    }

    #[cfg(test)]
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    #[cfg(test)]
    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn pending_restarts(&self) -> impl Iterator<Item = &str> {
        self.pending_restarts.keys().map(String::as_str)
    }

    /// Run one decision pass against `snapshot`.
    pub fn tick(&mut self, snapshot: &FleetSnapshot) -> anyhow::Result<TickOutcome> {
        snapshot.apply_to(&mut self.nodes)?;
        self.record_loadings();

        let mut outcome = TickOutcome::default();

        // An instance already told to stop no longer counts towards a
        // conflict, so the same stop is not issued again every tick.
        let listed: BTreeSet<StopIntent> = snapshot
            .instances()
            .map(|i| StopIntent::new(&i.node_identifier, &i.process_name))
            .collect();
        self.issued.retain(|stop| listed.contains(stop));
        let issued = &self.issued;
        let mut conflicts = detect_conflicts(snapshot.instances().filter(|i| {
            !issued.contains(&StopIntent::new(&i.node_identifier, &i.process_name))
        }));
        if !conflicts.is_empty() {
            let report = conciliate(
                &mut self.stops,
                self.config.conciliation.strategy,
                &mut conflicts,
            );
            let loadings = snapshot.expected_loadings();
            for process in &report.restart {
                let load = loadings.get(process).copied().unwrap_or_default();
                self.pending_restarts.insert(process.clone(), load);
            }
            outcome.conciliation = Some(report);
        }
        outcome.stops = self.stops.drain();
        self.issued.extend(outcome.stops.iter().cloned());

        outcome.placements = self.place_restarted(snapshot);
        Ok(outcome)
    }

    fn record_loadings(&mut self) {
        for node in self.nodes.iter() {
            self.history.push(&node.identifier, f64::from(node.loading));
        }
        for subject in self.history.subjects() {
            if let Some(stats) = self.history.stats(subject) {
                debug!(
                    node = subject,
                    mean = stats.mean,
                    rate = ?stats.rate,
                    slope = ?stats.regression.map(|r| r.slope),
                    "loading trend"
                );
            }
        }
    }

    /// Place restarted processes whose instances have all stopped. Those
    /// still running, or with no eligible node, wait for a later tick.
    ///
    /// Placements within one tick are charged against a scratch copy of
    /// the node table so two restarts never share headroom.
    fn place_restarted(&mut self, snapshot: &FleetSnapshot) -> Vec<Placement> {
        let strategy = self.config.deployment.strategy;
        let mut scratch = self.nodes.clone();
        let mut placements = Vec::new();

        for (process, &load) in &self.pending_restarts {
            if snapshot.is_running(process) {
                debug!(%process, "waiting for stops to complete");
                continue;
            }
            match select_node(&scratch, strategy, &NodeSelection::All, load) {
                Some(node_id) => {
                    let charged = u32::from(scratch.node_loading(&node_id)) + load;
                    if let Err(e) = scratch.set_loading(&node_id, charged) {
                        warn!(%process, error = %e, "could not charge placed load");
                    }
                    info!(%process, node = %node_id, load, "restart placed");
                    placements.push(Placement {
                        process_name: process.clone(),
                        node_id,
                        expected_loading: load,
                    });
                }
                None => warn!(%process, load, "no node for restart, retrying next tick"),
            }
        }

        for placement in &placements {
            self.pending_restarts.remove(&placement.process_name);
        }
        placements
    }

    /// Tick every `interval` until `shutdown` flips.
    pub async fn run(
        &mut self,
        snapshot_path: PathBuf,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            interval_secs = interval.as_secs(),
            snapshot = ?snapshot_path,
            "control loop started"
        );

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = FleetSnapshot::from_file(&snapshot_path)
                        .and_then(|snapshot| self.tick(&snapshot));
                    match result {
                        Ok(outcome) => self.report(&outcome),
                        Err(e) => error!(error = %e, "control loop tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("control loop shutting down");
                    break;
                }
            }
        }
    }

    fn report(&self, outcome: &TickOutcome) {
        for stop in &outcome.stops {
            info!(node = %stop.node_id, process = %stop.process_name, "stop intent issued");
        }
        for placement in &outcome.placements {
            info!(
                node = %placement.node_id,
                process = %placement.process_name,
                "start intent issued"
            );
        }
        let pending: Vec<&str> = self.pending_restarts().collect();
        if !pending.is_empty() {
            debug!(?pending, "restarts awaiting placement");
        }
    }
}
