//! Conciliation strategies.
//!
//! Each strategy is a plain function over the conflict set. The
//! [`conciliate`] dispatcher maps a [`ConciliationStrategy`] to exactly
//! one of them and calls it once.
//!
//! Instances are ordered by uptime: the lowest uptime is the youngest.
//! When uptimes are equal, the instance on the lexically smallest node
//! identifier is the one kept.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::{debug, info};

use convoy_core::{ConciliationStrategy, Conflict, ProcessController, ProcessInstance};

/// Signature shared by every conciliation strategy.
pub type Conciliator<C> = fn(&mut C, &mut [Conflict]);

/// Outcome of one conciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConciliationReport {
    pub strategy: ConciliationStrategy,
    /// Number of conflicts handed to the strategy.
    pub conflicts: usize,
    /// Stop intents issued through the controller.
    pub stop_intents: usize,
    /// Processes whose instances are now marked for restart.
    pub restart: Vec<String>,
}

/// Keep the youngest instance of each conflict, stop the elders.
pub fn senicide<C: ProcessController>(controller: &mut C, conflicts: &mut [Conflict]) {
    for conflict in conflicts.iter() {
        let keep = conflict
            .instances()
            .iter()
            .min_by(|a, b| {
                (a.uptime, &a.node_identifier).cmp(&(b.uptime, &b.node_identifier))
            });
        stop_all_but(controller, conflict, keep);
    }
}

/// Keep the oldest instance of each conflict, stop the younger ones.
pub fn infanticide<C: ProcessController>(controller: &mut C, conflicts: &mut [Conflict]) {
    for conflict in conflicts.iter() {
        let keep = conflict
            .instances()
            .iter()
            .min_by(|a, b| {
                let a_key = (Reverse(a.uptime), &a.node_identifier);
                a_key.cmp(&(Reverse(b.uptime), &b.node_identifier))
            });
        stop_all_but(controller, conflict, keep);
    }
}

/// Leave every conflict to the operator.
pub fn user<C: ProcessController>(_controller: &mut C, conflicts: &mut [Conflict]) {
    for conflict in conflicts.iter() {
        info!(process = %conflict.process_name(), "conflict left to the operator");
    }
}

/// Stop every instance of every conflict.
pub fn stop_all<C: ProcessController>(controller: &mut C, conflicts: &mut [Conflict]) {
    for conflict in conflicts.iter() {
        stop_all_but(controller, conflict, None);
    }
}

/// Stop every instance, then mark each one for restart so the caller
/// redeploys the process once the stops are confirmed.
pub fn restart<C: ProcessController>(controller: &mut C, conflicts: &mut [Conflict]) {
    for conflict in conflicts.iter_mut() {
        stop_all_but(controller, conflict, None);
        for instance in conflict.instances_mut() {
            instance.restart_requested = true;
        }
        info!(process = %conflict.process_name(), "process marked for restart");
    }
}

fn stop_all_but<C: ProcessController>(
    controller: &mut C,
    conflict: &Conflict,
    keep: Option<&ProcessInstance>,
) {
    if let Some(kept) = keep {
        debug!(
            process = %conflict.process_name(),
            node = %kept.node_identifier,
            uptime = kept.uptime,
            "instance kept"
        );
    }
    for instance in conflict.instances() {
        if keep.is_some_and(|k| k.node_identifier == instance.node_identifier) {
            continue;
        }
        controller.request_stop(&instance.node_identifier, conflict.process_name());
    }
}

/// Counts intents on their way to the real controller.
struct Counting<'a, C> {
    inner: &'a mut C,
    issued: usize,
}

impl<C: ProcessController> ProcessController for Counting<'_, C> {
    fn request_stop(&mut self, node_id: &str, process_name: &str) {
        self.issued += 1;
        self.inner.request_stop(node_id, process_name);
    }
}

fn conciliator<C: ProcessController>(strategy: ConciliationStrategy) -> Conciliator<C> {
    match strategy {
        ConciliationStrategy::Senicide => senicide::<C>,
        ConciliationStrategy::Infanticide => infanticide::<C>,
        ConciliationStrategy::User => user::<C>,
        ConciliationStrategy::Stop => stop_all::<C>,
        ConciliationStrategy::Restart => restart::<C>,
    }
}

/// Resolve `conflicts` with `strategy`, issuing stops through `controller`.
pub fn conciliate<C: ProcessController>(
    controller: &mut C,
    strategy: ConciliationStrategy,
    conflicts: &mut [Conflict],
) -> ConciliationReport {
    let mut counting = Counting {
        inner: controller,
        issued: 0,
    };
    conciliator::<Counting<'_, C>>(strategy)(&mut counting, conflicts);

    let restart = conflicts
        .iter()
        .filter(|c| c.is_marked_for_restart())
        .map(|c| c.process_name().to_string())
        .collect();

    let report = ConciliationReport {
        strategy,
        conflicts: conflicts.len(),
        stop_intents: counting.issued,
        restart,
    };
    info!(
        %strategy,
        conflicts = report.conflicts,
        stop_intents = report.stop_intents,
        "conciliation done"
    );
    report
}
