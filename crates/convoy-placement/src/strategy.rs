//! Deployment strategies — choose one node among the eligible ones.
//!
//! Each strategy is a plain function over a [`NodeLoadEvaluator`].
//! [`select_node`] maps a [`DeploymentStrategy`] to its function.

use tracing::{debug, warn};

use convoy_core::{DeploymentStrategy, NodeId, NodeRegistry, NodeSelection};

use crate::evaluator::{NodeLoadEvaluator, sort_valid_by_loading};

/// Signature shared by every deployment strategy.
pub type Selector<R> = fn(&NodeLoadEvaluator<'_, R>, &NodeSelection, u32) -> Option<NodeId>;

/// First valid node in the configured preference order.
pub fn config_node<R: NodeRegistry>(
    eval: &NodeLoadEvaluator<'_, R>,
    selection: &NodeSelection,
    additional_load: u32,
) -> Option<NodeId> {
    let map = eval.get_loading_and_validity(selection, additional_load);
    eval.registry()
        .configured_node_order()
        .into_iter()
        .find(|id| map.get(id).is_some_and(|v| v.valid))
}

/// Valid node with the lowest loading.
pub fn less_loaded_node<R: NodeRegistry>(
    eval: &NodeLoadEvaluator<'_, R>,
    selection: &NodeSelection,
    additional_load: u32,
) -> Option<NodeId> {
    let map = eval.get_loading_and_validity(selection, additional_load);
    sort_valid_by_loading(&map)
        .into_iter()
        .next()
        .map(|(id, _)| id)
}

/// Valid node with the highest loading.
pub fn most_loaded_node<R: NodeRegistry>(
    eval: &NodeLoadEvaluator<'_, R>,
    selection: &NodeSelection,
    additional_load: u32,
) -> Option<NodeId> {
    let map = eval.get_loading_and_validity(selection, additional_load);
    sort_valid_by_loading(&map).pop().map(|(id, _)| id)
}

fn selector<R: NodeRegistry>(strategy: DeploymentStrategy) -> Selector<R> {
    match strategy {
        DeploymentStrategy::Config => config_node::<R>,
        DeploymentStrategy::LessLoaded => less_loaded_node::<R>,
        DeploymentStrategy::MostLoaded => most_loaded_node::<R>,
    }
}

/// Choose the node that should host a process needing `additional_load`.
///
/// Returns `None` when no requested node is running with enough room.
pub fn select_node<R: NodeRegistry>(
    registry: &R,
    strategy: DeploymentStrategy,
    selection: &NodeSelection,
    additional_load: u32,
) -> Option<NodeId> {
    let eval = NodeLoadEvaluator::new(registry);
    let chosen = selector::<R>(strategy)(&eval, selection, additional_load);

    match &chosen {
        Some(node) => debug!(%strategy, %node, additional_load, "node selected"),
        None => warn!(%strategy, additional_load, "no node can take the requested load"),
    }
    chosen
}
