//! Node load evaluation for placement decisions.
//!
//! A node can take an additional load when it is `RUNNING` and its
//! current loading plus the request stays within [`MAX_LOADING`].

use std::collections::BTreeMap;

use tracing::debug;

use convoy_core::{LoadingValidity, MAX_LOADING, NodeId, NodeRegistry, NodeSelection};

/// Validity and loading per requested node, keyed by node identifier.
pub type LoadingMap = BTreeMap<NodeId, LoadingValidity>;

/// Evaluates candidate nodes against the registry's current view.
///
/// Borrows the registry for one decision only.
pub struct NodeLoadEvaluator<'a, R: NodeRegistry> {
    registry: &'a R,
}

impl<'a, R: NodeRegistry> NodeLoadEvaluator<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a R {
        self.registry
    }

    /// Whether `node_id` can take `additional_load` more.
    ///
    /// Unknown and non-running nodes report `(false, 0)`. Running nodes
    /// always report their actual loading, valid or not.
    pub fn is_loading_valid(&self, node_id: &str, additional_load: u32) -> LoadingValidity {
        match self.registry.node_state(node_id) {
            Some(state) if state.is_deployment_candidate() => {
                let loading = self.registry.node_loading(node_id);
                let valid = u32::from(loading).saturating_add(additional_load) <= MAX_LOADING;
                LoadingValidity::new(valid, loading)
            }
            _ => LoadingValidity::rejected(),
        }
    }

    /// Validity of every requested node, one entry per requested id.
    pub fn get_loading_and_validity(
        &self,
        selection: &NodeSelection,
        additional_load: u32,
    ) -> LoadingMap {
        let node_ids: Vec<NodeId> = match selection {
            NodeSelection::All => self.registry.known_node_ids().into_iter().collect(),
            NodeSelection::Only(ids) => ids.clone(),
        };

        let map: LoadingMap = node_ids
            .into_iter()
            .map(|id| {
                let validity = self.is_loading_valid(&id, additional_load);
                (id, validity)
            })
            .collect();

        debug!(
            requested = map.len(),
            valid = map.values().filter(|v| v.valid).count(),
            additional_load,
            "evaluated node loadings"
        );
        map
    }
}

/// Valid nodes only, ascending by loading, ties broken by node identifier.
pub fn sort_valid_by_loading(map: &LoadingMap) -> Vec<(NodeId, u8)> {
    let mut sorted: Vec<(NodeId, u8)> = map
        .iter()
        .filter(|(_, v)| v.valid)
        .map(|(id, v)| (id.clone(), v.loading))
        .collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
