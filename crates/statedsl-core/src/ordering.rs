//! Automatic ordering.
//!
//! With ordered mode on, every node whose first action was registered after
//! another state's action requires that action. The chain follows the order
//! of first registrations, so the execution engine runs states top to bottom.

use statedsl_model::Target;
use tracing::trace;

use crate::node::NodeKey;
use crate::registry::Registry;

/// Compute the injected requisites for a log of first action registrations.
///
/// Each entry after the first requires the entry right before it, unless
/// both belong to the same state id. Keys are expected to appear at most once.
pub fn order_requisites(log: &[NodeKey]) -> Vec<(NodeKey, Target)> {
    log.windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            (prev.state_id != cur.state_id).then(|| (cur.clone(), prev.target()))
        })
        .collect()
}

impl Registry {
    /// Inject the ordering requisites into the registered nodes.
    ///
    /// Nodes moved out of the main output are skipped. Applying twice yields
    /// the same graph.
    pub(crate) fn apply_ordering(&mut self) {
        for (key, target) in order_requisites(&self.action_log) {
            let Some(entry) = self.states.get_mut(&key.state_id) else {
                continue;
            };
            if let Some(node) = entry.nodes.iter_mut().find(|node| *node.key() == key) {
                trace!(node = %key, after = %target, "injecting ordering requisite");
                node.set_ordered_after(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use statedsl_model::{ModuleName, StateId};

    fn key(state: &str, module: &str) -> NodeKey {
        NodeKey::new(
            StateId::new(state).expect("id"),
            ModuleName::new(module).expect("module"),
        )
    }

    #[test]
    fn first_node_gets_nothing() {
        assert!(order_requisites(&[key("A", "cmd")]).is_empty());
        assert!(order_requisites(&[]).is_empty());
    }

    #[test]
    fn same_state_neighbours_are_not_chained() {
        let log = [key("B", "cmd"), key("B", "file"), key("C", "cmd")];
        let injected = order_requisites(&log);
        assert_eq!(injected.len(), 1);
        assert_eq!(injected[0].0, key("C", "cmd"));
        assert_eq!(injected[0].1, key("B", "file").target());
    }

    proptest! {
        #[test]
        fn distinct_ids_form_a_chain(count in 1usize..24) {
            let log: Vec<NodeKey> = (0..count).map(|i| key(&format!("S{i}"), "cmd")).collect();
            let injected = order_requisites(&log);
            prop_assert_eq!(injected.len(), count - 1);
            for (i, (node, target)) in injected.iter().enumerate() {
                prop_assert_eq!(node, &log[i + 1]);
                prop_assert_eq!(target, &log[i].target());
                prop_assert_ne!(&node.target(), target);
            }
        }
    }
}
