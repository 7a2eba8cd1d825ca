//! Per-node lifecycle states for one provisioning generation.

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Lifecycle of a node within one generation:
/// `Declared → Pending → Resolving → Provisioned | Failed`.
///
/// `Blocked` is the Pending sub-state that will never clear: a transitive
/// dependency failed, so the node is reported rather than silently skipped.
/// `Failed` and `Blocked` are terminal for the generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
  /// Declared into the graph; generation not started.
  Declared,
  /// Waiting on unresolved references.
  Pending,
  /// An ancestor failed; this node can never become eligible.
  Blocked { failed_ancestor: NodeId },
  /// References satisfied, provisioning call issued.
  Resolving,
  /// Outputs published; done.
  Provisioned,
  /// The provisioning collaborator reported an error.
  Failed,
}

impl NodeState {
  /// True once the node can no longer change state in this generation.
  pub fn is_settled(&self) -> bool {
    matches!(
      self,
      NodeState::Provisioned | NodeState::Failed | NodeState::Blocked { .. }
    )
  }
}
