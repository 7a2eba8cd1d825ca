//! Final result of running one provisioning generation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{NodeId, NodeState};

/// One node-scoped provisioning failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeFailure {
  pub node_id: NodeId,
  pub message: String,
}

/// Informational, not fatal: a node that cannot proceed because an ancestor
/// failed. Reported individually so an operator can retry just the failed
/// subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BlockedDependent {
  pub node_id: NodeId,
  pub failed_ancestor: NodeId,
}

/// Everything one generation produced: final state per node, resolved output
/// attributes, failures, blocked dependents, and whether the run was aborted
/// by a cancellation signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenerationReport {
  pub generation_id: Uuid,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub states: BTreeMap<NodeId, NodeState>,
  /// Resolved output attributes per provisioned node, write-once.
  pub outputs: BTreeMap<NodeId, BTreeMap<String, String>>,
  pub failures: Vec<NodeFailure>,
  pub blocked: Vec<BlockedDependent>,
  /// True if cancellation stopped the generation before every node settled.
  pub aborted: bool,
}

impl GenerationReport {
  /// True when every declared node reached `Provisioned`.
  pub fn fully_provisioned(&self) -> bool {
    !self.aborted
      && self.failures.is_empty()
      && self
        .states
        .values()
        .all(|s| *s == NodeState::Provisioned)
  }

  pub fn provisioned_count(&self) -> usize {
    self
      .states
      .values()
      .filter(|s| **s == NodeState::Provisioned)
      .count()
  }

  /// Ids still `Pending` or `Resolving`, e.g. after an aborted run.
  pub fn unsettled_nodes(&self) -> Vec<&NodeId> {
    self
      .states
      .iter()
      .filter(|(_, s)| !s.is_settled())
      .map(|(id, _)| id)
      .collect()
  }
}
