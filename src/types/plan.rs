//! Dry-run plan: dependency-ordered actions produced before provisioning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::builder::TopologyGraph;
use crate::error::TopologyError;

use super::{NodeId, ResourceNode};

/// What provisioning would do for one node, relative to the previous
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanAction {
  /// Not present in the previous generation.
  Create,
  /// Present, but the declared property spec changed.
  Update,
  /// Present with an identical property spec.
  Skip,
}

/// One planned node, listed after everything it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlanEntry {
  pub node_id: NodeId,
  pub action: PlanAction,
  /// Direct dependencies, in declaration order.
  pub depends_on: Vec<NodeId>,
}

/// Ordered provisioning plan for one generation. Entry order is the exact
/// order the provisioner will use: topological, ties broken by declaration
/// order, so plans are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
  pub entries: Vec<PlanEntry>,
}

impl Plan {
  /// Builds the plan for a finalized graph. Fails with
  /// [TopologyError::CyclicDependency] if the graph cannot be ordered.
  ///
  /// Actions are classified against `previous` (the saved record of the last
  /// generation); with no previous record every entry is a `Create`.
  #[instrument(level = "trace", skip(graph, previous))]
  pub fn build(
    graph: &TopologyGraph,
    previous: Option<&GenerationRecord>,
  ) -> Result<Plan, TopologyError> {
    let order = graph.topo_order()?;
    let entries = order
      .into_iter()
      .map(|node_id| {
        let mut depends_on: Vec<NodeId> = graph.dependencies_of(&node_id).into_iter().collect();
        depends_on.sort_by_key(|id| graph.declaration_index(id));
        let action = match (previous, graph.node(&node_id)) {
          (Some(record), Some(node)) => match record.nodes.get(&node_id) {
            None => PlanAction::Create,
            Some(fingerprint) if *fingerprint == node_fingerprint(node) => PlanAction::Skip,
            Some(_) => PlanAction::Update,
          },
          _ => PlanAction::Create,
        };
        PlanEntry {
          node_id,
          action,
          depends_on,
        }
      })
      .collect();
    Ok(Plan { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Canonical fingerprint of a node's declared property spec. Deferred
/// references fingerprint by target, not by resolved value, so a plan can be
/// classified before anything is provisioned.
pub(crate) fn node_fingerprint(node: &ResourceNode) -> String {
  // String-keyed BTreeMap serialization is deterministic and cannot fail.
  serde_json::to_string(&node.properties).unwrap_or_default()
}

/// What one generation declared, keyed by node id: enough to classify the
/// next generation's plan into create/update/skip. A new generation replaces
/// the whole graph; this record is the only thing carried across.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenerationRecord {
  pub generation_id: String,
  pub nodes: BTreeMap<NodeId, String>,
}

impl GenerationRecord {
  pub fn of_graph(generation_id: impl Into<String>, graph: &TopologyGraph) -> Self {
    let nodes = graph
      .nodes_in_declaration_order()
      .map(|n| (n.id.clone(), node_fingerprint(n)))
      .collect();
    Self {
      generation_id: generation_id.into(),
      nodes,
    }
  }
}
