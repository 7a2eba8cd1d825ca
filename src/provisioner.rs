//! Topological provisioner: dependency-ordered, concurrent, cancellable.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::builder::TopologyGraph;
use crate::error::{ProviderError, TopologyError};
use crate::provider::{Outputs, Provider};
use crate::publisher::AttributeStore;
use crate::resolver::{Resolution, resolve};
use crate::types::{BlockedDependent, GenerationReport, NodeFailure, NodeId, NodeState};

/// Options for one provisioning generation.
pub struct ProvisionOptions {
  /// Parallel worker limit for independent branches.
  pub concurrency: usize,
  /// Once this flag flips to `true`, no new nodes are dispatched; in-flight
  /// calls finish or fail, and the generation is marked aborted.
  pub cancel: Option<watch::Receiver<bool>>,
}

impl Default for ProvisionOptions {
  fn default() -> Self {
    Self {
      concurrency: 4,
      cancel: None,
    }
  }
}

type InFlight<'a> =
  Pin<Box<dyn Future<Output = (NodeId, Outputs, Result<Outputs, ProviderError>)> + Send + 'a>>;

/// Provisions a sealed graph against the collaborator.
///
/// Kahn-style traversal: a node is handed to a worker only after every node
/// it references has published its outputs; ties among eligible nodes break
/// by declaration order. A cyclic graph fails up front with
/// [TopologyError::CyclicDependency] and zero provider calls. A node-scoped
/// provider failure leaves independent branches running and marks all
/// transitive dependents `Blocked`; each one is reported, never silently
/// skipped.
///
/// Successfully provisioned `Parameter` nodes publish into `store`.
#[instrument(level = "trace", skip_all, fields(generation = %store.generation_id()))]
pub async fn provision(
  graph: &TopologyGraph,
  provider: &dyn Provider,
  store: &mut AttributeStore,
  options: ProvisionOptions,
) -> Result<GenerationReport, TopologyError> {
  // Pre-flight: refuse to issue a single call for a cyclic graph.
  graph.topo_order()?;

  let started_at = Utc::now();
  let concurrency = options.concurrency.max(1);
  let cancelled = || {
    options
      .cancel
      .as_ref()
      .map(|c| *c.borrow())
      .unwrap_or(false)
  };

  let order: Vec<NodeId> = graph
    .nodes_in_declaration_order()
    .map(|n| n.id.clone())
    .collect();
  let mut states: BTreeMap<NodeId, NodeState> = order
    .iter()
    .map(|id| (id.clone(), NodeState::Pending))
    .collect();
  let mut indegree: HashMap<NodeId, usize> = order
    .iter()
    .map(|id| (id.clone(), graph.dependencies_of(id).len()))
    .collect();
  let mut ready: BTreeSet<usize> = order
    .iter()
    .enumerate()
    .filter(|(_, id)| indegree[*id] == 0)
    .map(|(idx, _)| idx)
    .collect();

  let mut outputs: BTreeMap<NodeId, Outputs> = BTreeMap::new();
  let mut failures: Vec<NodeFailure> = vec![];
  let mut in_flight: FuturesUnordered<InFlight<'_>> = FuturesUnordered::new();

  loop {
    while !cancelled() && in_flight.len() < concurrency {
      let Some(idx) = ready.iter().next().copied() else {
        break;
      };
      ready.remove(&idx);
      let node_id = order[idx].clone();
      match resolve(graph, &node_id, &outputs) {
        Ok(Resolution::Ready(props)) => {
          states.insert(node_id.clone(), NodeState::Resolving);
          info!(node_id = %node_id, "provisioning");
          // Safe: membership in `ready` implies the node is declared.
          if let Some(node) = graph.node(&node_id) {
            in_flight.push(Box::pin(async move {
              let result = provider.create(node, &props).await;
              (node_id, props, result)
            }));
          }
        }
        Ok(Resolution::Pending(refs)) => {
          // Unreachable for an acyclic graph; fail the node rather than spin.
          let message = format!("dispatched with {} unresolved references", refs.len());
          fail_node(graph, &mut states, &mut failures, &node_id, &message);
        }
        Err(e) => {
          fail_node(graph, &mut states, &mut failures, &node_id, &e.to_string());
        }
      }
    }

    let Some((node_id, props, result)) = in_flight.next().await else {
      break;
    };
    match result {
      Ok(node_outputs) => {
        let published = match graph.node(&node_id) {
          Some(node) if node.is_publishable() => {
            publish_parameter(store, &node_id, &props, &node_outputs)
          }
          _ => Ok(()),
        };
        match published {
          Ok(()) => {
            info!(node_id = %node_id, "provisioned");
            states.insert(node_id.clone(), NodeState::Provisioned);
            outputs.insert(node_id.clone(), node_outputs);
            for dependent in graph.dependents_of(&node_id) {
              if let Some(remaining) = indegree.get_mut(&dependent) {
                *remaining -= 1;
                if *remaining == 0 {
                  if let Some(dep_idx) = graph.declaration_index(&dependent) {
                    ready.insert(dep_idx);
                  }
                }
              }
            }
          }
          Err(e) => {
            fail_node(graph, &mut states, &mut failures, &node_id, &e.to_string());
          }
        }
      }
      Err(e) => {
        let err = TopologyError::Provisioning {
          node_id: node_id.clone(),
          source: e,
        };
        fail_node(graph, &mut states, &mut failures, &node_id, &err.to_string());
      }
    }
  }

  let blocked: Vec<BlockedDependent> = order
    .iter()
    .filter_map(|id| match states.get(id) {
      Some(NodeState::Blocked { failed_ancestor }) => Some(BlockedDependent {
        node_id: id.clone(),
        failed_ancestor: failed_ancestor.clone(),
      }),
      _ => None,
    })
    .collect();
  for entry in &blocked {
    warn!(
      node_id = %entry.node_id,
      failed_ancestor = %entry.failed_ancestor,
      "dependent blocked by ancestor failure"
    );
  }

  let aborted = cancelled() && states.values().any(|s| !s.is_settled());
  if aborted {
    warn!("generation aborted by cancellation signal");
  }

  Ok(GenerationReport {
    generation_id: store.generation_id(),
    started_at,
    finished_at: Utc::now(),
    states,
    outputs,
    failures,
    blocked,
    aborted,
  })
}

/// Publishes a provisioned Parameter node under its declared hierarchical key.
fn publish_parameter(
  store: &mut AttributeStore,
  node_id: &str,
  props: &Outputs,
  node_outputs: &Outputs,
) -> Result<(), TopologyError> {
  let key = props.get("key").ok_or_else(|| TopologyError::MissingOutput {
    node_id: node_id.to_string(),
    output: "key".to_string(),
  })?;
  let value = node_outputs
    .get("value")
    .ok_or_else(|| TopologyError::MissingOutput {
      node_id: node_id.to_string(),
      output: "value".to_string(),
    })?;
  store.publish(key, value)
}

/// Marks one node failed and every transitive dependent blocked on it.
fn fail_node(
  graph: &TopologyGraph,
  states: &mut BTreeMap<NodeId, NodeState>,
  failures: &mut Vec<NodeFailure>,
  node_id: &str,
  message: &str,
) {
  warn!(node_id = %node_id, message = %message, "provisioning failed");
  states.insert(node_id.to_string(), NodeState::Failed);
  failures.push(NodeFailure {
    node_id: node_id.to_string(),
    message: message.to_string(),
  });

  let mut seen: HashSet<NodeId> = HashSet::new();
  let mut queue: VecDeque<NodeId> = graph.dependents_of(node_id).into_iter().collect();
  while let Some(dependent) = queue.pop_front() {
    if !seen.insert(dependent.clone()) {
      continue;
    }
    let blockable = matches!(
      states.get(&dependent),
      Some(NodeState::Pending) | Some(NodeState::Declared)
    );
    if blockable {
      states.insert(
        dependent.clone(),
        NodeState::Blocked {
          failed_ancestor: node_id.to_string(),
        },
      );
    }
    queue.extend(graph.dependents_of(&dependent));
  }
}
