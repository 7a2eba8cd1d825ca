//! Tests for the topological provisioner.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::watch;
use uuid::Uuid;

use crate::builder::{TopologyBuilder, TopologyGraph};
use crate::error::ProviderError;
use crate::provider::{Outputs, Provider, SimulatedProvider};
use crate::provisioner::{ProvisionOptions, provision};
use crate::publisher::AttributeStore;
use crate::types::{NodeKind, NodeState, ResourceNode};

/// Provider that records completion order and optionally fails chosen nodes.
#[derive(Default)]
struct RecordingProvider {
  completed: Mutex<Vec<String>>,
  fail: Vec<String>,
}

impl RecordingProvider {
  fn failing(ids: &[&str]) -> Self {
    Self {
      completed: Mutex::new(vec![]),
      fail: ids.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn order(&self) -> Vec<String> {
    self.completed.lock().unwrap().clone()
  }
}

#[async_trait]
impl Provider for RecordingProvider {
  async fn create(
    &self,
    node: &ResourceNode,
    _properties: &Outputs,
  ) -> Result<Outputs, ProviderError> {
    if self.fail.contains(&node.id) {
      return Err(ProviderError::new("simulated outage"));
    }
    self.completed.lock().unwrap().push(node.id.clone());
    let mut outputs = Outputs::new();
    outputs.insert("service-url".to_string(), format!("{}.svc.sim.run", node.id));
    Ok(outputs)
  }
}

fn service(id: &str) -> ResourceNode {
  ResourceNode::new(id, NodeKind::ComputeService)
}

/// a -> b -> c (a references b, b references c).
fn chain_graph() -> TopologyGraph {
  let mut b = TopologyBuilder::new();
  b.declare(service("a").with_ref("up", "b", "service-url")).unwrap();
  b.declare(service("b").with_ref("up", "c", "service-url")).unwrap();
  b.declare(service("c")).unwrap();
  b.finalize().unwrap()
}

fn run_opts(concurrency: usize) -> ProvisionOptions {
  ProvisionOptions {
    concurrency,
    cancel: None,
  }
}

#[tokio::test]
async fn chain_provisions_in_dependency_order() {
  let graph = chain_graph();
  let provider = RecordingProvider::default();
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(&graph, &provider, &mut store, run_opts(1)).await.unwrap();

  assert!(report.fully_provisioned());
  assert_eq!(provider.order(), vec!["c", "b", "a"]);
  // Resolved output flowed into the dependent's configuration.
  assert_eq!(report.outputs["a"]["service-url"], "a.svc.sim.run");
}

#[tokio::test]
async fn ties_break_by_declaration_order() {
  let mut b = TopologyBuilder::new();
  b.declare(service("zeta")).unwrap();
  b.declare(service("alpha")).unwrap();
  b.declare(service("mid")).unwrap();
  let graph = b.finalize().unwrap();

  let provider = RecordingProvider::default();
  let mut store = AttributeStore::new(Uuid::new_v4());
  provision(&graph, &provider, &mut store, run_opts(1)).await.unwrap();
  assert_eq!(provider.order(), vec!["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn failure_blocks_transitive_dependents_and_reports_them() {
  let graph = chain_graph();
  let provider = RecordingProvider::failing(&["c"]);
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(&graph, &provider, &mut store, run_opts(2)).await.unwrap();

  assert_eq!(report.states["c"], NodeState::Failed);
  assert_eq!(
    report.states["b"],
    NodeState::Blocked { failed_ancestor: "c".to_string() }
  );
  assert_eq!(
    report.states["a"],
    NodeState::Blocked { failed_ancestor: "c".to_string() }
  );
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].node_id, "c");
  let blocked: Vec<&str> = report.blocked.iter().map(|b| b.node_id.as_str()).collect();
  assert_eq!(blocked, vec!["a", "b"]);
  assert!(!report.aborted);
}

#[tokio::test]
async fn independent_branch_survives_failure() {
  let mut b = TopologyBuilder::new();
  b.declare(service("doomed")).unwrap();
  b.declare(service("dependent").with_ref("up", "doomed", "service-url")).unwrap();
  b.declare(service("bystander")).unwrap();
  let graph = b.finalize().unwrap();

  let provider = RecordingProvider::failing(&["doomed"]);
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(&graph, &provider, &mut store, run_opts(2)).await.unwrap();

  assert_eq!(report.states["bystander"], NodeState::Provisioned);
  assert_eq!(report.states["doomed"], NodeState::Failed);
  assert_eq!(
    report.states["dependent"],
    NodeState::Blocked { failed_ancestor: "doomed".to_string() }
  );
}

#[tokio::test]
async fn parameters_publish_resolved_values() {
  let mut b = TopologyBuilder::new();
  b.declare(
    ResourceNode::new("endpoint-param", NodeKind::Parameter)
      .with_property("key", "hrs/database/endpoint")
      .with_ref("value", "database", "endpoint"),
  )
  .unwrap();
  b.declare(ResourceNode::new("database", NodeKind::Database)).unwrap();
  let graph = b.finalize().unwrap();

  let provider = SimulatedProvider::new();
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(&graph, &provider, &mut store, run_opts(2)).await.unwrap();

  assert!(report.fully_provisioned());
  assert_eq!(store.get("hrs/database/endpoint"), Some("database.db.sim.internal"));
}

#[tokio::test]
async fn conflicting_parameter_publish_fails_that_node() {
  let mut b = TopologyBuilder::new();
  b.declare(
    ResourceNode::new("first", NodeKind::Parameter)
      .with_property("key", "shared/key")
      .with_property("value", "one"),
  )
  .unwrap();
  b.declare(
    ResourceNode::new("second", NodeKind::Parameter)
      .with_property("key", "shared/key")
      .with_property("value", "two")
      .with_ref("after", "first", "value"),
  )
  .unwrap();
  let graph = b.finalize().unwrap();

  let provider = SimulatedProvider::new();
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(&graph, &provider, &mut store, run_opts(1)).await.unwrap();

  assert_eq!(report.states["first"], NodeState::Provisioned);
  assert_eq!(report.states["second"], NodeState::Failed);
  assert_eq!(store.get("shared/key"), Some("one"));
  assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn preset_cancellation_dispatches_nothing() {
  let graph = chain_graph();
  let provider = RecordingProvider::default();
  let mut store = AttributeStore::new(Uuid::new_v4());
  let (tx, rx) = watch::channel(true);
  let report = provision(
    &graph,
    &provider,
    &mut store,
    ProvisionOptions {
      concurrency: 2,
      cancel: Some(rx),
    },
  )
  .await
  .unwrap();
  drop(tx);

  assert!(report.aborted);
  assert!(provider.order().is_empty());
  assert!(report.states.values().all(|s| *s == NodeState::Pending));
}

/// Provider that flips the cancellation flag as a side effect of its first
/// create, simulating an operator abort mid-generation.
struct CancelAfterFirst {
  cancel: watch::Sender<bool>,
  inner: RecordingProvider,
}

#[async_trait]
impl Provider for CancelAfterFirst {
  async fn create(
    &self,
    node: &ResourceNode,
    properties: &Outputs,
  ) -> Result<Outputs, ProviderError> {
    let result = self.inner.create(node, properties).await;
    let _ = self.cancel.send(true);
    result
  }
}

#[tokio::test]
async fn cancellation_lets_in_flight_finish_and_stops_dispatch() {
  let graph = chain_graph();
  let (tx, rx) = watch::channel(false);
  let provider = CancelAfterFirst {
    cancel: tx,
    inner: RecordingProvider::default(),
  };
  let mut store = AttributeStore::new(Uuid::new_v4());
  let report = provision(
    &graph,
    &provider,
    &mut store,
    ProvisionOptions {
      concurrency: 1,
      cancel: Some(rx),
    },
  )
  .await
  .unwrap();

  assert!(report.aborted);
  assert_eq!(report.states["c"], NodeState::Provisioned);
  assert_eq!(report.states["b"], NodeState::Pending);
  assert_eq!(report.states["a"], NodeState::Pending);
  let unsettled = report.unsettled_nodes();
  assert_eq!(unsettled.len(), 2);
}

proptest! {
  /// Dependency-order invariant: for any random DAG, every node completes
  /// after everything it references.
  #[test]
  fn random_dags_complete_in_dependency_order(
    edges in proptest::collection::vec((1usize..12, 0usize..12), 0..30),
    concurrency in 1usize..4,
  ) {
    let mut b = TopologyBuilder::new();
    let count = 12;
    let mut nodes: Vec<ResourceNode> = (0..count).map(|i| service(&format!("n{i}"))).collect();
    // Only later-declared -> earlier-declared edges, so the graph is acyclic.
    for (from, to) in &edges {
      let (from, to) = (*from % count, *to % count);
      if to < from {
        nodes[from] = nodes[from].clone().with_ref(
          format!("up-{to}"),
          format!("n{to}"),
          "service-url",
        );
      }
    }
    for node in nodes {
      b.declare(node).unwrap();
    }
    let graph = b.finalize().unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .unwrap();
    let provider = RecordingProvider::default();
    let mut store = AttributeStore::new(Uuid::new_v4());
    let report = runtime
      .block_on(provision(&graph, &provider, &mut store, run_opts(concurrency)))
      .unwrap();
    prop_assert!(report.fully_provisioned());

    let order = provider.order();
    let position = |id: &str| order.iter().position(|n| n == id).unwrap();
    for node in graph.nodes_in_declaration_order() {
      for dep in graph.dependencies_of(&node.id) {
        prop_assert!(position(&dep) < position(&node.id));
      }
    }
  }
}
