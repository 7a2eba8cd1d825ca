//! Tests for `Plan` and `GenerationRecord`.

use super::{GenerationRecord, Plan, PlanAction};
use crate::builder::TopologyBuilder;
use crate::types::{NodeKind, ResourceNode};

fn chain_graph() -> crate::builder::TopologyGraph {
  // a depends on b, b depends on c; declared a, b, c.
  let mut b = TopologyBuilder::new();
  b.declare(ResourceNode::new("a", NodeKind::ComputeService).with_ref("up", "b", "service-url"))
    .unwrap();
  b.declare(ResourceNode::new("b", NodeKind::ComputeService).with_ref("up", "c", "service-url"))
    .unwrap();
  b.declare(ResourceNode::new("c", NodeKind::ComputeService)).unwrap();
  b.finalize().unwrap()
}

#[test]
fn plan_orders_dependencies_first() {
  let graph = chain_graph();
  let plan = Plan::build(&graph, None).unwrap();
  let ids: Vec<&str> = plan.entries.iter().map(|e| e.node_id.as_str()).collect();
  assert_eq!(ids, vec!["c", "b", "a"]);
}

#[test]
fn plan_lists_direct_dependencies() {
  let graph = chain_graph();
  let plan = Plan::build(&graph, None).unwrap();
  let a = plan.entries.iter().find(|e| e.node_id == "a").unwrap();
  assert_eq!(a.depends_on, vec!["b".to_string()]);
  let c = plan.entries.iter().find(|e| e.node_id == "c").unwrap();
  assert!(c.depends_on.is_empty());
}

#[test]
fn plan_without_previous_creates_everything() {
  let graph = chain_graph();
  let plan = Plan::build(&graph, None).unwrap();
  assert!(plan.entries.iter().all(|e| e.action == PlanAction::Create));
}

#[test]
fn plan_against_identical_record_skips_everything() {
  let graph = chain_graph();
  let record = GenerationRecord::of_graph("gen-1", &graph);
  let plan = Plan::build(&graph, Some(&record)).unwrap();
  assert!(plan.entries.iter().all(|e| e.action == PlanAction::Skip));
}

#[test]
fn plan_classifies_new_and_changed_nodes() {
  let graph = chain_graph();
  let record = GenerationRecord::of_graph("gen-1", &graph);

  let mut b = TopologyBuilder::new();
  b.declare(ResourceNode::new("a", NodeKind::ComputeService).with_ref("up", "b", "service-url"))
    .unwrap();
  // b changed: extra property.
  b.declare(
    ResourceNode::new("b", NodeKind::ComputeService)
      .with_ref("up", "c", "service-url")
      .with_property("cpu", "0.5 vCPU"),
  )
  .unwrap();
  b.declare(ResourceNode::new("c", NodeKind::ComputeService)).unwrap();
  b.declare(ResourceNode::new("d", NodeKind::LogSink)).unwrap();
  let next = b.finalize().unwrap();

  let plan = Plan::build(&next, Some(&record)).unwrap();
  let action = |id: &str| plan.entries.iter().find(|e| e.node_id == id).unwrap().action;
  assert_eq!(action("a"), PlanAction::Skip);
  assert_eq!(action("b"), PlanAction::Update);
  assert_eq!(action("c"), PlanAction::Skip);
  assert_eq!(action("d"), PlanAction::Create);
}

#[test]
fn record_holds_one_fingerprint_per_node() {
  let graph = chain_graph();
  let record = GenerationRecord::of_graph("gen-1", &graph);
  assert_eq!(record.generation_id, "gen-1");
  assert_eq!(record.nodes.len(), 3);
}
