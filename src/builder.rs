//! Dependency graph builder: accumulate nodes and edges, then seal the graph.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{info, instrument};

use crate::error::TopologyError;
use crate::network;
use crate::types::{
  AccessRule, NodeId, PropertyValue, Reference, ResourceNode, Segment,
};

/// Accumulates a topology during the declaration pass.
///
/// A node may be referenced before it is declared (forward reference) as long
/// as it exists by the time [TopologyBuilder::finalize] runs. `finalize`
/// seals the builder: every later mutator fails with
/// [TopologyError::GraphSealed].
#[derive(Debug, Default)]
pub struct TopologyBuilder {
  nodes: HashMap<NodeId, ResourceNode>,
  order: Vec<NodeId>,
  references: Vec<Reference>,
  segments: HashMap<String, Segment>,
  segment_order: Vec<String>,
  rules: Vec<AccessRule>,
  sealed: bool,
}

impl TopologyBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  fn check_open(&self, operation: &'static str) -> Result<(), TopologyError> {
    if self.sealed {
      return Err(TopologyError::GraphSealed { operation });
    }
    Ok(())
  }

  /// Declares a network segment. Segment names are unique.
  pub fn segment(&mut self, segment: Segment) -> Result<(), TopologyError> {
    self.check_open("segment")?;
    if self.segments.contains_key(&segment.name) {
      return Err(TopologyError::DuplicateId {
        node_id: segment.name,
      });
    }
    self.segment_order.push(segment.name.clone());
    self.segments.insert(segment.name.clone(), segment);
    Ok(())
  }

  /// Adds an access rule. Rules are additive only; there is no deny form.
  pub fn allow(&mut self, rule: AccessRule) -> Result<(), TopologyError> {
    self.check_open("allow")?;
    self.rules.push(rule);
    Ok(())
  }

  /// Registers a node, failing with [TopologyError::DuplicateId] if the id is
  /// already present — regardless of whether the properties match.
  #[instrument(level = "trace", skip(self, node), fields(node_id = %node.id))]
  pub fn declare(&mut self, node: ResourceNode) -> Result<(), TopologyError> {
    self.check_open("declare")?;
    if self.nodes.contains_key(&node.id) {
      return Err(TopologyError::DuplicateId { node_id: node.id });
    }
    self.references.extend(node.references());
    self.order.push(node.id.clone());
    self.nodes.insert(node.id.clone(), node);
    Ok(())
  }

  /// Binds `from_node.property` to `to_node.output`, recording a dependency
  /// edge. `to_node` does not have to be declared yet; it only has to exist
  /// by `finalize()`. `from_node` must already be declared, since the
  /// property is set on it.
  #[instrument(level = "trace", skip(self))]
  pub fn reference(
    &mut self,
    from_node: &str,
    property: &str,
    to_node: &str,
    output: &str,
  ) -> Result<(), TopologyError> {
    self.check_open("reference")?;
    let node = self
      .nodes
      .get_mut(from_node)
      .ok_or_else(|| TopologyError::UnknownNode {
        node_id: from_node.to_string(),
      })?;
    node.properties.insert(
      property.to_string(),
      PropertyValue::reference(to_node, output),
    );
    self.references.push(Reference {
      from_node: from_node.to_string(),
      property: property.to_string(),
      to_node: to_node.to_string(),
      output: output.to_string(),
    });
    Ok(())
  }

  /// Closes the graph for further declarations and validates it: every
  /// reference target must be declared, the dependency graph must be acyclic,
  /// and the network segmentation model must hold. Structural violations are
  /// fatal to the whole generation; nothing is partially applied.
  #[instrument(level = "trace", skip(self))]
  pub fn finalize(&mut self) -> Result<TopologyGraph, TopologyError> {
    self.check_open("finalize")?;
    self.sealed = true;

    for reference in &self.references {
      if !self.nodes.contains_key(&reference.to_node) {
        return Err(TopologyError::UnknownReferenceTarget {
          from_node: reference.from_node.clone(),
          to_node: reference.to_node.clone(),
        });
      }
    }

    let graph = TopologyGraph {
      nodes: self.nodes.clone(),
      order: self.order.clone(),
      references: self.references.clone(),
      segments: self.segments.clone(),
      segment_order: self.segment_order.clone(),
      rules: self.rules.clone(),
    };

    graph.topo_order()?;
    network::validate(&graph)?;

    info!(
      nodes = graph.len(),
      references = graph.references().len(),
      "topology finalized"
    );
    Ok(graph)
  }
}

/// A sealed, validated topology. Read-only for the rest of the generation;
/// resolved outputs live in the provisioner's report, not here.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
  nodes: HashMap<NodeId, ResourceNode>,
  order: Vec<NodeId>,
  references: Vec<Reference>,
  segments: HashMap<String, Segment>,
  segment_order: Vec<String>,
  rules: Vec<AccessRule>,
}

impl TopologyGraph {
  pub fn node(&self, id: &str) -> Option<&ResourceNode> {
    self.nodes.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  pub fn nodes_in_declaration_order(&self) -> impl Iterator<Item = &ResourceNode> {
    self.order.iter().filter_map(|id| self.nodes.get(id))
  }

  pub fn references(&self) -> &[Reference] {
    &self.references
  }

  pub fn segment(&self, name: &str) -> Option<&Segment> {
    self.segments.get(name)
  }

  pub fn segments_in_declaration_order(&self) -> impl Iterator<Item = &Segment> {
    self.segment_order.iter().filter_map(|n| self.segments.get(n))
  }

  pub fn rules(&self) -> &[AccessRule] {
    &self.rules
  }

  /// Position of `id` in the declaration pass; the deterministic tie-break
  /// for provisioning order.
  pub fn declaration_index(&self, id: &str) -> Option<usize> {
    self.order.iter().position(|n| n == id)
  }

  /// Distinct ids this node depends on. A self-reference counts: it can
  /// never resolve, and surfaces as a one-node cycle.
  pub fn dependencies_of(&self, id: &str) -> BTreeSet<NodeId> {
    self
      .references
      .iter()
      .filter(|r| r.from_node == id)
      .map(|r| r.to_node.clone())
      .collect()
  }

  /// Distinct ids that depend on this node.
  pub fn dependents_of(&self, id: &str) -> BTreeSet<NodeId> {
    self
      .references
      .iter()
      .filter(|r| r.to_node == id)
      .map(|r| r.from_node.clone())
      .collect()
  }

  /// Kahn's algorithm over the derived edges: every node appears after all
  /// nodes it references, ties broken by declaration order. Fails with
  /// [TopologyError::CyclicDependency] naming the cycle members.
  #[instrument(level = "trace", skip(self))]
  pub fn topo_order(&self) -> Result<Vec<NodeId>, TopologyError> {
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    for id in &self.order {
      indegree.insert(id, self.dependencies_of(id).len());
    }

    // Eligible set keyed by declaration index so ties are deterministic.
    let mut ready: BTreeSet<usize> = self
      .order
      .iter()
      .enumerate()
      .filter(|(_, id)| indegree[id.as_str()] == 0)
      .map(|(idx, _)| idx)
      .collect();

    let mut sorted = Vec::with_capacity(self.order.len());
    while let Some(idx) = ready.iter().next().copied() {
      ready.remove(&idx);
      let id = &self.order[idx];
      sorted.push(id.clone());
      for dependent in self.dependents_of(id) {
        if let Some(remaining) = indegree.get_mut(dependent.as_str()) {
          *remaining -= 1;
          if *remaining == 0 {
            if let Some(dep_idx) = self.declaration_index(&dependent) {
              ready.insert(dep_idx);
            }
          }
        }
      }
    }

    if sorted.len() != self.order.len() {
      let done: HashSet<&str> = sorted.iter().map(String::as_str).collect();
      let leftover: Vec<&NodeId> = self.order.iter().filter(|id| !done.contains(id.as_str())).collect();
      return Err(TopologyError::CyclicDependency {
        members: self.cycle_members(&leftover),
      });
    }
    Ok(sorted)
  }

  /// Narrows the Kahn leftover (cycle plus everything downstream of it) to
  /// the nodes actually on a cycle, by repeatedly stripping leftovers that no
  /// other leftover depends on.
  fn cycle_members(&self, leftover: &[&NodeId]) -> Vec<NodeId> {
    let mut members: HashSet<&str> = leftover.iter().map(|id| id.as_str()).collect();
    let mut queue: VecDeque<String> = leftover.iter().map(|id| (*id).clone()).collect();
    while let Some(id) = queue.pop_front() {
      if !members.contains(id.as_str()) {
        continue;
      }
      let has_member_dependent = self
        .dependents_of(&id)
        .iter()
        .any(|d| members.contains(d.as_str()));
      if !has_member_dependent {
        members.remove(id.as_str());
        for dep in self.dependencies_of(&id) {
          if members.contains(dep.as_str()) {
            queue.push_back(dep);
          }
        }
      }
    }
    self
      .order
      .iter()
      .filter(|id| members.contains(id.as_str()))
      .cloned()
      .collect()
  }
}
