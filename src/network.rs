//! Network segmentation checks: segment placement and the access-rule model.

use std::collections::{HashSet, VecDeque};

use tracing::instrument;

use crate::builder::TopologyGraph;
use crate::error::TopologyError;
use crate::types::{Capability, NodeKind, Protocol, ResourceNode};

/// Pseudo-scope for the default route. A capability targeting it is granted
/// by segment isolation, not by access rules: only `public` and `egress-only`
/// segments have a route out.
pub const INTERNET_SCOPE: &str = "internet";

/// Validates the segmentation model over a sealed graph:
///
/// - every subnet names exactly one declared segment,
/// - every segment placement names a declared segment,
/// - every declared capability has a granting rule chain (default-deny),
/// - internet egress is only available outside isolated segments.
///
/// Runs at finalize time; violations are fatal to the whole generation.
#[instrument(level = "trace", skip(graph))]
pub(crate) fn validate(graph: &TopologyGraph) -> Result<(), TopologyError> {
  for node in graph.nodes_in_declaration_order() {
    match &node.segment {
      Some(segment) => {
        if graph.segment(segment).is_none() {
          return Err(TopologyError::UnknownSegment {
            node_id: node.id.clone(),
            segment: segment.clone(),
          });
        }
      }
      None => {
        if node.kind == NodeKind::Subnet {
          return Err(TopologyError::SubnetWithoutSegment {
            node_id: node.id.clone(),
          });
        }
      }
    }

    for capability in &node.needs {
      check_capability(graph, node, capability)?;
    }
  }
  Ok(())
}

fn check_capability(
  graph: &TopologyGraph,
  node: &ResourceNode,
  capability: &Capability,
) -> Result<(), TopologyError> {
  if capability.to_scope == INTERNET_SCOPE {
    let allowed = node
      .segment
      .as_deref()
      .and_then(|s| graph.segment(s))
      .map(|s| s.isolation.allows_egress())
      .unwrap_or(false);
    if allowed {
      return Ok(());
    }
    return Err(TopologyError::AccessNotGranted {
      node_id: node.id.clone(),
      from_scope: node.scope.clone().unwrap_or_default(),
      to_scope: INTERNET_SCOPE.to_string(),
      port: capability.port,
      protocol: capability.protocol,
    });
  }

  // Default-deny: a node with no scope has no identity the rules can match.
  let from_scope = node.scope.as_deref().unwrap_or("");
  if from_scope.is_empty()
    || !grants(graph, from_scope, &capability.to_scope, capability.port, capability.protocol)
  {
    return Err(TopologyError::AccessNotGranted {
      node_id: node.id.clone(),
      from_scope: from_scope.to_string(),
      to_scope: capability.to_scope.clone(),
      port: capability.port,
      protocol: capability.protocol,
    });
  }
  Ok(())
}

/// True if a rule, or a chain of rules over intermediate scopes on the same
/// port and protocol, connects `from_scope` to `to_scope`.
pub(crate) fn grants(
  graph: &TopologyGraph,
  from_scope: &str,
  to_scope: &str,
  port: u16,
  protocol: Protocol,
) -> bool {
  let mut seen: HashSet<&str> = HashSet::new();
  let mut queue: VecDeque<&str> = VecDeque::new();
  seen.insert(from_scope);
  queue.push_back(from_scope);
  while let Some(scope) = queue.pop_front() {
    if scope == to_scope {
      return true;
    }
    for rule in graph.rules() {
      if rule.from_scope == scope
        && rule.port == port
        && rule.protocol == protocol
        && seen.insert(&rule.to_scope)
      {
        queue.push_back(&rule.to_scope);
      }
    }
  }
  false
}
