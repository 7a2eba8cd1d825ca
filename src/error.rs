//! Error taxonomy for topology declaration, validation, and provisioning.

use thiserror::Error;

use crate::types::{NodeId, Protocol};

/// Failure reported by the provisioning collaborator for one node.
///
/// The engine never inspects the message; it is carried verbatim into
/// [TopologyError::Provisioning] and the generation report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
  pub message: String,
}

impl ProviderError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Errors raised by the graph builder, validators, publisher, and provisioner.
///
/// Structural errors (duplicate ids, dangling references, cycles, access
/// violations) are fatal to the whole generation and are detected before any
/// provisioning call is issued. [TopologyError::Provisioning] is node-scoped.
#[derive(Debug, Error)]
pub enum TopologyError {
  /// A node id was declared twice, regardless of whether properties match.
  #[error("duplicate node id `{node_id}`")]
  DuplicateId { node_id: NodeId },

  /// A mutator was called after `finalize()` sealed the graph.
  #[error("graph is sealed; `{operation}` is not allowed after finalize")]
  GraphSealed { operation: &'static str },

  /// An operation named a node that is not declared in the graph.
  #[error("unknown node `{node_id}`")]
  UnknownNode { node_id: NodeId },

  /// A reference target was still undeclared when the graph was finalized.
  #[error("node `{from_node}` references `{to_node}`, which was never declared")]
  UnknownReferenceTarget { from_node: NodeId, to_node: NodeId },

  /// The dependency graph contains a cycle; `members` lists every node on it
  /// in declaration order.
  #[error("dependency cycle between nodes: {}", .members.join(" -> "))]
  CyclicDependency { members: Vec<NodeId> },

  /// A subnet node was declared without naming a segment.
  #[error("subnet `{node_id}` must belong to exactly one declared segment")]
  SubnetWithoutSegment { node_id: NodeId },

  /// A node was placed in a segment that was never declared.
  #[error("node `{node_id}` placed in undeclared segment `{segment}`")]
  UnknownSegment { node_id: NodeId, segment: String },

  /// A declared capability has no granting access rule (or chain of rules).
  #[error(
    "no access rule grants `{node_id}` ({from_scope}) reach to `{to_scope}` on {port}/{protocol}"
  )]
  AccessNotGranted {
    node_id: NodeId,
    from_scope: String,
    to_scope: String,
    port: u16,
    protocol: Protocol,
  },

  /// A published attribute key was re-published with a different value in the
  /// same generation.
  #[error("attribute `{key}` already published as `{existing}`, refusing `{incoming}`")]
  AttributeConflict {
    key: String,
    existing: String,
    incoming: String,
  },

  /// A provisioned dependency never produced the referenced output name.
  #[error("node `{node_id}` has no output named `{output}`")]
  MissingOutput { node_id: NodeId, output: String },

  /// The provisioning collaborator failed for one node.
  #[error("provisioning `{node_id}` failed: {source}")]
  Provisioning {
    node_id: NodeId,
    #[source]
    source: ProviderError,
  },
}
