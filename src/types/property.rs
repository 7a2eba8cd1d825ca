//! Property values: literals, deferred references, and composite templates.

use serde::{Deserialize, Serialize};

use super::NodeId;

/// One declared property value on a node.
///
/// References and templates are deferred: their concrete value is unknown
/// until the producing node has been provisioned. Deferral is explicit in the
/// type; an unresolved value is never represented by a sentinel string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
  /// Immediate concrete value, usable at declaration time.
  Literal(String),
  /// Deferred binding to another node's output attribute.
  Ref { node: NodeId, output: String },
  /// Composite value built from fixed text and deferred references
  /// (e.g. a URL from a fixed scheme plus a resolved hostname). Composed
  /// only once every referenced output is resolved; never partially.
  Template(Vec<TemplatePart>),
}

impl PropertyValue {
  pub fn literal(value: impl Into<String>) -> Self {
    PropertyValue::Literal(value.into())
  }

  pub fn reference(node: impl Into<String>, output: impl Into<String>) -> Self {
    PropertyValue::Ref {
      node: node.into(),
      output: output.into(),
    }
  }

  /// Ids of all nodes this value defers to (empty for literals).
  pub fn referenced_nodes(&self) -> Vec<&NodeId> {
    match self {
      PropertyValue::Literal(_) => vec![],
      PropertyValue::Ref { node, .. } => vec![node],
      PropertyValue::Template(parts) => parts
        .iter()
        .filter_map(|p| match p {
          TemplatePart::Text(_) => None,
          TemplatePart::Ref { node, .. } => Some(node),
        })
        .collect(),
    }
  }
}

/// One segment of a [PropertyValue::Template].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
  Text(String),
  Ref { node: NodeId, output: String },
}

impl TemplatePart {
  pub fn text(value: impl Into<String>) -> Self {
    TemplatePart::Text(value.into())
  }

  pub fn reference(node: impl Into<String>, output: impl Into<String>) -> Self {
    TemplatePart::Ref {
      node: node.into(),
      output: output.into(),
    }
  }
}

/// A declared dependency of one node's property on another node's output.
///
/// The target only has to be declared by the end of the declaration pass, not
/// provisioned; a reference whose target output is still unresolved keeps the
/// owning node's provisioning deferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reference {
  pub from_node: NodeId,
  pub property: String,
  pub to_node: NodeId,
  pub output: String,
}
