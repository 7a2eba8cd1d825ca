//! A declared unit of infrastructure: typed, named, with deferred properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Protocol, PropertyValue, Reference, TemplatePart};

/// Unique node id within one topology graph.
pub type NodeId = String;

/// The kind of infrastructure a node stands for. Flat tagged variant,
/// dispatched through the provider boundary; no provider-specific subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
  Network,
  Subnet,
  SecurityGroup,
  Database,
  Cache,
  ComputeService,
  Parameter,
  LogSink,
  Secret,
}

/// A cross-segment reachability requirement declared by a node, e.g.
/// "reach scope `database-sg` on 5432/tcp". Validated against the access
/// rules when the graph is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Capability {
  pub to_scope: String,
  pub port: u16,
  pub protocol: Protocol,
}

/// A typed, named unit of infrastructure with declared properties and zero or
/// more output attributes that stay unknown until provisioning.
///
/// Nodes are immutable once declared into a graph; outputs live in the
/// generation report, written once by the provisioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
  pub id: NodeId,
  pub kind: NodeKind,
  /// Segment placement. Required for `Subnet` nodes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub segment: Option<String>,
  /// Security scope membership used by the access-rule model.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scope: Option<String>,
  /// Declared reachability requirements.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub needs: Vec<Capability>,
  /// Property name to literal-or-deferred value.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub properties: BTreeMap<String, PropertyValue>,
}

impl ResourceNode {
  pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
    Self {
      id: id.into(),
      kind,
      segment: None,
      scope: None,
      needs: vec![],
      properties: BTreeMap::new(),
    }
  }

  pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self
      .properties
      .insert(name.into(), PropertyValue::literal(value));
    self
  }

  pub fn with_ref(
    mut self,
    name: impl Into<String>,
    node: impl Into<String>,
    output: impl Into<String>,
  ) -> Self {
    self
      .properties
      .insert(name.into(), PropertyValue::reference(node, output));
    self
  }

  pub fn with_template(mut self, name: impl Into<String>, parts: Vec<TemplatePart>) -> Self {
    self
      .properties
      .insert(name.into(), PropertyValue::Template(parts));
    self
  }

  pub fn in_segment(mut self, segment: impl Into<String>) -> Self {
    self.segment = Some(segment.into());
    self
  }

  pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
    self.scope = Some(scope.into());
    self
  }

  pub fn needs(mut self, to_scope: impl Into<String>, port: u16, protocol: Protocol) -> Self {
    self.needs.push(Capability {
      to_scope: to_scope.into(),
      port,
      protocol,
    });
    self
  }

  /// All references implied by this node's declared properties.
  pub fn references(&self) -> Vec<Reference> {
    let mut refs = vec![];
    for (property, value) in &self.properties {
      match value {
        PropertyValue::Literal(_) => {}
        PropertyValue::Ref { node, output } => refs.push(Reference {
          from_node: self.id.clone(),
          property: property.clone(),
          to_node: node.clone(),
          output: output.clone(),
        }),
        PropertyValue::Template(parts) => {
          for part in parts {
            if let TemplatePart::Ref { node, output } = part {
              refs.push(Reference {
                from_node: self.id.clone(),
                property: property.clone(),
                to_node: node.clone(),
                output: output.clone(),
              });
            }
          }
        }
      }
    }
    refs
  }

  /// Parameter nodes publish their resolved value into the shared attribute
  /// key space after provisioning.
  pub fn is_publishable(&self) -> bool {
    self.kind == NodeKind::Parameter
  }
}
