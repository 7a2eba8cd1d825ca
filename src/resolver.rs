//! Reference resolver: substitute deferred references with resolved outputs.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::builder::TopologyGraph;
use crate::error::TopologyError;
use crate::types::{NodeId, PropertyValue, Reference, TemplatePart};

/// Result of resolving one node's properties against the outputs resolved so
/// far in this generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// Every reference substituted; the node can be handed to the provider.
  Ready(BTreeMap<String, String>),
  /// Not an error: these references are still waiting on outputs, so the
  /// provisioner defers the node.
  Pending(Vec<Reference>),
}

/// Resolves the concrete property map for `node_id`.
///
/// `outputs` holds, per provisioned node, its published output attributes.
/// A missing node entry means "not provisioned yet" and yields `Pending`; a
/// provisioned node lacking the referenced output name is a hard
/// [TopologyError::MissingOutput]. Composite templates are concatenated only
/// once every part is resolved — partial composition is never exposed.
#[instrument(level = "trace", skip(graph, outputs))]
pub fn resolve(
  graph: &TopologyGraph,
  node_id: &str,
  outputs: &BTreeMap<NodeId, BTreeMap<String, String>>,
) -> Result<Resolution, TopologyError> {
  let node = graph.node(node_id).ok_or_else(|| TopologyError::UnknownNode {
    node_id: node_id.to_string(),
  })?;

  let mut resolved = BTreeMap::new();
  let mut pending = vec![];

  for (property, value) in &node.properties {
    match value {
      PropertyValue::Literal(text) => {
        resolved.insert(property.clone(), text.clone());
      }
      PropertyValue::Ref { node: target, output } => {
        match lookup(outputs, target, output)? {
          Some(text) => {
            resolved.insert(property.clone(), text.clone());
          }
          None => pending.push(Reference {
            from_node: node.id.clone(),
            property: property.clone(),
            to_node: target.clone(),
            output: output.clone(),
          }),
        }
      }
      PropertyValue::Template(parts) => {
        let mut composed = String::new();
        let mut complete = true;
        for part in parts {
          match part {
            TemplatePart::Text(text) => composed.push_str(text),
            TemplatePart::Ref { node: target, output } => {
              match lookup(outputs, target, output)? {
                Some(text) => composed.push_str(text),
                None => {
                  complete = false;
                  pending.push(Reference {
                    from_node: node.id.clone(),
                    property: property.clone(),
                    to_node: target.clone(),
                    output: output.clone(),
                  });
                }
              }
            }
          }
        }
        if complete {
          resolved.insert(property.clone(), composed);
        }
      }
    }
  }

  if pending.is_empty() {
    Ok(Resolution::Ready(resolved))
  } else {
    Ok(Resolution::Pending(pending))
  }
}

/// `Ok(None)` = producer not provisioned yet; `Err` = provisioned but the
/// output name does not exist (it will never appear, so deferring is wrong).
fn lookup<'a>(
  outputs: &'a BTreeMap<NodeId, BTreeMap<String, String>>,
  node: &str,
  output: &str,
) -> Result<Option<&'a String>, TopologyError> {
  match outputs.get(node) {
    None => Ok(None),
    Some(map) => map
      .get(output)
      .map(Some)
      .ok_or_else(|| TopologyError::MissingOutput {
        node_id: node.to_string(),
        output: output.to_string(),
      }),
  }
}
