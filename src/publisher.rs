//! Published attributes: write-once, namespaced key space per generation.

use std::collections::BTreeMap;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::TopologyError;

/// Shared key space for resolved output attributes, readable by operators and
/// downstream automation without re-running the graph.
///
/// Keys are hierarchical slash-separated paths (`hrs/database/endpoint`).
/// Within one generation a key is write-once: re-publishing the same value is
/// a no-op, a differing value fails with [TopologyError::AttributeConflict]
/// so drift never lands silently.
#[derive(Debug, Clone)]
pub struct AttributeStore {
  generation_id: Uuid,
  values: BTreeMap<String, String>,
}

impl AttributeStore {
  pub fn new(generation_id: Uuid) -> Self {
    Self {
      generation_id,
      values: BTreeMap::new(),
    }
  }

  pub fn generation_id(&self) -> Uuid {
    self.generation_id
  }

  /// Idempotent-per-generation publish.
  #[instrument(level = "trace", skip(self))]
  pub fn publish(&mut self, key: &str, value: &str) -> Result<(), TopologyError> {
    match self.values.get(key) {
      Some(existing) if existing == value => Ok(()),
      Some(existing) => Err(TopologyError::AttributeConflict {
        key: key.to_string(),
        existing: existing.clone(),
        incoming: value.to_string(),
      }),
      None => {
        info!(key = %key, "attribute published");
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
      }
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  /// Collaborator lookups under one namespace, without exposing the graph.
  pub fn list(&self, prefix: &str) -> Vec<(&str, &str)> {
    self
      .values
      .iter()
      .filter(|(k, _)| k.starts_with(prefix))
      .map(|(k, v)| (k.as_str(), v.as_str()))
      .collect()
  }

  pub fn values(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}
