//! Provisioning collaborator boundary: one abstract create per node kind.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{NodeKind, ResourceNode};

/// Resolved output attributes returned by a successful create.
pub type Outputs = BTreeMap<String, String>;

/// The only seam to a real cloud: the engine hands over a node and its fully
/// resolved properties and gets back output attributes or a failure. The
/// engine holds no provider-specific logic beyond dispatching on
/// [NodeKind].
#[async_trait]
pub trait Provider: Send + Sync {
  async fn create(&self, node: &ResourceNode, properties: &Outputs)
  -> Result<Outputs, ProviderError>;
}

/// Deterministic dry-run double: fabricates plausible endpoints, ports, and
/// URLs per kind without talking to anything. Counts issued calls so tests
/// can assert that structurally rejected graphs provision nothing.
#[derive(Debug, Default)]
pub struct SimulatedProvider {
  calls: AtomicUsize,
}

impl SimulatedProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of create calls issued so far.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Provider for SimulatedProvider {
  async fn create(
    &self,
    node: &ResourceNode,
    properties: &Outputs,
  ) -> Result<Outputs, ProviderError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let mut outputs = Outputs::new();
    match node.kind {
      NodeKind::Network => {
        outputs.insert("network-id".into(), format!("net-{}", node.id));
      }
      NodeKind::Subnet => {
        outputs.insert("subnet-id".into(), format!("subnet-{}", node.id));
      }
      NodeKind::SecurityGroup => {
        outputs.insert("group-id".into(), format!("sg-{}", node.id));
      }
      NodeKind::Database => {
        outputs.insert("endpoint".into(), format!("{}.db.sim.internal", node.id));
        let port = properties.get("port").cloned().unwrap_or_else(|| "5432".into());
        outputs.insert("port".into(), port);
      }
      NodeKind::Cache => {
        outputs.insert("endpoint".into(), format!("{}.cache.sim.internal", node.id));
        let port = properties.get("port").cloned().unwrap_or_else(|| "6379".into());
        outputs.insert("port".into(), port);
      }
      NodeKind::ComputeService => {
        outputs.insert("service-url".into(), format!("{}.svc.sim.run", node.id));
        outputs.insert("service-arn".into(), format!("arn:sim:service/{}", node.id));
      }
      NodeKind::Parameter => {
        let value = properties.get("value").cloned().ok_or_else(|| {
          ProviderError::new(format!("parameter `{}` has no `value` property", node.id))
        })?;
        outputs.insert("value".into(), value);
      }
      NodeKind::LogSink => {
        let name = properties
          .get("log-group-name")
          .cloned()
          .unwrap_or_else(|| format!("/logs/{}", node.id));
        outputs.insert("log-group-name".into(), name);
      }
      NodeKind::Secret => {
        let name = properties
          .get("secret-name")
          .cloned()
          .unwrap_or_else(|| node.id.clone());
        outputs.insert("secret-name".into(), name);
      }
    }
    Ok(outputs)
  }
}
