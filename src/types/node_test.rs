//! Tests for `ResourceNode`.

use super::{NodeKind, ResourceNode, TemplatePart};
use crate::types::Protocol;

#[test]
fn builder_methods_set_fields() {
  let node = ResourceNode::new("database", NodeKind::Database)
    .in_segment("database")
    .in_scope("database-sg")
    .needs("cache-sg", 6379, Protocol::Tcp)
    .with_property("engine", "postgres-15.4");
  assert_eq!(node.segment.as_deref(), Some("database"));
  assert_eq!(node.scope.as_deref(), Some("database-sg"));
  assert_eq!(node.needs.len(), 1);
  assert_eq!(node.needs[0].to_scope, "cache-sg");
  assert_eq!(node.properties.len(), 1);
}

#[test]
fn references_from_ref_property() {
  let node =
    ResourceNode::new("svc", NodeKind::ComputeService).with_ref("db-host", "db", "endpoint");
  let refs = node.references();
  assert_eq!(refs.len(), 1);
  assert_eq!(refs[0].from_node, "svc");
  assert_eq!(refs[0].property, "db-host");
  assert_eq!(refs[0].to_node, "db");
  assert_eq!(refs[0].output, "endpoint");
}

#[test]
fn references_from_template_parts() {
  let node = ResourceNode::new("gateway", NodeKind::ComputeService).with_template(
    "env.USER_SERVICE_URL",
    vec![
      TemplatePart::text("https://"),
      TemplatePart::reference("user-service", "service-url"),
    ],
  );
  let refs = node.references();
  assert_eq!(refs.len(), 1);
  assert_eq!(refs[0].to_node, "user-service");
}

#[test]
fn literal_only_node_has_no_references() {
  let node = ResourceNode::new("logs", NodeKind::LogSink).with_property("retention-days", "7");
  assert!(node.references().is_empty());
}

#[test]
fn only_parameters_publish() {
  assert!(ResourceNode::new("p", NodeKind::Parameter).is_publishable());
  assert!(!ResourceNode::new("db", NodeKind::Database).is_publishable());
}
