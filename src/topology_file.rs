//! Topology declaration files: the structured per-node description boundary.
//!
//! A topology file lists segments, access rules, and nodes. Property values
//! are a literal string, a `{"node": .., "output": ..}` reference, or a
//! template array mixing text and references:
//!
//! ```json
//! {
//!   "segments": [{ "name": "private", "cidr": "10.0.1.0/24", "isolation": "egress-only" }],
//!   "rules": [{ "from-scope": "app-sg", "to-scope": "db-sg", "port": 5432, "protocol": "tcp" }],
//!   "nodes": [
//!     { "id": "db", "kind": "database", "scope": "db-sg",
//!       "properties": { "engine": "postgres-15.4" } },
//!     { "id": "svc", "kind": "compute-service", "segment": "private", "scope": "app-sg",
//!       "needs": [{ "to-scope": "db-sg", "port": 5432, "protocol": "tcp" }],
//!       "properties": { "db-host": { "node": "db", "output": "endpoint" } } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::builder::{TopologyBuilder, TopologyGraph};
use crate::error::TopologyError;
use crate::types::{AccessRule, ResourceNode, Segment};

/// Deserialized topology declaration, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyFile {
  #[serde(default)]
  pub segments: Vec<Segment>,
  #[serde(default)]
  pub rules: Vec<AccessRule>,
  pub nodes: Vec<ResourceNode>,
}

/// Failure to load a topology file.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("reading topology file: {0}")]
  Io(#[from] std::io::Error),
  #[error("parsing topology file: {0}")]
  Parse(#[from] serde_json::Error),
  #[error(transparent)]
  Topology(#[from] TopologyError),
}

/// Parses a topology declaration and runs it through the builder, so file
/// input gets the same duplicate/forward-reference/cycle/access validation as
/// programmatic declaration.
#[instrument(level = "trace", skip(source))]
pub fn parse_topology(source: &str) -> Result<TopologyGraph, LoadError> {
  let file: TopologyFile = serde_json::from_str(source)?;
  let mut builder = TopologyBuilder::new();
  for segment in file.segments {
    builder.segment(segment)?;
  }
  for rule in file.rules {
    builder.allow(rule)?;
  }
  for node in file.nodes {
    builder.declare(node)?;
  }
  Ok(builder.finalize()?)
}

/// Loads and parses a topology declaration from `path`.
#[instrument(level = "trace", skip(path))]
pub fn load_topology(path: &Path) -> Result<TopologyGraph, LoadError> {
  let source = std::fs::read_to_string(path)?;
  parse_topology(&source)
}
