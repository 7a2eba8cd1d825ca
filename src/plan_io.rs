//! Run-directory JSON artifacts: plan, published attributes, generation record.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::instrument;

use crate::types::{GenerationRecord, Plan};

/// Plan filename under a run directory.
pub const PLAN_FILENAME: &str = "plan.json";
/// Published attribute dump filename under a run directory.
pub const ATTRIBUTES_FILENAME: &str = "attributes.json";
/// Generation record filename under a run directory.
pub const GENERATION_FILENAME: &str = "generation.json";

fn to_io(e: serde_json::Error) -> std::io::Error {
  std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

/// Saves a plan to `path` as pretty JSON.
#[instrument(level = "trace", skip(path, plan))]
pub fn save_plan(path: &Path, plan: &Plan) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(plan).map_err(to_io)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads a plan from `path`. Errors if the file is missing or invalid JSON.
#[instrument(level = "trace", skip(path))]
pub fn load_plan(path: &Path) -> Result<Plan, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes).map_err(to_io)
}

/// Saves the published attribute key space as pretty JSON.
#[instrument(level = "trace", skip(path, attributes))]
pub fn save_attributes(
  path: &Path,
  attributes: &BTreeMap<String, String>,
) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(attributes).map_err(to_io)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Saves a generation record to `path` as pretty JSON.
#[instrument(level = "trace", skip(path, record))]
pub fn save_generation(path: &Path, record: &GenerationRecord) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(record).map_err(to_io)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads the previous generation record, if any.
#[instrument(level = "trace", skip(path))]
pub fn load_generation(path: &Path) -> Result<GenerationRecord, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes).map_err(to_io)
}
