//! Topology data model: nodes, deferred properties, segments, plans, reports.
//!
//! Everything here is declared during a single build pass and immutable for
//! the rest of the generation; only the provisioner's outputs map changes
//! while a generation runs.

mod node;
#[cfg(test)]
mod node_test;
mod node_state;
mod plan;
#[cfg(test)]
mod plan_test;
mod property;
mod report;
mod segment;

pub use node::{Capability, NodeId, NodeKind, ResourceNode};
pub use node_state::NodeState;
pub use plan::{GenerationRecord, Plan, PlanAction, PlanEntry};
pub use property::{PropertyValue, Reference, TemplatePart};
pub use report::{BlockedDependent, GenerationReport, NodeFailure};
pub use segment::{AccessRule, IsolationLevel, Protocol, Segment};
