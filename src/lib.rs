//! # stackplan
//!
//! Declarative infrastructure topology model with forward-reference
//! resolution and dependency-ordered provisioning.
//!
//! ## Architecture
//!
//! Declare nodes into a [TopologyBuilder] → `finalize()` seals and validates
//! the graph (forward references, cycles, network segmentation) → the
//! provisioner orders nodes topologically and drives an abstract [Provider]
//! with parallel workers → resolved outputs flow back into dependents'
//! configuration → Parameter nodes publish into the [AttributeStore].

pub mod builder;
pub mod error;
pub mod network;
pub mod plan_io;
pub mod provider;
pub mod provisioner;
#[cfg(test)]
mod provisioner_test;
pub mod publisher;
pub mod resolver;
pub mod topologies;
pub mod topology_file;
pub mod types;

pub use builder::{TopologyBuilder, TopologyGraph};
pub use error::{ProviderError, TopologyError};
pub use provider::{Outputs, Provider, SimulatedProvider};
pub use provisioner::{ProvisionOptions, provision};
pub use publisher::AttributeStore;
pub use resolver::{Resolution, resolve};
pub use topologies::hotel_booking_topology;
pub use topology_file::{LoadError, TopologyFile, load_topology, parse_topology};
pub use types::{
  AccessRule, BlockedDependent, Capability, GenerationRecord, GenerationReport, IsolationLevel,
  NodeFailure, NodeId, NodeKind, NodeState, Plan, PlanAction, PlanEntry, PropertyValue, Protocol,
  Reference, ResourceNode, Segment, TemplatePart,
};
