//! Network segments and the default-deny access-rule model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reachability default for a network segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
  /// Routable from and to the internet.
  Public,
  /// Outbound internet route only.
  EgressOnly,
  /// No default route to the internet.
  Isolated,
}

impl IsolationLevel {
  /// Whether nodes placed in a segment at this level may open outbound
  /// connections to the internet.
  pub fn allows_egress(self) -> bool {
    matches!(self, IsolationLevel::Public | IsolationLevel::EgressOnly)
  }
}

/// A layered address-space partition. Every subnet belongs to exactly one
/// segment; isolated segments have no default route to the internet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
  pub name: String,
  pub cidr: String,
  pub isolation: IsolationLevel,
}

impl Segment {
  pub fn new(name: impl Into<String>, cidr: impl Into<String>, isolation: IsolationLevel) -> Self {
    Self {
      name: name.into(),
      cidr: cidr.into(),
      isolation,
    }
  }
}

/// Transport protocol for an access rule or capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
  Tcp,
  Udp,
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Protocol::Tcp => write!(f, "tcp"),
      Protocol::Udp => write!(f, "udp"),
    }
  }
}

/// An additive allow-list entry: `from_scope` may reach `to_scope` on
/// `port`/`protocol`. There is no explicit-deny form; absence of a rule (or
/// chain of rules) is a deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccessRule {
  pub from_scope: String,
  pub to_scope: String,
  pub port: u16,
  pub protocol: Protocol,
}

impl AccessRule {
  pub fn tcp(from_scope: impl Into<String>, to_scope: impl Into<String>, port: u16) -> Self {
    Self {
      from_scope: from_scope.into(),
      to_scope: to_scope.into(),
      port,
      protocol: Protocol::Tcp,
    }
  }
}
