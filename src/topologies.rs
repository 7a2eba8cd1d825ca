//! Built-in hotel-reservation topology: network, database, cache, four
//! services, and the plumbing between them.

use tracing::instrument;

use crate::builder::{TopologyBuilder, TopologyGraph};
use crate::error::TopologyError;
use crate::network::INTERNET_SCOPE;
use crate::types::{
  AccessRule, IsolationLevel, NodeKind, Protocol, ResourceNode, Segment, TemplatePart,
};

const POSTGRES_PORT: u16 = 5432;
const REDIS_PORT: u16 = 6379;

/// One App-Runner-style compute service with the shared database/cache
/// environment wiring. Extra per-service env vars are layered on by the
/// caller.
fn compute_service(id: &str, app_name: &str, port: u16) -> ResourceNode {
  ResourceNode::new(id, NodeKind::ComputeService)
    .in_segment("private")
    .in_scope("app-sg")
    .needs("database-sg", POSTGRES_PORT, Protocol::Tcp)
    .needs("cache-sg", REDIS_PORT, Protocol::Tcp)
    .needs(INTERNET_SCOPE, 443, Protocol::Tcp)
    .with_property("image", "public.ecr.aws/docker/library/openjdk:17-jdk-slim")
    .with_property("start-command", format!("java -jar /app/{app_name}.jar"))
    .with_property("port", port.to_string())
    .with_property("cpu", "0.25 vCPU")
    .with_property("memory", "0.5 GB")
    .with_property("health-check-path", "/actuator/health")
    .with_property("health-check-interval", "20")
    .with_property("health-check-timeout", "10")
    .with_property("healthy-threshold", "3")
    .with_property("unhealthy-threshold", "5")
    .with_property("env.SPRING_PROFILES_ACTIVE", "aws")
    .with_property("env.SPRING_APPLICATION_NAME", app_name)
    .with_property("env.SERVER_PORT", port.to_string())
    .with_property("env.DB_NAME", "hrs_db")
    .with_ref("env.DB_HOST", "database", "endpoint")
    .with_ref("env.DB_PORT", "database", "port")
    .with_ref("env.REDIS_HOST", "redis", "endpoint")
    .with_ref("env.REDIS_PORT", "redis", "port")
}

fn service_url(service: &str) -> Vec<TemplatePart> {
  vec![
    TemplatePart::text("https://"),
    TemplatePart::reference(service, "service-url"),
  ]
}

fn parameter(id: &str, key: &str) -> ResourceNode {
  ResourceNode::new(id, NodeKind::Parameter).with_property("key", key)
}

fn log_sink(id: &str, group: &str) -> ResourceNode {
  ResourceNode::new(id, NodeKind::LogSink)
    .with_property("log-group-name", group)
    .with_property("retention-days", "7")
}

/// Declares the full hotel-booking topology and finalizes it.
///
/// Declaration order is deliberately not dependency order: the parameter and
/// gateway nodes are declared before the database, cache, and services they
/// reference, so this topology only provisions correctly because ordering is
/// derived from declared edges.
#[instrument(level = "trace")]
pub fn hotel_booking_topology() -> Result<TopologyGraph, TopologyError> {
  let mut b = TopologyBuilder::new();

  b.segment(Segment::new("public", "10.0.0.0/24", IsolationLevel::Public))?;
  b.segment(Segment::new("private", "10.0.1.0/24", IsolationLevel::EgressOnly))?;
  b.segment(Segment::new("database", "10.0.2.0/28", IsolationLevel::Isolated))?;

  b.allow(AccessRule::tcp("app-sg", "database-sg", POSTGRES_PORT))?;
  b.allow(AccessRule::tcp("app-sg", "cache-sg", REDIS_PORT))?;

  b.declare(
    ResourceNode::new("network", NodeKind::Network)
      .with_property("max-azs", "2")
      .with_property("nat-gateways", "1"),
  )?;
  for (id, segment, cidr) in [
    ("public-subnet", "public", "10.0.0.0/24"),
    ("private-subnet", "private", "10.0.1.0/24"),
    ("database-subnet", "database", "10.0.2.0/28"),
  ] {
    b.declare(
      ResourceNode::new(id, NodeKind::Subnet)
        .in_segment(segment)
        .with_property("cidr", cidr)
        .with_ref("network", "network", "network-id"),
    )?;
  }
  for (id, description) in [
    ("database-sg", "security group for the relational databases"),
    ("cache-sg", "security group for the cache cluster"),
    ("app-sg", "security group for the compute services"),
  ] {
    b.declare(
      ResourceNode::new(id, NodeKind::SecurityGroup)
        .in_scope(id)
        .with_property("description", description)
        .with_ref("network", "network", "network-id"),
    )?;
  }

  b.declare(
    ResourceNode::new("db-credentials", NodeKind::Secret)
      .with_property("secret-name", "hrs-db-credentials")
      .with_property("username", "hrs_admin")
      .with_property("exclude-characters", "\"@/\\"),
  )?;
  // Published parameters, declared ahead of the nodes they reference.
  b.declare(parameter("database-endpoint-param", "hrs/database/endpoint")
    .with_ref("value", "database", "endpoint"))?;
  b.declare(parameter("database-port-param", "hrs/database/port")
    .with_ref("value", "database", "port"))?;
  b.declare(parameter("redis-endpoint-param", "hrs/redis/endpoint")
    .with_ref("value", "redis", "endpoint"))?;
  b.declare(parameter("redis-port-param", "hrs/redis/port")
    .with_ref("value", "redis", "port"))?;

  // The gateway forward-references all three services.
  b.declare(
    compute_service("api-gateway", "api-gateway", 8080)
      .with_property("cpu", "0.5 vCPU")
      .with_property("memory", "1 GB")
      .with_template("env.USER_SERVICE_URL", service_url("user-service"))
      .with_template("env.HOTEL_SERVICE_URL", service_url("hotel-service"))
      .with_template("env.BOOKING_SERVICE_URL", service_url("booking-service")),
  )?;
  b.declare(compute_service("user-service", "user-service", 8083))?;
  b.declare(compute_service("hotel-service", "hotel-service", 8082))?;
  b.declare(
    compute_service("booking-service", "booking-service", 8081)
      .with_template("env.USER_SERVICE_URL", service_url("user-service"))
      .with_template("env.HOTEL_SERVICE_URL", service_url("hotel-service")),
  )?;

  b.declare(
    ResourceNode::new("database", NodeKind::Database)
      .in_segment("database")
      .in_scope("database-sg")
      .with_property("engine", "postgres-15.4")
      .with_property("instance-class", "db.t3.micro")
      .with_property("port", POSTGRES_PORT.to_string())
      .with_property("backup-retention-days", "7")
      .with_property("storage-encrypted", "true")
      .with_property("multi-az", "false")
      .with_property("deletion-protection", "false")
      .with_ref("credentials", "db-credentials", "secret-name")
      .with_ref("subnet", "database-subnet", "subnet-id")
      .with_ref("security-group", "database-sg", "group-id"),
  )?;
  b.declare(
    ResourceNode::new("redis", NodeKind::Cache)
      .in_segment("private")
      .in_scope("cache-sg")
      .with_property("engine", "redis")
      .with_property("cache-node-type", "cache.t3.micro")
      .with_property("num-nodes", "1")
      .with_property("port", REDIS_PORT.to_string())
      .with_ref("subnet", "private-subnet", "subnet-id")
      .with_ref("security-group", "cache-sg", "group-id"),
  )?;

  for service in ["user-service", "hotel-service", "booking-service", "api-gateway"] {
    b.declare(log_sink(
      &format!("{service}-logs"),
      &format!("/logs/hrs-{service}"),
    ))?;
  }

  // Stack outputs, published alongside the parameters.
  for service in ["api-gateway", "user-service", "hotel-service", "booking-service"] {
    b.declare(
      parameter(
        &format!("{service}-url-output"),
        &format!("outputs/{service}/url"),
      )
      .with_template("value", service_url(service)),
    )?;
  }
  b.declare(parameter("database-endpoint-output", "outputs/database/endpoint")
    .with_ref("value", "database", "endpoint"))?;
  b.declare(parameter("redis-endpoint-output", "outputs/redis/endpoint")
    .with_ref("value", "redis", "endpoint"))?;

  b.finalize()
}
