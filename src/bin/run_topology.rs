//! CLI: Plan and (optionally) provision a topology declaration.
//!
//! Plans are printed and written to the run directory before anything runs;
//! `--apply` provisions against the simulated provider and dumps published
//! attributes. Ctrl-C cancels: no new nodes start, in-flight ones finish.
//!
//! Usage: `run_topology [OPTIONS] <topology>`
//! Example: run_topology hotel-booking --apply
//!
//! Set RUST_LOG=stackplan=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use stackplan::types::GenerationRecord;
use stackplan::{
  AttributeStore, Plan, PlanAction, ProvisionOptions, SimulatedProvider, TopologyGraph, plan_io,
  provision,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};
use uuid::Uuid;

const RUN_DIR: &str = ".stackplan";

/// Name of the built-in topology.
const BUILTIN_HOTEL: &str = "hotel-booking";

/// Plan and provision a declarative infrastructure topology.
#[derive(Parser, Debug)]
#[command(name = "run_topology")]
#[command(
  after_help = r#"The <topology> argument is either a path to a JSON topology file or the
literal `hotel-booking` for the built-in reference topology.

Examples:
  run_topology hotel-booking
  run_topology --apply --run-dir /tmp/run topologies/staging.json"#
)]
struct Args {
  /// Provision after planning (default: plan only).
  #[arg(long)]
  apply: bool,

  /// Directory for plan.json, attributes.json, and generation.json.
  #[arg(long, value_name = "DIR", default_value = RUN_DIR)]
  run_dir: PathBuf,

  /// Parallel worker limit for independent branches.
  #[arg(long, value_name = "N", default_value_t = 4)]
  concurrency: usize,

  /// Path to a topology JSON file, or `hotel-booking`.
  #[arg(value_name = "topology")]
  topology: String,
}

fn load(args: &Args) -> Result<TopologyGraph, String> {
  if args.topology == BUILTIN_HOTEL {
    stackplan::hotel_booking_topology().map_err(|e| e.to_string())
  } else {
    stackplan::load_topology(Path::new(&args.topology)).map_err(|e| e.to_string())
  }
}

fn print_plan(plan: &Plan) {
  for entry in &plan.entries {
    let action = match entry.action {
      PlanAction::Create => "create",
      PlanAction::Update => "update",
      PlanAction::Skip => "skip  ",
    };
    if entry.depends_on.is_empty() {
      println!("  {action}  {}", entry.node_id);
    } else {
      println!("  {action}  {}  (after: {})", entry.node_id, entry.depends_on.join(", "));
    }
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  let args = Args::parse();
  info!(topology = %args.topology, "run_topology starting");

  let graph = match load(&args) {
    Ok(graph) => graph,
    Err(e) => {
      eprintln!("topology rejected: {e}");
      process::exit(2);
    }
  };

  let previous = plan_io::load_generation(&args.run_dir.join(plan_io::GENERATION_FILENAME)).ok();
  let plan = match Plan::build(&graph, previous.as_ref()) {
    Ok(plan) => plan,
    Err(e) => {
      eprintln!("planning failed: {e}");
      process::exit(2);
    }
  };

  println!("Plan ({} nodes):", plan.len());
  print_plan(&plan);
  if let Err(e) = plan_io::save_plan(&args.run_dir.join(plan_io::PLAN_FILENAME), &plan) {
    eprintln!("writing plan: {e}");
    process::exit(1);
  }

  if !args.apply {
    println!("Plan only; re-run with --apply to provision.");
    return;
  }

  let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("cancellation requested; letting in-flight nodes finish");
      let _ = cancel_tx.send(true);
    }
  });

  let generation_id = Uuid::new_v4();
  let provider = SimulatedProvider::new();
  let mut store = AttributeStore::new(generation_id);
  let options = ProvisionOptions {
    concurrency: args.concurrency,
    cancel: Some(cancel_rx),
  };

  let report = match provision(&graph, &provider, &mut store, options).await {
    Ok(report) => report,
    Err(e) => {
      eprintln!("provisioning rejected: {e}");
      process::exit(2);
    }
  };

  let attributes_path = args.run_dir.join(plan_io::ATTRIBUTES_FILENAME);
  if let Err(e) = plan_io::save_attributes(&attributes_path, store.values()) {
    eprintln!("writing attributes: {e}");
    process::exit(1);
  }
  let record = GenerationRecord::of_graph(generation_id.to_string(), &graph);
  if let Err(e) = plan_io::save_generation(&args.run_dir.join(plan_io::GENERATION_FILENAME), &record)
  {
    eprintln!("writing generation record: {e}");
    process::exit(1);
  }

  println!(
    "Generation {generation_id}: {}/{} nodes provisioned, {} published attributes",
    report.provisioned_count(),
    graph.len(),
    store.len()
  );
  for failure in &report.failures {
    eprintln!("  failed: {} ({})", failure.node_id, failure.message);
  }
  for blocked in &report.blocked {
    eprintln!("  blocked: {} (ancestor {})", blocked.node_id, blocked.failed_ancestor);
  }
  if report.aborted {
    eprintln!("Generation aborted; unsettled nodes: {:?}", report.unsettled_nodes());
    process::exit(1);
  }
  if !report.failures.is_empty() {
    process::exit(1);
  }
}
