use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use agentflow_config::WorkflowDef;
use agentflow_engine::{Simulator, SimulatorConfig};
use agentflow_graph::WorkflowGraph;
use agentflow_handler::{HandlerRegistry, SimulationConfig};
use agentflow_resolver::{BranchPolicy, DepthFirstResolver, Resolver};
use agentflow_store::{FsSnapshotStore, SnapshotStore};

/// Agentflow - build, check and simulate AI agent workflows
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.agentflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Fixed simulated latency per node, in milliseconds
  #[arg(long, global = true)]
  latency_ms: Option<u64>,

  /// Probability in [0, 1] that a simulated node fails
  #[arg(long, global = true, default_value_t = 0.0)]
  failure_rate: f64,

  /// Seed for simulated latency and failures
  #[arg(long, global = true)]
  seed: Option<u64>,

  /// Fail any node that runs longer than this many milliseconds
  #[arg(long, global = true)]
  node_timeout_ms: Option<u64>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Simulate a workflow. The payload is read from stdin as JSON.
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Print the execution order of a workflow
  Order {
    workflow_file: PathBuf,

    /// Follow only the branch each branching node selects for simulation
    #[arg(long)]
    selected: bool,
  },

  /// Write a portable workflow document
  Export {
    workflow_file: PathBuf,

    /// Output path (default: stdout)
    #[arg(long, short)]
    output: Option<PathBuf>,
  },

  /// Save a workflow snapshot under a key
  Save {
    workflow_file: PathBuf,

    #[arg(long)]
    key: String,
  },

  /// Print a saved workflow snapshot
  Load {
    #[arg(long)]
    key: String,
  },

  /// List saved snapshot keys
  List,

  /// Delete a saved snapshot
  Delete {
    #[arg(long)]
    key: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir.clone() {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".agentflow"),
  };

  let Some(command) = cli.command.as_ref() else {
    println!("agentflow - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let store = FsSnapshotStore::new(data_dir.join("snapshots"));
    match command {
      Commands::Run { workflow_file } => run_workflow(&cli, workflow_file).await,
      Commands::Order {
        workflow_file,
        selected,
      } => print_order(workflow_file, *selected).await,
      Commands::Export {
        workflow_file,
        output,
      } => export_workflow(workflow_file, output.as_deref()).await,
      Commands::Save { workflow_file, key } => save_snapshot(&store, workflow_file, key).await,
      Commands::Load { key } => load_snapshot(&store, key).await,
      Commands::List => {
        for key in store.list().await.context("failed to list snapshots")? {
          println!("{}", key);
        }
        Ok(())
      }
      Commands::Delete { key } => {
        if !store.delete(key).await.context("failed to delete snapshot")? {
          bail!("no snapshot saved under '{}'", key);
        }
        Ok(())
      }
    }
  })
}

fn simulation_config(cli: &Cli) -> SimulationConfig {
  let mut config = SimulationConfig::default().with_failure_rate(cli.failure_rate);
  if let Some(latency) = cli.latency_ms {
    config = config.with_latency_ms(latency);
  }
  if let Some(seed) = cli.seed {
    config = config.with_seed(seed);
  }
  config
}

async fn read_workflow(workflow_file: &Path) -> Result<(WorkflowDef, WorkflowGraph)> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  let graph = WorkflowGraph::from_def(&def)
    .with_context(|| format!("invalid workflow graph: {}", workflow_file.display()))?;

  Ok((def, graph))
}

async fn run_workflow(cli: &Cli, workflow_file: &Path) -> Result<()> {
  let (def, graph) = read_workflow(workflow_file).await?;
  eprintln!("Loaded workflow: {}", def.name);

  let payload = read_payload_from_stdin()?;

  let handlers = HandlerRegistry::simulated(simulation_config(cli));
  let simulator = Simulator::new(handlers).with_config(SimulatorConfig {
    node_timeout: cli.node_timeout_ms.map(Duration::from_millis),
  });

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, stopping after the current node");
      on_interrupt.cancel();
    }
  });

  let report = simulator
    .run(&graph, &def.rules, payload, cancel)
    .await
    .context("workflow simulation failed")?;

  println!("{}", serde_json::to_string_pretty(&report)?);

  if !report.is_completed() {
    bail!("run {} ended with status {:?}", report.run_id, report.status);
  }
  Ok(())
}

async fn print_order(workflow_file: &Path, selected: bool) -> Result<()> {
  let (_, graph) = read_workflow(workflow_file).await?;
  let policy = if selected {
    BranchPolicy::Selected
  } else {
    BranchPolicy::AllBranches
  };
  let order = DepthFirstResolver::new(policy)
    .resolve(&graph)
    .context("failed to resolve execution order")?;

  println!("{}", serde_json::to_string_pretty(&order)?);
  Ok(())
}

async fn export_workflow(workflow_file: &Path, output: Option<&Path>) -> Result<()> {
  let (def, _) = read_workflow(workflow_file).await?;
  let json = agentflow_export::to_json(&agentflow_export::export(&def))?;

  match output {
    Some(path) => {
      tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write export: {}", path.display()))?;
      eprintln!("Exported {} to {}", def.name, path.display());
    }
    None => println!("{}", json),
  }
  Ok(())
}

async fn save_snapshot(store: &FsSnapshotStore, workflow_file: &Path, key: &str) -> Result<()> {
  let (def, _) = read_workflow(workflow_file).await?;
  store
    .save(key, &def)
    .await
    .with_context(|| format!("failed to save snapshot '{}'", key))?;
  eprintln!("Saved {} as '{}'", def.name, key);
  Ok(())
}

async fn load_snapshot(store: &FsSnapshotStore, key: &str) -> Result<()> {
  let Some(def) = store
    .load(key)
    .await
    .with_context(|| format!("failed to load snapshot '{}'", key))?
  else {
    bail!("no snapshot saved under '{}'", key);
  };
  println!("{}", serde_json::to_string_pretty(&def)?);
  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
