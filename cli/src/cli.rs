//! CLI argument parsing and command dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hpcg_rig_core::infrastructure::runner::ShellRunner;
use hpcg_rig_core::infrastructure::ssh::SshPort;
use hpcg_rig_core::rig::distribute::default_artifacts;
use hpcg_rig_core::rig::launch::LaunchPlan;
use hpcg_rig_core::rig::teardown::TeardownPlan;
use hpcg_rig_core::rig::topology::ClusterTopology;
use hpcg_rig_core::{
    ExtractionReport, ExtractionRule, MetricExtractor, Node, NumberPolicy, RunConfig,
    RunDescriptor, RunOrchestrator,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "hpcg-rig")]
#[command(author, version, about = "Run HPCG across a cluster over SSH", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare, launch, collect, and clean up a full run
    Run {
        /// Path to the cluster YAML
        #[arg(short, long)]
        config: PathBuf,
        /// Skip cleanup of remote artifacts (for debugging a failed run)
        #[arg(long)]
        keep: bool,
    },
    /// Print the launch command and teardown plan without connecting
    Plan {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the machinefile the run would use
    Machinefile {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Extract metrics from a saved HPCG report
    Parse {
        /// Report file to read
        #[arg(short, long)]
        input: PathBuf,
        /// Node count recorded in metric metadata
        #[arg(short, long, default_value = "1")]
        nodes: usize,
        /// Reject values with trailing characters instead of reading the prefix
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run { config, keep } => run(&config, keep),
            Commands::Plan { config } => plan(&config),
            Commands::Machinefile { config } => machinefile(&config),
            Commands::Parse {
                input,
                nodes,
                strict,
            } => parse(&input, nodes, strict),
        }
    }
}

fn load(path: &Path) -> Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn run(config_path: &Path, keep: bool) -> Result<()> {
    let config = load(config_path)?;
    let port = SshPort::new(config.ssh.clone(), Box::new(ShellRunner));
    let orch = RunOrchestrator::new(config, port);
    info!(num_machines = orch.info().num_machines, "starting {}", orch.info().name);

    let report = if keep {
        orch.check_prerequisites()?;
        orch.prepare().and_then(|topology| orch.run(&topology))?
    } else {
        orch.execute()?
    };
    print_report(report)
}

fn plan(config_path: &Path) -> Result<()> {
    let config = load(config_path)?;
    let topology = ClusterTopology::build(&config.nodes)?;
    let launch = LaunchPlan::build(&topology);
    println!("launch on {}: {}", config.nodes[launch.target].name, launch.command);
    println!("teardown:");
    for removal in TeardownPlan::for_nodes(&config.nodes, &default_artifacts()).removals() {
        println!("  {}: {}", config.nodes[removal.node].name, removal.pattern);
    }
    Ok(())
}

fn machinefile(config_path: &Path) -> Result<()> {
    let config = load(config_path)?;
    print!("{}", ClusterTopology::build(&config.nodes)?.render());
    Ok(())
}

fn parse(input: &Path, nodes: usize, strict: bool) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let policy = if strict {
        NumberPolicy::Strict
    } else {
        NumberPolicy::Prefix
    };
    // Only the node count matters for metadata.
    let run = RunDescriptor::new(
        (0..nodes)
            .map(|i| Node::new(&format!("node-{}", i), "0.0.0.0", 1))
            .collect(),
    );
    let extractor = MetricExtractor::new(ExtractionRule::hpcg_defaults(), policy)?;
    print_report(extractor.extract_all(&text, &run))
}

fn print_report(report: ExtractionReport) -> Result<()> {
    for failure in &report.failures {
        warn!("{}", failure);
    }
    println!("{}", serde_json::to_string_pretty(&report.records)?);
    if report.records.is_empty() {
        anyhow::bail!("no metrics extracted");
    }
    Ok(())
}
