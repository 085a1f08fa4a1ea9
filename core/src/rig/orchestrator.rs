//! Rig orchestrator — drives one HPCG run through a `RemotePort`.
//!
//! `RunOrchestrator` wires the pure planners (topology, distribution, launch,
//! extraction, teardown) to real side effects. Phases run strictly in order:
//! prepare, launch, capture, extract. Cleanup runs afterwards whatever
//! happened, and never replaces the run's own result or error.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::distribute::{default_artifacts, DistributionPlan, EXECUTABLE, MACHINEFILE};
use super::extract::{ExtractionReport, MetricExtractor};
use super::launch::{ExecMode, LaunchPlan, RESULTS_COMMAND};
use super::teardown::{TeardownPlan, TeardownReport};
use super::topology::ClusterTopology;
use crate::error::{Result, RigError};
use crate::infrastructure::RemotePort;
use crate::types::config::RunConfig;
use crate::types::node::Node;

/// Name the input file is pushed under before being renamed.
pub const STAGED_INPUT: &str = "hpcginf.txt";

/// Name HPCG reads its input parameters from.
pub const HPCG_INPUT: &str = "hpcg.dat";

/// Static description of the benchmark for the surrounding controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub scratch_disk: bool,
    pub num_machines: usize,
}

pub struct RunOrchestrator<P: RemotePort> {
    config: RunConfig,
    port: P,
}

impl<P: RemotePort> fmt::Debug for RunOrchestrator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOrchestrator")
            .field("config", &self.config)
            .finish()
    }
}

impl<P: RemotePort> RunOrchestrator<P> {
    pub fn new(config: RunConfig, port: P) -> Self {
        RunOrchestrator { config, port }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn info(&self) -> BenchmarkInfo {
        BenchmarkInfo {
            name: "hpcg",
            description: "Runs HPCG.",
            scratch_disk: false,
            num_machines: self.config.nodes.len(),
        }
    }

    fn nodes(&self) -> &[Node] {
        &self.config.nodes
    }

    fn coordinator(&self) -> Result<&Node> {
        self.nodes()
            .first()
            .ok_or_else(|| RigError::InvalidTopology("node list is empty".into()))
    }

    /// Verify local resources exist before touching any node.
    pub fn check_prerequisites(&self) -> Result<()> {
        if !self.config.input_file.is_file() {
            return Err(RigError::MissingResource(self.config.input_file.clone()));
        }
        Ok(())
    }

    /// Stage the binary, input file and machinefile on the coordinator, then
    /// distribute to every worker. Returns the topology the launch uses.
    pub fn prepare(&self) -> Result<ClusterTopology> {
        let topology = ClusterTopology::build(self.nodes())?;
        let coordinator = self.coordinator()?;
        info!(
            nodes = topology.len(),
            coordinator = %coordinator.name,
            "preparing HPCG run"
        );

        self.port.run(
            coordinator,
            &format!("cp {}/bin/xhpcg {}", self.config.hpcg_dir, EXECUTABLE),
        )?;
        self.port
            .push(coordinator, &self.config.input_file, STAGED_INPUT)?;
        self.port
            .run(coordinator, &format!("mv {} {}", STAGED_INPUT, HPCG_INPUT))?;

        let machinefile = topology.materialize()?;
        self.push_machinefile(coordinator, machinefile.path())?;

        DistributionPlan::new(self.nodes(), &default_artifacts())?
            .execute(&self.port, self.nodes())
            .into_result()?;
        Ok(topology)
    }

    fn push_machinefile(&self, coordinator: &Node, local: &Path) -> Result<()> {
        self.port.push(coordinator, local, MACHINEFILE)
    }

    /// Launch `mpirun` on the coordinator, read back the report, and extract
    /// every configured metric.
    pub fn run(&self, topology: &ClusterTopology) -> Result<ExtractionReport> {
        let plan = LaunchPlan::build(topology);
        let target = self
            .nodes()
            .get(plan.target)
            .ok_or_else(|| RigError::InvalidTopology("launch target missing".into()))?;
        info!(processes = plan.process_count, command = %plan.command, "launching");

        match plan.mode {
            ExecMode::LongRunning => self.port.run_long_running(target, &plan.command)?,
            ExecMode::Blocking => {
                self.port.run(target, &plan.command)?;
            }
        }

        info!("HPCG results:");
        let (stdout, _) = self.port.run(target, RESULTS_COMMAND)?;
        let extractor =
            MetricExtractor::new(self.config.extraction_rules(), self.config.number_policy)?;
        Ok(extractor.extract_all(&stdout, &self.config.descriptor()))
    }

    /// Remove everything the run may have placed. Never fails.
    pub fn cleanup(&self) -> TeardownReport {
        TeardownPlan::for_nodes(self.nodes(), &default_artifacts()).execute(&self.port, self.nodes())
    }

    /// Full pipeline. Cleanup always runs once anything remote was touched;
    /// its outcome is logged and does not affect the returned result.
    pub fn execute(&self) -> Result<ExtractionReport> {
        self.check_prerequisites()?;
        let result = self.prepare().and_then(|topology| self.run(&topology));
        self.cleanup();
        result
    }
}
