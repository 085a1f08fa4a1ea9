//! `mpirun` launch planning.

use serde::{Deserialize, Serialize};

use super::distribute::{EXECUTABLE, MACHINEFILE};
use super::topology::ClusterTopology;

/// Transport directive that lets `orted` reach workers without host-key
/// prompts.
pub const RSH_AGENT: &str = "ssh -o StrictHostKeyChecking=no";

/// Prints the YAML report HPCG writes into its working directory on the
/// day of the run.
pub const RESULTS_COMMAND: &str = r#"cat HPCG-Benchmark-2.4_$(date +"%Y.%m.%d")*.yaml"#;

/// How the port should execute a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    /// Wait for the command and capture its output.
    Blocking,
    /// Unbounded duration; block until exit, output read afterwards.
    LongRunning,
}

/// The assembled launch command and where it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub command: String,
    /// Index into the node list. Always the coordinator.
    pub target: usize,
    pub mode: ExecMode,
    pub process_count: u64,
}

impl LaunchPlan {
    /// Plan the launch for `topology`.
    ///
    /// The process count is the node count times the coordinator's slot
    /// count; worker slot counts are not consulted.
    pub fn build(topology: &ClusterTopology) -> LaunchPlan {
        let process_count = topology.len() as u64 * u64::from(topology.coordinator().slots);
        let command = format!(
            "mpirun -np {} -machinefile {} --mca orte_rsh_agent \"{}\" ./{}",
            process_count, MACHINEFILE, RSH_AGENT, EXECUTABLE
        );
        LaunchPlan {
            command,
            target: 0,
            mode: ExecMode::LongRunning,
            process_count,
        }
    }
}
