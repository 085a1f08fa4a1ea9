//! Best-effort removal of everything a run placed on the cluster.
//!
//! The plan never assumes an artifact actually made it to a node: removals
//! are glob-based and idempotent, each one is attempted regardless of how the
//! previous ones went, and failures are logged rather than returned.
//! Worker removals come from the same artifact list distribution used, so
//! whatever was pushed to a worker is also removed from it.

use tracing::{info, warn};

use super::distribute::{Artifact, MACHINEFILE};
use crate::infrastructure::RemotePort;
use crate::types::node::Node;

/// Executable plus the staged `hpcg.dat` input on the coordinator.
pub const COORDINATOR_BINARIES: &str = "hpcg*";

/// Reports HPCG writes into the coordinator's working directory.
pub const RUN_OUTPUTS: &str = "HPCG-Benchmark-*.yaml";

/// One glob to remove on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Index into the node list.
    pub node: usize,
    pub pattern: String,
}

/// What went wrong during teardown; informational only.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub attempted: usize,
    /// (node name, pattern, cause) for removals that failed.
    pub failed: Vec<(String, String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownPlan {
    removals: Vec<Removal>,
}

impl TeardownPlan {
    /// Enumerate removals for `nodes`: coordinator first, then every
    /// distributed artifact on each worker in order.
    pub fn for_nodes(nodes: &[Node], artifacts: &[Artifact]) -> TeardownPlan {
        let mut removals = Vec::new();
        if nodes.is_empty() {
            return TeardownPlan { removals };
        }
        for pattern in [COORDINATOR_BINARIES, MACHINEFILE, RUN_OUTPUTS] {
            removals.push(Removal {
                node: 0,
                pattern: pattern.to_string(),
            });
        }
        for node in 1..nodes.len() {
            for artifact in artifacts {
                removals.push(Removal {
                    node,
                    pattern: artifact.worker_path().to_string(),
                });
            }
        }
        TeardownPlan { removals }
    }

    pub fn removals(&self) -> &[Removal] {
        &self.removals
    }

    /// Attempt every removal. Never fails.
    pub fn execute(&self, port: &dyn RemotePort, nodes: &[Node]) -> TeardownReport {
        let mut report = TeardownReport::default();
        for removal in &self.removals {
            let Some(node) = nodes.get(removal.node) else {
                continue;
            };
            report.attempted += 1;
            if let Err(e) = port.remove(node, &removal.pattern) {
                warn!(node = %node.name, pattern = %removal.pattern, error = %e,
                    "cleanup failed, ignoring");
                report
                    .failed
                    .push((node.name.clone(), removal.pattern.clone(), e.to_string()));
            }
        }
        info!(
            attempted = report.attempted,
            failed = report.failed.len(),
            "teardown finished"
        );
        report
    }
}
