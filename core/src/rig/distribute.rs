//! Hub-and-spoke artifact distribution.
//!
//! Every artifact already sits on the coordinator. `DistributionPlan` expands
//! a list of artifacts into ordered coordinator→worker steps (artifact-major,
//! workers ascending, a relocation right after the push that needs it) and
//! executes them through a `RemotePort`. A failing step abandons the rest of
//! that worker's steps; other workers carry on and nothing is rolled back.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RigError};
use crate::infrastructure::RemotePort;
use crate::types::node::Node;

/// Benchmark executable, copied into the coordinator's home directory.
pub const EXECUTABLE: &str = "hpcg";

/// Open MPI daemon each worker must have on its PATH.
pub const ORTED_PATH: &str = "/usr/bin/orted";

/// Machinefile name on the coordinator.
pub const MACHINEFILE: &str = "machinefile";


// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// A file on the coordinator that every worker needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path on the coordinator.
    pub source: String,
    /// Privileged path the worker moves the file to after receiving it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relocate_to: Option<String>,
}

impl Artifact {
    pub fn file(source: &str) -> Self {
        Artifact {
            source: source.to_string(),
            relocate_to: None,
        }
    }

    pub fn relocated(source: &str, target: &str) -> Self {
        Artifact {
            source: source.to_string(),
            relocate_to: Some(target.to_string()),
        }
    }

    /// Destination on the worker: the source's base name.
    pub fn dest_name(&self) -> &str {
        self.source.rsplit('/').next().unwrap_or(&self.source)
    }

    /// Where the artifact ends up on a worker once distribution is done.
    pub fn worker_path(&self) -> &str {
        self.relocate_to.as_deref().unwrap_or_else(|| self.dest_name())
    }
}

/// The HPCG artifact set: executable, MPI daemon, machinefile.
pub fn default_artifacts() -> Vec<Artifact> {
    vec![
        Artifact::file(EXECUTABLE),
        Artifact::relocated(ORTED_PATH, ORTED_PATH),
        Artifact::file(MACHINEFILE),
    ]
}


// ---------------------------------------------------------------------------
// DistributionStep / DistributionPlan
// ---------------------------------------------------------------------------

/// What a single step does on its worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Copy `source` on the coordinator to `dest` on the worker.
    Push { source: String, dest: String },
    /// Move `from` to `to` on the worker with elevated privileges.
    Relocate { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionStep {
    /// Index of the worker in the node list (never 0).
    pub node: usize,
    /// Base name of the artifact, for error attribution.
    pub artifact: String,
    pub action: StepAction,
}

impl DistributionStep {
    /// Shell command a relocation step runs on the worker.
    pub fn relocate_command(from: &str, to: &str) -> String {
        format!("sudo mv {} {}", from, to)
    }
}

/// Ordered coordinator→worker steps for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    steps: Vec<DistributionStep>,
}

impl DistributionPlan {
    /// Expand `artifacts` over every worker in `nodes`.
    pub fn new(nodes: &[Node], artifacts: &[Artifact]) -> Result<DistributionPlan> {
        if nodes.is_empty() {
            return Err(RigError::InvalidTopology("node list is empty".into()));
        }
        let mut steps = Vec::new();
        for artifact in artifacts {
            let dest = artifact.dest_name().to_string();
            for node in 1..nodes.len() {
                steps.push(DistributionStep {
                    node,
                    artifact: dest.clone(),
                    action: StepAction::Push {
                        source: artifact.source.clone(),
                        dest: dest.clone(),
                    },
                });
                if let Some(ref target) = artifact.relocate_to {
                    steps.push(DistributionStep {
                        node,
                        artifact: dest.clone(),
                        action: StepAction::Relocate {
                            from: dest.clone(),
                            to: target.clone(),
                        },
                    });
                }
            }
        }
        Ok(DistributionPlan { steps })
    }

    pub fn steps(&self) -> &[DistributionStep] {
        &self.steps
    }

    /// Run every step in order. Per-worker failures are collected in the
    /// report rather than stopping the whole distribution.
    pub fn execute(&self, port: &dyn RemotePort, nodes: &[Node]) -> DistributionReport {
        let mut report = DistributionReport::default();
        let Some(coordinator) = nodes.first() else {
            return report;
        };
        let mut abandoned: HashSet<usize> = HashSet::new();

        for step in &self.steps {
            if abandoned.contains(&step.node) {
                continue;
            }
            let Some(worker) = nodes.get(step.node) else {
                continue;
            };
            let outcome = match &step.action {
                StepAction::Push { source, dest } => {
                    debug!(worker = %worker.name, %source, "pushing artifact");
                    port.copy_between(coordinator, worker, source, dest)
                }
                StepAction::Relocate { from, to } => port
                    .run(worker, &DistributionStep::relocate_command(from, to))
                    .map(|_| ()),
            };
            match outcome {
                Ok(()) => report.completed.push((worker.name.clone(), step.artifact.clone())),
                Err(e) => {
                    warn!(worker = %worker.name, artifact = %step.artifact, error = %e,
                        "distribution failed, skipping remaining artifacts for worker");
                    abandoned.insert(step.node);
                    report.failures.push(RigError::DistributionFailure {
                        node: worker.name.clone(),
                        artifact: step.artifact.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        info!(
            steps = report.completed.len(),
            failed_workers = report.failures.len(),
            "artifact distribution finished"
        );
        report
    }
}


// ---------------------------------------------------------------------------
// DistributionReport
// ---------------------------------------------------------------------------

/// Outcome of executing a plan.
#[derive(Debug, Default)]
pub struct DistributionReport {
    /// (worker name, artifact) pairs whose step succeeded, in order.
    pub completed: Vec<(String, String)>,
    /// One `DistributionFailure` per failed worker, in the order they failed.
    pub failures: Vec<RigError>,
}

impl DistributionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok` when every worker succeeded. A single failed worker comes back
    /// as its `DistributionFailure`; several are bundled so none is lost.
    pub fn into_result(mut self) -> Result<()> {
        match self.failures.len() {
            0 => Ok(()),
            1 => Err(self.failures.remove(0)),
            _ => Err(RigError::DistributionFailures(self.failures)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{MockPort, PortCall};

    fn nodes(n: usize) -> Vec<Node> {
        (0..n)
            .map(|i| Node::new(&format!("vm-{}", i), &format!("10.0.0.{}", i + 1), 4))
            .collect()
    }

    // -- Artifact --

    #[test]
    fn dest_name_is_base_name() {
        assert_eq!(Artifact::file("hpcg").dest_name(), "hpcg");
        assert_eq!(Artifact::file("/usr/bin/orted").dest_name(), "orted");
    }

    #[test]
    fn worker_path_follows_relocation() {
        assert_eq!(Artifact::file("machinefile").worker_path(), "machinefile");
        assert_eq!(
            Artifact::relocated("/usr/bin/orted", "/usr/bin/orted").worker_path(),
            "/usr/bin/orted"
        );
        assert_eq!(Artifact::file("/opt/x/hpcg").worker_path(), "hpcg");
    }

    // -- Plan --

    #[test]
    fn plan_is_artifact_major_with_immediate_relocation() {
        let plan = DistributionPlan::new(&nodes(3), &default_artifacts()).unwrap();
        let summary: Vec<(usize, &str, bool)> = plan
            .steps()
            .iter()
            .map(|s| {
                let relocate = matches!(s.action, StepAction::Relocate { .. });
                (s.node, s.artifact.as_str(), relocate)
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "hpcg", false),
                (2, "hpcg", false),
                (1, "orted", false),
                (1, "orted", true),
                (2, "orted", false),
                (2, "orted", true),
                (1, "machinefile", false),
                (2, "machinefile", false),
            ]
        );
    }

    #[test]
    fn single_node_plan_is_empty() {
        let plan = DistributionPlan::new(&nodes(1), &default_artifacts()).unwrap();
        assert!(plan.steps().is_empty());
    }

    #[test]
    fn empty_node_list_is_rejected() {
        assert!(DistributionPlan::new(&[], &default_artifacts()).is_err());
    }

    #[test]
    fn extra_artifact_needs_no_code_change() {
        let mut artifacts = default_artifacts();
        artifacts.push(Artifact::file("hpcg.dat"));
        let plan = DistributionPlan::new(&nodes(2), &artifacts).unwrap();
        assert_eq!(plan.steps().last().unwrap().artifact, "hpcg.dat");
    }

    // -- Execute --

    #[test]
    fn execute_pushes_from_coordinator_only() {
        let port = MockPort::new();
        let cluster = nodes(3);
        let plan = DistributionPlan::new(&cluster, &default_artifacts()).unwrap();
        let report = plan.execute(&port, &cluster);
        assert!(report.is_success());
        for call in port.calls() {
            if let PortCall::Copy { from, .. } = call {
                assert_eq!(from, "vm-0");
            }
        }
        assert!(port.calls().contains(&PortCall::Run {
            node: "vm-2".into(),
            command: "sudo mv orted /usr/bin/orted".into(),
        }));
    }

    #[test]
    fn failure_abandons_only_that_worker() {
        let mut port = MockPort::new();
        port.fail_on("vm-2", "orted");
        let cluster = nodes(4);
        let plan = DistributionPlan::new(&cluster, &default_artifacts()).unwrap();
        let report = plan.execute(&port, &cluster);

        assert_eq!(report.failures.len(), 1);
        // vm-2 got hpcg, then failed on orted and received nothing more.
        let vm2: Vec<PortCall> = port.calls_for("vm-2");
        assert_eq!(vm2.len(), 2);
        // Other workers received all three artifacts plus the relocation.
        assert_eq!(port.calls_for("vm-1").len(), 4);
        assert_eq!(port.calls_for("vm-3").len(), 4);

        match report.into_result().unwrap_err() {
            RigError::DistributionFailure { node, artifact, .. } => {
                assert_eq!(node, "vm-2");
                assert_eq!(artifact, "orted");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn relocation_failure_is_attributed_to_worker() {
        let mut port = MockPort::new();
        port.fail_on("vm-1", "sudo mv");
        let cluster = nodes(2);
        let plan = DistributionPlan::new(&cluster, &default_artifacts()).unwrap();
        let report = plan.execute(&port, &cluster);
        assert!(!report.is_success());
        assert!(report.failures[0].to_string().contains("vm-1"));
        // machinefile was never pushed to vm-1.
        assert!(!port.calls_for("vm-1").iter().any(|c| matches!(
            c,
            PortCall::Copy { dest, .. } if dest == "machinefile"
        )));
    }

    #[test]
    fn every_failed_worker_reaches_the_caller() {
        let mut port = MockPort::new();
        port.fail_on("vm-1", "copy hpcg");
        port.fail_on("vm-3", "sudo mv");
        let cluster = nodes(4);
        let report = DistributionPlan::new(&cluster, &default_artifacts())
            .unwrap()
            .execute(&port, &cluster);
        assert_eq!(report.failures.len(), 2);

        let err = report.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 workers"), "{}", msg);
        assert!(msg.contains("vm-1") && msg.contains("vm-3"), "{}", msg);
        match err {
            RigError::DistributionFailures(all) => {
                let nodes: Vec<String> = all
                    .iter()
                    .map(|e| match e {
                        RigError::DistributionFailure { node, .. } => node.clone(),
                        other => panic!("unexpected error: {:?}", other),
                    })
                    .collect();
                assert_eq!(nodes, vec!["vm-1", "vm-3"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
