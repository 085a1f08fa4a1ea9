//! Cluster-run orchestration, the "rig" subsystem.
//!
//! Builds the machinefile, distributes artifacts hub-and-spoke from the
//! coordinator, plans the `mpirun` launch, extracts metrics from the report,
//! and tears everything down afterwards. Planners are pure and return data;
//! only `orchestrator` and the `execute` methods touch a `RemotePort`.

pub mod distribute;
pub mod extract;
pub mod launch;
pub mod orchestrator;
pub mod teardown;
pub mod topology;
