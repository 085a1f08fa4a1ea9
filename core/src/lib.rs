//! hpcg-rig-core: orchestration of multi-node HPCG runs.
//!
//! The crate turns an ordered node list into a machinefile, distributes the
//! benchmark binary and MPI helper from the coordinator to every worker,
//! launches `mpirun` on the coordinator, extracts metric records from the
//! captured output, and removes everything it placed afterwards. All remote
//! side effects go through the `RemotePort` trait so the pipeline can be
//! driven by SSH in production and by a recording mock in tests.

pub mod error;
pub mod infrastructure;
pub mod rig;
pub mod types;

pub use error::{Result, RigError};
pub use infrastructure::RemotePort;
pub use rig::extract::{ExtractionReport, ExtractionRule, MetricExtractor, MetricRecord, NumberPolicy};
pub use rig::orchestrator::{BenchmarkInfo, RunOrchestrator};
pub use types::config::RunConfig;
pub use types::node::{Node, RunDescriptor};
