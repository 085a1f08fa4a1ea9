//! Error types for hpcg-rig-core.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while preparing, launching, or parsing a
/// cluster run.
#[derive(Debug, Error)]
pub enum RigError {
    /// The node list cannot form a cluster (empty, zero width, duplicate
    /// worker address).
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Pushing or relocating an artifact on a worker failed.
    #[error("distribution of '{artifact}' to node '{node}' failed: {cause}")]
    DistributionFailure {
        node: String,
        artifact: String,
        cause: String,
    },

    /// More than one worker failed during distribution, in failure order.
    #[error("distribution failed on {} workers: {}", .0.len(), join_errors(.0))]
    DistributionFailures(Vec<RigError>),

    /// The label (or the number following it) never appears in the output.
    #[error("metric not found: '{label}'")]
    MetricNotFound { label: String },

    /// The label matched but the captured text is not a decimal literal.
    #[error("malformed value for metric '{label}': '{raw_text}'")]
    MalformedMetric { label: String, raw_text: String },

    /// Connectivity or command failure reported by the remote port.
    #[error("transport error: {0}")]
    Transport(String),

    /// A local input file the run depends on does not exist.
    #[error("required resource not found: {}", .0.display())]
    MissingResource(PathBuf),

    /// The run configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RigError {
    /// Whether this error came from metric extraction (as opposed to
    /// orchestration). Callers use it to decide on partial success.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            RigError::MetricNotFound { .. } | RigError::MalformedMetric { .. }
        )
    }
}

fn join_errors(errors: &[RigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RigError>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_failure_names_node_and_artifact() {
        let err = RigError::DistributionFailure {
            node: "worker-2".into(),
            artifact: "orted".into(),
            cause: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("worker-2"));
        assert!(msg.contains("orted"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn extraction_errors_are_classified() {
        assert!(RigError::MetricNotFound { label: "x".into() }.is_extraction());
        assert!(RigError::MalformedMetric {
            label: "x".into(),
            raw_text: "1.x".into()
        }
        .is_extraction());
        assert!(!RigError::Transport("down".into()).is_extraction());
    }

    #[test]
    fn missing_resource_displays_path() {
        let err = RigError::MissingResource(PathBuf::from("/data/hpcginf.txt"));
        assert_eq!(
            err.to_string(),
            "required resource not found: /data/hpcginf.txt"
        );
    }
}
