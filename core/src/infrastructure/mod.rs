//! Remote execution backends.
//!
//! Provides the `RemotePort` trait the rig pipeline is written against, the
//! SSH implementation used in production, and a recording mock for tests.

pub mod mock;
pub mod runner;
pub mod ssh;

use std::path::Path;

use crate::error::Result;
use crate::types::node::Node;

/// The narrow set of remote operations a cluster run needs. Every failure
/// surfaces as `RigError::Transport`.
pub trait RemotePort {
    /// Copy a local file to `dest` on `node`.
    fn push(&self, node: &Node, source: &Path, dest: &str) -> Result<()>;

    /// Copy `source` on `from` to `dest` on `to`, issued from `from`.
    fn copy_between(&self, from: &Node, to: &Node, source: &str, dest: &str) -> Result<()>;

    /// Run a command and wait for it, returning `(stdout, stderr)`.
    fn run(&self, node: &Node, command: &str) -> Result<(String, String)>;

    /// Run a command of unbounded duration, blocking until it exits.
    fn run_long_running(&self, node: &Node, command: &str) -> Result<()>;

    /// Remove files matching a glob. Matching nothing is not an error.
    fn remove(&self, node: &Node, pattern: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::mock::MockPort;
    use super::*;

    #[test]
    fn mock_implements_remote_port() {
        let port = MockPort::new();
        let _: &dyn RemotePort = &port;
    }
}
