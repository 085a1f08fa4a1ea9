//! Mock remote port for testing.
//!
//! Records every call in order and fails calls matching configured rules,
//! making it easy to write deterministic tests for the rig pipeline.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use super::RemotePort;
use crate::error::{Result, RigError};
use crate::types::node::Node;

/// One recorded call against the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Push { node: String, source: String, dest: String },
    Copy { from: String, to: String, source: String, dest: String },
    Run { node: String, command: String },
    RunLongRunning { node: String, command: String },
    Remove { node: String, pattern: String },
}

impl PortCall {
    /// Name of the node the call acted on (the destination for copies).
    pub fn node(&self) -> &str {
        match self {
            PortCall::Push { node, .. }
            | PortCall::Run { node, .. }
            | PortCall::RunLongRunning { node, .. }
            | PortCall::Remove { node, .. } => node,
            PortCall::Copy { to, .. } => to,
        }
    }

    fn describe(&self) -> String {
        match self {
            PortCall::Push { source, dest, .. } => format!("push {} {}", source, dest),
            PortCall::Copy { source, dest, .. } => format!("copy {} {}", source, dest),
            PortCall::Run { command, .. } | PortCall::RunLongRunning { command, .. } => {
                command.clone()
            }
            PortCall::Remove { pattern, .. } => format!("rm {}", pattern),
        }
    }
}

/// A test-double that records calls and serves pre-configured outputs.
pub struct MockPort {
    calls: RefCell<Vec<PortCall>>,
    /// (node name, substring of the call description) pairs that fail.
    failures: Vec<(String, String)>,
    /// Stdout served for `run` calls whose command contains the key.
    outputs: HashMap<String, String>,
}

impl MockPort {
    pub fn new() -> Self {
        MockPort {
            calls: RefCell::new(Vec::new()),
            failures: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    /// Make every call on `node` whose description contains `needle` fail.
    pub fn fail_on(&mut self, node: &str, needle: &str) {
        self.failures.push((node.to_string(), needle.to_string()));
    }

    /// Serve `stdout` for run commands containing `needle`.
    pub fn set_output(&mut self, needle: &str, stdout: &str) {
        self.outputs.insert(needle.to_string(), stdout.to_string());
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.borrow().clone()
    }

    /// Calls that acted on the named node.
    pub fn calls_for(&self, node: &str) -> Vec<PortCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.node() == node)
            .cloned()
            .collect()
    }

    fn record(&self, call: PortCall) -> Result<()> {
        let description = call.describe();
        let failed = self
            .failures
            .iter()
            .any(|(node, needle)| node == call.node() && description.contains(needle.as_str()));
        let node = call.node().to_string();
        self.calls.borrow_mut().push(call);
        if failed {
            Err(RigError::Transport(format!(
                "mock: '{}' failed on {}",
                description, node
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl RemotePort for MockPort {
    fn push(&self, node: &Node, source: &Path, dest: &str) -> Result<()> {
        self.record(PortCall::Push {
            node: node.name.clone(),
            source: source.to_string_lossy().into_owned(),
            dest: dest.to_string(),
        })
    }

    fn copy_between(&self, from: &Node, to: &Node, source: &str, dest: &str) -> Result<()> {
        self.record(PortCall::Copy {
            from: from.name.clone(),
            to: to.name.clone(),
            source: source.to_string(),
            dest: dest.to_string(),
        })
    }

    fn run(&self, node: &Node, command: &str) -> Result<(String, String)> {
        self.record(PortCall::Run {
            node: node.name.clone(),
            command: command.to_string(),
        })?;
        let stdout = self
            .outputs
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok((stdout, String::new()))
    }

    fn run_long_running(&self, node: &Node, command: &str) -> Result<()> {
        self.record(PortCall::RunLongRunning {
            node: node.name.clone(),
            command: command.to_string(),
        })
    }

    fn remove(&self, node: &Node, pattern: &str) -> Result<()> {
        self.record(PortCall::Remove {
            node: node.name.clone(),
            pattern: pattern.to_string(),
        })
    }
}
