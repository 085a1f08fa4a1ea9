//! SSH-backed `RemotePort`.
//!
//! `SshPort` builds `ssh`/`scp` argument vectors from the run's `SshConfig`
//! and hands them to a `CommandRunner`. Node-to-node copies run `scp` on the
//! source node against the destination's internal address, so workers never
//! need to be reachable from the controller for distribution.

use std::path::Path;

use tracing::debug;

use super::runner::CommandRunner;
use super::RemotePort;
use crate::error::{Result, RigError};
use crate::types::config::SshConfig;
use crate::types::node::Node;

pub struct SshPort {
    ssh: SshConfig,
    runner: Box<dyn CommandRunner>,
}

impl SshPort {
    pub fn new(ssh: SshConfig, runner: Box<dyn CommandRunner>) -> Self {
        SshPort { ssh, runner }
    }

    /// Arguments for `ssh` running `command` on `node`. The command stays a
    /// single argument so the remote shell handles globs and substitutions.
    pub fn build_ssh_args(&self, node: &Node, command: &str) -> Vec<String> {
        let mut args = self.ssh.ssh_base_args(node);
        args.push(command.to_string());
        args
    }

    /// Arguments for `scp` pushing a local file to `node`.
    pub fn build_scp_args(&self, node: &Node, source: &Path, dest: &str) -> Vec<String> {
        let mut args = self.ssh.scp_options();
        args.push(source.to_string_lossy().into_owned());
        args.push(format!("{}:{}", self.ssh.user_at_host(node), dest));
        args
    }

    /// The `scp` command line run on the source node of a node-to-node copy.
    pub fn build_relay_command(&self, to: &Node, source: &str, dest: &str) -> String {
        format!(
            "scp -o StrictHostKeyChecking=no {} {}@{}:{}",
            source, self.ssh.user, to.internal_ip, dest
        )
    }

    fn ssh(&self, node: &Node, command: &str) -> Result<(String, String)> {
        debug!(node = %node.name, %command, "ssh");
        let args = self.build_ssh_args(node, command);
        self.runner
            .run("ssh", &args)
            .map(|out| (out.stdout, out.stderr))
            .map_err(|e| RigError::Transport(format!("{}: {}", node.name, e)))
    }
}

impl RemotePort for SshPort {
    fn push(&self, node: &Node, source: &Path, dest: &str) -> Result<()> {
        debug!(node = %node.name, source = %source.display(), %dest, "scp push");
        let args = self.build_scp_args(node, source, dest);
        self.runner
            .run("scp", &args)
            .map(|_| ())
            .map_err(|e| RigError::Transport(format!("{}: {}", node.name, e)))
    }

    fn copy_between(&self, from: &Node, to: &Node, source: &str, dest: &str) -> Result<()> {
        let command = self.build_relay_command(to, source, dest);
        self.ssh(from, &command).map(|_| ())
    }

    fn run(&self, node: &Node, command: &str) -> Result<(String, String)> {
        self.ssh(node, command)
    }

    fn run_long_running(&self, node: &Node, command: &str) -> Result<()> {
        debug!(node = %node.name, %command, "ssh (attached)");
        let args = self.build_ssh_args(node, command);
        self.runner
            .run_attached("ssh", &args)
            .map_err(|e| RigError::Transport(format!("{}: {}", node.name, e)))
    }

    fn remove(&self, node: &Node, pattern: &str) -> Result<()> {
        // Absolute paths were placed with sudo.
        let command = if pattern.starts_with('/') {
            format!("sudo rm -rf {}", pattern)
        } else {
            format!("rm -rf {}", pattern)
        };
        self.ssh(node, &command).map(|_| ())
    }
}
