//! Run configuration.
//!
//! `RunConfig` is the single immutable settings value threaded through every
//! phase of a run. It is loaded from YAML, validated once, and never mutated.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};
use crate::rig::extract::{ExtractionRule, NumberPolicy};
use crate::types::node::{Node, RunDescriptor};

/// Directory the HPCG package is unpacked and built in on the coordinator.
pub const DEFAULT_HPCG_DIR: &str = "/tmp/pkb/hpcg-2.4";

/// Local HPCG input file pushed to the coordinator as `hpcg.dat`.
pub const DEFAULT_INPUT_FILE: &str = "hpcginf.txt";


// ---------------------------------------------------------------------------
// SshConfig
// ---------------------------------------------------------------------------

/// SSH coordinates shared by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to an SSH private key, if not using the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl SshConfig {
    /// Build the `user@host` string for a node.
    pub fn user_at_host(&self, node: &Node) -> String {
        format!("{}@{}", self.user, node.ssh_host())
    }

    /// Connection options (port, host key policy, key) without a target.
    pub fn ssh_options(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if let Some(ref key) = self.ssh_key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }

    /// Base SSH arguments (options plus `user@host`) without a command.
    pub fn ssh_base_args(&self, node: &Node) -> Vec<String> {
        let mut args = self.ssh_options();
        args.push(self.user_at_host(node));
        args
    }

    /// The same options rewritten for `scp`, which spells the port `-P`.
    pub fn scp_options(&self) -> Vec<String> {
        self.ssh_options()
            .into_iter()
            .map(|a| if a == "-p" { "-P".to_string() } else { a })
            .collect()
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            user: "perfkit".to_string(),
            port: default_port(),
            ssh_key: None,
        }
    }
}


// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Everything a run needs to know, loaded once at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ordered node list; the first entry is the coordinator.
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default = "default_hpcg_dir")]
    pub hpcg_dir: String,
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,
    #[serde(default)]
    pub number_policy: NumberPolicy,
    /// Extra extraction rules appended to the built-in HPCG table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<ExtractionRule>,
}

fn default_hpcg_dir() -> String {
    DEFAULT_HPCG_DIR.to_string()
}

fn default_input_file() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_FILE)
}

impl RunConfig {
    /// Build a config for the given nodes with every other setting defaulted.
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        RunConfig {
            nodes,
            ssh: SshConfig::default(),
            hpcg_dir: default_hpcg_dir(),
            input_file: default_input_file(),
            number_policy: NumberPolicy::default(),
            metrics: Vec::new(),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<RunConfig> {
        let config: RunConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a YAML file.
    pub fn load(path: &Path) -> Result<RunConfig> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&text)?;
        // A relative input file is resolved next to the config file.
        if config.input_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.input_file = dir.join(&config.input_file);
            }
        }
        Ok(config)
    }

    /// Serialise back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configs no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(RigError::Config("at least one node is required".into()));
        }
        if let Some(node) = self.nodes.iter().find(|n| n.num_cpus == 0) {
            return Err(RigError::Config(format!(
                "node '{}' reports zero CPUs",
                node.name
            )));
        }
        if self.ssh.user.is_empty() {
            return Err(RigError::Config("ssh user must not be empty".into()));
        }
        for rule in &self.metrics {
            if rule.label.is_empty() {
                return Err(RigError::Config(format!(
                    "metric '{}' has an empty label",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    /// The read-only run descriptor handed to extraction.
    pub fn descriptor(&self) -> RunDescriptor {
        RunDescriptor::new(self.nodes.clone())
    }

    /// The built-in HPCG rules followed by any configured extras.
    pub fn extraction_rules(&self) -> Vec<ExtractionRule> {
        let mut rules = ExtractionRule::hpcg_defaults();
        rules.extend(self.metrics.iter().cloned());
        rules
    }
}
