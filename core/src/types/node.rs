//! Cluster nodes and the run descriptor built from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};


// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A remote machine taking part in the run.
///
/// Position in the node list is the node's identity: index 0 is the
/// coordinator, everything after it is a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Short name used in logs and errors (e.g. "vm-0").
    pub name: String,
    /// Address on the cluster-internal network; written to the machinefile.
    pub internal_ip: String,
    /// Address used to reach the node over SSH. Falls back to `internal_ip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Number of logical CPUs, used as the MPI slot count.
    pub num_cpus: u32,
}

impl Node {
    pub fn new(name: &str, internal_ip: &str, num_cpus: u32) -> Self {
        Node {
            name: name.to_string(),
            internal_ip: internal_ip.to_string(),
            public_ip: None,
            num_cpus,
        }
    }

    /// The host the controller connects to.
    pub fn ssh_host(&self) -> &str {
        self.public_ip.as_deref().unwrap_or(&self.internal_ip)
    }
}


// ---------------------------------------------------------------------------
// RunDescriptor
// ---------------------------------------------------------------------------

/// Read-only view of a benchmark run: the ordered node list plus the
/// metadata attached to every metric record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDescriptor {
    nodes: Vec<Node>,
}

impl RunDescriptor {
    pub fn new(nodes: Vec<Node>) -> Self {
        RunDescriptor { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_machines(&self) -> usize {
        self.nodes.len()
    }

    /// The coordinator, if the run has any nodes at all.
    pub fn coordinator(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// All nodes after the coordinator, in order.
    pub fn workers(&self) -> &[Node] {
        if self.nodes.is_empty() {
            &[]
        } else {
            &self.nodes[1..]
        }
    }

    /// Metadata shared by every metric record of this run.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert("num_machines".to_string(), self.num_machines().to_string());
        meta
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<Node> {
        (0..n)
            .map(|i| Node::new(&format!("vm-{}", i), &format!("10.0.0.{}", i + 1), 4))
            .collect()
    }

    #[test]
    fn ssh_host_defaults_to_internal_ip() {
        let mut node = Node::new("vm-0", "10.0.0.1", 4);
        assert_eq!(node.ssh_host(), "10.0.0.1");
        node.public_ip = Some("34.1.2.3".into());
        assert_eq!(node.ssh_host(), "34.1.2.3");
    }

    #[test]
    fn coordinator_and_workers_split() {
        let run = RunDescriptor::new(nodes(3));
        assert_eq!(run.coordinator().unwrap().name, "vm-0");
        let workers: Vec<&str> = run.workers().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(workers, vec!["vm-1", "vm-2"]);
    }

    #[test]
    fn empty_run_has_no_workers() {
        let run = RunDescriptor::new(Vec::new());
        assert!(run.coordinator().is_none());
        assert!(run.workers().is_empty());
    }

    #[test]
    fn metadata_carries_node_count() {
        let run = RunDescriptor::new(nodes(5));
        assert_eq!(run.metadata().get("num_machines").unwrap(), "5");
    }
}
