//! Cluster topology and machinefile generation.
//!
//! `ClusterTopology` turns the ordered node list into the entries `mpirun`
//! reads from its machinefile. The coordinator is always written as
//! `localhost` because the launch is issued from the coordinator itself.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, RigError};
use crate::types::node::Node;

/// Address written for the coordinator entry.
pub const COORDINATOR_ADDRESS: &str = "localhost";


// ---------------------------------------------------------------------------
// TopologyEntry
// ---------------------------------------------------------------------------

/// One machinefile line: an address and its MPI slot count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub address: String,
    pub slots: u32,
}

impl fmt::Display for TopologyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slots={}", self.address, self.slots)
    }
}


// ---------------------------------------------------------------------------
// ClusterTopology
// ---------------------------------------------------------------------------

/// Ordered machinefile entries, coordinator first. Never empty.
///
/// Deserialized topologies go through the same checks as `from_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SerializedTopology")]
pub struct ClusterTopology {
    entries: Vec<TopologyEntry>,
}

#[derive(Deserialize)]
struct SerializedTopology {
    entries: Vec<TopologyEntry>,
}

impl TryFrom<SerializedTopology> for ClusterTopology {
    type Error = RigError;

    fn try_from(raw: SerializedTopology) -> Result<ClusterTopology> {
        ClusterTopology::from_entries(raw.entries)
    }
}

impl ClusterTopology {
    /// Derive the topology from the ordered node list.
    ///
    /// Fails with `InvalidTopology` when the list is empty, a node reports
    /// zero CPUs, or two workers share an internal address.
    pub fn build(nodes: &[Node]) -> Result<ClusterTopology> {
        let (coordinator, workers) = nodes
            .split_first()
            .ok_or_else(|| RigError::InvalidTopology("node list is empty".into()))?;

        if let Some(node) = nodes.iter().find(|n| n.num_cpus == 0) {
            return Err(RigError::InvalidTopology(format!(
                "node '{}' has zero slots",
                node.name
            )));
        }

        let mut entries = Vec::with_capacity(nodes.len());
        entries.push(TopologyEntry {
            address: COORDINATOR_ADDRESS.to_string(),
            slots: coordinator.num_cpus,
        });

        entries.extend(workers.iter().map(|worker| TopologyEntry {
            address: worker.internal_ip.clone(),
            slots: worker.num_cpus,
        }));

        Self::from_entries(entries)
    }

    /// Accept ready-made entries if they satisfy the topology invariants:
    /// non-empty, `localhost` coordinator first, every width > 0, and no
    /// repeated worker address.
    pub fn from_entries(entries: Vec<TopologyEntry>) -> Result<ClusterTopology> {
        let (coordinator, workers) = entries
            .split_first()
            .ok_or_else(|| RigError::InvalidTopology("no entries".into()))?;
        if coordinator.address != COORDINATOR_ADDRESS {
            return Err(RigError::InvalidTopology(format!(
                "first entry must be {}, got {}",
                COORDINATOR_ADDRESS, coordinator.address
            )));
        }
        if let Some(entry) = entries.iter().find(|e| e.slots == 0) {
            return Err(RigError::InvalidTopology(format!(
                "{} has zero slots",
                entry.address
            )));
        }
        let mut seen = HashSet::new();
        for worker in workers {
            if !seen.insert(worker.address.as_str()) {
                return Err(RigError::InvalidTopology(format!(
                    "duplicate worker address {}",
                    worker.address
                )));
            }
        }
        Ok(ClusterTopology { entries })
    }

    pub fn entries(&self) -> &[TopologyEntry] {
        &self.entries
    }

    /// Number of entries (one per node).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true for a valid topology.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn coordinator(&self) -> &TopologyEntry {
        &self.entries[0]
    }

    pub fn workers(&self) -> &[TopologyEntry] {
        &self.entries[1..]
    }

    /// The machinefile text, one newline-terminated line per entry.
    pub fn render(&self) -> String {
        self.entries.iter().map(|e| format!("{}\n", e)).collect()
    }

    /// Write the machinefile to a fresh local temp file. The file is deleted
    /// when the returned handle is dropped.
    pub fn materialize(&self) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(self.render().as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}
