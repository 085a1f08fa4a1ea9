//! Plain data types shared across the rig: nodes, run descriptor, config.

pub mod config;
pub mod node;
