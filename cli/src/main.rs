//! hpcg-rig CLI — run controller for multi-node HPCG.
//!
//! # Usage
//!
//! ```text
//! hpcg-rig run --config cluster.yaml
//! hpcg-rig plan --config cluster.yaml
//! hpcg-rig machinefile --config cluster.yaml
//! hpcg-rig parse --input HPCG-Benchmark-2.4_2014.06.04.yaml --nodes 4
//! ```

mod cli;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.run() {
        eprintln!("hpcg-rig: {:#}", e);
        process::exit(1);
    }
}
