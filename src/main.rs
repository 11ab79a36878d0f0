// src/main.rs
// Entry point for the explorer node: loads configuration, wires shutdown
// signals to the cancel token and runs the ROS loop until interrupted.

use std::error::Error;

use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};

use mi_explorer::ros_interface::ExplorerNode;
use mi_explorer::{CancelToken, ExplorerConfig};

/// Usage: `mi_explorer [config.yaml]`. Defaults apply without a file.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    info!("Starting MI explorer...");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            ExplorerConfig::load(&path)?
        }
        None => {
            info!("No configuration file given, using defaults");
            ExplorerConfig::default()
        }
    };

    // Ctrl+C stops a sweep mid-way as well as the node loop
    let shutdown = CancelToken::new();
    signal_hook::flag::register(SIGINT, shutdown.flag())?;
    signal_hook::flag::register(SIGTERM, shutdown.flag())?;

    let mut node = ExplorerNode::new(config, shutdown)?;
    if let Err(e) = node.run() {
        error!("Explorer stopped with error: {}", e);
        return Err(e.into());
    }

    info!("MI explorer shut down cleanly");
    Ok(())
}
