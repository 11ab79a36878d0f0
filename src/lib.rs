//! mi-explorer - active exploration over occupancy grids
//!
//! Given an occupancy map and a range-sensor model, the explorer repeatedly
//! picks the next viewpoint that maximizes expected information gain about
//! unresolved cells, simulates a scan there, updates its belief and repeats,
//! producing a greedy multi-step exploration trajectory. The crate contains
//! the planning core, a reference mutual information oracle and a ROS 2 node.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Grids, belief and trajectory types
pub mod core;
pub mod navigation;
pub mod oracle;
pub mod ros_interface;
pub mod visualization;

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used items for easier access
pub use crate::core::{
    Belief, Grid, MapInfo, MapStore, MiSurface, OccupancyState, RawMap, Trajectory,
};
pub use navigation::{
    CancelToken, GreedyPlanner, PlannerConfig, PlannerState, PlanningDriver, PlanningStep,
    StepOutcome, SweepController, SweepStrategy,
};
pub use oracle::{InformationOracle, OracleError, RayOracle, RayOracleConfig};
pub use visualization::{VisualizationFrame, VisualizationSink};

/// Main configuration structure, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// What the node does with maps and clicked points
    pub mode: Mode,
    /// ROS 2 node and topic configuration
    pub ros_config: RosConfig,
    /// Planner, sweep and sensor parameters
    pub planning_config: PlanningConfig,
    /// Visualization toggles
    pub visualization_config: VisualizationConfig,
    /// Where to write the trajectory on shutdown, if anywhere
    pub trajectory_log: Option<PathBuf>,
}

/// Node operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Clicked point seeds the greedy exploration loop
    Wander,
    /// Maps produce one MI surface; clicked points condition it
    Surface,
}

/// ROS 2 specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosConfig {
    /// Node name
    pub node_name: String,
    /// QoS history depth
    pub qos_depth: usize,
    /// Incoming occupancy maps
    pub map_topic: String,
    /// Incoming seed / conditioning points
    pub click_topic: String,
    /// Normalized MI grid
    pub mi_topic: String,
    /// Raw MI values
    pub mi_raw_topic: String,
    /// Not-yet-measured grid
    pub p_not_measured_topic: String,
    /// Classification grid
    pub states_topic: String,
    /// Lookahead candidate points
    pub mi_points_topic: String,
    /// Trajectory line strip
    pub trajectory_topic: String,
}

/// Planner and sensor model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Headings per discretized sweep
    pub mi_angular_steps: usize,
    /// Spatial offsets per heading in a discretized sweep
    pub mi_spatial_steps: usize,
    /// Beams of simulated measurement per lookahead pick or click
    pub condition_steps: usize,
    /// Half-width of the unknown dead-band around 0.5
    pub unknown_threshold: f64,
    /// Sensor arrival rate per cell
    pub poisson_rate: f64,
    /// Whether beams reduce uncertainty independently
    pub beam_independence: bool,
    /// Beams per real scan and per continuous sweep
    pub num_beams: usize,
    /// Lookahead picks per planning step
    pub num_points: usize,
    /// Sweep strategy used in wander mode
    pub sweep: SweepStrategy,
}

/// Visualization toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Publish grids and overlays after every step
    pub visualize: bool,
    /// Also publish after every sweep heading
    pub visualize_more: bool,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            mode: Mode::Wander,
            ros_config: RosConfig::default(),
            planning_config: PlanningConfig::default(),
            visualization_config: VisualizationConfig::default(),
            trajectory_log: None,
        }
    }
}

impl Default for RosConfig {
    fn default() -> Self {
        RosConfig {
            node_name: "mi_explorer".to_string(),
            qos_depth: 1,
            map_topic: "/map".to_string(),
            click_topic: "/clicked_point".to_string(),
            mi_topic: "/mi".to_string(),
            mi_raw_topic: "/mi_raw".to_string(),
            p_not_measured_topic: "/p_not_measured".to_string(),
            states_topic: "/map_incomplete".to_string(),
            mi_points_topic: "/mi_points".to_string(),
            trajectory_topic: "/trajectory".to_string(),
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        PlanningConfig {
            mi_angular_steps: 16,
            mi_spatial_steps: 8,
            condition_steps: 50,
            unknown_threshold: 0.1,
            poisson_rate: 4.0,
            beam_independence: true,
            num_beams: 1000,
            num_points: 5,
            sweep: SweepStrategy::Discretized,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        VisualizationConfig {
            visualize: true,
            visualize_more: false,
        }
    }
}

impl ExplorerConfig {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let file = File::open(path.as_ref())?;
        let config: ExplorerConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ExplorerError> {
        let config: ExplorerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects parameter combinations the planner cannot run with.
    pub fn validate(&self) -> Result<(), ExplorerError> {
        let p = &self.planning_config;
        let positive = [
            ("mi_angular_steps", p.mi_angular_steps),
            ("mi_spatial_steps", p.mi_spatial_steps),
            ("condition_steps", p.condition_steps),
            ("num_beams", p.num_beams),
            ("num_points", p.num_points),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ExplorerError::Config(format!("{} must be positive", name)));
        }
        if !(0.0..0.5).contains(&p.unknown_threshold) {
            return Err(ExplorerError::Config(format!(
                "unknown_threshold {} not in [0, 0.5)",
                p.unknown_threshold
            )));
        }
        if !(p.poisson_rate.is_finite() && p.poisson_rate > 0.0) {
            return Err(ExplorerError::Config(format!(
                "poisson_rate {} must be positive",
                p.poisson_rate
            )));
        }
        Ok(())
    }

    /// Planner parameters.
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            num_points: self.planning_config.num_points,
            num_beams: self.planning_config.num_beams,
            condition_steps: self.planning_config.condition_steps,
            debug_sweeps: self.visualization_config.visualize
                && self.visualization_config.visualize_more,
        }
    }

    /// Sweep controller for the configured strategy.
    pub fn sweep_controller(&self) -> SweepController {
        let p = &self.planning_config;
        match p.sweep {
            SweepStrategy::Discretized => {
                SweepController::discretized(p.mi_angular_steps, p.mi_spatial_steps)
            }
            SweepStrategy::Continuous => SweepController::continuous(p.num_beams),
        }
    }

    /// Sensor model of the reference oracle.
    pub fn oracle_config(&self) -> RayOracleConfig {
        RayOracleConfig {
            poisson_rate: self.planning_config.poisson_rate,
            beam_independence: self.planning_config.beam_independence,
        }
    }
}

/// Explorer error types
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// File access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Malformed map
    #[error("Map error: {0}")]
    Map(#[from] MapError),
    /// Oracle rejected a request
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    /// ROS 2 communication failed
    #[error("ROS error: {0}")]
    Ros(String),
    /// Planning requested before any valid map
    #[error("No valid map has been received")]
    NoMap,
}

/// Map validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// Declared dimensions disagree with the data length
    #[error("map declares {expected} cells but carries {actual}")]
    SizeMismatch {
        /// Cells implied by width x height
        expected: usize,
        /// Cells actually present
        actual: usize,
    },
    /// Zero width or height
    #[error("map has no cells")]
    EmptyGrid,
    /// Resolution not a positive finite number
    #[error("invalid map resolution {0}")]
    InvalidResolution(f64),
}
