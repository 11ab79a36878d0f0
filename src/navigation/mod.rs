//! Exploration planning for mi-explorer
//!
//! This module turns mutual information into motion: the sweep controller
//! fills the MI surface, the greedy planner picks and commits viewpoints, and
//! the driver runs planning steps under cooperative cancellation.

/// Cancellation and the step driver
pub mod controller;
/// Greedy view planner
pub mod planner;
/// MI sweep strategies
pub mod sweep;

pub use controller::{CancelToken, DriverStop, PlanningDriver};
pub use planner::{
    select_target, Candidate, GreedyPlanner, PlannerConfig, PlannerState, PlanningStep, StepOutcome,
};
pub use sweep::{SweepController, SweepOutcome, SweepStrategy};
