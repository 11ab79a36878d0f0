// core/mod.rs

// Grid, belief and bookkeeping types shared by the oracle, the planner and
// the ROS node.

/// Map metadata, grids and occupancy classification
pub mod grid;
/// Committed trajectory and its persistence
pub mod memory;
/// Belief, MI surface and map acceptance
pub mod perception;
/// Planner phase tracking
pub mod state;

pub use grid::{classify, classify_grid, Grid, MapInfo, OccupancyState};
pub use memory::Trajectory;
pub use perception::{Belief, MapStore, MiSurface, RawMap};
pub use state::{PhaseTracker, PlannerPhase};
