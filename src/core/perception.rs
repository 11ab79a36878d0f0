// core/perception.rs

// Turns incoming occupancy maps into the belief the planner reasons over:
// the per-cell classification, the probability each cell has not yet been
// measured, and the mutual information surface accumulated by sweeps. A new
// map replaces everything; there is no incremental merge.

// Dependencies
use log::{info, warn};

use super::grid::{classify_grid, Grid, MapInfo, OccupancyState};
use crate::{ExplorerError, MapError};

/// Planner belief over one map.
///
/// * `states`: occupancy classification of the map, never changed by
///   measurements.
/// * `p_unobserved`: probability a cell is still unresolved by committed
///   (real) scans. Only real scans lower it.
/// * `p_not_measured`: the same quantity for simulated lookahead
///   measurements. Lowered by lookahead conditioning and reset to 1 at the
///   start of every lookahead.
///
/// Conditioning never mutates a `Belief` in place; oracles build a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Belief {
    states: Grid<OccupancyState>,
    p_unobserved: Vec<f64>,
    p_not_measured: Vec<f64>,
}

impl Belief {
    /// Belief of an explorer that has seen nothing of `states` yet.
    pub fn unexplored(states: Grid<OccupancyState>) -> Self {
        let len = states.info().len();
        Belief {
            states,
            p_unobserved: vec![1.0; len],
            p_not_measured: vec![1.0; len],
        }
    }

    /// Belief that trusts the map: only its unknown cells are unresolved.
    pub fn from_classification(states: Grid<OccupancyState>) -> Self {
        let p_unobserved = states
            .data()
            .iter()
            .map(|&s| if s == OccupancyState::Unknown { 1.0 } else { 0.0 })
            .collect();
        let p_not_measured = vec![1.0; states.info().len()];
        Belief {
            states,
            p_unobserved,
            p_not_measured,
        }
    }

    /// Belief from explicit surfaces.
    pub fn from_parts(
        states: Grid<OccupancyState>,
        p_unobserved: Vec<f64>,
        p_not_measured: Vec<f64>,
    ) -> Result<Self, MapError> {
        let expected = states.info().len();
        for actual in [p_unobserved.len(), p_not_measured.len()] {
            if actual != expected {
                return Err(MapError::SizeMismatch { expected, actual });
            }
        }
        Ok(Belief {
            states,
            p_unobserved,
            p_not_measured,
        })
    }

    /// Spatial metadata.
    pub fn info(&self) -> &MapInfo {
        self.states.info()
    }

    /// Occupancy classification surface.
    pub fn states(&self) -> &Grid<OccupancyState> {
        &self.states
    }

    /// Probability each cell is unresolved by committed scans, in [0, 1].
    pub fn p_unobserved(&self) -> &[f64] {
        &self.p_unobserved
    }

    /// Not-yet-measured probability per cell for the current lookahead, in [0, 1].
    pub fn p_not_measured(&self) -> &[f64] {
        &self.p_not_measured
    }

    /// Probability a beam passes cell `index` as the explorer currently
    /// believes: 0.5 while unresolved, the classification's vacancy once seen.
    pub fn vacancy(&self, index: usize) -> f64 {
        let unobserved = self.p_unobserved[index];
        unobserved * 0.5 + (1.0 - unobserved) * self.states.data()[index].vacancy()
    }

    /// Marks every cell unmeasured again for a new lookahead, leaving the
    /// classification and committed observations alone.
    pub fn reset_p_not_measured(&mut self) {
        self.p_not_measured.iter_mut().for_each(|p| *p = 1.0);
    }
}

/// Mutual information surface, accumulated across the samples of one sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct MiSurface {
    values: Vec<f64>,
}

impl MiSurface {
    /// All-zero surface with `len` cells.
    pub fn new(len: usize) -> Self {
        MiSurface {
            values: vec![0.0; len],
        }
    }

    /// Zeroes every cell.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Adds a non-negative contribution to one cell.
    ///
    /// Negative or non-finite contributions are dropped so the surface never
    /// decreases within a sweep. An index outside the surface is an oracle
    /// bug: it panics in debug builds and is logged and ignored otherwise.
    pub fn accrue(&mut self, index: usize, contribution: f64) {
        let len = self.values.len();
        debug_assert!(index < len, "MI cell {} outside surface of {} cells", index, len);
        if !(contribution > 0.0 && contribution.is_finite()) {
            return;
        }
        match self.values.get_mut(index) {
            Some(v) => *v += contribution,
            None => warn!("Dropped MI for cell {} outside surface of {} cells", index, len),
        }
    }

    /// Cell values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the surface has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value, or 0 for an empty surface.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Raw map as received: metadata plus percentages in [-1, 100].
#[derive(Clone, Debug)]
pub struct RawMap {
    /// Spatial metadata of the map
    pub info: MapInfo,
    /// Row-major occupancy percentages, negative for unmeasured
    pub data: Vec<i8>,
}

/// Holds the last accepted map and rejects malformed replacements.
pub struct MapStore {
    unknown_threshold: f64,
    current: Option<Grid<OccupancyState>>,
    accepted: u64,
    rejected: u64,
}

impl MapStore {
    /// Empty store; no planning is possible until a map is accepted.
    pub fn new(unknown_threshold: f64) -> Self {
        MapStore {
            unknown_threshold,
            current: None,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Classifies and accepts `map`, returning its classification.
    ///
    /// A malformed map is rejected. When an earlier map exists it stays
    /// active and the rejection is only logged; with no map at all the
    /// rejection is reported as an error since the planner cannot run.
    pub fn update(&mut self, map: &RawMap) -> Result<Option<Grid<OccupancyState>>, ExplorerError> {
        match classify_grid(map.info.clone(), &map.data, self.unknown_threshold) {
            Ok(states) => {
                self.accepted += 1;
                info!(
                    "Accepted {}x{} map in frame '{}' (resolution {:.3})",
                    map.info.width, map.info.height, map.info.frame_id, map.info.resolution
                );
                self.current = Some(states.clone());
                Ok(Some(states))
            }
            Err(e) => {
                self.rejected += 1;
                if self.current.is_some() {
                    warn!("Rejected map update, keeping previous map: {}", e);
                    Ok(None)
                } else {
                    Err(ExplorerError::Map(e))
                }
            }
        }
    }

    /// Currently active classification, if any map was accepted.
    pub fn current(&self) -> Option<&Grid<OccupancyState>> {
        self.current.as_ref()
    }

    /// Active classification, or `NoMap` before the first accepted map.
    pub fn require(&self) -> Result<&Grid<OccupancyState>, ExplorerError> {
        self.current.as_ref().ok_or(ExplorerError::NoMap)
    }

    /// (accepted, rejected) map counts.
    pub fn counts(&self) -> (u64, u64) {
        (self.accepted, self.rejected)
    }
}
