// Deterministic oracle stubs shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use mi_explorer::core::classify_grid;
use mi_explorer::{Belief, InformationOracle, MapInfo, MiSurface, OracleError};
use nalgebra::Point2;

/// Square map of free cells with unit resolution at the origin.
pub fn free_belief(size: usize) -> Belief {
    let info = MapInfo::new(size, size, 1.0, Point2::origin(), "map").unwrap();
    let states = classify_grid(info, &vec![0; size * size], 0.1).unwrap();
    Belief::unexplored(states)
}

/// Oracle replaying a fixed MI surface per lookahead round.
///
/// A round starts with every sweep (the `(0, 0)` sample). Rounds past the end
/// of the script produce no information. Scans and conditioning pass the
/// belief through unchanged but are recorded.
#[derive(Default)]
pub struct ScriptedOracle {
    rounds: Vec<Vec<(i64, i64, f64)>>,
    failing_sweeps: Vec<usize>,
    failing_conditions: Vec<usize>,
    sweeps: Cell<usize>,
    pub accrue_calls: Cell<usize>,
    pub beam_calls: Cell<usize>,
    pub conditioned: RefCell<Vec<(f64, f64)>>,
    pub scanned: RefCell<Vec<(f64, f64)>>,
}

impl ScriptedOracle {
    pub fn new(rounds: Vec<Vec<(i64, i64, f64)>>) -> Self {
        ScriptedOracle {
            rounds,
            ..Default::default()
        }
    }

    /// Sweeps of the given rounds fail.
    pub fn failing_sweeps(mut self, rounds: &[usize]) -> Self {
        self.failing_sweeps = rounds.to_vec();
        self
    }

    /// Conditioning fails in the given rounds.
    pub fn failing_conditions(mut self, rounds: &[usize]) -> Self {
        self.failing_conditions = rounds.to_vec();
        self
    }

    fn round(&self) -> usize {
        self.sweeps.get().saturating_sub(1)
    }
}

impl InformationOracle for ScriptedOracle {
    fn accrue_mi(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        spatial: f64,
        angular: f64,
    ) -> Result<(), OracleError> {
        self.accrue_calls.set(self.accrue_calls.get() + 1);
        if spatial == 0.0 && angular == 0.0 {
            self.sweeps.set(self.sweeps.get() + 1);
        }
        let round = self.round();
        if self.failing_sweeps.contains(&round) {
            return Err(OracleError::InvalidSample(format!("scripted failure in round {}", round)));
        }
        if spatial == 0.0 && angular == 0.0 {
            for &(x, y, value) in self.rounds.get(round).into_iter().flatten() {
                if let Some(index) = belief.info().index(x, y) {
                    mi.accrue(index, value);
                }
            }
        }
        Ok(())
    }

    fn compute_mi_beam(
        &self,
        _belief: &Belief,
        mi: &mut MiSurface,
        _theta: f64,
        _dtheta: f64,
        spatial_cursor: &mut f64,
    ) -> Result<(), OracleError> {
        self.beam_calls.set(self.beam_calls.get() + 1);
        mi.accrue(0, 1.0);
        *spatial_cursor += 0.5;
        if *spatial_cursor >= 1.0 {
            *spatial_cursor = 0.0;
        }
        Ok(())
    }

    fn condition(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        _steps: usize,
    ) -> Result<Belief, OracleError> {
        self.conditioned.borrow_mut().push((x, y));
        if self.failing_conditions.contains(&self.round()) {
            return Err(OracleError::OutOfBounds { x, y });
        }
        Ok(belief.clone())
    }

    fn make_scan(
        &self,
        _belief: &Belief,
        x: f64,
        y: f64,
        num_beams: usize,
    ) -> Result<Vec<f64>, OracleError> {
        self.scanned.borrow_mut().push((x, y));
        Ok(vec![1.0; num_beams])
    }

    fn apply_scan(
        &self,
        belief: &Belief,
        _x: f64,
        _y: f64,
        _scan: &[f64],
    ) -> Result<Belief, OracleError> {
        Ok(belief.clone())
    }
}
