// src/navigation/sweep.rs
// Fills the mutual information surface before every selection decision.

use std::f64::consts::TAU;

use log::debug;
use serde::{Deserialize, Serialize};

use super::controller::CancelToken;
use crate::core::{Belief, MiSurface};
use crate::oracle::{InformationOracle, OracleError};

/// How a sweep samples beam directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStrategy {
    /// Fixed angular x spatial grid of `accrue_mi` samples
    Discretized,
    /// Full 0..2pi pass of `num_beams` beams via `compute_mi_beam`
    Continuous,
}

/// How a sweep ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Every sample was applied
    Complete {
        /// Oracle calls made
        samples: usize,
    },
    /// Stopped by the cancel token; the surface was cleared
    Cancelled {
        /// Oracle calls made before stopping
        samples: usize,
    },
}

impl SweepOutcome {
    /// True for a completed sweep.
    pub fn is_complete(&self) -> bool {
        matches!(self, SweepOutcome::Complete { .. })
    }
}

/// Drives an oracle over all beam samples of one sweep.
#[derive(Clone, Debug)]
pub struct SweepController {
    strategy: SweepStrategy,
    angular_steps: usize,
    spatial_steps: usize,
    num_beams: usize,
}

impl SweepController {
    /// Discretized sweep of `angular_steps` x `spatial_steps` samples.
    pub fn discretized(angular_steps: usize, spatial_steps: usize) -> Self {
        SweepController {
            strategy: SweepStrategy::Discretized,
            angular_steps,
            spatial_steps,
            num_beams: 0,
        }
    }

    /// Continuous sweep of `num_beams` beams.
    pub fn continuous(num_beams: usize) -> Self {
        SweepController {
            strategy: SweepStrategy::Continuous,
            angular_steps: 0,
            spatial_steps: 0,
            num_beams,
        }
    }

    /// Sampling strategy of this controller.
    pub fn strategy(&self) -> SweepStrategy {
        self.strategy
    }

    /// Resets `mi` and accumulates one full sweep against `belief`.
    ///
    /// `cancel` is checked before every oracle call. `on_angle` runs after
    /// each completed heading; it only observes. A cancelled or failed sweep
    /// leaves `mi` cleared so no partial surface is ever selected from.
    pub fn run<O: InformationOracle + ?Sized>(
        &self,
        oracle: &O,
        belief: &Belief,
        mi: &mut MiSurface,
        cancel: &CancelToken,
        on_angle: &mut dyn FnMut(&MiSurface),
    ) -> Result<SweepOutcome, OracleError> {
        mi.reset();
        let result = match self.strategy {
            SweepStrategy::Discretized => {
                self.run_discretized(oracle, belief, mi, cancel, on_angle)
            }
            SweepStrategy::Continuous => self.run_continuous(oracle, belief, mi, cancel, on_angle),
        };
        match result {
            Ok(SweepOutcome::Complete { samples }) => {
                debug!("Sweep complete: {} samples, max MI {:.4}", samples, mi.max());
                Ok(SweepOutcome::Complete { samples })
            }
            other => {
                mi.reset();
                other
            }
        }
    }

    fn run_discretized<O: InformationOracle + ?Sized>(
        &self,
        oracle: &O,
        belief: &Belief,
        mi: &mut MiSurface,
        cancel: &CancelToken,
        on_angle: &mut dyn FnMut(&MiSurface),
    ) -> Result<SweepOutcome, OracleError> {
        let mut samples = 0;
        for i in 0..self.angular_steps {
            for j in 0..self.spatial_steps {
                if cancel.is_cancelled() {
                    return Ok(SweepOutcome::Cancelled { samples });
                }
                let spatial = j as f64 / self.spatial_steps as f64;
                let angular = i as f64 / self.angular_steps as f64;
                oracle.accrue_mi(belief, mi, spatial, angular)?;
                samples += 1;
            }
            on_angle(mi);
        }
        Ok(SweepOutcome::Complete { samples })
    }

    fn run_continuous<O: InformationOracle + ?Sized>(
        &self,
        oracle: &O,
        belief: &Belief,
        mi: &mut MiSurface,
        cancel: &CancelToken,
        on_angle: &mut dyn FnMut(&MiSurface),
    ) -> Result<SweepOutcome, OracleError> {
        let mut samples = 0;
        let dtheta = TAU / self.num_beams as f64;
        for beam in 0..self.num_beams {
            let theta = beam as f64 * dtheta;
            let mut cursor = 0.0;
            loop {
                if cancel.is_cancelled() {
                    return Ok(SweepOutcome::Cancelled { samples });
                }
                oracle.compute_mi_beam(belief, mi, theta, dtheta, &mut cursor)?;
                samples += 1;
                // The oracle wraps the cursor to exactly zero after a full pass
                if cursor == 0.0 {
                    break;
                }
            }
            on_angle(mi);
        }
        Ok(SweepOutcome::Complete { samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Grid, MapInfo, OccupancyState};
    use crate::oracle::MockInformationOracle;
    use nalgebra::Point2;

    fn belief() -> Belief {
        let info = MapInfo::new(3, 3, 1.0, Point2::origin(), "map").unwrap();
        Belief::unexplored(Grid::filled(info, OccupancyState::Free))
    }

    #[test]
    fn discretized_order_is_angular_outer() {
        let mut oracle = MockInformationOracle::new();
        let mut seq = mockall::Sequence::new();
        for (s, a) in [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)] {
            oracle
                .expect_accrue_mi()
                .withf(move |_, _, spatial, angular| *spatial == s && *angular == a)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _, _| Ok(()));
        }
        let sweep = SweepController::discretized(2, 2);
        let mut mi = MiSurface::new(9);
        let outcome = sweep
            .run(&oracle, &belief(), &mut mi, &CancelToken::new(), &mut |_| {})
            .unwrap();
        assert_eq!(outcome, SweepOutcome::Complete { samples: 4 });
    }

    #[test]
    fn oracle_failure_clears_surface() {
        let mut oracle = MockInformationOracle::new();
        let mut calls = 0;
        oracle.expect_accrue_mi().returning(move |_, mi, _, _| {
            calls += 1;
            if calls == 3 {
                return Err(OracleError::InvalidSample("boom".into()));
            }
            mi.accrue(0, 1.0);
            Ok(())
        });
        let sweep = SweepController::discretized(2, 2);
        let mut mi = MiSurface::new(9);
        let result = sweep.run(&oracle, &belief(), &mut mi, &CancelToken::new(), &mut |_| {});
        assert!(result.is_err());
        assert_eq!(mi.max(), 0.0);
    }
}
