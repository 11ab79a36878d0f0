// src/navigation/planner.rs
// Greedy next-best-view planning. Each step commits one viewpoint: measure
// there, run a bounded lookahead of simulated measurements at the best free
// cells, then move to whichever lookahead pick is closest.

use log::{debug, info, warn};
use nalgebra::Point2;

use super::controller::CancelToken;
use super::sweep::{SweepController, SweepOutcome};
use crate::core::{Belief, MiSurface, OccupancyState, PhaseTracker, PlannerPhase, Trajectory};
use crate::oracle::{InformationOracle, OracleError};
use crate::visualization::{VisualizationFrame, VisualizationSink};

/// Lookahead and measurement parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Lookahead picks per step
    pub num_points: usize,
    /// Beams of the real scan taken at each committed viewpoint
    pub num_beams: usize,
    /// Beams of simulated measurement applied at each lookahead pick
    pub condition_steps: usize,
    /// Publish the surface after every sweep heading
    pub debug_sweeps: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            num_points: 5,
            num_beams: 1000,
            condition_steps: 50,
            debug_sweeps: false,
        }
    }
}

/// A lookahead pick: the best free cell of one round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Cell coordinates (x, y) in grid units
    pub position: Point2<f64>,
    /// Row-major cell index
    pub index: usize,
    /// Mutual information at selection time
    pub mi: f64,
}

/// Everything the planner owns between steps.
///
/// Passed into and returned from [`GreedyPlanner::step`] so a single step can
/// be driven and inspected in isolation.
#[derive(Clone, Debug)]
pub struct PlannerState {
    belief: Belief,
    mi: MiSurface,
    position: Option<Point2<f64>>,
    trajectory: Trajectory,
    candidates: Vec<Candidate>,
    phase: PhaseTracker,
}

impl PlannerState {
    /// Idle state over `belief`, waiting for a seed point.
    pub fn new(belief: Belief) -> Self {
        let mi = MiSurface::new(belief.info().len());
        PlannerState {
            belief,
            mi,
            position: None,
            trajectory: Trajectory::new(),
            candidates: Vec::new(),
            phase: PhaseTracker::new(),
        }
    }

    /// Starts (or restarts) planning from grid point `seed`.
    pub fn seeded(mut self, seed: Point2<f64>) -> Result<Self, OracleError> {
        if !(seed.x.is_finite() && seed.y.is_finite() && self.belief.info().contains(&seed)) {
            return Err(OracleError::OutOfBounds {
                x: seed.x,
                y: seed.y,
            });
        }
        self.position = Some(seed);
        self.candidates.clear();
        self.phase.advance(PlannerPhase::Idle);
        Ok(self)
    }

    /// Drops the viewpoint so no further steps run until the next seed.
    pub fn halt(&mut self) {
        self.position = None;
        self.phase.advance(PlannerPhase::Idle);
    }

    /// Idle state over a replacement map's `belief`, keeping the committed
    /// trajectory. The viewpoint is dropped; planning resumes on the next seed.
    pub fn rebased(self, belief: Belief) -> Self {
        let mut next = PlannerState::new(belief);
        next.trajectory = self.trajectory;
        next
    }

    /// Belief the next step starts from.
    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// MI surface of the most recent sweep.
    pub fn mi(&self) -> &MiSurface {
        &self.mi
    }

    /// Current committed viewpoint, if seeded.
    pub fn position(&self) -> Option<Point2<f64>> {
        self.position
    }

    /// Committed viewpoints, oldest first.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Picks of the most recent lookahead.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Phase the planner was last in.
    pub fn phase(&self) -> PlannerPhase {
        self.phase.current()
    }
}

/// Result of one planning step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    /// Moved from `from` to the closest lookahead pick `to`
    Advanced {
        /// Viewpoint the step started at
        from: Point2<f64>,
        /// Newly committed viewpoint
        to: Point2<f64>,
    },
    /// No free cell carried positive information; position unchanged
    NoInformativeTarget {
        /// Viewpoint the step started at
        at: Point2<f64>,
    },
    /// Cancel token was set during the step
    Cancelled,
    /// No seed point yet
    Idle,
}

/// Summary of one planning step.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanningStep {
    /// How the step ended
    pub outcome: StepOutcome,
    /// Lookahead picks, in selection order
    pub candidates: Vec<Candidate>,
    /// Rounds dropped because the oracle failed
    pub skipped_rounds: usize,
    /// Oracle sweep calls made
    pub samples: usize,
}

impl PlanningStep {
    fn new(outcome: StepOutcome) -> Self {
        PlanningStep {
            outcome,
            candidates: Vec::new(),
            skipped_rounds: 0,
            samples: 0,
        }
    }
}

/// Highest-MI free cell, or `None` when no free cell has positive MI.
///
/// Occupied and unknown cells are never targets. Ties go to the first cell in
/// row-major order.
pub fn select_target(belief: &Belief, mi: &MiSurface) -> Option<Candidate> {
    let info = belief.info();
    let mut best: Option<Candidate> = None;
    for (index, (&state, &value)) in belief.states().data().iter().zip(mi.values()).enumerate() {
        if state != OccupancyState::Free {
            continue;
        }
        if value > best.map_or(0.0, |b| b.mi) {
            let (x, y) = info.cell(index);
            best = Some(Candidate {
                position: Point2::new(x as f64, y as f64),
                index,
                mi: value,
            });
        }
    }
    best
}

/// Greedy next-best-view planner over an [`InformationOracle`].
pub struct GreedyPlanner<O> {
    oracle: O,
    sweep: SweepController,
    config: PlannerConfig,
}

impl<O: InformationOracle> GreedyPlanner<O> {
    /// Planner sweeping with `sweep` and querying `oracle`.
    pub fn new(oracle: O, sweep: SweepController, config: PlannerConfig) -> Self {
        GreedyPlanner {
            oracle,
            sweep,
            config,
        }
    }

    /// Oracle the planner queries.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Lookahead parameters.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Whether intermediate sweep surfaces are published.
    pub fn debug_sweeps(&self) -> bool {
        self.config.debug_sweeps
    }

    /// Runs one outer iteration from the state's current viewpoint.
    ///
    /// 1. Append the viewpoint to the trajectory.
    /// 2. Take a real scan there and condition the committed belief on it.
    /// 3. Reset lookahead measurements and candidates.
    /// 4. Up to `num_points` rounds: sweep, pick the best free cell, condition
    ///    the lookahead on it, track the pick closest to the viewpoint.
    /// 5. Commit to the closest pick.
    ///
    /// Oracle failures skip the affected round. `debug` receives the
    /// surface after every sweep heading when `debug_sweeps` is set.
    pub fn step(
        &self,
        mut state: PlannerState,
        cancel: &CancelToken,
        mut debug: Option<&mut dyn VisualizationSink>,
    ) -> (PlannerState, PlanningStep) {
        let Some(start) = state.position else {
            return (state, PlanningStep::new(StepOutcome::Idle));
        };
        if cancel.is_cancelled() {
            state.phase.advance(PlannerPhase::Idle);
            return (state, PlanningStep::new(StepOutcome::Cancelled));
        }

        state.trajectory.push(start);
        let scanned = self
            .oracle
            .make_scan(&state.belief, start.x, start.y, self.config.num_beams)
            .and_then(|scan| self.oracle.apply_scan(&state.belief, start.x, start.y, &scan));
        match scanned {
            Ok(belief) => state.belief = belief,
            Err(e) => warn!("Scan at ({:.1}, {:.1}) failed: {}", start.x, start.y, e),
        }

        state.belief.reset_p_not_measured();
        state.candidates.clear();

        let mut report = PlanningStep::new(StepOutcome::NoInformativeTarget { at: start });
        let mut closest: Option<(f64, Candidate)> = None;
        let mut cancelled = false;

        for round in 0..self.config.num_points {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            state.phase.advance(PlannerPhase::Sweeping);
            let debug_enabled = self.config.debug_sweeps;
            let mut on_angle = |mi: &MiSurface| {
                if !debug_enabled {
                    return;
                }
                if let Some(sink) = debug.as_deref_mut() {
                    let frame = VisualizationFrame::from_parts(
                        &state.belief,
                        mi,
                        &state.candidates,
                        &state.trajectory,
                    );
                    if let Err(e) = sink.publish(&frame) {
                        warn!("Failed to publish sweep progress: {}", e);
                    }
                }
            };
            match self
                .sweep
                .run(&self.oracle, &state.belief, &mut state.mi, cancel, &mut on_angle)
            {
                Ok(SweepOutcome::Complete { samples }) => report.samples += samples,
                Ok(SweepOutcome::Cancelled { samples }) => {
                    report.samples += samples;
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!("Lookahead round {} skipped, sweep failed: {}", round, e);
                    report.skipped_rounds += 1;
                    continue;
                }
            }

            state.phase.advance(PlannerPhase::Selecting);
            let Some(candidate) = select_target(&state.belief, &state.mi) else {
                // Conditioning never adds information, so later rounds cannot do better
                warn!("No informative free cell in lookahead round {}", round);
                break;
            };
            debug!(
                "Round {}: max MI {:.4} at ({}, {})",
                round, candidate.mi, candidate.position.x, candidate.position.y
            );

            state.phase.advance(PlannerPhase::Conditioning);
            match self.oracle.condition(
                &state.belief,
                candidate.position.x,
                candidate.position.y,
                self.config.condition_steps,
            ) {
                Ok(belief) => state.belief = belief,
                Err(e) => {
                    warn!("Lookahead round {} skipped, conditioning failed: {}", round, e);
                    report.skipped_rounds += 1;
                    continue;
                }
            }

            state.candidates.push(candidate);
            let distance = (candidate.position - start).norm();
            if closest.is_none_or(|(best, _)| distance < best) {
                closest = Some((distance, candidate));
            }
        }

        report.candidates = state.candidates.clone();

        if cancelled {
            state.phase.advance(PlannerPhase::Idle);
            report.outcome = StepOutcome::Cancelled;
            return (state, report);
        }

        match closest {
            Some((distance, candidate)) => {
                state.phase.advance(PlannerPhase::Committing);
                state.position = Some(candidate.position);
                info!(
                    "Committed ({:.1}, {:.1}) -> ({}, {}), {:.2} cells away, {} candidates",
                    start.x,
                    start.y,
                    candidate.position.x,
                    candidate.position.y,
                    distance,
                    state.candidates.len()
                );
                report.outcome = StepOutcome::Advanced {
                    from: start,
                    to: candidate.position,
                };
            }
            None => {
                state.phase.advance(PlannerPhase::Idle);
                warn!(
                    "No informative free cell from ({:.1}, {:.1}); {} rounds skipped",
                    start.x, start.y, report.skipped_rounds
                );
            }
        }
        (state, report)
    }
}
