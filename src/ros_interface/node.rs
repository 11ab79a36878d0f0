// src/ros_interface/node.rs
// Single-threaded explorer node. Every loop iteration spins ROS once, applies
// new maps and clicks, then does one unit of planning work, so a new map or
// a shutdown request is noticed between planning steps.

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use nalgebra::Point2;

use super::RosInterface;
use crate::core::{Belief, MapStore, MiSurface, Trajectory};
use crate::navigation::{
    CancelToken, GreedyPlanner, PlannerState, PlanningDriver, StepOutcome, SweepController,
    SweepOutcome,
};
use crate::oracle::{InformationOracle, OracleError, RayOracle};
use crate::visualization::{VisualizationFrame, VisualizationSink};
use crate::{ExplorerConfig, ExplorerError, Mode};

const IDLE_SPIN: Duration = Duration::from_millis(100);

/// ROS node running the explorer in the configured mode.
pub struct ExplorerNode {
    config: ExplorerConfig,
    ros: RosInterface,
    store: MapStore,
    planner: GreedyPlanner<RayOracle>,
    state: Option<PlannerState>,
    surface: Option<Surface>,
    shutdown: CancelToken,
}

/// Surface mode belief and its latest MI surface.
struct Surface {
    belief: Belief,
    mi: MiSurface,
}

impl ExplorerNode {
    /// Creates the node and its ROS interface.
    pub fn new(config: ExplorerConfig, shutdown: CancelToken) -> Result<Self, ExplorerError> {
        config.validate()?;
        let ros = RosInterface::new(&config.ros_config)?;
        let planner = GreedyPlanner::new(
            RayOracle::new(config.oracle_config()),
            config.sweep_controller(),
            config.planner_config(),
        );
        Ok(ExplorerNode {
            store: MapStore::new(config.planning_config.unknown_threshold),
            config,
            ros,
            planner,
            state: None,
            surface: None,
            shutdown,
        })
    }

    /// Runs until the shutdown token is set.
    pub fn run(&mut self) -> Result<(), ExplorerError> {
        info!("Explorer running in {:?} mode", self.config.mode);
        while !self.shutdown.is_cancelled() {
            let timeout = if self.planning() { Duration::ZERO } else { IDLE_SPIN };
            self.ros.spin_once(timeout);
            self.handle_map();
            for click in self.ros.clicks() {
                self.handle_click(click);
            }
            if self.config.mode == Mode::Wander {
                self.plan_once();
            }
        }
        info!(
            "Shutting down after {} published frames",
            self.ros.published_frames()
        );
        self.save_trajectory()
    }

    fn planning(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.position().is_some())
    }

    fn handle_map(&mut self) {
        let Some(received) = self.ros.latest_map() else {
            return;
        };
        let update = received
            .map_err(ExplorerError::from)
            .and_then(|raw| self.store.update(&raw));
        let states = match update {
            Ok(Some(states)) => states,
            Ok(None) => return,
            Err(e) => {
                if self.store.current().is_some() {
                    warn!("Ignoring map update: {}", e);
                } else {
                    error!("Cannot plan without a valid map: {}", e);
                }
                return;
            }
        };

        match self.config.mode {
            Mode::Wander => {
                if self.planning() {
                    info!("New map received, abandoning current exploration");
                }
                let belief = Belief::unexplored(states);
                self.state = Some(match self.state.take() {
                    Some(previous) => previous.rebased(belief),
                    None => PlannerState::new(belief),
                });
            }
            Mode::Surface => {
                let belief = Belief::from_classification(states);
                let mi = MiSurface::new(belief.info().len());
                self.surface = Some(Surface { belief, mi });
                self.refresh_surface();
            }
        }
    }

    fn handle_click(&mut self, world: Point2<f64>) {
        let Some(info) = self.store.current().map(|g| g.info().clone()) else {
            warn!("Ignoring click at ({:.2}, {:.2}): no map yet", world.x, world.y);
            return;
        };
        let cell = info.world_to_grid(&world);
        info!(
            "Click at ({:.2}, {:.2}) -> cell ({:.1}, {:.1})",
            world.x, world.y, cell.x, cell.y
        );

        match self.config.mode {
            Mode::Wander => {
                let Some(state) = self.state.take() else {
                    return;
                };
                let restore = state.clone();
                self.state = Some(match state.seeded(cell) {
                    Ok(seeded) => seeded,
                    Err(e) => {
                        warn!("Rejected seed point: {}", e);
                        restore
                    }
                });
            }
            Mode::Surface => {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                let steps = self.config.planning_config.condition_steps;
                match self.planner.oracle().condition(&surface.belief, cell.x, cell.y, steps) {
                    Ok(belief) => {
                        surface.belief = belief;
                        self.refresh_surface();
                    }
                    Err(e) => warn!("Rejected conditioning point: {}", e),
                }
            }
        }
    }

    /// One planning step in wander mode, if a seed is set.
    fn plan_once(&mut self) {
        if !self.planning() {
            return;
        }
        let Some(state) = self.state.take() else {
            return;
        };
        let driver = PlanningDriver::new(&self.planner, self.shutdown.clone());
        let (mut state, step) = if self.config.visualization_config.visualize {
            driver.tick(state, &mut self.ros)
        } else {
            driver.tick(state, &mut NullSink)
        };
        match step.outcome {
            StepOutcome::Advanced { .. } => {
                debug!(
                    "Step done: {} candidates, {} skipped rounds, {} samples",
                    step.candidates.len(),
                    step.skipped_rounds,
                    step.samples
                );
            }
            StepOutcome::NoInformativeTarget { at } => {
                info!(
                    "Exploration exhausted at ({:.1}, {:.1}) after {} viewpoints",
                    at.x,
                    at.y,
                    state.trajectory().len()
                );
                state.halt();
            }
            StepOutcome::Cancelled | StepOutcome::Idle => {}
        }
        self.state = Some(state);
    }

    /// Recomputes and publishes the surface mode MI.
    fn refresh_surface(&mut self) {
        let ExplorerNode {
            config,
            ros,
            planner,
            surface,
            shutdown,
            ..
        } = self;
        let Some(surface) = surface.as_mut() else {
            return;
        };
        let sweep = SweepController::continuous(config.planning_config.num_beams);
        let visualization = &config.visualization_config;
        let progress: Option<&mut dyn VisualizationSink> =
            if visualization.visualize && visualization.visualize_more {
                Some(&mut *ros)
            } else {
                None
            };

        let started = Instant::now();
        let result = compute_surface(
            planner.oracle(),
            &sweep,
            &surface.belief,
            &mut surface.mi,
            shutdown,
            progress,
        );
        match result {
            Ok(outcome) if outcome.is_complete() => info!(
                "Computed MI surface over {} cells in {:.3}s (max {:.4})",
                surface.mi.len(),
                started.elapsed().as_secs_f64(),
                surface.mi.max()
            ),
            Ok(_) => return,
            Err(e) => {
                error!("MI surface computation failed: {}", e);
                return;
            }
        }

        let frame =
            VisualizationFrame::from_parts(&surface.belief, &surface.mi, &[], &Trajectory::new());
        if let Err(e) = ros.publish_mi_raw(&frame) {
            error!("Failed to publish raw MI: {}", e);
        }
        if visualization.visualize {
            if let Err(e) = ros.publish(&frame) {
                error!("Failed to publish visualization: {}", e);
            }
        }
    }

    fn save_trajectory(&self) -> Result<(), ExplorerError> {
        let (Some(path), Some(state)) = (&self.config.trajectory_log, &self.state) else {
            return Ok(());
        };
        state.trajectory().save(path)
    }
}

/// One continuous sweep over `belief`, publishing the partial surface to
/// `progress` after every beam heading when given.
fn compute_surface<O: InformationOracle + ?Sized>(
    oracle: &O,
    sweep: &SweepController,
    belief: &Belief,
    mi: &mut MiSurface,
    cancel: &CancelToken,
    mut progress: Option<&mut dyn VisualizationSink>,
) -> Result<SweepOutcome, OracleError> {
    let trajectory = Trajectory::new();
    let mut on_angle = |partial: &MiSurface| {
        if let Some(sink) = progress.as_deref_mut() {
            let frame = VisualizationFrame::from_parts(belief, partial, &[], &trajectory);
            if let Err(e) = sink.publish(&frame) {
                warn!("Failed to publish sweep progress: {}", e);
            }
        }
    };
    sweep.run(oracle, belief, mi, cancel, &mut on_angle)
}

/// Sink used when visualization is disabled.
struct NullSink;

impl VisualizationSink for NullSink {
    fn publish(&mut self, _frame: &VisualizationFrame) -> Result<(), ExplorerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{classify_grid, MapInfo};
    use crate::oracle::RayOracleConfig;
    use crate::visualization::MockVisualizationSink;

    fn room() -> Belief {
        #[rustfmt::skip]
        let raw: [i8; 16] = [
            100, 100, 100, 100,
            100,   0,   0,  -1,
            100,   0,   0,  -1,
            100, 100, 100, 100,
        ];
        let info = MapInfo::new(4, 4, 0.1, Point2::origin(), "map").unwrap();
        Belief::from_classification(classify_grid(info, &raw, 0.1).unwrap())
    }

    #[test]
    fn surface_progress_is_published_per_heading() {
        let oracle = RayOracle::new(RayOracleConfig::default());
        let belief = room();
        let mut mi = MiSurface::new(16);
        let mut sink = MockVisualizationSink::new();
        sink.expect_publish()
            .times(8)
            .withf(|frame| frame.info.width == 4 && frame.candidates.is_empty())
            .returning(|_| Ok(()));

        let outcome = compute_surface(
            &oracle,
            &SweepController::continuous(8),
            &belief,
            &mut mi,
            &CancelToken::new(),
            Some(&mut sink),
        )
        .unwrap();

        assert!(outcome.is_complete());
        assert!(mi.max() > 0.0);
    }

    #[test]
    fn surface_without_progress_sink_matches() {
        let oracle = RayOracle::new(RayOracleConfig::default());
        let belief = room();
        let sweep = SweepController::continuous(8);
        let mut quiet = MiSurface::new(16);
        let mut published = MiSurface::new(16);
        let mut sink = MockVisualizationSink::new();
        sink.expect_publish()
            .returning(|_| Err(ExplorerError::Ros("no subscribers".into())));

        compute_surface(&oracle, &sweep, &belief, &mut quiet, &CancelToken::new(), None).unwrap();
        compute_surface(
            &oracle,
            &sweep,
            &belief,
            &mut published,
            &CancelToken::new(),
            Some(&mut sink),
        )
        .unwrap();

        assert_eq!(quiet, published);
    }
}
