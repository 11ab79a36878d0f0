// src/navigation/controller.rs
// Runs planning steps one at a time, polling a cancel token in between, and
// hands each settled step to the visualization sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use super::planner::{GreedyPlanner, PlannerState, PlanningStep, StepOutcome};
use crate::oracle::InformationOracle;
use crate::visualization::{VisualizationFrame, VisualizationSink};

/// Cooperative cancellation flag shared by the driver, the planner and
/// sweeps. Signal handlers set the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Underlying flag, for registering signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Why a driver run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverStop {
    /// Cancel token was set
    Cancelled,
    /// No free cell with positive information remains
    Exhausted,
    /// Planner has no seed point
    Idle,
    /// Step limit reached
    StepLimit,
}

/// Consumes planning steps until cancelled, exhausted or out of budget.
pub struct PlanningDriver<'a, O: InformationOracle> {
    planner: &'a GreedyPlanner<O>,
    cancel: CancelToken,
}

impl<'a, O: InformationOracle> PlanningDriver<'a, O> {
    /// Driver stepping `planner` until `cancel` is set.
    pub fn new(planner: &'a GreedyPlanner<O>, cancel: CancelToken) -> Self {
        PlanningDriver { planner, cancel }
    }

    /// Runs one step and publishes the resulting snapshot.
    pub fn tick(
        &self,
        state: PlannerState,
        sink: &mut dyn VisualizationSink,
    ) -> (PlannerState, PlanningStep) {
        let (state, step) = if self.planner.debug_sweeps() {
            self.planner.step(state, &self.cancel, Some(&mut *sink))
        } else {
            self.planner.step(state, &self.cancel, None)
        };
        // Only settled steps are published; a cancelled sweep has already cleared its surface
        if let Err(e) = sink.publish(&VisualizationFrame::from_state(&state)) {
            error!("Failed to publish visualization: {}", e);
        }
        (state, step)
    }

    /// Runs steps until something stops the loop. `max_steps = None` runs
    /// until cancellation or exhaustion.
    pub fn run(
        &self,
        mut state: PlannerState,
        sink: &mut dyn VisualizationSink,
        max_steps: Option<usize>,
    ) -> (PlannerState, DriverStop) {
        let mut steps = 0;
        loop {
            if self.cancel.is_cancelled() {
                return (state, DriverStop::Cancelled);
            }
            if max_steps.is_some_and(|max| steps >= max) {
                return (state, DriverStop::StepLimit);
            }
            let (next, step) = self.tick(state, sink);
            state = next;
            steps += 1;
            match step.outcome {
                StepOutcome::Advanced { .. } => {}
                StepOutcome::Cancelled => return (state, DriverStop::Cancelled),
                StepOutcome::Idle => return (state, DriverStop::Idle),
                StepOutcome::NoInformativeTarget { at } => {
                    info!("Exploration exhausted at ({:.1}, {:.1})", at.x, at.y);
                    return (state, DriverStop::Exhausted);
                }
            }
        }
    }
}
