//! Display encodings
//!
//! Maps internal surfaces onto the [0, 100] occupancy display scale used by
//! map viewers, and collects the overlays published after every planning
//! step. Every grid in a [`VisualizationFrame`] shares the frame's single
//! [`MapInfo`], so they always line up with the source map.

use nalgebra::Point2;

use crate::core::{Belief, Grid, MapInfo, MiSurface, OccupancyState, Trajectory};
use crate::navigation::{Candidate, PlannerState};
use crate::ExplorerError;

/// Display value used for every cell of an all-zero MI surface. It is the
/// same value a zero-MI cell gets on a non-degenerate surface.
pub const NEUTRAL_MI: i8 = 100;

/// MI normalized by the surface maximum and inverted: the most informative
/// cell reads 0, cells without information read 100.
pub fn encode_mi(mi: &MiSurface) -> Vec<i8> {
    let max = mi.max();
    if !(max > 0.0 && max.is_finite()) {
        return vec![NEUTRAL_MI; mi.len()];
    }
    mi.values()
        .iter()
        .map(|&v| to_display(1.0 - v / max))
        .collect()
}

/// Not-yet-measured probability inverted onto [0, 100]: unmeasured reads 0.
pub fn encode_p_not_measured(p_not_measured: &[f64]) -> Vec<i8> {
    p_not_measured.iter().map(|&p| to_display(1.0 - p)).collect()
}

/// Classification as free 0, unknown 50, occupied 100.
pub fn encode_states(states: &Grid<OccupancyState>) -> Vec<i8> {
    states.data().iter().map(|s| s.display_value()).collect()
}

fn to_display(fraction: f64) -> i8 {
    (100.0 * fraction).round().clamp(0.0, 100.0) as i8
}

/// One consistent snapshot of everything the node displays.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualizationFrame {
    /// Metadata shared by every grid below
    pub info: MapInfo,
    /// Normalized MI surface
    pub mi: Vec<i8>,
    /// Raw MI values
    pub mi_raw: Vec<f64>,
    /// Not-yet-measured surface
    pub p_not_measured: Vec<i8>,
    /// Occupancy classification
    pub states: Vec<i8>,
    /// Current lookahead picks, world frame
    pub candidates: Vec<Point2<f64>>,
    /// Committed viewpoints, world frame
    pub trajectory: Vec<Point2<f64>>,
}

impl VisualizationFrame {
    /// Snapshot of loose parts; used for mid-sweep progress.
    pub fn from_parts(
        belief: &Belief,
        mi: &MiSurface,
        candidates: &[Candidate],
        trajectory: &Trajectory,
    ) -> Self {
        let info = belief.info().clone();
        let candidates = candidates
            .iter()
            .map(|c| info.grid_to_world(&c.position))
            .collect();
        let trajectory = trajectory
            .points()
            .iter()
            .map(|p| info.grid_to_world(p))
            .collect();
        VisualizationFrame {
            mi: encode_mi(mi),
            mi_raw: mi.values().to_vec(),
            p_not_measured: encode_p_not_measured(belief.p_not_measured()),
            states: encode_states(belief.states()),
            candidates,
            trajectory,
            info,
        }
    }

    /// Snapshot of a settled planner state.
    pub fn from_state(state: &PlannerState) -> Self {
        Self::from_parts(
            state.belief(),
            state.mi(),
            state.candidates(),
            state.trajectory(),
        )
    }
}

/// Destination for visualization frames (ROS publishers, recorders).
#[cfg_attr(test, mockall::automock)]
pub trait VisualizationSink {
    /// Emits one frame; a failure leaves the planner unaffected.
    fn publish(&mut self, frame: &VisualizationFrame) -> Result<(), ExplorerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn maximum_maps_to_zero() {
        let mut mi = MiSurface::new(3);
        mi.accrue(0, 2.0);
        mi.accrue(1, 1.0);
        assert_eq!(encode_mi(&mi), vec![0, 50, 100]);
    }

    #[test]
    fn all_zero_surface_is_neutral() {
        assert_eq!(encode_mi(&MiSurface::new(4)), vec![NEUTRAL_MI; 4]);
    }

    #[test]
    fn p_not_measured_is_inverted() {
        assert_eq!(encode_p_not_measured(&[1.0, 0.25, 0.0]), vec![0, 75, 100]);
    }

    #[test]
    fn overlays_use_world_frame() {
        let info = MapInfo::new(4, 4, 0.5, Point2::new(10.0, -2.0), "map").unwrap();
        let belief = Belief::unexplored(Grid::filled(info, OccupancyState::Free));
        let mut trajectory = Trajectory::new();
        trajectory.push(Point2::new(2.0, 4.0));
        let frame = VisualizationFrame::from_parts(&belief, &MiSurface::new(16), &[], &trajectory);
        assert_eq!(frame.trajectory, vec![Point2::new(11.0, 0.0)]);
        assert_eq!(frame.states, vec![0; 16]);
        assert_eq!(frame.info.frame_id, "map");
    }
}
