//! Mutual information oracle
//!
//! The planner does not compute mutual information itself. It drives an
//! [`InformationOracle`]: a capability that, given an explicit [`Belief`],
//! accumulates per-beam MI contributions into a [`MiSurface`] and produces
//! conditioned beliefs for real or simulated measurements. Conditioning never
//! mutates its input; it returns the next belief, so planners can be tested
//! against deterministic stubs and lookahead state stays explicit.
//!
//! [`RayOracle`] is the bundled implementation. Any other implementation
//! exposing the same operations over a fixed-size grid can be substituted.

mod ray_oracle;
/// Grid cell traversal along rays
pub mod raycast;

pub use ray_oracle::{RayOracle, RayOracleConfig};

use thiserror::Error;

use crate::core::{Belief, MiSurface};

/// Errors raised by an oracle. All of them are recoverable for the planner:
/// the affected lookahead round is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// Query point lies outside the grid
    #[error("point ({x:.2}, {y:.2}) is outside the grid")]
    OutOfBounds {
        /// Grid x coordinate
        x: f64,
        /// Grid y coordinate
        y: f64,
    },
    /// Surface and belief disagree on the number of cells
    #[error("surface has {actual} cells, belief has {expected}")]
    DimensionMismatch {
        /// Cells in the belief
        expected: usize,
        /// Cells in the surface
        actual: usize,
    },
    /// Sample parameters outside their domain
    #[error("invalid sample: {0}")]
    InvalidSample(String),
}

/// Mutual information capability consumed by the sweep controller and the
/// greedy planner.
///
/// Surface resets are not part of the trait: [`MiSurface::reset`] and
/// [`Belief::reset_p_not_measured`] are plain value operations.
#[cfg_attr(test, mockall::automock)]
pub trait InformationOracle {
    /// Adds the contribution of one sample beam at normalized offset
    /// `spatial` in [0, 1) and heading fraction `angular` in [0, 1).
    fn accrue_mi(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        spatial: f64,
        angular: f64,
    ) -> Result<(), OracleError>;

    /// Adds one spatial slice of the beam at heading `theta` with angular
    /// width `dtheta`, advancing `spatial_cursor`. The cursor wraps back to
    /// exactly `0.0` once the full spatial pass at that heading is applied.
    fn compute_mi_beam(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        theta: f64,
        dtheta: f64,
        spatial_cursor: &mut f64,
    ) -> Result<(), OracleError>;

    /// Belief after `steps` beams' worth of simulated measurement from grid
    /// point (x, y).
    fn condition(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        steps: usize,
    ) -> Result<Belief, OracleError>;

    /// Simulated range reading (in cells) of `num_beams` evenly spaced beams
    /// cast from (x, y) through the occupancy classification.
    fn make_scan(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        num_beams: usize,
    ) -> Result<Vec<f64>, OracleError>;

    /// Belief after a real scan taken from (x, y).
    fn apply_scan(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        scan: &[f64],
    ) -> Result<Belief, OracleError>;
}
