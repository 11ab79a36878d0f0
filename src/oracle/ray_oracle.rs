//! Reference oracle built on grid ray marching.
//!
//! Beams pass a cell with the belief's vacancy (0.5 while unresolved, the
//! classification's 1 / 0.5 / 0 once observed). The information a beam can
//! gain from a cell is ln 2 scaled by the probability the cell is still
//! unresolved, by the probability the current lookahead has not measured it
//! yet, and by the sensor hit probability `1 - exp(-poisson_rate)`. The MI of
//! a viewpoint along a beam is the vacancy-attenuated sum of what lies ahead.
//!
//! Lookahead conditioning lowers `p_not_measured`; real scans lower
//! `p_unobserved`.

use std::f64::consts::{LN_2, TAU};

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use super::raycast::{clip_to_grid, GridRay};
use super::{InformationOracle, OracleError};
use crate::core::{Belief, MiSurface, OccupancyState};

const MIN_REACH: f64 = 1e-6;
const EDGE_NUDGE: f64 = 1e-9;

/// Sensor model parameters of the reference oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayOracleConfig {
    /// Expected returns per cell crossed; sets the hit probability
    pub poisson_rate: f64,
    /// When true every beam reduces not-yet-measured probability on its own;
    /// when false only the strongest beam through a cell counts per measurement
    pub beam_independence: bool,
}

impl Default for RayOracleConfig {
    fn default() -> Self {
        RayOracleConfig {
            poisson_rate: 4.0,
            beam_independence: true,
        }
    }
}

/// Ray-marching [`InformationOracle`].
#[derive(Clone, Debug)]
pub struct RayOracle {
    config: RayOracleConfig,
    hit_probability: f64,
}

impl RayOracle {
    /// Oracle with the given sensor model.
    pub fn new(config: RayOracleConfig) -> Self {
        let hit_probability = 1.0 - (-config.poisson_rate.max(0.0)).exp();
        RayOracle {
            config,
            hit_probability,
        }
    }

    /// Probability a beam crossing a cell registers it.
    pub fn hit_probability(&self) -> f64 {
        self.hit_probability
    }

    fn cell_gain(&self, belief: &Belief, index: usize) -> f64 {
        self.hit_probability * belief.p_not_measured()[index] * belief.p_unobserved()[index] * LN_2
    }

    fn check_surface(belief: &Belief, mi: &MiSurface) -> Result<(), OracleError> {
        if mi.len() != belief.info().len() {
            return Err(OracleError::DimensionMismatch {
                expected: belief.info().len(),
                actual: mi.len(),
            });
        }
        Ok(())
    }

    fn check_point(belief: &Belief, x: f64, y: f64) -> Result<Point2<f64>, OracleError> {
        let p = Point2::new(x, y);
        if !(x.is_finite() && y.is_finite() && belief.info().contains(&p)) {
            return Err(OracleError::OutOfBounds { x, y });
        }
        Ok(p)
    }

    fn check_fraction(name: &str, value: f64) -> Result<(), OracleError> {
        if !(0.0..1.0).contains(&value) {
            return Err(OracleError::InvalidSample(format!(
                "{} fraction {} not in [0, 1)",
                name, value
            )));
        }
        Ok(())
    }

    /// Accrues parallel lines at heading `theta`, spaced one cell apart and
    /// shifted by `offset` cells across the beam.
    fn accrue_lines(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        theta: f64,
        offset: f64,
        weight: f64,
    ) {
        let info = belief.info();
        let (w, h) = (info.width as f64, info.height as f64);
        let dir = Vector2::new(theta.cos(), theta.sin());
        let normal = Vector2::new(-dir.y, dir.x);

        let (lo, hi) = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .iter()
            .map(|&(x, y)| normal.dot(&Vector2::new(x, y)))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));

        let center = Point2::new(w / 2.0, h / 2.0);
        let center_offset = normal.dot(&center.coords);

        let mut o = lo.floor() + offset;
        while o < hi {
            let p = center + normal * (o - center_offset);
            if let Some((t0, t1)) = clip_to_grid(info, p, dir) {
                let start = p + dir * (t0 + EDGE_NUDGE);
                self.accrue_line(belief, mi, start, dir, t1 - t0 - EDGE_NUDGE, weight);
            }
            o += 1.0;
        }
    }

    fn accrue_line(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        start: Point2<f64>,
        dir: Vector2<f64>,
        length: f64,
        weight: f64,
    ) {
        let cells: Vec<usize> = GridRay::along(belief.info(), start, dir, length)
            .map(|c| c.index)
            .collect();

        // Walk backwards so each cell sees the attenuated gain of everything ahead
        let mut ahead = 0.0;
        for &index in cells.iter().rev() {
            mi.accrue(index, weight * ahead);
            ahead = self.cell_gain(belief, index) + belief.vacancy(index) * ahead;
        }
    }

    /// Lowers `surface` for one measurement made of `beams` (heading, max
    /// range) from `start`. With `attenuate` the beam weakens through the
    /// believed vacancy; without it the beam is known to have travelled its
    /// full range.
    fn measure(
        &self,
        belief: &Belief,
        surface: &[f64],
        start: Point2<f64>,
        beams: impl Iterator<Item = (f64, f64)>,
        attenuate: bool,
    ) -> Vec<f64> {
        let info = belief.info();
        let mut remaining = surface.to_vec();
        let mut strongest = vec![0.0; remaining.len()];

        for (theta, range) in beams {
            let mut reach = 1.0;
            for cell in GridRay::new(info, start, theta, range) {
                let p_hit = reach * self.hit_probability;
                if self.config.beam_independence {
                    remaining[cell.index] *= 1.0 - p_hit;
                } else {
                    strongest[cell.index] = f64::max(strongest[cell.index], p_hit);
                }
                if attenuate {
                    reach *= belief.vacancy(cell.index);
                    if reach < MIN_REACH {
                        break;
                    }
                }
            }
        }

        if !self.config.beam_independence {
            for (p, hit) in remaining.iter_mut().zip(&strongest) {
                *p *= 1.0 - hit;
            }
        }
        remaining
    }

    fn rebuild(
        belief: &Belief,
        p_unobserved: Vec<f64>,
        p_not_measured: Vec<f64>,
    ) -> Result<Belief, OracleError> {
        Belief::from_parts(belief.states().clone(), p_unobserved, p_not_measured).map_err(|_| {
            OracleError::DimensionMismatch {
                expected: belief.info().len(),
                actual: belief.p_not_measured().len(),
            }
        })
    }
}

impl InformationOracle for RayOracle {
    fn accrue_mi(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        spatial: f64,
        angular: f64,
    ) -> Result<(), OracleError> {
        Self::check_surface(belief, mi)?;
        Self::check_fraction("spatial", spatial)?;
        Self::check_fraction("angular", angular)?;
        self.accrue_lines(belief, mi, TAU * angular, spatial, 1.0);
        Ok(())
    }

    fn compute_mi_beam(
        &self,
        belief: &Belief,
        mi: &mut MiSurface,
        theta: f64,
        dtheta: f64,
        spatial_cursor: &mut f64,
    ) -> Result<(), OracleError> {
        Self::check_surface(belief, mi)?;
        Self::check_fraction("spatial", *spatial_cursor)?;
        if !(dtheta.is_finite() && dtheta > 0.0) {
            return Err(OracleError::InvalidSample(format!("beam width {}", dtheta)));
        }

        // Far cells of a wide beam need finer spatial sampling to be covered
        let info = belief.info();
        let diagonal = (info.width as f64).hypot(info.height as f64);
        let slices = (dtheta * diagonal).ceil().max(1.0);
        let step = 1.0 / slices;

        self.accrue_lines(belief, mi, theta, *spatial_cursor, step);

        let next = *spatial_cursor + step;
        *spatial_cursor = if next >= 1.0 - EDGE_NUDGE { 0.0 } else { next };
        Ok(())
    }

    fn condition(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        steps: usize,
    ) -> Result<Belief, OracleError> {
        let start = Self::check_point(belief, x, y)?;
        if steps == 0 {
            return Err(OracleError::InvalidSample("zero conditioning steps".to_string()));
        }
        let beams = (0..steps).map(|i| (TAU * i as f64 / steps as f64, f64::INFINITY));
        let p_not_measured = self.measure(belief, belief.p_not_measured(), start, beams, true);
        Self::rebuild(belief, belief.p_unobserved().to_vec(), p_not_measured)
    }

    fn make_scan(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        num_beams: usize,
    ) -> Result<Vec<f64>, OracleError> {
        let start = Self::check_point(belief, x, y)?;
        if num_beams == 0 {
            return Err(OracleError::InvalidSample("zero scan beams".to_string()));
        }
        let states = belief.states().data();
        let scan = (0..num_beams)
            .map(|i| {
                let theta = TAU * i as f64 / num_beams as f64;
                let mut range = 0.0;
                for cell in GridRay::new(belief.info(), start, theta, f64::INFINITY) {
                    if states[cell.index] == OccupancyState::Occupied {
                        return cell.enter;
                    }
                    range = cell.exit;
                }
                range
            })
            .collect();
        Ok(scan)
    }

    fn apply_scan(
        &self,
        belief: &Belief,
        x: f64,
        y: f64,
        scan: &[f64],
    ) -> Result<Belief, OracleError> {
        let start = Self::check_point(belief, x, y)?;
        if let Some(bad) = scan.iter().find(|r| !(r.is_finite() && **r >= 0.0)) {
            return Err(OracleError::InvalidSample(format!("scan range {}", bad)));
        }
        let n = scan.len() as f64;
        // The small margin keeps the cell that stopped the beam
        let beams = scan
            .iter()
            .enumerate()
            .map(|(i, &r)| (TAU * i as f64 / n, r + 1e-6));
        let p_unobserved = self.measure(belief, belief.p_unobserved(), start, beams, false);
        Self::rebuild(belief, p_unobserved, belief.p_not_measured().to_vec())
    }
}
