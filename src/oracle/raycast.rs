//! Grid ray marching.
//!
//! Continuous-distance cell traversal (Amanatides & Woo) over a `MapInfo`
//! grid. Unlike a Bresenham line, every cell the ray touches is visited and
//! each visit reports the distance at which the ray enters and leaves it,
//! which is what range readings and beam attenuation need.
//!
//! ```text
//! start ●──┼────┼────┼──● max_range
//!       t=0  t0   t1   t2
//! ```

use nalgebra::{Point2, Vector2};

use crate::core::MapInfo;

/// One cell crossed by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCell {
    /// Row-major cell index
    pub index: usize,
    /// Distance (cells) at which the ray enters the cell
    pub enter: f64,
    /// Distance (cells) at which the ray leaves the cell
    pub exit: f64,
}

/// Iterator over the cells crossed by a ray, stopping at the grid edge or
/// after `max_range` cells of travel.
pub struct GridRay<'a> {
    info: &'a MapInfo,
    x: i64,
    y: i64,
    step_x: i64,
    step_y: i64,
    t_max_x: f64,
    t_max_y: f64,
    t_delta_x: f64,
    t_delta_y: f64,
    t: f64,
    max_range: f64,
    done: bool,
}

impl<'a> GridRay<'a> {
    /// Ray from continuous grid point `start` at heading `theta` (radians).
    pub fn new(info: &'a MapInfo, start: Point2<f64>, theta: f64, max_range: f64) -> Self {
        Self::along(info, start, Vector2::new(theta.cos(), theta.sin()), max_range)
    }

    /// Ray from `start` along unit vector `dir`.
    pub fn along(info: &'a MapInfo, start: Point2<f64>, dir: Vector2<f64>, max_range: f64) -> Self {
        let x = start.x.floor() as i64;
        let y = start.y.floor() as i64;
        let (step_x, t_max_x, t_delta_x) = axis_setup(start.x, x, dir.x);
        let (step_y, t_max_y, t_delta_y) = axis_setup(start.y, y, dir.y);
        GridRay {
            info,
            x,
            y,
            step_x,
            step_y,
            t_max_x,
            t_max_y,
            t_delta_x,
            t_delta_y,
            t: 0.0,
            max_range,
            done: !start.x.is_finite() || !start.y.is_finite(),
        }
    }
}

fn axis_setup(origin: f64, cell: i64, dir: f64) -> (i64, f64, f64) {
    if dir > 1e-12 {
        (1, (cell as f64 + 1.0 - origin) / dir, 1.0 / dir)
    } else if dir < -1e-12 {
        (-1, (origin - cell as f64) / -dir, -1.0 / dir)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

impl Iterator for GridRay<'_> {
    type Item = RayCell;

    fn next(&mut self) -> Option<RayCell> {
        if self.done || self.t >= self.max_range {
            return None;
        }
        let Some(index) = self.info.index(self.x, self.y) else {
            self.done = true;
            return None;
        };

        let exit = self.t_max_x.min(self.t_max_y).min(self.max_range);
        let cell = RayCell {
            index,
            enter: self.t,
            exit,
        };

        if self.t_max_x < self.t_max_y {
            self.x += self.step_x;
            self.t = self.t_max_x;
            self.t_max_x += self.t_delta_x;
        } else if self.t_max_y.is_finite() {
            self.y += self.step_y;
            self.t = self.t_max_y;
            self.t_max_y += self.t_delta_y;
        } else {
            self.done = true;
        }

        Some(cell)
    }
}

/// Clips the infinite line `p + t * dir` to the grid rectangle, returning the
/// entry and exit parameters when the line crosses it.
pub fn clip_to_grid(info: &MapInfo, p: Point2<f64>, dir: Vector2<f64>) -> Option<(f64, f64)> {
    let mut t0 = f64::NEG_INFINITY;
    let mut t1 = f64::INFINITY;
    for (origin, d, extent) in [
        (p.x, dir.x, info.width as f64),
        (p.y, dir.y, info.height as f64),
    ] {
        if d.abs() < 1e-12 {
            if origin < 0.0 || origin >= extent {
                return None;
            }
            continue;
        }
        let a = (0.0 - origin) / d;
        let b = (extent - origin) / d;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    (t0 < t1).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: usize, height: usize) -> MapInfo {
        MapInfo::new(width, height, 1.0, Point2::origin(), "map").unwrap()
    }

    #[test]
    fn axis_aligned_ray_visits_row() {
        let info = info(5, 3);
        let cells: Vec<usize> = GridRay::new(&info, Point2::new(0.5, 1.5), 0.0, f64::INFINITY)
            .map(|c| c.index)
            .collect();
        assert_eq!(cells, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn distances_are_contiguous() {
        let info = info(8, 8);
        let cells: Vec<RayCell> =
            GridRay::new(&info, Point2::new(0.2, 0.7), 0.6, f64::INFINITY).collect();
        assert!(cells.len() > 3);
        for pair in cells.windows(2) {
            assert!((pair[0].exit - pair[1].enter).abs() < 1e-9);
        }
    }

    #[test]
    fn max_range_truncates() {
        let info = info(10, 1);
        let cells: Vec<RayCell> = GridRay::new(&info, Point2::new(0.5, 0.5), 0.0, 2.0).collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2].exit, 2.0);
    }

    #[test]
    fn start_outside_grid_yields_nothing() {
        let info = info(3, 3);
        assert_eq!(GridRay::new(&info, Point2::new(-1.0, 1.0), 0.0, 10.0).count(), 0);
    }

    #[test]
    fn clip_finds_entry_and_exit() {
        let info = info(4, 2);
        let (t0, t1) = clip_to_grid(&info, Point2::new(-2.0, 1.0), Vector2::new(1.0, 0.0)).unwrap();
        assert!((t0 - 2.0).abs() < 1e-12);
        assert!((t1 - 6.0).abs() < 1e-12);
        assert!(clip_to_grid(&info, Point2::new(-2.0, 5.0), Vector2::new(1.0, 0.0)).is_none());
    }
}
