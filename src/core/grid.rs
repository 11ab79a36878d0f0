// core/grid.rs

// Row-major 2-D grids sharing one spatial frame, plus the occupancy
// classification applied to every incoming map. All derived grids (MI,
// not-yet-measured, classification) carry the same `MapInfo` as the map they
// were built from.

// Dependencies
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::MapError;

/// Spatial metadata shared by a map and every grid derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Metres per cell
    pub resolution: f64,
    /// World position of cell (0, 0)
    pub origin: Point2<f64>,
    /// Frame identifier of the source map
    pub frame_id: String,
}

impl MapInfo {
    /// Creates metadata for a `width` x `height` grid.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f64,
        origin: Point2<f64>,
        frame_id: impl Into<String>,
    ) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::EmptyGrid);
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(MapError::InvalidResolution(resolution));
        }
        Ok(MapInfo {
            width,
            height,
            resolution,
            origin,
            frame_id: frame_id.into(),
        })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True when the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index of integer cell (x, y), if inside the grid.
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Cell (x, y) of a row-major index.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// True when continuous grid point `p` lies inside the grid.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f64 && p.y < self.height as f64
    }

    /// World (map frame) point to continuous grid coordinates.
    pub fn world_to_grid(&self, world: &Point2<f64>) -> Point2<f64> {
        Point2::from((world - self.origin) / self.resolution)
    }

    /// Continuous grid coordinates to world (map frame) point.
    pub fn grid_to_world(&self, grid: &Point2<f64>) -> Point2<f64> {
        self.origin + Vector2::new(grid.x, grid.y) * self.resolution
    }
}

/// Dense row-major grid of `T` with its spatial metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    info: MapInfo,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Wraps `data`, rejecting it when its length disagrees with `info`.
    pub fn new(info: MapInfo, data: Vec<T>) -> Result<Self, MapError> {
        if data.len() != info.len() {
            return Err(MapError::SizeMismatch {
                expected: info.len(),
                actual: data.len(),
            });
        }
        Ok(Grid { info, data })
    }

    /// Grid with every cell set to `value`.
    pub fn filled(info: MapInfo, value: T) -> Self {
        let data = vec![value; info.len()];
        Grid { info, data }
    }

    /// Spatial metadata.
    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    /// Cell values in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Value at integer cell (x, y).
    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        self.info.index(x, y).map(|i| &self.data[i])
    }
}

/// Occupancy classification of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupancyState {
    /// Confidently empty
    Free,
    /// Confidently blocked
    Occupied,
    /// Unmeasured or inside the dead-band
    Unknown,
}

impl OccupancyState {
    /// Probability that a beam passes through a cell in this state.
    pub fn vacancy(self) -> f64 {
        match self {
            OccupancyState::Free => 1.0,
            OccupancyState::Unknown => 0.5,
            OccupancyState::Occupied => 0.0,
        }
    }

    /// Display value on the [0, 100] occupancy scale.
    pub fn display_value(self) -> i8 {
        match self {
            OccupancyState::Free => 0,
            OccupancyState::Unknown => 50,
            OccupancyState::Occupied => 100,
        }
    }
}

/// Classifies one raw occupancy percentage.
///
/// Negative values mean "never measured". Otherwise the value is read as a
/// probability `v / 100` and compared against a symmetric dead-band of
/// `unknown_threshold` around 0.5: strictly below `0.5 - t` is free, strictly
/// above `0.5 + t` is occupied, and the closed band in between is unknown.
pub fn classify(raw: i8, unknown_threshold: f64) -> OccupancyState {
    if raw < 0 {
        return OccupancyState::Unknown;
    }
    let p = raw as f64 / 100.0;
    if p < 0.5 - unknown_threshold {
        OccupancyState::Free
    } else if p > 0.5 + unknown_threshold {
        OccupancyState::Occupied
    } else {
        OccupancyState::Unknown
    }
}

/// Classifies a whole raw map.
pub fn classify_grid(
    info: MapInfo,
    raw: &[i8],
    unknown_threshold: f64,
) -> Result<Grid<OccupancyState>, MapError> {
    if raw.len() != info.len() {
        return Err(MapError::SizeMismatch {
            expected: info.len(),
            actual: raw.len(),
        });
    }
    let data = raw.iter().map(|&v| classify(v, unknown_threshold)).collect();
    Grid::new(info, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: usize, height: usize) -> MapInfo {
        MapInfo::new(width, height, 0.05, Point2::new(-1.0, 2.0), "map").unwrap()
    }

    #[test]
    fn dead_band_boundaries_are_unknown() {
        // 0.5 - 0.1 = 0.4 and 0.5 + 0.1 = 0.6 both sit inside the closed band
        assert_eq!(classify(39, 0.1), OccupancyState::Free);
        assert_eq!(classify(40, 0.1), OccupancyState::Unknown);
        assert_eq!(classify(60, 0.1), OccupancyState::Unknown);
        assert_eq!(classify(61, 0.1), OccupancyState::Occupied);
        assert_eq!(classify(-1, 0.1), OccupancyState::Unknown);
    }

    #[test]
    fn frame_transforms_invert() {
        let info = info(10, 10);
        let world = Point2::new(-0.75, 2.3);
        let grid = info.world_to_grid(&world);
        assert!((grid.x - 5.0).abs() < 1e-9);
        assert!((grid.y - 6.0).abs() < 1e-9);
        let back = info.grid_to_world(&grid);
        assert!((back - world).norm() < 1e-9);
    }

    #[test]
    fn index_rejects_outside_cells() {
        let info = info(4, 3);
        assert_eq!(info.index(3, 2), Some(11));
        assert_eq!(info.index(4, 0), None);
        assert_eq!(info.index(-1, 0), None);
        assert_eq!(info.cell(11), (3, 2));
    }

    #[test]
    fn classify_grid_rejects_wrong_length() {
        let err = classify_grid(info(2, 2), &[0, 0, 0], 0.1).unwrap_err();
        assert_eq!(err, MapError::SizeMismatch { expected: 4, actual: 3 });
    }
}
