// core/memory.rs

// Remembers where the explorer has committed to look. The trajectory is
// append-only for the lifetime of the process and is only ever read for
// display or written out for later inspection.

// Dependencies
use log::info;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::ExplorerError;

/// Ordered committed viewpoints, in grid coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<Point2<f64>>,
}

impl Trajectory {
    /// Empty trajectory.
    pub fn new() -> Self {
        Trajectory { points: Vec::new() }
    }

    /// Appends a committed viewpoint.
    pub fn push(&mut self, point: Point2<f64>) {
        self.points.push(point);
    }

    /// All viewpoints, oldest first.
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    /// Most recent viewpoint.
    pub fn last(&self) -> Option<&Point2<f64>> {
        self.points.last()
    }

    /// Number of viewpoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True before the first commit.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total travelled grid distance along the polyline.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    /// Serializes the trajectory to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExplorerError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        info!("Saved {} trajectory points to {}", self.len(), path.display());
        Ok(())
    }

    /// Loads a trajectory from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let trajectory: Trajectory = serde_yaml::from_reader(file)?;
        info!("Loaded {} trajectory points from {}", trajectory.len(), path.display());
        Ok(trajectory)
    }
}
