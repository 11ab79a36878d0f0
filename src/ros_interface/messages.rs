// src/ros_interface/messages.rs
// Conversions between ROS 2 messages and explorer types. Kept free of node
// state so they can be checked without a running ROS graph.

use nalgebra::Point2;
use r2r::builtin_interfaces::msg::Time;
use r2r::geometry_msgs::msg::{Point, Point32, PointStamped, Pose, Quaternion, Vector3};
use r2r::nav_msgs::msg::{MapMetaData, OccupancyGrid};
use r2r::sensor_msgs::msg::PointCloud;
use r2r::std_msgs::msg::{
    ColorRGBA, Float64MultiArray, Header, MultiArrayDimension, MultiArrayLayout,
};
use r2r::visualization_msgs::msg::Marker;

use crate::core::{MapInfo, RawMap};
use crate::MapError;

/// Trajectory line width in cells.
pub const TRAJECTORY_WIDTH_CELLS: f64 = 3.0;

/// Reads metadata and cells of an incoming map.
///
/// Only the origin position is used; maps are assumed axis aligned.
pub fn raw_map_from_msg(msg: &OccupancyGrid) -> Result<RawMap, MapError> {
    let origin = &msg.info.origin.position;
    let info = MapInfo::new(
        msg.info.width as usize,
        msg.info.height as usize,
        msg.info.resolution as f64,
        Point2::new(origin.x, origin.y),
        msg.header.frame_id.clone(),
    )?;
    Ok(RawMap {
        info,
        data: msg.data.clone(),
    })
}

/// Clicked point in the world frame.
pub fn click_from_msg(msg: &PointStamped) -> Point2<f64> {
    Point2::new(msg.point.x, msg.point.y)
}

fn header(info: &MapInfo, stamp: &Time) -> Header {
    Header {
        stamp: stamp.clone(),
        frame_id: info.frame_id.clone(),
    }
}

fn identity_pose(position: Point) -> Pose {
    Pose {
        position,
        orientation: Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        },
    }
}

/// Occupancy grid sharing the source map's metadata.
pub fn grid_msg(info: &MapInfo, data: Vec<i8>, stamp: &Time) -> OccupancyGrid {
    OccupancyGrid {
        header: header(info, stamp),
        info: MapMetaData {
            map_load_time: stamp.clone(),
            resolution: info.resolution as f32,
            width: info.width as u32,
            height: info.height as u32,
            origin: identity_pose(Point {
                x: info.origin.x,
                y: info.origin.y,
                z: 0.0,
            }),
        },
        data,
    }
}

/// Raw MI values as a height x width array.
pub fn mi_raw_msg(info: &MapInfo, values: &[f64]) -> Float64MultiArray {
    Float64MultiArray {
        layout: MultiArrayLayout {
            dim: vec![
                MultiArrayDimension {
                    label: "height".to_string(),
                    size: info.height as u32,
                    stride: (info.width * info.height) as u32,
                },
                MultiArrayDimension {
                    label: "width".to_string(),
                    size: info.width as u32,
                    stride: info.width as u32,
                },
            ],
            data_offset: 0,
        },
        data: values.to_vec(),
    }
}

/// Lookahead picks as a point cloud, world frame.
pub fn candidates_msg(info: &MapInfo, points: &[Point2<f64>], stamp: &Time) -> PointCloud {
    PointCloud {
        header: header(info, stamp),
        points: points
            .iter()
            .map(|p| Point32 {
                x: p.x as f32,
                y: p.y as f32,
                z: 0.0,
            })
            .collect(),
        channels: Vec::new(),
    }
}

/// Committed trajectory as a blue line strip, world frame.
pub fn trajectory_msg(info: &MapInfo, points: &[Point2<f64>], stamp: &Time) -> Marker {
    Marker {
        header: header(info, stamp),
        ns: "trajectory".to_string(),
        id: 0,
        type_: Marker::LINE_STRIP as i32,
        action: Marker::ADD as i32,
        pose: identity_pose(Point::default()),
        scale: Vector3 {
            x: TRAJECTORY_WIDTH_CELLS * info.resolution,
            y: 0.0,
            z: 0.0,
        },
        color: ColorRGBA {
            r: 0.0,
            g: 0.0,
            b: 1.0,
            a: 1.0,
        },
        points: points
            .iter()
            .map(|p| Point {
                x: p.x,
                y: p.y,
                z: 0.0,
            })
            .collect(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> MapInfo {
        MapInfo::new(4, 2, 0.5, Point2::new(-1.0, 2.0), "map").unwrap()
    }

    #[test]
    fn incoming_map_keeps_metadata() {
        let mut msg = OccupancyGrid::default();
        msg.header.frame_id = "map".to_string();
        msg.info.width = 4;
        msg.info.height = 2;
        msg.info.resolution = 0.5;
        msg.info.origin.position.x = -1.0;
        msg.info.origin.position.y = 2.0;
        msg.data = vec![0, 100, -1, 50, 0, 0, 0, 0];

        let raw = raw_map_from_msg(&msg).unwrap();
        assert_eq!(raw.info, info());
        assert_eq!(raw.data[2], -1);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut msg = OccupancyGrid::default();
        msg.info.width = 2;
        msg.info.height = 2;
        msg.data = vec![0; 4];
        assert!(matches!(
            raw_map_from_msg(&msg),
            Err(MapError::InvalidResolution(_))
        ));
    }

    #[test]
    fn published_grid_lines_up_with_source() {
        let msg = grid_msg(&info(), vec![0; 8], &Time::default());
        assert_eq!(msg.info.width, 4);
        assert_eq!(msg.info.height, 2);
        assert_eq!(msg.info.origin.position.x, -1.0);
        assert_eq!(msg.info.origin.orientation.w, 1.0);
        assert_eq!(msg.header.frame_id, "map");
    }

    #[test]
    fn trajectory_marker_style() {
        let points = [Point2::new(0.0, 2.0), Point2::new(0.5, 2.5)];
        let marker = trajectory_msg(&info(), &points, &Time::default());
        assert_eq!(marker.type_, Marker::LINE_STRIP as i32);
        assert_eq!(marker.scale.x, 1.5);
        assert_eq!((marker.color.b, marker.color.a), (1.0, 1.0));
        assert_eq!(marker.points.len(), 2);
        assert_eq!(marker.points[1].y, 2.5);
    }

    #[test]
    fn raw_mi_layout_is_row_major() {
        let msg = mi_raw_msg(&info(), &[0.0; 8]);
        assert_eq!(msg.layout.dim[0].size, 2);
        assert_eq!(msg.layout.dim[1].stride, 4);
        assert_eq!(msg.data.len(), 8);
    }
}
