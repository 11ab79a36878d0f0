//! ROS 2 interface for the explorer
//!
//! This module handles all communication with ROS 2, including:
//! - Receiving occupancy maps and clicked points
//! - Publishing MI, measurement and classification grids
//! - Publishing lookahead candidates and the trajectory overlay

/// ROS message conversions
pub mod messages;
mod node;
mod publisher;
mod subscriber;

use std::time::Duration;

use log::{info, warn};
use nalgebra::Point2;
use r2r::builtin_interfaces::msg::Time;
use r2r::geometry_msgs::msg::PointStamped;
use r2r::nav_msgs::msg::OccupancyGrid;
use r2r::sensor_msgs::msg::PointCloud;
use r2r::std_msgs::msg::Float64MultiArray;
use r2r::visualization_msgs::msg::Marker;
use r2r::{Clock, ClockType, Context, Node, QosProfile};

use crate::core::RawMap;
use crate::visualization::{VisualizationFrame, VisualizationSink};
use crate::{ExplorerError, MapError, RosConfig};

pub use node::ExplorerNode;
pub use publisher::*;
pub use subscriber::*;

impl From<r2r::Error> for ExplorerError {
    fn from(e: r2r::Error) -> Self {
        ExplorerError::Ros(e.to_string())
    }
}

/// ROS 2 interface manager
pub struct RosInterface {
    node: Node,
    clock: Clock,
    publishers: RosPublishers,
    subscribers: RosSubscribers,
    published_frames: u64,
}

/// Collection of all ROS publishers
pub struct RosPublishers {
    /// Normalized MI grid
    pub mi: Publisher<OccupancyGrid>,
    /// Raw MI values
    pub mi_raw: Publisher<Float64MultiArray>,
    /// Not-yet-measured grid
    pub p_not_measured: Publisher<OccupancyGrid>,
    /// Classification grid
    pub states: Publisher<OccupancyGrid>,
    /// Lookahead candidates
    pub mi_points: Publisher<PointCloud>,
    /// Trajectory line strip
    pub trajectory: Publisher<Marker>,
}

/// Collection of all ROS subscribers
pub struct RosSubscribers {
    /// Occupancy maps
    pub map: Subscriber<OccupancyGrid>,
    /// Clicked points
    pub click: Subscriber<PointStamped>,
}

impl RosPublishers {
    fn new(node: &mut Node, config: &RosConfig, qos: &QosProfile) -> Result<Self, r2r::Error> {
        Ok(RosPublishers {
            mi: Publisher::new(node, &config.mi_topic, qos.clone())?,
            mi_raw: Publisher::new(node, &config.mi_raw_topic, qos.clone())?,
            p_not_measured: Publisher::new(node, &config.p_not_measured_topic, qos.clone())?,
            states: Publisher::new(node, &config.states_topic, qos.clone())?,
            mi_points: Publisher::new(node, &config.mi_points_topic, qos.clone())?,
            trajectory: Publisher::new(node, &config.trajectory_topic, qos.clone())?,
        })
    }
}

impl RosSubscribers {
    fn new(node: &mut Node, config: &RosConfig, qos: &QosProfile) -> Result<Self, r2r::Error> {
        Ok(RosSubscribers {
            map: Subscriber::new(node, &config.map_topic, qos.clone())?,
            click: Subscriber::new(node, &config.click_topic, qos.clone())?,
        })
    }
}

impl RosInterface {
    /// Create a new ROS interface
    pub fn new(config: &RosConfig) -> Result<Self, ExplorerError> {
        let context = Context::create()?;
        let mut node = Node::create(context, &config.node_name, "")?;

        // Latched so late viewers still get the last frame
        let latched = QosProfile::default()
            .keep_last(config.qos_depth)
            .reliable()
            .transient_local();
        let inbound = QosProfile::default().keep_last(config.qos_depth).reliable();

        let publishers = RosPublishers::new(&mut node, config, &latched)?;
        let subscribers = RosSubscribers::new(&mut node, config, &inbound)?;
        let clock = Clock::create(ClockType::RosTime)?;

        info!(
            "ROS node '{}' listening on {} and {}",
            config.node_name, config.map_topic, config.click_topic
        );
        Ok(RosInterface {
            node,
            clock,
            publishers,
            subscribers,
            published_frames: 0,
        })
    }

    /// Processes pending ROS work for at most `timeout`.
    pub fn spin_once(&mut self, timeout: Duration) {
        self.node.spin_once(timeout);
    }

    /// Newest map received since the last call.
    pub fn latest_map(&mut self) -> Option<Result<RawMap, MapError>> {
        self.subscribers
            .map
            .latest()
            .map(|msg| messages::raw_map_from_msg(&msg))
    }

    /// Clicked points received since the last call, world frame.
    pub fn clicks(&mut self) -> Vec<Point2<f64>> {
        self.subscribers
            .click
            .drain()
            .iter()
            .map(messages::click_from_msg)
            .collect()
    }

    /// Raw MI array on its own topic.
    pub fn publish_mi_raw(&self, frame: &VisualizationFrame) -> Result<(), ExplorerError> {
        self.publishers
            .mi_raw
            .publish(&messages::mi_raw_msg(&frame.info, &frame.mi_raw))?;
        Ok(())
    }

    /// Frames published so far.
    pub fn published_frames(&self) -> u64 {
        self.published_frames
    }

    fn stamp(&mut self) -> Time {
        match self.clock.get_now() {
            Ok(now) => Clock::to_builtin_time(&now),
            Err(e) => {
                warn!("Failed to read ROS clock: {}", e);
                Time::default()
            }
        }
    }
}

impl VisualizationSink for RosInterface {
    fn publish(&mut self, frame: &VisualizationFrame) -> Result<(), ExplorerError> {
        let stamp = self.stamp();
        let info = &frame.info;
        let p = &self.publishers;
        p.mi
            .publish(&messages::grid_msg(info, frame.mi.clone(), &stamp))?;
        p.p_not_measured
            .publish(&messages::grid_msg(info, frame.p_not_measured.clone(), &stamp))?;
        p.states
            .publish(&messages::grid_msg(info, frame.states.clone(), &stamp))?;
        p.mi_points
            .publish(&messages::candidates_msg(info, &frame.candidates, &stamp))?;
        p.trajectory
            .publish(&messages::trajectory_msg(info, &frame.trajectory, &stamp))?;
        self.published_frames += 1;
        Ok(())
    }
}
