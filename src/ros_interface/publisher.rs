// src/ros_interface/publisher.rs
// Typed ROS 2 publisher remembering its topic, for log messages.

use std::cell::Cell;

use log::trace;
use r2r::{Node, QosProfile, WrappedTypesupport};

/// Publisher for one topic.
pub struct Publisher<T>
where
    T: WrappedTypesupport,
{
    inner: r2r::Publisher<T>,
    topic: String,
    sent: Cell<u64>,
}

impl<T> Publisher<T>
where
    T: WrappedTypesupport + 'static,
{
    /// Advertises `topic` on `node` with the given QoS.
    pub fn new(node: &mut Node, topic: &str, qos: QosProfile) -> Result<Self, r2r::Error> {
        let inner = node.create_publisher::<T>(topic, qos)?;
        Ok(Publisher {
            inner,
            topic: topic.to_string(),
            sent: Cell::new(0),
        })
    }

    /// Sends `message` on the topic.
    pub fn publish(&self, message: &T) -> Result<(), r2r::Error> {
        self.inner.publish(message)?;
        self.sent.set(self.sent.get() + 1);
        trace!("Published message #{} on {}", self.sent.get(), self.topic);
        Ok(())
    }
}
