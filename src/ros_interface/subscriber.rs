// src/ros_interface/subscriber.rs
// Non-blocking access to ROS 2 topic streams. Messages are delivered into the
// stream by `Node::spin_once`; this wrapper drains whatever has arrived.

use futures::future::FutureExt;
use futures::stream::{LocalBoxStream, StreamExt};
use r2r::{Node, QosProfile, WrappedTypesupport};

/// Subscription whose pending messages can be polled without an executor.
pub struct Subscriber<T> {
    stream: LocalBoxStream<'static, T>,
}

impl<T> Subscriber<T>
where
    T: WrappedTypesupport + 'static,
{
    /// Subscribes to `topic` on `node`.
    pub fn new(node: &mut Node, topic: &str, qos: QosProfile) -> Result<Self, r2r::Error> {
        let stream = node.subscribe::<T>(topic, qos)?.boxed_local();
        Ok(Subscriber { stream })
    }

    /// Every message delivered since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        let mut messages = Vec::new();
        while let Some(Some(msg)) = self.stream.next().now_or_never() {
            messages.push(msg);
        }
        messages
    }

    /// Newest pending message, discarding older ones.
    pub fn latest(&mut self) -> Option<T> {
        self.drain().pop()
    }
}
