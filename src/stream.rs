//! Build event streams.
//!
//! The engine is synchronous, so events go through an unbounded channel and a
//! send never waits on the subscriber. Consumers read the other end as an
//! async stream.

use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::plan::Action;
use crate::profile::Axis;

/// Type alias for a boxed async stream of events.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Lifecycle events of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// An axis registered its rules and wiring.
    Installed {
        axis: Axis,
        configuration: &'static str,
    },
    /// A once-keyed stage ran.
    Wired { key: String },
    /// Wiring recorded a new action.
    ActionRecorded(Action),
    /// A deferred wiring step failed.
    Faulted(String),
    /// Validation finished.
    Finalized { accepted: bool, violations: usize },
}

/// A sender for events in an async stream.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> EventSender<T> {
    /// Create a new event sender from an mpsc sender.
    pub fn new(tx: mpsc::UnboundedSender<T>) -> Self {
        Self { tx }
    }

    /// Send an event without waiting.
    ///
    /// Returns `Err(event)` if the receiver was dropped.
    pub fn send(&self, event: T) -> Result<(), T> {
        self.tx.send(event).map_err(|e| e.0)
    }

    /// Check if the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Create a sender and the stream it feeds.
///
/// # Example
///
/// ```rust
/// use forgewire::stream::create_stream;
///
/// let (sender, _stream) = create_stream::<String>();
/// sender.send("Hello".to_string()).unwrap();
/// ```
pub fn create_stream<T: Send + 'static>() -> (EventSender<T>, EventStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream: EventStream<T> = Box::pin(UnboundedReceiverStream::new(rx));
    (EventSender::new(tx), stream)
}

/// Extension trait for working with event streams.
pub trait EventStreamExt<T> {
    /// Convert into a boxed stream.
    fn boxed(self) -> EventStream<T>;
}

impl<S, T> EventStreamExt<T> for S
where
    S: Stream<Item = T> + Send + 'static,
{
    fn boxed(self) -> EventStream<T> {
        Box::pin(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_create_stream() {
        let (sender, stream) = create_stream::<BuildEvent>();

        sender
            .send(BuildEvent::Wired {
                key: "ProfileWiring:Runtime:container".to_string(),
            })
            .unwrap();
        sender
            .send(BuildEvent::Finalized {
                accepted: true,
                violations: 0,
            })
            .unwrap();
        drop(sender);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], BuildEvent::Finalized { accepted: true, .. }));
    }

    #[tokio::test]
    async fn test_sender_clone() {
        let (sender, stream) = create_stream::<u32>();

        let sender2 = sender.clone();
        sender.send(1).unwrap();
        sender2.send(2).unwrap();
        drop(sender);
        drop(sender2);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events, vec![1, 2]);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (sender, stream) = create_stream::<u32>();
        drop(stream);

        assert!(sender.is_closed());
        assert_eq!(sender.send(7), Err(7));
    }

    #[tokio::test]
    async fn test_boxed() {
        let stream: EventStream<u32> = EventStreamExt::boxed(futures::stream::iter(vec![1, 2, 3]));
        let events: Vec<u32> = stream.collect().await;
        assert_eq!(events, vec![1, 2, 3]);
    }
}
