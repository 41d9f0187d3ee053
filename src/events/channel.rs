//! Event channel implementation using crossbeam-channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::{DuplicateEvent, Event, TraversalEvent};

/// Sends events from the core library. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event. A dropped receiver is not an error: progress
    /// reporting is optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }

    pub fn traversal(&self, event: TraversalEvent) {
        self.send(Event::Traversal(event));
    }

    pub fn duplicate(&self, event: DuplicateEvent) {
        self.send(Event::Duplicate(event));
    }
}

/// Receives events on the UI side
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Everything queued right now, without blocking
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

/// Constructors for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; the usual choice
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Bounded channel, for a consumer that needs backpressure
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender nobody listens to
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_cross_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.traversal(TraversalEvent::FileFound {
                path: PathBuf::from("/data/a.txt"),
                size: 2,
            });
        });
        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Traversal(TraversalEvent::FileFound { size, .. }) => assert_eq!(size, 2),
            _ => panic!("Wrong event type"),
        }
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn null_sender_does_not_panic() {
        null_sender().duplicate(DuplicateEvent::DirectoryCreated {
            path: PathBuf::from("/dst/sub"),
        });
    }

    #[test]
    fn drain_collects_queued_events() {
        let (sender, receiver) = EventChannel::bounded(4);
        for name in ["a", "b", "c"] {
            sender.traversal(TraversalEvent::DirectoryFound {
                path: PathBuf::from(name),
            });
        }

        assert_eq!(receiver.drain().len(), 3);
        assert!(receiver.try_recv().is_none());
    }
}
