//! Event channel and batch cancellation, built on crossbeam-channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Event;

/// Sending half handed to ingestion and relocation.
///
/// Cloneable and `Send`, so the batch worker can own a copy.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event; dropped silently when nobody is listening.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half used by the presentation layer
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once all senders are gone
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
}

/// Factory for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; events are small and emitted once per file.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Bounded channel, for shells that want backpressure
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender whose events go nowhere (tests, headless callers)
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

/// Batch-granular cancellation flag.
///
/// Checked only between files: a file that has started relocating always
/// reaches a terminal outcome.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the batch to stop after the current file
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::IngestEvent;
    use std::thread;

    #[test]
    fn ingest_events_cross_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Ingest(IngestEvent::Added {
                filename: "IMG_0001.jpg".to_string(),
            }));
        });
        handle.join().unwrap();

        match receiver.recv() {
            Some(Event::Ingest(IngestEvent::Added { filename })) => {
                assert_eq!(filename, "IMG_0001.jpg");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        // Sender dropped with the thread
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn sending_without_listener_is_harmless() {
        null_sender().send(Event::Ingest(IngestEvent::AlreadySeen {
            filename: "a.jpg".to_string(),
        }));
    }

    #[test]
    fn bounded_channel_holds_capacity() {
        let (sender, receiver) = EventChannel::bounded(1);
        sender.send(Event::Ingest(IngestEvent::Added {
            filename: "a.jpg".to_string(),
        }));
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker_copy = token.clone();
        assert!(!worker_copy.is_cancelled());
        token.cancel();
        assert!(worker_copy.is_cancelled());
    }
}
