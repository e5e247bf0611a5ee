//! Event plumbing between the scheduler and whoever is watching.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Producer half, handed to the scheduler by reference.
///
/// Cloning is cheap. Sending never fails: once the receiver is gone the
/// scheduler keeps running and events are dropped.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Consumer half
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocking iterator that ends once every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Create a connected sender/receiver pair.
///
/// Unbounded: a slow renderer must never stall a publish.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (sender, receiver) = unbounded();
    (
        EventSender { inner: sender },
        EventReceiver { inner: receiver },
    )
}

/// A sender nobody listens to, for runs without progress output
pub fn null_sender() -> EventSender {
    event_channel().0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BatchEvent, CandidateEvent, SchedulerEvent};
    use std::thread;

    #[test]
    fn events_arrive_in_order_from_another_thread() {
        let (sender, receiver) = event_channel();

        thread::spawn(move || {
            sender.send(Event::Batch(BatchEvent::Fetched { count: 2 }));
            sender.send(Event::Candidate(CandidateEvent::Duplicate {
                external_id: "t3_b".to_string(),
                key: "fingerprint".to_string(),
            }));
        })
        .join()
        .unwrap();

        let events: Vec<Event> = receiver.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::Batch(BatchEvent::Fetched { count: 2 })));
        assert!(matches!(
            &events[1],
            Event::Candidate(CandidateEvent::Duplicate { external_id, .. }) if external_id == "t3_b"
        ));
    }

    #[test]
    fn iteration_ends_when_all_senders_are_dropped() {
        let (sender, receiver) = event_channel();
        let clone = sender.clone();
        sender.send(Event::Scheduler(SchedulerEvent::Started));
        drop(sender);
        clone.send(Event::Scheduler(SchedulerEvent::Shutdown));
        drop(clone);

        assert_eq!(receiver.iter().count(), 2);
    }

    #[test]
    fn sending_without_a_listener_is_harmless() {
        let sender = null_sender();
        sender.send(Event::Scheduler(SchedulerEvent::Started));
        sender.send(Event::Scheduler(SchedulerEvent::Shutdown));
    }
}
