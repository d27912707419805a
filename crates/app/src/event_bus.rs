//! In-process event bus backed by a tokio broadcast channel.
//!
//! Accessory registrations, characteristic changes and cloud notifications
//! are fanned out to every [`Subscription`]. A subscriber that falls behind
//! loses the oldest events rather than blocking the pollers.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use ondushub_domain::error::OndusHubError;
use ondushub_domain::event::Event;
use ondushub_domain::id::AccessoryId;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus keeping up to `capacity` undelivered events
    /// per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            accessory_id: None,
        }
    }

    /// Subscribe to events about one accessory only.
    #[must_use]
    pub fn subscribe_accessory(&self, accessory_id: AccessoryId) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            accessory_id: Some(accessory_id),
        }
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), OndusHubError>> + Send {
        tracing::trace!(event_type = ?event.event_type, accessory_id = ?event.accessory_id, "publishing event");
        // send only fails when nobody listens
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

/// Receiving end of the bus, optionally narrowed to one accessory.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    accessory_id: Option<AccessoryId>,
}

impl Subscription {
    fn accepts(&self, event: &Event) -> bool {
        self.accessory_id.is_none() || event.accessory_id == self.accessory_id
    }

    /// Wait for the next matching event.
    ///
    /// Events dropped because this subscriber lagged are skipped with a
    /// warning. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
