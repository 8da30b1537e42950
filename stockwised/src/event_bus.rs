//! Event bus for internal daemon communication.
//!
//! API handlers publish what happened to sessions (checkouts settled,
//! catalogs refreshed); the daemon main loop consumes and logs them.
//!
//! Uses tokio broadcast channels for fan-out to multiple receivers.

use chrono::{DateTime, Utc};
use stockwise_domain::Generation;
use tokio::sync::broadcast;
use uuid::Uuid;

// =============================================================================
// Event Types
// =============================================================================

/// Events that flow through the daemon event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonEvent {
    /// A session was opened
    SessionOpened {
        session_id: Uuid,
        generation: Generation,
    },

    /// A checkout finished (possibly with unsettled lines)
    CheckoutSettled(CheckoutSummary),

    /// A session's catalog moved to a new generation
    CatalogRefreshed {
        session_id: Uuid,
        generation: Generation,
    },

    /// Shutdown signal
    Shutdown,
}

/// Outcome counts of one checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSummary {
    /// Session that checked out
    pub session_id: Uuid,
    /// Lines confirmed and cleared from the cart
    pub confirmed: usize,
    /// Lines rejected or failed, still in the cart
    pub unsettled: usize,
    /// Generation installed by the post-settlement refresh
    pub refreshed_to: Option<Generation>,
    /// When the checkout finished
    pub settled_at: DateTime<Utc>,
}

// =============================================================================
// Event Bus
// =============================================================================

/// Event bus for daemon-wide communication.
pub struct EventBus {
    sender: broadcast::Sender<DaemonEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity.
    ///
    /// Capacity determines how many events can be buffered before
    /// slow receivers start missing events (lagging).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn send(&self, event: DaemonEvent) -> usize {
        // send() returns Err if there are no receivers, but we don't care
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events sent after this call.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Receiver for daemon events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<DaemonEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the sender has been dropped.
    /// Returns error description if the receiver lagged (missed events).
    pub async fn recv(&mut self) -> Option<Result<DaemonEvent, String>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            },
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<Result<DaemonEvent, String>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
