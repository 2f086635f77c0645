// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for resource state changes
//
// In-memory fan-out of every accepted state publish using tokio broadcast
// channels. Consumers are dashboards and log streams; waiters do not go
// through the bus (they are resolved directly by the notification service).
//
// Events are not persisted: a subscriber only sees changes published after
// it subscribed.

use crate::domain::lifecycle::ResourceStateChanged;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to resource state changes
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ResourceStateChanged>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: ResourceStateChanged) {
        debug!(
            resource = %event.snapshot.resource_name,
            state = %event.snapshot.state,
            "Publishing state change"
        );

        // send() only fails when nobody is listening
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to state changes");
        }
    }

    /// Subscribe to every state change
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for a single resource
    pub fn subscribe_resource(&self, resource_name: impl Into<String>) -> ResourceEventReceiver {
        ResourceEventReceiver {
            receiver: self.sender.subscribe(),
            resource_name: resource_name.into(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for all state changes
pub struct EventReceiver {
    receiver: broadcast::Receiver<ResourceStateChanged>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<ResourceStateChanged, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<ResourceStateChanged, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for the state changes of one resource (filtered)
pub struct ResourceEventReceiver {
    receiver: broadcast::Receiver<ResourceStateChanged>,
    resource_name: String,
}

impl ResourceEventReceiver {
    /// Receive the next event for the resource, skipping all others
    pub async fn recv(&mut self) -> Result<ResourceStateChanged, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.snapshot.resource_name == self.resource_name {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(error: broadcast::error::RecvError) -> EventBusError {
    match error {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
