// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource Notification Service - lifecycle state registry and waits
//!
//! Holds the current state of every resource for one run and lets callers
//! suspend until a resource reaches one of a set of states. Supervisors call
//! [`ResourceNotificationService::publish`]; dependants call
//! [`ResourceNotificationService::wait_for_state`].
//!
//! Each resource has its own slot behind a `parking_lot::Mutex`, so publishes
//! to different resources never contend and publishes to the same resource
//! are serialized. Waiters are oneshot senders resolved from the publish path;
//! `publish` never awaits.

use crate::domain::lifecycle::{
    NotificationError, ResourceStateChanged, ResourceStateSnapshot, StateName, WaitError,
};
use crate::infrastructure::event_bus::{EventBus, EventReceiver, ResourceEventReceiver};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type WaitOutcome = Result<ResourceStateSnapshot, WaitError>;

struct Waiter {
    id: u64,
    targets: Vec<StateName>,
    sender: oneshot::Sender<WaitOutcome>,
}

#[derive(Default)]
struct ResourceSlot {
    current: Option<ResourceStateSnapshot>,
    sequence: u64,
    waiters: Vec<Waiter>,
}

/// Per-run registry of resource states. Share it as an `Arc`.
pub struct ResourceNotificationService {
    slots: DashMap<String, Arc<Mutex<ResourceSlot>>>,
    next_waiter_id: AtomicU64,
    shutdown_token: CancellationToken,
    event_bus: EventBus,
}

impl ResourceNotificationService {
    pub fn new() -> Self {
        Self::with_event_bus(EventBus::with_default_capacity())
    }

    pub fn with_event_bus(event_bus: EventBus) -> Self {
        Self {
            slots: DashMap::new(),
            next_waiter_id: AtomicU64::new(1),
            shutdown_token: CancellationToken::new(),
            event_bus,
        }
    }

    fn slot(&self, resource_name: &str) -> Arc<Mutex<ResourceSlot>> {
        if let Some(slot) = self.slots.get(resource_name) {
            return slot.value().clone();
        }
        self.slots
            .entry(resource_name.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Record `state` as the current state of `resource_name` and wake every
    /// waiter whose target set contains it.
    pub fn publish(
        &self,
        resource_name: &str,
        state: impl Into<StateName>,
    ) -> Result<ResourceStateSnapshot, NotificationError> {
        let state = state.into();
        let slot = self.slot(resource_name);
        let mut slot = slot.lock();

        if self.shutdown_token.is_cancelled() {
            return Err(NotificationError::ShutDown {
                resource: resource_name.to_string(),
                state,
            });
        }

        slot.sequence += 1;
        let snapshot = ResourceStateSnapshot {
            resource_name: resource_name.to_string(),
            state,
            sequence: slot.sequence,
            timestamp: Utc::now(),
        };
        let previous = slot.current.replace(snapshot.clone()).map(|s| s.state);

        let mut woken = 0u64;
        for waiter in std::mem::take(&mut slot.waiters) {
            if waiter.targets.contains(&snapshot.state) {
                if waiter.sender.send(Ok(snapshot.clone())).is_ok() {
                    woken += 1;
                }
            } else if !waiter.sender.is_closed() {
                slot.waiters.push(waiter);
            }
        }

        // Sent under the slot lock so subscribers see one resource's changes in sequence order
        self.event_bus.publish(ResourceStateChanged {
            snapshot: snapshot.clone(),
            previous: previous.clone(),
        });

        metrics::counter!("apphost_state_publishes_total").increment(1);
        if woken > 0 {
            metrics::counter!("apphost_waiters_woken_total").increment(woken);
        }

        info!(
            resource = %resource_name,
            state = %snapshot.state,
            previous = ?previous.as_ref().map(StateName::as_str),
            sequence = snapshot.sequence,
            woken,
            "Resource state published"
        );

        Ok(snapshot)
    }

    /// Wait until `resource_name` is in one of `targets`.
    ///
    /// Returns immediately when the current state already matches. Otherwise
    /// suspends until a matching publish, `cancellation` firing, or
    /// [`shutdown`](Self::shutdown).
    pub async fn wait_for_state<S: AsRef<str>>(
        &self,
        resource_name: &str,
        targets: &[S],
        cancellation: CancellationToken,
    ) -> Result<ResourceStateSnapshot, WaitError> {
        if targets.is_empty() {
            return Err(WaitError::EmptyTargetSet {
                resource: resource_name.to_string(),
            });
        }
        let targets: Vec<StateName> = targets
            .iter()
            .map(|target| StateName::from(target.as_ref()))
            .collect();

        let slot = self.slot(resource_name);
        let (waiter_id, mut receiver) = {
            let mut guard = slot.lock();

            if self.shutdown_token.is_cancelled() {
                return Err(WaitError::Cancelled {
                    resource: resource_name.to_string(),
                });
            }

            if let Some(current) = &guard.current {
                if targets.contains(&current.state) {
                    debug!(
                        resource = %resource_name,
                        state = %current.state,
                        "Wait satisfied by current state"
                    );
                    return Ok(current.clone());
                }
            }

            let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
            let (sender, receiver) = oneshot::channel();
            guard.waiters.push(Waiter {
                id,
                targets,
                sender,
            });
            (id, receiver)
        };

        debug!(resource = %resource_name, waiter_id, "Waiting for resource state");

        tokio::select! {
            biased;
            outcome = &mut receiver => outcome.unwrap_or_else(|_| {
                Err(WaitError::Cancelled { resource: resource_name.to_string() })
            }),
            _ = cancellation.cancelled() => {
                self.abandon_wait(resource_name, &slot, waiter_id, &mut receiver)
            }
            _ = self.shutdown_token.cancelled() => Err(WaitError::Cancelled {
                resource: resource_name.to_string(),
            }),
        }
    }

    fn abandon_wait(
        &self,
        resource_name: &str,
        slot: &Mutex<ResourceSlot>,
        waiter_id: u64,
        receiver: &mut oneshot::Receiver<WaitOutcome>,
    ) -> WaitOutcome {
        let mut guard = slot.lock();
        guard.waiters.retain(|waiter| waiter.id != waiter_id);

        // A publish may have resolved the waiter just before the cancellation won
        if let Ok(outcome) = receiver.try_recv() {
            return outcome;
        }

        debug!(resource = %resource_name, waiter_id, "Wait cancelled by caller");
        if guard.current.is_none() {
            Err(WaitError::UnknownResource {
                resource: resource_name.to_string(),
            })
        } else {
            Err(WaitError::Cancelled {
                resource: resource_name.to_string(),
            })
        }
    }

    /// Resolve every outstanding wait with `Cancelled`; later waits and
    /// publishes fail immediately.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();

        let slots: Vec<(String, Arc<Mutex<ResourceSlot>>)> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut cancelled = 0usize;
        for (resource_name, slot) in slots {
            let mut guard = slot.lock();
            for waiter in guard.waiters.drain(..) {
                let _ = waiter.sender.send(Err(WaitError::Cancelled {
                    resource: resource_name.clone(),
                }));
                cancelled += 1;
            }
        }

        info!(cancelled_waiters = cancelled, "Resource notification service shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub fn current_state(&self, resource_name: &str) -> Option<ResourceStateSnapshot> {
        let slot = self.slots.get(resource_name)?.value().clone();
        let current = slot.lock().current.clone();
        current
    }

    /// Waits still registered for `resource_name`.
    pub fn pending_waiters(&self, resource_name: &str) -> usize {
        self.slots
            .get(resource_name)
            .map(|slot| slot.value().clone())
            .map(|slot| slot.lock().waiters.len())
            .unwrap_or(0)
    }

    /// Every state change published from now on.
    pub fn watch(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn watch_resource(&self, resource_name: &str) -> ResourceEventReceiver {
        self.event_bus.subscribe_resource(resource_name)
    }
}

impl Default for ResourceNotificationService {
    fn default() -> Self {
        Self::new()
    }
}
