//! Local handler registrations with buffering for absent participants
//!
//! A participant slot is either a registered handler or a bounded queue of
//! messages that arrived before the handler did. Registration swaps in the
//! handler in one map operation; the still-live backlog stays in the slot and
//! is handed out in arrival order, with later arrivals queued behind it until
//! it is empty.

use crate::DirectoryError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use messaging_config::{DispatcherSettings, OverflowPolicy};
use std::collections::VecDeque;
use tracing::{debug, warn};
use types::ExpiryDate;

/// Capacity and overflow behaviour of each participant's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self::from(&DispatcherSettings::default())
    }
}

impl From<&DispatcherSettings> for BufferPolicy {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            capacity: settings.max_buffered_per_participant,
            overflow: settings.overflow_policy,
        }
    }
}

struct Buffered<P> {
    item: P,
    expiry: ExpiryDate,
}

enum Slot<C, P> {
    Registered(C),
    /// Registered, with a backlog still being handed out through
    /// [`CallerDirectory::next_backlog`]; new arrivals queue behind it
    Draining {
        caller: C,
        queue: VecDeque<Buffered<P>>,
    },
    Pending(VecDeque<Buffered<P>>),
}

/// Outcome of [`CallerDirectory::deliver_or_buffer`]
pub enum Routed<C, P> {
    /// A handler is registered and idle; deliver `item` to it
    Deliver { caller: C, item: P },
    /// The item was queued
    Buffered,
}

pub struct CallerDirectory<C, P> {
    /// Label used in logs
    kind: &'static str,
    slots: DashMap<String, Slot<C, P>>,
    policy: BufferPolicy,
}

impl<C: Clone, P> CallerDirectory<C, P> {
    pub fn new(kind: &'static str, policy: BufferPolicy) -> Self {
        Self {
            kind,
            slots: DashMap::new(),
            policy,
        }
    }

    /// Register `caller`, returning how many buffered entries await replay
    ///
    /// A non-zero count puts the slot in draining mode: the caller of `add`
    /// must pull the backlog with [`CallerDirectory::next_backlog`] until it
    /// returns `None`. Replacing a registration keeps any drain in progress.
    pub fn add(&self, participant_id: impl Into<String>, caller: C) -> usize {
        let participant_id = participant_id.into();
        let mut entry = match self.slots.entry(participant_id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Slot::Registered(caller));
                return 0;
            }
            Entry::Occupied(entry) => entry,
        };

        let mut queue = match entry.get_mut() {
            Slot::Registered(current) | Slot::Draining { caller: current, .. } => {
                *current = caller;
                debug!("Replaced {} registration for '{}'", self.kind, participant_id);
                return 0;
            }
            Slot::Pending(queue) => std::mem::take(queue),
        };

        let buffered = queue.len();
        queue.retain(|entry| !entry.expiry.is_expired());
        if queue.len() < buffered {
            debug!(
                "Dropped {} expired buffered {} for '{}'",
                buffered - queue.len(),
                self.kind,
                participant_id
            );
        }

        let backlog = queue.len();
        entry.insert(if queue.is_empty() {
            Slot::Registered(caller)
        } else {
            Slot::Draining { caller, queue }
        });
        backlog
    }

    /// Next live backlog entry of a draining slot, with the handler to give
    /// it to
    ///
    /// Returns `None` once the backlog is empty, switching the slot to direct
    /// delivery. The switch happens on the call after the last entry was
    /// handed out, so anything arriving while that entry is processed still
    /// queues behind it.
    pub fn next_backlog(&self, participant_id: &str) -> Option<(C, P)> {
        let mut slot = self.slots.get_mut(participant_id)?;
        let Slot::Draining { caller, queue } = slot.value_mut() else {
            return None;
        };

        while let Some(entry) = queue.pop_front() {
            if entry.expiry.is_expired() {
                debug!(
                    "Dropped expired buffered {} for '{}'",
                    self.kind, participant_id
                );
                continue;
            }
            return Some((caller.clone(), entry.item));
        }

        let caller = caller.clone();
        *slot = Slot::Registered(caller);
        None
    }

    /// Unregister the handler
    ///
    /// Buffered entries of an unregistered participant are left alone, and
    /// backlog entries not yet handed out are buffered again.
    pub fn remove(&self, participant_id: &str) -> Option<C> {
        let Entry::Occupied(mut entry) = self.slots.entry(participant_id.to_string()) else {
            return None;
        };

        let undelivered = match entry.get_mut() {
            Slot::Pending(_) => return None,
            Slot::Registered(_) => None,
            Slot::Draining { queue, .. } => Some(std::mem::take(queue)).filter(|q| !q.is_empty()),
        };
        let slot = match undelivered {
            Some(queue) => entry.insert(Slot::Pending(queue)),
            None => entry.remove(),
        };

        match slot {
            Slot::Registered(caller) | Slot::Draining { caller, .. } => Some(caller),
            Slot::Pending(_) => None,
        }
    }

    pub fn get(&self, participant_id: &str) -> Option<C> {
        self.slots
            .get(participant_id)
            .and_then(|slot| match slot.value() {
                Slot::Registered(caller) | Slot::Draining { caller, .. } => Some(caller.clone()),
                Slot::Pending(_) => None,
            })
    }

    pub fn is_registered(&self, participant_id: &str) -> bool {
        self.get(participant_id).is_some()
    }

    /// Hand back the registered handler or queue `item`
    ///
    /// Items are queued while no handler is registered and while a new
    /// handler's backlog is still draining.
    pub fn deliver_or_buffer(
        &self,
        participant_id: &str,
        item: P,
        expiry: ExpiryDate,
    ) -> Result<Routed<C, P>, DirectoryError> {
        match self.slots.entry(participant_id.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Slot::Registered(caller) => Ok(Routed::Deliver {
                    caller: caller.clone(),
                    item,
                }),
                Slot::Draining { queue, .. } | Slot::Pending(queue) => {
                    self.enqueue(participant_id, queue, Buffered { item, expiry })?;
                    Ok(Routed::Buffered)
                }
            },
            Entry::Vacant(entry) => {
                let mut queue = VecDeque::new();
                self.enqueue(participant_id, &mut queue, Buffered { item, expiry })?;
                entry.insert(Slot::Pending(queue));
                Ok(Routed::Buffered)
            }
        }
    }

    fn enqueue(
        &self,
        participant_id: &str,
        queue: &mut VecDeque<Buffered<P>>,
        entry: Buffered<P>,
    ) -> Result<(), DirectoryError> {
        queue.retain(|buffered| !buffered.expiry.is_expired());

        if queue.len() >= self.policy.capacity {
            match self.policy.overflow {
                OverflowPolicy::DropOldest => {
                    queue.pop_front();
                    warn!(
                        "Buffer for '{}' full ({} {}), dropped oldest entry",
                        participant_id, self.policy.capacity, self.kind
                    );
                }
                OverflowPolicy::RejectNewest => {
                    return Err(DirectoryError::buffer_full(
                        participant_id,
                        self.policy.capacity,
                    ));
                }
            }
        }

        queue.push_back(entry);
        debug!(
            "Buffered {} for '{}' ({} queued)",
            self.kind,
            participant_id,
            queue.len()
        );
        Ok(())
    }

    /// Entries queued for `participant_id`, including a backlog not yet
    /// replayed
    pub fn buffered_len(&self, participant_id: &str) -> usize {
        self.slots
            .get(participant_id)
            .map(|slot| match slot.value() {
                Slot::Pending(queue) | Slot::Draining { queue, .. } => queue.len(),
                Slot::Registered(_) => 0,
            })
            .unwrap_or(0)
    }

    /// Drop expired buffered entries and empty queues
    pub fn purge_expired(&self) -> usize {
        let mut purged = 0;
        self.slots.retain(|_, slot| match slot {
            Slot::Registered(_) => true,
            Slot::Draining { queue, .. } => {
                let before = queue.len();
                queue.retain(|buffered| !buffered.expiry.is_expired());
                purged += before - queue.len();
                true
            }
            Slot::Pending(queue) => {
                let before = queue.len();
                queue.retain(|buffered| !buffered.expiry.is_expired());
                purged += before - queue.len();
                !queue.is_empty()
            }
        });
        purged
    }
}
