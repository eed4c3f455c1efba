// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timer subsystem.
//!
//! Responders schedule callbacks with
//! [`ResponderContext::set_timeout`](crate::context::ResponderContext::set_timeout).
//! Timers scheduled during the same cycle with the same delay share one host
//! timer: they are grouped into a [`TimerGroup`] keyed by its host handle, and
//! the cycle remembers which group it opened for each delay.
//!
//! When the host timer elapses the host calls
//! [`ResponderSystem::fire_timer`](crate::dispatcher::ResponderSystem::fire_timer),
//! which takes the whole group out and runs its live entries in a fresh cycle.
//!
//! Invariants:
//! - A group exists only while it has at least one pending entry.
//! - Every pending token maps to the host timer of the group holding it.
//! - An entry is retired before its callback runs, so cancelling a timer from
//!   inside its own callback is a no-op.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::context::ResponderContext;
use crate::error::ResponderError;
use crate::types::{HostTimerId, HostTimers, InstanceId, ResponderTypes, TimerId};

/// Deferred responder callback.
pub type TimerCallback<T> = Box<
    dyn FnOnce(
        &mut ResponderContext<'_, T>,
        &<T as ResponderTypes>::Props,
        &mut <T as ResponderTypes>::State,
    ) -> Result<(), ResponderError>,
>;

/// One scheduled callback.
pub struct TimerEntry<T: ResponderTypes> {
    /// Token handed back to the scheduling responder.
    pub id: TimerId,
    /// Instance the callback runs as.
    pub instance: InstanceId,
    /// The callback.
    pub callback: TimerCallback<T>,
}

impl<T: ResponderTypes> fmt::Debug for TimerEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEntry")
            .field("id", &self.id)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

/// Timers sharing one host timer.
pub struct TimerGroup<T: ResponderTypes> {
    delay_ms: u64,
    entries: Vec<TimerEntry<T>>,
}

impl<T: ResponderTypes> fmt::Debug for TimerGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGroup")
            .field("delay_ms", &self.delay_ms)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<T: ResponderTypes> TimerGroup<T> {
    /// Delay the group's host timer was scheduled with.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Pending entries, in scheduling order.
    pub fn entries(&self) -> &[TimerEntry<T>] {
        &self.entries
    }
}

/// Per-cycle record of which group was opened for which delay.
pub type CycleTimers = HashMap<u64, HostTimerId>;

/// All pending timer groups.
pub struct Timers<T: ResponderTypes> {
    groups: HashMap<HostTimerId, TimerGroup<T>>,
    active: HashMap<TimerId, HostTimerId>,
    next_id: u64,
}

impl<T: ResponderTypes> Default for Timers<T> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            active: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T: ResponderTypes> fmt::Debug for Timers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("groups", &self.groups.len())
            .field("pending", &self.active.len())
            .finish_non_exhaustive()
    }
}

impl<T: ResponderTypes> Timers<T> {
    /// Create an empty timer table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run as `instance` after `delay_ms`.
    ///
    /// Joins the group `cycle` already opened for this delay if it is still
    /// pending; otherwise asks `host` for a new host timer.
    pub fn schedule(
        &mut self,
        host: &mut (impl HostTimers + ?Sized),
        cycle: &mut CycleTimers,
        instance: InstanceId,
        delay_ms: u64,
        callback: TimerCallback<T>,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let host_timer = match cycle.get(&delay_ms) {
            Some(h) if self.groups.contains_key(h) => *h,
            _ => {
                let h = host.set_timeout(delay_ms);
                log::trace!("host timer {h:?} scheduled for {delay_ms}ms");
                self.groups.insert(
                    h,
                    TimerGroup {
                        delay_ms,
                        entries: Vec::new(),
                    },
                );
                cycle.insert(delay_ms, h);
                h
            }
        };
        if let Some(group) = self.groups.get_mut(&host_timer) {
            group.entries.push(TimerEntry {
                id,
                instance,
                callback,
            });
        }
        self.active.insert(id, host_timer);
        id
    }

    /// Cancel a pending timer. Returns whether it was still pending.
    ///
    /// Cancelling the last entry of a group cancels the group's host timer.
    pub fn cancel(&mut self, host: &mut (impl HostTimers + ?Sized), id: TimerId) -> bool {
        let Some(host_timer) = self.active.remove(&id) else {
            return false;
        };
        if let Some(group) = self.groups.get_mut(&host_timer) {
            group.entries.retain(|e| e.id != id);
            if group.entries.is_empty() {
                self.groups.remove(&host_timer);
                log::trace!("host timer {host_timer:?} cancelled");
                host.clear_timeout(host_timer);
            }
        }
        true
    }

    /// Cancel every pending timer of `instance`. Returns how many were pending.
    ///
    /// Groups left empty have their host timer cancelled.
    pub fn cancel_instance(
        &mut self,
        host: &mut (impl HostTimers + ?Sized),
        instance: InstanceId,
    ) -> usize {
        let mut cancelled = 0;
        let mut emptied = Vec::new();
        for (&host_timer, group) in &mut self.groups {
            group.entries.retain(|e| {
                if e.instance != instance {
                    return true;
                }
                self.active.remove(&e.id);
                cancelled += 1;
                false
            });
            if group.entries.is_empty() {
                emptied.push(host_timer);
            }
        }
        for host_timer in emptied {
            self.groups.remove(&host_timer);
            log::trace!("host timer {host_timer:?} cancelled with {instance:?}");
            host.clear_timeout(host_timer);
        }
        cancelled
    }

    /// Remove and return the entries of the group behind `host_timer`.
    ///
    /// Entries stay pending until [`Timers::retire`] is called for them, so a
    /// callback can still cancel a later sibling from the same group.
    pub fn take_group(&mut self, host_timer: HostTimerId) -> Option<Vec<TimerEntry<T>>> {
        self.groups.remove(&host_timer).map(|group| group.entries)
    }

    /// Mark a fired entry as no longer pending. Returns `false` if it was
    /// cancelled in the meantime and must not run.
    pub fn retire(&mut self, id: TimerId) -> bool {
        self.active.remove(&id).is_some()
    }

    /// Whether `id` is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.active.contains_key(&id)
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.active.len()
    }

    /// The group behind `host_timer`, if it is still pending.
    pub fn group(&self, host_timer: HostTimerId) -> Option<&TimerGroup<T>> {
        self.groups.get(&host_timer)
    }
}
