// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ownership arbitration: one global exclusive owner of the input stream.
//!
//! While an instance owns the stream, it is the only instance eligible to
//! receive events in any phase. Instances whose definition declares
//! `on_ownership_change` are registered as listeners and notified after every
//! change. Changes are counted here, one per acquisition or release; the
//! dispatcher runs one notification pass per counted change.

use alloc::vec::Vec;

use crate::types::InstanceId;

/// The ownership slot and its change listeners.
#[derive(Clone, Debug, Default)]
pub struct Ownership {
    owner: Option<InstanceId>,
    listeners: Vec<InstanceId>,
    pending: usize,
}

impl Ownership {
    /// Create an empty slot with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner, if any.
    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    /// Whether `id` holds ownership.
    pub fn is_owner(&self, id: InstanceId) -> bool {
        self.owner == Some(id)
    }

    /// Whether `id` may receive events under the current owner.
    pub fn is_eligible(&self, id: InstanceId) -> bool {
        self.owner.is_none_or(|owner| owner == id)
    }

    /// Claim ownership for `id`. Fails if anyone, including `id`, already holds it.
    pub fn request(&mut self, id: InstanceId) -> bool {
        if self.owner.is_some() {
            return false;
        }
        self.owner = Some(id);
        self.pending += 1;
        true
    }

    /// Release ownership if `id` holds it. Returns whether the slot changed.
    pub fn release(&mut self, id: InstanceId) -> bool {
        if self.owner != Some(id) {
            return false;
        }
        self.owner = None;
        self.pending += 1;
        true
    }

    /// Register `id` for change notifications. Registering twice is a no-op.
    pub fn add_listener(&mut self, id: InstanceId) {
        if !self.listeners.contains(&id) {
            self.listeners.push(id);
        }
    }

    /// Unregister `id` from change notifications.
    pub fn remove_listener(&mut self, id: InstanceId) {
        self.listeners.retain(|l| *l != id);
    }

    /// Registered listeners, in registration order.
    pub fn listeners(&self) -> &[InstanceId] {
        &self.listeners
    }

    /// Consume one pending change, returning whether a pass is due.
    pub fn take_change(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    /// Number of changes not yet notified.
    pub fn pending_changes(&self) -> usize {
        self.pending
    }

    /// Drop every change not yet notified.
    pub fn discard_changes(&mut self) {
        self.pending = 0;
    }
}
