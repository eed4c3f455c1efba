// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root event registry.
//!
//! Maps each event type to the instances that want it delivered in the root
//! phase, in registration order. The reverse map (instance to its registered
//! types) is created lazily on an instance's first registration and is what
//! unmount walks to clean up. The registry also remembers which event types the
//! document already listens for, so each type is requested from the host once.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::error::ResponderError;
use crate::types::{EventType, HostDocument, InstanceId};

/// Event type → instance registrations for the root phase.
#[derive(Clone, Debug, Default)]
pub struct RootEventRegistry {
    by_type: HashMap<EventType, Vec<InstanceId>>,
    by_instance: HashMap<InstanceId, HashSet<EventType>>,
    listening: HashSet<EventType>,
}

impl RootEventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` for root-phase delivery of `event_type`.
    ///
    /// Registering a type the instance already holds is a usage fault.
    pub fn register(
        &mut self,
        id: InstanceId,
        event_type: EventType,
    ) -> Result<(), ResponderError> {
        let types = self.by_instance.entry(id).or_default();
        if !types.insert(event_type) {
            return Err(ResponderError::DuplicateRootEventType {
                instance: id,
                event_type,
            });
        }
        let bucket = self.by_type.entry(event_type).or_default();
        if !bucket.contains(&id) {
            bucket.push(id);
        }
        Ok(())
    }

    /// Remove `id`'s registration for `event_type`, if any.
    pub fn unregister(&mut self, id: InstanceId, event_type: EventType) {
        if let Some(types) = self.by_instance.get_mut(&id) {
            types.remove(&event_type);
        }
        self.remove_from_bucket(id, event_type);
    }

    /// Drop every registration held by `id`.
    pub fn remove_instance(&mut self, id: InstanceId) {
        let Some(types) = self.by_instance.remove(&id) else {
            return;
        };
        for event_type in types {
            self.remove_from_bucket(id, event_type);
        }
    }

    /// Snapshot of instances registered for `event_type`, in registration order.
    pub fn instances_for(&self, event_type: EventType) -> SmallVec<[InstanceId; 8]> {
        self.by_type
            .get(&event_type)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Root event types registered by `id`, or `None` if it never registered any.
    pub fn types_of(&self, id: InstanceId) -> Option<&HashSet<EventType>> {
        self.by_instance.get(&id)
    }

    /// Ask `document` to listen for `event_type` unless it already does.
    ///
    /// Returns whether a new listener was requested.
    pub fn listen<K>(
        &mut self,
        document: &mut (impl HostDocument<K> + ?Sized),
        event_type: EventType,
    ) -> bool {
        if !self.listening.insert(event_type) {
            return false;
        }
        log::debug!("listening for `{event_type}` at the document level");
        document.listen_to(event_type);
        true
    }

    /// Whether the document has been asked to listen for `event_type`.
    pub fn is_listening(&self, event_type: EventType) -> bool {
        self.listening.contains(&event_type)
    }

    fn remove_from_bucket(&mut self, id: InstanceId, event_type: EventType) {
        if let Some(bucket) = self.by_type.get_mut(&event_type) {
            bucket.retain(|i| *i != id);
            if bucket.is_empty() {
                self.by_type.remove(&event_type);
            }
        }
    }
}
