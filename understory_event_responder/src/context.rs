// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability surface handed to responder callbacks.
//!
//! A [`ResponderContext`] exists only while a cycle is running: the engine
//! builds one per callback invocation, with the invoking instance as the
//! "current" instance, and drops it when the callback returns. There is no way to
//! reach these operations outside a cycle.
//!
//! ## Operations
//!
//! - Output: [`emit`](ResponderContext::emit).
//! - Ownership: [`request_ownership`](ResponderContext::request_ownership),
//!   [`release_ownership`](ResponderContext::release_ownership),
//!   [`has_ownership`](ResponderContext::has_ownership).
//! - Root interest: [`add_root_event_types`](ResponderContext::add_root_event_types),
//!   [`remove_root_event_types`](ResponderContext::remove_root_event_types).
//! - Timers: [`set_timeout`](ResponderContext::set_timeout),
//!   [`clear_timeout`](ResponderContext::clear_timeout).
//! - Tree queries, all read-only.
//!
//! Ownership changes made here are picked up by the engine as soon as the
//! current callback returns; the notification pass runs before any other
//! callback of the cycle.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Point;

use crate::config::ResponderConfig;
use crate::error::{FirstFault, ResponderError};
use crate::ownership::Ownership;
use crate::queue::EventQueue;
use crate::registry::RootEventRegistry;
use crate::router;
use crate::timers::{CycleTimers, Timers};
use crate::types::{
    EventTargetMatch, EventTargetQuery, EventType, InstanceId, OutputEvent, ResponderTypes,
    TimerId,
};

/// Process-wide engine state shared by every cycle.
pub(crate) struct EngineState<T: ResponderTypes> {
    pub(crate) config: ResponderConfig,
    pub(crate) ownership: Ownership,
    pub(crate) roots: RootEventRegistry,
    pub(crate) timers: Timers<T>,
}

impl<T: ResponderTypes> EngineState<T> {
    pub(crate) fn new(config: ResponderConfig) -> Self {
        Self {
            config,
            ownership: Ownership::new(),
            roots: RootEventRegistry::new(),
            timers: Timers::new(),
        }
    }
}

/// State that lives for exactly one cycle.
pub(crate) struct Cycle<T: ResponderTypes> {
    pub(crate) queue: EventQueue<T::Event>,
    pub(crate) timers: CycleTimers,
    pub(crate) faults: FirstFault,
}

impl<T: ResponderTypes> Cycle<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            timers: CycleTimers::new(),
            faults: FirstFault::new(),
        }
    }
}

/// Operations available to a responder callback.
pub struct ResponderContext<'a, T: ResponderTypes> {
    state: &'a mut EngineState<T>,
    host: &'a mut T::Host,
    cycle: &'a mut Cycle<T>,
    instance: InstanceId,
}

impl<T: ResponderTypes> fmt::Debug for ResponderContext<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderContext")
            .field("instance", &self.instance)
            .field("owner", &self.state.ownership.owner())
            .field("queued", &self.cycle.queue.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: ResponderTypes> ResponderContext<'a, T> {
    pub(crate) fn new(
        state: &'a mut EngineState<T>,
        host: &'a mut T::Host,
        cycle: &'a mut Cycle<T>,
        instance: InstanceId,
    ) -> Self {
        Self {
            state,
            host,
            cycle,
            instance,
        }
    }

    /// The instance this callback runs as.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Queue `event` for the end of the cycle, to be processed by `listener`.
    ///
    /// The event must carry a target and a type. Emitting a discrete event
    /// makes the whole flush run in interactive priority.
    pub fn emit(
        &mut self,
        event: T::Event,
        listener: impl FnOnce(&T::Event) -> Result<(), ResponderError> + 'static,
        discrete: bool,
    ) -> Result<(), ResponderError> {
        if event.target().is_none() {
            return Err(ResponderError::MissingEventField { field: "target" });
        }
        if event.event_type().is_none() {
            return Err(ResponderError::MissingEventField { field: "type" });
        }
        self.cycle.queue.push(event, listener, discrete);
        Ok(())
    }

    /// Claim exclusive ownership of the input stream.
    ///
    /// Succeeds only when nobody owns it; returns whether ownership was granted.
    pub fn request_ownership(&mut self) -> bool {
        let granted = self.state.ownership.request(self.instance);
        if granted {
            log::debug!("{:?} took ownership", self.instance);
        }
        granted
    }

    /// Give up ownership if the current instance holds it.
    ///
    /// Returns `false` even after a successful release unless
    /// [`ResponderConfig::release_reports_success`] is set.
    pub fn release_ownership(&mut self) -> bool {
        let released = self.state.ownership.release(self.instance);
        if released {
            log::debug!("{:?} released ownership", self.instance);
        }
        released && self.state.config.release_reports_success
    }

    /// Whether the current instance owns the input stream.
    pub fn has_ownership(&self) -> bool {
        self.state.ownership.is_owner(self.instance)
    }

    /// The current owner, if any.
    pub fn owner(&self) -> Option<InstanceId> {
        self.state.ownership.owner()
    }

    /// Start receiving `types` in the root phase.
    ///
    /// The document is asked to listen for each new type first. Adding a type
    /// the instance already holds fails with
    /// [`ResponderError::DuplicateRootEventType`]; types before it in `types`
    /// stay registered.
    pub fn add_root_event_types(&mut self, types: &[EventType]) -> Result<(), ResponderError> {
        for &ty in types {
            self.state.roots.listen::<T::Node>(&mut *self.host, ty);
        }
        for &ty in types {
            self.state.roots.register(self.instance, ty)?;
        }
        Ok(())
    }

    /// Stop receiving `types` in the root phase.
    pub fn remove_root_event_types(&mut self, types: &[EventType]) {
        for &ty in types {
            self.state.roots.unregister(self.instance, ty);
        }
    }

    /// Root event types the current instance is registered for.
    pub fn root_event_types(&self) -> Vec<EventType> {
        self.state
            .roots
            .types_of(self.instance)
            .map(|types| types.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Run `callback` as the current instance after `delay_ms`, in a new cycle.
    pub fn set_timeout(
        &mut self,
        delay_ms: u64,
        callback: impl FnOnce(&mut ResponderContext<'_, T>, &T::Props, &mut T::State) -> Result<(), ResponderError>
        + 'static,
    ) -> TimerId {
        let id = self.state.timers.schedule(
            &mut *self.host,
            &mut self.cycle.timers,
            self.instance,
            delay_ms,
            Box::new(callback),
        );
        log::trace!("{:?} scheduled {id:?} in {delay_ms}ms", self.instance);
        id
    }

    /// Cancel a timer. Unknown or already fired tokens are ignored.
    pub fn clear_timeout(&mut self, id: TimerId) {
        self.state.timers.cancel(&mut *self.host, id);
    }

    /// Whether `target` lies inside the subtree of the current instance.
    pub fn is_target_within_event_component(&self, target: Option<T::Node>) -> bool {
        target.is_some_and(|node| router::is_within_instance(&*self.host, node, self.instance))
    }

    /// Whether `child` is `parent` or one of its descendants.
    pub fn is_target_within_element(&self, child: T::Node, parent: T::Node) -> bool {
        router::is_within_node(&*self.host, child, parent)
    }

    /// Whether `pt` falls on a touch hit target but outside the element it
    /// extends.
    pub fn is_position_within_touch_hit_target(&self, pt: Point) -> bool {
        router::is_within_touch_hit_target::<T::Node, _>(&*self.host, pt)
    }

    /// Event targets attached along the path from `target` up to the current
    /// instance, filtered by `query`.
    pub fn event_targets_from_target(
        &self,
        target: T::Node,
        query: EventTargetQuery,
    ) -> Vec<EventTargetMatch<T::Node>> {
        router::event_targets_from_target(&*self.host, target, self.instance, query)
    }
}
