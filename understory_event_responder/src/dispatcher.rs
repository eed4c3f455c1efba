// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch engine: run responder callbacks for a native event.
//!
//! [`ResponderSystem`] owns every piece of process-wide responder state (the
//! ownership slot, the root event registry, the ownership-change listeners, and
//! pending timers) together with the host collaborators. Each entry point opens
//! one cycle, runs callbacks, flushes the cycle's emitted events, and drops the
//! cycle. Entry points take `&mut self`, so cycles never nest.
//!
//! ## Semantics
//!
//! For [`ResponderSystem::dispatch`]:
//!
//! - Collect the responder instances on the path from the target to the root
//!   whose definition targets the event type, nearest first.
//! - Capture: run `on_event_capture` from the farthest instance to the nearest.
//! - Bubble: run `on_event` from the nearest instance to the farthest.
//! - Root: run `on_root_event` for every instance registered for the event
//!   type, in registration order.
//! - While some instance owns the input stream, every other instance is
//!   skipped in every phase.
//! - In capture and bubble, a definition that stops local propagation runs
//!   only for its first instance in that phase. Root has no suppression.
//! - Flush emitted events through the host [`Batcher`](crate::types::Batcher).
//!
//! Callback errors do not interrupt the cycle. The first one is returned after
//! the flush.
//!
//! ## Minimal example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use kurbo::{Point, Rect};
//! use understory_event_responder::dispatcher::ResponderSystem;
//! use understory_event_responder::responder::ResponderDefinition;
//! use understory_event_responder::types::*;
//!
//! // A single responder node (0) above a host node (1).
//! struct Host { responder: Option<InstanceId> }
//! impl ComponentTree<u32> for Host {
//!     fn parent_of(&self, n: &u32) -> Option<u32> { (*n == 1).then_some(0) }
//!     fn first_child(&self, _: &u32) -> Option<u32> { None }
//!     fn next_sibling(&self, _: &u32) -> Option<u32> { None }
//!     fn kind_of(&self, n: &u32) -> NodeKind {
//!         match (*n, self.responder) {
//!             (0, Some(id)) => NodeKind::Responder(id),
//!             _ => NodeKind::Host,
//!         }
//!     }
//! }
//! impl HostDocument<u32> for Host {
//!     fn element_from_point(&self, _: Point) -> Option<u32> { None }
//!     fn bounding_rect(&self, _: &u32) -> Option<Rect> { None }
//!     fn listen_to(&mut self, _: EventType) {}
//! }
//! impl HostTimers for Host {
//!     fn set_timeout(&mut self, _: u64) -> HostTimerId { HostTimerId(0) }
//!     fn clear_timeout(&mut self, _: HostTimerId) {}
//! }
//! impl Batcher for Host {
//!     fn batched_updates(&mut self, work: &mut dyn FnMut()) { work() }
//! }
//!
//! struct Press { target: u32 }
//! impl OutputEvent<u32> for Press {
//!     fn event_type(&self) -> Option<&str> { Some("press") }
//!     fn target(&self) -> Option<&u32> { Some(&self.target) }
//! }
//!
//! struct App;
//! impl ResponderTypes for App {
//!     type Node = u32;
//!     type NativeEvent = ();
//!     type Event = Press;
//!     type Props = ();
//!     type State = u32;
//!     type Host = Host;
//! }
//!
//! let pressed = Rc::new(RefCell::new(0));
//! let seen = pressed.clone();
//! let definition = ResponderDefinition::<App>::new("Press")
//!     .with_target_event_types([EventType::new("pointerdown")])
//!     .on_event(move |event, ctx, _props, count| {
//!         *count += 1;
//!         let seen = seen.clone();
//!         let target = event.target.unwrap_or_default();
//!         ctx.emit(Press { target }, move |_| { *seen.borrow_mut() += 1; Ok(()) }, true)
//!     });
//!
//! let mut system = ResponderSystem::<App>::new(Host { responder: None });
//! let id = system.mount_instance(Rc::new(definition), (), 0).unwrap();
//! system.host_mut().responder = Some(id);
//!
//! system
//!     .dispatch("pointerdown", Some(1), &(), Some(1), EventSystemFlags::IS_PASSIVE)
//!     .unwrap();
//! assert_eq!(*pressed.borrow(), 1);
//! assert_eq!(system.state(id), Some(&1));
//! ```

use alloc::rc::Rc;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::config::ResponderConfig;
use crate::context::{Cycle, EngineState, ResponderContext};
use crate::error::ResponderError;
use crate::responder::{PhaseHandler, ResponderDefinition, ResponderInstance};
use crate::router;
use crate::types::{
    EventSystemFlags, EventType, HostTimerId, InstanceId, ResponderEvent, ResponderTypes,
};

/// Which handler a target-phase pass runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TargetPhase {
    Capture,
    Bubble,
}

/// The responder engine.
///
/// ## Usage
///
/// - Construct with [`ResponderSystem::new`] (default policies) or
///   [`ResponderSystem::with_config`].
/// - Mount instances with [`mount_instance`](Self::mount_instance) and tag their
///   tree nodes with [`NodeKind::Responder`](crate::types::NodeKind::Responder).
/// - Feed native events to [`dispatch`](Self::dispatch) and elapsed host timers
///   to [`fire_timer`](Self::fire_timer).
/// - Unmount with [`unmount_instance`](Self::unmount_instance).
pub struct ResponderSystem<T: ResponderTypes> {
    pub(crate) host: T::Host,
    pub(crate) instances: HashMap<InstanceId, ResponderInstance<T>>,
    pub(crate) state: EngineState<T>,
    pub(crate) next_instance: u32,
}

impl<T: ResponderTypes> fmt::Debug for ResponderSystem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderSystem")
            .field("instances", &self.instances.len())
            .field("owner", &self.state.ownership.owner())
            .field("config", &self.state.config)
            .field("timers", &self.state.timers)
            .finish_non_exhaustive()
    }
}

impl<T: ResponderTypes> ResponderSystem<T> {
    /// Create an engine with default policies.
    pub fn new(host: T::Host) -> Self {
        Self::with_config(host, ResponderConfig::default())
    }

    /// Create an engine with explicit policies.
    pub fn with_config(host: T::Host, config: ResponderConfig) -> Self {
        Self {
            host,
            instances: HashMap::new(),
            state: EngineState::new(config),
            next_instance: 0,
        }
    }

    /// Active policies.
    pub fn config(&self) -> &ResponderConfig {
        &self.state.config
    }

    /// Replace the active policies.
    pub fn set_config(&mut self, config: ResponderConfig) {
        self.state.config = config;
    }

    /// The host collaborators.
    pub fn host(&self) -> &T::Host {
        &self.host
    }

    /// Mutable access to the host, e.g. to edit the tree between dispatches.
    pub fn host_mut(&mut self) -> &mut T::Host {
        &mut self.host
    }

    /// The instance that currently owns the input stream.
    pub fn owner(&self) -> Option<InstanceId> {
        self.state.ownership.owner()
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.state.timers.pending()
    }

    /// Route a native event through the responder instances.
    ///
    /// `target` is the tree node the event landed on (or `None` if it landed
    /// outside the tree, in which case only the root phase runs);
    /// `native_event_target` is reported to callbacks as the event target.
    pub fn dispatch(
        &mut self,
        event_type: &'static str,
        target: Option<T::Node>,
        native_event: &T::NativeEvent,
        native_event_target: Option<T::Node>,
        flags: EventSystemFlags,
    ) -> Result<(), ResponderError> {
        let mut cycle = Cycle::new();
        let dispatched = EventType::for_dispatch(event_type, flags);
        let event = ResponderEvent {
            event_type,
            target: native_event_target,
            native_event,
            passive: flags.contains(EventSystemFlags::IS_PASSIVE),
            passive_supported: !flags.contains(EventSystemFlags::PASSIVE_NOT_SUPPORTED),
        };

        let targets = {
            let instances = &self.instances;
            let ownership = &self.state.ownership;
            router::target_instances(&self.host, target, |id| {
                ownership.is_eligible(id)
                    && instances
                        .get(&id)
                        .is_some_and(|i| i.definition.targets(dispatched))
            })
        };
        log::trace!(
            "dispatching `{dispatched}` to {} target instance(s)",
            targets.len()
        );

        if !targets.is_empty() {
            self.run_target_phase(&mut cycle, &event, targets.iter().rev(), TargetPhase::Capture);
            self.run_target_phase(&mut cycle, &event, targets.iter(), TargetPhase::Bubble);
        }
        self.run_root_phase(&mut cycle, &event, dispatched);

        self.finish_cycle(cycle)
    }

    /// Run the timers grouped behind `host_timer`, which the host reports as
    /// elapsed.
    ///
    /// All live entries of the group run in one new cycle, each as the
    /// instance that scheduled it, and the cycle is flushed like a dispatch.
    /// Unknown handles (already cancelled groups) are ignored.
    pub fn fire_timer(&mut self, host_timer: HostTimerId) -> Result<(), ResponderError> {
        let Some(entries) = self.state.timers.take_group(host_timer) else {
            log::trace!("ignoring stale host timer {host_timer:?}");
            return Ok(());
        };
        let mut cycle = Cycle::new();
        for entry in entries {
            if !self.state.timers.retire(entry.id) {
                continue;
            }
            if !self.instances.contains_key(&entry.instance) {
                log::debug!(
                    "dropping {:?}: {:?} is no longer mounted",
                    entry.id,
                    entry.instance
                );
                continue;
            }
            self.invoke(&mut cycle, entry.instance, "timeout", entry.callback);
            self.notify_ownership_change(&mut cycle);
        }
        self.finish_cycle(cycle)
    }

    fn run_target_phase<'i>(
        &mut self,
        cycle: &mut Cycle<T>,
        event: &ResponderEvent<'_, T>,
        order: impl Iterator<Item = &'i InstanceId>,
        phase: TargetPhase,
    ) {
        // Definitions that stopped local propagation in this phase.
        let mut propagated: SmallVec<[Rc<ResponderDefinition<T>>; 4]> = SmallVec::new();
        for &id in order {
            if !self.state.ownership.is_eligible(id) {
                continue;
            }
            let Some(definition) = self.definition(id).cloned() else {
                continue;
            };
            let handler: Option<&PhaseHandler<T>> = match phase {
                TargetPhase::Capture => definition.on_event_capture.as_ref(),
                TargetPhase::Bubble => definition.on_event.as_ref(),
            };
            let Some(handler) = handler else {
                continue;
            };
            if propagated.iter().any(|d| Rc::ptr_eq(d, &definition)) {
                continue;
            }
            self.invoke(cycle, id, event.event_type, |ctx, props, state| {
                handler(event, ctx, props, state)
            });
            self.notify_ownership_change(cycle);
            if definition.stops_local_propagation() {
                propagated.push(definition.clone());
            }
        }
    }

    fn run_root_phase(
        &mut self,
        cycle: &mut Cycle<T>,
        event: &ResponderEvent<'_, T>,
        event_type: EventType,
    ) {
        let registered = self.state.roots.instances_for(event_type);
        for id in registered {
            if !self.state.ownership.is_eligible(id) {
                continue;
            }
            let Some(definition) = self.definition(id).cloned() else {
                continue;
            };
            let Some(handler) = definition.on_root_event.as_ref() else {
                continue;
            };
            self.invoke(cycle, id, event.event_type, |ctx, props, state| {
                handler(event, ctx, props, state)
            });
            self.notify_ownership_change(cycle);
        }
    }

    /// Run `f` as instance `id` with a fresh context, recording its fault.
    pub(crate) fn invoke(
        &mut self,
        cycle: &mut Cycle<T>,
        id: InstanceId,
        label: &str,
        f: impl FnOnce(&mut ResponderContext<'_, T>, &T::Props, &mut T::State) -> Result<(), ResponderError>,
    ) {
        let Some(instance) = self.instances.get_mut(&id) else {
            return;
        };
        let mut ctx = ResponderContext::new(&mut self.state, &mut self.host, cycle, id);
        let result = f(&mut ctx, &instance.props, &mut instance.state);
        cycle.faults.record(label, result);
    }

    /// Run ownership notification passes until ownership settles.
    ///
    /// One pass runs per acquisition or release, so a request followed by a
    /// release in one callback yields two passes. Each pass calls
    /// `on_ownership_change` on every registered listener, as that listener.
    /// Changes made by those handlers schedule further passes, up to
    /// [`ResponderConfig::max_ownership_passes`] (at least one).
    pub(crate) fn notify_ownership_change(&mut self, cycle: &mut Cycle<T>) {
        let limit = self.state.config.max_ownership_passes.max(1);
        let mut passes = 0;
        while self.state.ownership.take_change() {
            if passes == limit {
                log::warn!(
                    "ownership still changing after {passes} notification passes; giving up"
                );
                self.state.ownership.discard_changes();
                break;
            }
            passes += 1;
            let listeners: SmallVec<[InstanceId; 8]> =
                self.state.ownership.listeners().iter().copied().collect();
            log::debug!(
                "ownership is now {:?}; notifying {} listener(s)",
                self.state.ownership.owner(),
                listeners.len()
            );
            for id in listeners {
                let Some(definition) = self.definition(id).cloned() else {
                    continue;
                };
                let Some(handler) = definition.on_ownership_change.as_ref() else {
                    continue;
                };
                self.invoke(cycle, id, "ownershipchange", |ctx, props, state| {
                    handler(ctx, props, state)
                });
            }
        }
    }

    /// Flush the cycle's queue and surface the first fault of the cycle.
    pub(crate) fn finish_cycle(&mut self, cycle: Cycle<T>) -> Result<(), ResponderError> {
        let Cycle {
            queue, mut faults, ..
        } = cycle;
        let flushed = queue.flush::<T::Node, _>(&mut self.host);
        faults.record("flush", flushed);
        faults.into_result()
    }

    /// The definition of a mounted instance.
    pub fn definition(&self, id: InstanceId) -> Option<&Rc<ResponderDefinition<T>>> {
        self.instances.get(&id).map(|i| &i.definition)
    }
}
