// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types and the collaborator traits the engine is driven through.
//!
//! The engine never owns a component tree or a document. It reaches them
//! through the traits in this module:
//!
//! - [`ComponentTree`]: parent/child/sibling links and a [`NodeKind`] tag per node.
//! - [`HostDocument`]: hit testing, geometry, and document-level listening.
//! - [`HostTimers`]: the host's timer facility.
//! - [`Batcher`]: the update scheduler emitted events are handed to.
//!
//! A host implements all four; [`ResponderHost`] names the bundle.

use core::fmt;
use core::hash::Hash;

use bitflags::bitflags;
use kurbo::{Point, Rect};

/// Identifier of a mounted responder instance.
///
/// Ids are allocated monotonically by the engine and never reused, so a stale
/// id held by the host simply stops resolving after unmount.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    /// Raw index of this id, useful for host-side side tables.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Token returned by [`ResponderContext::set_timeout`](crate::context::ResponderContext::set_timeout).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

/// Handle of a timer scheduled on the host's timer facility.
///
/// The host chooses the value in [`HostTimers::set_timeout`] and hands it back
/// to [`ResponderSystem::fire_timer`](crate::dispatcher::ResponderSystem::fire_timer)
/// when the timer elapses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostTimerId(pub u64);

/// An event type as seen by responders: a name plus passive/active listening.
///
/// Plain names are passive, matching how the document listens by default.
/// The same name registered passive and active is two distinct event types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventType {
    /// Top-level event name, e.g. `"pointerdown"`.
    pub name: &'static str,
    /// Whether the listener is passive.
    pub passive: bool,
}

impl EventType {
    /// A passive event type.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            passive: true,
        }
    }

    /// An active (non-passive) event type.
    pub const fn active(name: &'static str) -> Self {
        Self {
            name,
            passive: false,
        }
    }

    /// The event type a native dispatch resolves to under `flags`.
    ///
    /// A dispatch counts as passive when the listener was passive or when the
    /// host cannot register passive listeners at all.
    pub fn for_dispatch(name: &'static str, flags: EventSystemFlags) -> Self {
        Self {
            name,
            passive: flags.is_passive(),
        }
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.passive { "passive" } else { "active" };
        write!(f, "{}_{}", self.name, mode)
    }
}

bitflags! {
    /// Flags describing how the host received a native event.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventSystemFlags: u8 {
        /// The native listener was registered as passive.
        const IS_PASSIVE = 1 << 0;
        /// The host does not support passive listeners.
        const PASSIVE_NOT_SUPPORTED = 1 << 1;
    }
}

impl EventSystemFlags {
    /// Whether a dispatch under these flags targets passive event types.
    pub fn is_passive(self) -> bool {
        self.intersects(Self::IS_PASSIVE | Self::PASSIVE_NOT_SUPPORTED)
    }
}

/// What a node in the component tree is, as far as the engine cares.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A node carrying a mounted responder instance.
    Responder(InstanceId),
    /// A nested event-target node, tagged with a type and an optional key.
    EventTarget {
        /// Event target type, e.g. `"TouchHitTarget"`.
        ty: &'static str,
        /// Optional key used by queries.
        key: Option<u64>,
    },
    /// An ordinary host element.
    Host,
    /// Anything else (text, fragments, ...).
    Other,
}

/// Read-only view of the component tree.
pub trait ComponentTree<K> {
    /// Parent of `node`, or `None` at the root.
    fn parent_of(&self, node: &K) -> Option<K>;
    /// First child of `node`.
    fn first_child(&self, node: &K) -> Option<K>;
    /// Next sibling of `node`.
    fn next_sibling(&self, node: &K) -> Option<K>;
    /// Kind tag of `node`.
    fn kind_of(&self, node: &K) -> NodeKind;
}

/// The host document: hit testing, geometry, and document-level listening.
pub trait HostDocument<K> {
    /// Topmost host node under `pt`.
    fn element_from_point(&self, pt: Point) -> Option<K>;
    /// Bounding rectangle of a host node in document coordinates.
    fn bounding_rect(&self, node: &K) -> Option<Rect>;
    /// Start listening for `event_type` at the document level.
    ///
    /// The engine calls this once per distinct event type.
    fn listen_to(&mut self, event_type: EventType);
}

/// The host's timer facility.
pub trait HostTimers {
    /// Schedule a host timer firing after `delay_ms`.
    fn set_timeout(&mut self, delay_ms: u64) -> HostTimerId;
    /// Cancel a pending host timer.
    fn clear_timeout(&mut self, id: HostTimerId);
}

/// The update scheduler emitted events are flushed into.
///
/// Each flush hands over exactly one unit of work; the batcher must run it
/// once, synchronously or not, in the requested mode.
pub trait Batcher {
    /// Run `work` as one batched update in the default priority.
    fn batched_updates(&mut self, work: &mut dyn FnMut());

    /// Run `work` as one batched update in interactive (high) priority.
    fn interactive_updates(&mut self, work: &mut dyn FnMut()) {
        self.batched_updates(work);
    }
}

/// Everything the engine needs from its host.
pub trait ResponderHost<K>: ComponentTree<K> + HostDocument<K> + HostTimers + Batcher {}

impl<K, H> ResponderHost<K> for H where H: ComponentTree<K> + HostDocument<K> + HostTimers + Batcher
{}

/// An event object a responder emits through
/// [`ResponderContext::emit`](crate::context::ResponderContext::emit).
///
/// `target` and `event_type` are required; emitting an event missing either is
/// rejected at the call site.
pub trait OutputEvent<K> {
    /// Event type name.
    fn event_type(&self) -> Option<&str>;
    /// Target node.
    fn target(&self) -> Option<&K>;
}

/// Bundle of the types a responder system is instantiated with.
///
/// `Props` and `State` are opaque to the engine: it stores them per instance and
/// passes them to callbacks, nothing more.
pub trait ResponderTypes: Sized {
    /// Node key of the component tree.
    type Node: Copy + Eq + Hash + fmt::Debug;
    /// Native event payload handed to [`dispatch`](crate::dispatcher::ResponderSystem::dispatch).
    type NativeEvent;
    /// Events responders emit.
    type Event: OutputEvent<Self::Node>;
    /// Per-instance props.
    type Props;
    /// Per-instance state.
    type State;
    /// Host collaborators.
    type Host: ResponderHost<Self::Node>;
}

/// The event passed to phase callbacks.
pub struct ResponderEvent<'a, T: ResponderTypes> {
    /// Top-level event name.
    pub event_type: &'static str,
    /// Node the native event was targeted at.
    pub target: Option<T::Node>,
    /// The native event.
    pub native_event: &'a T::NativeEvent,
    /// Whether the native listener was passive.
    pub passive: bool,
    /// Whether the host supports passive listeners.
    pub passive_supported: bool,
}

impl<T: ResponderTypes> fmt::Debug for ResponderEvent<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderEvent")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .field("passive", &self.passive)
            .field("passive_supported", &self.passive_supported)
            .finish_non_exhaustive()
    }
}

/// Filter for [`ResponderContext::event_targets_from_target`](crate::context::ResponderContext::event_targets_from_target).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventTargetQuery {
    /// Required event target type, if any.
    pub ty: Option<&'static str>,
    /// Required event target key, if any.
    pub key: Option<u64>,
}

impl EventTargetQuery {
    /// Whether an event target with `ty` and `key` satisfies this query.
    pub fn matches(&self, ty: &'static str, key: Option<u64>) -> bool {
        self.ty.is_none_or(|q| q == ty) && self.key.is_none_or(|q| Some(q) == key)
    }
}

/// An event target found by
/// [`ResponderContext::event_targets_from_target`](crate::context::ResponderContext::event_targets_from_target).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventTargetMatch<K> {
    /// Host node the event target is attached to.
    pub host: K,
    /// The event-target node itself.
    pub target: K,
}
