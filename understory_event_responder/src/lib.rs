// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Event Responder: attachable responder units for UI input.
//!
//! ## Overview
//!
//! A responder is a small state machine (press, hover, long press, ...) attached
//! to a node of a component tree. This crate routes native input events from a
//! host document into the mounted responders, lets them claim, re-emit and
//! arbitrate events, and hands every event they emit back to the host's update
//! scheduler in one batch per native event.
//!
//! It does not own a tree or a document. The host supplies both through the
//! traits in [`types`]: a [`ComponentTree`](types::ComponentTree) with a
//! [`NodeKind`](types::NodeKind) tag per node, a
//! [`HostDocument`](types::HostDocument) for hit testing and listening,
//! [`HostTimers`](types::HostTimers), and a [`Batcher`](types::Batcher).
//!
//! ## Phases
//!
//! [`ResponderSystem::dispatch`](dispatcher::ResponderSystem::dispatch) runs one
//! cycle per native event:
//!
//! 1. Capture: `on_event_capture` on every targeted instance from the root side
//!    down to the target.
//! 2. Bubble: `on_event` from the target up.
//! 3. Root: `on_root_event` on every instance registered for the event type,
//!    wherever it sits in the tree.
//!
//! An instance is targeted when its node is an ancestor of the event target and
//! its definition lists the event type (name plus passive/active). A definition
//! can stop local propagation so that only its first instance runs per phase.
//!
//! ## Ownership
//!
//! One instance at a time may own the input stream
//! ([`ResponderContext::request_ownership`](context::ResponderContext::request_ownership)).
//! While it does, every other instance is skipped in every phase. Instances
//! with an `on_ownership_change` handler are notified after each change.
//!
//! ## Output
//!
//! Callbacks emit events with
//! [`ResponderContext::emit`](context::ResponderContext::emit). At the end of
//! the cycle the queued events are flushed through the
//! [`Batcher`](types::Batcher) as a single unit of work, in interactive priority
//! if any of them was discrete.
//!
//! ## Timers
//!
//! [`ResponderContext::set_timeout`](context::ResponderContext::set_timeout)
//! defers a callback. Timers with equal delays scheduled in the same cycle share
//! one host timer; when it fires, the host calls
//! [`ResponderSystem::fire_timer`](dispatcher::ResponderSystem::fire_timer) and the
//! callbacks run in a new cycle, emitting exactly as a dispatch would.
//!
//! ## Errors
//!
//! Callback errors are isolated: every callback of a cycle runs, and the first
//! error comes back from the entry point after the flush. See [`error`].
//!
//! ## Configuration
//!
//! [`ResponderConfig`](config::ResponderConfig) holds the engine policies.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `trace` for per-dispatch detail,
//! `debug` for mounts and ownership changes, `warn` for callback faults.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod ownership;
pub mod queue;
pub mod registry;
pub mod responder;
pub mod router;
pub mod timers;
pub mod types;

#[cfg(test)]
mod test_host;

pub use config::ResponderConfig;
pub use context::ResponderContext;
pub use dispatcher::ResponderSystem;
pub use error::ResponderError;
pub use responder::{ResponderDefinition, ResponderInstance};
pub use types::{EventSystemFlags, EventType, InstanceId, NodeKind, ResponderTypes};
