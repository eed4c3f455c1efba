// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors and fault isolation.
//!
//! Two kinds of failure flow through the engine:
//!
//! - Usage and resource faults ([`ResponderError::DuplicateRootEventType`],
//!   [`ResponderError::MissingEventField`], [`ResponderError::UnknownInstance`])
//!   are returned directly by the offending call. They indicate integration bugs.
//! - Listener faults are errors returned by responder callbacks or emitted-event
//!   listeners. They are isolated per invocation by [`FirstFault`]: siblings still
//!   run, and the first fault is surfaced when the cycle completes.

use alloc::boxed::Box;
use core::fmt;

use crate::types::{EventType, InstanceId};

/// Boxed error returned from user callbacks.
pub type BoxedError = Box<dyn core::error::Error + 'static>;

/// Errors produced by the responder system.
#[non_exhaustive]
#[derive(Debug)]
pub enum ResponderError {
    /// An instance registered the same root event type twice, either through
    /// its definition's static list or through
    /// [`add_root_event_types`](crate::context::ResponderContext::add_root_event_types).
    DuplicateRootEventType {
        /// The registering instance.
        instance: InstanceId,
        /// The duplicated event type.
        event_type: EventType,
    },
    /// An emitted event is missing a required field.
    MissingEventField {
        /// `"target"` or `"type"`.
        field: &'static str,
    },
    /// The instance id does not refer to a mounted instance.
    UnknownInstance(InstanceId),
    /// A responder callback or event listener failed.
    Listener(BoxedError),
}

impl ResponderError {
    /// Wrap a user error as a listener fault.
    pub fn listener(err: impl Into<BoxedError>) -> Self {
        Self::Listener(err.into())
    }
}

impl fmt::Display for ResponderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRootEventType {
                instance,
                event_type,
            } => write!(
                f,
                "{instance:?} registered root event type \"{event_type}\" twice; it is either \
                 listed in the responder's root event types or was already added"
            ),
            Self::MissingEventField { field } => {
                write!(f, "emitted event is missing the required \"{field}\" field")
            }
            Self::UnknownInstance(id) => write!(f, "{id:?} is not a mounted responder instance"),
            Self::Listener(err) => write!(f, "listener failed: {err}"),
        }
    }
}

impl core::error::Error for ResponderError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Listener(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Accumulator that isolates faults across a loop of callbacks.
///
/// Every invocation runs; the first error is kept and later ones are logged
/// and dropped.
#[derive(Debug, Default)]
pub struct FirstFault {
    first: Option<ResponderError>,
}

impl FirstFault {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its error if it fails.
    pub fn invoke_isolated(
        &mut self,
        label: &str,
        f: impl FnOnce() -> Result<(), ResponderError>,
    ) {
        self.record(label, f());
    }

    /// Record the outcome of an invocation that already ran.
    pub fn record(&mut self, label: &str, result: Result<(), ResponderError>) {
        let Err(err) = result else {
            return;
        };
        log::warn!("responder listener for `{label}` failed: {err}");
        if self.first.is_none() {
            self.first = Some(err);
        }
    }

    /// Surface the first fault, if any.
    pub fn into_result(self) -> Result<(), ResponderError> {
        match self.first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
