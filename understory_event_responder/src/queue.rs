// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output event queue and its flush into the host batcher.
//!
//! Each dispatch cycle owns exactly one [`EventQueue`]. Responders append
//! `(event, listener)` pairs to it through
//! [`ResponderContext::emit`](crate::context::ResponderContext::emit); when the
//! cycle ends the queue is handed to the [`Batcher`] as a single unit of work and
//! then dropped along with its listeners.
//!
//! ```
//! use understory_event_responder::queue::EventQueue;
//!
//! let mut queue: EventQueue<&str> = EventQueue::new();
//! queue.push("press", |_| Ok(()), false);
//! queue.push("longpress", |_| Ok(()), true);
//! // One discrete event makes the whole batch discrete.
//! assert!(queue.is_discrete());
//! assert_eq!(queue.len(), 2);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{FirstFault, ResponderError};
use crate::types::{Batcher, OutputEvent};

/// Listener that processes one emitted event during a flush.
pub type EventListener<E> = Box<dyn FnOnce(&E) -> Result<(), ResponderError>>;

/// Ordered buffer of emitted events for one dispatch cycle.
pub struct EventQueue<E> {
    entries: Vec<(E, EventListener<E>)>,
    discrete: bool,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.entries.len())
            .field("discrete", &self.discrete)
            .finish()
    }
}

impl<E> EventQueue<E> {
    /// Create an empty, non-discrete queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            discrete: false,
        }
    }

    /// Append an event with the listener that will process it.
    ///
    /// Marking any event discrete marks the whole queue discrete.
    pub fn push(
        &mut self,
        event: E,
        listener: impl FnOnce(&E) -> Result<(), ResponderError> + 'static,
        discrete: bool,
    ) {
        self.discrete |= discrete;
        self.entries.push((event, Box::new(listener)));
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the flush will run in interactive priority.
    pub fn is_discrete(&self) -> bool {
        self.discrete
    }

    /// Hand the queue to `batcher` as one unit of work.
    ///
    /// An empty queue is a no-op and never reaches the batcher. Listeners run in
    /// enqueue order; each is isolated, and the first fault is returned once the
    /// batch has run.
    pub fn flush<K, B>(self, batcher: &mut B) -> Result<(), ResponderError>
    where
        E: OutputEvent<K>,
        B: Batcher + ?Sized,
    {
        if self.entries.is_empty() {
            return Ok(());
        }
        let discrete = self.discrete;
        log::trace!(
            "flushing {} responder event(s), discrete: {discrete}",
            self.entries.len()
        );
        let mut entries = Some(self.entries);
        let mut faults = FirstFault::new();
        let mut work = || {
            let Some(entries) = entries.take() else {
                return;
            };
            for (event, listener) in entries {
                let label = event.event_type().unwrap_or("<untyped>");
                faults.invoke_isolated(label, || listener(&event));
            }
        };
        if discrete {
            batcher.interactive_updates(&mut work);
        } else {
            batcher.batched_updates(&mut work);
        }
        faults.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Ev(&'static str);

    impl OutputEvent<u32> for Ev {
        fn event_type(&self) -> Option<&str> {
            Some(self.0)
        }
        fn target(&self) -> Option<&u32> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingBatcher {
        modes: Vec<&'static str>,
    }

    impl Batcher for RecordingBatcher {
        fn batched_updates(&mut self, work: &mut dyn FnMut()) {
            self.modes.push("batched");
            work();
        }
        fn interactive_updates(&mut self, work: &mut dyn FnMut()) {
            self.modes.push("interactive");
            work();
        }
    }

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> impl FnOnce(&Ev) -> Result<(), ResponderError> + 'static {
        let log = log.clone();
        move |e: &Ev| {
            log.borrow_mut().push(e.0);
            Ok(())
        }
    }

    #[test]
    fn empty_queue_never_reaches_batcher() {
        let queue: EventQueue<Ev> = EventQueue::new();
        let mut batcher = RecordingBatcher::default();
        assert!(queue.flush::<u32, _>(&mut batcher).is_ok());
        assert!(batcher.modes.is_empty());
    }

    #[test]
    fn listeners_run_in_enqueue_order_in_one_batch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = EventQueue::new();
        queue.push(Ev("press"), recorder(&log), false);
        queue.push(Ev("move"), recorder(&log), false);
        queue.push(Ev("release"), recorder(&log), false);

        let mut batcher = RecordingBatcher::default();
        assert!(queue.flush::<u32, _>(&mut batcher).is_ok());
        assert_eq!(batcher.modes, vec!["batched"]);
        assert_eq!(*log.borrow(), vec!["press", "move", "release"]);
    }

    #[test]
    fn discrete_wins_for_whole_batch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = EventQueue::new();
        queue.push(Ev("move"), recorder(&log), false);
        queue.push(Ev("press"), recorder(&log), true);

        let mut batcher = RecordingBatcher::default();
        assert!(queue.flush::<u32, _>(&mut batcher).is_ok());
        assert_eq!(batcher.modes, vec!["interactive"]);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn failing_listener_does_not_stop_siblings() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = EventQueue::new();
        queue.push(
            Ev("first"),
            |_| Err(ResponderError::listener("boom")),
            false,
        );
        queue.push(Ev("second"), recorder(&log), false);
        queue.push(
            Ev("third"),
            |_| Err(ResponderError::listener("later")),
            false,
        );

        let mut batcher = RecordingBatcher::default();
        let err = queue.flush::<u32, _>(&mut batcher).unwrap_err();
        assert_eq!(alloc::format!("{err}"), "listener failed: boom");
        assert_eq!(*log.borrow(), vec!["second"]);
    }
}
