// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Responder definitions and instances.
//!
//! A [`ResponderDefinition`] is immutable and shared (through `Rc`) by every
//! instance mounted from it. Definition identity matters: local propagation is
//! stopped per definition, so two instances built from the same `Rc` suppress
//! each other while two separately built definitions do not.
//!
//! ```
//! # use understory_event_responder::responder::ResponderDefinition;
//! # use understory_event_responder::types::EventType;
//! # fn build<T: understory_event_responder::types::ResponderTypes>() {
//! let press = ResponderDefinition::<T>::new("Press")
//!     .with_target_event_types([EventType::new("pointerdown"), EventType::new("pointerup")])
//!     .with_root_event_types([EventType::new("pointercancel")])
//!     .with_stop_local_propagation(true)
//!     .on_event(|event, ctx, _props, _state| {
//!         if event.event_type == "pointerdown" {
//!             ctx.request_ownership();
//!         }
//!         Ok(())
//!     });
//! assert!(press.targets(EventType::new("pointerdown")));
//! # }
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashSet;

use crate::context::ResponderContext;
use crate::error::ResponderError;
use crate::types::{EventType, ResponderEvent, ResponderTypes};

/// Capture, bubble and root phase callback.
pub type PhaseHandler<T> = Box<
    dyn Fn(
        &ResponderEvent<'_, T>,
        &mut ResponderContext<'_, T>,
        &<T as ResponderTypes>::Props,
        &mut <T as ResponderTypes>::State,
    ) -> Result<(), ResponderError>,
>;

/// Mount, unmount and ownership-change callback.
pub type LifecycleHandler<T> = Box<
    dyn Fn(
        &mut ResponderContext<'_, T>,
        &<T as ResponderTypes>::Props,
        &mut <T as ResponderTypes>::State,
    ) -> Result<(), ResponderError>,
>;

/// Immutable description of a responder.
pub struct ResponderDefinition<T: ResponderTypes> {
    name: &'static str,
    target_event_types: HashSet<EventType>,
    target_event_order: Vec<EventType>,
    root_event_types: Vec<EventType>,
    stop_local_propagation: bool,
    pub(crate) on_event_capture: Option<PhaseHandler<T>>,
    pub(crate) on_event: Option<PhaseHandler<T>>,
    pub(crate) on_root_event: Option<PhaseHandler<T>>,
    pub(crate) on_ownership_change: Option<LifecycleHandler<T>>,
    pub(crate) on_mount: Option<LifecycleHandler<T>>,
    pub(crate) on_unmount: Option<LifecycleHandler<T>>,
}

impl<T: ResponderTypes> fmt::Debug for ResponderDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderDefinition")
            .field("name", &self.name)
            .field("target_event_types", &self.target_event_order)
            .field("root_event_types", &self.root_event_types)
            .field("stop_local_propagation", &self.stop_local_propagation)
            .finish_non_exhaustive()
    }
}

impl<T: ResponderTypes> ResponderDefinition<T> {
    /// Create a definition with no event types and no handlers.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            target_event_types: HashSet::new(),
            target_event_order: Vec::new(),
            root_event_types: Vec::new(),
            stop_local_propagation: false,
            on_event_capture: None,
            on_event: None,
            on_root_event: None,
            on_ownership_change: None,
            on_mount: None,
            on_unmount: None,
        }
    }

    /// Event types this responder reacts to on its own subtree.
    pub fn with_target_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        for ty in types {
            if self.target_event_types.insert(ty) {
                self.target_event_order.push(ty);
            }
        }
        self
    }

    /// Event types delivered in the root phase from the moment of mount.
    ///
    /// Listing a type twice makes mounting fail with
    /// [`ResponderError::DuplicateRootEventType`].
    pub fn with_root_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.root_event_types.extend(types);
        self
    }

    /// Stop local propagation: per phase, only the first instance of this
    /// definition runs.
    pub fn with_stop_local_propagation(mut self, stop: bool) -> Self {
        self.stop_local_propagation = stop;
        self
    }

    /// Capture-phase handler.
    pub fn on_event_capture(
        mut self,
        f: impl Fn(
            &ResponderEvent<'_, T>,
            &mut ResponderContext<'_, T>,
            &T::Props,
            &mut T::State,
        ) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_event_capture = Some(Box::new(f));
        self
    }

    /// Bubble-phase handler.
    pub fn on_event(
        mut self,
        f: impl Fn(
            &ResponderEvent<'_, T>,
            &mut ResponderContext<'_, T>,
            &T::Props,
            &mut T::State,
        ) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(f));
        self
    }

    /// Root-phase handler.
    pub fn on_root_event(
        mut self,
        f: impl Fn(
            &ResponderEvent<'_, T>,
            &mut ResponderContext<'_, T>,
            &T::Props,
            &mut T::State,
        ) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_root_event = Some(Box::new(f));
        self
    }

    /// Ownership-change handler. Instances of a definition with this handler
    /// are notified after every ownership change.
    pub fn on_ownership_change(
        mut self,
        f: impl Fn(&mut ResponderContext<'_, T>, &T::Props, &mut T::State) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_ownership_change = Some(Box::new(f));
        self
    }

    /// Handler run in its own cycle right after mount.
    pub fn on_mount(
        mut self,
        f: impl Fn(&mut ResponderContext<'_, T>, &T::Props, &mut T::State) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_mount = Some(Box::new(f));
        self
    }

    /// Handler run in its own cycle before unmount bookkeeping.
    pub fn on_unmount(
        mut self,
        f: impl Fn(&mut ResponderContext<'_, T>, &T::Props, &mut T::State) -> Result<(), ResponderError>
        + 'static,
    ) -> Self {
        self.on_unmount = Some(Box::new(f));
        self
    }

    /// Diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this responder reacts to `event_type` on its subtree.
    pub fn targets(&self, event_type: EventType) -> bool {
        self.target_event_types.contains(&event_type)
    }

    /// Target event types, in declaration order.
    pub fn target_event_types(&self) -> &[EventType] {
        &self.target_event_order
    }

    /// Statically declared root event types.
    pub fn root_event_types(&self) -> &[EventType] {
        &self.root_event_types
    }

    /// Whether local propagation stops after the first instance per phase.
    pub fn stops_local_propagation(&self) -> bool {
        self.stop_local_propagation
    }

    /// Whether instances are notified of ownership changes.
    pub fn listens_for_ownership(&self) -> bool {
        self.on_ownership_change.is_some()
    }
}

/// A definition bound to one tree node, with its props and state.
pub struct ResponderInstance<T: ResponderTypes> {
    pub(crate) definition: Rc<ResponderDefinition<T>>,
    pub(crate) props: T::Props,
    pub(crate) state: T::State,
}

impl<T: ResponderTypes> fmt::Debug for ResponderInstance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderInstance")
            .field("definition", &self.definition.name)
            .finish_non_exhaustive()
    }
}

impl<T: ResponderTypes> ResponderInstance<T> {
    /// Bind `definition` to fresh props and state.
    pub fn new(definition: Rc<ResponderDefinition<T>>, props: T::Props, state: T::State) -> Self {
        Self {
            definition,
            props,
            state,
        }
    }

    /// The shared definition.
    pub fn definition(&self) -> &Rc<ResponderDefinition<T>> {
        &self.definition
    }

    /// Current props.
    pub fn props(&self) -> &T::Props {
        &self.props
    }

    /// Current state.
    pub fn state(&self) -> &T::State {
        &self.state
    }
}
