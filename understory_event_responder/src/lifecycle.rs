// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mounting and unmounting responder instances.
//!
//! Mounting an instance:
//! - adds it to the ownership-change listeners if its definition has an
//!   `on_ownership_change` handler,
//! - asks the document to listen for its target event types,
//! - registers its static root event types,
//! - runs `on_mount` in its own cycle.
//!
//! If static registration fails, the instance and its registrations are
//! removed again and the id is never handed out.
//!
//! Unmounting runs `on_unmount` and then releases ownership if the instance
//! holds it, all in one cycle that is flushed before the instance's
//! registrations and pending timers are dropped.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::context::Cycle;
use crate::dispatcher::ResponderSystem;
use crate::error::ResponderError;
use crate::responder::{LifecycleHandler, ResponderDefinition, ResponderInstance};
use crate::types::{EventType, InstanceId, ResponderTypes};

impl<T: ResponderTypes> ResponderSystem<T> {
    /// Mount a new instance of `definition`.
    ///
    /// The returned id is what the host tags the instance's tree node with
    /// ([`NodeKind::Responder`](crate::types::NodeKind::Responder)).
    ///
    /// Fails with [`ResponderError::DuplicateRootEventType`] if the
    /// definition lists a root event type twice; nothing stays registered in
    /// that case. Faults of the `on_mount` handler are logged and do not undo
    /// the mount.
    pub fn mount_instance(
        &mut self,
        definition: Rc<ResponderDefinition<T>>,
        props: T::Props,
        state: T::State,
    ) -> Result<InstanceId, ResponderError> {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;

        if definition.listens_for_ownership() {
            self.state.ownership.add_listener(id);
        }
        for &ty in definition.target_event_types() {
            self.state.roots.listen::<T::Node>(&mut self.host, ty);
        }
        self.instances
            .insert(id, ResponderInstance::new(definition.clone(), props, state));

        if let Err(err) = self.register_static_root_event_types(id, definition.root_event_types())
        {
            log::debug!("rolling back mount of {id:?} ({}): {err}", definition.name());
            self.state.roots.remove_instance(id);
            self.state.ownership.remove_listener(id);
            self.instances.remove(&id);
            return Err(err);
        }
        log::debug!("mounted {id:?} ({})", definition.name());

        if let Some(handler) = definition.on_mount.as_ref()
            && let Err(err) = self.run_lifecycle_cycle(id, "mount", handler)
        {
            log::debug!("{id:?} stays mounted after a faulty mount handler: {err}");
        }
        Ok(id)
    }

    /// Unmount `id`.
    ///
    /// Runs `on_unmount`, releases ownership if `id` holds it (notifying the
    /// ownership listeners once), flushes the cycle, and drops every
    /// registration of the instance. Pending timers of the instance are
    /// cancelled, along with any host timer left without entries.
    ///
    /// The first fault of the cycle is returned after the instance is gone.
    pub fn unmount_instance(&mut self, id: InstanceId) -> Result<(), ResponderError> {
        let Some(definition) = self.definition(id).cloned() else {
            return Err(ResponderError::UnknownInstance(id));
        };

        let mut cycle = Cycle::new();
        if let Some(handler) = definition.on_unmount.as_ref() {
            self.invoke(&mut cycle, id, "unmount", |ctx, props, state| {
                handler(ctx, props, state)
            });
        }
        if self.state.ownership.release(id) {
            log::debug!("{id:?} released ownership on unmount");
        }
        self.notify_ownership_change(&mut cycle);
        let result = self.finish_cycle(cycle);

        self.state.ownership.remove_listener(id);
        self.state.roots.remove_instance(id);
        let cancelled = self.state.timers.cancel_instance(&mut self.host, id);
        if cancelled > 0 {
            log::debug!("{id:?} cancelled {cancelled} pending timers on unmount");
        }
        self.instances.remove(&id);
        log::debug!("unmounted {id:?} ({})", definition.name());
        result
    }

    /// Register `types` for root-phase delivery to `id`, asking the document
    /// to listen for any type it does not listen for yet.
    pub fn register_static_root_event_types(
        &mut self,
        id: InstanceId,
        types: &[EventType],
    ) -> Result<(), ResponderError> {
        if !self.instances.contains_key(&id) {
            return Err(ResponderError::UnknownInstance(id));
        }
        for &ty in types {
            self.state.roots.listen::<T::Node>(&mut self.host, ty);
        }
        for &ty in types {
            self.state.roots.register(id, ty)?;
        }
        Ok(())
    }

    /// Replace the props of `id`, returning the previous props.
    pub fn update_props(
        &mut self,
        id: InstanceId,
        props: T::Props,
    ) -> Result<T::Props, ResponderError> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(ResponderError::UnknownInstance(id))?;
        Ok(core::mem::replace(&mut instance.props, props))
    }

    /// Whether `id` refers to a mounted instance.
    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Props of a mounted instance.
    pub fn props(&self, id: InstanceId) -> Option<&T::Props> {
        self.instances.get(&id).map(ResponderInstance::props)
    }

    /// State of a mounted instance.
    pub fn state(&self, id: InstanceId) -> Option<&T::State> {
        self.instances.get(&id).map(ResponderInstance::state)
    }

    /// Mutable state of a mounted instance.
    pub fn state_mut(&mut self, id: InstanceId) -> Option<&mut T::State> {
        self.instances.get_mut(&id).map(|i| &mut i.state)
    }

    /// Root event types `id` is currently registered for, in no particular
    /// order.
    pub fn root_event_types(&self, id: InstanceId) -> Vec<EventType> {
        self.state
            .roots
            .types_of(id)
            .map(|types| types.iter().copied().collect())
            .unwrap_or_default()
    }

    fn run_lifecycle_cycle(
        &mut self,
        id: InstanceId,
        label: &str,
        handler: &LifecycleHandler<T>,
    ) -> Result<(), ResponderError> {
        let mut cycle = Cycle::new();
        self.invoke(&mut cycle, id, label, |ctx, props, state| {
            handler(ctx, props, state)
        });
        self.notify_ownership_change(&mut cycle);
        self.finish_cycle(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_host::{TestHost, Types};

    #[test]
    fn mount_assigns_fresh_ids() {
        let mut system = ResponderSystem::<Types>::new(TestHost::default());
        let def = Rc::new(ResponderDefinition::new("Plain"));
        let a = system.mount_instance(def.clone(), 0, 0).unwrap();
        let b = system.mount_instance(def, 0, 0).unwrap();
        assert_ne!(a, b);
        system.unmount_instance(a).unwrap();
        assert!(!system.is_mounted(a));
        assert!(system.is_mounted(b));
        assert!(matches!(
            system.unmount_instance(a),
            Err(ResponderError::UnknownInstance(id)) if id == a
        ));
    }

    #[test]
    fn duplicate_static_root_type_rolls_back() {
        let mut system = ResponderSystem::<Types>::new(TestHost::default());
        let def = Rc::new(
            ResponderDefinition::new("Dup")
                .with_root_event_types([EventType::new("keydown"), EventType::new("keydown")])
                .on_ownership_change(|_, _, _| Ok(())),
        );
        let err = system.mount_instance(def, 0, 0).unwrap_err();
        assert!(matches!(err, ResponderError::DuplicateRootEventType { .. }));
        assert!(system.instances.is_empty());
        assert!(system.state.ownership.listeners().is_empty());
        assert!(system.state.roots.instances_for(EventType::new("keydown")).is_empty());
    }

    #[test]
    fn update_props_returns_previous() {
        let mut system = ResponderSystem::<Types>::new(TestHost::default());
        let id = system
            .mount_instance(Rc::new(ResponderDefinition::new("Plain")), 1, 0)
            .unwrap();
        assert_eq!(system.update_props(id, 2).unwrap(), 1);
        assert_eq!(system.props(id), Some(&2));
        *system.state_mut(id).unwrap() = 5;
        assert_eq!(system.state(id), Some(&5));
    }

    #[test]
    fn on_mount_runs_in_its_own_cycle() {
        let mut system = ResponderSystem::<Types>::new(TestHost::default());
        let def = Rc::new(ResponderDefinition::new("Mounting").on_mount(|ctx, _, state| {
            *state += 1;
            ctx.add_root_event_types(&[EventType::new("keyup")])
        }));
        let id = system.mount_instance(def, 0, 0).unwrap();
        assert_eq!(system.state(id), Some(&1));
        assert_eq!(system.root_event_types(id), alloc::vec![EventType::new("keyup")]);
        assert_eq!(system.host().listened, alloc::vec![EventType::new("keyup")]);
    }
}
