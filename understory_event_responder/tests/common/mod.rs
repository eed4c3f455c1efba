// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared host fixture for the integration tests.

#![allow(dead_code, reason = "not every test file uses every helper")]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kurbo::{Point, Rect};
use understory_event_responder::types::{
    Batcher, ComponentTree, EventType, HostDocument, HostTimerId, HostTimers, InstanceId,
    NodeKind, OutputEvent, ResponderTypes, TimerId,
};
use understory_event_responder::{ResponderConfig, ResponderDefinition, ResponderSystem};

/// In-memory tree, document, timer facility and batcher.
#[derive(Default)]
pub struct Host {
    parent: HashMap<u32, u32>,
    children: HashMap<u32, Vec<u32>>,
    kinds: HashMap<u32, NodeKind>,
    pub rects: HashMap<u32, Rect>,
    pub hit: Option<u32>,
    pub listened: Vec<EventType>,
    pub set: Vec<(HostTimerId, u64)>,
    pub cleared: Vec<HostTimerId>,
    pub batches: Vec<&'static str>,
    next_timer: u64,
}

impl Host {
    /// Add `node` under `parent`.
    pub fn add(&mut self, node: u32, parent: Option<u32>, kind: NodeKind) {
        if let Some(p) = parent {
            self.parent.insert(node, p);
            self.children.entry(p).or_default().push(node);
        }
        self.kinds.insert(node, kind);
    }

    /// Tag `node` as carrying `id`.
    pub fn attach(&mut self, node: u32, id: InstanceId) {
        self.kinds.insert(node, NodeKind::Responder(id));
    }

    /// Host timer handles scheduled so far.
    pub fn host_timers(&self) -> Vec<HostTimerId> {
        self.set.iter().map(|(id, _)| *id).collect()
    }
}

impl ComponentTree<u32> for Host {
    fn parent_of(&self, node: &u32) -> Option<u32> {
        self.parent.get(node).copied()
    }
    fn first_child(&self, node: &u32) -> Option<u32> {
        self.children.get(node).and_then(|c| c.first().copied())
    }
    fn next_sibling(&self, node: &u32) -> Option<u32> {
        let siblings = self.children.get(self.parent.get(node)?)?;
        let i = siblings.iter().position(|n| n == node)?;
        siblings.get(i + 1).copied()
    }
    fn kind_of(&self, node: &u32) -> NodeKind {
        self.kinds.get(node).copied().unwrap_or(NodeKind::Other)
    }
}

impl HostDocument<u32> for Host {
    fn element_from_point(&self, _: Point) -> Option<u32> {
        self.hit
    }
    fn bounding_rect(&self, node: &u32) -> Option<Rect> {
        self.rects.get(node).copied()
    }
    fn listen_to(&mut self, event_type: EventType) {
        self.listened.push(event_type);
    }
}

impl HostTimers for Host {
    fn set_timeout(&mut self, delay_ms: u64) -> HostTimerId {
        let id = HostTimerId(self.next_timer);
        self.next_timer += 1;
        self.set.push((id, delay_ms));
        id
    }
    fn clear_timeout(&mut self, id: HostTimerId) {
        self.cleared.push(id);
    }
}

impl Batcher for Host {
    fn batched_updates(&mut self, work: &mut dyn FnMut()) {
        self.batches.push("batched");
        work();
    }
    fn interactive_updates(&mut self, work: &mut dyn FnMut()) {
        self.batches.push("interactive");
        work();
    }
}

/// Event emitted by test responders.
#[derive(Clone, Debug, PartialEq)]
pub struct Emitted {
    pub ty: Option<&'static str>,
    pub target: Option<u32>,
}

impl Emitted {
    pub fn new(ty: &'static str, target: u32) -> Self {
        Self {
            ty: Some(ty),
            target: Some(target),
        }
    }
}

impl OutputEvent<u32> for Emitted {
    fn event_type(&self) -> Option<&str> {
        self.ty
    }
    fn target(&self) -> Option<&u32> {
        self.target.as_ref()
    }
}

/// Per-instance scratch state.
#[derive(Debug, Default)]
pub struct Scratch {
    pub hits: u32,
    pub timers: Vec<TimerId>,
}

/// Types of the test system. Props are a label naming the instance.
pub struct App;

impl ResponderTypes for App {
    type Node = u32;
    type NativeEvent = ();
    type Event = Emitted;
    type Props = &'static str;
    type State = Scratch;
    type Host = Host;
}

/// Shared record of what ran, in order.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// A listener that records the emitted event's type.
pub fn record(
    log: &Log,
) -> impl FnOnce(&Emitted) -> Result<(), understory_event_responder::ResponderError> + 'static {
    let log = log.clone();
    move |event: &Emitted| {
        log.borrow_mut()
            .push(format!("emitted {}", event.ty.unwrap_or_default()));
        Ok(())
    }
}

/// A chain: 0 (host) > 1 (outer slot) > 2 (host) > 3 (inner slot) > 4 (host).
///
/// Slots are `Other` until an instance is attached.
pub fn chain() -> ResponderSystem<App> {
    chain_with(ResponderConfig::default())
}

pub fn chain_with(config: ResponderConfig) -> ResponderSystem<App> {
    let mut host = Host::default();
    host.add(0, None, NodeKind::Host);
    host.add(1, Some(0), NodeKind::Other);
    host.add(2, Some(1), NodeKind::Host);
    host.add(3, Some(2), NodeKind::Other);
    host.add(4, Some(3), NodeKind::Host);
    ResponderSystem::with_config(host, config)
}

/// Mount `definition` labelled `label` and attach it to `node`.
pub fn mount_at(
    system: &mut ResponderSystem<App>,
    node: u32,
    definition: &Rc<ResponderDefinition<App>>,
    label: &'static str,
) -> InstanceId {
    let id = system
        .mount_instance(definition.clone(), label, Scratch::default())
        .unwrap();
    system.host_mut().attach(node, id);
    id
}

/// A definition that records capture and bubble invocations of `types`.
pub fn recording(log: &Log, types: &[&'static str]) -> ResponderDefinition<App> {
    let capture = log.clone();
    let bubble = log.clone();
    ResponderDefinition::new("Recording")
        .with_target_event_types(types.iter().map(|t| EventType::new(*t)))
        .on_event_capture(move |event, _, props, _| {
            capture
                .borrow_mut()
                .push(format!("{props} capture {}", event.event_type));
            Ok(())
        })
        .on_event(move |event, _, props, _| {
            bubble
                .borrow_mut()
                .push(format!("{props} bubble {}", event.event_type));
            Ok(())
        })
}
