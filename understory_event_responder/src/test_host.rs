// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host used by unit tests.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::types::{
    Batcher, ComponentTree, EventType, HostDocument, HostTimerId, HostTimers, NodeKind,
    OutputEvent, ResponderTypes,
};

#[derive(Default)]
pub(crate) struct TestHost {
    pub(crate) parent: HashMap<u32, u32>,
    pub(crate) kinds: HashMap<u32, NodeKind>,
    pub(crate) listened: Vec<EventType>,
    pub(crate) set: Vec<(HostTimerId, u64)>,
    pub(crate) cleared: Vec<HostTimerId>,
    pub(crate) batches: Vec<&'static str>,
    next_timer: u64,
}

impl TestHost {
    pub(crate) fn add(&mut self, node: u32, parent: Option<u32>, kind: NodeKind) {
        if let Some(p) = parent {
            self.parent.insert(node, p);
        }
        self.kinds.insert(node, kind);
    }
}

impl ComponentTree<u32> for TestHost {
    fn parent_of(&self, node: &u32) -> Option<u32> {
        self.parent.get(node).copied()
    }
    fn first_child(&self, _: &u32) -> Option<u32> {
        None
    }
    fn next_sibling(&self, _: &u32) -> Option<u32> {
        None
    }
    fn kind_of(&self, node: &u32) -> NodeKind {
        self.kinds.get(node).copied().unwrap_or(NodeKind::Other)
    }
}

impl HostDocument<u32> for TestHost {
    fn element_from_point(&self, _: Point) -> Option<u32> {
        None
    }
    fn bounding_rect(&self, _: &u32) -> Option<Rect> {
        None
    }
    fn listen_to(&mut self, event_type: EventType) {
        self.listened.push(event_type);
    }
}

impl HostTimers for TestHost {
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

impl Batcher for TestHost {
    fn batched_updates(&mut self, work: &mut dyn FnMut()) {
        self.batches.push("batched");
        work();
    }
    fn interactive_updates(&mut self, work: &mut dyn FnMut()) {
        self.batches.push("interactive");
        work();
    }
}

#[derive(Debug)]
pub(crate) struct TestEvent {
    pub(crate) ty: Option<&'static str>,
    pub(crate) target: Option<u32>,
}

impl OutputEvent<u32> for TestEvent {
    fn event_type(&self) -> Option<&str> {
        self.ty
    }
    fn target(&self) -> Option<&u32> {
        self.target.as_ref()
    }
}

pub(crate) struct Types;

impl ResponderTypes for Types {
    type Node = u32;
    type NativeEvent = ();
    type Event = TestEvent;
    type Props = u32;
    type State = u32;
    type Host = TestHost;
}
