// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree walks over the component tree.
//!
//! ## Overview
//!
//! The router answers structural questions; it never runs callbacks.
//!
//! - [`target_instances`] collects the responder instances on the path from a
//!   target up to the root, nearest first. The dispatcher runs capture over this
//!   list in reverse and bubble in order.
//! - [`is_within_instance`], [`is_within_node`], [`is_within_touch_hit_target`]
//!   and [`event_targets_from_target`] back the read-only queries on
//!   [`ResponderContext`](crate::context::ResponderContext).
//!
//! Every walk goes through [`ComponentTree::parent_of`] and stops at the
//! first node without a parent; callers guarantee acyclic ancestry.
//!
//! ```
//! use understory_event_responder::router::Ancestors;
//! use understory_event_responder::types::{ComponentTree, NodeKind};
//!
//! struct Chain;
//! impl ComponentTree<u32> for Chain {
//!     fn parent_of(&self, node: &u32) -> Option<u32> {
//!         (*node > 1).then(|| node - 1)
//!     }
//!     fn first_child(&self, _: &u32) -> Option<u32> { None }
//!     fn next_sibling(&self, _: &u32) -> Option<u32> { None }
//!     fn kind_of(&self, _: &u32) -> NodeKind { NodeKind::Host }
//! }
//!
//! let path: Vec<u32> = Ancestors::new(&Chain, Some(3)).collect();
//! assert_eq!(path, vec![3, 2, 1]);
//! ```

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use kurbo::Point;
use smallvec::SmallVec;

use crate::types::{
    ComponentTree, EventTargetMatch, EventTargetQuery, HostDocument, InstanceId, NodeKind,
};

/// Iterator from a node up to the root, the node itself included.
pub struct Ancestors<'t, K, C: ?Sized> {
    tree: &'t C,
    next: Option<K>,
    _phantom: PhantomData<fn() -> K>,
}

impl<K: fmt::Debug, C: ?Sized> fmt::Debug for Ancestors<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ancestors")
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl<'t, K, C: ComponentTree<K> + ?Sized> Ancestors<'t, K, C> {
    /// Walk upwards from `start`; `None` yields nothing.
    pub fn new(tree: &'t C, start: Option<K>) -> Self {
        Self {
            tree,
            next: start,
            _phantom: PhantomData,
        }
    }
}

impl<K, C: ComponentTree<K> + ?Sized> Iterator for Ancestors<'_, K, C> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let cur = self.next.take()?;
        self.next = self.tree.parent_of(&cur);
        Some(cur)
    }
}

/// Responder instances on the path from `target` to the root that `accepts`
/// admits, nearest to the target first.
pub fn target_instances<K>(
    tree: &(impl ComponentTree<K> + ?Sized),
    target: Option<K>,
    mut accepts: impl FnMut(InstanceId) -> bool,
) -> SmallVec<[InstanceId; 8]> {
    Ancestors::new(tree, target)
        .filter_map(|node| match tree.kind_of(&node) {
            NodeKind::Responder(id) if accepts(id) => Some(id),
            _ => None,
        })
        .collect()
}

/// Whether `node` lies in the subtree of the node carrying `instance`.
pub fn is_within_instance<K>(
    tree: &(impl ComponentTree<K> + ?Sized),
    node: K,
    instance: InstanceId,
) -> bool {
    Ancestors::new(tree, Some(node))
        .any(|n| tree.kind_of(&n) == NodeKind::Responder(instance))
}

/// Whether `child` is `parent` or one of its descendants.
pub fn is_within_node<K: PartialEq>(
    tree: &(impl ComponentTree<K> + ?Sized),
    child: K,
    parent: K,
) -> bool {
    Ancestors::new(tree, Some(child)).any(|n| n == parent)
}

/// Whether `pt` hits an element rendered by an event target while lying
/// outside the host element that event target is attached to.
///
/// Touch hit targets extend the pressable area beyond their host element; a
/// point inside the host element itself is not "within the hit target".
pub fn is_within_touch_hit_target<K, H>(host: &H, pt: Point) -> bool
where
    H: ComponentTree<K> + HostDocument<K> + ?Sized,
{
    let Some(hit) = host.element_from_point(pt) else {
        return false;
    };
    let Some(parent) = host.parent_of(&hit) else {
        return false;
    };
    if !matches!(host.kind_of(&parent), NodeKind::EventTarget { .. }) {
        return false;
    }
    let Some(attached_to) = Ancestors::new(host, host.parent_of(&parent))
        .find(|n| host.kind_of(n) == NodeKind::Host)
    else {
        return false;
    };
    let Some(rect) = host.bounding_rect(&attached_to) else {
        return true;
    };
    let inside = pt.x > rect.x0 && pt.y > rect.y0 && pt.x < rect.x1 && pt.y < rect.y1;
    !inside
}

/// Event targets attached to host elements on the path from `target` up to the
/// node carrying `instance`, nearest first.
///
/// For each host element on the path, the first child event target matching
/// `query` is reported.
pub fn event_targets_from_target<K: Copy>(
    tree: &(impl ComponentTree<K> + ?Sized),
    target: K,
    instance: InstanceId,
    query: EventTargetQuery,
) -> Vec<EventTargetMatch<K>> {
    let mut out = Vec::new();
    for node in Ancestors::new(tree, Some(target)) {
        match tree.kind_of(&node) {
            NodeKind::Responder(id) if id == instance => break,
            NodeKind::Host => {}
            _ => continue,
        }
        let mut child = tree.first_child(&node);
        while let Some(c) = child {
            if let NodeKind::EventTarget { ty, key } = tree.kind_of(&c)
                && query.matches(ty, key)
            {
                out.push(EventTargetMatch {
                    host: node,
                    target: c,
                });
                break;
            }
            child = tree.next_sibling(&c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use hashbrown::HashMap;
    use kurbo::Rect;

    use crate::types::EventType;

    // 1 (host)
    // └─ 2 (responder #0)
    //    └─ 3 (host, 0..100)
    //       ├─ 4 (event target "TouchHitTarget", key 7)
    //       │  └─ 5 (host, -10..110)
    //       └─ 6 (host)
    //          └─ 8 (responder #1)
    //             └─ 9 (host)
    #[derive(Default)]
    struct Tree {
        parent: HashMap<u32, u32>,
        children: HashMap<u32, Vec<u32>>,
        kinds: HashMap<u32, NodeKind>,
        rects: HashMap<u32, Rect>,
        hit: Option<u32>,
    }

    impl Tree {
        fn add(&mut self, node: u32, parent: Option<u32>, kind: NodeKind) {
            if let Some(p) = parent {
                self.parent.insert(node, p);
                self.children.entry(p).or_default().push(node);
            }
            self.kinds.insert(node, kind);
        }

        fn sample() -> Self {
            let mut t = Self::default();
            t.add(1, None, NodeKind::Host);
            t.add(2, Some(1), NodeKind::Responder(InstanceId(0)));
            t.add(3, Some(2), NodeKind::Host);
            t.add(
                4,
                Some(3),
                NodeKind::EventTarget {
                    ty: "TouchHitTarget",
                    key: Some(7),
                },
            );
            t.add(5, Some(4), NodeKind::Host);
            t.add(6, Some(3), NodeKind::Host);
            t.add(8, Some(6), NodeKind::Responder(InstanceId(1)));
            t.add(9, Some(8), NodeKind::Host);
            t.rects.insert(3, Rect::new(0.0, 0.0, 100.0, 100.0));
            t.rects.insert(5, Rect::new(-10.0, -10.0, 110.0, 110.0));
            t
        }
    }

    impl ComponentTree<u32> for Tree {
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

    impl HostDocument<u32> for Tree {
        fn element_from_point(&self, _: Point) -> Option<u32> {
            self.hit
        }
        fn bounding_rect(&self, node: &u32) -> Option<Rect> {
            self.rects.get(node).copied()
        }
        fn listen_to(&mut self, _: EventType) {}
    }

    #[test]
    fn ancestors_walk_to_root() {
        let t = Tree::sample();
        let path: Vec<u32> = Ancestors::new(&t, Some(9)).collect();
        assert_eq!(path, vec![9, 8, 6, 3, 2, 1]);
        assert_eq!(Ancestors::new(&t, None).count(), 0);
    }

    #[test]
    fn target_instances_are_nearest_first() {
        let t = Tree::sample();
        let found = target_instances(&t, Some(9), |_| true);
        assert_eq!(found.as_slice(), &[InstanceId(1), InstanceId(0)]);

        let filtered = target_instances(&t, Some(9), |id| id == InstanceId(0));
        assert_eq!(filtered.as_slice(), &[InstanceId(0)]);

        assert!(target_instances(&t, None, |_| true).is_empty());
    }

    #[test]
    fn within_instance_and_node() {
        let t = Tree::sample();
        assert!(is_within_instance(&t, 9, InstanceId(1)));
        assert!(is_within_instance(&t, 9, InstanceId(0)));
        assert!(!is_within_instance(&t, 5, InstanceId(1)));

        assert!(is_within_node(&t, 5, 3));
        assert!(is_within_node(&t, 3, 3));
        assert!(!is_within_node(&t, 3, 5));
    }

    #[test]
    fn touch_hit_target_excludes_host_rect() {
        let mut t = Tree::sample();
        t.hit = Some(5);
        // Inside the hit slop but outside the host element.
        assert!(is_within_touch_hit_target(&t, Point::new(105.0, 50.0)));
        // Inside the host element itself.
        assert!(!is_within_touch_hit_target(&t, Point::new(50.0, 50.0)));
        // Hitting an element that is not rendered by an event target.
        t.hit = Some(9);
        assert!(!is_within_touch_hit_target(&t, Point::new(105.0, 50.0)));
        t.hit = None;
        assert!(!is_within_touch_hit_target(&t, Point::new(105.0, 50.0)));
    }

    #[test]
    fn event_targets_stop_at_current_instance() {
        let t = Tree::sample();
        let all = event_targets_from_target(&t, 6, InstanceId(0), EventTargetQuery::default());
        assert_eq!(all, vec![EventTargetMatch { host: 3, target: 4 }]);

        // The walk stops at instance #1 before reaching node 3.
        let none = event_targets_from_target(&t, 9, InstanceId(1), EventTargetQuery::default());
        assert!(none.is_empty());

        let wrong_key = EventTargetQuery {
            ty: Some("TouchHitTarget"),
            key: Some(1),
        };
        assert!(event_targets_from_target(&t, 6, InstanceId(0), wrong_key).is_empty());
    }
}
