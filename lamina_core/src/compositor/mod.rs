// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor-side property trees.
//!
//! The compositor keeps its own index-addressed trees, separate from the
//! paint-side arena. Every tree starts with a *real root* at
//! [`NodeId::ROOT`]. The [`Mapper`](crate::mapper::PropertyTreeMapper) then
//! inserts a *secondary root* at [`NodeId::SECONDARY_ROOT`] that the paint
//! roots map to (device scale on the transform tree, the viewport clip on the
//! clip tree, the root render surface on the effect tree).
//!
//! Nodes are appended with a parent that must already exist, so a node's
//! parent index is always strictly smaller than its own.

mod node;

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Size, Vec2};

pub use node::{ClipNode, ClipType, EffectKind, EffectNode, ScrollNode, TransformNode};

use crate::paint::ElementId;
use crate::transform::Transform3d;

/// Index of a node in one compositor [`PropertyTree`].
///
/// Defaults to [`NodeId::ROOT`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The real root of every tree.
    pub const ROOT: Self = Self(0);
    /// The node paint roots map to.
    pub const SECONDARY_ROOT: Self = Self(1);

    /// Returns the index as `usize`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// An append-only tree of compositor nodes, stored as parallel arrays.
#[derive(Clone, Debug)]
pub struct PropertyTree<N> {
    nodes: Vec<N>,
    parents: Vec<Option<NodeId>>,
    needs_update: bool,
}

impl<N: Default> Default for PropertyTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Default> PropertyTree<N> {
    /// Creates a tree holding only the real root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: alloc::vec![N::default()],
            parents: alloc::vec![None],
            needs_update: false,
        }
    }

    /// Drops every node except a fresh real root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.parents.clear();
        self.nodes.push(N::default());
        self.parents.push(None);
        self.needs_update = false;
    }
}

impl<N> PropertyTree<N> {
    /// Appends `node` under `parent` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not already in the tree.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "node counts are bounded far below u32::MAX in practice"
    )]
    pub fn insert(&mut self, node: N, parent: NodeId) -> NodeId {
        assert!(
            parent.index() < self.nodes.len(),
            "parent {parent:?} not in tree of {} nodes",
            self.nodes.len()
        );
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.parents.push(Some(parent));
        self.needs_update = true;
        id
    }

    /// Returns the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &N {
        self.check(id);
        &self.nodes[id.index()]
    }

    /// Returns the node at `id` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn node_mut(&mut self, id: NodeId) -> &mut N {
        self.check(id);
        self.needs_update = true;
        &mut self.nodes[id.index()]
    }

    /// Returns the parent of `id`, or `None` for the real root.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.check(id);
        self.parents[id.index()]
    }

    /// Number of nodes, including the real root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the real root is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether nodes were added or edited since the flag was last cleared.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Sets the update flag.
    pub fn set_needs_update(&mut self, needs_update: bool) {
        self.needs_update = needs_update;
    }

    /// Iterates `(id, parent, node)` in insertion order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "node counts are bounded far below u32::MAX in practice"
    )]
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<NodeId>, &N)> + '_ {
        self.nodes
            .iter()
            .zip(&self.parents)
            .enumerate()
            .map(|(i, (node, parent))| (NodeId(i as u32), *parent, node))
    }

    fn check(&self, id: NodeId) {
        assert!(
            id.index() < self.nodes.len(),
            "unknown {id:?} (tree holds {})",
            self.nodes.len()
        );
    }
}

/// The four compositor property trees plus their element-id indices.
#[derive(Clone, Debug)]
pub struct PropertyTrees {
    /// Transform tree.
    pub transform_tree: PropertyTree<TransformNode>,
    /// Clip tree.
    pub clip_tree: PropertyTree<ClipNode>,
    /// Effect tree.
    pub effect_tree: PropertyTree<EffectNode>,
    /// Scroll tree.
    pub scroll_tree: PropertyTree<ScrollNode>,
    /// Transform nodes by element id.
    pub element_id_to_transform_node: HashMap<ElementId, NodeId>,
    /// Effect nodes by element id.
    pub element_id_to_effect_node: HashMap<ElementId, NodeId>,
    /// Scroll nodes by element id.
    pub element_id_to_scroll_node: HashMap<ElementId, NodeId>,
    /// Commit that last rebuilt these trees.
    pub sequence_number: u64,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Device viewport size.
    pub viewport_size: Size,
    /// Root-to-screen transform.
    pub to_screen: Transform3d,
    /// Screen-to-root transform.
    pub from_screen: Transform3d,
}

impl Default for PropertyTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTrees {
    /// Creates trees holding only their real roots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform_tree: PropertyTree::new(),
            clip_tree: PropertyTree::new(),
            effect_tree: PropertyTree::new(),
            scroll_tree: PropertyTree::new(),
            element_id_to_transform_node: HashMap::new(),
            element_id_to_effect_node: HashMap::new(),
            element_id_to_scroll_node: HashMap::new(),
            sequence_number: 0,
            device_scale_factor: 1.0,
            viewport_size: Size::ZERO,
            to_screen: Transform3d::IDENTITY,
            from_screen: Transform3d::IDENTITY,
        }
    }

    /// Applies a compositor-initiated scroll to the scroller with `element`
    /// and notifies its client.
    ///
    /// Returns `false` if no scroll node carries that element id.
    pub fn notify_scroll(&mut self, element: ElementId, offset: Vec2) -> bool {
        let Some(&id) = self.element_id_to_scroll_node.get(&element) else {
            return false;
        };
        let node = self.scroll_tree.node_mut(id);
        node.scroll_offset = offset;
        if let Some(client) = &node.client {
            client.did_scroll(offset);
        }
        let transform_id = node.transform_id;
        let transform = self.transform_tree.node_mut(transform_id);
        if transform.scrolls {
            transform.scroll_offset = offset;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::paint::{ScrollClient, ScrollClientHandle};

    #[test]
    fn new_tree_has_real_root_only() {
        let tree: PropertyTree<ClipNode> = PropertyTree::new();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.parent(NodeId::ROOT), None);
        assert!(!tree.needs_update());
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut tree: PropertyTree<EffectNode> = PropertyTree::new();
        let a = tree.insert(EffectNode::default(), NodeId::ROOT);
        let b = tree.insert(EffectNode::default(), a);
        assert_eq!(a, NodeId::SECONDARY_ROOT);
        assert_eq!(b, NodeId(2));
        assert_eq!(tree.parent(b), Some(a));
        assert!(tree.needs_update());
        for (id, parent, _) in tree.iter() {
            if let Some(parent) = parent {
                assert!(parent < id);
            }
        }
    }

    #[test]
    fn clear_keeps_fresh_root() {
        let mut tree: PropertyTree<TransformNode> = PropertyTree::new();
        tree.insert(TransformNode::default(), NodeId::ROOT);
        tree.node_mut(NodeId::ROOT).sorting_context_id = 4;
        tree.clear();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node(NodeId::ROOT).sorting_context_id, 0);
    }

    #[test]
    #[should_panic(expected = "not in tree")]
    fn insert_under_missing_parent_panics() {
        let mut tree: PropertyTree<ScrollNode> = PropertyTree::new();
        tree.insert(ScrollNode::default(), NodeId(5));
    }

    #[test]
    fn notify_scroll_reaches_client() {
        struct Counter(AtomicU32);
        impl ScrollClient for Counter {
            fn did_scroll(&self, offset: Vec2) {
                assert_eq!(offset, Vec2::new(0.0, 30.0));
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let mut trees = PropertyTrees::new();
        let transform = trees.transform_tree.insert(
            TransformNode {
                scrolls: true,
                ..TransformNode::default()
            },
            NodeId::ROOT,
        );
        let scroll = trees.scroll_tree.insert(
            ScrollNode {
                scrollable: true,
                transform_id: transform,
                client: Some(ScrollClientHandle::new(counter.clone())),
                ..ScrollNode::default()
            },
            NodeId::ROOT,
        );
        trees
            .element_id_to_scroll_node
            .insert(ElementId(9), scroll);

        assert!(trees.notify_scroll(ElementId(9), Vec2::new(0.0, 30.0)));
        assert!(!trees.notify_scroll(ElementId(10), Vec2::ZERO));
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
        assert_eq!(trees.scroll_tree.node(scroll).scroll_offset.y, 30.0);
        assert_eq!(trees.transform_tree.node(transform).scroll_offset.y, 30.0);
    }
}
