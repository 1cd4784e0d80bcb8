// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Append-only arena holding the four paint property trees.

use alloc::vec;
use alloc::vec::Vec;

use super::id::{ClipId, EffectId, ScrollId, TransformId};
use super::node::{ClipNode, EffectNode, ScrollNode, TransformNode};

/// Parent access shared by the four node kinds.
trait Parented {
    fn parent_idx(&self) -> Option<u32>;
}

impl Parented for TransformNode {
    fn parent_idx(&self) -> Option<u32> {
        self.parent.map(|p| p.idx)
    }
}

impl Parented for ClipNode {
    fn parent_idx(&self) -> Option<u32> {
        self.parent.map(|p| p.idx)
    }
}

impl Parented for EffectNode {
    fn parent_idx(&self) -> Option<u32> {
        self.parent.map(|p| p.idx)
    }
}

impl Parented for ScrollNode {
    fn parent_idx(&self) -> Option<u32> {
        self.parent.map(|p| p.idx)
    }
}

fn depth<T: Parented>(nodes: &[T], mut idx: u32) -> usize {
    let mut depth = 0;
    while let Some(parent) = nodes[idx as usize].parent_idx() {
        idx = parent;
        depth += 1;
    }
    depth
}

fn is_ancestor_or_self<T: Parented>(nodes: &[T], ancestor: u32, mut idx: u32) -> bool {
    loop {
        if idx == ancestor {
            return true;
        }
        match nodes[idx as usize].parent_idx() {
            Some(parent) => idx = parent,
            None => return false,
        }
    }
}

fn lowest_common_ancestor<T: Parented>(nodes: &[T], a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    let (mut da, mut db) = (depth(nodes, a), depth(nodes, b));
    while da > db {
        a = nodes[a as usize].parent_idx().unwrap_or(a);
        da -= 1;
    }
    while db > da {
        b = nodes[b as usize].parent_idx().unwrap_or(b);
        db -= 1;
    }
    while a != b {
        match (nodes[a as usize].parent_idx(), nodes[b as usize].parent_idx()) {
            (Some(pa), Some(pb)) => {
                a = pa;
                b = pb;
            }
            // Distinct roots cannot occur: every arena has a single root.
            _ => return 0,
        }
    }
    a
}

/// Returns the child of `ancestor` on the path down to `descendant`.
fn child_toward<T: Parented>(nodes: &[T], ancestor: u32, mut descendant: u32) -> Option<u32> {
    while let Some(parent) = nodes[descendant as usize].parent_idx() {
        if parent == ancestor {
            return Some(descendant);
        }
        descendant = parent;
    }
    None
}

/// Storage for the transform, clip, effect, and scroll trees painted for one
/// frame.
///
/// Nodes are immutable once added and addressed by the typed ids returned
/// from the `add_*` methods. Each tree starts with its singleton root at
/// index 0, and a node can only name an already-added parent, so every tree
/// is stored in topological order.
#[derive(Clone, Debug)]
pub struct PaintPropertyTrees {
    transforms: Vec<TransformNode>,
    clips: Vec<ClipNode>,
    effects: Vec<EffectNode>,
    scrolls: Vec<ScrollNode>,
}

impl Default for PaintPropertyTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintPropertyTrees {
    /// Creates an arena holding only the four roots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transforms: vec![TransformNode::root()],
            clips: vec![ClipNode::root()],
            effects: vec![EffectNode::root()],
            scrolls: vec![ScrollNode::root()],
        }
    }

    // -- Construction --

    /// Adds a transform node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no parent or names an id not in this arena.
    pub fn add_transform(&mut self, node: TransformNode) -> TransformId {
        let Some(parent) = node.parent else {
            panic!("non-root transform node needs a parent");
        };
        self.check_transform(parent);
        if let Some(scroll) = node.scroll {
            self.check_scroll(scroll);
        }
        let idx = push(&mut self.transforms, node);
        TransformId { idx }
    }

    /// Adds a clip node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no parent or names an id not in this arena.
    pub fn add_clip(&mut self, node: ClipNode) -> ClipId {
        let Some(parent) = node.parent else {
            panic!("non-root clip node needs a parent");
        };
        self.check_clip(parent);
        self.check_transform(node.local_transform_space);
        let idx = push(&mut self.clips, node);
        ClipId { idx }
    }

    /// Adds an effect node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no parent or names an id not in this arena.
    pub fn add_effect(&mut self, node: EffectNode) -> EffectId {
        let Some(parent) = node.parent else {
            panic!("non-root effect node needs a parent");
        };
        self.check_effect(parent);
        self.check_clip(node.output_clip);
        self.check_transform(node.local_transform_space);
        let idx = push(&mut self.effects, node);
        EffectId { idx }
    }

    /// Adds a scroll node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no parent or names an id not in this arena.
    pub fn add_scroll(&mut self, node: ScrollNode) -> ScrollId {
        let Some(parent) = node.parent else {
            panic!("non-root scroll node needs a parent");
        };
        self.check_scroll(parent);
        let idx = push(&mut self.scrolls, node);
        ScrollId { idx }
    }

    // -- Access --

    /// Returns a transform node.
    #[must_use]
    pub fn transform(&self, id: TransformId) -> &TransformNode {
        self.check_transform(id);
        &self.transforms[id.idx as usize]
    }

    /// Returns a clip node.
    #[must_use]
    pub fn clip(&self, id: ClipId) -> &ClipNode {
        self.check_clip(id);
        &self.clips[id.idx as usize]
    }

    /// Returns an effect node.
    #[must_use]
    pub fn effect(&self, id: EffectId) -> &EffectNode {
        self.check_effect(id);
        &self.effects[id.idx as usize]
    }

    /// Returns a scroll node.
    #[must_use]
    pub fn scroll(&self, id: ScrollId) -> &ScrollNode {
        self.check_scroll(id);
        &self.scrolls[id.idx as usize]
    }

    /// Number of transform nodes, including the root.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Number of effect nodes, including the root.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    // -- Tree queries --

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn transform_is_ancestor_or_self(&self, ancestor: TransformId, node: TransformId) -> bool {
        self.check_transform(node);
        is_ancestor_or_self(&self.transforms, ancestor.idx, node.idx)
    }

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn clip_is_ancestor_or_self(&self, ancestor: ClipId, node: ClipId) -> bool {
        self.check_clip(node);
        is_ancestor_or_self(&self.clips, ancestor.idx, node.idx)
    }

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn effect_is_ancestor_or_self(&self, ancestor: EffectId, node: EffectId) -> bool {
        self.check_effect(node);
        is_ancestor_or_self(&self.effects, ancestor.idx, node.idx)
    }

    /// Returns the deepest transform that is an ancestor-or-self of both.
    #[must_use]
    pub fn transform_lowest_common_ancestor(&self, a: TransformId, b: TransformId) -> TransformId {
        self.check_transform(a);
        self.check_transform(b);
        TransformId {
            idx: lowest_common_ancestor(&self.transforms, a.idx, b.idx),
        }
    }

    /// Returns the deepest effect that is an ancestor-or-self of both.
    #[must_use]
    pub fn effect_lowest_common_ancestor(&self, a: EffectId, b: EffectId) -> EffectId {
        self.check_effect(a);
        self.check_effect(b);
        EffectId {
            idx: lowest_common_ancestor(&self.effects, a.idx, b.idx),
        }
    }

    /// Returns the child of `ancestor` on the path to `descendant`, or `None`
    /// if `descendant` is not strictly below `ancestor`.
    #[must_use]
    pub fn clip_child_toward(&self, ancestor: ClipId, descendant: ClipId) -> Option<ClipId> {
        self.check_clip(descendant);
        child_toward(&self.clips, ancestor.idx, descendant.idx).map(|idx| ClipId { idx })
    }

    /// Returns the child of `ancestor` on the path to `descendant`, or `None`
    /// if `descendant` is not strictly below `ancestor`.
    #[must_use]
    pub fn effect_child_toward(&self, ancestor: EffectId, descendant: EffectId) -> Option<EffectId> {
        self.check_effect(descendant);
        child_toward(&self.effects, ancestor.idx, descendant.idx).map(|idx| EffectId { idx })
    }

    /// Returns the scroll node of the nearest ancestor-or-self transform that
    /// is a scroll translation, or the root scroll node.
    #[must_use]
    pub fn enclosing_scroll(&self, transform: TransformId) -> ScrollId {
        let mut current = Some(transform);
        while let Some(id) = current {
            let node = self.transform(id);
            if let Some(scroll) = node.scroll {
                return scroll;
            }
            current = node.parent;
        }
        ScrollId::ROOT
    }

    // -- Internal helpers --

    fn check_transform(&self, id: TransformId) {
        assert!(
            (id.idx as usize) < self.transforms.len(),
            "unknown {id:?} (arena holds {})",
            self.transforms.len()
        );
    }

    fn check_clip(&self, id: ClipId) {
        assert!(
            (id.idx as usize) < self.clips.len(),
            "unknown {id:?} (arena holds {})",
            self.clips.len()
        );
    }

    fn check_effect(&self, id: EffectId) {
        assert!(
            (id.idx as usize) < self.effects.len(),
            "unknown {id:?} (arena holds {})",
            self.effects.len()
        );
    }

    fn check_scroll(&self, id: ScrollId) {
        assert!(
            (id.idx as usize) < self.scrolls.len(),
            "unknown {id:?} (arena holds {})",
            self.scrolls.len()
        );
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "arenas never approach u32::MAX nodes"
)]
fn push<T>(nodes: &mut Vec<T>, node: T) -> u32 {
    let idx = nodes.len() as u32;
    nodes.push(node);
    idx
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::clip::ClipShape;
    use crate::transform::Transform3d;

    fn rect_clip(parent: ClipId) -> ClipNode {
        ClipNode::new(
            parent,
            TransformId::ROOT,
            ClipShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
        )
    }

    #[test]
    fn new_arena_has_roots() {
        let trees = PaintPropertyTrees::new();
        assert!(trees.transform(TransformId::ROOT).parent.is_none());
        assert!(trees.clip(ClipId::ROOT).parent.is_none());
        assert!(trees.effect(EffectId::ROOT).parent.is_none());
        assert!(trees.scroll(ScrollId::ROOT).parent.is_none());
        assert_eq!(trees.effect(EffectId::ROOT).opacity, 1.0);
    }

    #[test]
    fn ancestry_queries() {
        let mut trees = PaintPropertyTrees::new();
        let a = trees.add_clip(rect_clip(ClipId::ROOT));
        let b = trees.add_clip(rect_clip(a));
        let c = trees.add_clip(rect_clip(ClipId::ROOT));

        assert!(trees.clip_is_ancestor_or_self(a, b));
        assert!(trees.clip_is_ancestor_or_self(b, b));
        assert!(!trees.clip_is_ancestor_or_self(b, a));
        assert!(!trees.clip_is_ancestor_or_self(c, b));
        assert_eq!(trees.clip_child_toward(ClipId::ROOT, b), Some(a));
        assert_eq!(trees.clip_child_toward(a, b), Some(b));
        assert_eq!(trees.clip_child_toward(b, b), None);
        assert_eq!(trees.clip_child_toward(c, b), None);
    }

    #[test]
    fn lowest_common_ancestor_of_siblings_is_parent() {
        let mut trees = PaintPropertyTrees::new();
        let parent = trees.add_effect(EffectNode::new(
            EffectId::ROOT,
            TransformId::ROOT,
            ClipId::ROOT,
            0.5,
        ));
        let left = trees.add_effect(EffectNode::new(parent, TransformId::ROOT, ClipId::ROOT, 0.5));
        let right = trees.add_effect(EffectNode::new(parent, TransformId::ROOT, ClipId::ROOT, 0.5));
        let deep = trees.add_effect(EffectNode::new(left, TransformId::ROOT, ClipId::ROOT, 0.5));

        assert_eq!(trees.effect_lowest_common_ancestor(left, right), parent);
        assert_eq!(trees.effect_lowest_common_ancestor(deep, right), parent);
        assert_eq!(trees.effect_lowest_common_ancestor(deep, left), left);
        assert_eq!(
            trees.effect_lowest_common_ancestor(deep, EffectId::ROOT),
            EffectId::ROOT
        );
    }

    #[test]
    fn enclosing_scroll_walks_up_transforms() {
        let mut trees = PaintPropertyTrees::new();
        let scroll = trees.add_scroll(ScrollNode::new(
            ScrollId::ROOT,
            kurbo::Size::new(100.0, 100.0),
            kurbo::Size::new(100.0, 400.0),
        ));
        let translation = trees.add_transform(TransformNode::scroll_translation(
            TransformId::ROOT,
            scroll,
            kurbo::Vec2::new(0.0, 25.0),
        ));
        let inner = trees.add_transform(TransformNode::new(
            translation,
            Transform3d::from_scale(2.0, 2.0, 1.0),
        ));

        assert_eq!(trees.enclosing_scroll(inner), scroll);
        assert_eq!(trees.enclosing_scroll(translation), scroll);
        assert_eq!(trees.enclosing_scroll(TransformId::ROOT), ScrollId::ROOT);
    }

    #[test]
    #[should_panic(expected = "unknown ClipId")]
    fn foreign_id_panics() {
        let trees = PaintPropertyTrees::new();
        let _ = trees.clip(ClipId { idx: 5 });
    }

    #[test]
    #[should_panic(expected = "needs a parent")]
    fn parentless_node_panics() {
        let mut trees = PaintPropertyTrees::new();
        let mut node = rect_clip(ClipId::ROOT);
        node.parent = None;
        let _ = trees.add_clip(node);
    }
}
