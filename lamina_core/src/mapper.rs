// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-to-compositor property tree mapping.
//!
//! A [`PropertyTreeMapper`] is created once per commit over a fresh
//! [`PropertyTrees`] set. It converts paint nodes to compositor nodes on
//! demand and memoizes the result, so every paint node maps to exactly one
//! compositor node for the lifetime of the mapper.
//!
//! Effects are special: the compositor effect tree is built by walking a
//! cursor through the paint effect tree with [`switch_to_effect`]. The
//! cursor keeps an explicit stack of open scopes. Rounded clips, which the
//! compositor cannot apply directly, are realized by pushing a *synthetic*
//! isolation group for each one; when that group closes a destination-in
//! mask node is emitted together with a [`SynthesizedClipLayer`] describing
//! the mask to draw.
//!
//! [`switch_to_effect`]: PropertyTreeMapper::switch_to_effect

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
#[cfg(debug_assertions)]
use hashbrown::HashSet;
use kurbo::{Rect, Size};
use peniko::{BlendMode, Compose, Mix};
use smallvec::SmallVec;

use crate::clip::ClipShape;
use crate::compositor::{self, ClipType, EffectKind, NodeId, PropertyTrees};
use crate::paint::{
    ClipId, ColorFilter, EffectId, ElementId, FilterList, FilterOperation, PaintPropertyTrees,
    PropertyTreeState, ScrollId, TransformId,
};
use crate::trace::{
    RenderSurfaceEvent, RenderSurfaceReason, SyntheticEffectEvent, SyntheticEffectKind, Tracer,
};
use crate::transform::Transform3d;

/// When real effect nodes get a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderSurfacePolicy {
    /// Omit the surface for opacity-only effects with a single normal-blend
    /// child, and add it back as soon as that stops being true.
    OmitWhenPossible,
    /// Give every real effect a surface.
    Always,
}

/// Configuration for a [`PropertyTreeMapper`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapperConfig {
    /// Device pixels per layout pixel, applied at the root transform.
    pub device_scale_factor: f64,
    /// Device viewport size, used as the root clip.
    pub viewport_size: Size,
    /// Render surface policy for real effects.
    pub render_surface_policy: RenderSurfacePolicy,
    /// Whether rounded clips are realized with synthesized masks. When off,
    /// rounded clips clip to their bounding rectangle.
    pub synthesize_rounded_clips: bool,
}

impl MapperConfig {
    /// Configuration for a viewport at the given scale.
    #[must_use]
    pub const fn new(viewport_size: Size, device_scale_factor: f64) -> Self {
        Self {
            device_scale_factor,
            viewport_size,
            render_surface_policy: RenderSurfacePolicy::OmitWhenPossible,
            synthesize_rounded_clips: true,
        }
    }

    /// Returns `self` with a different render surface policy.
    #[must_use]
    pub const fn with_render_surface_policy(mut self, policy: RenderSurfacePolicy) -> Self {
        self.render_surface_policy = policy;
        self
    }

    /// Returns `self` with rounded-clip synthesis turned off.
    #[must_use]
    pub const fn without_rounded_clip_synthesis(mut self) -> Self {
        self.synthesize_rounded_clips = false;
        self
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self::new(Size::ZERO, 1.0)
    }
}

/// Whether an open scope mirrors a paint effect or was synthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectStackKind {
    /// A real paint effect.
    Effect,
    /// An isolation group for a rounded clip.
    RoundedClip,
}

/// Cursor state saved when a scope is entered, restored when it is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectStackEntry {
    /// Kind of the scope that was entered.
    pub kind: EffectStackKind,
    /// Paint effect current before the scope.
    pub effect: EffectId,
    /// Paint clip current before the scope.
    pub clip: ClipId,
    /// Compositor effect current before the scope; the scope's parent.
    pub effect_id: NodeId,
}

/// A mask layer the rasterizer must draw to realize a rounded clip.
///
/// The layer is filled with [`shape`](Self::shape) in the clip's transform
/// space and composited with a destination-in blend through
/// [`effect_id`](Self::effect_id).
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizedClipLayer {
    /// Paint clip being realized.
    pub clip: ClipId,
    /// Mask geometry.
    pub shape: ClipShape,
    /// Compositor transform of the clip's space.
    pub transform_id: NodeId,
    /// Compositor clip node for the clip.
    pub clip_id: NodeId,
    /// The destination-in mask effect node.
    pub effect_id: NodeId,
    /// Scroll node the mask scrolls with.
    pub scroll_id: NodeId,
    /// Stable id of the isolation group being masked.
    pub mask_target_stable_id: ElementId,
    /// Stable id of the mask effect.
    pub mask_effect_stable_id: ElementId,
}

/// Compositor ids assigned to one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerNodeIds {
    /// Transform node.
    pub transform: NodeId,
    /// Clip node.
    pub clip: NodeId,
    /// Effect node, possibly synthetic.
    pub effect: NodeId,
    /// Scroll node.
    pub scroll: NodeId,
}

/// Destination-in compositing, used by clip masks and luminance masks.
#[must_use]
pub fn destination_in() -> BlendMode {
    BlendMode::new(Mix::Normal, Compose::DestIn)
}

/// Builds compositor property trees from paint property trees for one
/// commit.
///
/// # Usage
///
/// ```rust,ignore
/// let mut mapper = PropertyTreeMapper::new(config, &paint, &mut trees, seq, Tracer::none());
/// for layer in layers {
///     let ids = mapper.assign_layer(&layer.state);
///     // ...
/// }
/// let masks = mapper.finalize();
/// ```
pub struct PropertyTreeMapper<'a, 't> {
    config: MapperConfig,
    paint: &'a PaintPropertyTrees,
    trees: &'a mut PropertyTrees,
    sequence_number: u64,
    tracer: Tracer<'t>,

    transform_map: HashMap<TransformId, NodeId>,
    clip_map: HashMap<ClipId, NodeId>,
    scroll_map: HashMap<ScrollId, NodeId>,

    effect_stack: SmallVec<[EffectStackEntry; 8]>,
    current_effect: EffectId,
    current_clip: ClipId,
    current_effect_id: NodeId,

    mask_layers: Vec<SynthesizedClipLayer>,

    #[cfg(debug_assertions)]
    converted_effects: HashSet<EffectId>,
}

impl core::fmt::Debug for PropertyTreeMapper<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyTreeMapper")
            .field("config", &self.config)
            .field("sequence_number", &self.sequence_number)
            .field("current_effect", &self.current_effect)
            .field("current_clip", &self.current_clip)
            .field("current_effect_id", &self.current_effect_id)
            .field("depth", &self.effect_stack.len())
            .finish_non_exhaustive()
    }
}

impl<'a, 't> PropertyTreeMapper<'a, 't> {
    /// Clears `trees` and sets up the secondary roots the paint roots map to.
    pub fn new(
        config: MapperConfig,
        paint: &'a PaintPropertyTrees,
        trees: &'a mut PropertyTrees,
        sequence_number: u64,
        tracer: Tracer<'t>,
    ) -> Self {
        trees.sequence_number = sequence_number;
        trees.device_scale_factor = config.device_scale_factor;
        trees.viewport_size = config.viewport_size;

        let mut mapper = Self {
            config,
            paint,
            trees,
            sequence_number,
            tracer,
            transform_map: HashMap::new(),
            clip_map: HashMap::new(),
            scroll_map: HashMap::new(),
            effect_stack: SmallVec::new(),
            current_effect: EffectId::ROOT,
            current_clip: ClipId::ROOT,
            current_effect_id: NodeId::SECONDARY_ROOT,
            mask_layers: Vec::new(),
            #[cfg(debug_assertions)]
            converted_effects: HashSet::new(),
        };
        mapper.setup_root_transform_node();
        mapper.setup_root_clip_node();
        mapper.setup_root_effect_node();
        mapper.setup_root_scroll_node();
        mapper
    }

    fn setup_root_transform_node(&mut self) {
        let trees = &mut *self.trees;
        trees.transform_tree.clear();
        trees.element_id_to_transform_node.clear();
        let id = trees.transform_tree.insert(
            compositor::TransformNode {
                source_node_id: Some(NodeId::ROOT),
                ..compositor::TransformNode::default()
            },
            NodeId::ROOT,
        );
        debug_assert_eq!(id, NodeId::SECONDARY_ROOT, "secondary transform root");

        let scale = self.config.device_scale_factor;
        let to_screen = Transform3d::from_scale(scale, scale, 1.0);
        let from_screen = to_screen.inverse();
        debug_assert!(from_screen.is_some(), "device scale {scale} is not invertible");
        trees.to_screen = to_screen;
        trees.from_screen = from_screen.unwrap_or(Transform3d::IDENTITY);
        trees.transform_tree.set_needs_update(true);

        self.transform_map.insert(TransformId::ROOT, id);
    }

    fn setup_root_clip_node(&mut self) {
        let tree = &mut self.trees.clip_tree;
        tree.clear();
        let id = tree.insert(
            compositor::ClipNode {
                clip: ClipShape::Rect(Rect::from_origin_size(
                    kurbo::Point::ORIGIN,
                    self.config.viewport_size,
                )),
                transform_id: NodeId::ROOT,
                clip_type: ClipType::AppliesLocalClip,
            },
            NodeId::ROOT,
        );
        debug_assert_eq!(id, NodeId::SECONDARY_ROOT, "secondary clip root");
        self.clip_map.insert(ClipId::ROOT, id);
    }

    fn setup_root_effect_node(&mut self) {
        let trees = &mut *self.trees;
        trees.effect_tree.clear();
        trees.element_id_to_effect_node.clear();
        let id = trees.effect_tree.insert(
            compositor::EffectNode {
                transform_id: NodeId::ROOT,
                clip_id: NodeId::SECONDARY_ROOT,
                has_render_surface: true,
                ..compositor::EffectNode::default()
            },
            NodeId::ROOT,
        );
        debug_assert_eq!(id, NodeId::SECONDARY_ROOT, "secondary effect root");

        self.current_effect = EffectId::ROOT;
        self.current_clip = self.paint.effect(EffectId::ROOT).output_clip;
        self.current_effect_id = id;
    }

    fn setup_root_scroll_node(&mut self) {
        let trees = &mut *self.trees;
        trees.scroll_tree.clear();
        trees.element_id_to_scroll_node.clear();
        let id = trees.scroll_tree.insert(
            compositor::ScrollNode {
                transform_id: NodeId::SECONDARY_ROOT,
                ..compositor::ScrollNode::default()
            },
            NodeId::ROOT,
        );
        debug_assert_eq!(id, NodeId::SECONDARY_ROOT, "secondary scroll root");
        self.scroll_map.insert(ScrollId::ROOT, id);
    }

    // -- Accessors --

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Returns the commit sequence number.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Returns the compositor trees built so far.
    #[must_use]
    pub fn trees(&self) -> &PropertyTrees {
        self.trees
    }

    /// Returns the paint effect under the cursor.
    #[must_use]
    pub fn current_effect(&self) -> EffectId {
        self.current_effect
    }

    /// Returns the paint clip under the cursor.
    #[must_use]
    pub fn current_clip(&self) -> ClipId {
        self.current_clip
    }

    /// Returns the compositor effect under the cursor, possibly synthetic.
    #[must_use]
    pub fn current_effect_id(&self) -> NodeId {
        self.current_effect_id
    }

    /// Returns the open scopes, outermost first.
    #[must_use]
    pub fn effect_stack(&self) -> &[EffectStackEntry] {
        &self.effect_stack
    }

    /// Returns the mask layers emitted so far.
    #[must_use]
    pub fn mask_layers(&self) -> &[SynthesizedClipLayer] {
        &self.mask_layers
    }

    // -- Memoized node conversion --

    /// Returns the compositor transform node for `transform`, creating it and
    /// its ancestors on first use.
    ///
    /// A scroll translation also brings its scroll node up to date.
    pub fn ensure_transform_node(&mut self, transform: TransformId) -> NodeId {
        if let Some(&id) = self.transform_map.get(&transform) {
            return id;
        }
        let paint = self.paint;
        let node = paint.transform(transform);
        let parent_id = match node.parent {
            Some(parent) => self.ensure_transform_node(parent),
            None => NodeId::SECONDARY_ROOT,
        };

        let [x, y, z] = node.origin;
        let id = self.trees.transform_tree.insert(
            compositor::TransformNode {
                pre_local: Transform3d::from_translation(-x, -y, -z),
                local: node.matrix,
                post_local: Transform3d::from_translation(x, y, z),
                flattens_inherited_transform: node.flattens_inherited_transform,
                sorting_context_id: node.rendering_context_id,
                source_node_id: Some(parent_id),
                element_id: node.element_id,
                ..compositor::TransformNode::default()
            },
            parent_id,
        );
        if let Some(element) = node.element_id {
            self.trees.element_id_to_transform_node.insert(element, id);
        }
        let previous = self.transform_map.insert(transform, id);
        debug_assert!(previous.is_none(), "{transform:?} mapped twice");

        if node.scroll.is_some() {
            self.update_scroll_and_scroll_translation(transform, id);
        }
        id
    }

    /// Returns the compositor clip node for `clip`, creating it and its
    /// ancestors on first use.
    pub fn ensure_clip_node(&mut self, clip: ClipId) -> NodeId {
        if let Some(&id) = self.clip_map.get(&clip) {
            return id;
        }
        let paint = self.paint;
        let node = paint.clip(clip);
        let parent_id = match node.parent {
            Some(parent) => self.ensure_clip_node(parent),
            None => NodeId::SECONDARY_ROOT,
        };
        let transform_id = self.ensure_transform_node(node.local_transform_space);
        let id = self.trees.clip_tree.insert(
            compositor::ClipNode {
                clip: node.shape,
                transform_id,
                clip_type: ClipType::AppliesLocalClip,
            },
            parent_id,
        );
        let previous = self.clip_map.insert(clip, id);
        debug_assert!(previous.is_none(), "{clip:?} mapped twice");
        id
    }

    /// Returns the compositor scroll node for `scroll`, creating it and its
    /// ancestors on first use.
    pub fn ensure_scroll_node(&mut self, scroll: ScrollId) -> NodeId {
        if let Some(&id) = self.scroll_map.get(&scroll) {
            return id;
        }
        let paint = self.paint;
        let node = paint.scroll(scroll);
        let parent_id = match node.parent {
            Some(parent) => self.ensure_scroll_node(parent),
            None => NodeId::SECONDARY_ROOT,
        };
        let id = self.trees.scroll_tree.insert(
            compositor::ScrollNode {
                scrollable: true,
                container_bounds: node.container_bounds,
                bounds: node.bounds,
                user_scrollable_horizontal: node.user_scrollable_horizontal,
                user_scrollable_vertical: node.user_scrollable_vertical,
                main_thread_scrolling_reasons: node.main_thread_scrolling_reasons,
                element_id: node.element_id,
                ..compositor::ScrollNode::default()
            },
            parent_id,
        );
        if let Some(element) = node.element_id {
            self.trees.element_id_to_scroll_node.insert(element, id);
        }
        let previous = self.scroll_map.insert(scroll, id);
        debug_assert!(previous.is_none(), "{scroll:?} mapped twice");
        id
    }

    /// Moves a scroll translation's offset out of its matrix and into the
    /// paired scroll node.
    fn update_scroll_and_scroll_translation(&mut self, transform: TransformId, transform_id: NodeId) {
        let paint = self.paint;
        let node = paint.transform(transform);
        let Some(scroll) = node.scroll else {
            return;
        };
        let scroll_id = self.ensure_scroll_node(scroll);

        let trees = &mut *self.trees;
        let scroll_node = trees.scroll_tree.node_mut(scroll_id);
        scroll_node.transform_id = transform_id;
        if let Some(element) = node.element_id {
            scroll_node.element_id = Some(element);
            trees.element_id_to_scroll_node.insert(element, scroll_id);
        }

        debug_assert!(
            node.matrix.is_identity_or_2d_translation(),
            "scroll translation {transform:?} is not a 2-D translation"
        );
        let compositor_node = trees.transform_tree.node_mut(transform_id);
        compositor_node.scroll_offset = -node.matrix.translation_2d();
        compositor_node.local = Transform3d::IDENTITY;
        compositor_node.scrolls = true;
    }

    /// Ensures the scroll node enclosing `transform` and returns it.
    ///
    /// When `transform` is itself a scroll translation, the scroll node also
    /// receives the current offset and the paint scroll client.
    pub fn ensure_layer_scroll_mapping(&mut self, transform: TransformId) -> NodeId {
        let paint = self.paint;
        let scroll = paint.enclosing_scroll(transform);
        let scroll_id = self.ensure_scroll_node(scroll);
        if paint.transform(transform).scroll.is_none() {
            return scroll_id;
        }

        // Mapping the transform points the scroll node at it.
        self.ensure_transform_node(transform);
        let trees = &mut *self.trees;
        let transform_id = trees.scroll_tree.node(scroll_id).transform_id;
        let offset = trees.transform_tree.node(transform_id).scroll_offset;
        let scroll_node = trees.scroll_tree.node_mut(scroll_id);
        scroll_node.scroll_offset = offset;
        if let Some(client) = &paint.scroll(scroll).client {
            scroll_node.client = Some(client.clone());
        }
        scroll_id
    }

    /// Assigns compositor ids for a layer painted under `state`.
    pub fn assign_layer(&mut self, state: &PropertyTreeState) -> LayerNodeIds {
        let transform = self.ensure_transform_node(state.transform);
        let clip = self.ensure_clip_node(state.clip);
        let effect = self.switch_to_effect(state.effect, state.clip);
        let scroll = self.ensure_layer_scroll_mapping(state.transform);
        LayerNodeIds {
            transform,
            clip,
            effect,
            scroll,
        }
    }

    // -- Effect traversal --

    /// Moves the cursor to `next_effect` with `next_clip` as the innermost
    /// clip and returns the compositor effect content should attach to.
    ///
    /// Scopes not shared with `next_effect` are closed (flushing their clip
    /// masks), missing effect nodes are built, and synthetic isolation groups
    /// are opened for every rounded clip between the effect's output clip and
    /// `next_clip`.
    ///
    /// # Panics
    ///
    /// Panics if an effect along the way pairs a luminance color filter with
    /// anything but a destination-in blend and an empty filter list.
    pub fn switch_to_effect(&mut self, next_effect: EffectId, next_clip: ClipId) -> NodeId {
        let ancestor = self
            .paint
            .effect_lowest_common_ancestor(self.current_effect, next_effect);
        while self.current_effect != ancestor {
            debug_assert!(
                !self.effect_stack.is_empty(),
                "cursor at {:?} has no open scope to leave",
                self.current_effect
            );
            if self.effect_stack.is_empty() {
                break;
            }
            self.close_effect();
        }

        let newly_built = self.build_effect_nodes_recursively(next_effect);
        self.synthesize_effect_for_clip_if_needed(next_clip, BlendMode::default(), newly_built);
        self.current_effect_id
    }

    /// Closes every open scope and returns the mask layers.
    ///
    /// # Panics
    ///
    /// Panics if a scope is still open afterwards.
    #[must_use]
    pub fn finalize(mut self) -> Vec<SynthesizedClipLayer> {
        while !self.effect_stack.is_empty() {
            self.close_effect();
        }
        assert!(
            self.effect_stack.is_empty(),
            "effect stack not empty after finalize"
        );
        debug_assert_eq!(self.current_effect, EffectId::ROOT, "cursor did not return to root");
        self.mask_layers
    }

    fn is_current_effect_synthetic(&self) -> bool {
        self.effect_stack
            .last()
            .is_some_and(|entry| entry.kind == EffectStackKind::RoundedClip)
    }

    fn close_effect(&mut self) {
        let Some(&previous) = self.effect_stack.last() else {
            return;
        };

        // The exotic blend of a real effect is carried by the outermost
        // synthetic group it was nested in, so siblings cannot share it.
        let synthetic = self.is_current_effect_synthetic();
        let clear_synthetic_effects =
            !synthetic && self.paint.effect(self.current_effect).has_exotic_blend();

        if synthetic {
            self.emit_clip_mask_layer();
        }

        self.current_effect = previous.effect;
        self.current_clip = previous.clip;
        self.current_effect_id = previous.effect_id;
        self.effect_stack.pop();

        if clear_synthetic_effects {
            while self.is_current_effect_synthetic() {
                self.close_effect();
            }
        }
    }

    fn emit_clip_mask_layer(&mut self) {
        let paint = self.paint;
        let clip = self.current_clip;
        let clip_node = paint.clip(clip);
        let clip_id = self.ensure_clip_node(clip);
        let transform_id = self.ensure_transform_node(clip_node.local_transform_space);

        let mask_target = self.current_effect_id;
        let mask_target_stable_id = ElementId::synthesized_clip(clip, clip_node.element_id, 0);
        let mask_effect_stable_id = ElementId::synthesized_clip(clip, clip_node.element_id, 1);

        let mask_effect = self.trees.effect_tree.insert(
            compositor::EffectNode {
                stable_id: Some(mask_effect_stable_id),
                transform_id,
                clip_id,
                blend_mode: destination_in(),
                has_render_surface: true,
                kind: EffectKind::ClipMask,
                ..compositor::EffectNode::default()
            },
            mask_target,
        );
        self.trees.effect_tree.node_mut(mask_target).stable_id = Some(mask_target_stable_id);
        self.tracer.synthetic_effect(&SyntheticEffectEvent {
            clip,
            node: mask_effect,
            parent: mask_target,
            kind: SyntheticEffectKind::Mask,
        });

        let scroll_id = self.ensure_layer_scroll_mapping(clip_node.local_transform_space);
        self.mask_layers.push(SynthesizedClipLayer {
            clip,
            shape: clip_node.shape,
            transform_id,
            clip_id,
            effect_id: mask_effect,
            scroll_id,
            mask_target_stable_id,
            mask_effect_stable_id,
        });
    }

    /// Opens isolation groups for the rounded clips between the cursor clip
    /// and `target_clip`, and returns the blend mode left for the caller.
    ///
    /// A non-default `delegated_blend` first closes every open synthetic
    /// group so the blend sees the whole backdrop of the enclosing real
    /// effect, then moves onto the outermost new group.
    fn synthesize_effect_for_clip_if_needed(
        &mut self,
        target_clip: ClipId,
        delegated_blend: BlendMode,
        effect_is_newly_built: bool,
    ) -> BlendMode {
        let paint = self.paint;
        let mut delegated_blend = delegated_blend;

        if delegated_blend != BlendMode::default() {
            while self.is_current_effect_synthetic() {
                self.close_effect();
            }
            // The blend reads the backdrop of the enclosing real effect.
            self.enable_render_surface(self.current_effect_id, RenderSurfaceReason::ExoticBlendChild);
        } else {
            while !paint.clip_is_ancestor_or_self(self.current_clip, target_clip) {
                let synthetic = self.is_current_effect_synthetic();
                debug_assert!(
                    synthetic,
                    "{target_clip:?} does not descend from cursor clip {:?}",
                    self.current_clip
                );
                if !synthetic {
                    return delegated_blend;
                }
                self.close_effect();
            }

            // An existing effect is about to receive another child.
            if !effect_is_newly_built
                && !self.is_current_effect_synthetic()
                && paint.effect(self.current_effect).opacity != 1.0
            {
                self.enable_render_surface(self.current_effect_id, RenderSurfaceReason::AdditionalChild);
            }
        }

        let descends = paint.clip_is_ancestor_or_self(self.current_clip, target_clip);
        debug_assert!(
            descends,
            "{target_clip:?} does not descend from cursor clip {:?}",
            self.current_clip
        );
        if !descends || !self.config.synthesize_rounded_clips {
            return delegated_blend;
        }

        let mut pending: SmallVec<[ClipId; 4]> = SmallVec::new();
        let mut clip = target_clip;
        while clip != self.current_clip {
            let node = paint.clip(clip);
            if node.shape.is_rounded() {
                pending.push(clip);
            }
            match node.parent {
                Some(parent) => clip = parent,
                None => break,
            }
        }

        for &next_clip in pending.iter().rev() {
            let clip_id = self.ensure_clip_node(next_clip);
            let transform_id = self.ensure_transform_node(paint.clip(next_clip).local_transform_space);
            let parent = self.current_effect_id;
            let mask_target = self.trees.effect_tree.insert(
                compositor::EffectNode {
                    transform_id,
                    clip_id,
                    blend_mode: delegated_blend,
                    has_render_surface: true,
                    kind: EffectKind::ClipMaskIsolation,
                    ..compositor::EffectNode::default()
                },
                parent,
            );
            delegated_blend = BlendMode::default();
            self.tracer.synthetic_effect(&SyntheticEffectEvent {
                clip: next_clip,
                node: mask_target,
                parent,
                kind: SyntheticEffectKind::Isolation,
            });
            self.tracer.render_surface(&RenderSurfaceEvent {
                node: mask_target,
                effect: None,
                reason: RenderSurfaceReason::ClipMask,
            });

            self.effect_stack.push(EffectStackEntry {
                kind: EffectStackKind::RoundedClip,
                effect: self.current_effect,
                clip: self.current_clip,
                effect_id: self.current_effect_id,
            });
            self.current_clip = next_clip;
            self.current_effect_id = mask_target;
        }

        delegated_blend
    }

    /// Builds compositor nodes for `next_effect` and any unbuilt ancestors,
    /// leaving the cursor on it. Returns whether anything was built.
    fn build_effect_nodes_recursively(&mut self, next_effect: EffectId) -> bool {
        if next_effect == self.current_effect {
            return false;
        }
        let paint = self.paint;
        let node = paint.effect(next_effect);
        // Only the root lacks a parent, and the cursor always descends from it.
        let Some(parent) = node.parent else {
            return false;
        };

        let newly_built = self.build_effect_nodes_recursively(parent);
        debug_assert_eq!(
            parent, self.current_effect,
            "{next_effect:?} does not nest under the cursor effect"
        );

        #[cfg(debug_assertions)]
        {
            let fresh = self.converted_effects.insert(next_effect);
            debug_assert!(
                fresh,
                "malformed paint artifact: chunks under {next_effect:?} are not contiguous"
            );
        }

        let used_blend_mode =
            self.synthesize_effect_for_clip_if_needed(node.output_clip, node.blend_mode, newly_built);

        let output_clip_id = self.ensure_clip_node(node.output_clip);
        let transform_id = self.ensure_transform_node(node.local_transform_space);

        let filters = match node.color_filter {
            ColorFilter::None => node.filters.clone(),
            ColorFilter::LuminanceToAlpha => {
                assert!(
                    node.blend_mode == destination_in(),
                    "luminance color filter on {next_effect:?} requires a destination-in blend, got {:?}",
                    node.blend_mode
                );
                assert!(
                    node.filters.is_empty(),
                    "luminance color filter on {next_effect:?} cannot be combined with filters"
                );
                FilterList(vec![FilterOperation::LuminanceToAlpha])
            }
        };

        let surface_reason = if !node.filters.is_empty() {
            Some(RenderSurfaceReason::Filters)
        } else if used_blend_mode != BlendMode::default() {
            Some(RenderSurfaceReason::ExoticBlend)
        } else if self.config.render_surface_policy == RenderSurfacePolicy::Always {
            Some(RenderSurfaceReason::Forced)
        } else {
            None
        };

        let id = self.trees.effect_tree.insert(
            compositor::EffectNode {
                stable_id: node.element_id,
                transform_id,
                clip_id: output_clip_id,
                opacity: node.opacity,
                blend_mode: used_blend_mode,
                filters,
                has_render_surface: surface_reason.is_some(),
                kind: EffectKind::Paint,
            },
            self.current_effect_id,
        );
        if let Some(reason) = surface_reason {
            self.tracer.render_surface(&RenderSurfaceEvent {
                node: id,
                effect: Some(next_effect),
                reason,
            });
        }
        if let Some(element) = node.element_id {
            let previous = self.trees.element_id_to_effect_node.insert(element, id);
            debug_assert!(previous.is_none(), "{element:?} names two effect nodes");
        }

        self.effect_stack.push(EffectStackEntry {
            kind: EffectStackKind::Effect,
            effect: self.current_effect,
            clip: self.current_clip,
            effect_id: self.current_effect_id,
        });
        self.current_effect = next_effect;
        self.current_clip = node.output_clip;
        self.current_effect_id = id;
        true
    }

    fn enable_render_surface(&mut self, id: NodeId, reason: RenderSurfaceReason) {
        let node = self.trees.effect_tree.node_mut(id);
        if node.has_render_surface {
            return;
        }
        node.has_render_surface = true;
        let effect = (!node.is_synthetic() && id == self.current_effect_id).then_some(self.current_effect);
        self.tracer.render_surface(&RenderSurfaceEvent {
            node: id,
            effect,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use kurbo::{RoundedRect, Vec2};
    use peniko::Mix;

    use super::*;
    use crate::compositor::PropertyTree;
    use crate::paint::{
        ClipNode, EffectNode, ScrollClient, ScrollClientHandle, ScrollNode, TransformNode,
    };

    fn config() -> MapperConfig {
        MapperConfig::new(Size::new(800.0, 600.0), 2.0)
    }

    fn rect_clip(paint: &mut PaintPropertyTrees, parent: ClipId) -> ClipId {
        paint.add_clip(ClipNode::new(
            parent,
            TransformId::ROOT,
            ClipShape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
        ))
    }

    fn rounded_clip(paint: &mut PaintPropertyTrees, parent: ClipId) -> ClipId {
        paint.add_clip(ClipNode::new(
            parent,
            TransformId::ROOT,
            ClipShape::RoundedRect(RoundedRect::new(0.0, 0.0, 100.0, 100.0, 8.0)),
        ))
    }

    fn parents_precede_children<N>(tree: &PropertyTree<N>) -> bool {
        tree.iter()
            .all(|(id, parent, _)| parent.is_none_or(|parent| parent < id))
    }

    fn count_kind(trees: &PropertyTrees, kind: EffectKind) -> usize {
        trees
            .effect_tree
            .iter()
            .filter(|(_, _, node)| node.kind == kind)
            .count()
    }

    #[test]
    fn new_mapper_sets_up_secondary_roots() {
        let paint = PaintPropertyTrees::new();
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 7, Tracer::none());
        assert_eq!(mapper.ensure_transform_node(TransformId::ROOT), NodeId::SECONDARY_ROOT);
        assert_eq!(mapper.ensure_clip_node(ClipId::ROOT), NodeId::SECONDARY_ROOT);
        assert_eq!(mapper.ensure_scroll_node(ScrollId::ROOT), NodeId::SECONDARY_ROOT);
        assert_eq!(mapper.current_effect_id(), NodeId::SECONDARY_ROOT);
        assert!(mapper.finalize().is_empty());

        assert_eq!(trees.sequence_number, 7);
        assert_eq!(trees.transform_tree.len(), 2);
        assert_eq!(trees.clip_tree.len(), 2);
        assert_eq!(trees.effect_tree.len(), 2);
        assert_eq!(trees.scroll_tree.len(), 2);
        assert!(trees.effect_tree.node(NodeId::SECONDARY_ROOT).has_render_surface);
        assert_eq!(
            trees.clip_tree.node(NodeId::SECONDARY_ROOT).clip.rect(),
            Rect::new(0.0, 0.0, 800.0, 600.0)
        );
        assert_eq!(trees.to_screen.cols[0][0], 2.0);
        assert_eq!(trees.from_screen.cols[0][0], 0.5);
    }

    #[test]
    fn new_mapper_clears_previous_commit() {
        let mut paint = PaintPropertyTrees::new();
        let t = paint.add_transform(TransformNode::new(TransformId::ROOT, Transform3d::IDENTITY));
        let mut trees = PropertyTrees::new();
        {
            let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
            mapper.ensure_transform_node(t);
            let _ = mapper.finalize();
        }
        assert_eq!(trees.transform_tree.len(), 3);
        let mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 2, Tracer::none());
        let _ = mapper.finalize();
        assert_eq!(trees.transform_tree.len(), 2);
    }

    #[test]
    fn ensure_calls_are_memoized() {
        let mut paint = PaintPropertyTrees::new();
        let t = paint.add_transform(TransformNode::new(
            TransformId::ROOT,
            Transform3d::from_translation(5.0, 5.0, 0.0),
        ));
        let c = paint.add_clip(ClipNode::new(
            ClipId::ROOT,
            t,
            ClipShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
        ));
        let s = paint.add_scroll(ScrollNode::new(
            ScrollId::ROOT,
            Size::new(10.0, 10.0),
            Size::new(10.0, 50.0),
        ));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());

        let clip_id = mapper.ensure_clip_node(c);
        let transform_id = mapper.ensure_transform_node(t);
        let scroll_id = mapper.ensure_scroll_node(s);
        let counts = (
            mapper.trees().transform_tree.len(),
            mapper.trees().clip_tree.len(),
            mapper.trees().scroll_tree.len(),
        );
        assert_eq!(mapper.ensure_clip_node(c), clip_id);
        assert_eq!(mapper.ensure_transform_node(t), transform_id);
        assert_eq!(mapper.ensure_scroll_node(s), scroll_id);
        assert_eq!(
            counts,
            (
                mapper.trees().transform_tree.len(),
                mapper.trees().clip_tree.len(),
                mapper.trees().scroll_tree.len(),
            )
        );
        assert_eq!(mapper.trees().clip_tree.node(clip_id).transform_id, transform_id);
        let _ = mapper.finalize();
    }

    #[test]
    fn transform_decomposes_origin() {
        let mut paint = PaintPropertyTrees::new();
        let t = paint.add_transform(TransformNode {
            origin: [10.0, 20.0, 0.0],
            flattens_inherited_transform: false,
            rendering_context_id: 3,
            element_id: Some(ElementId(42)),
            ..TransformNode::new(TransformId::ROOT, Transform3d::from_scale(2.0, 2.0, 1.0))
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.ensure_transform_node(t);
        let _ = mapper.finalize();

        let node = trees.transform_tree.node(id);
        assert_eq!(node.pre_local.translation_2d(), Vec2::new(-10.0, -20.0));
        assert_eq!(node.post_local.translation_2d(), Vec2::new(10.0, 20.0));
        assert_eq!(node.local, Transform3d::from_scale(2.0, 2.0, 1.0));
        assert!(!node.flattens_inherited_transform);
        assert_eq!(node.sorting_context_id, 3);
        assert_eq!(node.source_node_id, Some(NodeId::SECONDARY_ROOT));
        assert_eq!(trees.transform_tree.parent(id), Some(NodeId::SECONDARY_ROOT));
        assert_eq!(trees.element_id_to_transform_node.get(&ElementId(42)), Some(&id));
        assert_eq!(node.to_parent(), paint.transform(t).local_matrix());
    }

    #[test]
    fn scroll_translation_moves_offset_into_scroll_node() {
        struct Nothing;
        impl ScrollClient for Nothing {
            fn did_scroll(&self, _offset: Vec2) {}
        }

        let mut paint = PaintPropertyTrees::new();
        let client = ScrollClientHandle::new(Arc::new(Nothing));
        let s = paint.add_scroll(ScrollNode {
            client: Some(client.clone()),
            ..ScrollNode::new(ScrollId::ROOT, Size::new(100.0, 100.0), Size::new(100.0, 400.0))
        });
        let t = paint.add_transform(TransformNode {
            element_id: Some(ElementId(5)),
            ..TransformNode::scroll_translation(TransformId::ROOT, s, Vec2::new(0.0, 30.0))
        });
        let inner = paint.add_transform(TransformNode::new(t, Transform3d::IDENTITY));

        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let transform_id = mapper.ensure_transform_node(t);
        let scroll_id = mapper.ensure_layer_scroll_mapping(t);
        assert_eq!(mapper.ensure_layer_scroll_mapping(inner), scroll_id);
        assert_eq!(mapper.ensure_layer_scroll_mapping(TransformId::ROOT), NodeId::SECONDARY_ROOT);
        let _ = mapper.finalize();

        let transform = trees.transform_tree.node(transform_id);
        assert!(transform.scrolls);
        assert!(transform.local.is_identity());
        assert_eq!(transform.scroll_offset, Vec2::new(0.0, 30.0));

        let scroll = trees.scroll_tree.node(scroll_id);
        assert!(scroll.scrollable);
        assert_eq!(scroll.transform_id, transform_id);
        assert_eq!(scroll.scroll_offset, Vec2::new(0.0, 30.0));
        assert_eq!(scroll.bounds, Size::new(100.0, 400.0));
        assert_eq!(scroll.client, Some(client));
        assert_eq!(trees.element_id_to_scroll_node.get(&ElementId(5)), Some(&scroll_id));
    }

    #[test]
    fn opacity_effect_over_rect_clip_omits_render_surface() {
        let mut paint = PaintPropertyTrees::new();
        let c = rect_clip(&mut paint, ClipId::ROOT);
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, c, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.switch_to_effect(e, c);
        assert!(mapper.finalize().is_empty());

        assert_eq!(trees.effect_tree.len(), 3);
        let node = trees.effect_tree.node(id);
        assert_eq!(node.opacity, 0.5);
        assert_eq!(node.blend_mode, BlendMode::default());
        assert!(!node.has_render_surface);
        assert_eq!(count_kind(&trees, EffectKind::ClipMaskIsolation), 0);
    }

    #[test]
    fn second_child_revokes_render_surface_omission() {
        let mut paint = PaintPropertyTrees::new();
        let c = rect_clip(&mut paint, ClipId::ROOT);
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, c, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let first = mapper.switch_to_effect(e, c);
        assert!(!mapper.trees().effect_tree.node(first).has_render_surface);
        let second = mapper.switch_to_effect(e, c);
        assert_eq!(first, second);
        assert!(mapper.trees().effect_tree.node(first).has_render_surface);
        let _ = mapper.finalize();
    }

    #[test]
    fn rounded_output_clip_gets_one_synthetic_mask() {
        let mut paint = PaintPropertyTrees::new();
        let c = rounded_clip(&mut paint, ClipId::ROOT);
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, c, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.switch_to_effect(e, c);
        assert_eq!(mapper.effect_stack().len(), 2);
        assert_eq!(mapper.effect_stack()[0].kind, EffectStackKind::RoundedClip);
        let masks = mapper.finalize();

        assert_eq!(count_kind(&trees, EffectKind::ClipMaskIsolation), 1);
        assert_eq!(count_kind(&trees, EffectKind::ClipMask), 1);
        let dest_in = trees
            .effect_tree
            .iter()
            .filter(|(_, _, node)| node.blend_mode == destination_in())
            .count();
        assert_eq!(dest_in, 1);

        assert_eq!(masks.len(), 1);
        let mask = &masks[0];
        assert_eq!(mask.clip, c);
        assert_eq!(mask.shape, paint.clip(c).shape);
        let isolation = trees.effect_tree.parent(id);
        assert_eq!(trees.effect_tree.parent(mask.effect_id), isolation);
        assert_eq!(
            isolation.map(|iso| trees.effect_tree.node(iso).stable_id),
            Some(Some(mask.mask_target_stable_id))
        );
        assert_eq!(
            trees.effect_tree.node(mask.effect_id).stable_id,
            Some(mask.mask_effect_stable_id)
        );
        assert!(parents_precede_children(&trees.effect_tree));
    }

    #[test]
    fn nested_rounded_clips_open_outermost_first() {
        let mut paint = PaintPropertyTrees::new();
        let outer = rounded_clip(&mut paint, ClipId::ROOT);
        let middle = rect_clip(&mut paint, outer);
        let inner = rounded_clip(&mut paint, middle);
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        mapper.switch_to_effect(EffectId::ROOT, inner);
        let clips: Vec<ClipId> = mapper.effect_stack().iter().map(|e| e.clip).collect();
        // Each entry saves the clip current before it opened.
        assert_eq!(clips, vec![ClipId::ROOT, outer]);
        assert_eq!(mapper.current_clip(), inner);

        // Moving back to the outer clip closes only the inner group.
        mapper.switch_to_effect(EffectId::ROOT, outer);
        assert_eq!(mapper.mask_layers().len(), 1);
        assert_eq!(mapper.mask_layers()[0].clip, inner);
        let masks = mapper.finalize();
        assert_eq!(masks.len(), 2);
        assert_eq!(masks[1].clip, outer);
    }

    #[test]
    fn exotic_blend_child_exits_synthetic_scopes() {
        let mut paint = PaintPropertyTrees::new();
        let r = rounded_clip(&mut paint, ClipId::ROOT);
        let p = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0));
        let x = paint.add_effect(EffectNode {
            blend_mode: BlendMode::new(Mix::Multiply, Compose::SrcOver),
            ..EffectNode::new(p, TransformId::ROOT, r, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());

        let p_id = mapper.switch_to_effect(p, r);
        // The cursor sits on the isolation group for `r`, under `p`.
        assert_ne!(p_id, NodeId::SECONDARY_ROOT);
        let p_node = mapper.effect_stack()[1].effect_id;
        assert!(!mapper.trees().effect_tree.node(p_node).has_render_surface);

        let x_id = mapper.switch_to_effect(x, r);
        // The first isolation group was flushed before `x` was built.
        assert_eq!(mapper.mask_layers().len(), 1);
        assert!(mapper.trees().effect_tree.node(p_node).has_render_surface);

        let trees_ref = mapper.trees();
        let x_node = trees_ref.effect_tree.node(x_id);
        assert_eq!(x_node.blend_mode, BlendMode::default());
        let holder = trees_ref.effect_tree.parent(x_id).unwrap();
        let holder = trees_ref.effect_tree.node(holder);
        assert_eq!(holder.kind, EffectKind::ClipMaskIsolation);
        assert_eq!(holder.blend_mode, BlendMode::new(Mix::Multiply, Compose::SrcOver));

        // Closing `x` also closes the group carrying its blend.
        let masks = mapper.finalize();
        assert_eq!(masks.len(), 2);
        assert!(parents_precede_children(&trees.effect_tree));
    }

    #[test]
    fn exotic_blend_without_rounded_clip_keeps_its_blend() {
        let mut paint = PaintPropertyTrees::new();
        let x = paint.add_effect(EffectNode {
            blend_mode: BlendMode::new(Mix::Screen, Compose::SrcOver),
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.switch_to_effect(x, ClipId::ROOT);
        let _ = mapper.finalize();
        let node = trees.effect_tree.node(id);
        assert_eq!(node.blend_mode, BlendMode::new(Mix::Screen, Compose::SrcOver));
        assert!(node.has_render_surface);
    }

    #[test]
    fn filters_force_render_surface() {
        let mut paint = PaintPropertyTrees::new();
        let e = paint.add_effect(EffectNode {
            filters: FilterList(vec![FilterOperation::Blur(4.0)]),
            element_id: Some(ElementId(11)),
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.switch_to_effect(e, ClipId::ROOT);
        let _ = mapper.finalize();
        let node = trees.effect_tree.node(id);
        assert!(node.has_render_surface);
        assert_eq!(node.filters, FilterList(vec![FilterOperation::Blur(4.0)]));
        assert_eq!(node.stable_id, Some(ElementId(11)));
        assert_eq!(trees.element_id_to_effect_node.get(&ElementId(11)), Some(&id));
    }

    #[test]
    fn luminance_mask_becomes_filter() {
        let mut paint = PaintPropertyTrees::new();
        let e = paint.add_effect(EffectNode {
            blend_mode: destination_in(),
            color_filter: ColorFilter::LuminanceToAlpha,
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let id = mapper.switch_to_effect(e, ClipId::ROOT);
        let _ = mapper.finalize();
        let node = trees.effect_tree.node(id);
        assert_eq!(node.filters, FilterList(vec![FilterOperation::LuminanceToAlpha]));
        assert_eq!(node.blend_mode, destination_in());
    }

    #[test]
    #[should_panic(expected = "requires a destination-in blend")]
    fn luminance_mask_with_normal_blend_panics() {
        let mut paint = PaintPropertyTrees::new();
        let e = paint.add_effect(EffectNode {
            color_filter: ColorFilter::LuminanceToAlpha,
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        mapper.switch_to_effect(e, ClipId::ROOT);
    }

    #[test]
    #[should_panic(expected = "cannot be combined with filters")]
    fn luminance_mask_with_filters_panics() {
        let mut paint = PaintPropertyTrees::new();
        let e = paint.add_effect(EffectNode {
            blend_mode: destination_in(),
            color_filter: ColorFilter::LuminanceToAlpha,
            filters: FilterList(vec![FilterOperation::Invert(1.0)]),
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        });
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        mapper.switch_to_effect(e, ClipId::ROOT);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "not contiguous")]
    fn revisiting_a_closed_effect_panics_in_debug() {
        let mut paint = PaintPropertyTrees::new();
        let a = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 0.5));
        let b = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        mapper.switch_to_effect(a, ClipId::ROOT);
        mapper.switch_to_effect(b, ClipId::ROOT);
        mapper.switch_to_effect(a, ClipId::ROOT);
    }

    #[test]
    fn siblings_share_their_common_ancestor() {
        let mut paint = PaintPropertyTrees::new();
        let parent = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 0.8));
        let a = paint.add_effect(EffectNode::new(parent, TransformId::ROOT, ClipId::ROOT, 0.5));
        let b = paint.add_effect(EffectNode::new(parent, TransformId::ROOT, ClipId::ROOT, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let a_id = mapper.switch_to_effect(a, ClipId::ROOT);
        let b_id = mapper.switch_to_effect(b, ClipId::ROOT);
        let parent_id = mapper.trees().effect_tree.parent(a_id);
        assert_eq!(mapper.trees().effect_tree.parent(b_id), parent_id);
        // A second child attached to the built parent.
        assert!(parent_id.is_some_and(|p| mapper.trees().effect_tree.node(p).has_render_surface));
        let _ = mapper.finalize();
        assert_eq!(trees.effect_tree.len(), 5);
        assert!(parents_precede_children(&trees.effect_tree));
        assert!(parents_precede_children(&trees.transform_tree));
        assert!(parents_precede_children(&trees.clip_tree));
    }

    #[test]
    fn disabled_synthesis_treats_rounded_clips_as_rects() {
        let mut paint = PaintPropertyTrees::new();
        let c = rounded_clip(&mut paint, ClipId::ROOT);
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, c, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(
            config().without_rounded_clip_synthesis(),
            &paint,
            &mut trees,
            1,
            Tracer::none(),
        );
        mapper.switch_to_effect(e, c);
        assert!(mapper.finalize().is_empty());
        assert_eq!(count_kind(&trees, EffectKind::ClipMaskIsolation), 0);
    }

    #[test]
    fn always_policy_forces_render_surface() {
        let mut paint = PaintPropertyTrees::new();
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 0.5));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(
            config().with_render_surface_policy(RenderSurfacePolicy::Always),
            &paint,
            &mut trees,
            1,
            Tracer::none(),
        );
        let id = mapper.switch_to_effect(e, ClipId::ROOT);
        let _ = mapper.finalize();
        assert!(trees.effect_tree.node(id).has_render_surface);
    }

    #[test]
    fn assign_layer_returns_all_ids() {
        let mut paint = PaintPropertyTrees::new();
        let t = paint.add_transform(TransformNode::new(
            TransformId::ROOT,
            Transform3d::from_translation(3.0, 4.0, 0.0),
        ));
        let c = paint.add_clip(ClipNode::new(
            ClipId::ROOT,
            t,
            ClipShape::Rect(Rect::new(0.0, 0.0, 5.0, 5.0)),
        ));
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, t, c, 0.25));
        let mut trees = PropertyTrees::new();
        let mut mapper = PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::none());
        let ids = mapper.assign_layer(&PropertyTreeState::new(t, c, e));
        assert_eq!(ids.transform, mapper.ensure_transform_node(t));
        assert_eq!(ids.clip, mapper.ensure_clip_node(c));
        assert_eq!(ids.scroll, NodeId::SECONDARY_ROOT);
        assert_eq!(mapper.trees().effect_tree.node(ids.effect).transform_id, ids.transform);
        let _ = mapper.finalize();
    }

    #[cfg(feature = "trace")]
    #[test]
    fn synthesis_is_traced() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Sink {
            synthetic: Vec<SyntheticEffectKind>,
            surfaces: Vec<RenderSurfaceReason>,
        }
        impl TraceSink for Sink {
            fn on_synthetic_effect(&mut self, e: &SyntheticEffectEvent) {
                self.synthetic.push(e.kind);
            }
            fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
                self.surfaces.push(e.reason);
            }
        }

        let mut paint = PaintPropertyTrees::new();
        let c = rounded_clip(&mut paint, ClipId::ROOT);
        let e = paint.add_effect(EffectNode {
            filters: FilterList(vec![FilterOperation::Sepia(1.0)]),
            ..EffectNode::new(EffectId::ROOT, TransformId::ROOT, c, 1.0)
        });
        let mut sink = Sink::default();
        let mut trees = PropertyTrees::new();
        let mapper = {
            let mut mapper =
                PropertyTreeMapper::new(config(), &paint, &mut trees, 1, Tracer::new(&mut sink));
            mapper.switch_to_effect(e, c);
            mapper
        };
        let _ = mapper.finalize();
        assert_eq!(
            sink.synthetic,
            vec![SyntheticEffectKind::Isolation, SyntheticEffectKind::Mask]
        );
        assert_eq!(
            sink.surfaces,
            vec![RenderSurfaceReason::ClipMask, RenderSurfaceReason::Filters]
        );
    }
}
