// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor property node payloads.

use kurbo::{Size, Vec2};
use peniko::BlendMode;

use super::NodeId;
use crate::clip::ClipShape;
use crate::paint::{ElementId, FilterList, MainThreadScrollingReasons, ScrollClientHandle};
use crate::transform::Transform3d;

/// A compositor transform node.
///
/// The effective local transform is `post_local * local * pre_local`, where
/// the pre/post translations carry the paint node's transform origin.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformNode {
    /// Translation by the negated origin.
    pub pre_local: Transform3d,
    /// The paint node's matrix, or identity for scroll-driven nodes.
    pub local: Transform3d,
    /// Translation by the origin.
    pub post_local: Transform3d,
    /// Whether the inherited 3-D transform is flattened first.
    pub flattens_inherited_transform: bool,
    /// 3-D sorting context; zero means none.
    pub sorting_context_id: u32,
    /// Whether this node's translation is driven by [`scroll_offset`](Self::scroll_offset).
    pub scrolls: bool,
    /// Scroll offset replacing the translation in `local`.
    pub scroll_offset: Vec2,
    /// Node that `local` is expressed relative to.
    pub source_node_id: Option<NodeId>,
    /// Element id copied from the paint node.
    pub element_id: Option<ElementId>,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self {
            pre_local: Transform3d::IDENTITY,
            local: Transform3d::IDENTITY,
            post_local: Transform3d::IDENTITY,
            flattens_inherited_transform: true,
            sorting_context_id: 0,
            scrolls: false,
            scroll_offset: Vec2::ZERO,
            source_node_id: None,
            element_id: None,
        }
    }
}

impl TransformNode {
    /// Returns `post_local * local * pre_local`.
    #[must_use]
    pub fn to_parent(&self) -> Transform3d {
        self.post_local * self.local * self.pre_local
    }
}

/// How a clip node affects content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipType {
    /// The node does not clip (the real root).
    #[default]
    None,
    /// Content is clipped to the node's shape in its transform space.
    AppliesLocalClip,
}

/// A compositor clip node.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipNode {
    /// Clip geometry; rounded corners are carried but realized with masks.
    pub clip: ClipShape,
    /// Transform node the clip is expressed in.
    pub transform_id: NodeId,
    /// Clip mode.
    pub clip_type: ClipType,
}

impl Default for ClipNode {
    fn default() -> Self {
        Self {
            clip: ClipShape::INFINITE,
            transform_id: NodeId::ROOT,
            clip_type: ClipType::None,
        }
    }
}

/// Why a compositor effect node exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Mirrors a paint effect node (or is a root).
    #[default]
    Paint,
    /// Isolates content beneath a rounded clip so a mask can be applied.
    ClipMaskIsolation,
    /// Destination-in mask drawn over an isolation group.
    ClipMask,
}

/// A compositor effect node.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectNode {
    /// Cross-commit identity used by the compositor to match render surfaces.
    pub stable_id: Option<ElementId>,
    /// Transform node filters are evaluated in.
    pub transform_id: NodeId,
    /// Output clip.
    pub clip_id: NodeId,
    /// Group opacity.
    pub opacity: f32,
    /// Blend mode used to composite the group.
    pub blend_mode: BlendMode,
    /// Filters applied to the group.
    pub filters: FilterList,
    /// Whether the group renders into an intermediate surface.
    pub has_render_surface: bool,
    /// Why the node exists.
    pub kind: EffectKind,
}

impl Default for EffectNode {
    fn default() -> Self {
        Self {
            stable_id: None,
            transform_id: NodeId::ROOT,
            clip_id: NodeId::ROOT,
            opacity: 1.0,
            blend_mode: BlendMode::default(),
            filters: FilterList::default(),
            has_render_surface: false,
            kind: EffectKind::Paint,
        }
    }
}

impl EffectNode {
    /// Returns whether the node was created without a paint counterpart.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.kind != EffectKind::Paint
    }
}

/// A compositor scroll node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScrollNode {
    /// Whether this node scrolls at all (false for the roots).
    pub scrollable: bool,
    /// Size of the scroller's viewport.
    pub container_bounds: Size,
    /// Size of the scrollable contents.
    pub bounds: Size,
    /// Whether the user may scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// Whether the user may scroll vertically.
    pub user_scrollable_vertical: bool,
    /// Why scrolling must happen on the main thread.
    pub main_thread_scrolling_reasons: MainThreadScrollingReasons,
    /// The scroll translation transform node.
    pub transform_id: NodeId,
    /// Element id of the scroll translation.
    pub element_id: Option<ElementId>,
    /// Current scroll offset.
    pub scroll_offset: Vec2,
    /// Notified when the compositor scrolls this node.
    pub client: Option<ScrollClientHandle>,
}
