// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint property node payloads.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Size, Vec2};
use peniko::BlendMode;

use super::id::{ClipId, EffectId, ElementId, ScrollId, TransformId};
use crate::clip::ClipShape;
use crate::transform::Transform3d;

/// A transform node: the coordinate space its descendants paint in.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformNode {
    /// Parent space; `None` only for the root.
    pub parent: Option<TransformId>,
    /// Matrix applied about [`origin`](Self::origin).
    pub matrix: Transform3d,
    /// Transform origin in the parent space.
    pub origin: [f64; 3],
    /// Whether the inherited 3-D transform is flattened before applying
    /// this node.
    pub flattens_inherited_transform: bool,
    /// Nodes sharing a nonzero id are depth-sorted together.
    pub rendering_context_id: u32,
    /// Set when this node is the scroll translation of a scroller.
    pub scroll: Option<ScrollId>,
    /// Compositor element id, if the node is animated or scrolled.
    pub element_id: Option<ElementId>,
}

impl TransformNode {
    /// A node with the given matrix under `parent`, with no origin and
    /// flattening enabled.
    #[must_use]
    pub fn new(parent: TransformId, matrix: Transform3d) -> Self {
        Self {
            parent: Some(parent),
            matrix,
            origin: [0.0; 3],
            flattens_inherited_transform: true,
            rendering_context_id: 0,
            scroll: None,
            element_id: None,
        }
    }

    /// A scroll translation for `scroll` holding the negated scroll offset.
    #[must_use]
    pub fn scroll_translation(parent: TransformId, scroll: ScrollId, offset: Vec2) -> Self {
        Self {
            scroll: Some(scroll),
            ..Self::new(parent, Transform3d::from_translation(-offset.x, -offset.y, 0.0))
        }
    }

    /// Returns the matrix with the origin folded in.
    #[must_use]
    pub fn local_matrix(&self) -> Transform3d {
        self.matrix.about_origin(self.origin)
    }

    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            ..Self::new(TransformId::ROOT, Transform3d::IDENTITY)
        }
    }
}

/// A clip node: restricts descendants to a shape in some transform space.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipNode {
    /// Enclosing clip; `None` only for the root.
    pub parent: Option<ClipId>,
    /// Space [`shape`](Self::shape) is expressed in.
    pub local_transform_space: TransformId,
    /// Clip geometry.
    pub shape: ClipShape,
    /// Compositor element id, if any.
    pub element_id: Option<ElementId>,
}

impl ClipNode {
    /// A clip under `parent` in `space`.
    #[must_use]
    pub fn new(parent: ClipId, space: TransformId, shape: ClipShape) -> Self {
        Self {
            parent: Some(parent),
            local_transform_space: space,
            shape,
            element_id: None,
        }
    }

    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            local_transform_space: TransformId::ROOT,
            shape: ClipShape::INFINITE,
            element_id: None,
        }
    }
}

/// An opaque filter operation. Only the tag and parameters are carried; the
/// rasterizer executes them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOperation {
    /// `grayscale(amount)`.
    Grayscale(f32),
    /// `sepia(amount)`.
    Sepia(f32),
    /// `saturate(amount)`.
    Saturate(f32),
    /// `hue-rotate(degrees)`.
    HueRotate(f32),
    /// `invert(amount)`.
    Invert(f32),
    /// `opacity(amount)`.
    Opacity(f32),
    /// `brightness(amount)`.
    Brightness(f32),
    /// `contrast(amount)`.
    Contrast(f32),
    /// Gaussian blur with the given standard deviation.
    Blur(f32),
    /// Drop shadow.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Blur standard deviation.
        std_deviation: f32,
        /// Shadow color as `0xRRGGBBAA`.
        color: u32,
    },
    /// Luminance-to-alpha color matrix. Produced only from
    /// [`ColorFilter::LuminanceToAlpha`].
    LuminanceToAlpha,
    /// A reference to an externally defined filter graph.
    Reference(u32),
}

/// An ordered list of filter operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterList(pub Vec<FilterOperation>);

impl FilterList {
    /// Returns whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A color filter applied to an effect's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorFilter {
    /// No color filter.
    #[default]
    None,
    /// Converts luminance to alpha (mask-type luminance).
    LuminanceToAlpha,
}

/// An effect node: opacity, blending, filters, and grouping.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectNode {
    /// Enclosing effect; `None` only for the root.
    pub parent: Option<EffectId>,
    /// Space filters are evaluated in.
    pub local_transform_space: TransformId,
    /// Clip applied to the effect's output.
    pub output_clip: ClipId,
    /// Group opacity.
    pub opacity: f32,
    /// Blend mode used to composite the group onto its backdrop.
    pub blend_mode: BlendMode,
    /// Filters applied to the group.
    pub filters: FilterList,
    /// Color filter applied to the group.
    pub color_filter: ColorFilter,
    /// Origin filters are applied relative to, in the local transform space.
    pub filter_origin: Point,
    /// Compositor element id, if any.
    pub element_id: Option<ElementId>,
}

impl EffectNode {
    /// An opacity-only effect.
    #[must_use]
    pub fn new(parent: EffectId, space: TransformId, output_clip: ClipId, opacity: f32) -> Self {
        Self {
            parent: Some(parent),
            local_transform_space: space,
            output_clip,
            opacity,
            blend_mode: BlendMode::default(),
            filters: FilterList::default(),
            color_filter: ColorFilter::None,
            filter_origin: Point::ORIGIN,
            element_id: None,
        }
    }

    /// Returns whether the blend mode is anything but normal source-over.
    #[must_use]
    pub fn has_exotic_blend(&self) -> bool {
        self.blend_mode != BlendMode::default()
    }

    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            ..Self::new(EffectId::ROOT, TransformId::ROOT, ClipId::ROOT, 1.0)
        }
    }
}

/// Bit set of reasons a scroller must scroll on the main thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MainThreadScrollingReasons(pub u32);

impl MainThreadScrollingReasons {
    /// No reason; the compositor may scroll on its own.
    pub const NONE: Self = Self(0);
    /// Contains background-attachment: fixed content.
    pub const HAS_BACKGROUND_ATTACHMENT_FIXED: Self = Self(1 << 0);
    /// Contains non-layer viewport-constrained objects.
    pub const HAS_NON_LAYER_VIEWPORT_CONSTRAINED: Self = Self(1 << 1);
    /// Main thread has scroll event handlers that block scrolling.
    pub const THREADED_SCROLLING_DISABLED: Self = Self(1 << 2);

    /// Returns whether any reason is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }
}

impl core::ops::BitOr for MainThreadScrollingReasons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Receives scroll notifications for a scroller.
///
/// The compositor invokes this when it scrolls a node on its own, so the
/// paint side can update its offset.
pub trait ScrollClient: Send + Sync {
    /// The scroller's offset changed to `offset`.
    fn did_scroll(&self, offset: Vec2);
}

/// Shared handle to a [`ScrollClient`].
#[derive(Clone)]
pub struct ScrollClientHandle(pub Arc<dyn ScrollClient>);

impl ScrollClientHandle {
    /// Wraps a client.
    #[must_use]
    pub fn new(client: Arc<dyn ScrollClient>) -> Self {
        Self(client)
    }

    /// Forwards a scroll notification.
    pub fn did_scroll(&self, offset: Vec2) {
        self.0.did_scroll(offset);
    }
}

impl fmt::Debug for ScrollClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollClientHandle").finish_non_exhaustive()
    }
}

impl PartialEq for ScrollClientHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A scroll node: a scroll container and its scrollable contents.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollNode {
    /// Enclosing scroller; `None` only for the root.
    pub parent: Option<ScrollId>,
    /// Size of the visible viewport of the scroller.
    pub container_bounds: Size,
    /// Size of the scrollable contents.
    pub bounds: Size,
    /// Whether the user may scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// Whether the user may scroll vertically.
    pub user_scrollable_vertical: bool,
    /// Why scrolling must happen on the main thread, if at all.
    pub main_thread_scrolling_reasons: MainThreadScrollingReasons,
    /// Compositor element id, if any.
    pub element_id: Option<ElementId>,
    /// Notified when the compositor scrolls this node.
    pub client: Option<ScrollClientHandle>,
}

impl ScrollNode {
    /// A user-scrollable scroller under `parent`.
    #[must_use]
    pub fn new(parent: ScrollId, container_bounds: Size, bounds: Size) -> Self {
        Self {
            parent: Some(parent),
            container_bounds,
            bounds,
            user_scrollable_horizontal: true,
            user_scrollable_vertical: true,
            main_thread_scrolling_reasons: MainThreadScrollingReasons::NONE,
            element_id: None,
            client: None,
        }
    }

    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            user_scrollable_horizontal: false,
            user_scrollable_vertical: false,
            ..Self::new(ScrollId::ROOT, Size::ZERO, Size::ZERO)
        }
    }
}
