// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-side data model.
//!
//! The paint system describes inherited rendering state with four property
//! trees:
//!
//! - **Transform**: coordinate spaces (matrix about an origin, flattening,
//!   3-D sorting context, optional scroll association).
//! - **Clip**: rectangles or rounded rectangles in some transform space.
//! - **Effect**: opacity, blend mode, filters, and color filters, each with
//!   an output clip.
//! - **Scroll**: scroll containers and their scrollable bounds.
//!
//! Nodes live in a [`PaintPropertyTrees`] arena and are addressed by typed
//! ids ([`TransformId`], [`ClipId`], [`EffectId`], [`ScrollId`]). They are
//! immutable once added, so an id is a stable identity for the whole commit.
//!
//! Drawing content arrives as a [`PaintArtifact`]: display items in paint
//! order, partitioned into [`PaintChunk`]s that each share one exact
//! [`PropertyTreeState`].

mod chunk;
mod id;
mod node;
mod trees;

pub use chunk::{
    DisplayItem, DisplayItemKind, PaintArtifact, PaintChunk, PaintInvalidationReason, PaintRecord,
    PropertyTreeState,
};
pub use id::{ChunkId, ClientId, ClipId, EffectId, ElementId, LayerKey, ScrollId, TransformId};
pub use node::{
    ClipNode, ColorFilter, EffectNode, FilterList, FilterOperation, MainThreadScrollingReasons,
    ScrollClient, ScrollClientHandle, ScrollNode, TransformNode,
};
pub use trees::PaintPropertyTrees;
