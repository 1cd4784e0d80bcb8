// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the commit pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! mapper, the raster invalidator, and the commit driver call as they make
//! decisions. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`RasterInvalidationEvent`] and
//!   the corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use kurbo::Rect;

use crate::compositor::NodeId;
#[cfg(feature = "trace-rich")]
use crate::paint::PaintInvalidationReason;
use crate::paint::{ChunkId, ClipId, EffectId, LayerKey};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a chunk fared in the old/new chunk diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkMatchOutcome {
    /// Matched the next expected old chunk; only item-level rects apply.
    InOrder,
    /// Matched an old chunk out of order.
    Reordered,
    /// New chunk with no old counterpart.
    Appeared,
    /// Old chunk with no new counterpart.
    Disappeared,
    /// Chunk without a stable identity.
    Uncacheable,
}

/// Which synthesized construct a [`SyntheticEffectEvent`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyntheticEffectKind {
    /// An isolation group opened beneath a rounded clip.
    Isolation,
    /// The destination-in mask emitted when the group closed.
    Mask,
}

/// Why a compositor effect node was given a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderSurfaceReason {
    /// The effect has filters.
    Filters,
    /// The effect composites with a non-default blend mode.
    ExoticBlend,
    /// A second child attached to an opacity-only effect.
    AdditionalChild,
    /// A child with a non-default blend mode needs the effect's backdrop.
    ExoticBlendChild,
    /// Rounded-clip isolation or mask node.
    ClipMask,
    /// The configuration forces a surface for every effect.
    Forced,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once per old or new chunk during raster invalidation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkMatchEvent {
    /// Layer being diffed.
    pub layer: LayerKey,
    /// Chunk identity.
    pub chunk: ChunkId,
    /// Position in the previous frame's chunk list, if any.
    pub old_index: Option<usize>,
    /// Position in this frame's chunk list, if any.
    pub new_index: Option<usize>,
    /// Match result.
    pub outcome: ChunkMatchOutcome,
}

/// A single layer-space invalidation rectangle.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterInvalidationEvent {
    /// Layer being invalidated.
    pub layer: LayerKey,
    /// Chunk responsible, or `None` for whole-layer invalidation.
    pub chunk: Option<ChunkId>,
    /// Invalidated rectangle in layer space.
    pub rect: Rect,
    /// Why the rectangle was invalidated.
    pub reason: PaintInvalidationReason,
}

/// Emitted when the mapper synthesizes an effect node for a rounded clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyntheticEffectEvent {
    /// Paint clip being realized.
    pub clip: ClipId,
    /// The new compositor effect node.
    pub node: NodeId,
    /// Its parent compositor effect node.
    pub parent: NodeId,
    /// Isolation group or mask.
    pub kind: SyntheticEffectKind,
}

/// Emitted whenever the mapper turns on an effect node's render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSurfaceEvent {
    /// Compositor effect node.
    pub node: NodeId,
    /// Paint effect it mirrors, if it is not synthetic.
    pub effect: Option<EffectId>,
    /// Why the surface is needed.
    pub reason: RenderSurfaceReason,
}

/// Per-commit totals produced by the commit driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Commit sequence number.
    pub sequence_number: u64,
    /// Layers committed.
    pub layers: usize,
    /// Compositor transform nodes, including roots.
    pub transform_nodes: usize,
    /// Compositor clip nodes, including roots.
    pub clip_nodes: usize,
    /// Compositor effect nodes, including roots.
    pub effect_nodes: usize,
    /// Compositor scroll nodes, including roots.
    pub scroll_nodes: usize,
    /// Synthesized clip-mask layers.
    pub mask_layers: usize,
    /// Invalidation rectangles across all layers.
    pub invalidations: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the commit pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called once per chunk classified by the raster invalidator.
    fn on_chunk_match(&mut self, e: &ChunkMatchEvent) {
        _ = e;
    }

    /// Called once per invalidation rectangle (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_raster_invalidation(&mut self, e: &RasterInvalidationEvent) {
        _ = e;
    }

    /// Called when a rounded-clip isolation group or mask is synthesized.
    fn on_synthetic_effect(&mut self, e: &SyntheticEffectEvent) {
        _ = e;
    }

    /// Called when an effect node gains a render surface.
    fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
        _ = e;
    }

    /// Called with per-commit totals.
    fn on_commit_summary(&mut self, s: &CommitSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns a shorter-lived tracer dispatching to the same sink.
    #[inline]
    #[must_use]
    pub fn reborrow(&mut self) -> Tracer<'_> {
        #[cfg(feature = "trace")]
        {
            match &mut self.sink {
                Some(sink) => {
                    let sink: &mut dyn TraceSink = &mut **sink;
                    Tracer { sink: Some(sink) }
                }
                None => Tracer { sink: None },
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            Tracer {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ChunkMatchEvent`].
    #[inline]
    pub fn chunk_match(&mut self, e: &ChunkMatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_chunk_match(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RasterInvalidationEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn raster_invalidation(&mut self, e: &RasterInvalidationEvent) {
        if let Some(s) = &mut self.sink {
            s.on_raster_invalidation(e);
        }
    }

    /// Emits a [`SyntheticEffectEvent`].
    #[inline]
    pub fn synthetic_effect(&mut self, e: &SyntheticEffectEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_synthetic_effect(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderSurfaceEvent`].
    #[inline]
    pub fn render_surface(&mut self, e: &RenderSurfaceEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_surface(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitSummary`].
    #[inline]
    pub fn commit_summary(&mut self, s: &CommitSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_commit_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
