// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster invalidation between two frames of one layer.
//!
//! A [`RasterInvalidator`] remembers the previous frame's chunks of a layer,
//! already mapped into layer space, and diffs them against the next frame's
//! chunks. Chunks are matched by [`ChunkId`]. A chunk that keeps its place
//! relative to the other matched chunks only contributes the item-level
//! rects the paint producer reported; everything else invalidates whole
//! chunk bounds.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::{Rect, Vec2};
use lamina_core::geometry::GeometryMapper;
use lamina_core::paint::{
    ChunkId, LayerKey, PaintChunk, PaintInvalidationReason, PaintPropertyTrees,
    PropertyTreeState,
};
#[cfg(feature = "trace-rich")]
use lamina_core::trace::RasterInvalidationEvent;
use lamina_core::trace::{ChunkMatchEvent, ChunkMatchOutcome, Tracer};

/// A chunk from a previous frame, reduced to what matching needs.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkInfo {
    /// Cross-frame identity.
    pub id: ChunkId,
    /// Whether `id` is stable across frames.
    pub is_cacheable: bool,
    /// Chunk bounds in layer space, clipped to the layer.
    pub bounds_in_layer: Rect,
    /// Item-level invalidations in layer space, clipped to the layer.
    pub item_rects_in_layer: Vec<Rect>,
}

/// A layer-space rect that must be rerasterized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterInvalidation {
    /// Region in layer space.
    pub rect: Rect,
    /// Why the region is invalid.
    pub reason: PaintInvalidationReason,
    /// Chunk responsible, if any.
    pub chunk: Option<ChunkId>,
}

/// Geometry of one frame of a layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerGeometry {
    /// State the layer is composited under.
    pub state: PropertyTreeState,
    /// Layer origin in the layer transform space.
    pub offset: Vec2,
    /// Layer bounds in layer space.
    pub bounds: Rect,
}

/// Cross-frame invalidation state for one layer.
#[derive(Clone, Debug)]
pub struct RasterInvalidator {
    layer: LayerKey,
    old_chunks: Vec<ChunkInfo>,
    old_offset: Vec2,
    old_bounds: Rect,
    has_previous_frame: bool,
}

impl RasterInvalidator {
    /// Creates an invalidator for a layer that has not been painted yet.
    #[must_use]
    pub fn new(layer: LayerKey) -> Self {
        Self {
            layer,
            old_chunks: Vec::new(),
            old_offset: Vec2::ZERO,
            old_bounds: Rect::ZERO,
            has_previous_frame: false,
        }
    }

    /// Returns the layer this invalidator tracks.
    #[must_use]
    pub fn layer(&self) -> LayerKey {
        self.layer
    }

    /// Returns the chunks remembered from the last frame.
    #[must_use]
    pub fn old_chunks(&self) -> &[ChunkInfo] {
        &self.old_chunks
    }

    /// Forgets the previous frame; the next call to
    /// [`generate`](Self::generate) invalidates the whole layer.
    pub fn reset(&mut self) {
        self.old_chunks.clear();
        self.has_previous_frame = false;
    }

    /// Diffs `chunks` against the previous frame and returns the rects to
    /// rerasterize, then remembers `chunks` for the next frame.
    pub fn generate(
        &mut self,
        paint: &PaintPropertyTrees,
        chunks: &[PaintChunk],
        layer: &LayerGeometry,
        tracer: &mut Tracer<'_>,
    ) -> Vec<RasterInvalidation> {
        let geometry = GeometryMapper::new(paint);
        let new_chunks: Vec<ChunkInfo> = chunks
            .iter()
            .map(|chunk| map_chunk(&geometry, chunk, layer))
            .collect();

        let mut out = Invalidations {
            layer: self.layer,
            rects: Vec::new(),
        };
        if !self.has_previous_frame {
            out.add(layer.bounds, PaintInvalidationReason::FullLayer, None, tracer);
        } else if layer.offset != self.old_offset {
            out.add(self.old_bounds, PaintInvalidationReason::FullLayer, None, tracer);
            out.add(layer.bounds, PaintInvalidationReason::FullLayer, None, tracer);
        } else {
            self.match_chunks(&new_chunks, &mut out, tracer);
        }

        self.old_chunks = new_chunks;
        self.old_offset = layer.offset;
        self.old_bounds = layer.bounds;
        self.has_previous_frame = true;
        out.rects
    }

    fn match_chunks(
        &self,
        new_chunks: &[ChunkInfo],
        out: &mut Invalidations,
        tracer: &mut Tracer<'_>,
    ) {
        let old_chunks = &self.old_chunks;
        let mut consumed = vec![false; old_chunks.len()];

        for (i, old) in old_chunks.iter().enumerate() {
            if !old.is_cacheable {
                out.chunk_match(old.id, Some(i), None, ChunkMatchOutcome::Uncacheable, tracer);
                out.add(
                    old.bounds_in_layer,
                    PaintInvalidationReason::ChunkUncacheable,
                    Some(old.id),
                    tracer,
                );
                consumed[i] = true;
            }
        }

        let new_ids: HashSet<ChunkId> = new_chunks
            .iter()
            .filter(|chunk| chunk.is_cacheable)
            .map(|chunk| chunk.id)
            .collect();

        // Both only move forward: consumed flags are never cleared.
        let mut first_unmatched = 0;
        let mut old_index = 0;
        let mut highest_match: Option<usize> = None;

        for (j, new) in new_chunks.iter().enumerate() {
            if !new.is_cacheable {
                out.chunk_match(new.id, None, Some(j), ChunkMatchOutcome::Uncacheable, tracer);
                out.add(
                    new.bounds_in_layer,
                    PaintInvalidationReason::ChunkUncacheable,
                    Some(new.id),
                    tracer,
                );
                continue;
            }

            while first_unmatched < old_chunks.len()
                && (consumed[first_unmatched] || !new_ids.contains(&old_chunks[first_unmatched].id))
            {
                first_unmatched += 1;
            }

            let Some(matched) = find_match(old_chunks, &consumed, new.id, old_index) else {
                out.chunk_match(new.id, None, Some(j), ChunkMatchOutcome::Appeared, tracer);
                out.add(
                    new.bounds_in_layer,
                    PaintInvalidationReason::ChunkAppeared,
                    Some(new.id),
                    tracer,
                );
                continue;
            };
            debug_assert!(!consumed[matched], "old chunk {matched} matched twice");
            consumed[matched] = true;
            let old = &old_chunks[matched];

            let in_order = matched == first_unmatched && highest_match.is_none_or(|h| matched > h);
            if in_order {
                out.chunk_match(new.id, Some(matched), Some(j), ChunkMatchOutcome::InOrder, tracer);
                for &rect in &new.item_rects_in_layer {
                    out.add(rect, PaintInvalidationReason::Incremental, Some(new.id), tracer);
                }
            } else {
                out.chunk_match(new.id, Some(matched), Some(j), ChunkMatchOutcome::Reordered, tracer);
                out.add(
                    old.bounds_in_layer,
                    PaintInvalidationReason::ChunkReordered,
                    Some(old.id),
                    tracer,
                );
                if new.bounds_in_layer != old.bounds_in_layer {
                    out.add(
                        new.bounds_in_layer,
                        PaintInvalidationReason::ChunkReordered,
                        Some(new.id),
                        tracer,
                    );
                }
            }

            highest_match = Some(highest_match.map_or(matched, |h| h.max(matched)));
            old_index = matched + 1;
        }

        for (i, old) in old_chunks.iter().enumerate() {
            if !consumed[i] {
                out.chunk_match(old.id, Some(i), None, ChunkMatchOutcome::Disappeared, tracer);
                out.add(
                    old.bounds_in_layer,
                    PaintInvalidationReason::ChunkDisappeared,
                    Some(old.id),
                    tracer,
                );
            }
        }
    }
}

/// Finds an unconsumed cacheable old chunk with `id`, scanning circularly
/// from `start`.
fn find_match(old_chunks: &[ChunkInfo], consumed: &[bool], id: ChunkId, start: usize) -> Option<usize> {
    let len = old_chunks.len();
    (0..len)
        .map(|step| (start + step) % len)
        .find(|&i| !consumed[i] && old_chunks[i].is_cacheable && old_chunks[i].id == id)
}

fn map_chunk(geometry: &GeometryMapper<'_>, chunk: &PaintChunk, layer: &LayerGeometry) -> ChunkInfo {
    let map = |rect: Rect| map_rect_to_layer(geometry, rect, chunk, layer);
    ChunkInfo {
        id: chunk.id,
        is_cacheable: chunk.is_cacheable,
        bounds_in_layer: map(chunk.bounds),
        item_rects_in_layer: chunk
            .raster_invalidation_rects
            .iter()
            .map(|&rect| map(rect))
            .filter(|rect| !rect.is_zero_area())
            .collect(),
    }
}

/// Maps a rect in the chunk's transform space into layer space: projected
/// into the layer transform space, clipped by the clips between the chunk
/// and the layer, outset for raster effects, shifted by the layer offset,
/// and clipped to the layer bounds.
#[must_use]
pub fn map_rect_to_layer(
    geometry: &GeometryMapper<'_>,
    rect: Rect,
    chunk: &PaintChunk,
    layer: &LayerGeometry,
) -> Rect {
    let visual = geometry.visual_rect_in_ancestor_space(rect, &chunk.properties, &layer.state);
    if visual.is_zero_area() {
        return Rect::ZERO;
    }
    let outset = chunk.outset_for_raster_effects;
    let in_layer = (visual.inflate(outset, outset) - layer.offset).intersect(layer.bounds);
    if in_layer.is_zero_area() {
        Rect::ZERO
    } else {
        in_layer
    }
}

struct Invalidations {
    layer: LayerKey,
    rects: Vec<RasterInvalidation>,
}

impl Invalidations {
    fn add(
        &mut self,
        rect: Rect,
        reason: PaintInvalidationReason,
        chunk: Option<ChunkId>,
        tracer: &mut Tracer<'_>,
    ) {
        if rect.is_zero_area() {
            return;
        }
        #[cfg(feature = "trace-rich")]
        tracer.raster_invalidation(&RasterInvalidationEvent {
            layer: self.layer,
            chunk,
            rect,
            reason,
        });
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = tracer;
        }
        self.rects.push(RasterInvalidation {
            rect,
            reason,
            chunk,
        });
    }

    fn chunk_match(
        &self,
        chunk: ChunkId,
        old_index: Option<usize>,
        new_index: Option<usize>,
        outcome: ChunkMatchOutcome,
        tracer: &mut Tracer<'_>,
    ) {
        tracer.chunk_match(&ChunkMatchEvent {
            layer: self.layer,
            chunk,
            old_index,
            new_index,
            outcome,
        });
    }
}
