// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display items and paint chunks.

use alloc::vec::Vec;
use core::ops::Range;

use kurbo::Rect;

use super::id::{ChunkId, ClipId, EffectId, TransformId};

/// The (transform, clip, effect) triple content was painted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyTreeState {
    /// Coordinate space.
    pub transform: TransformId,
    /// Innermost clip.
    pub clip: ClipId,
    /// Innermost effect.
    pub effect: EffectId,
}

impl PropertyTreeState {
    /// The state made of the three roots.
    pub const ROOT: Self = Self {
        transform: TransformId::ROOT,
        clip: ClipId::ROOT,
        effect: EffectId::ROOT,
    };

    /// Creates a state.
    #[inline]
    #[must_use]
    pub const fn new(transform: TransformId, clip: ClipId, effect: EffectId) -> Self {
        Self {
            transform,
            clip,
            effect,
        }
    }
}

/// An opaque recorded picture, replayed verbatim by the rasterizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintRecord {
    /// Producer-defined handle to the recorded drawing commands.
    pub id: u64,
    /// Bounds of the recording in its chunk's transform space.
    pub bounds: Rect,
}

/// What a display item contributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayItemKind {
    /// Drawing content.
    Drawing(PaintRecord),
    /// A hit-test region; produces no pixels.
    HitTest,
    /// A placeholder for content composited by a foreign layer.
    ForeignLayer,
}

/// A single display item in paint order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayItem {
    /// Producing client, for diagnostics.
    pub client: super::id::ClientId,
    /// Item payload.
    pub kind: DisplayItemKind,
}

impl DisplayItem {
    /// A drawing item.
    #[must_use]
    pub const fn drawing(client: u64, record: PaintRecord) -> Self {
        Self {
            client: super::id::ClientId(client),
            kind: DisplayItemKind::Drawing(record),
        }
    }

    /// Returns the recording if this is a drawing.
    #[must_use]
    pub fn record(&self) -> Option<&PaintRecord> {
        match &self.kind {
            DisplayItemKind::Drawing(record) => Some(record),
            DisplayItemKind::HitTest | DisplayItemKind::ForeignLayer => None,
        }
    }
}

/// A contiguous run of display items sharing one [`PropertyTreeState`].
#[derive(Clone, Debug, PartialEq)]
pub struct PaintChunk {
    /// Cross-frame identity; only meaningful when
    /// [`is_cacheable`](Self::is_cacheable).
    pub id: ChunkId,
    /// Whether `id` is stable across frames.
    pub is_cacheable: bool,
    /// Index range into the frame's display item list.
    pub items: Range<usize>,
    /// State the items were painted under.
    pub properties: PropertyTreeState,
    /// Union of the items' visual rects, in the chunk's transform space.
    pub bounds: Rect,
    /// Extra pixels around [`bounds`](Self::bounds) that raster effects
    /// (blurs, shadows) may touch.
    pub outset_for_raster_effects: f64,
    /// Item-level invalidations the producer found inside this chunk, in the
    /// chunk's transform space.
    pub raster_invalidation_rects: Vec<Rect>,
}

impl PaintChunk {
    /// A cacheable chunk with no invalidations and no outset.
    #[must_use]
    pub fn new(id: ChunkId, items: Range<usize>, properties: PropertyTreeState, bounds: Rect) -> Self {
        Self {
            id,
            is_cacheable: true,
            items,
            properties,
            bounds,
            outset_for_raster_effects: 0.0,
            raster_invalidation_rects: Vec::new(),
        }
    }
}

/// The painted output of one frame: display items and the chunks that
/// partition them.
#[derive(Clone, Debug, Default)]
pub struct PaintArtifact {
    /// All display items in paint order.
    pub items: Vec<DisplayItem>,
    /// Chunks in paint order; their item ranges tile `items`.
    pub chunks: Vec<PaintChunk>,
}

impl PaintArtifact {
    /// Returns the display items of `chunk`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk's range lies outside this artifact.
    #[must_use]
    pub fn items_in(&self, chunk: &PaintChunk) -> &[DisplayItem] {
        assert!(
            chunk.items.end <= self.items.len(),
            "chunk {:?} item range {:?} exceeds {} items",
            chunk.id,
            chunk.items,
            self.items.len()
        );
        &self.items[chunk.items.clone()]
    }
}

/// Why a region of a layer must be rerasterized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintInvalidationReason {
    /// Item-level change reported by the paint producer inside a chunk that
    /// otherwise matched in order.
    Incremental,
    /// The chunk has no stable identity and is always redrawn.
    ChunkUncacheable,
    /// A new chunk without an old counterpart.
    ChunkAppeared,
    /// An old chunk without a new counterpart.
    ChunkDisappeared,
    /// A chunk that moved relative to its siblings.
    ChunkReordered,
    /// The whole layer: its first frame, or its offset moved.
    FullLayer,
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn only_drawings_have_records() {
        let record = PaintRecord {
            id: 1,
            bounds: Rect::new(0.0, 0.0, 5.0, 5.0),
        };
        assert_eq!(DisplayItem::drawing(3, record).record(), Some(&record));
        let hit = DisplayItem {
            client: super::super::id::ClientId(3),
            kind: DisplayItemKind::HitTest,
        };
        assert_eq!(hit.record(), None);
    }

    #[test]
    #[should_panic(expected = "exceeds 1 items")]
    fn out_of_range_chunk_panics() {
        let record = PaintRecord {
            id: 1,
            bounds: Rect::ZERO,
        };
        let artifact = PaintArtifact {
            items: vec![DisplayItem::drawing(1, record)],
            chunks: Vec::new(),
        };
        let chunk = PaintChunk::new(
            ChunkId::new(1, 0),
            0..2,
            PropertyTreeState::ROOT,
            Rect::ZERO,
        );
        let _ = artifact.items_in(&chunk);
    }
}
