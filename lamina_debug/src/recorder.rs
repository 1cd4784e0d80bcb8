// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use kurbo::Rect;
use lamina_core::compositor::NodeId;
use lamina_core::paint::{ChunkId, ClipId, EffectId, LayerKey, PaintInvalidationReason};
use lamina_core::trace::{
    ChunkMatchEvent, ChunkMatchOutcome, CommitSummary, RasterInvalidationEvent,
    RenderSurfaceEvent, RenderSurfaceReason, SyntheticEffectEvent, SyntheticEffectKind, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_CHUNK_MATCH: u8 = 1;
const TAG_RASTER_INVALIDATION: u8 = 2;
const TAG_SYNTHETIC_EFFECT: u8 = 3;
const TAG_RENDER_SURFACE: u8 = 4;
const TAG_COMMIT_SUMMARY: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u64(v as u64);
    }

    fn write_option_usize(&mut self, v: Option<usize>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_usize(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_chunk(&mut self, chunk: ChunkId) {
        self.write_u64(chunk.client.0);
        self.write_u16(chunk.kind);
    }

    fn write_rect(&mut self, r: Rect) {
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }
}

fn outcome_code(o: ChunkMatchOutcome) -> u8 {
    match o {
        ChunkMatchOutcome::InOrder => 0,
        ChunkMatchOutcome::Reordered => 1,
        ChunkMatchOutcome::Appeared => 2,
        ChunkMatchOutcome::Disappeared => 3,
        ChunkMatchOutcome::Uncacheable => 4,
    }
}

fn reason_code(r: PaintInvalidationReason) -> u8 {
    match r {
        PaintInvalidationReason::Incremental => 0,
        PaintInvalidationReason::ChunkUncacheable => 1,
        PaintInvalidationReason::ChunkAppeared => 2,
        PaintInvalidationReason::ChunkDisappeared => 3,
        PaintInvalidationReason::ChunkReordered => 4,
        PaintInvalidationReason::FullLayer => 5,
    }
}

fn surface_code(r: RenderSurfaceReason) -> u8 {
    match r {
        RenderSurfaceReason::Filters => 0,
        RenderSurfaceReason::ExoticBlend => 1,
        RenderSurfaceReason::AdditionalChild => 2,
        RenderSurfaceReason::ExoticBlendChild => 3,
        RenderSurfaceReason::ClipMask => 4,
        RenderSurfaceReason::Forced => 5,
    }
}

impl TraceSink for RecorderSink {
    fn on_chunk_match(&mut self, e: &ChunkMatchEvent) {
        self.write_u8(TAG_CHUNK_MATCH);
        self.write_u64(e.layer.0);
        self.write_chunk(e.chunk);
        self.write_option_usize(e.old_index);
        self.write_option_usize(e.new_index);
        self.write_u8(outcome_code(e.outcome));
    }

    fn on_raster_invalidation(&mut self, e: &RasterInvalidationEvent) {
        self.write_u8(TAG_RASTER_INVALIDATION);
        self.write_u64(e.layer.0);
        match e.chunk {
            Some(chunk) => {
                self.write_u8(1);
                self.write_chunk(chunk);
            }
            None => {
                self.write_u8(0);
                self.write_chunk(ChunkId::new(0, 0));
            }
        }
        self.write_rect(e.rect);
        self.write_u8(reason_code(e.reason));
    }

    fn on_synthetic_effect(&mut self, e: &SyntheticEffectEvent) {
        self.write_u8(TAG_SYNTHETIC_EFFECT);
        self.write_u32(e.clip.index());
        self.write_u32(e.node.0);
        self.write_u32(e.parent.0);
        self.write_u8(match e.kind {
            SyntheticEffectKind::Isolation => 0,
            SyntheticEffectKind::Mask => 1,
        });
    }

    fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
        self.write_u8(TAG_RENDER_SURFACE);
        self.write_u32(e.node.0);
        match e.effect {
            Some(effect) => {
                self.write_u8(1);
                self.write_u32(effect.index());
            }
            None => {
                self.write_u8(0);
                self.write_u32(0);
            }
        }
        self.write_u8(surface_code(e.reason));
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.write_u8(TAG_COMMIT_SUMMARY);
        self.write_u64(s.sequence_number);
        self.write_usize(s.layers);
        self.write_usize(s.transform_nodes);
        self.write_usize(s.clip_nodes);
        self.write_usize(s.effect_nodes);
        self.write_usize(s.scroll_nodes);
        self.write_usize(s.mask_layers);
        self.write_usize(s.invalidations);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`ChunkMatchEvent`].
    ChunkMatch(ChunkMatchEvent),
    /// A [`RasterInvalidationEvent`].
    RasterInvalidation(RasterInvalidationEvent),
    /// A [`SyntheticEffectEvent`].
    SyntheticEffect(SyntheticEffectEvent),
    /// A [`RenderSurfaceEvent`].
    RenderSurface(RenderSurfaceEvent),
    /// A [`CommitSummary`].
    CommitSummary(CommitSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.remaining() < N {
            return None;
        }
        let v = self.data[self.pos..self.pos + N].try_into().ok()?;
        self.pos += N;
        Some(v)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[v]| v)
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    fn read_usize(&mut self) -> Option<usize> {
        usize::try_from(self.read_u64()?).ok()
    }

    fn read_option_usize(&mut self) -> Option<Option<usize>> {
        let present = self.read_u8()?;
        let val = self.read_usize()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_chunk(&mut self) -> Option<ChunkId> {
        let client = self.read_u64()?;
        let kind = self.read_u16()?;
        Some(ChunkId::new(client, kind))
    }

    fn read_rect(&mut self) -> Option<Rect> {
        Some(Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    fn read_outcome(&mut self) -> Option<ChunkMatchOutcome> {
        Some(match self.read_u8()? {
            0 => ChunkMatchOutcome::InOrder,
            1 => ChunkMatchOutcome::Reordered,
            2 => ChunkMatchOutcome::Appeared,
            3 => ChunkMatchOutcome::Disappeared,
            _ => ChunkMatchOutcome::Uncacheable,
        })
    }

    fn read_reason(&mut self) -> Option<PaintInvalidationReason> {
        Some(match self.read_u8()? {
            0 => PaintInvalidationReason::Incremental,
            1 => PaintInvalidationReason::ChunkUncacheable,
            2 => PaintInvalidationReason::ChunkAppeared,
            3 => PaintInvalidationReason::ChunkDisappeared,
            4 => PaintInvalidationReason::ChunkReordered,
            _ => PaintInvalidationReason::FullLayer,
        })
    }

    fn read_surface_reason(&mut self) -> Option<RenderSurfaceReason> {
        Some(match self.read_u8()? {
            0 => RenderSurfaceReason::Filters,
            1 => RenderSurfaceReason::ExoticBlend,
            2 => RenderSurfaceReason::AdditionalChild,
            3 => RenderSurfaceReason::ExoticBlendChild,
            4 => RenderSurfaceReason::ClipMask,
            _ => RenderSurfaceReason::Forced,
        })
    }

    fn decode_chunk_match(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ChunkMatch(ChunkMatchEvent {
            layer: LayerKey(self.read_u64()?),
            chunk: self.read_chunk()?,
            old_index: self.read_option_usize()?,
            new_index: self.read_option_usize()?,
            outcome: self.read_outcome()?,
        }))
    }

    fn decode_raster_invalidation(&mut self) -> Option<RecordedEvent> {
        let layer = LayerKey(self.read_u64()?);
        let present = self.read_u8()?;
        let chunk = self.read_chunk()?;
        Some(RecordedEvent::RasterInvalidation(RasterInvalidationEvent {
            layer,
            chunk: (present != 0).then_some(chunk),
            rect: self.read_rect()?,
            reason: self.read_reason()?,
        }))
    }

    fn decode_synthetic_effect(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SyntheticEffect(SyntheticEffectEvent {
            clip: ClipId::from_index(self.read_u32()?),
            node: NodeId(self.read_u32()?),
            parent: NodeId(self.read_u32()?),
            kind: if self.read_u8()? == 0 {
                SyntheticEffectKind::Isolation
            } else {
                SyntheticEffectKind::Mask
            },
        }))
    }

    fn decode_render_surface(&mut self) -> Option<RecordedEvent> {
        let node = NodeId(self.read_u32()?);
        let present = self.read_u8()?;
        let effect = EffectId::from_index(self.read_u32()?);
        Some(RecordedEvent::RenderSurface(RenderSurfaceEvent {
            node,
            effect: (present != 0).then_some(effect),
            reason: self.read_surface_reason()?,
        }))
    }

    fn decode_commit_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitSummary(CommitSummary {
            sequence_number: self.read_u64()?,
            layers: self.read_usize()?,
            transform_nodes: self.read_usize()?,
            clip_nodes: self.read_usize()?,
            effect_nodes: self.read_usize()?,
            scroll_nodes: self.read_usize()?,
            mask_layers: self.read_usize()?,
            invalidations: self.read_usize()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_CHUNK_MATCH => self.decode_chunk_match(),
            TAG_RASTER_INVALIDATION => self.decode_raster_invalidation(),
            TAG_SYNTHETIC_EFFECT => self.decode_synthetic_effect(),
            TAG_RENDER_SURFACE => self.decode_render_surface(),
            TAG_COMMIT_SUMMARY => self.decode_commit_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
