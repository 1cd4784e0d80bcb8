// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    ChunkMatchEvent, ChunkMatchOutcome, CommitSummary, RasterInvalidationEvent,
    RenderSurfaceEvent, SyntheticEffectEvent, SyntheticEffectKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn outcome_name(outcome: ChunkMatchOutcome) -> &'static str {
    match outcome {
        ChunkMatchOutcome::InOrder => "in-order",
        ChunkMatchOutcome::Reordered => "reordered",
        ChunkMatchOutcome::Appeared => "appeared",
        ChunkMatchOutcome::Disappeared => "disappeared",
        ChunkMatchOutcome::Uncacheable => "uncacheable",
    }
}

fn index(i: Option<usize>) -> String {
    i.map_or_else(|| "-".to_owned(), |i| i.to_string())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_chunk_match(&mut self, e: &ChunkMatchEvent) {
        let _ = writeln!(
            self.writer,
            "[chunk] layer={} {:?} {} old={} new={}",
            e.layer.0,
            e.chunk,
            outcome_name(e.outcome),
            index(e.old_index),
            index(e.new_index),
        );
    }

    fn on_raster_invalidation(&mut self, e: &RasterInvalidationEvent) {
        let chunk = e
            .chunk
            .map_or_else(|| "layer".to_owned(), |c| format!("{c:?}"));
        let _ = writeln!(
            self.writer,
            "[invalidate] layer={} {chunk} {:?} rect=({:.1},{:.1})-({:.1},{:.1})",
            e.layer.0, e.reason, e.rect.x0, e.rect.y0, e.rect.x1, e.rect.y1,
        );
    }

    fn on_synthetic_effect(&mut self, e: &SyntheticEffectEvent) {
        let kind = match e.kind {
            SyntheticEffectKind::Isolation => "isolation",
            SyntheticEffectKind::Mask => "mask",
        };
        let _ = writeln!(
            self.writer,
            "[synthetic] {kind} for {:?} node={} parent={}",
            e.clip, e.node.0, e.parent.0,
        );
    }

    fn on_render_surface(&mut self, e: &RenderSurfaceEvent) {
        let effect = e
            .effect
            .map_or_else(|| "synthetic".to_owned(), |id| format!("{id:?}"));
        let _ = writeln!(
            self.writer,
            "[surface] node={} {effect} reason={:?}",
            e.node.0, e.reason,
        );
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        let _ = writeln!(
            self.writer,
            "[commit] seq={} layers={} nodes=t{}/c{}/e{}/s{} masks={} invalidations={}",
            s.sequence_number,
            s.layers,
            s.transform_nodes,
            s.clip_nodes,
            s.effect_nodes,
            s.scroll_nodes,
            s.mask_layers,
            s.invalidations,
        );
    }
}
