// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON dump of recorded trace events.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes a JSON array with one object per event, tagged by `"type"`.
//! Commits split the stream: every event carries the sequence number of the
//! commit summary that follows it, or `null` if the recording ends first.

use std::io::{self, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as a pretty-printed JSON array.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut pending_commit: Vec<usize> = Vec::new();

    for recorded in decode(bytes) {
        let event = match recorded {
            RecordedEvent::ChunkMatch(e) => json!({
                "type": "ChunkMatch",
                "layer": e.layer.0,
                "chunk": format!("{:?}", e.chunk),
                "old_index": e.old_index,
                "new_index": e.new_index,
                "outcome": format!("{:?}", e.outcome),
            }),
            RecordedEvent::RasterInvalidation(e) => json!({
                "type": "RasterInvalidation",
                "layer": e.layer.0,
                "chunk": e.chunk.map(|c| format!("{c:?}")),
                "rect": rect(e.rect),
                "reason": format!("{:?}", e.reason),
            }),
            RecordedEvent::SyntheticEffect(e) => json!({
                "type": "SyntheticEffect",
                "clip": e.clip.index(),
                "node": e.node.0,
                "parent": e.parent.0,
                "kind": format!("{:?}", e.kind),
            }),
            RecordedEvent::RenderSurface(e) => json!({
                "type": "RenderSurface",
                "node": e.node.0,
                "effect": e.effect.map(|id| id.index()),
                "reason": format!("{:?}", e.reason),
            }),
            RecordedEvent::CommitSummary(s) => {
                for idx in pending_commit.drain(..) {
                    events[idx]["commit"] = json!(s.sequence_number);
                }
                json!({
                    "type": "CommitSummary",
                    "commit": s.sequence_number,
                    "layers": s.layers,
                    "nodes": {
                        "transform": s.transform_nodes,
                        "clip": s.clip_nodes,
                        "effect": s.effect_nodes,
                        "scroll": s.scroll_nodes,
                    },
                    "mask_layers": s.mask_layers,
                    "invalidations": s.invalidations,
                })
            }
        };
        if event.get("commit").is_none() {
            pending_commit.push(events.len());
        }
        events.push(event);
    }

    for idx in pending_commit {
        events[idx]["commit"] = Value::Null;
    }

    serde_json::to_writer_pretty(writer, &events).map_err(io::Error::other)
}

fn rect(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}
