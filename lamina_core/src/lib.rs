// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint property trees and their translation into compositor property trees.
//!
//! `lamina_core` holds the data a paint system hands to a compositor each
//! frame, and the machinery that rebuilds an equivalent compositor-side tree
//! set from it. It is `no_std` compatible (with `alloc`); nodes live in
//! append-only arenas addressed by typed indices.
//!
//! # Architecture
//!
//! One commit flows through the crate like this:
//!
//! ```text
//!   PaintPropertyTrees + PaintArtifact (from the paint system)
//!       │
//!       ▼
//!   PropertyTreeMapper::assign_layer() for each layer
//!       │            └── switch_to_effect() opens/closes effect scopes,
//!       │                synthesizing isolation groups for rounded clips
//!       ▼
//!   PropertyTreeMapper::finalize() ──► Vec<SynthesizedClipLayer>
//!       │
//!       ▼
//!   PropertyTrees (compositor transform/clip/effect/scroll trees)
//! ```
//!
//! **[`paint`]**: The paint-side model: property nodes in a
//! [`PaintPropertyTrees`](paint::PaintPropertyTrees) arena, display items,
//! and the paint chunks that group them by property-tree state.
//!
//! **[`compositor`]**: Index-addressed compositor trees with a real root and
//! a secondary root, plus element-id lookup tables.
//!
//! **[`mapper`]**: [`PropertyTreeMapper`](mapper::PropertyTreeMapper), which
//! converts paint nodes to compositor nodes on demand, memoizes them, and
//! realizes rounded clips with destination-in masks.
//!
//! **[`geometry`]**: [`GeometryMapper`](geometry::GeometryMapper) for
//! projecting rects and clip chains between paint transform spaces.
//!
//! **[`transform`]**: 4×4 column-major transform used by both tree sets.
//!
//! **[`clip`]**: Rectangular and rounded clip geometry.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! commit instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-rect
//!   raster invalidation events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clip;
pub mod compositor;
pub mod geometry;
pub mod mapper;
pub mod paint;
pub mod trace;
pub mod transform;
