// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display lists and raster invalidation for lamina.
//!
//! This crate turns a frame's paint chunks into what a rasterizer consumes.
//! It defines:
//!
//! - [`DisplayList`]: paired scope operations and draws for one layer
//! - [`DisplayListConverter`]: chunk-to-display-list conversion with the
//!   fewest scope changes
//! - [`RasterInvalidator`]: per-layer diff of old and new chunks into
//!   layer-space invalidation rects
//! - [`ArtifactCompositor`]: the per-commit driver running the
//!   [`PropertyTreeMapper`](lamina_core::mapper::PropertyTreeMapper), the
//!   converter, and the invalidators together
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` / `trace-rich` (disabled by default): Forward to the
//!   corresponding `lamina_core` features and enable test coverage of the
//!   emitted events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod artifact;
mod convert;
mod display_list;
mod invalidation;

pub use artifact::{ArtifactCompositor, CommitOutput, CompositedLayer, PendingLayer};
pub use convert::{ConverterConfig, DisplayListConverter};
pub use display_list::{DisplayList, DisplayOp};
pub use invalidation::{
    ChunkInfo, LayerGeometry, RasterInvalidation, RasterInvalidator, map_rect_to_layer,
};
