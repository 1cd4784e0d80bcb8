// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint chunks to display list conversion.
//!
//! The converter walks a layer's chunks in paint order with a cursor over the
//! paint clip and effect trees. It opens a clip or effect scope only when the
//! next chunk needs it and closes it as soon as a chunk no longer does, so
//! chunks sharing state share scopes. Every drawing is expressed in the
//! layer's transform space; clips carry their own local-space matrix.

use alloc::vec;

use kurbo::{Rect, Vec2};
use lamina_core::clip::ClipShape;
use lamina_core::geometry::GeometryMapper;
use lamina_core::paint::{
    ClipId, ColorFilter, EffectId, FilterList, FilterOperation, PaintArtifact, PaintChunk,
    PaintPropertyTrees, PropertyTreeState, TransformId,
};
use lamina_core::transform::Transform3d;

use crate::display_list::{DisplayList, DisplayOp};

/// Configuration for a [`DisplayListConverter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Skip transform and clip-space matrices that are the identity.
    pub elide_identity_transforms: bool,
}

impl ConverterConfig {
    /// Default configuration: identity matrices are elided.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elide_identity_transforms: true,
        }
    }

    /// Emits every transform scope, including identities.
    #[must_use]
    pub const fn explicit() -> Self {
        Self {
            elide_identity_transforms: false,
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a layer's paint chunks into a balanced [`DisplayList`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayListConverter<'a> {
    paint: &'a PaintPropertyTrees,
    artifact: &'a PaintArtifact,
    config: ConverterConfig,
}

impl<'a> DisplayListConverter<'a> {
    /// Creates a converter over one frame's paint output.
    #[must_use]
    pub fn new(
        paint: &'a PaintPropertyTrees,
        artifact: &'a PaintArtifact,
        config: ConverterConfig,
    ) -> Self {
        Self {
            paint,
            artifact,
            config,
        }
    }

    /// Converts `chunks`, painted into a layer with state `layer` whose origin
    /// sits at `layer_offset` in the layer's transform space.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a chunk's state does not descend from
    /// `layer`. Release builds skip such chunks.
    #[must_use]
    pub fn convert(
        &self,
        chunks: &[PaintChunk],
        layer: &PropertyTreeState,
        layer_offset: Vec2,
    ) -> DisplayList {
        let mut context = ConversionContext {
            paint: self.paint,
            geometry: GeometryMapper::new(self.paint),
            artifact: self.artifact,
            config: self.config,
            chunks,
            next: 0,
            layer_transform: layer.transform,
            list: DisplayList::new(),
        };

        let offset = layer_offset != Vec2::ZERO;
        if offset {
            context.list.push(DisplayOp::BeginTransform(Transform3d::from_translation(
                -layer_offset.x,
                -layer_offset.y,
                0.0,
            )));
        }

        loop {
            context.convert_scope(layer.clip, layer.effect);
            let Some(chunk) = chunks.get(context.next) else {
                break;
            };
            if cfg!(debug_assertions) {
                panic!(
                    "chunk {:?} with state {:?} does not descend from layer state {layer:?}",
                    chunk.id, chunk.properties
                );
            }
            context.next += 1;
        }

        if offset {
            context.list.push(DisplayOp::EndTransform);
        }
        debug_assert!(context.list.is_balanced(), "unbalanced display list");
        context.list
    }
}

struct ConversionContext<'a, 'c> {
    paint: &'a PaintPropertyTrees,
    geometry: GeometryMapper<'a>,
    artifact: &'a PaintArtifact,
    config: ConverterConfig,
    chunks: &'c [PaintChunk],
    next: usize,
    layer_transform: TransformId,
    list: DisplayList,
}

impl ConversionContext<'_, '_> {
    /// Emits chunks while they belong to the scope `(clip, effect)`.
    fn convert_scope(&mut self, clip: ClipId, effect: EffectId) {
        let chunks = self.chunks;
        while let Some(chunk) = chunks.get(self.next) {
            let state = chunk.properties;
            if state.effect == effect {
                if state.clip == clip {
                    self.emit_chunk(chunk);
                    self.next += 1;
                } else if let Some(child) = self.paint.clip_child_toward(clip, state.clip) {
                    self.push_clip(child);
                    self.convert_scope(child, effect);
                    self.list.push(DisplayOp::EndClip);
                } else {
                    return;
                }
                continue;
            }

            let Some(child) = self.paint.effect_child_toward(effect, state.effect) else {
                return;
            };
            let output_clip = self.paint.effect(child).output_clip;
            if !self.paint.clip_is_ancestor_or_self(clip, output_clip) {
                return;
            }

            let mut opened = 0;
            let mut current = clip;
            while let Some(next) = self.paint.clip_child_toward(current, output_clip) {
                self.push_clip(next);
                current = next;
                opened += 1;
            }
            self.push_effect(child);
            let start = self.next;
            self.convert_scope(output_clip, child);
            self.list.push(DisplayOp::EndEffect);
            for _ in 0..opened {
                self.list.push(DisplayOp::EndClip);
            }
            // A chunk the child scope rejected can only be handled further up.
            if self.next == start {
                return;
            }
        }
    }

    fn emit_chunk(&mut self, chunk: &PaintChunk) {
        let Some(matrix) = self
            .geometry
            .source_to_destination(chunk.properties.transform, self.layer_transform)
        else {
            // Singular projection, nothing is visible.
            return;
        };
        let artifact = self.artifact;
        let mut records = artifact
            .items_in(chunk)
            .iter()
            .filter_map(|item| item.record())
            .peekable();
        if records.peek().is_none() {
            return;
        }

        let wrap = !(self.config.elide_identity_transforms && matrix.is_identity());
        if wrap {
            self.list.push(DisplayOp::BeginTransform(matrix));
        }
        for record in records {
            self.list.push(DisplayOp::Draw(*record));
        }
        if wrap {
            self.list.push(DisplayOp::EndTransform);
        }
    }

    fn push_clip(&mut self, clip: ClipId) {
        let node = self.paint.clip(clip);
        let op = match self
            .geometry
            .source_to_destination(node.local_transform_space, self.layer_transform)
        {
            Some(matrix) if self.config.elide_identity_transforms && matrix.is_identity() => {
                DisplayOp::BeginClip {
                    space: None,
                    shape: node.shape,
                }
            }
            Some(matrix) => DisplayOp::BeginClip {
                space: Some(matrix),
                shape: node.shape,
            },
            // A clip in a collapsed space admits nothing.
            None => DisplayOp::BeginClip {
                space: None,
                shape: ClipShape::Rect(Rect::ZERO),
            },
        };
        self.list.push(op);
    }

    fn push_effect(&mut self, effect: EffectId) {
        let node = self.paint.effect(effect);
        let filters = match node.color_filter {
            ColorFilter::None => node.filters.clone(),
            ColorFilter::LuminanceToAlpha => FilterList(vec![FilterOperation::LuminanceToAlpha]),
        };
        self.list.push(DisplayOp::BeginEffect {
            opacity: node.opacity,
            blend_mode: node.blend_mode,
            filters,
            filter_origin: node.filter_origin,
        });
    }
}
