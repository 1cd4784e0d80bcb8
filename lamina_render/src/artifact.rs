// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-commit driver tying the mapper, converter, and invalidator together.

use alloc::vec::Vec;
use core::ops::Range;

use hashbrown::HashMap;
use kurbo::{Rect, Vec2};
use lamina_core::compositor::PropertyTrees;
use lamina_core::mapper::{LayerNodeIds, MapperConfig, PropertyTreeMapper, SynthesizedClipLayer};
use lamina_core::paint::{LayerKey, PaintArtifact, PaintPropertyTrees, PropertyTreeState};
use lamina_core::trace::{CommitSummary, Tracer};

use crate::convert::{ConverterConfig, DisplayListConverter};
use crate::display_list::DisplayList;
use crate::invalidation::{LayerGeometry, RasterInvalidation, RasterInvalidator};

/// A layer the paint system wants composited this commit.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingLayer {
    /// Identity that persists across commits.
    pub key: LayerKey,
    /// State the layer is composited under.
    pub state: PropertyTreeState,
    /// Layer origin in the layer transform space.
    pub offset: Vec2,
    /// Layer bounds in layer space.
    pub bounds: Rect,
    /// Range of the artifact's chunks painted into this layer.
    pub chunks: Range<usize>,
}

/// Everything produced for one layer.
#[derive(Clone, Debug)]
pub struct CompositedLayer {
    /// Layer identity.
    pub key: LayerKey,
    /// Compositor nodes the layer attaches to.
    pub ids: LayerNodeIds,
    /// Operations to rasterize the layer.
    pub display_list: DisplayList,
    /// Regions to rerasterize since the previous commit.
    pub invalidations: Vec<RasterInvalidation>,
    /// Layer origin in the layer transform space.
    pub offset: Vec2,
    /// Layer bounds in layer space.
    pub bounds: Rect,
}

/// Output of [`ArtifactCompositor::commit`].
#[derive(Clone, Debug)]
pub struct CommitOutput {
    /// Commit sequence number, also stored on the property trees.
    pub sequence_number: u64,
    /// Layers in paint order.
    pub layers: Vec<CompositedLayer>,
    /// Masks realizing rounded clips, composited after their content.
    pub mask_layers: Vec<SynthesizedClipLayer>,
}

/// Cross-commit compositing state: compositor property trees and one
/// [`RasterInvalidator`] per layer key.
#[derive(Debug)]
pub struct ArtifactCompositor {
    mapper_config: MapperConfig,
    converter_config: ConverterConfig,
    property_trees: PropertyTrees,
    invalidators: HashMap<LayerKey, RasterInvalidator>,
    sequence_number: u64,
}

impl ArtifactCompositor {
    /// Creates a compositor that has not committed yet.
    #[must_use]
    pub fn new(mapper_config: MapperConfig, converter_config: ConverterConfig) -> Self {
        Self {
            mapper_config,
            converter_config,
            property_trees: PropertyTrees::new(),
            invalidators: HashMap::new(),
            sequence_number: 0,
        }
    }

    /// Returns the mapper configuration.
    #[must_use]
    pub fn mapper_config(&self) -> &MapperConfig {
        &self.mapper_config
    }

    /// Replaces the mapper configuration from the next commit on.
    pub fn set_mapper_config(&mut self, config: MapperConfig) {
        self.mapper_config = config;
    }

    /// Returns the trees built by the last commit.
    #[must_use]
    pub fn property_trees(&self) -> &PropertyTrees {
        &self.property_trees
    }

    /// Returns the trees mutably, for compositor-side updates such as
    /// [`PropertyTrees::notify_scroll`].
    pub fn property_trees_mut(&mut self) -> &mut PropertyTrees {
        &mut self.property_trees
    }

    /// Returns the sequence number of the last commit, zero before the first.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Forgets the invalidation state of every layer, so the next commit
    /// rerasters everything.
    pub fn invalidate_all(&mut self) {
        self.invalidators.clear();
    }

    /// Commits one frame: rebuilds the compositor trees, then converts and
    /// diffs every layer.
    ///
    /// `layers` must be in paint order and their chunk ranges must tile the
    /// artifact's chunks in the same order. Invalidation state of layer keys
    /// missing from `layers` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if a layer's chunk range lies outside the artifact.
    pub fn commit(
        &mut self,
        paint: &PaintPropertyTrees,
        artifact: &PaintArtifact,
        layers: &[PendingLayer],
        tracer: &mut Tracer<'_>,
    ) -> CommitOutput {
        self.sequence_number += 1;
        let sequence_number = self.sequence_number;

        let mut mapper = PropertyTreeMapper::new(
            self.mapper_config,
            paint,
            &mut self.property_trees,
            sequence_number,
            tracer.reborrow(),
        );
        let ids: Vec<LayerNodeIds> = layers
            .iter()
            .map(|layer| mapper.assign_layer(&layer.state))
            .collect();
        let mask_layers = mapper.finalize();

        self.invalidators
            .retain(|key, _| layers.iter().any(|layer| layer.key == *key));

        let converter = DisplayListConverter::new(paint, artifact, self.converter_config);
        let mut composited = Vec::with_capacity(layers.len());
        let mut invalidation_count = 0;
        for (layer, ids) in layers.iter().zip(ids) {
            assert!(
                layer.chunks.end <= artifact.chunks.len(),
                "layer {:?} chunk range {:?} exceeds {} chunks",
                layer.key,
                layer.chunks,
                artifact.chunks.len()
            );
            let chunks = &artifact.chunks[layer.chunks.clone()];
            let display_list = converter.convert(chunks, &layer.state, layer.offset);
            let invalidations = self
                .invalidators
                .entry(layer.key)
                .or_insert_with(|| RasterInvalidator::new(layer.key))
                .generate(
                    paint,
                    chunks,
                    &LayerGeometry {
                        state: layer.state,
                        offset: layer.offset,
                        bounds: layer.bounds,
                    },
                    tracer,
                );
            invalidation_count += invalidations.len();
            composited.push(CompositedLayer {
                key: layer.key,
                ids,
                display_list,
                invalidations,
                offset: layer.offset,
                bounds: layer.bounds,
            });
        }

        let trees = &self.property_trees;
        tracer.commit_summary(&CommitSummary {
            sequence_number,
            layers: composited.len(),
            transform_nodes: trees.transform_tree.len(),
            clip_nodes: trees.clip_tree.len(),
            effect_nodes: trees.effect_tree.len(),
            scroll_nodes: trees.scroll_tree.len(),
            mask_layers: mask_layers.len(),
            invalidations: invalidation_count,
        });

        CommitOutput {
            sequence_number,
            layers: composited,
            mask_layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{RoundedRect, Size};
    use lamina_core::clip::ClipShape;
    use lamina_core::compositor::NodeId;
    use lamina_core::paint::{
        ChunkId, ClipId, ClipNode, DisplayItem, EffectId, EffectNode, PaintChunk,
        PaintInvalidationReason, PaintRecord, TransformId,
    };

    use super::*;
    use crate::display_list::DisplayOp;

    fn compositor() -> ArtifactCompositor {
        ArtifactCompositor::new(
            MapperConfig::new(Size::new(400.0, 300.0), 1.0),
            ConverterConfig::new(),
        )
    }

    fn push_chunk(artifact: &mut PaintArtifact, id: u64, state: PropertyTreeState, bounds: Rect) {
        let start = artifact.items.len();
        artifact
            .items
            .push(DisplayItem::drawing(id, PaintRecord { id, bounds }));
        artifact
            .chunks
            .push(PaintChunk::new(ChunkId::new(id, 0), start..start + 1, state, bounds));
    }

    fn layer(key: u64, chunks: Range<usize>) -> PendingLayer {
        PendingLayer {
            key: LayerKey(key),
            state: PropertyTreeState::ROOT,
            offset: Vec2::ZERO,
            bounds: Rect::new(0.0, 0.0, 400.0, 300.0),
            chunks,
        }
    }

    #[test]
    fn commit_produces_layers_and_masks() {
        let mut paint = PaintPropertyTrees::new();
        let rounded = paint.add_clip(ClipNode::new(
            ClipId::ROOT,
            TransformId::ROOT,
            ClipShape::RoundedRect(RoundedRect::new(10.0, 10.0, 90.0, 90.0, 6.0)),
        ));
        let e = paint.add_effect(EffectNode::new(EffectId::ROOT, TransformId::ROOT, rounded, 0.5));

        let mut artifact = PaintArtifact::default();
        let bounds = Rect::new(10.0, 10.0, 90.0, 90.0);
        push_chunk(&mut artifact, 1, PropertyTreeState::ROOT, bounds);
        push_chunk(&mut artifact, 2, PropertyTreeState::new(TransformId::ROOT, rounded, e), bounds);

        let mut compositor = compositor();
        let pending = [
            layer(1, 0..1),
            PendingLayer {
                state: PropertyTreeState::new(TransformId::ROOT, rounded, e),
                ..layer(2, 1..2)
            },
        ];
        let output = compositor.commit(&paint, &artifact, &pending, &mut Tracer::none());

        assert_eq!(output.sequence_number, 1);
        assert_eq!(compositor.property_trees().sequence_number, 1);
        assert_eq!(output.layers.len(), 2);
        assert_eq!(output.layers[0].ids.effect, NodeId::SECONDARY_ROOT);
        assert_ne!(output.layers[1].ids.effect, NodeId::SECONDARY_ROOT);
        assert_eq!(output.mask_layers.len(), 1);
        assert_eq!(output.mask_layers[0].clip, rounded);

        // The second layer is composited under its own state, so it draws
        // without scopes.
        assert_eq!(
            output.layers[1].display_list.ops,
            [DisplayOp::Draw(PaintRecord { id: 2, bounds })]
        );
        for layer in &output.layers {
            assert_eq!(layer.invalidations.len(), 1);
            assert_eq!(layer.invalidations[0].reason, PaintInvalidationReason::FullLayer);
        }
    }

    #[test]
    fn second_commit_diffs_against_first() {
        let paint = PaintPropertyTrees::new();
        let mut artifact = PaintArtifact::default();
        push_chunk(&mut artifact, 1, PropertyTreeState::ROOT, Rect::new(0.0, 0.0, 10.0, 10.0));
        push_chunk(&mut artifact, 2, PropertyTreeState::ROOT, Rect::new(20.0, 0.0, 30.0, 10.0));

        let mut compositor = compositor();
        let _ = compositor.commit(&paint, &artifact, &[layer(7, 0..2)], &mut Tracer::none());

        let mut next = PaintArtifact::default();
        push_chunk(&mut next, 1, PropertyTreeState::ROOT, Rect::new(0.0, 0.0, 10.0, 10.0));
        let output = compositor.commit(&paint, &next, &[layer(7, 0..1)], &mut Tracer::none());
        assert_eq!(output.sequence_number, 2);
        assert_eq!(
            output.layers[0].invalidations,
            [RasterInvalidation {
                rect: Rect::new(20.0, 0.0, 30.0, 10.0),
                reason: PaintInvalidationReason::ChunkDisappeared,
                chunk: Some(ChunkId::new(2, 0)),
            }]
        );

        // A layer that skipped a commit starts over.
        let _ = compositor.commit(&paint, &next, &[layer(8, 0..1)], &mut Tracer::none());
        let output = compositor.commit(&paint, &next, &[layer(7, 0..1)], &mut Tracer::none());
        assert_eq!(
            output.layers[0].invalidations[0].reason,
            PaintInvalidationReason::FullLayer
        );

        compositor.invalidate_all();
        let output = compositor.commit(&paint, &next, &[layer(7, 0..1)], &mut Tracer::none());
        assert_eq!(
            output.layers[0].invalidations[0].reason,
            PaintInvalidationReason::FullLayer
        );
    }

    #[test]
    #[should_panic(expected = "exceeds 0 chunks")]
    fn out_of_range_layer_panics() {
        let paint = PaintPropertyTrees::new();
        let artifact = PaintArtifact::default();
        let mut compositor = compositor();
        let _ = compositor.commit(&paint, &artifact, &[layer(1, 0..1)], &mut Tracer::none());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn commit_summary_is_traced() {
        use alloc::vec;

        use lamina_core::trace::TraceSink;

        #[derive(Default)]
        struct Summaries(Vec<CommitSummary>);
        impl TraceSink for Summaries {
            fn on_commit_summary(&mut self, s: &CommitSummary) {
                self.0.push(*s);
            }
        }

        let paint = PaintPropertyTrees::new();
        let mut artifact = PaintArtifact::default();
        push_chunk(&mut artifact, 1, PropertyTreeState::ROOT, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut compositor = compositor();
        let mut sink = Summaries::default();
        let _ = compositor.commit(
            &paint,
            &artifact,
            &[layer(1, 0..1)],
            &mut Tracer::new(&mut sink),
        );
        assert_eq!(
            sink.0,
            vec![CommitSummary {
                sequence_number: 1,
                layers: 1,
                transform_nodes: 2,
                clip_nodes: 2,
                effect_nodes: 2,
                scroll_nodes: 2,
                mask_layers: 0,
                invalidations: 1,
            }]
        );
    }
}
