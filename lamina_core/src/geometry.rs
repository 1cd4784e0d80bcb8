// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-side geometry mapping.
//!
//! [`GeometryMapper`] projects rectangles between paint transform spaces and
//! accumulates clip chains. Everything is flattened to 2-D at the end; the
//! intermediate products keep full 4×4 precision.

use kurbo::Rect;

use crate::clip::ClipShape;
use crate::paint::{ClipId, PaintPropertyTrees, PropertyTreeState, TransformId};
use crate::transform::Transform3d;

/// Read-only geometry queries over a [`PaintPropertyTrees`] arena.
#[derive(Clone, Copy, Debug)]
pub struct GeometryMapper<'a> {
    trees: &'a PaintPropertyTrees,
}

impl<'a> GeometryMapper<'a> {
    /// Creates a mapper over `trees`.
    #[must_use]
    pub fn new(trees: &'a PaintPropertyTrees) -> Self {
        Self { trees }
    }

    /// Returns the arena this mapper reads.
    #[must_use]
    pub fn trees(&self) -> &'a PaintPropertyTrees {
        self.trees
    }

    /// Accumulates local matrices from `descendant` up to, but excluding,
    /// `ancestor`.
    ///
    /// If `ancestor` is not on the path the walk stops at the root.
    #[must_use]
    pub fn local_to_ancestor(&self, descendant: TransformId, ancestor: TransformId) -> Transform3d {
        debug_assert!(
            self.trees.transform_is_ancestor_or_self(ancestor, descendant),
            "{ancestor:?} is not an ancestor of {descendant:?}"
        );
        let mut matrix = Transform3d::IDENTITY;
        let mut id = descendant;
        while id != ancestor {
            let node = self.trees.transform(id);
            matrix = node.local_matrix() * matrix;
            match node.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        matrix
    }

    /// Returns the matrix mapping `source` space into `destination` space,
    /// or `None` if the path through their common ancestor is singular.
    #[must_use]
    pub fn source_to_destination(
        &self,
        source: TransformId,
        destination: TransformId,
    ) -> Option<Transform3d> {
        if source == destination {
            return Some(Transform3d::IDENTITY);
        }
        let lca = self
            .trees
            .transform_lowest_common_ancestor(source, destination);
        let source_to_lca = self.local_to_ancestor(source, lca);
        if lca == destination {
            return Some(source_to_lca);
        }
        let destination_to_lca = self.local_to_ancestor(destination, lca);
        Some(destination_to_lca.inverse()? * source_to_lca)
    }

    /// Intersects every clip from `descendant` up to, but excluding,
    /// `ancestor`, expressed in `space`.
    ///
    /// Rounded corners are ignored; the result is the enclosing rectangle.
    /// Clips whose space cannot be mapped into `space` do not restrict the
    /// result.
    #[must_use]
    pub fn clip_rect_between(&self, descendant: ClipId, ancestor: ClipId, space: TransformId) -> Rect {
        let mut rect = ClipShape::INFINITE.rect();
        let mut id = descendant;
        while id != ancestor {
            let node = self.trees.clip(id);
            if let Some(matrix) = self.source_to_destination(node.local_transform_space, space) {
                rect = rect.intersect(map_rect(&matrix, node.shape.rect()));
            }
            match node.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        rect
    }

    /// Maps `rect` from `local` state into `ancestor` state: projects it into
    /// the ancestor's transform space and clips it by every clip between the
    /// two states.
    ///
    /// Returns a zero-area rect when the projection is singular.
    #[must_use]
    pub fn visual_rect_in_ancestor_space(
        &self,
        rect: Rect,
        local: &PropertyTreeState,
        ancestor: &PropertyTreeState,
    ) -> Rect {
        let Some(matrix) = self.source_to_destination(local.transform, ancestor.transform) else {
            return Rect::ZERO;
        };
        let mapped = map_rect(&matrix, rect);
        if local.clip == ancestor.clip {
            return mapped;
        }
        mapped.intersect(self.clip_rect_between(local.clip, ancestor.clip, ancestor.transform))
    }
}

/// Maps `rect` through `matrix` and returns the axis-aligned bounding box.
#[must_use]
pub fn map_rect(matrix: &Transform3d, rect: Rect) -> Rect {
    if matrix.is_identity_or_2d_translation() {
        return rect + matrix.translation_2d();
    }
    matrix.to_affine().transform_rect_bbox(rect)
}
