// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display list: an ordered sequence of paired scope operations and draws
//! for one layer.

use alloc::vec::Vec;

use kurbo::Point;
use lamina_core::clip::ClipShape;
use lamina_core::paint::{FilterList, PaintRecord};
use lamina_core::transform::Transform3d;
use peniko::BlendMode;

/// A single display-list operation.
///
/// Every `Begin*` is closed by the matching `End*` in reverse order of
/// opening.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayOp {
    /// Concatenates `matrix` onto the current transform.
    BeginTransform(Transform3d),
    /// Restores the transform saved by the matching `BeginTransform`.
    EndTransform,
    /// Clips subsequent content to `shape`.
    BeginClip {
        /// Transform from the clip's local space into the current space, if
        /// they differ.
        space: Option<Transform3d>,
        /// Clip geometry in its local space.
        shape: ClipShape,
    },
    /// Restores the clip saved by the matching `BeginClip`.
    EndClip,
    /// Starts an isolated group composited with the given parameters.
    BeginEffect {
        /// Group opacity.
        opacity: f32,
        /// Compositing blend mode.
        blend_mode: BlendMode,
        /// Filters applied to the group.
        filters: FilterList,
        /// Origin filters are evaluated relative to.
        filter_origin: Point,
    },
    /// Composites the group opened by the matching `BeginEffect`.
    EndEffect,
    /// Replays a recorded picture.
    Draw(PaintRecord),
}

/// Scope kind of a `Begin*`/`End*` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Transform,
    Clip,
    Effect,
}

impl DisplayOp {
    fn opens(&self) -> Option<Scope> {
        match self {
            Self::BeginTransform(_) => Some(Scope::Transform),
            Self::BeginClip { .. } => Some(Scope::Clip),
            Self::BeginEffect { .. } => Some(Scope::Effect),
            _ => None,
        }
    }

    fn closes(&self) -> Option<Scope> {
        match self {
            Self::EndTransform => Some(Scope::Transform),
            Self::EndClip => Some(Scope::Clip),
            Self::EndEffect => Some(Scope::Effect),
            _ => None,
        }
    }
}

/// An ordered list of display operations for a single layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    /// Operations in paint order.
    pub ops: Vec<DisplayOp>,
}

impl DisplayList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    pub fn push(&mut self, op: DisplayOp) {
        self.ops.push(op);
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if there are no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Clears the list for reuse.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Iterates the drawn records in order.
    pub fn draws(&self) -> impl Iterator<Item = &PaintRecord> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DisplayOp::Draw(record) => Some(record),
            _ => None,
        })
    }

    /// Number of opened scopes.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.ops.iter().filter(|op| op.opens().is_some()).count()
    }

    /// Returns whether every `Begin*` is closed by a matching `End*` in LIFO
    /// order.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        let mut open = Vec::new();
        for op in &self.ops {
            if let Some(scope) = op.opens() {
                open.push(scope);
            } else if let Some(scope) = op.closes()
                && open.pop() != Some(scope)
            {
                return false;
            }
        }
        open.is_empty()
    }
}
