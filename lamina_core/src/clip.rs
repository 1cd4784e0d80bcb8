// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip geometry shared by paint and compositor clip nodes.

use kurbo::{Rect, RoundedRect};

/// Half-extent of the clip rectangle that stands for "no clipping".
const INFINITE_EXTENT: f64 = 1_073_741_823.0;

/// A shape used to clip content, expressed in a clip node's local transform
/// space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipShape {
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// A rectangle with rounded corners.
    RoundedRect(RoundedRect),
}

impl ClipShape {
    /// The clip of the root clip node, large enough to never clip anything.
    pub const INFINITE: Self = Self::Rect(Rect::new(
        -INFINITE_EXTENT,
        -INFINITE_EXTENT,
        INFINITE_EXTENT,
        INFINITE_EXTENT,
    ));

    /// Returns whether any corner radius is nonzero.
    ///
    /// A `RoundedRect` with all-zero radii counts as a plain rectangle; it
    /// does not need a synthesized mask.
    #[must_use]
    pub fn is_rounded(&self) -> bool {
        match self {
            Self::Rect(_) => false,
            Self::RoundedRect(rr) => {
                let r = rr.radii();
                r.top_left > 0.0 || r.top_right > 0.0 || r.bottom_right > 0.0 || r.bottom_left > 0.0
            }
        }
    }

    /// Returns the axis-aligned rectangle enclosing the shape.
    #[must_use]
    pub fn rect(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(rr) => rr.rect(),
        }
    }
}
