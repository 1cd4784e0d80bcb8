// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint property node and chunk identity types.

use core::fmt;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            /// Slot index into the arena's node array for this kind.
            pub(crate) idx: u32,
        }

        impl $name {
            /// The singleton root node of this kind.
            pub const ROOT: Self = Self { idx: 0 };

            /// Returns the raw slot index (for diagnostics only).
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.idx
            }

            /// Rebuilds an id from [`index`](Self::index), e.g. when decoding a
            /// trace recording. It is only meaningful against the arena it
            /// was taken from.
            #[inline]
            #[must_use]
            pub const fn from_index(idx: u32) -> Self {
                Self { idx }
            }

            /// Returns whether this is the singleton root.
            #[inline]
            #[must_use]
            pub const fn is_root(self) -> bool {
                self.idx == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.idx)
            }
        }
    };
}

node_id!(
    /// A handle to a transform node in a
    /// [`PaintPropertyTrees`](super::PaintPropertyTrees) arena.
    TransformId,
    "TransformId"
);
node_id!(
    /// A handle to a clip node in a
    /// [`PaintPropertyTrees`](super::PaintPropertyTrees) arena.
    ClipId,
    "ClipId"
);
node_id!(
    /// A handle to an effect node in a
    /// [`PaintPropertyTrees`](super::PaintPropertyTrees) arena.
    EffectId,
    "EffectId"
);
node_id!(
    /// A handle to a scroll node in a
    /// [`PaintPropertyTrees`](super::PaintPropertyTrees) arena.
    ScrollId,
    "ScrollId"
);

/// An identifier shared between paint and compositor nodes so that
/// animations and scroll offsets can address compositor state directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Derives a stable id for an effect node the compositor synthesized to
    /// mask a rounded clip.
    ///
    /// `slot` distinguishes the mask target (0) from the mask effect (1).
    /// The mix is deterministic so ids survive across commits as long as the
    /// clip keeps its element id or arena slot.
    #[must_use]
    pub fn synthesized_clip(clip: ClipId, clip_element: Option<Self>, slot: u8) -> Self {
        let base = clip_element.map_or(u64::from(clip.idx), |e| e.0);
        let ns = base.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self(ns ^ (u64::from(slot) + 1).wrapping_mul(0xD6E8_FEB8_6659_FD93) ^ (1 << 63))
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({:#x})", self.0)
    }
}

/// Identifies the producer of display items (a layout object, a scrollbar,
/// and so on) across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Stable cross-frame identity of a paint chunk.
///
/// A client may produce several chunks per frame (background, foreground,
/// overflow controls); `kind` tells them apart.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    /// The client that painted the chunk.
    pub client: ClientId,
    /// Chunk type within the client.
    pub kind: u16,
}

impl ChunkId {
    /// Creates a chunk id.
    #[inline]
    #[must_use]
    pub const fn new(client: u64, kind: u16) -> Self {
        Self {
            client: ClientId(client),
            kind,
        }
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({}:{})", self.client.0, self.kind)
    }
}

/// Stable identity of a composited layer across commits.
///
/// Raster invalidation state is keyed by it, so a layer that keeps its key
/// is diffed against its previous frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey(pub u64);
