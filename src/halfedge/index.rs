// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Typed handles for mesh elements.
//!
//! Handles are positions in the mesh arenas. They stay valid until the next
//! [`Mesh::clean`](super::Mesh::clean), which renumbers every arena.

use std::fmt;

macro_rules! impl_handle {
    ($(#[$meta:meta])* $name:ident, $display:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Sentinel for an unset link.
            pub const INVALID: Self = Self(usize::MAX);

            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Arena position.
            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.0)
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self::new(index)
            }
        }
    };
}

impl_handle!(
    /// Handle of a vertex.
    VertexId,
    "V"
);
impl_handle!(
    /// Handle of a halfedge.
    HalfedgeId,
    "H"
);
impl_handle!(
    /// Handle of a face.
    FaceId,
    "F"
);
