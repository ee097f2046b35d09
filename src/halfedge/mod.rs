// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Halfedge data structure for orientable 2-manifold meshes

mod elements;
mod index;
mod mesh;
mod stats;
mod traversal;

pub use elements::{Face, Halfedge, Vertex};
pub use index::{FaceId, HalfedgeId, VertexId};
pub use mesh::Mesh;
pub use stats::MeshStats;
pub use traversal::{Circulator, Orientation};
