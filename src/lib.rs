// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe Mesh
//!
//! Manifold halfedge meshes, bounding volume hierarchies for nearest
//! neighbour and ball queries, and the indexed priority queue that drives
//! both the searches and the graph algorithms on top of them.

pub mod algo;
pub mod collections;
pub mod error;
pub mod geometry;
pub mod halfedge;
pub mod spatial;
pub mod utils;

pub use collections::{HeapOrder, PriorityQueue};
pub use error::{GeometryError, Result};
pub use geometry::{BoundingBox, Coords, Point, Primitive, Segment, Triangle};
pub use halfedge::{FaceId, HalfedgeId, Mesh, MeshStats, Orientation, VertexId};
pub use spatial::{BvhConfig, BvhTree, KdTree, Neighbor, SplitPolicy};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_to_tree() {
        let shape = geometry::shapes::icosphere(1.0, 0);
        let mesh = Mesh::new(shape.vertices, shape.faces).unwrap();
        let tree = BvhTree::from_triangle_mesh(&mesh, BvhConfig::default()).unwrap();
        assert_eq!(tree.len(), 20);

        let hits = tree.query(&nalgebra::dvector![0.0, 0.0, 2.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        // Between the circumsphere and the insphere of the icosahedron
        let d = hits[0].dist_sqrd.sqrt();
        assert!(d > 1.0 - 1e-9 && d < 1.25);
    }
}
