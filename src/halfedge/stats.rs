// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh statistics

use std::fmt;

use serde::{Deserialize, Serialize};

use super::mesh::Mesh;

/// Element counts of a mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    /// Number of vertices, including isolated and deleted ones
    pub vertex_count: usize,
    /// Vertices without any incident edge
    pub isolated_count: usize,
    /// Number of faces, including empty and deleted ones
    pub face_count: usize,
    /// Faces without a halfedge loop
    pub empty_face_count: usize,
    /// Number of live halfedges
    pub halfedge_count: usize,
    /// Number of undirected edges
    pub edge_count: usize,
    /// Number of boundary loops, `None` if boundary extraction failed
    pub boundary_components: Option<usize>,
}

impl MeshStats {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// A mesh without boundary loops
    pub fn is_closed(&self) -> bool {
        self.boundary_components == Some(0)
    }
}

impl fmt::Display for MeshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vertices:   {:>8} ({} isolated)", self.vertex_count, self.isolated_count)?;
        writeln!(f, "Faces:      {:>8} ({} empty)", self.face_count, self.empty_face_count)?;
        writeln!(f, "Halfedges:  {:>8}", self.halfedge_count)?;
        writeln!(f, "Edges:      {:>8}", self.edge_count)?;
        match self.boundary_components {
            Some(n) => write!(f, "Boundaries: {:>8}", n),
            None => write!(f, "Boundaries:  invalid"),
        }
    }
}

impl<P> Mesh<P> {
    /// Collect element counts
    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertex_count: self.vertices.len(),
            isolated_count: self.vertices.iter().filter(|v| v.is_isolated()).count(),
            face_count: self.faces.len(),
            empty_face_count: self.faces.iter().filter(|f| f.is_empty()).count(),
            halfedge_count: self.num_halfedges(),
            edge_count: self.edges().count(),
            boundary_components: self.boundary().ok().map(|b| b.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::icosphere;

    #[test]
    fn test_closed_sphere_stats() {
        let shape = icosphere(1.0, 1);
        let mesh = Mesh::new(shape.vertices, shape.faces).unwrap();
        let stats = mesh.stats();
        assert_eq!(stats.vertex_count, 42);
        assert_eq!(stats.face_count, 80);
        assert_eq!(stats.edge_count, 120);
        assert_eq!(stats.halfedge_count, 240);
        assert!(stats.is_closed());
    }

    #[test]
    fn test_stats_json() {
        let mut mesh = Mesh::new(vec![(); 4], vec![vec![0usize, 1, 2]]).unwrap();
        mesh.add_vertex(());
        let stats = mesh.stats();
        assert_eq!(stats.isolated_count, 2);
        assert_eq!(stats.boundary_components, Some(1));

        let json = stats.to_json().unwrap();
        let parsed: MeshStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stats);
        assert!(stats.to_string().contains("Edges:"));
    }
}
