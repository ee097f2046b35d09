// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Single-source shortest paths along mesh edges

use crate::collections::PriorityQueue;
use crate::error::{GeometryError, Result};
use crate::geometry::Coords;
use crate::halfedge::{Mesh, VertexId};

/// Distances and predecessors from one source vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPaths {
    pub source: VertexId,
    /// `distances[v]` is infinite when `v` cannot be reached.
    pub distances: Vec<f64>,
    /// Previous vertex on a shortest path. `None` for the source and for
    /// unreachable vertices.
    pub predecessors: Vec<Option<VertexId>>,
}

impl ShortestPaths {
    pub fn distance(&self, v: VertexId) -> Option<f64> {
        self.distances.get(v.index()).copied().filter(|d| d.is_finite())
    }

    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distance(v).is_some()
    }

    /// Vertices of a shortest path from the source to `target`, both included.
    pub fn path_to(&self, target: VertexId) -> Option<Vec<VertexId>> {
        if !self.is_reachable(target) {
            return None;
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(prev) = self.predecessors[current.index()] {
            // A path can visit each vertex once
            if path.len() > self.predecessors.len() {
                return None;
            }
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some(path)
    }
}

/// Shortest paths weighted by the Euclidean length of each edge.
pub fn dijkstra(mesh: &Mesh<Coords>, source: VertexId) -> Result<ShortestPaths> {
    dijkstra_by(mesh, source, |p, q| (p - q).norm())
}

/// Shortest paths with edge weights computed from the endpoint payloads.
///
/// Weights must be non-negative; a negative or NaN weight aborts the search.
pub fn dijkstra_by<P, W>(mesh: &Mesh<P>, source: VertexId, mut weight: W) -> Result<ShortestPaths>
where
    W: FnMut(&P, &P) -> f64,
{
    mesh.check_vertex(source)?;

    let n = mesh.num_vertices();
    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors = vec![None; n];
    distances[source.index()] = 0.0;

    let mut queue = PriorityQueue::min_heap();
    queue.push(source, 0.0);

    while let Ok((v, dv)) = queue.pop_entry() {
        let pv = mesh.payload(v)?;
        for w in mesh.vertex_neighbors(v)? {
            let d = weight(pv, mesh.payload(w)?);
            if d.is_nan() || d < 0.0 {
                return Err(GeometryError::invalid_param(
                    "edge weight",
                    d,
                    "weights must be non-negative",
                ));
            }
            // Popped vertices are final and never improve again
            let candidate = dv + d;
            if candidate < distances[w.index()] {
                distances[w.index()] = candidate;
                predecessors[w.index()] = Some(v);
                queue.push(w, candidate);
            }
        }
    }

    Ok(ShortestPaths {
        source,
        distances,
        predecessors,
    })
}
