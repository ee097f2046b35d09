// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tutte embedding of disk-like meshes

use nalgebra::{dvector, DMatrix};

use crate::error::{GeometryError, Result};
use crate::geometry::Coords;
use crate::halfedge::{Mesh, VertexId};

/// Straight line embedding of a mesh with disk topology in the plane.
///
/// The boundary loop is pinned to a regular polygon on the unit circle and
/// every interior vertex is placed at the barycenter of its neighbours.
/// Entry `i` holds the `(u, v)` coordinates of vertex `i`; deleted and
/// isolated vertices stay at the origin. With `normalize` the coordinates are
/// rescaled to `[0, 1]²`.
pub fn tutte(mesh: &Mesh<Coords>, normalize: bool) -> Result<Vec<Coords>> {
    let loops = mesh.boundary()?;
    if loops.len() != 1 {
        return Err(GeometryError::invalid_param(
            "boundary components",
            loops.len(),
            "expected a mesh with a single boundary loop",
        ));
    }
    let rim = &loops[0];

    let n = mesh.num_vertices();
    let mut uv = vec![Coords::zeros(2); n];
    for (k, v) in rim.iter().enumerate() {
        let t = std::f64::consts::TAU * k as f64 / rim.len() as f64;
        uv[v.index()] = dvector![t.cos(), t.sin()];
    }

    // Interior vertices get consecutive rows of the system
    let mut interior: Vec<VertexId> = Vec::new();
    let mut row = vec![None; n];
    for v in mesh.vertices() {
        if !mesh[v].is_deleted() && !mesh.is_boundary_vertex(v)? {
            row[v.index()] = Some(interior.len());
            interior.push(v);
        }
    }

    if !interior.is_empty() {
        let m = interior.len();
        let mut a = DMatrix::<f64>::identity(m, m);
        let mut b = DMatrix::<f64>::zeros(m, 2);
        for (i, &v) in interior.iter().enumerate() {
            let weight = 1.0 / mesh.vertex_degree(v)? as f64;
            for w in mesh.vertex_neighbors(v)? {
                match row[w.index()] {
                    Some(j) => a[(i, j)] -= weight,
                    None => {
                        b[(i, 0)] += weight * uv[w.index()][0];
                        b[(i, 1)] += weight * uv[w.index()][1];
                    }
                }
            }
        }

        let x = a.lu().solve(&b).ok_or(GeometryError::DegenerateGeometry {
            kind: "embedding system",
            measure: 0.0,
        })?;
        for (i, v) in interior.iter().enumerate() {
            uv[v.index()] = dvector![x[(i, 0)], x[(i, 1)]];
        }
    }

    if normalize {
        let placed = rim.iter().chain(&interior).map(|v| &uv[v.index()]);
        let (lo, hi) = placed.fold(
            (dvector![f64::INFINITY, f64::INFINITY], dvector![f64::NEG_INFINITY, f64::NEG_INFINITY]),
            |(lo, hi), p| (lo.inf(p), hi.sup(p)),
        );
        let extent = &hi - &lo;
        for v in rim.iter().chain(&interior) {
            let scaled = (&uv[v.index()] - &lo).component_div(&extent);
            uv[v.index()] = scaled;
        }
    }

    Ok(uv)
}
