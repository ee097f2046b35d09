// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shape generators
//!
//! Produce indexed vertex/face arrays with consistently oriented
//! (counter-clockwise) faces, ready for [`Mesh::new`](crate::halfedge::Mesh::new).

use ahash::AHashMap;
use nalgebra::dvector;

use super::Coords;

/// Parallel vertex and face arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedShape {
    pub vertices: Vec<Coords>,
    pub faces: Vec<Vec<usize>>,
}

impl IndexedShape {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Sphere of the given radius built by subdividing an icosahedron `depth`
/// times. Every subdivision splits each triangle into four.
pub fn icosphere(radius: f64, depth: u32) -> IndexedShape {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;

    let mut vertices: Vec<Coords> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|p| dvector![p[0], p[1], p[2]].normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..depth {
        // Edge midpoints are shared by the two triangles on either side
        let mut midpoints: AHashMap<(usize, usize), usize> = AHashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Coords>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = ((&vertices[a] + &vertices[b]) * 0.5).normalize();
                vertices.push(m);
                vertices.len() - 1
            })
        };

        let mut refined = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            refined.push([a, ab, ca]);
            refined.push([b, bc, ab]);
            refined.push([c, ca, bc]);
            refined.push([ab, bc, ca]);
        }
        faces = refined;
    }

    IndexedShape {
        vertices: vertices.into_iter().map(|v| v * radius).collect(),
        faces: faces.into_iter().map(|f| f.to_vec()).collect(),
    }
}

/// Planar `nx` by `ny` grid of quads in the xy-plane with the given spacing.
///
/// Vertex `(i, j)` has index `j * (nx + 1) + i`.
pub fn quad_grid(nx: usize, ny: usize, spacing: f64) -> IndexedShape {
    let vertices = grid_vertices(nx, ny, spacing);
    let row = nx + 1;
    let mut faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v = j * row + i;
            faces.push(vec![v, v + 1, v + 1 + row, v + row]);
        }
    }
    IndexedShape { vertices, faces }
}

/// Like [`quad_grid`] with every quad split into two triangles.
pub fn triangle_grid(nx: usize, ny: usize, spacing: f64) -> IndexedShape {
    let vertices = grid_vertices(nx, ny, spacing);
    let row = nx + 1;
    let mut faces = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v = j * row + i;
            faces.push(vec![v, v + 1, v + 1 + row]);
            faces.push(vec![v, v + 1 + row, v + row]);
        }
    }
    IndexedShape { vertices, faces }
}

fn grid_vertices(nx: usize, ny: usize, spacing: f64) -> Vec<Coords> {
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(dvector![i as f64 * spacing, j as f64 * spacing, 0.0]);
        }
    }
    vertices
}
