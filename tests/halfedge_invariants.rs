// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topological invariants of the halfedge mesh

use anyhow::Result;
use polyframe_mesh::geometry::shapes;
use polyframe_mesh::{Coords, FaceId, GeometryError, Mesh, VertexId};

fn assert_manifold_links<P>(mesh: &Mesh<P>) {
    for h in mesh.halfedges() {
        let he = &mesh[h];
        let pair = &mesh[he.pair()];
        assert_eq!(pair.pair(), h, "pair of pair of {:?}", h);
        assert_eq!(pair.origin(), he.target(), "twin of {:?} starts elsewhere", h);
        assert_eq!(mesh[he.prev()].next(), h, "next of prev of {:?}", h);
        assert_eq!(mesh[he.next()].prev(), h, "prev of next of {:?}", h);
    }
}

fn boundary_halfedge_count<P>(mesh: &Mesh<P>) -> usize {
    mesh.halfedges().filter(|&h| mesh[h].is_boundary()).count()
}

#[test]
fn test_single_quad() -> Result<()> {
    let mesh = Mesh::new(
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        vec![vec![0usize, 1, 2, 3]],
    )?;
    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.num_faces(), 1);
    assert_eq!(mesh.num_halfedges(), 8);

    let inner = mesh.halfedges().filter(|&h| mesh[h].face().is_some()).count();
    assert_eq!(inner, 4);
    assert_eq!(boundary_halfedge_count(&mesh), 4);

    let loops = mesh.boundary()?;
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 4);
    assert_manifold_links(&mesh);
    Ok(())
}

#[test]
fn test_deleting_shared_edge_merges_triangles() -> Result<()> {
    let mut mesh = Mesh::new(
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        vec![vec![0usize, 1, 2], vec![0, 2, 3]],
    )?;
    let h = mesh.halfedge(VertexId::new(2), VertexId::new(0))?;
    mesh.del_edge(h)?;
    assert_manifold_links(&mesh);

    let live: Vec<FaceId> = mesh.faces().filter(|&f| !mesh[f].is_empty()).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(mesh.face_valence(live[0])?, 4);

    mesh.clean();
    assert_eq!(mesh.num_faces(), 1);
    let mut vertices = mesh.face_list().remove(0);
    vertices.sort_unstable();
    assert_eq!(vertices, vec![0, 1, 2, 3]);
    assert_eq!(mesh.boundary()?.len(), 1);
    Ok(())
}

#[test]
fn test_rejected_faces_leave_mesh_untouched() -> Result<()> {
    let sphere = shapes::icosphere(1.0, 1);
    let mut mesh = Mesh::new(sphere.vertices, sphere.faces)?;
    let w = mesh.add_vertex(Coords::zeros(3));
    let before = mesh.clone();

    // Every directed edge of a closed surface already bounds a face, so each
    // attempt fails after its first halfedge was created.
    let edges: Vec<(VertexId, VertexId)> = mesh
        .halfedges()
        .take(12)
        .map(|h| (mesh[h].origin(), mesh[h].target()))
        .collect();
    for (a, b) in edges {
        let result = mesh.add_face([w, a, b]);
        assert!(matches!(result, Err(GeometryError::NonManifold { .. })));
        assert_eq!(mesh, before);
    }

    assert_eq!(mesh.num_vertices(), before.num_vertices());
    assert_eq!(mesh.num_halfedges(), before.num_halfedges());
    assert_eq!(mesh.num_faces(), before.num_faces());
    Ok(())
}

#[test]
fn test_add_delete_clean_round_trip() -> Result<()> {
    let grid = shapes::triangle_grid(2, 2, 1.0);
    let mut mesh = Mesh::new(grid.vertices, grid.faces)?;
    let (vertex_count, face_count) = (mesh.num_vertices(), mesh.num_faces());
    let faces_before = mesh.face_list();

    // Vertices 0 and 1 span a boundary edge of the grid
    let w = mesh.add_vertex(nalgebra::dvector![0.5, -1.0, 0.0]);
    let f = mesh.add_face([VertexId::new(1), VertexId::new(0), w])?;
    assert_manifold_links(&mesh);
    assert_eq!(mesh.num_faces(), face_count + 1);

    mesh.del_face(f)?;
    mesh.clean();
    assert_eq!(mesh.num_vertices(), vertex_count);
    assert_eq!(mesh.num_faces(), face_count);
    assert_eq!(mesh.face_list(), faces_before);
    assert_manifold_links(&mesh);
    Ok(())
}

#[test]
fn test_boundary_visits_every_boundary_halfedge() -> Result<()> {
    let grid = shapes::triangle_grid(6, 6, 1.0);
    let mut mesh = Mesh::new(grid.vertices, grid.faces)?;
    assert_eq!(mesh.boundary()?.len(), 1);

    // Two interior holes that share no vertex with each other or the rim
    for i in [2 * (6 + 1), 2 * (4 * 6 + 4)] {
        mesh.del_face(FaceId::new(i))?;
    }
    assert_manifold_links(&mesh);

    let loops = mesh.boundary()?;
    assert_eq!(loops.len(), 3);
    let visited: usize = loops.iter().map(Vec::len).sum();
    assert_eq!(visited, boundary_halfedge_count(&mesh));
    assert_eq!(visited, 24 + 3 + 3);
    Ok(())
}

#[test]
fn test_generated_surfaces_are_manifold() -> Result<()> {
    for shape in [
        shapes::icosphere(2.0, 2),
        shapes::quad_grid(5, 3, 0.5),
        shapes::triangle_grid(3, 7, 1.0),
    ] {
        let mesh = Mesh::new(shape.vertices.clone(), shape.faces.clone())?;
        assert_manifold_links(&mesh);
        assert_eq!(mesh.face_list(), shape.faces);

        let visited: usize = mesh.boundary()?.iter().map(Vec::len).sum();
        assert_eq!(visited, boundary_halfedge_count(&mesh));
    }
    Ok(())
}

#[test]
fn test_delete_then_rebuild_matches() -> Result<()> {
    let grid = shapes::quad_grid(3, 3, 1.0);
    let mut mesh = Mesh::new(grid.vertices, grid.faces)?;
    mesh.del_vertex(VertexId::new(5))?;
    mesh.clean();
    assert_manifold_links(&mesh);

    // Centre-left vertex 5 touched four quads
    assert_eq!(mesh.num_faces(), 5);
    let (vertices, faces) = mesh.indexed_mesh();
    let rebuilt = Mesh::new(vertices, faces)?;
    assert_eq!(rebuilt.face_list(), mesh.face_list());
    assert_eq!(rebuilt.num_halfedges(), mesh.num_halfedges());
    Ok(())
}
