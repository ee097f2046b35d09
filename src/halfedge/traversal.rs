// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Local and global traversals
//!
//! Circulators walk the halfedges around a vertex or a face. Every call
//! returns a fresh iterator; iteration stops when the start halfedge comes
//! around again, or after as many steps as the mesh has halfedges if the
//! links were damaged by deletions.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use super::index::{FaceId, HalfedgeId, VertexId};
use super::mesh::Mesh;
use crate::error::{GeometryError, Result};

/// Orientation of extracted boundary loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Positive with respect to the face orientation.
    #[default]
    Ccw,
    Cw,
}

/// Iterator over a closed chain of halfedges.
pub struct Circulator<'a, P> {
    mesh: &'a Mesh<P>,
    start: HalfedgeId,
    current: Option<HalfedgeId>,
    step: fn(&Mesh<P>, HalfedgeId) -> HalfedgeId,
    remaining: usize,
}

impl<'a, P> Circulator<'a, P> {
    fn new(mesh: &'a Mesh<P>, start: Option<HalfedgeId>, step: fn(&Mesh<P>, HalfedgeId) -> HalfedgeId) -> Self {
        Self {
            mesh,
            start: start.unwrap_or(HalfedgeId::INVALID),
            current: start,
            step,
            remaining: mesh.halfedges.len(),
        }
    }
}

impl<P> Iterator for Circulator<'_, P> {
    type Item = HalfedgeId;

    fn next(&mut self) -> Option<HalfedgeId> {
        let h = self.current?;
        if self.remaining == 0 || self.mesh.link(h).is_err() {
            self.current = None;
            return None;
        }
        self.remaining -= 1;
        let next = (self.step)(self.mesh, h);
        self.current = (next != self.start).then_some(next);
        Some(h)
    }
}

fn step_next<P>(mesh: &Mesh<P>, h: HalfedgeId) -> HalfedgeId {
    mesh.halfedges[h.index()].next
}

fn step_prev<P>(mesh: &Mesh<P>, h: HalfedgeId) -> HalfedgeId {
    mesh.halfedges[h.index()].prev
}

/// Counter-clockwise about the origin: `pair(prev(h))`.
fn step_ccw<P>(mesh: &Mesh<P>, h: HalfedgeId) -> HalfedgeId {
    let prev = mesh.halfedges[h.index()].prev;
    mesh.halfedges
        .get(prev.index())
        .map_or(HalfedgeId::INVALID, |p| p.pair)
}

/// Clockwise about the origin: `next(pair(h))`.
fn step_cw<P>(mesh: &Mesh<P>, h: HalfedgeId) -> HalfedgeId {
    let pair = mesh.halfedges[h.index()].pair;
    mesh.halfedges
        .get(pair.index())
        .map_or(HalfedgeId::INVALID, |p| p.next)
}

impl<P> Mesh<P> {
    /// Outgoing halfedges of `v` in counter-clockwise order.
    pub fn vertex_halfedges(&self, v: VertexId) -> Result<Circulator<'_, P>> {
        let start = self.vertex(v)?.halfedge;
        Ok(Circulator::new(self, start, step_ccw))
    }

    /// Outgoing halfedges of `v` in clockwise order.
    pub fn vertex_halfedges_cw(&self, v: VertexId) -> Result<Circulator<'_, P>> {
        let start = self.vertex(v)?.halfedge;
        Ok(Circulator::new(self, start, step_cw))
    }

    /// Adjacent vertices in counter-clockwise order.
    pub fn vertex_neighbors(&self, v: VertexId) -> Result<impl Iterator<Item = VertexId> + '_> {
        Ok(self
            .vertex_halfedges(v)?
            .map(move |h| self.halfedges[h.index()].target))
    }

    /// Incident faces in counter-clockwise order.
    pub fn vertex_faces(&self, v: VertexId) -> Result<impl Iterator<Item = FaceId> + '_> {
        Ok(self
            .vertex_halfedges(v)?
            .filter_map(move |h| self.halfedges[h.index()].face))
    }

    /// Number of adjacent vertices, zero for isolated vertices.
    pub fn vertex_degree(&self, v: VertexId) -> Result<usize> {
        Ok(self.vertex_halfedges_cw(v)?.count())
    }

    /// Isolated vertices and vertices with an incident boundary halfedge.
    pub fn is_boundary_vertex(&self, v: VertexId) -> Result<bool> {
        if self.vertex(v)?.is_isolated() {
            return Ok(true);
        }
        Ok(self
            .vertex_halfedges(v)?
            .any(|h| self.halfedges[h.index()].face.is_none()))
    }

    /// Halfedges of the face loop of `f`.
    pub fn face_halfedges(&self, f: FaceId) -> Result<Circulator<'_, P>> {
        let start = self.face(f)?.halfedge;
        Ok(Circulator::new(self, start, step_next))
    }

    /// Vertices of `f` in counter-clockwise order.
    pub fn face_vertices(&self, f: FaceId) -> Result<impl Iterator<Item = VertexId> + '_> {
        Ok(self
            .face_halfedges(f)?
            .map(move |h| self.halfedges[h.index()].origin))
    }

    /// Vertices of `f` in clockwise order, starting at the origin of the
    /// predecessor of its halfedge.
    pub fn face_vertices_cw(&self, f: FaceId) -> Result<impl Iterator<Item = VertexId> + '_> {
        let start = self
            .face(f)?
            .halfedge
            .map(|h| self.halfedges[h.index()].prev)
            .filter(|h| h.is_valid());
        Ok(Circulator::new(self, start, step_prev).map(move |h| self.halfedges[h.index()].origin))
    }

    /// Number of vertices of `f`, zero for empty faces.
    pub fn face_valence(&self, f: FaceId) -> Result<usize> {
        Ok(self.face_halfedges(f)?.count())
    }

    /// Faces sharing an edge with `f`, counter-clockwise.
    pub fn adjacent_faces(&self, f: FaceId) -> Result<impl Iterator<Item = FaceId> + '_> {
        Ok(self.face_halfedges(f)?.filter_map(move |h| {
            let pair = self.halfedges[h.index()].pair;
            self.halfedges.get(pair.index()).and_then(|p| p.face)
        }))
    }

    /// Faces sharing an edge or only a vertex with `f`, counter-clockwise.
    ///
    /// For each corner the faces around it are visited from the one across
    /// the incoming edge up to, not including, the one across the outgoing
    /// edge, which the next corner reports first.
    pub fn face_link_faces(&self, f: FaceId) -> Result<impl Iterator<Item = FaceId> + '_> {
        let mut faces = Vec::new();
        for h in self.face_halfedges(f)? {
            let fan: Vec<HalfedgeId> = Circulator::new(self, Some(h), step_ccw).collect();
            let inner = fan.len().saturating_sub(2);
            faces.extend(
                fan.iter()
                    .skip(1)
                    .take(inner)
                    .filter_map(|g| self.halfedges[g.index()].face)
                    .filter(|&g| g != f),
            );
        }
        Ok(faces.into_iter())
    }

    /// A face with at least one boundary edge. Empty faces never are.
    pub fn is_boundary_face(&self, f: FaceId) -> Result<bool> {
        Ok(self.face_halfedges(f)?.any(|h| {
            let pair = self.halfedges[h.index()].pair;
            self.halfedges
                .get(pair.index())
                .map_or(true, |p| p.face.is_none())
        }))
    }

    /// Boundary components as vertex loops in positive orientation.
    pub fn boundary(&self) -> Result<Vec<Vec<VertexId>>> {
        self.boundary_oriented(Orientation::Ccw)
    }

    /// Boundary components as vertex loops.
    ///
    /// Each loop lists the targets of its boundary halfedges, following
    /// `prev` for [`Orientation::Ccw`] and `next` for [`Orientation::Cw`].
    /// A halfedge reachable from two components is reported as a
    /// non-manifold error.
    pub fn boundary_oriented(&self, orientation: Orientation) -> Result<Vec<Vec<VertexId>>> {
        let mut components = Vec::new();
        let mut visited: AHashSet<HalfedgeId> = AHashSet::new();

        for h in self.halfedges() {
            if self.halfedges[h.index()].face.is_some() || visited.contains(&h) {
                continue;
            }
            if visited.contains(&self.halfedges[h.index()].pair) {
                return Err(GeometryError::non_manifold(format!(
                    "twin of boundary halfedge {:?} was already traced",
                    h
                )));
            }

            let mut component = Vec::new();
            let mut hh = h;
            loop {
                let he = self.link(hh)?;
                component.push(he.target);
                visited.insert(hh);
                hh = match orientation {
                    Orientation::Ccw => he.prev,
                    Orientation::Cw => he.next,
                };
                if hh == h {
                    break;
                }
                let pair = self.link(hh)?.pair;
                if visited.contains(&hh) || visited.contains(&pair) {
                    return Err(GeometryError::non_manifold(format!(
                        "boundary halfedge {:?} reached from two components",
                        hh
                    )));
                }
            }
            components.push(component);
        }

        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fan of four triangles around vertex 0, open between 1 and 4.
    fn open_fan() -> Mesh<()> {
        Mesh::new(
            vec![(); 5],
            vec![vec![0usize, 1, 2], vec![0, 2, 3], vec![0, 3, 4]],
        )
        .unwrap()
    }

    #[test]
    fn test_vertex_circulators() {
        let mesh = open_fan();
        let v0 = VertexId::new(0);
        assert_eq!(mesh.vertex_degree(v0).unwrap(), 4);

        let mut ccw: Vec<usize> = mesh.vertex_neighbors(v0).unwrap().map(VertexId::index).collect();
        ccw.sort_unstable();
        assert_eq!(ccw, vec![1, 2, 3, 4]);

        let ccw: Vec<HalfedgeId> = mesh.vertex_halfedges(v0).unwrap().collect();
        let mut cw: Vec<HalfedgeId> = mesh.vertex_halfedges_cw(v0).unwrap().collect();
        cw[1..].reverse();
        assert_eq!(ccw, cw);

        assert_eq!(mesh.vertex_faces(v0).unwrap().count(), 3);
        assert!(mesh.is_boundary_vertex(v0).unwrap());
    }

    #[test]
    fn test_closed_fan_vertex_is_interior() {
        let mut mesh = open_fan();
        mesh.add_face([0usize, 4, 1]).unwrap();
        let v0 = VertexId::new(0);
        assert!(!mesh.is_boundary_vertex(v0).unwrap());
        assert_eq!(mesh.vertex_faces(v0).unwrap().count(), 4);
        assert_eq!(mesh.boundary().unwrap().len(), 1);
    }

    #[test]
    fn test_face_circulators() {
        let mesh = open_fan();
        let f = FaceId::new(1);
        let ccw: Vec<usize> = mesh.face_vertices(f).unwrap().map(VertexId::index).collect();
        assert_eq!(ccw, vec![0, 2, 3]);
        let cw: Vec<usize> = mesh.face_vertices_cw(f).unwrap().map(VertexId::index).collect();
        assert_eq!(cw, vec![3, 2, 0]);
        assert_eq!(mesh.face_valence(f).unwrap(), 3);

        let mut adjacent: Vec<usize> = mesh.adjacent_faces(f).unwrap().map(FaceId::index).collect();
        adjacent.sort_unstable();
        assert_eq!(adjacent, vec![0, 2]);
        assert!(mesh.is_boundary_face(f).unwrap());
    }

    #[test]
    fn test_vertex_link_faces() {
        let mesh = open_fan();
        let f0 = FaceId::new(0);
        let by_edge: Vec<usize> = mesh.adjacent_faces(f0).unwrap().map(FaceId::index).collect();
        assert_eq!(by_edge, vec![1]);

        // Face 2 touches face 0 only at the fan center
        let by_vertex: Vec<usize> = mesh.face_link_faces(f0).unwrap().map(FaceId::index).collect();
        assert_eq!(by_vertex, vec![1, 2]);

        let mut around_middle: Vec<usize> = mesh
            .face_link_faces(FaceId::new(1))
            .unwrap()
            .map(FaceId::index)
            .collect();
        around_middle.sort_unstable();
        assert_eq!(around_middle, vec![0, 2]);
    }

    #[test]
    fn test_boundary_orientations() {
        let mesh = Mesh::new(vec![(); 4], vec![vec![0usize, 1, 2, 3]]).unwrap();
        let ccw = mesh.boundary().unwrap();
        let cw = mesh.boundary_oriented(Orientation::Cw).unwrap();
        assert_eq!(ccw.len(), 1);
        assert_eq!(ccw[0].len(), 4);

        // Same cycle, opposite direction
        let forward: Vec<usize> = ccw[0].iter().map(|v| v.index()).collect();
        let mut backward: Vec<usize> = cw[0].iter().map(|v| v.index()).collect();
        let start = forward[0];
        let rot = backward.iter().position(|&v| v == start).unwrap();
        backward.rotate_left(rot);
        backward[1..].reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_invalid_handles() {
        let mesh = open_fan();
        assert!(mesh.vertex_halfedges(VertexId::new(9)).is_err());
        assert!(mesh.face_halfedges(FaceId::new(9)).is_err());
    }
}
