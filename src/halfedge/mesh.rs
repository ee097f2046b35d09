// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Halfedge mesh for orientable 2-manifolds
//!
//! Vertices, halfedges and faces live in three arenas owned by [`Mesh`] and
//! refer to each other through typed handles. A map from `(origin, target)`
//! to the halfedge joining them gives O(1) edge lookup.
//!
//! Faces are added incrementally. Every successful [`Mesh::add_face`] keeps
//! the following intact:
//!
//! - `pair(pair(h)) == h`
//! - `next(prev(h)) == h` and `prev(next(h)) == h`
//! - the `next` cycle of a face visits each of its vertices once
//! - at most one face claims a directed edge
//! - halfedges without a face form closed boundary loops
//!
//! Deletion is soft. [`Mesh::clean`] drops deleted and unused elements and
//! renumbers the arenas.

use std::ops::Index;

use ahash::{AHashMap, AHashSet};

use super::elements::{Face, Halfedge, Vertex};
use super::index::{FaceId, HalfedgeId, VertexId};
use crate::error::{GeometryError, Result};

/// Halfedge mesh with a payload of type `P` per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<P> {
    pub(crate) vertices: Vec<Vertex<P>>,
    pub(crate) halfedges: Vec<Halfedge>,
    pub(crate) faces: Vec<Face>,
    pub(crate) edge_map: AHashMap<(VertexId, VertexId), HalfedgeId>,
}

/// Undo log for a single `add_face` call.
///
/// Pre-existing records are saved before their first modification; records
/// appended during the call are dropped by truncation.
struct Journal {
    halfedge_len: usize,
    face_len: usize,
    halfedges: Vec<(HalfedgeId, Halfedge)>,
    vertices: Vec<(VertexId, Option<HalfedgeId>)>,
    keys: Vec<(VertexId, VertexId)>,
}

impl Journal {
    fn new<P>(mesh: &Mesh<P>) -> Self {
        Self {
            halfedge_len: mesh.halfedges.len(),
            face_len: mesh.faces.len(),
            halfedges: Vec::new(),
            vertices: Vec::new(),
            keys: Vec::new(),
        }
    }

    fn save_halfedge<P>(&mut self, mesh: &Mesh<P>, h: HalfedgeId) {
        if h.index() < self.halfedge_len {
            self.halfedges.push((h, mesh.halfedges[h.index()]));
        }
    }

    fn save_vertex<P>(&mut self, mesh: &Mesh<P>, v: VertexId) {
        self.vertices.push((v, mesh.vertices[v.index()].halfedge));
    }

    fn rollback<P>(self, mesh: &mut Mesh<P>) {
        for (h, saved) in self.halfedges.into_iter().rev() {
            mesh.halfedges[h.index()] = saved;
        }
        for (v, saved) in self.vertices.into_iter().rev() {
            mesh.vertices[v.index()].halfedge = saved;
        }
        for key in &self.keys {
            mesh.edge_map.remove(key);
        }
        mesh.halfedges.truncate(self.halfedge_len);
        mesh.faces.truncate(self.face_len);
    }
}

impl<P> Default for Mesh<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P> Mesh<P> {
    /// Mesh without any elements.
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
            edge_map: AHashMap::new(),
        }
    }

    /// Build a mesh from parallel vertex and face arrays.
    ///
    /// Faces are added in order; the first one that cannot be added aborts
    /// construction.
    pub fn new<V, F>(vertices: V, faces: F) -> Result<Self>
    where
        V: IntoIterator<Item = P>,
        F: IntoIterator,
        F::Item: AsRef<[usize]>,
    {
        let mut mesh = Self::empty();
        for payload in vertices {
            mesh.add_vertex(payload);
        }
        for face in faces {
            mesh.add_face(face.as_ref().iter().copied())?;
        }
        Ok(mesh)
    }

    pub fn add_vertex(&mut self, payload: P) -> VertexId {
        self.vertices.push(Vertex::new(payload));
        VertexId::new(self.vertices.len() - 1)
    }

    /// Add a face bounded by the given vertices in counter-clockwise order.
    ///
    /// Fails on an empty vertex list, unknown or deleted vertices, a repeated
    /// vertex, a directed edge that already bounds a face, or a vertex whose
    /// fan cannot be closed. A failing call leaves the mesh untouched.
    pub fn add_face<I>(&mut self, vids: I) -> Result<FaceId>
    where
        I: IntoIterator,
        I::Item: Into<VertexId>,
    {
        let vids: Vec<VertexId> = vids.into_iter().map(Into::into).collect();
        self.validate_face(&vids)?;

        let mut journal = Journal::new(self);
        match self.link_face(&vids, &mut journal) {
            Ok(face) => Ok(face),
            Err(err) => {
                tracing::debug!(face = ?vids, error = %err, "add_face rolled back");
                journal.rollback(self);
                Err(err)
            }
        }
    }

    fn validate_face(&self, vids: &[VertexId]) -> Result<()> {
        if vids.is_empty() {
            return Err(GeometryError::non_manifold("empty faces cannot be added"));
        }
        let n = vids.len();
        let mut seen = AHashSet::with_capacity(n);
        for (k, &v) in vids.iter().enumerate() {
            self.check_vertex(v)?;
            let w = vids[(k + 1) % n];
            if v == w {
                return Err(GeometryError::non_manifold(format!(
                    "degenerate edge ({}, {}), identical vertices",
                    v, w
                )));
            }
            if !seen.insert(v) {
                return Err(GeometryError::non_manifold(format!(
                    "vertex {} appears twice in face {:?}",
                    v, vids
                )));
            }
        }
        Ok(())
    }

    /// Get or create the halfedge `v -> w`.
    ///
    /// A new halfedge only gets its `pair` set, and only if the reverse
    /// direction is already mapped.
    fn add_halfedge(&mut self, v: VertexId, w: VertexId, journal: &mut Journal) -> Result<HalfedgeId> {
        if v == w {
            return Err(GeometryError::non_manifold(format!(
                "degenerate edge ({}, {}), identical vertices",
                v, w
            )));
        }
        if let Some(&h) = self.edge_map.get(&(v, w)) {
            if self.halfedges[h.index()].face.is_some() {
                return Err(GeometryError::non_manifold(format!(
                    "edge ({}, {}) already bounds a face",
                    v, w
                )));
            }
            return Ok(h);
        }

        let mut halfedge = Halfedge::new(v, w);
        if let Some(&pair) = self.edge_map.get(&(w, v)) {
            halfedge.pair = pair;
        }
        let h = HalfedgeId::new(self.halfedges.len());
        self.halfedges.push(halfedge);
        self.edge_map.insert((v, w), h);
        journal.keys.push((v, w));
        Ok(h)
    }

    fn link_face(&mut self, vids: &[VertexId], journal: &mut Journal) -> Result<FaceId> {
        let n = vids.len();
        let face = FaceId::new(self.faces.len());

        let mut edge_loop = Vec::with_capacity(n);
        for k in 0..n {
            edge_loop.push(self.add_halfedge(vids[k], vids[(k + 1) % n], journal)?);
        }

        // Bind the loop to the new face and complete the pair relation
        for &h in &edge_loop {
            journal.save_halfedge(self, h);
            let origin = self.halfedges[h.index()].origin;
            journal.save_vertex(self, origin);
            self.halfedges[h.index()].face = Some(face);
            self.vertices[origin.index()].halfedge = Some(h);

            let pair = self.halfedges[h.index()].pair;
            if pair.is_valid() {
                journal.save_halfedge(self, pair);
                self.halfedges[pair.index()].pair = h;
            }
        }

        self.faces.push(Face::new(edge_loop[0]));

        // Inner loop
        for i in 0..n {
            let (hi, hj) = (edge_loop[i], edge_loop[(i + 1) % n]);
            self.halfedges[hi.index()].next = hj;
            self.halfedges[hj.index()].prev = hi;
        }

        // Boundary twins for edges seen for the first time
        for &h in &edge_loop {
            if !self.halfedges[h.index()].pair.is_valid() {
                let (origin, target) = {
                    let he = &self.halfedges[h.index()];
                    (he.origin, he.target)
                };
                let twin = self.add_halfedge(target, origin, journal)?;
                self.halfedges[h.index()].pair = twin;
            }
        }

        // Outer loop: for each inner halfedge rotate clockwise about its
        // origin to the boundary, then counter-clockwise from the
        // predecessor until the same boundary is reached, and join the two.
        let limit = self.halfedges.len();
        for &h in &edge_loop {
            let mut boundary_in = None;
            let mut hh = h;
            let mut closed = false;
            for _ in 0..=limit {
                let pair = self.link(hh)?.pair;
                if self.link(pair)?.face.is_none() {
                    boundary_in = Some(pair);
                    break;
                }
                hh = self.link(pair)?.next;
                if hh == h {
                    closed = true;
                    break;
                }
            }
            let ph = match boundary_in {
                Some(ph) => ph,
                None if closed => continue,
                None => return Err(self.fan_error(h)),
            };

            hh = h;
            let mut joined = false;
            for _ in 0..=limit {
                let prev = self.link(hh)?.prev;
                hh = self.link(prev)?.pair;
                if hh == h {
                    return Err(self.fan_error(h));
                }
                if self.link(hh)?.face.is_none() {
                    journal.save_halfedge(self, hh);
                    journal.save_halfedge(self, ph);
                    self.halfedges[hh.index()].prev = ph;
                    self.halfedges[ph.index()].next = hh;
                    joined = true;
                    break;
                }
            }
            if !joined {
                return Err(self.fan_error(h));
            }
        }

        Ok(face)
    }

    /// Raised when a fan walk finds no boundary. Consistent links always
    /// have one, so this guards against corrupted connectivity.
    fn fan_error(&self, h: HalfedgeId) -> GeometryError {
        let origin = self.halfedges[h.index()].origin;
        GeometryError::non_manifold(format!("vertex {} is a non-manifold vertex", origin))
    }

    /// Live halfedge behind a link, or a non-manifold error for a dangling one.
    pub(crate) fn link(&self, h: HalfedgeId) -> Result<&Halfedge> {
        match self.halfedges.get(h.index()) {
            Some(he) if !he.deleted => Ok(he),
            _ => Err(GeometryError::non_manifold(format!(
                "broken halfedge link {:?}",
                h
            ))),
        }
    }

    /// Soft-delete a face.
    ///
    /// Bounding halfedges whose twin is a boundary halfedge are removed
    /// together with the twin, the others become boundary halfedges. No
    /// manifold check is made, removing faces may leave non-manifold vertices
    /// behind.
    pub fn del_face(&mut self, f: FaceId) -> Result<()> {
        self.check_face(f)?;
        let edge_loop: Vec<HalfedgeId> = self.face_halfedges(f)?.collect();

        self.faces[f.index()].deleted = true;
        for h in edge_loop {
            if self.halfedges[h.index()].deleted {
                continue;
            }
            let pair = self.halfedges[h.index()].pair;
            let pair_is_boundary = self
                .halfedges
                .get(pair.index())
                .map_or(true, |p| p.face.is_none());
            if pair_is_boundary {
                self.remove_edge(h)?;
            } else {
                self.halfedges[h.index()].face = None;
            }
        }
        self.faces[f.index()].halfedge = None;
        Ok(())
    }

    /// Remove the edge spanned by `h` and its twin, merging the two incident
    /// faces into the face of the twin. The other face becomes empty.
    ///
    /// Removing an edge with a boundary side is also allowed and may leave
    /// dangling edges.
    pub fn del_edge(&mut self, h: HalfedgeId) -> Result<()> {
        self.check_halfedge(h)?;
        self.remove_edge(h)
    }

    fn remove_edge(&mut self, mut h: HalfedgeId) -> Result<()> {
        let mut he = *self.link(h)?;
        let mut pair = *self.link(he.pair)?;

        // Keep the faced side as `h`
        if pair.face.is_some() && he.face.is_none() {
            h = he.pair;
            std::mem::swap(&mut he, &mut pair);
        }
        let hp = he.pair;

        // The surviving face must not keep h or its twin as its halfedge
        if let Some(pf) = pair.face {
            if let Some(start) = self.faces[pf.index()].halfedge {
                let mut cur = start;
                let limit = self.halfedges.len();
                for _ in 0..limit {
                    if cur != h && cur != hp {
                        break;
                    }
                    cur = self.link(cur)?.next;
                    if cur == start {
                        break;
                    }
                }
                if cur == h || cur == hp {
                    return Err(GeometryError::non_manifold(
                        "face connectivity cannot be sanitized before edge removal",
                    ));
                }
                self.faces[pf.index()].halfedge = Some(cur);
            }
        }

        // Neither endpoint may keep a removed halfedge as its outgoing one
        self.reroute_vertex(he.origin, h)?;
        self.reroute_vertex(pair.origin, hp)?;

        // Merge the face of h into the face of its twin
        if pair.face != he.face {
            if let Some(f) = he.face {
                self.faces[f.index()].halfedge = None;
            }
            let mut cur = h;
            for _ in 0..self.halfedges.len() {
                self.halfedges[cur.index()].face = pair.face;
                cur = self.link(cur)?.next;
                if cur == h {
                    break;
                }
            }
        }

        // Splice both loops around the removed edge. Links are re-read after
        // every write since h and its twin may be neighbours.
        for step in 0..4 {
            let (h_prev, h_next) = (self.link(h)?.prev, self.link(h)?.next);
            let (p_prev, p_next) = (self.link(hp)?.prev, self.link(hp)?.next);
            self.link(h_prev)?;
            self.link(h_next)?;
            self.link(p_prev)?;
            self.link(p_next)?;
            match step {
                0 => self.halfedges[h_prev.index()].next = p_next,
                1 => self.halfedges[p_next.index()].prev = h_prev,
                2 => self.halfedges[h_next.index()].prev = p_prev,
                _ => self.halfedges[p_prev.index()].next = h_next,
            }
        }

        for id in [h, hp] {
            let removed = &mut self.halfedges[id.index()];
            removed.deleted = true;
            let key = (removed.origin, removed.target);
            self.edge_map.remove(&key);
        }
        Ok(())
    }

    /// Move the outgoing halfedge of `v` off `removed`, clearing it if `v`
    /// has no other outgoing halfedge.
    fn reroute_vertex(&mut self, v: VertexId, removed: HalfedgeId) -> Result<()> {
        let Some(start) = self.vertices[v.index()].halfedge else {
            return Ok(());
        };
        if start != removed {
            return Ok(());
        }
        let pair = self.link(removed)?.pair;
        let candidate = self.link(pair)?.next;
        self.vertices[v.index()].halfedge = if candidate == removed {
            None
        } else {
            Some(candidate)
        };
        Ok(())
    }

    /// Delete every face incident with `v` and mark `v` deleted.
    pub fn del_vertex(&mut self, v: VertexId) -> Result<()> {
        self.check_vertex(v)?;
        let faces: Vec<FaceId> = self.vertex_faces(v)?.collect();
        for f in faces {
            if !self.faces[f.index()].deleted {
                self.del_face(f)?;
            }
        }
        self.vertices[v.index()].deleted = true;
        Ok(())
    }

    /// Garbage collection.
    ///
    /// Drops deleted and isolated vertices, removed halfedges and deleted or
    /// empty faces, then renumbers all three arenas. Every handle obtained
    /// before the call is invalidated.
    pub fn clean(&mut self) {
        let vertex_map = remap(self.vertices.iter().map(|v| !v.deleted && v.halfedge.is_some()));
        let halfedge_map = remap(self.halfedges.iter().map(|h| !h.deleted));
        let face_map = remap(self.faces.iter().map(|f| !f.deleted && f.halfedge.is_some()));

        let map_h = |h: HalfedgeId| -> HalfedgeId {
            halfedge_map
                .get(h.index())
                .copied()
                .flatten()
                .map_or(HalfedgeId::INVALID, HalfedgeId::new)
        };
        let map_v = |v: VertexId| -> VertexId {
            vertex_map
                .get(v.index())
                .copied()
                .flatten()
                .map_or(VertexId::INVALID, VertexId::new)
        };
        let map_f = |f: FaceId| -> Option<FaceId> {
            face_map.get(f.index()).copied().flatten().map(FaceId::new)
        };

        let vertices = std::mem::take(&mut self.vertices);
        self.vertices = vertices
            .into_iter()
            .zip(&vertex_map)
            .filter(|(_, keep)| keep.is_some())
            .map(|(mut v, _)| {
                v.halfedge = v.halfedge.map(map_h).filter(|h| h.is_valid());
                v
            })
            .collect();

        let halfedges = std::mem::take(&mut self.halfedges);
        self.halfedges = halfedges
            .into_iter()
            .filter(|h| !h.deleted)
            .map(|h| Halfedge {
                origin: map_v(h.origin),
                target: map_v(h.target),
                next: map_h(h.next),
                prev: map_h(h.prev),
                pair: map_h(h.pair),
                face: h.face.and_then(map_f),
                deleted: false,
            })
            .collect();

        let faces = std::mem::take(&mut self.faces);
        self.faces = faces
            .into_iter()
            .filter(|f| !f.deleted && f.halfedge.is_some())
            .map(|f| Face {
                halfedge: f.halfedge.map(map_h).filter(|h| h.is_valid()),
                deleted: false,
            })
            .collect();

        self.edge_map = self
            .halfedges
            .iter()
            .enumerate()
            .map(|(i, h)| ((h.origin, h.target), HalfedgeId::new(i)))
            .collect();
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.halfedges.clear();
        self.faces.clear();
        self.edge_map.clear();
    }

    /// Deep copy of connectivity and payloads.
    ///
    /// Isolated vertices and empty faces are copied too.
    pub fn copy(&self) -> Self
    where
        P: Clone,
    {
        self.clone()
    }

    /// Copy the connectivity with a replacement payload per vertex.
    pub fn copy_with<Q, I>(&self, payloads: I) -> Result<Mesh<Q>>
    where
        I: IntoIterator<Item = Q>,
    {
        let payloads: Vec<Q> = payloads.into_iter().collect();
        if payloads.len() != self.vertices.len() {
            return Err(GeometryError::CountMismatch {
                what: "vertex payloads",
                expected: self.vertices.len(),
                found: payloads.len(),
            });
        }
        let vertices = self
            .vertices
            .iter()
            .zip(payloads)
            .map(|(v, payload)| Vertex {
                payload,
                halfedge: v.halfedge,
                deleted: v.deleted,
            })
            .collect();
        Ok(Mesh {
            vertices,
            halfedges: self.halfedges.clone(),
            faces: self.faces.clone(),
            edge_map: self.edge_map.clone(),
        })
    }

    /// Number of vertices, including deleted and isolated ones.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live halfedges.
    pub fn num_halfedges(&self) -> usize {
        self.edge_map.len()
    }

    /// Number of faces, including deleted and empty ones.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, v: VertexId) -> Result<&Vertex<P>> {
        self.vertices.get(v.index()).ok_or(GeometryError::VertexIndex {
            index: v.index(),
            len: self.vertices.len(),
        })
    }

    pub fn payload(&self, v: VertexId) -> Result<&P> {
        self.vertex(v).map(Vertex::payload)
    }

    pub fn payload_mut(&mut self, v: VertexId) -> Result<&mut P> {
        let len = self.vertices.len();
        self.vertices
            .get_mut(v.index())
            .map(|v| &mut v.payload)
            .ok_or(GeometryError::VertexIndex { index: v.index(), len })
    }

    pub fn face(&self, f: FaceId) -> Result<&Face> {
        self.faces.get(f.index()).ok_or(GeometryError::FaceIndex {
            index: f.index(),
            len: self.faces.len(),
        })
    }

    /// The halfedge from `v` to `w`.
    pub fn halfedge(&self, v: VertexId, w: VertexId) -> Result<HalfedgeId> {
        self.edge_map
            .get(&(v, w))
            .copied()
            .ok_or(GeometryError::MissingHalfedge {
                origin: v.index(),
                target: w.index(),
            })
    }

    /// Halfedge record behind a handle.
    pub fn halfedge_at(&self, h: HalfedgeId) -> Result<&Halfedge> {
        match self.halfedges.get(h.index()) {
            Some(he) if !he.deleted => Ok(he),
            _ => Err(GeometryError::HalfedgeIndex { index: h.index() }),
        }
    }

    pub(crate) fn check_vertex(&self, v: VertexId) -> Result<()> {
        match self.vertices.get(v.index()) {
            Some(vertex) if !vertex.deleted => Ok(()),
            _ => Err(GeometryError::VertexIndex {
                index: v.index(),
                len: self.vertices.len(),
            }),
        }
    }

    pub(crate) fn check_face(&self, f: FaceId) -> Result<()> {
        self.face(f).map(|_| ())
    }

    pub(crate) fn check_halfedge(&self, h: HalfedgeId) -> Result<()> {
        self.halfedge_at(h).map(|_| ())
    }

    /// All vertex handles in arena order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Live halfedge handles in arena order.
    pub fn halfedges(&self) -> impl Iterator<Item = HalfedgeId> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.deleted)
            .map(|(i, _)| HalfedgeId::new(i))
    }

    /// All face handles in arena order.
    pub fn faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// One halfedge per undirected edge.
    pub fn edges(&self) -> impl Iterator<Item = HalfedgeId> + '_ {
        self.halfedges().filter(move |&h| {
            let pair = self.halfedges[h.index()].pair;
            !pair.is_valid() || h < pair
        })
    }

    /// Vertex payloads in arena order.
    pub fn vertex_list(&self) -> Vec<P>
    where
        P: Clone,
    {
        self.vertices.iter().map(|v| v.payload.clone()).collect()
    }

    /// Vertex indices of every face in arena order. Empty faces give empty
    /// lists, call [`clean`](Self::clean) first to drop them.
    pub fn face_list(&self) -> Vec<Vec<usize>> {
        self.faces()
            .map(|f| {
                self.face_vertices(f)
                    .map(|it| it.map(VertexId::index).collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Parallel vertex and face arrays, the inverse of [`Mesh::new`].
    pub fn indexed_mesh(&self) -> (Vec<P>, Vec<Vec<usize>>)
    where
        P: Clone,
    {
        (self.vertex_list(), self.face_list())
    }
}

/// Old position → new position for the kept entries.
fn remap(keep: impl Iterator<Item = bool>) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.map(|k| {
        if k {
            next += 1;
            Some(next - 1)
        } else {
            None
        }
    })
    .collect()
}

impl<P> Index<VertexId> for Mesh<P> {
    type Output = Vertex<P>;

    fn index(&self, v: VertexId) -> &Vertex<P> {
        &self.vertices[v.index()]
    }
}

impl<P> Index<HalfedgeId> for Mesh<P> {
    type Output = Halfedge;

    fn index(&self, h: HalfedgeId) -> &Halfedge {
        &self.halfedges[h.index()]
    }
}

impl<P> Index<FaceId> for Mesh<P> {
    type Output = Face;

    fn index(&self, f: FaceId) -> &Face {
        &self.faces[f.index()]
    }
}
