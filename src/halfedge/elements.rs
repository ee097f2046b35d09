// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex, halfedge and face records stored in the mesh arenas.

use super::index::{FaceId, HalfedgeId, VertexId};

/// A mesh vertex carrying an arbitrary payload (usually coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex<P> {
    pub(crate) payload: P,
    /// One outgoing halfedge, `None` while isolated.
    pub(crate) halfedge: Option<HalfedgeId>,
    pub(crate) deleted: bool,
}

impl<P> Vertex<P> {
    pub(crate) fn new(payload: P) -> Self {
        Self {
            payload,
            halfedge: None,
            deleted: false,
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn halfedge(&self) -> Option<HalfedgeId> {
        self.halfedge
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Not connected to any edge or face.
    pub fn is_isolated(&self) -> bool {
        self.halfedge.is_none()
    }
}

/// One direction of an edge.
///
/// The halfedges bounding a face form a closed `next`/`prev` cycle. A
/// halfedge without a face is a boundary halfedge and belongs to a boundary
/// loop instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halfedge {
    pub(crate) origin: VertexId,
    pub(crate) target: VertexId,
    pub(crate) next: HalfedgeId,
    pub(crate) prev: HalfedgeId,
    pub(crate) pair: HalfedgeId,
    pub(crate) face: Option<FaceId>,
    pub(crate) deleted: bool,
}

impl Halfedge {
    pub(crate) fn new(origin: VertexId, target: VertexId) -> Self {
        Self {
            origin,
            target,
            next: HalfedgeId::INVALID,
            prev: HalfedgeId::INVALID,
            pair: HalfedgeId::INVALID,
            face: None,
            deleted: false,
        }
    }

    pub fn origin(&self) -> VertexId {
        self.origin
    }

    pub fn target(&self) -> VertexId {
        self.target
    }

    pub fn next(&self) -> HalfedgeId {
        self.next
    }

    pub fn prev(&self) -> HalfedgeId {
        self.prev
    }

    pub fn pair(&self) -> HalfedgeId {
        self.pair
    }

    pub fn face(&self) -> Option<FaceId> {
        self.face
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// No incident face.
    pub fn is_boundary(&self) -> bool {
        self.face.is_none()
    }
}

/// A mesh face, described by one of its halfedges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub(crate) halfedge: Option<HalfedgeId>,
    pub(crate) deleted: bool,
}

impl Face {
    pub(crate) fn new(halfedge: HalfedgeId) -> Self {
        Self {
            halfedge: Some(halfedge),
            deleted: false,
        }
    }

    pub fn halfedge(&self) -> Option<HalfedgeId> {
        self.halfedge
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Lost its halfedge loop through deletion or an edge merge.
    pub fn is_empty(&self) -> bool {
        self.halfedge.is_none()
    }
}
