// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared by the mesh, spatial search and queue modules.

use thiserror::Error;

/// Result type alias using [`GeometryError`].
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised by mesh, spatial search and priority queue operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// An operation would break the 2-manifold, orientable topology.
    #[error("non-manifold topology: {details}")]
    NonManifold {
        /// Description of the offending configuration.
        details: String,
    },

    /// A vertex index is out of range or refers to a deleted vertex.
    #[error("vertex index {index} is invalid (mesh has {len} vertices)")]
    VertexIndex {
        /// The requested index.
        index: usize,
        /// Number of vertices in the mesh.
        len: usize,
    },

    /// A face index is out of range.
    #[error("face index {index} is invalid (mesh has {len} faces)")]
    FaceIndex {
        /// The requested index.
        index: usize,
        /// Number of faces in the mesh.
        len: usize,
    },

    /// A halfedge handle is out of range or refers to a removed halfedge.
    #[error("halfedge index {index} is invalid")]
    HalfedgeIndex {
        /// The requested index.
        index: usize,
    },

    /// No halfedge joins the given vertices.
    #[error("no halfedge from vertex {origin} to vertex {target}")]
    MissingHalfedge {
        /// Origin vertex index.
        origin: usize,
        /// Target vertex index.
        target: usize,
    },

    /// Items or query points of inconsistent ambient dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension established by the first item.
        expected: usize,
        /// Dimension of the offending item.
        found: usize,
    },

    /// A primitive is too small to be handled robustly.
    #[error("degenerate {kind}: measure {measure:e} below threshold")]
    DegenerateGeometry {
        /// Kind of primitive ("triangle", "segment").
        kind: &'static str,
        /// Area or length of the rejected primitive.
        measure: f64,
    },

    /// A face that is expected to be a triangle is not.
    #[error("face {face} has valence {valence}, expected a triangle")]
    NotTriangular {
        /// The face index.
        face: usize,
        /// Its valence.
        valence: usize,
    },

    /// Pop, peek or top on an empty priority queue.
    #[error("priority queue is empty")]
    EmptyQueue,

    /// Priority update for an item that is not queued.
    #[error("item is not in the priority queue")]
    MissingKey,

    /// A replacement collection does not match the mesh.
    #[error("expected {expected} {what}, got {found}")]
    CountMismatch {
        /// What was counted.
        what: &'static str,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl GeometryError {
    /// Create a non-manifold error.
    pub fn non_manifold(details: impl Into<String>) -> Self {
        GeometryError::NonManifold {
            details: details.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        GeometryError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
