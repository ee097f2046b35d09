// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - coordinates, bounding boxes and projectable primitives

mod bbox;
mod primitives;
pub mod shapes;

pub use bbox::BoundingBox;
pub use primitives::{Point, Primitive, Segment, Triangle, MIN_SEGMENT_LENGTH, MIN_TRIANGLE_AREA};
pub use shapes::IndexedShape;

/// Coordinates of a point in n-dimensional space.
pub type Coords = nalgebra::DVector<f64>;
