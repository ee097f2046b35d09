// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Projectable primitives
//!
//! Anything stored in a [`BvhTree`](crate::spatial::BvhTree) implements
//! [`Primitive`]: it knows its ambient dimension, a representative center, an
//! axis-aligned bounding box and how to project a query point onto itself.

use super::{BoundingBox, Coords};
use crate::error::{GeometryError, Result};
use crate::utils::math;

/// Triangles below this area are rejected at construction.
pub const MIN_TRIANGLE_AREA: f64 = 1e-15;

/// Segments below this length are rejected at construction.
pub const MIN_SEGMENT_LENGTH: f64 = 1e-15;

/// Capabilities a spatial tree needs from the items it indexes.
pub trait Primitive {
    /// Ambient dimension.
    fn dim(&self) -> usize;

    /// Representative point used for partitioning.
    fn center(&self) -> &Coords;

    /// Axis-aligned bounding box.
    fn bbox(&self) -> &BoundingBox;

    /// Closest point to `x` and its squared distance.
    fn project(&self, x: &Coords) -> (Coords, f64);

    /// Squared distance from `x` to the closest point.
    fn dist_sqrd(&self, x: &Coords) -> f64 {
        self.project(x).1
    }

    /// Returns `true` if the primitive lies entirely in the closed ball of
    /// squared radius `r_sqrd` around `x`.
    fn contained_in(&self, x: &Coords, r_sqrd: f64) -> bool;
}

impl<T: Primitive + ?Sized> Primitive for Box<T> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn center(&self) -> &Coords {
        (**self).center()
    }

    fn bbox(&self) -> &BoundingBox {
        (**self).bbox()
    }

    fn project(&self, x: &Coords) -> (Coords, f64) {
        (**self).project(x)
    }

    fn dist_sqrd(&self, x: &Coords) -> f64 {
        (**self).dist_sqrd(x)
    }

    fn contained_in(&self, x: &Coords, r_sqrd: f64) -> bool {
        (**self).contained_in(x, r_sqrd)
    }
}

fn check_dims(expected: usize, points: &[&Coords]) -> Result<()> {
    for p in points {
        if p.len() != expected {
            return Err(GeometryError::DimensionMismatch {
                expected,
                found: p.len(),
            });
        }
    }
    Ok(())
}

/// A point in n-dimensional space.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    coords: Coords,
    bbox: BoundingBox,
}

impl Point {
    pub fn new(coords: impl Into<Coords>) -> Self {
        let coords = coords.into();
        let bbox = BoundingBox::from_point(&coords);
        Self { coords, bbox }
    }

    pub fn coords(&self) -> &Coords {
        &self.coords
    }
}

impl From<Coords> for Point {
    fn from(coords: Coords) -> Self {
        Self::new(coords)
    }
}

impl Primitive for Point {
    fn dim(&self) -> usize {
        self.coords.len()
    }

    fn center(&self) -> &Coords {
        &self.coords
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn project(&self, x: &Coords) -> (Coords, f64) {
        (self.coords.clone(), math::dist_sqrd(x, &self.coords))
    }

    fn dist_sqrd(&self, x: &Coords) -> f64 {
        math::dist_sqrd(x, &self.coords)
    }

    fn contained_in(&self, x: &Coords, r_sqrd: f64) -> bool {
        self.dist_sqrd(x) <= r_sqrd
    }
}

/// A line segment between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    a: Coords,
    b: Coords,
    /// Unit direction from `a` to `b`.
    dir: Coords,
    len: f64,
    center: Coords,
    bbox: BoundingBox,
}

impl Segment {
    pub fn new(a: impl Into<Coords>, b: impl Into<Coords>) -> Result<Self> {
        let a = a.into();
        let b = b.into();
        check_dims(a.len(), &[&b])?;

        let v = &b - &a;
        let len = v.norm();
        if !(len >= MIN_SEGMENT_LENGTH) {
            return Err(GeometryError::DegenerateGeometry {
                kind: "segment",
                measure: len,
            });
        }

        let center = (&a + &b) * 0.5;
        let mut bbox = BoundingBox::from_point(&a);
        bbox.expand_to_include(&b);
        Ok(Self {
            dir: v / len,
            len,
            center,
            bbox,
            a,
            b,
        })
    }

    pub fn endpoints(&self) -> (&Coords, &Coords) {
        (&self.a, &self.b)
    }

    pub fn length(&self) -> f64 {
        self.len
    }
}

impl Primitive for Segment {
    fn dim(&self) -> usize {
        self.a.len()
    }

    fn center(&self) -> &Coords {
        &self.center
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn project(&self, x: &Coords) -> (Coords, f64) {
        let t = self.dir.dot(&(x - &self.a));
        let p = if t <= 0.0 {
            self.a.clone()
        } else if t >= self.len {
            self.b.clone()
        } else {
            &self.a + self.dir.scale(t)
        };
        let d_sqrd = (x - &p).norm_squared();
        (p, d_sqrd)
    }

    fn contained_in(&self, x: &Coords, r_sqrd: f64) -> bool {
        (x - &self.a).norm_squared() <= r_sqrd && (x - &self.b).norm_squared() <= r_sqrd
    }
}

/// A triangle in n-dimensional space, n >= 2.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    a: Coords,
    b: Coords,
    c: Coords,
    e0: Coords,
    e1: Coords,
    a00: f64,
    a01: f64,
    a11: f64,
    area: f64,
    center: Coords,
    bbox: BoundingBox,
}

impl Triangle {
    /// Build a triangle from its corners.
    ///
    /// Fails on mixed dimensions, dimension below two and areas below
    /// [`MIN_TRIANGLE_AREA`].
    pub fn new(a: impl Into<Coords>, b: impl Into<Coords>, c: impl Into<Coords>) -> Result<Self> {
        let a = a.into();
        let b = b.into();
        let c = c.into();
        check_dims(a.len(), &[&b, &c])?;
        if a.len() < 2 {
            return Err(GeometryError::invalid_param(
                "dim",
                a.len(),
                "triangles need at least two dimensions",
            ));
        }

        let e0 = &b - &a;
        let e1 = &c - &a;
        let a00 = e0.dot(&e0);
        let a01 = e0.dot(&e1);
        let a11 = e1.dot(&e1);

        // Gram determinant = squared parallelogram area in any dimension
        let gram = (a00 * a11 - a01 * a01).max(0.0);
        let area = 0.5 * gram.sqrt();
        if !(area >= MIN_TRIANGLE_AREA) {
            return Err(GeometryError::DegenerateGeometry {
                kind: "triangle",
                measure: area,
            });
        }

        let center = (&a + &b + &c) / 3.0;
        let mut bbox = BoundingBox::from_point(&a);
        bbox.expand_to_include(&b);
        bbox.expand_to_include(&c);

        Ok(Self {
            a,
            b,
            c,
            e0,
            e1,
            a00,
            a01,
            a11,
            area,
            center,
            bbox,
        })
    }

    pub fn vertices(&self) -> [&Coords; 3] {
        [&self.a, &self.b, &self.c]
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Point with barycentric parameters `(s, t)` relative to corner `a`.
    pub fn point_at(&self, s: f64, t: f64) -> Coords {
        &self.a + self.e0.scale(s) + self.e1.scale(t)
    }

    /// Minimise `|a + s e0 + t e1 - x|²` over `s >= 0, t >= 0, s + t <= 1`.
    ///
    /// Returns `(s, t, d_sqrd)`. The unconstrained minimiser is classified
    /// into one of seven regions of the `(s, t)` plane; outside the triangle
    /// the sign of the gradient along the neighbouring edges picks the edge or
    /// corner that holds the constrained minimum.
    fn closest_params(&self, x: &Coords) -> (f64, f64, f64) {
        let (a00, a01, a11) = (self.a00, self.a01, self.a11);
        let vec = &self.a - x;
        let b0 = self.e0.dot(&vec);
        let b1 = self.e1.dot(&vec);
        let c = vec.dot(&vec);

        let det = (a00 * a11 - a01 * a01).max(0.0);
        let mut s = a01 * b1 - a11 * b0;
        let mut t = a01 * b0 - a00 * b1;
        let d_sqrd;

        // Quadratic value at (s, t)
        let q = |s: f64, t: f64| s * (s * a00 + t * a01 + 2.0 * b0) + t * (s * a01 + t * a11 + 2.0 * b1) + c;

        if s + t <= det {
            if s < 0.0 {
                if t < 0.0 {
                    // Corner a
                    if b0 < 0.0 {
                        t = 0.0;
                        if -b0 < a00 {
                            s = -b0 / a00;
                            d_sqrd = s * b0 + c;
                        } else {
                            s = 1.0;
                            d_sqrd = a00 + 2.0 * b0 + c;
                        }
                    } else {
                        s = 0.0;
                        if b1 >= 0.0 {
                            t = 0.0;
                            d_sqrd = c;
                        } else if -b1 < a11 {
                            t = -b1 / a11;
                            d_sqrd = t * b1 + c;
                        } else {
                            t = 1.0;
                            d_sqrd = a11 + 2.0 * b1 + c;
                        }
                    }
                } else {
                    // Edge s = 0
                    s = 0.0;
                    if b1 >= 0.0 {
                        t = 0.0;
                        d_sqrd = c;
                    } else if a11 <= -b1 {
                        t = 1.0;
                        d_sqrd = a11 + 2.0 * b1 + c;
                    } else {
                        t = -b1 / a11;
                        d_sqrd = t * b1 + c;
                    }
                }
            } else if t < 0.0 {
                // Edge t = 0
                t = 0.0;
                if b0 >= 0.0 {
                    s = 0.0;
                    d_sqrd = c;
                } else if a00 <= -b0 {
                    s = 1.0;
                    d_sqrd = a00 + 2.0 * b0 + c;
                } else {
                    s = -b0 / a00;
                    d_sqrd = s * b0 + c;
                }
            } else {
                // Interior
                s /= det;
                t /= det;
                d_sqrd = q(s, t);
            }
        } else if s < 0.0 {
            // Corner c
            let g0 = a01 + b0;
            let g1 = a11 + b1;
            if g0 < g1 {
                let numer = g1 - g0;
                let denom = a00 - 2.0 * a01 + a11;
                if numer >= denom {
                    s = 1.0;
                    t = 0.0;
                    d_sqrd = a00 + 2.0 * b0 + c;
                } else {
                    s = numer / denom;
                    t = 1.0 - s;
                    d_sqrd = q(s, t);
                }
            } else {
                s = 0.0;
                if g1 <= 0.0 {
                    t = 1.0;
                    d_sqrd = a11 + 2.0 * b1 + c;
                } else if b1 >= 0.0 {
                    t = 0.0;
                    d_sqrd = c;
                } else {
                    t = -b1 / a11;
                    d_sqrd = t * b1 + c;
                }
            }
        } else if t < 0.0 {
            // Corner b
            let g0 = a00 + b0;
            let g1 = a01 + b1;
            if g1 < g0 {
                let numer = g0 - g1;
                let denom = a00 - 2.0 * a01 + a11;
                if numer >= denom {
                    t = 1.0;
                    s = 0.0;
                    d_sqrd = a11 + 2.0 * b1 + c;
                } else {
                    t = numer / denom;
                    s = 1.0 - t;
                    d_sqrd = q(s, t);
                }
            } else {
                t = 0.0;
                if g0 <= 0.0 {
                    s = 1.0;
                    d_sqrd = a00 + 2.0 * b0 + c;
                } else if b0 >= 0.0 {
                    s = 0.0;
                    d_sqrd = c;
                } else {
                    s = -b0 / a00;
                    d_sqrd = s * b0 + c;
                }
            }
        } else {
            // Edge s + t = 1
            let numer = a11 + b1 - a01 - b0;
            if numer <= 0.0 {
                s = 0.0;
                t = 1.0;
                d_sqrd = a11 + 2.0 * b1 + c;
            } else {
                let denom = a00 - 2.0 * a01 + a11;
                if numer >= denom {
                    s = 1.0;
                    t = 0.0;
                    d_sqrd = a00 + 2.0 * b0 + c;
                } else {
                    s = numer / denom;
                    t = 1.0 - s;
                    d_sqrd = q(s, t);
                }
            }
        }

        (s, t, d_sqrd.max(0.0))
    }
}

impl Primitive for Triangle {
    fn dim(&self) -> usize {
        self.a.len()
    }

    fn center(&self) -> &Coords {
        &self.center
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn project(&self, x: &Coords) -> (Coords, f64) {
        let (s, t, d_sqrd) = self.closest_params(x);
        (self.point_at(s, t), d_sqrd)
    }

    fn dist_sqrd(&self, x: &Coords) -> f64 {
        self.closest_params(x).2
    }

    fn contained_in(&self, x: &Coords, r_sqrd: f64) -> bool {
        [&self.a, &self.b, &self.c]
            .iter()
            .all(|p| (x - *p).norm_squared() <= r_sqrd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            dvector![0.0, 0.0, 0.0],
            dvector![1.0, 0.0, 0.0],
            dvector![0.0, 1.0, 0.0],
        )
        .unwrap()
    }

    /// Smallest squared distance over a dense barycentric sample.
    fn sampled_dist_sqrd(tri: &Triangle, x: &Coords) -> f64 {
        let n = 200;
        let mut best = f64::INFINITY;
        for i in 0..=n {
            for j in 0..=(n - i) {
                let p = tri.point_at(i as f64 / n as f64, j as f64 / n as f64);
                best = best.min((x - p).norm_squared());
            }
        }
        best
    }

    #[test]
    fn test_point_projection() {
        let p = Point::new(dvector![1.0, 2.0]);
        let (q, d) = p.project(&dvector![4.0, 6.0]);
        assert_eq!(q, dvector![1.0, 2.0]);
        assert_eq!(d, 25.0);
        assert!(p.contained_in(&dvector![4.0, 6.0], 25.0));
        assert!(!p.contained_in(&dvector![4.0, 6.0], 24.9));
    }

    #[test]
    fn test_segment_projection_regions() {
        let s = Segment::new(dvector![0.0, 0.0], dvector![2.0, 0.0]).unwrap();
        assert_eq!(s.project(&dvector![-1.0, 1.0]), (dvector![0.0, 0.0], 2.0));
        assert_eq!(s.project(&dvector![3.0, -1.0]), (dvector![2.0, 0.0], 2.0));
        let (p, d) = s.project(&dvector![0.5, 3.0]);
        assert_relative_eq!(p[0], 0.5);
        assert_relative_eq!(p[1], 0.0);
        assert_relative_eq!(d, 9.0);
        assert_eq!(s.center(), &dvector![1.0, 0.0]);
    }

    #[test]
    fn test_degenerate_segment_rejected() {
        let err = Segment::new(dvector![1.0, 1.0], dvector![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateGeometry { kind: "segment", .. }));
    }

    #[test]
    fn test_triangle_interior_projection() {
        let tri = unit_triangle();
        let (p, d) = tri.project(&dvector![0.25, 0.25, 2.0]);
        assert_relative_eq!(p[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.25, epsilon = 1e-12);
        assert_relative_eq!(p[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(d, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_vertex_and_edge_regions() {
        let tri = unit_triangle();

        // Beyond each corner
        let (p, _) = tri.project(&dvector![-1.0, -1.0, 0.0]);
        assert_relative_eq!((p - dvector![0.0, 0.0, 0.0]).norm(), 0.0, epsilon = 1e-12);
        let (p, _) = tri.project(&dvector![3.0, -0.5, 0.0]);
        assert_relative_eq!((p - dvector![1.0, 0.0, 0.0]).norm(), 0.0, epsilon = 1e-12);
        let (p, _) = tri.project(&dvector![-0.5, 3.0, 1.0]);
        assert_relative_eq!((p - dvector![0.0, 1.0, 0.0]).norm(), 0.0, epsilon = 1e-12);

        // Beyond the hypotenuse
        let (p, d) = tri.project(&dvector![1.0, 1.0, 0.0]);
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(d, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_matches_sampling() {
        let tri = Triangle::new(
            dvector![0.3, -0.2, 0.1],
            dvector![1.7, 0.4, -0.5],
            dvector![-0.4, 1.1, 0.8],
        )
        .unwrap();
        let queries = [
            dvector![0.0, 0.0, 0.0],
            dvector![2.0, 2.0, 2.0],
            dvector![-1.0, 0.5, -0.3],
            dvector![1.0, -1.0, 0.0],
            dvector![0.5, 0.4, 0.2],
            dvector![-2.0, 3.0, 1.0],
            dvector![3.0, 0.0, -1.0],
        ];
        for x in &queries {
            let (p, d) = tri.project(x);
            assert_relative_eq!((x - &p).norm_squared(), d, epsilon = 1e-9);
            // The exact minimum never exceeds the sampled one
            let sampled = sampled_dist_sqrd(&tri, x);
            assert!(d <= sampled + 1e-12, "{} > {}", d, sampled);
            assert!(sampled - d < 1e-3);
        }
    }

    #[test]
    fn test_triangle_2d() {
        let tri = Triangle::new(dvector![0.0, 0.0], dvector![2.0, 0.0], dvector![0.0, 2.0]).unwrap();
        assert_relative_eq!(tri.area(), 2.0);
        assert_eq!(tri.dist_sqrd(&dvector![0.5, 0.5]), 0.0);
        assert!(tri.contained_in(&dvector![0.5, 0.5], 4.0));
        assert!(!tri.contained_in(&dvector![0.5, 0.5], 1.0));
    }

    #[test]
    fn test_degenerate_triangle_rejected() {
        let err = Triangle::new(
            dvector![0.0, 0.0, 0.0],
            dvector![1.0, 1.0, 1.0],
            dvector![2.0, 2.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateGeometry { kind: "triangle", .. }));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let err = Triangle::new(dvector![0.0, 0.0], dvector![1.0, 0.0, 0.0], dvector![0.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }
}
