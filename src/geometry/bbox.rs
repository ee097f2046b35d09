// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box utilities

use super::Coords;
use crate::utils::math;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in n-dimensional space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Coords,
    pub max: Coords,
}

impl BoundingBox {
    pub fn new(min: Coords, max: Coords) -> Self {
        debug_assert_eq!(min.len(), max.len());
        Self { min, max }
    }

    /// Inverted box that any point expands
    pub fn empty(dim: usize) -> Self {
        Self {
            min: Coords::from_element(dim, f64::INFINITY),
            max: Coords::from_element(dim, f64::NEG_INFINITY),
        }
    }

    /// Degenerate box around a single point
    pub fn from_point(point: &Coords) -> Self {
        Self {
            min: point.clone(),
            max: point.clone(),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Coords>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(iter.next()?);
        for p in iter {
            bbox.expand_to_include(p);
        }
        Some(bbox)
    }

    pub fn dim(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(self.max.iter()).any(|(lo, hi)| lo > hi)
    }

    pub fn expand_to_include(&mut self, point: &Coords) {
        self.min = self.min.zip_map(point, |a, b| a.min(b));
        self.max = self.max.zip_map(point, |a, b| a.max(b));
    }

    /// Grow this box to also cover `other`
    pub fn merge(&mut self, other: &BoundingBox) {
        self.min = self.min.zip_map(&other.min, |a, b| a.min(b));
        self.max = self.max.zip_map(&other.max, |a, b| a.max(b));
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut bbox = self.clone();
        bbox.merge(other);
        bbox
    }

    pub fn center(&self) -> Coords {
        (&self.min + &self.max) * 0.5
    }

    pub fn size(&self) -> Coords {
        &self.max - &self.min
    }

    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.size().iter().product()
    }

    pub fn contains(&self, point: &Coords) -> bool {
        point
            .iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .all(|(x, (lo, hi))| lo <= x && x <= hi)
    }

    /// Squared distance from `x` to the closest point of the box
    ///
    /// Zero for points inside. Used as the lower bound when deciding whether a
    /// ball around `x` can reach into the box.
    pub fn dist_sqrd(&self, x: &Coords) -> f64 {
        let mut d_sqrd = 0.0;
        for i in 0..x.len() {
            if x[i] > self.max[i] {
                let d = x[i] - self.max[i];
                d_sqrd += d * d;
            }
            if x[i] < self.min[i] {
                let d = x[i] - self.min[i];
                d_sqrd += d * d;
            }
        }
        d_sqrd
    }

    /// Squared distance from `x` to the farthest corner of the box
    ///
    /// Per axis the farthest corner coordinate is whichever of min/max lies
    /// farther from `x`, so no corner enumeration is needed.
    pub fn max_dist_sqrd(&self, x: &Coords) -> f64 {
        let mut d_sqrd = 0.0;
        for i in 0..x.len() {
            let lo = x[i] - self.min[i];
            let hi = x[i] - self.max[i];
            d_sqrd += (lo * lo).max(hi * hi);
        }
        d_sqrd
    }

    /// Check if two bounding boxes are approximately equal within tolerance
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        self.dim() == other.dim()
            && self
                .min
                .iter()
                .zip(other.min.iter())
                .chain(self.max.iter().zip(other.max.iter()))
                .all(|(a, b)| math::approx_eq(*a, *b, tolerance))
    }
}
