// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding volume hierarchy over projectable primitives
//!
//! The tree owns its items and partitions their ids: every interior node
//! splits along the axis of largest center spread, at the midpoint or the
//! median of the center coordinates. Leaves hold at most `leaf_size` items.
//!
//! Queries are branch and bound searches. A subtree is skipped when the
//! query ball cannot reach its bounding box. Build and search both use
//! explicit stacks, so degenerate inputs cannot overflow the call stack.
//!
//! A kD-tree is the special case of a hierarchy over points, see [`KdTree`].

use std::fmt;
use std::time::Instant;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::config::{BvhConfig, SplitPolicy};
use super::node::{Node, NodeId};
use crate::collections::PriorityQueue;
use crate::error::{GeometryError, Result};
use crate::geometry::{BoundingBox, Coords, Point, Primitive, Triangle};
use crate::halfedge::Mesh;
use crate::utils::math::argmax;

/// kD-tree over points.
pub type KdTree = BvhTree<Point>;

/// Query result: an item, its closest point and the squared distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub point: Coords,
    pub dist_sqrd: f64,
}

/// Nodes and items touched by a query, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTrace {
    /// Interior nodes.
    pub nodes: Vec<NodeId>,
    pub leaves: Vec<NodeId>,
    /// Items tested at a leaf or reported from a subtree inside the ball.
    pub items: Vec<usize>,
}

/// Shape summary of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub item_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Levels from the root to the deepest leaf, zero for an empty tree.
    pub depth: usize,
    pub max_leaf_items: usize,
    pub dim: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items in {} dimensions, {} nodes ({} leaves, at most {} items), depth {}",
            self.item_count, self.dim, self.node_count, self.leaf_count, self.max_leaf_items, self.depth
        )
    }
}

/// Bounding volume hierarchy.
#[derive(Debug, Clone)]
pub struct BvhTree<T> {
    items: Vec<T>,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    dim: usize,
    depth: usize,
    config: BvhConfig,
}

/// kNN heap slot: a sentinel or a real item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Empty(usize),
    Item(usize),
}

impl<T: Primitive> BvhTree<T> {
    /// Build a tree over `items`.
    ///
    /// Fails on items of different dimensions and on a zero leaf size. An
    /// empty item list gives an empty tree whose queries return nothing.
    pub fn new(items: Vec<T>, config: BvhConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();

        let dim = items.first().map_or(0, |item| item.dim());
        for item in &items {
            if item.dim() != dim {
                return Err(GeometryError::DimensionMismatch {
                    expected: dim,
                    found: item.dim(),
                });
            }
        }

        let mut tree = Self {
            items,
            nodes: Vec::new(),
            root: None,
            dim,
            depth: 0,
            config,
        };
        tree.build();

        tracing::debug!(
            items = tree.items.len(),
            nodes = tree.nodes.len(),
            depth = tree.depth,
            split = %tree.config.split,
            elapsed_us = start.elapsed().as_micros() as u64,
            "built spatial tree"
        );
        Ok(tree)
    }

    fn build(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let root = self.alloc();
        self.root = Some(root);
        let mut stack = vec![(root, (0..self.items.len()).collect::<Vec<usize>>(), 1usize)];

        while let Some((slot, ids, level)) = stack.pop() {
            self.depth = self.depth.max(level);
            let bbox = self.items_bbox(&ids);

            if ids.len() <= self.config.leaf_size {
                self.nodes[slot.0] = Node::Leaf { bbox, items: ids };
                continue;
            }

            let (axis, split, lo_ids, hi_ids) = self.partition(ids);
            let lo = self.alloc();
            let hi = self.alloc();
            self.nodes[slot.0] = Node::Interior {
                axis,
                split,
                bbox,
                lo,
                hi,
            };
            stack.push((hi, hi_ids, level + 1));
            stack.push((lo, lo_ids, level + 1));
        }
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(Node::Leaf {
            bbox: BoundingBox::empty(self.dim),
            items: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn items_bbox(&self, ids: &[usize]) -> BoundingBox {
        let mut bbox = BoundingBox::empty(self.dim);
        for &i in ids {
            bbox.merge(self.items[i].bbox());
        }
        bbox
    }

    /// Split `ids` (at least two) into two non-empty halves.
    fn partition(&self, mut ids: Vec<usize>) -> (usize, f64, Vec<usize>, Vec<usize>) {
        let coord = |i: usize, axis: usize| self.items[i].center()[axis];

        let spread = (0..self.dim).map(|axis| {
            let (lo, hi) = ids.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let c = coord(i, axis);
                (lo.min(c), hi.max(c))
            });
            hi - lo
        });
        let axis = argmax(spread).unwrap_or(0);

        let mut values: Vec<f64> = ids.iter().map(|&i| coord(i, axis)).collect();
        values.sort_by(f64::total_cmp);
        let split = match self.config.split {
            SplitPolicy::Midpoint => 0.5 * (values[0] + values[values.len() - 1]),
            SplitPolicy::Median => values[values.len() / 2 - 1],
        };

        let (lo, hi): (Vec<usize>, Vec<usize>) = ids.iter().copied().partition(|&i| coord(i, axis) <= split);
        if !lo.is_empty() && !hi.is_empty() {
            return (axis, split, lo, hi);
        }

        // Coinciding centers: halve by sorted position instead
        ids.sort_by(|&a, &b| coord(a, axis).total_cmp(&coord(b, axis)).then(a.cmp(&b)));
        let hi = ids.split_off(ids.len() / 2);
        let split = coord(ids[ids.len() - 1], axis);
        (axis, split, ids, hi)
    }

    fn check_query(&self, x: &Coords) -> Result<()> {
        if !self.items.is_empty() && x.len() != self.dim {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim,
                found: x.len(),
            });
        }
        Ok(())
    }

    /// The `k` items closest to `x`, nearest first.
    ///
    /// Fewer than `k` results are returned only if the tree holds fewer
    /// items. Ties are ordered by item id.
    pub fn query(&self, x: &Coords, k: usize) -> Result<Vec<Neighbor>> {
        self.knn(x, k, None)
    }

    /// Like [`query`](Self::query), also recording the search path.
    pub fn query_traced(&self, x: &Coords, k: usize) -> Result<(Vec<Neighbor>, SearchTrace)> {
        let mut trace = SearchTrace::default();
        let result = self.knn(x, k, Some(&mut trace))?;
        Ok((result, trace))
    }

    /// The item closest to `x`, `None` for an empty tree.
    pub fn project(&self, x: &Coords) -> Result<Option<Neighbor>> {
        Ok(self.query(x, 1)?.into_iter().next())
    }

    fn knn(&self, x: &Coords, k: usize, mut trace: Option<&mut SearchTrace>) -> Result<Vec<Neighbor>> {
        self.check_query(x)?;
        let k = k.min(self.items.len());
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        // The top of the max-heap is the current k-th best
        let mut heap: PriorityQueue<Slot, f64> = PriorityQueue::max_heap();
        for i in 0..k {
            heap.push(Slot::Empty(i), f64::INFINITY);
        }
        let mut projections: AHashMap<usize, Coords> = AHashMap::with_capacity(k);
        let mut worst = f64::INFINITY;

        let mut stack = vec![(root, false)];
        while let Some((id, check)) = stack.pop() {
            let node = &self.nodes[id.0];
            if check && node.bbox().dist_sqrd(x) >= worst {
                continue;
            }

            match node {
                Node::Leaf { items, .. } => {
                    if let Some(t) = trace.as_deref_mut() {
                        t.leaves.push(id);
                    }
                    for &i in items {
                        if let Some(t) = trace.as_deref_mut() {
                            t.items.push(i);
                        }
                        let (point, d) = self.items[i].project(x);
                        if d < worst {
                            if let Slot::Item(evicted) = heap.pop()? {
                                projections.remove(&evicted);
                            }
                            heap.push(Slot::Item(i), d);
                            projections.insert(i, point);
                            worst = *heap.peek()?.1;
                        }
                    }
                }
                Node::Interior { axis, split, lo, hi, .. } => {
                    if let Some(t) = trace.as_deref_mut() {
                        t.nodes.push(id);
                    }
                    let (near, far) = if x[*axis] <= *split { (*lo, *hi) } else { (*hi, *lo) };
                    stack.push((far, true));
                    stack.push((near, false));
                }
            }
        }

        let mut result = Vec::with_capacity(k);
        while let Ok((slot, dist_sqrd)) = heap.pop_entry() {
            if let Slot::Item(id) = slot {
                if let Some(point) = projections.remove(&id) {
                    result.push(Neighbor { id, point, dist_sqrd });
                }
            }
        }
        sort_neighbors(&mut result);
        Ok(result)
    }

    /// Every item within distance `d` of `x`, nearest first.
    pub fn range_query(&self, x: &Coords, d: f64) -> Result<Vec<Neighbor>> {
        self.range(x, d, false, None)
    }

    /// Every item lying entirely inside the closed ball of radius `d`
    /// around `x`, nearest first.
    pub fn range_query_contained(&self, x: &Coords, d: f64) -> Result<Vec<Neighbor>> {
        self.range(x, d, true, None)
    }

    /// Like [`range_query`](Self::range_query), also recording the search
    /// path.
    pub fn range_query_traced(&self, x: &Coords, d: f64) -> Result<(Vec<Neighbor>, SearchTrace)> {
        let mut trace = SearchTrace::default();
        let result = self.range(x, d, false, Some(&mut trace))?;
        Ok((result, trace))
    }

    fn range(
        &self,
        x: &Coords,
        d: f64,
        contained: bool,
        mut trace: Option<&mut SearchTrace>,
    ) -> Result<Vec<Neighbor>> {
        self.check_query(x)?;
        if !(d >= 0.0) {
            return Err(GeometryError::invalid_param("d", d, "radius must be non-negative"));
        }
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };
        let r_sqrd = d * d;

        let mut result = Vec::new();
        let report = |i: usize, result: &mut Vec<Neighbor>| {
            let (point, dist_sqrd) = self.items[i].project(x);
            result.push(Neighbor { id: i, point, dist_sqrd });
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            let bbox = node.bbox();
            if bbox.dist_sqrd(x) > r_sqrd {
                continue;
            }

            // Whole subtree inside the ball
            if bbox.max_dist_sqrd(x) <= r_sqrd {
                for i in self.subtree_items(id) {
                    if let Some(t) = trace.as_deref_mut() {
                        t.items.push(i);
                    }
                    report(i, &mut result);
                }
                continue;
            }

            match node {
                Node::Leaf { items, .. } => {
                    if let Some(t) = trace.as_deref_mut() {
                        t.leaves.push(id);
                    }
                    for &i in items {
                        if let Some(t) = trace.as_deref_mut() {
                            t.items.push(i);
                        }
                        let item = &self.items[i];
                        if contained {
                            if item.contained_in(x, r_sqrd) {
                                report(i, &mut result);
                            }
                        } else {
                            let (point, dist_sqrd) = item.project(x);
                            if dist_sqrd <= r_sqrd {
                                result.push(Neighbor { id: i, point, dist_sqrd });
                            }
                        }
                    }
                }
                Node::Interior { lo, hi, .. } => {
                    if let Some(t) = trace.as_deref_mut() {
                        t.nodes.push(id);
                    }
                    stack.push(*hi);
                    stack.push(*lo);
                }
            }
        }

        sort_neighbors(&mut result);
        Ok(result)
    }

    fn subtree_items(&self, id: NodeId) -> Vec<usize> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match &self.nodes[id.0] {
                Node::Leaf { items, .. } => ids.extend_from_slice(items),
                Node::Interior { lo, hi, .. } => {
                    stack.push(*hi);
                    stack.push(*lo);
                }
            }
        }
        ids
    }
}

fn sort_neighbors(result: &mut [Neighbor]) {
    result.sort_by(|a, b| a.dist_sqrd.total_cmp(&b.dist_sqrd).then(a.id.cmp(&b.id)));
}

impl<T> BvhTree<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn item(&self, id: usize) -> Option<&T> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ambient dimension, zero for an empty tree.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Bounding box of all items.
    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.root.map(|root| self.nodes[root.0].bbox())
    }

    /// Nodes in pre-order, `lo` before `hi`.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id.0];
            if let Some((lo, hi)) = node.children() {
                stack.push(hi);
                stack.push(lo);
            }
            Some((id, node))
        })
    }

    pub fn leaf_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes().filter(|(_, node)| node.is_leaf())
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            item_count: self.items.len(),
            node_count: self.nodes.len(),
            leaf_count: self.leaf_nodes().count(),
            depth: self.depth,
            max_leaf_items: self.leaf_nodes().map(|(_, n)| n.items().len()).max().unwrap_or(0),
            dim: self.dim,
        }
    }
}

impl BvhTree<Point> {
    /// kD-tree over a point cloud.
    pub fn from_points<I>(points: I, config: BvhConfig) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Coords>,
    {
        let items = points.into_iter().map(|p| Point::new(p.into())).collect();
        Self::new(items, config)
    }
}

impl BvhTree<Triangle> {
    /// Hierarchy over the faces of a triangle mesh.
    ///
    /// Item `i` is the `i`-th face that is neither deleted nor empty, so ids
    /// match face indices after [`Mesh::clean`].
    pub fn from_triangle_mesh(mesh: &Mesh<Coords>, config: BvhConfig) -> Result<Self> {
        let mut items = Vec::with_capacity(mesh.num_faces());
        for f in mesh.faces() {
            let face = mesh.face(f)?;
            if face.is_deleted() || face.is_empty() {
                continue;
            }
            let corners: Vec<&Coords> = mesh
                .face_vertices(f)?
                .map(|v| mesh.payload(v))
                .collect::<Result<_>>()?;
            if corners.len() != 3 {
                return Err(GeometryError::NotTriangular {
                    face: f.index(),
                    valence: corners.len(),
                });
            }
            items.push(Triangle::new(corners[0].clone(), corners[1].clone(), corners[2].clone())?);
        }
        Self::new(items, config)
    }

    /// Hierarchy over triangles given as indices into a vertex array.
    pub fn from_indexed_triangles(vertices: &[Coords], faces: &[[usize; 3]], config: BvhConfig) -> Result<Self> {
        let vertex = |i: usize| {
            vertices.get(i).cloned().ok_or(GeometryError::VertexIndex {
                index: i,
                len: vertices.len(),
            })
        };
        let items = faces
            .iter()
            .map(|&[a, b, c]| Triangle::new(vertex(a)?, vertex(b)?, vertex(c)?))
            .collect::<Result<Vec<_>>>()?;
        Self::new(items, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Segment;
    use nalgebra::dvector;

    fn line_points(n: usize) -> Vec<Coords> {
        (0..n).map(|i| dvector![i as f64, 0.0]).collect()
    }

    #[test]
    fn test_build_shape() {
        let tree = KdTree::from_points(line_points(16), BvhConfig::new(2, SplitPolicy::Median)).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.item_count, 16);
        assert_eq!(stats.leaf_count, 8);
        assert_eq!(stats.depth, 4);
        assert_eq!(stats.max_leaf_items, 2);

        // Every item sits in exactly one leaf
        let mut ids: Vec<usize> = tree.leaf_nodes().flat_map(|(_, n)| n.items().to_vec()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());

        // Pre-order starts at the root
        assert_eq!(tree.nodes().next().map(|(id, _)| id), tree.root());
    }

    #[test]
    fn test_node_boxes_cover_children() {
        let tree = KdTree::from_points(line_points(11), BvhConfig::new(1, SplitPolicy::Midpoint)).unwrap();
        for (_, node) in tree.nodes() {
            if let Some((lo, hi)) = node.children() {
                let union = tree.node(lo).unwrap().bbox().union(tree.node(hi).unwrap().bbox());
                assert!(union.approx_eq(node.bbox(), 1e-12));
            }
        }
    }

    #[test]
    fn test_duplicate_centers_stay_shallow() {
        let points = vec![dvector![1.0, 1.0, 1.0]; 1024];
        let tree = KdTree::from_points(points, BvhConfig::new(1, SplitPolicy::Median)).unwrap();
        assert_eq!(tree.depth(), 11);
        assert_eq!(tree.query(&dvector![0.0, 0.0, 0.0], 3).unwrap().len(), 3);
    }

    #[test]
    fn test_nearest_neighbors_on_a_line() {
        let tree = KdTree::from_points(line_points(10), BvhConfig::new(2, SplitPolicy::Midpoint)).unwrap();
        let result = tree.query(&dvector![3.2, 1.0], 3).unwrap();
        let ids: Vec<usize> = result.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 4, 2]);
        assert!((result[0].dist_sqrd - 1.04).abs() < 1e-12);

        let nearest = tree.project(&dvector![7.9, -0.5]).unwrap().unwrap();
        assert_eq!(nearest.id, 8);
        assert_eq!(nearest.point, dvector![8.0, 0.0]);
    }

    #[test]
    fn test_k_larger_than_tree() {
        let tree = KdTree::from_points(line_points(4), BvhConfig::default()).unwrap();
        assert_eq!(tree.query(&dvector![0.0, 0.0], 10).unwrap().len(), 4);
        assert!(tree.query(&dvector![0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_traced_query_prunes() {
        let tree = KdTree::from_points(line_points(64), BvhConfig::new(4, SplitPolicy::Median)).unwrap();
        let (result, trace) = tree.query_traced(&dvector![0.0, 0.0], 1).unwrap();
        assert_eq!(result[0].id, 0);
        assert!(trace.leaves.len() < tree.stats().leaf_count);
        assert!(trace.items.contains(&0));
        assert_eq!(trace.nodes.first().copied(), tree.root());

        let (plain, _) = tree.query_traced(&dvector![10.5, 0.0], 4).unwrap();
        assert_eq!(plain, tree.query(&dvector![10.5, 0.0], 4).unwrap());
    }

    #[test]
    fn test_range_queries() {
        let tree = KdTree::from_points(line_points(10), BvhConfig::new(2, SplitPolicy::Median)).unwrap();
        let ids: Vec<usize> = tree
            .range_query(&dvector![4.0, 0.0], 2.0)
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![4, 3, 5, 2, 6]);

        let (result, trace) = tree.range_query_traced(&dvector![100.0, 0.0], 1.0).unwrap();
        assert!(result.is_empty());
        assert!(trace.items.is_empty());
        assert!(tree.range_query(&dvector![0.0, 0.0], -1.0).is_err());
    }

    #[test]
    fn test_contained_range_on_segments() {
        let segments = vec![
            Segment::new(dvector![0.0, 0.0], dvector![1.0, 0.0]).unwrap(),
            Segment::new(dvector![0.0, 0.5], dvector![5.0, 0.5]).unwrap(),
            Segment::new(dvector![3.0, 3.0], dvector![4.0, 3.0]).unwrap(),
        ];
        let tree = BvhTree::new(segments, BvhConfig::new(1, SplitPolicy::Midpoint)).unwrap();
        let x = dvector![0.5, 0.0];

        let touching: Vec<usize> = tree.range_query(&x, 1.0).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(touching, vec![0, 1]);
        let inside: Vec<usize> = tree.range_query_contained(&x, 1.0).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(inside, vec![0]);
    }

    #[test]
    fn test_construction_errors() {
        let mixed = vec![Point::new(dvector![0.0, 0.0]), Point::new(dvector![0.0, 0.0, 0.0])];
        assert_eq!(
            BvhTree::new(mixed, BvhConfig::default()).unwrap_err(),
            GeometryError::DimensionMismatch { expected: 2, found: 3 }
        );
        assert!(KdTree::from_points(line_points(3), BvhConfig::new(0, SplitPolicy::Median)).is_err());

        let tree = KdTree::from_points(line_points(3), BvhConfig::default()).unwrap();
        assert!(matches!(
            tree.query(&dvector![0.0, 0.0, 0.0], 1),
            Err(GeometryError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::from_points(Vec::<Coords>::new(), BvhConfig::default()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(tree.bbox().is_none());
        assert!(tree.query(&dvector![1.0], 3).unwrap().is_empty());
        assert!(tree.project(&dvector![1.0]).unwrap().is_none());
        assert!(tree.range_query(&dvector![1.0], 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_indexed_triangles() {
        let vertices = vec![
            dvector![0.0, 0.0, 0.0],
            dvector![1.0, 0.0, 0.0],
            dvector![0.0, 1.0, 0.0],
            dvector![5.0, 5.0, 0.0],
        ];
        let tree =
            BvhTree::from_indexed_triangles(&vertices, &[[0, 1, 2], [1, 3, 2]], BvhConfig::default()).unwrap();
        let nearest = tree.project(&dvector![0.2, 0.2, 1.0]).unwrap().unwrap();
        assert_eq!(nearest.id, 0);
        assert!((nearest.dist_sqrd - 1.0).abs() < 1e-12);

        assert!(matches!(
            BvhTree::from_indexed_triangles(&vertices, &[[0, 1, 7]], BvhConfig::default()),
            Err(GeometryError::VertexIndex { index: 7, len: 4 })
        ));
    }
}
