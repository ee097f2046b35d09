// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tree nodes

use std::fmt;

use crate::geometry::BoundingBox;

/// Position of a node in the tree arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Interior node or leaf. Either way the bounding box covers every item
/// stored below the node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Interior {
        /// Split axis.
        axis: usize,
        /// Items with `center[axis] <= split` went to `lo`.
        split: f64,
        bbox: BoundingBox,
        lo: NodeId,
        hi: NodeId,
    },
    Leaf {
        bbox: BoundingBox,
        /// Item ids.
        items: Vec<usize>,
    },
}

impl Node {
    pub fn bbox(&self) -> &BoundingBox {
        match self {
            Node::Interior { bbox, .. } | Node::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Item ids of a leaf, empty for interior nodes.
    pub fn items(&self) -> &[usize] {
        match self {
            Node::Leaf { items, .. } => items,
            Node::Interior { .. } => &[],
        }
    }

    /// `(lo, hi)` of an interior node.
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self {
            Node::Interior { lo, hi, .. } => Some((*lo, *hi)),
            Node::Leaf { .. } => None,
        }
    }
}
