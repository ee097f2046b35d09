// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial search trees (kD-tree and bounding volume hierarchy)

mod bvh;
pub mod config;
mod node;

pub use bvh::{BvhTree, KdTree, Neighbor, SearchTrace, TreeStats};
pub use config::{BvhConfig, SplitPolicy};
pub use node::{Node, NodeId};
