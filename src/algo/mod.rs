// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Graph algorithms on the halfedge mesh: shortest paths and embeddings

mod dijkstra;
mod tutte;

pub use dijkstra::{dijkstra, dijkstra_by, ShortestPaths};
pub use tutte::tutte;
