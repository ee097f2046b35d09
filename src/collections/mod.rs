// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Container types used by the search and graph algorithms

mod priority_queue;

pub use priority_queue::{HeapOrder, PriorityQueue};
