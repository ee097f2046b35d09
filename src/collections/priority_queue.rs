// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Indexed binary heap
//!
//! A binary heap over `(priority, item)` pairs that also tracks the heap
//! position of every item. Looking an item up is O(1), so priorities can be
//! changed in O(log n) without a linear search. This is what shortest path
//! searches need: a vertex is pushed once and its tentative distance is
//! lowered in place.
//!
//! Heap slots are numbered from 1, parent of slot `k` is `k / 2` and its
//! children are `2k` and `2k + 1`.

use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Which end of the priority order is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeapOrder {
    /// Smallest priority on top.
    Min,
    /// Largest priority on top.
    Max,
}

fn min_precedes<P: PartialOrd>(a: &P, b: &P) -> bool {
    a < b
}

fn max_precedes<P: PartialOrd>(a: &P, b: &P) -> bool {
    a > b
}

/// Binary heap with an item → position index.
///
/// Every item is stored at most once. Pushing an item that is already queued
/// changes its priority instead of inserting a duplicate.
#[derive(Clone)]
pub struct PriorityQueue<T, P> {
    /// Slot `k` lives at `heap[k - 1]`.
    heap: Vec<(P, T)>,
    /// Item → slot (1-based).
    positions: AHashMap<T, usize>,
    order: HeapOrder,
    precedes: fn(&P, &P) -> bool,
}

impl<T, P> PriorityQueue<T, P>
where
    T: Hash + Eq + Clone,
    P: PartialOrd,
{
    /// Create an empty queue with the given ordering.
    pub fn new(order: HeapOrder) -> Self {
        let precedes = match order {
            HeapOrder::Min => min_precedes::<P>,
            HeapOrder::Max => max_precedes::<P>,
        };
        Self {
            heap: Vec::new(),
            positions: AHashMap::new(),
            order,
            precedes,
        }
    }

    /// Create an empty min-heap.
    pub fn min_heap() -> Self {
        Self::new(HeapOrder::Min)
    }

    /// Create an empty max-heap.
    pub fn max_heap() -> Self {
        Self::new(HeapOrder::Max)
    }

    /// Ordering chosen at construction.
    pub fn order(&self) -> HeapOrder {
        self.order
    }

    /// Number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no item is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns `true` if `item` is queued.
    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Current priority of `item`, if queued.
    pub fn priority(&self, item: &T) -> Option<&P> {
        self.positions.get(item).map(|&k| &self.slot(k).0)
    }

    /// Insert `item`, or change its priority if it is already queued.
    pub fn push(&mut self, item: T, priority: P) {
        if let Some(&k) = self.positions.get(&item) {
            self.reprioritize(k, priority);
            return;
        }
        self.heap.push((priority, item.clone()));
        let k = self.heap.len();
        self.positions.insert(item, k);
        self.fix_up(k);
    }

    /// Change the priority of a queued item.
    pub fn update(&mut self, item: &T, priority: P) -> Result<()> {
        let k = *self.positions.get(item).ok_or(GeometryError::MissingKey)?;
        self.reprioritize(k, priority);
        Ok(())
    }

    /// Remove and return the top item.
    pub fn pop(&mut self) -> Result<T> {
        self.pop_entry().map(|(item, _)| item)
    }

    /// Remove and return the top item together with its priority.
    pub fn pop_entry(&mut self) -> Result<(T, P)> {
        let n = self.heap.len();
        if n == 0 {
            return Err(GeometryError::EmptyQueue);
        }
        self.swap(1, n);
        let (priority, item) = self.heap.pop().ok_or(GeometryError::EmptyQueue)?;
        self.positions.remove(&item);
        if !self.heap.is_empty() {
            self.fix_down(1);
        }
        Ok((item, priority))
    }

    /// Top item and its priority without removing it.
    pub fn peek(&self) -> Result<(&T, &P)> {
        self.heap
            .first()
            .map(|(p, item)| (item, p))
            .ok_or(GeometryError::EmptyQueue)
    }

    /// Top item without removing it.
    pub fn top(&self) -> Result<&T> {
        self.peek().map(|(item, _)| item)
    }

    /// Remove all items.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    /// Items with their priorities in heap (not sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &P)> + '_ {
        self.heap.iter().map(|(p, item)| (item, p))
    }

    #[inline]
    fn slot(&self, k: usize) -> &(P, T) {
        &self.heap[k - 1]
    }

    #[inline]
    fn slot_mut(&mut self, k: usize) -> &mut (P, T) {
        &mut self.heap[k - 1]
    }

    fn reprioritize(&mut self, k: usize, priority: P) {
        let old = std::mem::replace(&mut self.slot_mut(k).0, priority);
        let new = &self.slot(k).0;
        if (self.precedes)(new, &old) {
            self.fix_up(k);
        } else if (self.precedes)(&old, new) {
            self.fix_down(k);
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        if let Some(pos) = self.positions.get_mut(&self.heap[i - 1].1) {
            *pos = j;
        }
        if let Some(pos) = self.positions.get_mut(&self.heap[j - 1].1) {
            *pos = i;
        }
        self.heap.swap(i - 1, j - 1);
    }

    fn fix_up(&mut self, mut k: usize) {
        while k > 1 && (self.precedes)(&self.slot(k).0, &self.slot(k / 2).0) {
            self.swap(k, k / 2);
            k /= 2;
        }
    }

    fn fix_down(&mut self, mut k: usize) {
        let n = self.heap.len();
        while 2 * k <= n {
            let mut j = 2 * k;
            if j < n && (self.precedes)(&self.slot(j + 1).0, &self.slot(j).0) {
                j += 1;
            }
            if !(self.precedes)(&self.slot(j).0, &self.slot(k).0) {
                break;
            }
            self.swap(j, k);
            k = j;
        }
    }
}

impl<T, P> Default for PriorityQueue<T, P>
where
    T: Hash + Eq + Clone,
    P: PartialOrd,
{
    fn default() -> Self {
        Self::min_heap()
    }
}

impl<T: fmt::Debug, P: fmt::Debug> fmt::Debug for PriorityQueue<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("order", &self.order)
            .field("heap", &self.heap)
            .finish()
    }
}

impl<T: fmt::Debug, P: fmt::Debug> fmt::Display for PriorityQueue<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (p, item)) in self.heap.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ({:?}, {:?})", i + 1, p, item)?;
        }
        write!(f, "]")
    }
}
