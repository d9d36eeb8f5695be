// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mark-sweep garbage collector.
//!
//! Cells live in a slot-map arena and are tagged with the epoch they were
//! allocated in. A collection advances the epoch, marks everything
//! reachable from the roots back to the current epoch, and sweeps the
//! cells left behind in the previous one. Sweeping runs in two passes so
//! a sweep hook (used by the layout tree to detach from its parent) can
//! still observe dying peers before they are destroyed.
//!
//! The VM's own structures are the roots: the operand stack, the frame
//! stack, the singletons, the module registry and the current-exception
//! slot. Natives protect intermediate values across allocation points
//! through the watermarked temp-root vector.

#[cfg(test)]
mod heap_test;

use crate::value::{CellKind, Value, layout};
use core::fmt;

/// Index of a heap cell.
///
/// Cell ids are only ever obtained from [`Heap::alloc`] and stay valid for
/// as long as the cell is reachable from a root. The collector never hands
/// out a freed slot's id again before the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u32);

impl CellId {
    /// The raw slot index, used by the value tagging scheme.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Rebuild a cell id from a raw index produced by [`CellId::index`].
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Epoch value of a destroyed cell.
const EPOCH_INVALID: u8 = 0;

/// Number of live epochs the collector cycles through.
const EPOCH_COUNT: u8 = 2;

#[cfg(test)]
const MIN_COLLECT_AT: usize = 10;
#[cfg(test)]
const GROWTH_FACTOR: f64 = 1.1;

#[cfg(not(test))]
const MIN_COLLECT_AT: usize = 100;
#[cfg(not(test))]
const GROWTH_FACTOR: f64 = 2.0;

/// Collector phase, used to assert the allocation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Marking,
    Sweeping,
}

/// The garbage-collected heap.
pub struct Heap {
    cells: Vec<Option<CellKind>>,
    epochs: Vec<u8>,
    free: Vec<u32>,
    live: usize,
    current_epoch: u8,
    prev_epoch: u8,
    phase: Phase,
    collect_at: usize,
    collections: u64,
    temp_roots: Vec<Value>,
}

impl Heap {
    /// Create an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            epochs: Vec::new(),
            free: Vec::new(),
            live: 0,
            current_epoch: 1,
            prev_epoch: 2,
            phase: Phase::Idle,
            collect_at: MIN_COLLECT_AT,
            collections: 0,
            temp_roots: Vec::new(),
        }
    }

    /// Allocate a cell, tagging it with the current epoch.
    ///
    /// # Panics
    ///
    /// Panics if called while the collector is marking or sweeping.
    pub fn alloc(&mut self, kind: CellKind) -> CellId {
        assert_eq!(
            self.phase,
            Phase::Idle,
            "allocation during {:?} phase",
            self.phase
        );
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.cells[index as usize] = Some(kind);
            self.epochs[index as usize] = self.current_epoch;
            return CellId(index);
        }
        let index = u32::try_from(self.cells.len()).expect("heap cell index overflow");
        self.cells.push(Some(kind));
        self.epochs.push(self.current_epoch);
        CellId(index)
    }

    /// Access a live cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been collected; a reachable value never
    /// refers to a collected cell.
    #[must_use]
    pub fn get(&self, id: CellId) -> &CellKind {
        self.cells[id.0 as usize]
            .as_ref()
            .expect("access to collected cell")
    }

    /// Mutable access to a live cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been collected.
    pub fn get_mut(&mut self, id: CellId) -> &mut CellKind {
        self.cells[id.0 as usize]
            .as_mut()
            .expect("access to collected cell")
    }

    /// Returns true if the cell has not been collected.
    #[must_use]
    pub fn is_live(&self, id: CellId) -> bool {
        self.cells
            .get(id.0 as usize)
            .is_some_and(std::option::Option::is_some)
    }

    /// Number of live cells.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Number of completed collections.
    #[must_use]
    pub const fn collections(&self) -> u64 {
        self.collections
    }

    /// The epoch cells are currently allocated in.
    #[must_use]
    pub const fn current_epoch(&self) -> u8 {
        self.current_epoch
    }

    /// The epoch tag of a live cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been collected.
    #[must_use]
    pub fn epoch_of(&self, id: CellId) -> u8 {
        assert!(self.is_live(id), "epoch of collected cell");
        self.epochs[id.0 as usize]
    }

    /// Whether enough cells have accumulated to schedule a collection.
    #[must_use]
    pub const fn should_collect(&self) -> bool {
        self.live >= self.collect_at
    }

    /// Current temp-root watermark. Pair with [`Heap::release_temp_roots`].
    #[must_use]
    pub const fn temp_mark(&self) -> usize {
        self.temp_roots.len()
    }

    /// Root a value until the matching watermark is released.
    pub fn push_temp_root(&mut self, value: Value) {
        self.temp_roots.push(value);
    }

    /// Drop every temp root pushed since `mark` was taken.
    pub fn release_temp_roots(&mut self, mark: usize) {
        debug_assert!(mark <= self.temp_roots.len());
        self.temp_roots.truncate(mark);
    }

    /// Run a full collection.
    ///
    /// `trace_roots` is called once with a [`Tracer`]; it must visit every
    /// root the caller owns. The heap's own temp roots are traced
    /// automatically.
    pub fn collect(&mut self, trace_roots: impl FnOnce(&mut Tracer<'_>)) {
        assert_eq!(self.phase, Phase::Idle, "reentrant collection");
        tracing::debug!(
            target: "adder::gc",
            live = self.live,
            epoch = self.current_epoch,
            "collect start"
        );

        // Begin a new epoch.
        self.prev_epoch = self.current_epoch;
        self.current_epoch += 1;
        if self.current_epoch > EPOCH_COUNT {
            self.current_epoch = 1;
        }

        // Mark roots, then drain the mark stack.
        self.phase = Phase::Marking;
        let mut stack: Vec<u32> = Vec::new();
        {
            let mut tracer = Tracer {
                epochs: &mut self.epochs,
                stack: &mut stack,
                prev: self.prev_epoch,
                current: self.current_epoch,
            };
            for value in &self.temp_roots {
                tracer.visit_value(*value);
            }
            trace_roots(&mut tracer);
            while let Some(index) = tracer.stack.pop() {
                let cell = self.cells[index as usize]
                    .as_ref()
                    .expect("marked cell must be live");
                cell.trace_children(&mut tracer);
            }
        }

        // Partition out the dying cells, run sweep hooks, then destroy.
        self.phase = Phase::Sweeping;
        let dying: Vec<u32> = (0..self.cells.len() as u32)
            .filter(|&i| self.cells[i as usize].is_some() && self.epochs[i as usize] == self.prev_epoch)
            .collect();
        layout::sweep_dying_layouts(&mut self.cells, &self.epochs, &dying, self.prev_epoch);
        for &index in &dying {
            self.cells[index as usize] = None;
            self.epochs[index as usize] = EPOCH_INVALID;
            self.free.push(index);
        }
        self.live -= dying.len();
        self.phase = Phase::Idle;
        self.collections += 1;

        // Schedule the next collection.
        let scheduled = (self.live as f64 * GROWTH_FACTOR) as usize;
        self.collect_at = MIN_COLLECT_AT.max(scheduled);

        tracing::debug!(
            target: "adder::gc",
            live = self.live,
            live_bytes = self.live_bytes(),
            swept = dying.len(),
            next_at = self.collect_at,
            "collect end"
        );
    }

    /// Approximate bytes held by live cells.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(crate::value::CellKind::size)
            .sum()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Visitor over the edges of the object graph.
///
/// Marking a cell pushes it onto the mark stack exactly once per
/// collection; the collector drains the stack by tracing each cell's
/// children with the same operation.
pub struct Tracer<'a> {
    epochs: &'a mut [u8],
    stack: &'a mut Vec<u32>,
    prev: u8,
    current: u8,
}

impl Tracer<'_> {
    /// Mark a cell reference.
    pub fn visit(&mut self, id: CellId) {
        let epoch = &mut self.epochs[id.0 as usize];
        debug_assert!(*epoch == self.prev || *epoch == self.current, "trace of destroyed cell");
        if *epoch == self.prev {
            *epoch = self.current;
            self.stack.push(id.0);
        }
    }

    /// Mark an optional cell reference.
    pub fn visit_opt(&mut self, id: Option<CellId>) {
        if let Some(id) = id {
            self.visit(id);
        }
    }

    /// Mark a value if it refers to the heap.
    pub fn visit_value(&mut self, value: Value) {
        if let Some(id) = value.as_cell() {
            self.visit(id);
        }
    }

    /// Mark every value in a slice.
    pub fn visit_values(&mut self, values: &[Value]) {
        for value in values {
            self.visit_value(*value);
        }
    }
}
