// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Slice objects.

use crate::heap::Tracer;
use crate::value::Value;

/// A slice: start, stop and step, each a value or the none singleton.
#[derive(Debug, Clone, Copy)]
pub struct SliceData {
    /// Start bound.
    pub start: Value,
    /// Stop bound.
    pub stop: Value,
    /// Step.
    pub step: Value,
}

impl SliceData {
    /// Visit the three bound values.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.visit_value(self.start);
        tracer.visit_value(self.stop);
        tracer.visit_value(self.step);
    }
}

/// The clamped, wrapped and validated triple for a sequence of `length`.
///
/// Mirrors the usual `indices` contract: negative bounds wrap once, the
/// result is clamped to the sequence, and the step is passed through
/// (callers reject a zero step before building the triple).
#[must_use]
pub fn indices(start: Option<i64>, stop: Option<i64>, step: i64, length: i64) -> (i64, i64, i64) {
    let (default_start, default_stop) = if step < 0 {
        (length - 1, -1)
    } else {
        (0, length)
    };
    let clamp = |bound: Option<i64>, default: i64| -> i64 {
        let Some(mut bound) = bound else {
            return default;
        };
        if bound < 0 {
            bound += length;
        }
        if step < 0 {
            bound.clamp(-1, length - 1)
        } else {
            bound.clamp(0, length)
        }
    };
    (clamp(start, default_start), clamp(stop, default_stop), step)
}
