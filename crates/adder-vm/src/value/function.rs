// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Callable heap kinds: interpreted functions and natives.

use crate::heap::CellId;
use crate::value::{Name, Value};
use crate::vm::{Raise, Vm};

/// An interpreted function, lambda or generator function.
#[derive(Debug)]
pub struct FunctionData {
    /// Definition name (`(lambda)` for lambdas).
    pub name: Name,
    /// Parameter names, including a trailing rest parameter.
    pub params: Vec<Name>,
    /// The compiled body.
    pub block: CellId,
    /// Default values for the trailing non-rest parameters.
    pub defaults: Vec<Value>,
    /// Whether the last parameter collects extra arguments as a tuple.
    pub takes_rest: bool,
    /// Whether calling produces a generator iterator.
    pub is_generator: bool,
    /// Captured environment of the defining frame.
    pub env: Option<CellId>,
    /// The module the function was defined in; calls resolve globals
    /// against it, not against the caller's module.
    pub module: CellId,
}

impl FunctionData {
    /// Number of positional parameters, excluding a rest parameter.
    #[must_use]
    pub fn positional_count(&self) -> usize {
        self.params.len() - usize::from(self.takes_rest)
    }

    /// Minimum number of arguments a call must supply.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.positional_count() - self.defaults.len()
    }
}

/// Signature of a native function.
///
/// A failing native sets the VM's current-exception slot and returns
/// [`Raise`]; the dispatch loop treats that exactly like an interpreted
/// `raise`.
pub type NativeFn = fn(&mut Vm, &[Value]) -> Result<Value, Raise>;

/// A natively implemented callable.
pub struct NativeData {
    /// Name used in error messages.
    pub name: &'static str,
    /// Minimum argument count.
    pub min_args: usize,
    /// Maximum argument count; `None` for variadic natives.
    pub max_args: Option<usize>,
    /// The implementation.
    pub func: NativeFn,
}

impl std::fmt::Debug for NativeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeData")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}
