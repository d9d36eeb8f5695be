// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interpreter tests, split by topic.
//!
//! Every test compiles and runs real source and checks the module
//! result (the value of the last statement) or the escaping exception.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod arithmetic_test;
mod builtin_test;
mod cache_test;
mod class_test;
mod exception_test;
mod function_test;
mod generator_test;
mod integration_test;
mod loop_test;

use crate::vm::{ExceptionReport, Vm};
use adder_core::Input;

/// Run source and return the `repr` of the module result.
fn run(source: &str) -> String {
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let input = Input::new("<test>", source);
    match vm.run_source(&input, module) {
        Ok(value) => vm.repr_value(value).expect("repr failed"),
        Err(_) => {
            let report = vm.take_exception_report().expect("missing exception");
            panic!("uncaught exception: {report}");
        }
    }
}

/// Run source that must raise; returns the escaping exception.
fn run_err(source: &str) -> ExceptionReport {
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let input = Input::new("<test>", source);
    match vm.run_source(&input, module) {
        Ok(value) => {
            let repr = vm.repr_value(value).unwrap_or_default();
            panic!("expected an exception, got {repr}");
        }
        Err(_) => vm.take_exception_report().expect("missing exception"),
    }
}
