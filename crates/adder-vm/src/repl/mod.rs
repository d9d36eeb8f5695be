// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The interactive loop.
//!
//! Each input compiles as a statement list against a persistent
//! `__main__` module; results other than `None` echo back as their
//! `repr`. A line ending in `:` opens a block that is collected until a
//! blank line.

use crate::heap::CellId;
use crate::vm::Vm;
use adder_core::Input;
use std::io::{BufRead, Write};

/// Run the REPL until end of input.
pub fn run(vm: &mut Vm) {
    let module = vm.new_module("__main__");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!(">>> ");
        let _ = std::io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            println!();
            break;
        };
        let mut source = line;
        if source.trim().is_empty() {
            continue;
        }
        // Collect an indented block until a blank line.
        if source.trim_end().ends_with(':') {
            loop {
                print!("... ");
                let _ = std::io::stdout().flush();
                let Some(Ok(continuation)) = lines.next() else {
                    break;
                };
                if continuation.trim().is_empty() {
                    break;
                }
                source.push('\n');
                source.push_str(&continuation);
            }
        }
        evaluate(vm, module, &source);
    }
}

fn evaluate(vm: &mut Vm, module: CellId, source: &str) {
    let input = Input::new("<repl>", source);
    match vm.run_source(&input, module) {
        Ok(result) => {
            if result != vm.builtins.none {
                match vm.repr_value(result) {
                    Ok(text) => println!("{text}"),
                    Err(_) => report(vm),
                }
            }
        }
        Err(_) => report(vm),
    }
}

fn report(vm: &mut Vm) {
    if let Some(report) = vm.take_exception_report() {
        eprintln!("{}: {}", report.class_name, report.message);
    }
}
