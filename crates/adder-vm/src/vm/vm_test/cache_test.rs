// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Inline-cache rewriting: generic, specialized, fallback.

use crate::bytecode::Instr;
use crate::heap::CellId;
use crate::value::CellKind;
use crate::vm::Vm;
use adder_core::Input;

fn run_and_inspect(source: &str, calls: &str) -> (Vm, CellId) {
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let syntax = crate::reader::parse_module(&Input::new("<test>", source)).expect("parse");
    let block = crate::compiler::compile_module(&mut vm, &syntax, module, "<test>").expect("compile");
    vm.run_block(block, module).expect("definition failed");
    let body = {
        let CellKind::Block(block) = vm.heap.get(block) else {
            panic!("not a block");
        };
        block.nested[0]
    };
    let input = Input::new("<calls>", calls);
    vm.run_source(&input, module).expect("calls failed");
    (vm, body)
}

fn instrs(vm: &Vm, block: CellId) -> Vec<Instr> {
    let CellKind::Block(block) = vm.heap.get(block) else {
        panic!("not a block");
    };
    block.instrs.clone()
}

#[test]
fn binary_op_specializes_on_small_ints() {
    let (vm, body) = run_and_inspect("def f(x):\n    return x + 1\n", "f(2)\nf(3)\n");
    let code = instrs(&vm, body);
    assert!(code.iter().any(|i| matches!(i, Instr::BinaryOpInt(_))));
    assert!(!code.iter().any(|i| matches!(i, Instr::BinaryOp(_))));
}

#[test]
fn specialized_binary_op_falls_back_on_mismatch() {
    let (vm, body) = run_and_inspect(
        "def f(x):\n    return x + x\n",
        "f(2)\nf(\"s\")\nf(3)\n",
    );
    let code = instrs(&vm, body);
    assert!(code.iter().any(|i| matches!(i, Instr::BinaryOpFallback(_))));
}

#[test]
fn binary_op_on_non_ints_goes_straight_to_fallback() {
    let (vm, body) = run_and_inspect("def f(x):\n    return x + x\n", "f(\"s\")\n");
    let code = instrs(&vm, body);
    assert!(code.iter().any(|i| matches!(i, Instr::BinaryOpFallback(_))));
}

#[test]
fn compare_op_specializes() {
    let (vm, body) = run_and_inspect("def f(x):\n    return x < 10\n", "f(2)\n");
    let code = instrs(&vm, body);
    assert!(code.iter().any(|i| matches!(i, Instr::CompareOpInt(_))));
}

#[test]
fn get_method_specializes_for_int_receivers() {
    let (vm, body) = run_and_inspect(
        "def f(x):\n    return x.__add__(1)\n",
        "f(2)\nf(3)\n",
    );
    let code = instrs(&vm, body);
    assert!(code
        .iter()
        .any(|i| matches!(i, Instr::GetMethodInt { .. })));
}

#[test]
fn get_method_on_other_receivers_uses_the_fallback() {
    let (vm, body) = run_and_inspect("def f(xs):\n    return xs.append\n", "");
    // Attribute loads stay generic; only GetMethod call sites rewrite.
    let code = instrs(&vm, body);
    assert!(code.iter().any(|i| matches!(i, Instr::GetAttr(_))));
    let (vm, body) = run_and_inspect(
        "def g(xs):\n    xs.append(1)\n    return xs\n",
        "g([])\ng([])\n",
    );
    let code = instrs(&vm, body);
    assert!(code
        .iter()
        .any(|i| matches!(i, Instr::GetMethodFallback(_))));
}

#[test]
fn rewritten_instructions_keep_working() {
    // The cached method value must keep the right behaviour after the
    // rewrite and survive collections (the block traces it).
    let source = "def f(x):\n    return x.__add__(x)\n";
    let calls = "total = 0\nfor i in (1, 2, 3, 4, 5, 6, 7, 8, 9, 10):\n    total = total + f(i)\ntotal";
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let input = Input::new("<test>", &format!("{source}{calls}"));
    let result = vm.run_source(&input, module).expect("run failed");
    assert_eq!(vm.repr_value(result).expect("repr"), "110");
}
