// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the compiler.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::bytecode::Instr;
use crate::heap::CellId;
use crate::reader::parse_module;
use crate::value::CellKind;
use crate::vm::Vm;
use adder_core::Input;

fn compile(source: &str) -> (Vm, CellId) {
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let syntax = parse_module(&Input::new("<test>", source)).expect("parse error");
    let block = compile_module(&mut vm, &syntax, module, "<test>").expect("compile error");
    (vm, block)
}

fn compile_err(source: &str) -> String {
    let mut vm = Vm::new();
    let module = vm.new_module("test");
    let syntax = parse_module(&Input::new("<test>", source)).expect("parse error");
    compile_module(&mut vm, &syntax, module, "<test>")
        .expect_err("expected compile error")
        .message
}

fn instrs(vm: &Vm, block: CellId) -> Vec<Instr> {
    let CellKind::Block(block) = vm.heap.get(block) else {
        panic!("not a block");
    };
    block.instrs.clone()
}

fn nested(vm: &Vm, block: CellId, index: usize) -> CellId {
    let CellKind::Block(block) = vm.heap.get(block) else {
        panic!("not a block");
    };
    block.nested[index]
}

fn has(instrs: &[Instr], predicate: impl Fn(&Instr) -> bool) -> bool {
    instrs.iter().any(predicate)
}

// --- Name classification ---

#[test]
fn module_names_are_globals() {
    let (vm, block) = compile("a = 1\na\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::SetGlobal(_))));
    assert!(has(&code, |i| matches!(i, Instr::GetGlobal(_))));
    assert!(!has(&code, |i| matches!(i, Instr::SetStackLocal { .. })));
}

#[test]
fn function_locals_are_stack_slots() {
    let (vm, block) = compile("def f(x):\n    y = x\n    return y\n");
    let body = instrs(&vm, nested(&vm, block, 0));
    assert_eq!(body[0], Instr::InitStackLocals);
    assert!(has(&body, |i| matches!(i, Instr::GetStackLocal { slot: 0, .. })));
    assert!(has(&body, |i| matches!(i, Instr::SetStackLocal { slot: 1, .. })));
    assert!(!has(&body, |i| matches!(i, Instr::CreateEnv)));
}

#[test]
fn captured_scopes_use_environments() {
    let (vm, block) = compile("def f():\n    x = 1\n    return lambda: x\n");
    let outer = instrs(&vm, nested(&vm, block, 0));
    assert_eq!(outer[0], Instr::CreateEnv);
    assert!(has(&outer, |i| matches!(i, Instr::SetLexical { frame: 0, .. })));
    let lambda = instrs(&vm, nested(&vm, nested(&vm, block, 0), 0));
    assert!(has(&lambda, |i| matches!(i, Instr::GetLexical { frame: 0, .. })));
}

#[test]
fn unknown_reads_fall_back_to_globals() {
    let (vm, block) = compile("def f():\n    return zz\n");
    let body = instrs(&vm, nested(&vm, block, 0));
    assert!(has(&body, |i| matches!(i, Instr::GetGlobal(_))));
}

#[test]
fn unknown_delete_is_a_compile_error() {
    assert!(compile_err("def f():\n    del zz\n").contains("not defined"));
}

// --- Expression lowering ---

#[test]
fn method_calls_use_the_fast_path() {
    let (vm, block) = compile("a = []\na.append(1)\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::GetMethod(_))));
    assert!(has(&code, |i| matches!(i, Instr::CallMethod(1))));
    assert!(!has(&code, |i| matches!(i, Instr::GetAttr(_))));
}

#[test]
fn short_circuit_operators() {
    let (vm, block) = compile("a = 1\nb = a or a\nc = a and a\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::Or(_))));
    assert!(has(&code, |i| matches!(i, Instr::And(_))));
}

#[test]
fn augmented_assignment_lowers_to_update() {
    let (vm, block) = compile("a = 1\na += 2\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::AugUpdate(crate::ast::BinaryOp::Add))));
}

#[test]
fn unpacking_checks_the_length() {
    let (vm, block) = compile("a, b = c\n");
    let code = instrs(&vm, block);
    let next_calls = code
        .iter()
        .filter(|i| matches!(i, Instr::IteratorNext))
        .count();
    assert_eq!(next_calls, 2);
    assert!(has(&code, |i| matches!(i, Instr::Raise)));
}

#[test]
fn subscript_assignment_calls_setitem() {
    let (vm, block) = compile("a = []\na[0] = 1\ndel a[0]\nb = a[0]\n");
    let code = instrs(&vm, block);
    // __setitem__, __delitem__ and __getitem__ all go through the
    // method fast path.
    let method_calls = code
        .iter()
        .filter(|i| matches!(i, Instr::CallMethod(_)))
        .count();
    assert!(method_calls >= 3);
    assert!(has(&code, |i| matches!(i, Instr::Dup(3))));
}

// --- Statement lowering ---

#[test]
fn loops_emit_backward_branches() {
    let (vm, block) = compile("while 1:\n    break\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(
        i,
        Instr::LoopControlJump {
            finally_count: 0,
            region_count: 0,
            ..
        }
    )));
}

#[test]
fn break_counts_finally_regions() {
    let source = "while 1:\n    try:\n        break\n    finally:\n        pass\n";
    let (vm, block) = compile(source);
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(
        i,
        Instr::LoopControlJump {
            finally_count: 1,
            region_count: 1,
            ..
        }
    )));
}

#[test]
fn return_through_finally_unwinds() {
    let source = "def f():\n    try:\n        return 1\n    finally:\n        pass\n";
    let (vm, block) = compile(source);
    let body = instrs(&vm, nested(&vm, block, 0));
    assert!(has(&body, |i| matches!(
        i,
        Instr::ReturnThroughFinally {
            finally_count: 1,
            region_count: 1,
        }
    )));
}

#[test]
fn try_regions_are_bracketed() {
    let source = "try:\n    a = 1\nexcept ValueError:\n    pass\nfinally:\n    pass\n";
    let (vm, block) = compile(source);
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::EnterCatchRegion(_))));
    assert!(has(&code, |i| matches!(i, Instr::LeaveCatchRegion)));
    assert!(has(&code, |i| matches!(i, Instr::EnterFinallyRegion(_))));
    assert!(has(&code, |i| matches!(i, Instr::LeaveFinallyRegion)));
    assert!(has(&code, |i| matches!(i, Instr::MatchCurrentException)));
    let finishers = code
        .iter()
        .filter(|i| matches!(i, Instr::FinishExceptionHandler))
        .count();
    assert_eq!(finishers, 2);
}

#[test]
fn generators_start_with_the_generator_prologue() {
    let (vm, block) = compile("def g():\n    yield 1\n");
    let body = instrs(&vm, nested(&vm, block, 0));
    assert_eq!(body[1], Instr::StartGenerator);
    assert!(has(&body, |i| matches!(i, Instr::SuspendGenerator)));
    assert!(has(&body, |i| matches!(i, Instr::LeaveGenerator)));
}

#[test]
fn class_bodies_build_classes_from_frames() {
    let (vm, block) = compile("class Foo:\n    a = 1\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::Lambda(_))));
    assert!(has(&code, |i| matches!(i, Instr::Tuple(0))));
    assert!(has(&code, |i| matches!(i, Instr::Call(1))));
    let body = instrs(&vm, nested(&vm, block, 0));
    assert_eq!(body[0], Instr::CreateEnv);
    assert!(has(&body, |i| matches!(i, Instr::MakeClassFromFrame(_))));
}

#[test]
fn comprehension_compiles_to_a_nested_scope() {
    let (vm, block) = compile("ys = [x for x in (1, 2)]\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::Lambda(_))));
    assert!(has(&code, |i| matches!(i, Instr::Call(1))));
    let comp = instrs(&vm, nested(&vm, block, 0));
    assert!(has(&comp, |i| matches!(i, Instr::List(0))));
    assert!(has(&comp, |i| matches!(i, Instr::IteratorNext)));
}

#[test]
fn imports_lower_to_import_instructions() {
    let (vm, block) = compile("import m\nfrom n import x\n");
    let code = instrs(&vm, block);
    let imports = code
        .iter()
        .filter(|i| matches!(i, Instr::ImportModule(_)))
        .count();
    assert_eq!(imports, 2);
    assert!(has(&code, |i| matches!(i, Instr::ImportFrom(_))));
}

// --- Misplaced statements ---

#[test]
fn misplaced_statements_are_compile_errors() {
    assert!(compile_err("break\n").contains("outside loop"));
    assert!(compile_err("continue\n").contains("outside loop"));
    assert!(compile_err("yield 1\n").contains("outside generator"));
    assert!(compile_err("class C:\n    return 1\n").contains("class body"));
    assert!(compile_err("def g():\n    yield 1\n    return 2\n").contains("inside generator"));
    assert!(compile_err("def f():\n    nonlocal zz\n").contains("no binding"));
}

#[test]
fn debug_builds_emit_stack_depth_markers() {
    let (vm, block) = compile("a = 1\nb = 2\n");
    let code = instrs(&vm, block);
    assert!(has(&code, |i| matches!(i, Instr::AssertStackDepth(_))));
}
