// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for blocks and branch patching.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use adder_core::Pos;

fn block() -> BlockData {
    BlockData::new("<test>", CellId::from_index(0), 0, false)
}

#[test]
fn append_returns_indices() {
    let mut block = block();
    assert_eq!(block.append(Instr::Pop), 0);
    assert_eq!(block.append(Instr::Swap), 1);
    assert_eq!(block.next_index(), 2);
}

#[test]
fn branch_here_patches_the_source() {
    let mut block = block();
    let source = block.append(Instr::BranchIfFalse(0));
    block.append(Instr::Pop);
    block.append(Instr::Pop);
    block.branch_here(source);
    assert_eq!(block.instrs[source as usize], Instr::BranchIfFalse(3));
}

#[test]
fn loop_control_target_patches() {
    let mut block = block();
    let source = block.append(Instr::LoopControlJump {
        finally_count: 1,
        region_count: 1,
        target: 0,
    });
    block.append(Instr::Pop);
    block.patch_target(source, 9);
    assert_eq!(
        block.instrs[source as usize],
        Instr::LoopControlJump {
            finally_count: 1,
            region_count: 1,
            target: 9,
        }
    );
}

#[test]
fn constants_deduplicate_by_identity() {
    let mut block = block();
    let value = Value::small_int(42);
    let first = block.add_const(value);
    let second = block.add_const(value);
    assert_eq!(first, second);
    let other = block.add_const(Value::small_int(43));
    assert_ne!(first, other);
}

#[test]
fn pos_table_maps_instruction_ranges() {
    let mut block = block();
    block.set_next_pos(Pos::new(1, 1));
    block.append(Instr::Pop);
    block.append(Instr::Pop);
    block.set_next_pos(Pos::new(2, 1));
    block.append(Instr::Swap);
    assert_eq!(block.pos_at(0), Pos::new(1, 1));
    assert_eq!(block.pos_at(1), Pos::new(1, 1));
    assert_eq!(block.pos_at(2), Pos::new(2, 1));
    // Past the end the last position wins.
    assert_eq!(block.pos_at(9), Pos::new(2, 1));
}
