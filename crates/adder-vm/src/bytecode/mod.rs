// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode blocks and the instruction set.
//!
//! A block is the compiled form of a function body, lambda, class body,
//! generator body or module top level: a flat instruction vector plus the
//! constants, nested blocks and frame layout it references, and a map
//! from instruction index to source position.
//!
//! Instructions are immutable after compilation with one exception: the
//! inline-cache rewrite. `GetMethod`, `BinaryOp` and `CompareOp` start in
//! their generic form, overwrite themselves with a specialized variant on
//! first execution, and fall back to a permanently generic variant on a
//! type mismatch. A rewritten instruction can capture a heap value, so
//! tracing a block walks its instructions too.

#[cfg(test)]
mod bytecode_test;

use crate::ast::{BinaryOp, CompareOp};
use crate::heap::{CellId, Tracer};
use crate::value::{Name, Value};
use adder_core::Pos;
use core::fmt;

/// Everything `Lambda` needs to build a function object.
#[derive(Debug, Clone)]
pub struct LambdaSpec {
    /// Definition name (`(lambda)` for lambdas).
    pub name: Name,
    /// Parameter names, rest parameter last.
    pub params: Vec<Name>,
    /// Index into the owning block's nested-block vector.
    pub block_index: u16,
    /// How many defaults the instruction pops.
    pub default_count: u16,
    /// Whether the last parameter is a `*rest`.
    pub takes_rest: bool,
    /// Whether the body is a generator.
    pub is_generator: bool,
}

/// One bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instr {
    /// Push a constant from the pool.
    Const(u16),
    /// Pop the top of stack.
    Pop,
    /// Push a copy of the element `n` below the top (0 = top).
    Dup(u8),
    /// Swap the two topmost elements.
    Swap,
    /// Push a stack-local slot.
    GetStackLocal { name: Name, slot: u16 },
    /// Store the top of stack into a stack-local slot without popping.
    SetStackLocal { name: Name, slot: u16 },
    /// Clear a stack-local slot.
    DelStackLocal { name: Name, slot: u16 },
    /// Push a binding from the environment `frame` hops up.
    GetLexical { frame: u16, name: Name },
    /// Store into an enclosing environment without popping.
    SetLexical { frame: u16, name: Name },
    /// Delete a binding in an enclosing environment.
    DelLexical { frame: u16, name: Name },
    /// Push a global from the frame's module (or builtins).
    GetGlobal(Name),
    /// Store the top of stack into the module's globals without popping.
    SetGlobal(Name),
    /// Delete a module global.
    DelGlobal(Name),
    /// Pop receiver, push attribute; raises `AttributeError` if absent.
    GetAttr(Name),
    /// Pop receiver, set its attribute to the (kept) top of stack.
    SetAttr(Name),
    /// Pop receiver, delete attribute.
    DelAttr(Name),
    /// Pop receiver, push method, push receiver back. Rewrites itself.
    GetMethod(Name),
    /// Specialized `GetMethod` for immediate-integer receivers.
    GetMethodInt { name: Name, method: Value },
    /// Permanently generic `GetMethod`.
    GetMethodFallback(Name),
    /// Consume target plus `n` arguments, invoke.
    Call(u16),
    /// Consume method, receiver and `n` arguments, invoke.
    CallMethod(u16),
    /// Return the top of stack to the caller.
    Return,
    /// Raise the top of stack.
    Raise,
    /// Pop two operands, apply the operator. Rewrites itself.
    BinaryOp(BinaryOp),
    /// Specialized `BinaryOp` for a pair of immediate integers.
    BinaryOpInt(BinaryOp),
    /// Permanently generic `BinaryOp`.
    BinaryOpFallback(BinaryOp),
    /// Pop two operands, compare. Rewrites itself.
    CompareOp(CompareOp),
    /// Specialized `CompareOp` for a pair of immediate integers.
    CompareOpInt(CompareOp),
    /// Permanently generic `CompareOp`.
    CompareOpFallback(CompareOp),
    /// Augmented-assignment update: in-place method, else plain method.
    AugUpdate(BinaryOp),
    /// Pop container and item, push containment result.
    In,
    /// Pop two values, push identity comparison.
    Is,
    /// Pop a value, push its boolean negation.
    Not,
    /// Unconditional branch.
    BranchAlways(u32),
    /// Pop condition, branch when true.
    BranchIfTrue(u32),
    /// Pop condition, branch when false.
    BranchIfFalse(u32),
    /// Short-circuit `or`: peek, branch without popping when true.
    Or(u32),
    /// Short-circuit `and`: peek, branch without popping when false.
    And(u32),
    /// Pop `n` values, push a tuple of them.
    Tuple(u16),
    /// Pop `n` values, push a list of them.
    List(u16),
    /// Pop `n` key-value pairs, push a dict.
    Dict(u16),
    /// Pop step, stop and start, push a slice.
    Slice,
    /// Call the iterator's `next`; push value and a continue flag.
    IteratorNext,
    /// Build a function object from a lambda spec, popping its defaults.
    Lambda(u16),
    /// Build a class from the current frame's environment.
    MakeClassFromFrame(Name),
    /// Allocate the frame's heap environment, consuming the arguments.
    CreateEnv,
    /// Extend the operand stack with uninitialized local slots.
    InitStackLocals,
    /// Open a catch region whose handler is the target.
    EnterCatchRegion(u32),
    /// Close the innermost catch region.
    LeaveCatchRegion,
    /// Open a finally region whose handler is the target.
    EnterFinallyRegion(u32),
    /// Close the innermost finally region.
    LeaveFinallyRegion,
    /// Pop a class; push the exception and true on match, false otherwise.
    MatchCurrentException,
    /// Bare `except`: take the current exception unconditionally.
    HandleCurrentException,
    /// End of handler: continue an unwind plan or re-raise.
    FinishExceptionHandler,
    /// Pop a message, raise `AssertionError`.
    AssertionFailed,
    /// Detach the new frame into a generator iterator and return it.
    StartGenerator,
    /// Yield: save the frame and deliver the popped value.
    SuspendGenerator,
    /// Reinstall a suspended generator frame.
    ResumeGenerator,
    /// Finish the generator: raise `StopIteration`.
    LeaveGenerator,
    /// Unwind `finally_count` finally regions, then branch to target.
    LoopControlJump {
        finally_count: u16,
        region_count: u16,
        target: u32,
    },
    /// Return the popped value after unwinding through open regions.
    ReturnThroughFinally {
        finally_count: u16,
        region_count: u16,
    },
    /// Import a module by name and push it.
    ImportModule(Name),
    /// Pop a module, push one of its attributes.
    ImportFrom(Name),
    /// Debug marker: assert the operand-stack depth above the frame base.
    AssertStackDepth(u32),
}

impl Instr {
    /// The instruction's branch target, if it has one.
    #[must_use]
    pub const fn target(self) -> Option<u32> {
        match self {
            Self::BranchAlways(t)
            | Self::BranchIfTrue(t)
            | Self::BranchIfFalse(t)
            | Self::Or(t)
            | Self::And(t)
            | Self::EnterCatchRegion(t)
            | Self::EnterFinallyRegion(t)
            | Self::LoopControlJump { target: t, .. } => Some(t),
            _ => None,
        }
    }
}

/// A compiled block.
#[derive(Debug)]
pub struct BlockData {
    /// Source file name, for positions and uncaught-exception reports.
    pub file: String,
    /// Layout of the frame's locals.
    pub layout: CellId,
    /// Number of parameters the caller binds.
    pub arg_count: usize,
    /// Whether invocations allocate a heap environment.
    pub needs_env: bool,
    /// The instructions.
    pub instrs: Vec<Instr>,
    /// The constant pool.
    pub consts: Vec<Value>,
    /// Nested blocks, one per inner function, lambda or class body.
    pub nested: Vec<CellId>,
    /// Lambda build descriptions referenced by `Instr::Lambda`.
    pub lambdas: Vec<LambdaSpec>,
    pos_table: Vec<(u32, Pos)>,
    next_pos: Pos,
}

impl BlockData {
    /// An empty block for the given frame layout.
    #[must_use]
    pub fn new(file: impl Into<String>, layout: CellId, arg_count: usize, needs_env: bool) -> Self {
        Self {
            file: file.into(),
            layout,
            arg_count,
            needs_env,
            instrs: Vec::new(),
            consts: Vec::new(),
            nested: Vec::new(),
            lambdas: Vec::new(),
            pos_table: Vec::new(),
            next_pos: Pos::default(),
        }
    }

    /// Append an instruction, returning its index.
    pub fn append(&mut self, instr: Instr) -> u32 {
        let index = u32::try_from(self.instrs.len()).expect("block too long");
        if self.next_pos.is_known()
            && self.pos_table.last().is_none_or(|&(_, pos)| pos != self.next_pos)
        {
            self.pos_table.push((index, self.next_pos));
        }
        self.instrs.push(instr);
        index
    }

    /// Index the next appended instruction will get.
    #[must_use]
    pub fn next_index(&self) -> u32 {
        u32::try_from(self.instrs.len()).expect("block too long")
    }

    /// Patch the branch at `source` to target the next instruction.
    ///
    /// # Panics
    ///
    /// Panics if the instruction at `source` has no branch target.
    pub fn branch_here(&mut self, source: u32) {
        let target = self.next_index();
        self.patch_target(source, target);
    }

    /// Patch the branch at `source` to the given target.
    pub fn patch_target(&mut self, source: u32, new_target: u32) {
        let instr = &mut self.instrs[source as usize];
        match instr {
            Instr::BranchAlways(t)
            | Instr::BranchIfTrue(t)
            | Instr::BranchIfFalse(t)
            | Instr::Or(t)
            | Instr::And(t)
            | Instr::EnterCatchRegion(t)
            | Instr::EnterFinallyRegion(t)
            | Instr::LoopControlJump { target: t, .. } => *t = new_target,
            other => panic!("cannot patch branch target of {other:?}"),
        }
    }

    /// Add a constant, returning its pool index.
    pub fn add_const(&mut self, value: Value) -> u16 {
        if let Some(index) = self.consts.iter().position(|&v| v == value) {
            return u16::try_from(index).expect("constant pool overflow");
        }
        let index = u16::try_from(self.consts.len()).expect("constant pool overflow");
        self.consts.push(value);
        index
    }

    /// Add a nested block, returning its index.
    pub fn add_nested(&mut self, block: CellId) -> u16 {
        let index = u16::try_from(self.nested.len()).expect("too many nested blocks");
        self.nested.push(block);
        index
    }

    /// Add a lambda spec, returning its index.
    pub fn add_lambda(&mut self, spec: LambdaSpec) -> u16 {
        let index = u16::try_from(self.lambdas.len()).expect("too many lambdas");
        self.lambdas.push(spec);
        index
    }

    /// Record the source position for instructions appended from here on.
    pub fn set_next_pos(&mut self, pos: Pos) {
        if pos.is_known() {
            self.next_pos = pos;
        }
    }

    /// The source position of the instruction at `index`.
    #[must_use]
    pub fn pos_at(&self, index: u32) -> Pos {
        match self.pos_table.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(found) => self.pos_table[found].1,
            Err(0) => Pos::default(),
            Err(after) => self.pos_table[after - 1].1,
        }
    }

    /// Visit every heap reference the block owns, including values
    /// captured by rewritten inline-cache instructions.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.visit(self.layout);
        tracer.visit_values(&self.consts);
        for &nested in &self.nested {
            tracer.visit(nested);
        }
        for instr in &self.instrs {
            if let Instr::GetMethodInt { method, .. } = instr {
                tracer.visit_value(*method);
            }
        }
    }
}

impl fmt::Display for BlockData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{index:4}  {instr:?}")?;
        }
        Ok(())
    }
}
