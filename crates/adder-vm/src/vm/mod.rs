// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The bytecode interpreter.
//!
//! A single dispatch loop reads the instruction at the current ip,
//! advances ip, and executes it. Instructions push and pop the operand
//! stack, branch, push and pop frames, raise (set the current exception
//! and start unwinding) or suspend the frame into a generator.
//!
//! Natives that need method dispatch re-enter the loop through
//! [`Vm::call_sub`], which runs nested frames down to a watermark. The
//! unwinding protocol walks each frame's open regions innermost-first:
//! catch regions take the exception, finally regions run with the
//! exception still pending and re-raise from `FinishExceptionHandler`.

mod frame;
mod protocol;
#[cfg(test)]
mod vm_test;

pub use frame::{Frame, GenState, GeneratorData, PlanAction, Region, RegionKind, UnwindPlan};
pub(crate) use protocol::Num;
pub use protocol::format_float;

use crate::builtins::dict::DictData;
use crate::builtins::slice::SliceData;
use crate::builtins::{Builtins, bootstrap};
use crate::bytecode::Instr;
use crate::compiler::compile_module;
use crate::heap::{CellId, Heap};
use crate::reader::parse_module;
use crate::value::{
    CellKind, EnvData, ExceptionData, FunctionData, ModuleData, Name, NameTable, ObjectData, Value,
    get_own_attr, layout, set_own_attr, short_repr,
};
use adder_core::{Input, Pos};
use std::collections::HashMap;
use std::path::PathBuf;

/// Failure signal: the current-exception slot has been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raise;

/// An uncaught exception, extracted for reporting.
#[derive(Debug, Clone)]
pub struct ExceptionReport {
    /// Class name, e.g. `TypeError`.
    pub class_name: String,
    /// The message.
    pub message: String,
    /// Source file the exception was raised in.
    pub file: String,
    /// Source position.
    pub pos: Pos,
}

impl std::fmt::Display for ExceptionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} at {} line {}",
            self.class_name, self.message, self.file, self.pos.line
        )
    }
}

/// The virtual machine.
pub struct Vm {
    /// The garbage-collected heap.
    pub heap: Heap,
    /// The intern table.
    pub names: NameTable,
    /// Built-in classes, singletons and the builtins module.
    pub builtins: Builtins,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    current_exception: Option<Value>,
    modules: HashMap<String, CellId>,
    lib_dir: Option<PathBuf>,
    main_dir: Option<PathBuf>,
}

impl Vm {
    /// Create a VM with the built-in classes and singletons in place.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let mut names = NameTable::new();
        let builtins = bootstrap(&mut heap, &mut names);
        Self {
            heap,
            names,
            builtins,
            stack: Vec::new(),
            frames: Vec::new(),
            current_exception: None,
            modules: HashMap::new(),
            lib_dir: None,
            main_dir: None,
        }
    }

    /// Set the library directory modules and `builtin.adr` load from.
    pub fn set_lib_dir(&mut self, dir: PathBuf) {
        self.lib_dir = Some(dir);
    }

    /// Set the directory of the main script, searched for imports.
    pub fn set_main_dir(&mut self, dir: PathBuf) {
        self.main_dir = Some(dir);
    }

    /// Execute the bundled `builtin` library against the builtins module.
    ///
    /// # Errors
    ///
    /// Returns [`Raise`] with the current exception set.
    pub fn load_builtin_library(&mut self) -> Result<(), Raise> {
        let Some(dir) = self.lib_dir.clone() else {
            return Ok(());
        };
        let path = dir.join("builtin.adr");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Ok(());
        };
        let input = Input::new(path.display().to_string(), text);
        let module = self.builtins.builtins_module;
        self.run_source(&input, module).map(|_| ())
    }

    /// Compile and run source text against a module object.
    ///
    /// # Errors
    ///
    /// Returns [`Raise`] with the current exception set; syntax errors
    /// surface as `SyntaxError` exceptions.
    pub fn run_source(&mut self, input: &Input, module: CellId) -> Result<Value, Raise> {
        let syntax = match parse_module(input) {
            Ok(syntax) => syntax,
            Err(error) => {
                return Err(self.raise_syntax_error(&error.message, error.pos, input.name()));
            }
        };
        let block = match compile_module(self, &syntax, module, input.name()) {
            Ok(block) => block,
            Err(error) => {
                return Err(self.raise_syntax_error(&error.message, error.pos, input.name()));
            }
        };
        self.run_block(block, module)
    }

    /// Create a fresh module object.
    pub fn new_module(&mut self, name: &str) -> CellId {
        let empty_layout = self.builtins.empty_layout;
        let attrs = crate::value::Attrs {
            layout: empty_layout,
            slots: Vec::new(),
        };
        self.alloc(CellKind::Module(ModuleData {
            name: name.to_owned(),
            attrs,
        }))
    }

    /// Run a compiled block as a module top level.
    ///
    /// # Errors
    ///
    /// Returns [`Raise`] with the current exception set.
    pub fn run_block(&mut self, block: CellId, module: CellId) -> Result<Value, Raise> {
        let watermark = self.frames.len();
        let depth_before = self.stack.len();
        let frame = Frame::new(block, module, self.stack.len(), None);
        self.push_frame(frame);
        let result = self.run(watermark);
        match result {
            Ok(()) => {
                debug_assert_eq!(self.stack.len(), depth_before + 1, "stack balance");
                Ok(self.stack.pop().expect("module result"))
            }
            Err(raise) => {
                debug_assert_eq!(self.frames.len(), watermark, "frame balance");
                self.stack.truncate(depth_before);
                Err(raise)
            }
        }
    }

    /// Take the current exception as a report, clearing the slot.
    pub fn take_exception_report(&mut self) -> Option<ExceptionReport> {
        let value = self.current_exception.take()?;
        let Some(id) = value.as_cell() else {
            return None;
        };
        if let CellKind::Exception(exception) = self.heap.get(id) {
            let class_name = match self.heap.get(exception.class) {
                CellKind::Class(class) => class.name.clone(),
                _ => String::from("Exception"),
            };
            Some(ExceptionReport {
                class_name,
                message: exception.message.clone(),
                file: exception.file.clone(),
                pos: exception.pos,
            })
        } else {
            Some(ExceptionReport {
                class_name: String::from("Exception"),
                message: short_repr(&self.heap, value),
                file: String::new(),
                pos: Pos::default(),
            })
        }
    }

    // --- Allocation and collection ---

    /// Allocate, collecting first when the heap asks for it.
    ///
    /// Every value the new cell must reference has to be reachable from a
    /// root (usually the operand stack) across this call.
    pub fn alloc(&mut self, kind: CellKind) -> CellId {
        if self.heap.should_collect() {
            self.collect();
        }
        self.heap.alloc(kind)
    }

    /// Run a full collection with the VM's roots.
    pub fn collect(&mut self) {
        let Self {
            heap,
            builtins,
            stack,
            frames,
            current_exception,
            modules,
            ..
        } = self;
        heap.collect(|tracer| {
            tracer.visit_values(stack);
            for frame in frames.iter() {
                frame.trace(tracer);
            }
            if let Some(exception) = current_exception {
                tracer.visit_value(*exception);
            }
            for &module in modules.values() {
                tracer.visit(module);
            }
            builtins.trace(tracer);
        });
    }

    // --- Stack primitives ---

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("operand stack underflow")
    }

    fn peek(&self, depth: usize) -> Value {
        self.stack[self.stack.len() - depth - 1]
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn push_frame(&mut self, frame: Frame) {
        tracing::trace!(
            target: "adder::frame",
            depth = self.frames.len() + 1,
            block = %frame.block,
            "push frame"
        );
        self.frames.push(frame);
    }

    fn pop_frame(&mut self) -> Frame {
        let frame = self.frames.pop().expect("no active frame");
        tracing::trace!(
            target: "adder::frame",
            depth = self.frames.len(),
            block = %frame.block,
            "pop frame"
        );
        frame
    }

    /// The source position of the instruction currently executing.
    #[must_use]
    pub fn current_pos(&self) -> (String, Pos) {
        let Some(frame) = self.frames.last() else {
            return (String::new(), Pos::default());
        };
        let CellKind::Block(block) = self.heap.get(frame.block) else {
            return (String::new(), Pos::default());
        };
        let index = u32::try_from(frame.ip.saturating_sub(1)).unwrap_or(u32::MAX);
        (block.file.clone(), block.pos_at(index))
    }

    // --- Raising ---

    /// Create an exception of `class` and set it current.
    pub fn raise(&mut self, class: CellId, message: impl Into<String>) -> Raise {
        let (file, pos) = self.current_pos();
        let exception = self.alloc(CellKind::Exception(ExceptionData {
            class,
            message: message.into(),
            pos,
            file,
        }));
        self.current_exception = Some(Value::cell(exception));
        Raise
    }

    fn raise_syntax_error(&mut self, message: &str, pos: Pos, file: &str) -> Raise {
        let class = self.builtins.syntax_error;
        let exception = self.alloc(CellKind::Exception(ExceptionData {
            class,
            message: message.to_owned(),
            pos,
            file: file.to_owned(),
        }));
        self.current_exception = Some(Value::cell(exception));
        Raise
    }

    /// Set an existing exception value current.
    pub fn raise_value(&mut self, value: Value) -> Raise {
        self.current_exception = Some(value);
        Raise
    }

    /// The current exception, if one is being propagated.
    #[must_use]
    pub const fn current_exception(&self) -> Option<Value> {
        self.current_exception
    }

    /// Whether the current exception is an instance of `class`.
    fn current_exception_matches(&self, class: CellId) -> bool {
        let Some(value) = self.current_exception else {
            return false;
        };
        let Some(id) = value.as_cell() else {
            return false;
        };
        let CellKind::Exception(exception) = self.heap.get(id) else {
            return false;
        };
        self.is_subclass(exception.class, class)
    }

    // --- The dispatch loop ---

    /// Run until the frame stack drops back to `watermark`.
    fn run(&mut self, watermark: usize) -> Result<(), Raise> {
        while self.frames.len() > watermark {
            if let Err(Raise) = self.step() {
                self.unwind(watermark)?;
            }
        }
        Ok(())
    }

    /// Unwind the current exception to the innermost open region.
    ///
    /// # Errors
    ///
    /// Returns [`Raise`] when the exception escapes every frame above
    /// `watermark`.
    fn unwind(&mut self, watermark: usize) -> Result<(), Raise> {
        debug_assert!(self.current_exception.is_some(), "unwind without exception");
        loop {
            if self.frames.len() == watermark {
                return Err(Raise);
            }
            let frame = self.frame_mut();
            // An in-flight break/continue/return is abandoned.
            frame.unwind_plan = None;
            if let Some(region) = frame.regions.pop() {
                frame.ip = region.handler as usize;
                self.stack.truncate(region.stack_depth);
                return Ok(());
            }
            let frame = self.pop_frame();
            self.stack.truncate(frame.stack_base);
            if let Some(generator) = frame.generator {
                if let CellKind::Generator(r#gen) = self.heap.get_mut(generator) {
                    r#gen.state = GenState::Finished;
                }
            }
        }
    }

    /// Execute one instruction.
    #[allow(clippy::too_many_lines)]
    fn step(&mut self) -> Result<(), Raise> {
        let frame = self.frame();
        let block_id = frame.block;
        let ip = frame.ip;
        let CellKind::Block(block) = self.heap.get(block_id) else {
            panic!("frame block is not a block cell");
        };
        let instr = block.instrs[ip];
        self.frame_mut().ip = ip + 1;
        tracing::trace!(
            target: "adder::instr",
            ip,
            depth = self.stack.len(),
            ?instr,
            "execute"
        );

        match instr {
            Instr::Const(index) => {
                let CellKind::Block(block) = self.heap.get(block_id) else {
                    unreachable!("checked above");
                };
                let value = block.consts[index as usize];
                self.push(value);
            }
            Instr::Pop => {
                self.pop();
            }
            Instr::Dup(depth) => {
                let value = self.peek(depth as usize);
                self.push(value);
            }
            Instr::Swap => {
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            Instr::GetStackLocal { name, slot } => {
                let base = self.frame().stack_base;
                let value = self.stack[base + slot as usize];
                if value == self.builtins.uninitialized {
                    let text = self.names.text(name).to_owned();
                    let class = self.builtins.name_error;
                    return Err(self.raise(
                        class,
                        format!("local variable '{text}' referenced before assignment"),
                    ));
                }
                self.push(value);
            }
            Instr::SetStackLocal { slot, .. } => {
                let base = self.frame().stack_base;
                let value = self.peek(0);
                self.stack[base + slot as usize] = value;
            }
            Instr::DelStackLocal { name, slot } => {
                let base = self.frame().stack_base;
                let uninit = self.builtins.uninitialized;
                if self.stack[base + slot as usize] == uninit {
                    let text = self.names.text(name).to_owned();
                    let class = self.builtins.name_error;
                    return Err(self.raise(class, format!("name '{text}' is not defined")));
                }
                self.stack[base + slot as usize] = uninit;
            }
            Instr::GetLexical { frame, name } => {
                let env = self.lexical_env(frame)?;
                let value = get_own_attr(&self.heap, env, name);
                match value {
                    Some(value) if value != self.builtins.uninitialized => self.push(value),
                    _ => {
                        let text = self.names.text(name).to_owned();
                        let class = self.builtins.name_error;
                        return Err(self.raise(
                            class,
                            format!("free variable '{text}' referenced before assignment"),
                        ));
                    }
                }
            }
            Instr::SetLexical { frame, name } => {
                let env = self.lexical_env(frame)?;
                let value = self.peek(0);
                set_own_attr(&mut self.heap, env, name, value);
            }
            Instr::DelLexical { frame, name } => {
                let env = self.lexical_env(frame)?;
                let uninit = self.builtins.uninitialized;
                if !crate::value::clear_own_attr(&mut self.heap, env, name, uninit) {
                    let text = self.names.text(name).to_owned();
                    let class = self.builtins.name_error;
                    return Err(self.raise(class, format!("name '{text}' is not defined")));
                }
            }
            Instr::GetGlobal(name) => {
                let value = self.load_global(name)?;
                self.push(value);
            }
            Instr::SetGlobal(name) => {
                let module = self.frame().module;
                let value = self.peek(0);
                set_own_attr(&mut self.heap, module, name, value);
            }
            Instr::DelGlobal(name) => {
                let module = self.frame().module;
                let uninit = self.builtins.uninitialized;
                if !crate::value::clear_own_attr(&mut self.heap, module, name, uninit) {
                    let text = self.names.text(name).to_owned();
                    let class = self.builtins.name_error;
                    return Err(self.raise(class, format!("name '{text}' is not defined")));
                }
            }
            Instr::GetAttr(name) => {
                let receiver = self.peek(0);
                let value = self.get_attr(receiver, name)?;
                self.pop();
                self.push(value);
            }
            Instr::SetAttr(name) => {
                let receiver = self.pop();
                let value = self.peek(0);
                self.set_attr(receiver, name, value)?;
            }
            Instr::DelAttr(name) => {
                let receiver = self.pop();
                self.del_attr(receiver, name)?;
            }
            Instr::GetMethod(name) => {
                let receiver = self.peek(0);
                let method = self.get_attr(receiver, name)?;
                let rewritten = if receiver.is_small_int() {
                    Instr::GetMethodInt { name, method }
                } else {
                    Instr::GetMethodFallback(name)
                };
                self.rewrite_instr(block_id, ip, rewritten);
                self.pop();
                self.push(method);
                self.push(receiver);
            }
            Instr::GetMethodInt { name, method } => {
                let receiver = self.peek(0);
                if receiver.is_small_int() {
                    self.pop();
                    self.push(method);
                    self.push(receiver);
                } else {
                    self.rewrite_instr(block_id, ip, Instr::GetMethodFallback(name));
                    let method = self.get_attr(receiver, name)?;
                    self.pop();
                    self.push(method);
                    self.push(receiver);
                }
            }
            Instr::GetMethodFallback(name) => {
                let receiver = self.peek(0);
                let method = self.get_attr(receiver, name)?;
                self.pop();
                self.push(method);
                self.push(receiver);
            }
            Instr::Call(count) => self.do_call(count as usize)?,
            Instr::CallMethod(count) => self.do_call(count as usize + 1)?,
            Instr::Return => {
                let value = self.pop();
                let frame = self.pop_frame();
                self.stack.truncate(frame.stack_base);
                self.push(value);
            }
            Instr::Raise => {
                let value = self.peek(0);
                let raised = self.exception_from_value(value)?;
                self.pop();
                return Err(self.raise_value(raised));
            }
            Instr::BinaryOp(op) => {
                let rewritten = if self.both_small_ints() {
                    Instr::BinaryOpInt(op)
                } else {
                    Instr::BinaryOpFallback(op)
                };
                self.rewrite_instr(block_id, ip, rewritten);
                if self.both_small_ints() {
                    self.binary_int(op)?;
                } else {
                    self.binary_slow(op)?;
                }
            }
            Instr::BinaryOpInt(op) => {
                if self.both_small_ints() {
                    self.binary_int(op)?;
                } else {
                    self.rewrite_instr(block_id, ip, Instr::BinaryOpFallback(op));
                    self.binary_slow(op)?;
                }
            }
            Instr::BinaryOpFallback(op) => self.binary_slow(op)?,
            Instr::CompareOp(op) => {
                let rewritten = if self.both_small_ints() {
                    Instr::CompareOpInt(op)
                } else {
                    Instr::CompareOpFallback(op)
                };
                self.rewrite_instr(block_id, ip, rewritten);
                if self.both_small_ints() {
                    self.compare_int(op);
                } else {
                    self.compare_slow(op)?;
                }
            }
            Instr::CompareOpInt(op) => {
                if self.both_small_ints() {
                    self.compare_int(op);
                } else {
                    self.rewrite_instr(block_id, ip, Instr::CompareOpFallback(op));
                    self.compare_slow(op)?;
                }
            }
            Instr::CompareOpFallback(op) => self.compare_slow(op)?,
            Instr::AugUpdate(op) => self.aug_update(op)?,
            Instr::In => {
                let container = self.peek(0);
                let item = self.peek(1);
                let contains = self.names.well_known().contains;
                let method = match self.maybe_get_attr(container, contains) {
                    Some(method) => method,
                    None => {
                        let type_name = self.type_name(container).to_owned();
                        let class = self.builtins.type_error;
                        return Err(self.raise(
                            class,
                            format!("argument of type '{type_name}' is not iterable"),
                        ));
                    }
                };
                let result = self.call_sub(method, &[container, item])?;
                let truth = self.bool_value(self.is_true(result));
                self.pop();
                self.pop();
                self.push(truth);
            }
            Instr::Is => {
                let right = self.pop();
                let left = self.pop();
                let truth = self.bool_value(left == right);
                self.push(truth);
            }
            Instr::Not => {
                let value = self.pop();
                let truth = self.bool_value(!self.is_true(value));
                self.push(truth);
            }
            Instr::BranchAlways(target) => self.frame_mut().ip = target as usize,
            Instr::BranchIfTrue(target) => {
                let value = self.pop();
                if self.is_true(value) {
                    self.frame_mut().ip = target as usize;
                }
            }
            Instr::BranchIfFalse(target) => {
                let value = self.pop();
                if !self.is_true(value) {
                    self.frame_mut().ip = target as usize;
                }
            }
            Instr::Or(target) => {
                let value = self.peek(0);
                if self.is_true(value) {
                    self.frame_mut().ip = target as usize;
                } else {
                    self.pop();
                }
            }
            Instr::And(target) => {
                let value = self.peek(0);
                if self.is_true(value) {
                    self.pop();
                } else {
                    self.frame_mut().ip = target as usize;
                }
            }
            Instr::Tuple(count) => {
                let id = self.alloc(CellKind::Tuple(Vec::new()));
                self.fill_sequence(id, count as usize);
            }
            Instr::List(count) => {
                let id = self.alloc(CellKind::List(Vec::new()));
                self.fill_sequence(id, count as usize);
            }
            Instr::Dict(count) => {
                let id = self.alloc(CellKind::Dict(DictData::new()));
                self.push(Value::cell(id));
                for pair in (0..count).rev() {
                    let key = self.peek(2 * pair as usize + 2);
                    let value = self.peek(2 * pair as usize + 1);
                    self.dict_insert(id, key, value)?;
                }
                let dict = self.pop();
                self.stack.truncate(self.stack.len() - 2 * count as usize);
                self.push(dict);
            }
            Instr::Slice => {
                let slice = SliceData {
                    start: self.peek(2),
                    stop: self.peek(1),
                    step: self.peek(0),
                };
                let id = self.alloc(CellKind::Slice(slice));
                self.stack.truncate(self.stack.len() - 3);
                self.push(Value::cell(id));
            }
            Instr::IteratorNext => {
                let method = self.peek(1);
                let iterator = self.peek(0);
                match self.call_sub(method, &[iterator]) {
                    Ok(value) => {
                        self.push(value);
                        let truth = self.builtins.true_;
                        self.push(truth);
                    }
                    Err(Raise) => {
                        if self.current_exception_matches(self.builtins.stop_iteration) {
                            self.current_exception = None;
                            let none = self.builtins.none;
                            let falsy = self.builtins.false_;
                            self.push(none);
                            self.push(falsy);
                        } else {
                            return Err(Raise);
                        }
                    }
                }
            }
            Instr::Lambda(index) => {
                let CellKind::Block(block) = self.heap.get(block_id) else {
                    unreachable!("checked above");
                };
                let spec = block.lambdas[index as usize].clone();
                let nested = block.nested[spec.block_index as usize];
                let default_count = spec.default_count as usize;
                let mut defaults = Vec::with_capacity(default_count);
                for offset in (0..default_count).rev() {
                    defaults.push(self.peek(offset));
                }
                let frame = self.frame();
                let env = frame.lexical_env();
                let module = frame.module;
                let function = self.alloc(CellKind::Function(FunctionData {
                    name: spec.name,
                    params: spec.params,
                    block: nested,
                    defaults,
                    takes_rest: spec.takes_rest,
                    is_generator: spec.is_generator,
                    env,
                    module,
                }));
                self.stack.truncate(self.stack.len() - default_count);
                self.push(Value::cell(function));
            }
            Instr::MakeClassFromFrame(name) => self.make_class_from_frame(name)?,
            Instr::CreateEnv => {
                let frame_index = self.frames.len() - 1;
                let (block_layout, arg_count, parent) = {
                    let frame = &self.frames[frame_index];
                    let CellKind::Block(block) = self.heap.get(frame.block) else {
                        panic!("frame block is not a block cell");
                    };
                    (block.layout, block.arg_count, frame.outer_env)
                };
                let slot_count = layout::slot_count(&self.heap, block_layout) as usize;
                let uninit = self.builtins.uninitialized;
                let env = self.alloc(CellKind::Env(EnvData {
                    attrs: crate::value::Attrs {
                        layout: block_layout,
                        slots: vec![uninit; slot_count],
                    },
                    parent,
                }));
                let base = self.frames[frame_index].stack_base;
                for slot in 0..arg_count {
                    let value = self.stack[base + slot];
                    let CellKind::Env(env_data) = self.heap.get_mut(env) else {
                        unreachable!("just allocated");
                    };
                    env_data.attrs.slots[slot] = value;
                }
                self.stack.truncate(base);
                self.frames[frame_index].env = Some(env);
            }
            Instr::InitStackLocals => {
                let frame = self.frame();
                let CellKind::Block(block) = self.heap.get(frame.block) else {
                    panic!("frame block is not a block cell");
                };
                let slot_count = layout::slot_count(&self.heap, block.layout) as usize;
                let missing = slot_count - block.arg_count;
                let uninit = self.builtins.uninitialized;
                for _ in 0..missing {
                    self.push(uninit);
                }
            }
            Instr::EnterCatchRegion(target) => {
                let depth = self.stack.len();
                self.frame_mut().regions.push(Region {
                    kind: RegionKind::Catch,
                    handler: target,
                    stack_depth: depth,
                });
            }
            Instr::LeaveCatchRegion => {
                let region = self.frame_mut().regions.pop().expect("open catch region");
                debug_assert_eq!(region.kind, RegionKind::Catch);
            }
            Instr::EnterFinallyRegion(target) => {
                let depth = self.stack.len();
                self.frame_mut().regions.push(Region {
                    kind: RegionKind::Finally,
                    handler: target,
                    stack_depth: depth,
                });
            }
            Instr::LeaveFinallyRegion => {
                let region = self.frame_mut().regions.pop().expect("open finally region");
                debug_assert_eq!(region.kind, RegionKind::Finally);
            }
            Instr::MatchCurrentException => {
                let class_value = self.pop();
                let Some(class) = class_value.as_cell() else {
                    let type_class = self.builtins.type_error;
                    return Err(self.raise(type_class, "except clause needs an exception class"));
                };
                if !matches!(self.heap.get(class), CellKind::Class(_)) {
                    let type_class = self.builtins.type_error;
                    return Err(self.raise(type_class, "except clause needs an exception class"));
                }
                if self.current_exception_matches(class) {
                    let exception = self
                        .current_exception
                        .take()
                        .expect("match checked the exception");
                    let truth = self.builtins.true_;
                    self.push(exception);
                    self.push(truth);
                } else {
                    let falsy = self.builtins.false_;
                    self.push(falsy);
                }
            }
            Instr::HandleCurrentException => {
                debug_assert!(self.current_exception.is_some());
                self.current_exception = None;
            }
            Instr::FinishExceptionHandler => {
                if let Some(plan) = self.frame_mut().unwind_plan.take() {
                    self.continue_plan(plan)?;
                } else if self.current_exception.is_some() {
                    return Err(Raise);
                }
            }
            Instr::AssertionFailed => {
                let message_value = self.pop();
                let message = if message_value == self.builtins.none {
                    String::new()
                } else {
                    self.str_of(message_value)?
                };
                let class = self.builtins.assertion_error;
                return Err(self.raise(class, message));
            }
            Instr::StartGenerator => self.start_generator(),
            Instr::SuspendGenerator => self.suspend_generator(),
            Instr::ResumeGenerator => self.resume_generator()?,
            Instr::LeaveGenerator => {
                let frame = self.pop_frame();
                self.stack.truncate(frame.stack_base);
                if let Some(generator) = frame.generator {
                    if let CellKind::Generator(r#gen) = self.heap.get_mut(generator) {
                        r#gen.state = GenState::Finished;
                    }
                }
                let class = self.builtins.stop_iteration;
                return Err(self.raise(class, ""));
            }
            Instr::LoopControlJump {
                region_count,
                target,
                ..
            } => {
                let plan = UnwindPlan {
                    regions_left: region_count,
                    action: PlanAction::Branch(target),
                };
                self.continue_plan(plan)?;
            }
            Instr::ReturnThroughFinally { region_count, .. } => {
                let value = self.pop();
                let plan = UnwindPlan {
                    regions_left: region_count,
                    action: PlanAction::Return(value),
                };
                self.continue_plan(plan)?;
            }
            Instr::ImportModule(name) => {
                let module = self.import_module(name)?;
                self.push(module);
            }
            Instr::ImportFrom(name) => {
                let module = self.peek(0);
                let value = match self.maybe_get_attr(module, name) {
                    Some(value) => value,
                    None => {
                        let text = self.names.text(name).to_owned();
                        let class = self.builtins.import_error;
                        return Err(self.raise(class, format!("cannot import name '{text}'")));
                    }
                };
                self.pop();
                self.push(value);
            }
            Instr::AssertStackDepth(depth) => {
                let base = self.frame().stack_base;
                debug_assert_eq!(
                    self.stack.len() - base,
                    depth as usize,
                    "operand stack depth mismatch at ip {ip}"
                );
            }
        }
        Ok(())
    }

    /// Overwrite an instruction in its block: the inline-cache rewrite.
    fn rewrite_instr(&mut self, block: CellId, ip: usize, instr: Instr) {
        let CellKind::Block(block) = self.heap.get_mut(block) else {
            panic!("rewrite target is not a block");
        };
        block.instrs[ip] = instr;
    }

    fn both_small_ints(&self) -> bool {
        self.peek(0).is_small_int() && self.peek(1).is_small_int()
    }

    fn fill_sequence(&mut self, id: CellId, count: usize) {
        let start = self.stack.len() - count;
        let values: Vec<Value> = self.stack[start..].to_vec();
        match self.heap.get_mut(id) {
            CellKind::Tuple(items) | CellKind::List(items) => *items = values,
            _ => panic!("fill_sequence on non-sequence"),
        }
        self.stack.truncate(start);
        self.push(Value::cell(id));
    }

    fn lexical_env(&mut self, hops: u16) -> Result<CellId, Raise> {
        let mut env = self
            .frame()
            .lexical_env()
            .expect("lexical access without environment");
        for _ in 0..hops {
            let CellKind::Env(data) = self.heap.get(env) else {
                panic!("lexical chain is not an environment");
            };
            env = data.parent.expect("lexical chain too short");
        }
        Ok(env)
    }

    fn load_global(&mut self, name: Name) -> Result<Value, Raise> {
        let module = self.frame().module;
        let uninit = self.builtins.uninitialized;
        if let Some(value) = get_own_attr(&self.heap, module, name) {
            if value != uninit {
                return Ok(value);
            }
        }
        let builtins_module = self.builtins.builtins_module;
        if builtins_module != module {
            if let Some(value) = get_own_attr(&self.heap, builtins_module, name) {
                if value != uninit {
                    return Ok(value);
                }
            }
        }
        let text = self.names.text(name).to_owned();
        let class = self.builtins.name_error;
        Err(self.raise(class, format!("name '{text}' is not defined")))
    }

    /// Continue (or start) a break/continue/return travelling through
    /// open regions.
    fn continue_plan(&mut self, mut plan: UnwindPlan) -> Result<(), Raise> {
        loop {
            if plan.regions_left == 0 {
                match plan.action {
                    PlanAction::Branch(target) => self.frame_mut().ip = target as usize,
                    PlanAction::Return(value) => {
                        let frame = self.pop_frame();
                        self.stack.truncate(frame.stack_base);
                        self.push(value);
                    }
                }
                return Ok(());
            }
            plan.regions_left -= 1;
            let region = self
                .frame_mut()
                .regions
                .pop()
                .expect("unwind plan outlived its regions");
            match region.kind {
                RegionKind::Catch => {}
                RegionKind::Finally => {
                    self.stack.truncate(region.stack_depth);
                    let frame = self.frame_mut();
                    frame.ip = region.handler as usize;
                    frame.unwind_plan = Some(plan);
                    return Ok(());
                }
            }
        }
    }

    // --- Calls ---

    /// Dispatch a call: the stack holds the target below `argc` values.
    fn do_call(&mut self, argc: usize) -> Result<(), Raise> {
        let target = self.peek(argc);
        let Some(id) = target.as_cell() else {
            let type_name = self.type_name(target).to_owned();
            let class = self.builtins.type_error;
            return Err(self.raise(class, format!("'{type_name}' object is not callable")));
        };
        match self.heap.get(id) {
            CellKind::Native(native) => {
                let func = native.func;
                let name = native.name;
                let min_args = native.min_args;
                let max_args = native.max_args;
                if argc < min_args || max_args.is_some_and(|max| argc > max) {
                    let class = self.builtins.type_error;
                    return Err(self.raise(
                        class,
                        format!("{name}() called with wrong number of arguments ({argc})"),
                    ));
                }
                let start = self.stack.len() - argc;
                let args: Vec<Value> = self.stack[start..].to_vec();
                let result = func(self, &args)?;
                self.stack.truncate(start - 1);
                self.push(result);
                Ok(())
            }
            CellKind::Function(_) => self.push_call_frame(id, argc),
            CellKind::Class(_) => {
                let start = self.stack.len() - argc;
                let args: Vec<Value> = self.stack[start..].to_vec();
                let result = self.instantiate(id, &args)?;
                self.stack.truncate(start - 1);
                self.push(result);
                Ok(())
            }
            other => {
                let type_name = other.kind_name().to_owned();
                let class = self.builtins.type_error;
                Err(self.raise(class, format!("'{type_name}' object is not callable")))
            }
        }
    }

    /// Bind arguments and push a frame for an interpreted function.
    fn push_call_frame(&mut self, function: CellId, argc: usize) -> Result<(), Raise> {
        let CellKind::Function(data) = self.heap.get(function) else {
            panic!("push_call_frame on non-function");
        };
        let name = data.name;
        let block = data.block;
        let param_count = data.params.len();
        let takes_rest = data.takes_rest;
        let positional = data.positional_count();
        let required = data.required_count();
        let defaults: Vec<Value> = data.defaults.clone();
        let env = data.env;
        let module = data.module;

        if argc < required || (!takes_rest && argc > positional) {
            let text = self.names.text(name).to_owned();
            let class = self.builtins.type_error;
            return Err(self.raise(
                class,
                format!("{text}() takes {required} arguments ({argc} given)"),
            ));
        }

        // Arguments and then the callee are replaced by the new frame's
        // parameter slots: supplied values, defaults, and a rest tuple.
        let args_start = self.stack.len() - argc;
        let mut params: Vec<Value> = Vec::with_capacity(param_count);
        for index in 0..positional {
            if index < argc {
                params.push(self.stack[args_start + index]);
            } else {
                params.push(defaults[index - (positional - defaults.len())]);
            }
        }
        let rest: Vec<Value> = if takes_rest && argc > positional {
            self.stack[args_start + positional..args_start + argc].to_vec()
        } else {
            Vec::new()
        };
        let rest_tuple = if takes_rest {
            Some(self.alloc(CellKind::Tuple(rest)))
        } else {
            None
        };

        self.stack.truncate(args_start - 1);
        let stack_base = self.stack.len();
        for &param in &params {
            self.push(param);
        }
        if let Some(rest_tuple) = rest_tuple {
            self.push(Value::cell(rest_tuple));
        }
        let frame = Frame::new(block, module, stack_base, env);
        self.push_frame(frame);
        Ok(())
    }

    /// Call a value synchronously, re-entering the dispatch loop for
    /// interpreted targets.
    pub fn call_sub(&mut self, target: Value, args: &[Value]) -> Result<Value, Raise> {
        let depth = self.stack.len();
        self.push(target);
        for &arg in args {
            self.push(arg);
        }
        let watermark = self.frames.len();
        if let Err(raise) = self.do_call(args.len()) {
            self.stack.truncate(depth);
            return Err(raise);
        }
        if self.frames.len() > watermark {
            if let Err(raise) = self.run(watermark) {
                self.stack.truncate(depth);
                return Err(raise);
            }
        }
        let result = self.pop();
        debug_assert_eq!(self.stack.len(), depth, "sub-call stack balance");
        Ok(result)
    }

    // --- Generators ---

    fn start_generator(&mut self) {
        let mut frame = self.pop_frame();
        let saved_stack: Vec<Value> = self.stack.split_off(frame.stack_base);
        frame.stack_base = 0;
        // The detached frame is unrooted until the generator cell holds
        // it, so this allocation must not trigger a collection.
        let generator = self.heap.alloc(CellKind::Generator(GeneratorData {
            state: GenState::Initial,
            frame: None,
            saved_stack,
        }));
        frame.generator = Some(generator);
        if let CellKind::Generator(r#gen) = self.heap.get_mut(generator) {
            r#gen.frame = Some(frame);
        }
        self.push(Value::cell(generator));
    }

    fn suspend_generator(&mut self) {
        let value = self.pop();
        let mut frame = self.pop_frame();
        let generator = frame.generator.expect("suspend outside a generator");
        let saved_stack: Vec<Value> = self.stack.split_off(frame.stack_base);
        frame.stack_base = 0;
        if let CellKind::Generator(r#gen) = self.heap.get_mut(generator) {
            r#gen.state = GenState::Suspended;
            r#gen.saved_stack = saved_stack;
            r#gen.frame = Some(frame);
        }
        self.push(value);
    }

    fn resume_generator(&mut self) -> Result<(), Raise> {
        let base = self.frame().stack_base;
        let self_value = self.stack[base];
        let Some(generator) = self_value.as_cell() else {
            let class = self.builtins.type_error;
            return Err(self.raise(class, "next() needs a generator"));
        };
        let state = match self.heap.get(generator) {
            CellKind::Generator(r#gen) => r#gen.state,
            _ => {
                let class = self.builtins.type_error;
                return Err(self.raise(class, "next() needs a generator"));
            }
        };
        match state {
            GenState::Running => {
                let class = self.builtins.value_error;
                Err(self.raise(class, "generator already executing"))
            }
            GenState::Finished => {
                let class = self.builtins.stop_iteration;
                Err(self.raise(class, ""))
            }
            GenState::Initial | GenState::Suspended => {
                let (mut frame, saved_stack) = {
                    let CellKind::Generator(r#gen) = self.heap.get_mut(generator) else {
                        unreachable!("checked above");
                    };
                    r#gen.state = GenState::Running;
                    (
                        r#gen.frame.take().expect("suspended generator has a frame"),
                        std::mem::take(&mut r#gen.saved_stack),
                    )
                };
                frame.stack_base = self.stack.len();
                for value in saved_stack {
                    self.push(value);
                }
                self.push_frame(frame);
                let none = self.builtins.none;
                self.push(none);
                Ok(())
            }
        }
    }

    // --- Classes ---

    fn make_class_from_frame(&mut self, name: Name) -> Result<(), Raise> {
        let env = self.frame().env.expect("class body uses an environment");
        let CellKind::Env(env_data) = self.heap.get(env) else {
            panic!("class frame environment is not an environment");
        };
        let env_layout = env_data.attrs.layout;
        let mut slots = env_data.attrs.slots.clone();

        let bases_name = self.names.well_known().bases;
        let bases_slot = layout::lookup_name(&self.heap, env_layout, bases_name)
            .expect("class body declares __bases__") as usize;
        let bases_value = slots[bases_slot];
        let default_bases = {
            let Some(bases_id) = bases_value.as_cell() else {
                let class = self.builtins.type_error;
                return Err(self.raise(class, "class bases must be a tuple"));
            };
            match self.heap.get(bases_id) {
                CellKind::Tuple(bases) => {
                    if bases.is_empty() {
                        true
                    } else {
                        for base in bases {
                            let is_class = base
                                .as_cell()
                                .is_some_and(|id| matches!(self.heap.get(id), CellKind::Class(_)));
                            if !is_class {
                                let class = self.builtins.type_error;
                                return Err(self.raise(class, "class bases must be classes"));
                            }
                        }
                        false
                    }
                }
                _ => {
                    let class = self.builtins.type_error;
                    return Err(self.raise(class, "class bases must be a tuple"));
                }
            }
        };
        if default_bases {
            let object = Value::cell(self.builtins.object);
            // Rooted immediately below through the class allocation path.
            let tuple = self.heap.alloc(CellKind::Tuple(vec![object]));
            slots[bases_slot] = Value::cell(tuple);
        }

        let class_name = self.names.text(name).to_owned();
        let empty_layout = self.builtins.empty_layout;
        let class = self.heap.alloc(CellKind::Class(crate::value::ClassData {
            name: class_name,
            attrs: crate::value::Attrs {
                layout: env_layout,
                slots,
            },
            instance_layout: empty_layout,
        }));
        self.push(Value::cell(class));
        Ok(())
    }

    /// Whether `class` is `base` or derives from it through `__bases__`.
    #[must_use]
    pub fn is_subclass(&self, class: CellId, base: CellId) -> bool {
        if class == base {
            return true;
        }
        let bases_name = self.names.well_known().bases;
        let Some(bases_value) = get_own_attr(&self.heap, class, bases_name) else {
            return false;
        };
        let Some(bases_id) = bases_value.as_cell() else {
            return false;
        };
        let CellKind::Tuple(bases) = self.heap.get(bases_id) else {
            return false;
        };
        let bases: Vec<Value> = bases.clone();
        bases
            .iter()
            .filter_map(|b| b.as_cell())
            .any(|b| self.is_subclass(b, base))
    }

    /// Turn the operand of `raise` into an exception instance.
    fn exception_from_value(&mut self, value: Value) -> Result<Value, Raise> {
        if let Some(id) = value.as_cell() {
            match self.heap.get(id) {
                CellKind::Exception(_) => return Ok(value),
                CellKind::Class(_) => {
                    if self.is_subclass(id, self.builtins.exception) {
                        return self.instantiate(id, &[]);
                    }
                }
                _ => {}
            }
        }
        let class = self.builtins.type_error;
        Err(self.raise(class, "exceptions must derive from Exception"))
    }

    /// Construct an instance of a class.
    pub fn instantiate(&mut self, class: CellId, args: &[Value]) -> Result<Value, Raise> {
        if let Some(value) = self.construct_builtin(class, args)? {
            return Ok(value);
        }
        if self.is_subclass(class, self.builtins.exception) {
            let message = match args.first() {
                Some(&value) => self.str_of(value)?,
                None => String::new(),
            };
            let (file, pos) = self.current_pos();
            let exception = self.alloc(CellKind::Exception(ExceptionData {
                class,
                message,
                pos,
                file,
            }));
            return Ok(Value::cell(exception));
        }

        let CellKind::Class(data) = self.heap.get(class) else {
            panic!("instantiate on non-class");
        };
        let instance_layout = data.instance_layout;
        let slot_count = layout::slot_count(&self.heap, instance_layout) as usize;
        let uninit = self.builtins.uninitialized;
        let instance = self.alloc(CellKind::Object(ObjectData {
            class,
            attrs: crate::value::Attrs {
                layout: instance_layout,
                slots: vec![uninit; slot_count],
            },
        }));
        let instance_value = Value::cell(instance);

        let init_name = self.names.well_known().init;
        let bases_name = self.names.well_known().bases;
        if let Some(init) = crate::value::lookup_on_class(&self.heap, class, init_name, bases_name)
        {
            let mut init_args = Vec::with_capacity(args.len() + 1);
            init_args.push(instance_value);
            init_args.extend_from_slice(args);
            self.call_sub(init, &init_args)?;
            // Record the settled layout as the hint for later instances.
            let settled = match self.heap.get(instance) {
                CellKind::Object(object) => object.attrs.layout,
                _ => instance_layout,
            };
            let empty = self.builtins.empty_layout;
            if instance_layout == empty && settled != empty {
                if let CellKind::Class(data) = self.heap.get_mut(class) {
                    data.instance_layout = settled;
                }
            }
        } else if !args.is_empty() {
            let name = self.type_name(instance_value).to_owned();
            let type_error = self.builtins.type_error;
            return Err(self.raise(type_error, format!("{name}() takes no arguments")));
        }
        Ok(instance_value)
    }

    // --- Imports ---

    fn import_module(&mut self, name: Name) -> Result<Value, Raise> {
        let text = self.names.text(name).to_owned();
        if let Some(&module) = self.modules.get(&text) {
            return Ok(Value::cell(module));
        }
        let mut candidates = Vec::new();
        if let Some(main_dir) = &self.main_dir {
            candidates.push(main_dir.join(format!("{text}.adr")));
        }
        if let Some(lib_dir) = &self.lib_dir {
            candidates.push(lib_dir.join(format!("{text}.adr")));
        }
        let Some((path, source)) = candidates
            .into_iter()
            .find_map(|p| std::fs::read_to_string(&p).ok().map(|s| (p, s)))
        else {
            let class = self.builtins.import_error;
            return Err(self.raise(class, format!("no module named '{text}'")));
        };

        let module = self.new_module(&text);
        self.modules.insert(text, module);
        let input = Input::new(path.display().to_string(), source);
        self.run_source(&input, module)?;
        Ok(Value::cell(module))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
