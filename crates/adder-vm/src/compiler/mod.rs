// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Compiler from the AST to bytecode blocks.
//!
//! Each block is compiled in two sub-phases: the definition-finding pass
//! (see `analysis`) decides the frame layout and whether a heap
//! environment is needed, then a single emission walk translates the
//! tree. Name references resolve at compile time to one of stack-local,
//! lexical-up-N or global; anything else is a compile error.

#[cfg(test)]
mod compiler_test;

use crate::analysis::{AnalysisError, Definitions, find_definitions, target_names};
use crate::ast::{Param, Syn, Syntax};
use crate::bytecode::{BlockData, Instr, LambdaSpec};
use crate::heap::CellId;
use crate::value::{CellKind, Name, layout, set_own_attr};
use crate::vm::Vm;
use adder_core::{IntLiteral, Pos};
use thiserror::Error;

/// Compile error; surfaces to the program as a `SyntaxError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {pos}")]
pub struct CompileError {
    /// Human-readable description.
    pub message: String,
    /// Position of the offending node.
    pub pos: Pos,
}

impl CompileError {
    fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl From<AnalysisError> for CompileError {
    fn from(error: AnalysisError) -> Self {
        Self {
            message: error.message,
            pos: error.pos,
        }
    }
}

/// Compile a module body against the given module object.
///
/// # Errors
///
/// Returns a compile error for unresolvable names, misplaced statements
/// and invalid `global`/`nonlocal` declarations.
pub fn compile_module(
    vm: &mut Vm,
    syntax: &Syntax,
    module: CellId,
    file: &str,
) -> Result<CellId, CompileError> {
    let mut compiler = Compiler {
        vm,
        module,
        file: file.to_owned(),
        scopes: Vec::new(),
    };
    compiler.build(ScopeKind::Module, &[], syntax)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Function,
    Lambda,
    Generator,
    Class,
    Comp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Loop,
    Finally,
    Assign,
    Delete,
    Plain,
}

struct Scope {
    kind: ScopeKind,
    layout: CellId,
    uses_env: bool,
    globals: Vec<Name>,
    block: BlockData,
    contexts: Vec<Context>,
    loop_head: u32,
    loop_region_depth: u16,
    break_sources: Vec<u32>,
    region_depth: u16,
    stack_depth: u32,
    class_name: Option<Name>,
}

struct Compiler<'vm> {
    vm: &'vm mut Vm,
    module: CellId,
    file: String,
    scopes: Vec<Scope>,
}

impl Compiler<'_> {
    fn cur(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("no active scope")
    }

    fn emit(&mut self, instr: Instr) -> u32 {
        self.cur().block.append(instr)
    }

    fn emit_const(&mut self, value: crate::value::Value) {
        let index = self.cur().block.add_const(value);
        self.emit(Instr::Const(index));
    }

    fn emit_none(&mut self) {
        let none = self.vm.builtins.none;
        self.emit_const(none);
    }

    fn intern(&mut self, text: &str) -> Name {
        self.vm.names.intern(text)
    }

    fn ctx(&mut self) -> Context {
        self.cur().contexts.last().copied().unwrap_or(Context::Plain)
    }

    fn in_loop(&mut self) -> bool {
        self.cur().contexts.contains(&Context::Loop)
    }

    /// Finally regions between the top of the context stack and the
    /// nearest enclosing loop.
    fn finally_count_in_loop(&mut self) -> u16 {
        let mut count = 0;
        for context in self.cur().contexts.iter().rev() {
            match context {
                Context::Finally => count += 1,
                Context::Loop => break,
                _ => {}
            }
        }
        count
    }

    /// Finally regions anywhere in the current scope.
    fn finally_count_in_scope(&mut self) -> u16 {
        let mut count = 0;
        for context in &self.cur().contexts {
            if *context == Context::Finally {
                count += 1;
            }
        }
        count
    }

    fn assert_depth(&mut self, delta: u32) {
        if cfg!(debug_assertions) {
            let depth = self.cur().stack_depth + delta;
            self.emit(Instr::AssertStackDepth(depth));
        }
    }

    // --- Block construction ---

    fn build(
        &mut self,
        kind: ScopeKind,
        param_names: &[Name],
        body: &Syntax,
    ) -> Result<CellId, CompileError> {
        let defs = find_definitions(body)?;
        self.enter_scope(kind, param_names, &defs, body.pos)?;
        self.emit_prologue(kind);
        self.compile_node(body)?;
        self.emit_epilogue(kind);
        Ok(self.finish_scope())
    }

    fn enter_scope(
        &mut self,
        kind: ScopeKind,
        param_names: &[Name],
        defs: &Definitions,
        pos: Pos,
    ) -> Result<(), CompileError> {
        let globals: Vec<Name> = defs.globals.iter().map(|n| self.intern(n)).collect();
        let nonlocals: Vec<Name> = defs.nonlocals.iter().map(|n| self.intern(n)).collect();
        let def_names: Vec<Name> = defs.names.iter().map(|n| self.intern(n)).collect();

        for &name in &nonlocals {
            if self.lookup_enclosing(name).is_none() {
                let text = self.vm.names.text(name).to_owned();
                return Err(CompileError::new(
                    format!("no binding for nonlocal '{text}'"),
                    pos,
                ));
            }
        }

        let mut frame_layout = self.vm.builtins.empty_layout;
        for &param in param_names {
            frame_layout = layout::add_name(&mut self.vm.heap, frame_layout, param);
        }
        for &name in &def_names {
            frame_layout = layout::maybe_add_name(&mut self.vm.heap, frame_layout, name);
        }

        if kind == ScopeKind::Module {
            // Module-level bindings live on the module object itself;
            // declare them up front so globals resolve at compile time.
            let uninit = self.vm.builtins.uninitialized;
            for &name in &def_names {
                if !crate::value::has_own_attr(&self.vm.heap, self.module, name) {
                    set_own_attr(&mut self.vm.heap, self.module, name, uninit);
                }
            }
        }

        let uses_env = (defs.has_nested || kind == ScopeKind::Class) && kind != ScopeKind::Module;
        let block = BlockData::new(
            self.file.clone(),
            frame_layout,
            param_names.len(),
            uses_env,
        );
        let slot_count = layout::slot_count(&self.vm.heap, frame_layout);
        let base_depth = if kind == ScopeKind::Module || uses_env {
            0
        } else {
            slot_count
        };
        self.scopes.push(Scope {
            kind,
            layout: frame_layout,
            uses_env,
            globals,
            block,
            contexts: Vec::new(),
            loop_head: 0,
            loop_region_depth: 0,
            break_sources: Vec::new(),
            region_depth: 0,
            stack_depth: base_depth,
            class_name: None,
        });
        Ok(())
    }

    fn emit_prologue(&mut self, kind: ScopeKind) {
        if kind != ScopeKind::Module {
            if self.cur().uses_env {
                self.emit(Instr::CreateEnv);
            } else {
                self.emit(Instr::InitStackLocals);
            }
        }
        if kind == ScopeKind::Generator {
            // On the initial call StartGenerator detaches the frame; the
            // Pop discards the value every resume pushes.
            self.emit(Instr::StartGenerator);
            self.emit(Instr::Pop);
        }
    }

    fn emit_epilogue(&mut self, kind: ScopeKind) {
        match kind {
            ScopeKind::Module => {
                if self.cur().block.instrs.last() != Some(&Instr::Return) {
                    self.emit(Instr::Return);
                }
            }
            ScopeKind::Function => {
                if self.cur().block.instrs.last() != Some(&Instr::Return) {
                    self.emit(Instr::Pop);
                    self.emit_none();
                    self.emit(Instr::Return);
                }
            }
            ScopeKind::Lambda => {
                self.emit(Instr::Return);
            }
            ScopeKind::Generator => {
                if self.cur().block.instrs.last() != Some(&Instr::LeaveGenerator) {
                    self.emit(Instr::Pop);
                    self.emit(Instr::LeaveGenerator);
                }
            }
            ScopeKind::Class => {
                let name = self.cur().class_name.expect("class scope has a name");
                self.emit(Instr::Pop);
                self.emit(Instr::MakeClassFromFrame(name));
                self.emit(Instr::Return);
            }
            ScopeKind::Comp => {
                // The comp builder emits its own Return.
            }
        }
    }

    fn finish_scope(&mut self) -> CellId {
        let scope = self.scopes.pop().expect("no active scope");
        self.vm.heap.alloc(CellKind::Block(scope.block))
    }

    // --- Name resolution ---

    fn lookup_local(&mut self, name: Name) -> Option<u16> {
        let is_module = self.scopes.len() == 1;
        let scope = self.scopes.last().expect("no active scope");
        if is_module || scope.uses_env {
            return None;
        }
        layout::lookup_name(&self.vm.heap, scope.layout, name)
            .map(|slot| u16::try_from(slot).expect("slot overflow"))
    }

    /// Resolve a name against enclosing environment scopes; returns the
    /// environment hop count.
    fn lookup_lexical(&mut self, name: Name) -> Option<u16> {
        if self.scopes.last().expect("scope").globals.contains(&name) {
            return None;
        }
        let mut hops: u16 = 0;
        let start = if self.scopes.last().expect("scope").uses_env {
            self.scopes.len() - 1
        } else {
            self.scopes.len().checked_sub(2)?
        };
        // Scope 0 is the module; its names are globals, not lexicals.
        for index in (1..=start).rev() {
            let scope = &self.scopes[index];
            if layout::has_name(&self.vm.heap, scope.layout, name) {
                return Some(hops);
            }
            if scope.uses_env {
                hops += 1;
            }
        }
        None
    }

    /// Resolve against enclosing scopes only, for `nonlocal` validation.
    fn lookup_enclosing(&mut self, name: Name) -> Option<u16> {
        let mut hops: u16 = 0;
        for index in (1..self.scopes.len()).rev() {
            let scope = &self.scopes[index];
            if layout::has_name(&self.vm.heap, scope.layout, name) {
                return Some(hops);
            }
            if scope.uses_env {
                hops += 1;
            }
        }
        None
    }

    fn lookup_global(&mut self, name: Name) -> bool {
        let is_module = self.scopes.len() == 1;
        if is_module && layout::has_name(&self.vm.heap, self.scopes[0].layout, name) {
            return true;
        }
        if crate::value::has_own_attr(&self.vm.heap, self.module, name) {
            return true;
        }
        let builtins = self.vm.builtins.builtins_module;
        if crate::value::has_own_attr(&self.vm.heap, builtins, name) {
            return true;
        }
        self.scopes
            .last()
            .expect("scope")
            .globals
            .contains(&name)
    }

    fn compile_name(&mut self, text: &str, pos: Pos) -> Result<(), CompileError> {
        let name = self.intern(text);
        match self.ctx() {
            Context::Assign => {
                if let Some(slot) = self.lookup_local(name) {
                    self.emit(Instr::SetStackLocal { name, slot });
                } else if let Some(frame) = self.lookup_lexical(name) {
                    self.emit(Instr::SetLexical { frame, name });
                } else if self.lookup_global(name) {
                    self.emit(Instr::SetGlobal(name));
                } else {
                    return Err(CompileError::new(
                        format!("name is not defined: {text}"),
                        pos,
                    ));
                }
            }
            Context::Delete => {
                if let Some(slot) = self.lookup_local(name) {
                    self.emit(Instr::DelStackLocal { name, slot });
                } else if let Some(frame) = self.lookup_lexical(name) {
                    self.emit(Instr::DelLexical { frame, name });
                } else if self.lookup_global(name) {
                    self.emit(Instr::DelGlobal(name));
                } else {
                    return Err(CompileError::new(
                        format!("name is not defined: {text}"),
                        pos,
                    ));
                }
                self.emit_none();
            }
            _ => {
                if let Some(slot) = self.lookup_local(name) {
                    self.emit(Instr::GetStackLocal { name, slot });
                } else if let Some(frame) = self.lookup_lexical(name) {
                    self.emit(Instr::GetLexical { frame, name });
                } else {
                    // Unknown names fall back to a runtime global lookup
                    // so builtins and late definitions resolve.
                    self.emit(Instr::GetGlobal(name));
                }
            }
        }
        Ok(())
    }

    // --- Helpers mirrored from the method-call lowering ---

    fn call_unary_method(&mut self, operand: &Syntax, method: Name) -> Result<(), CompileError> {
        self.plain(|c| c.compile_node(operand))?;
        self.emit(Instr::GetMethod(method));
        self.emit(Instr::CallMethod(0));
        Ok(())
    }

    fn call_binary_method(
        &mut self,
        left: &Syntax,
        right: &Syntax,
        method: Name,
    ) -> Result<(), CompileError> {
        self.plain(|c| c.compile_node(left))?;
        self.emit(Instr::GetMethod(method));
        self.plain(|c| c.compile_node(right))?;
        self.emit(Instr::CallMethod(1));
        Ok(())
    }

    /// Run `f` with a plain (non-target) context.
    fn plain(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        self.cur().contexts.push(Context::Plain);
        let result = f(self);
        self.cur().contexts.pop();
        result
    }

    fn with_context(
        &mut self,
        context: Context,
        f: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        self.cur().contexts.push(context);
        let result = f(self);
        self.cur().contexts.pop();
        result
    }

    // --- Emission ---

    #[allow(clippy::too_many_lines)]
    fn compile_node(&mut self, syntax: &Syntax) -> Result<(), CompileError> {
        self.cur().block.set_next_pos(syntax.pos);
        match &syntax.kind {
            Syn::Block(stmts) => {
                self.assert_depth(0);
                let mut first = true;
                for stmt in stmts {
                    if !first {
                        self.emit(Instr::Pop);
                    }
                    self.compile_node(stmt)?;
                    self.assert_depth(1);
                    first = false;
                }
                if first {
                    self.emit_none();
                }
            }
            Syn::Pass => self.emit_none(),
            Syn::Global(_) | Syn::NonLocal(_) => self.emit_none(),
            Syn::Int(literal) => {
                let value = self.vm.int_value(literal.clone());
                self.emit_const(value);
            }
            Syn::Float(value) => {
                let value = self.vm.heap.alloc(CellKind::Float(*value));
                self.emit_const(crate::value::Value::cell(value));
            }
            Syn::Str(text) => {
                let value = self.vm.heap.alloc(CellKind::Str(text.clone()));
                self.emit_const(crate::value::Value::cell(value));
            }
            Syn::Name(text) => self.compile_name(text, syntax.pos)?,
            Syn::ExprList(elements) => {
                if self.ctx() == Context::Assign || self.ctx() == Context::Delete {
                    return self.compile_target_list(elements);
                }
                for element in elements {
                    self.plain(|c| c.compile_node(element))?;
                }
                self.emit(Instr::Tuple(count16(elements.len(), syntax.pos)?));
            }
            Syn::TargetList(targets) => return self.compile_target_list(targets),
            Syn::List(elements) => {
                for element in elements {
                    self.plain(|c| c.compile_node(element))?;
                }
                self.emit(Instr::List(count16(elements.len(), syntax.pos)?));
            }
            Syn::Dict(entries) => {
                for (key, value) in entries {
                    self.plain(|c| c.compile_node(key))?;
                    self.plain(|c| c.compile_node(value))?;
                }
                self.emit(Instr::Dict(count16(entries.len(), syntax.pos)?));
            }
            Syn::Or { left, right } => {
                self.plain(|c| c.compile_node(left))?;
                let branch = self.emit(Instr::Or(0));
                self.plain(|c| c.compile_node(right))?;
                self.cur().block.branch_here(branch);
            }
            Syn::And { left, right } => {
                self.plain(|c| c.compile_node(left))?;
                let branch = self.emit(Instr::And(0));
                self.plain(|c| c.compile_node(right))?;
                self.cur().block.branch_here(branch);
            }
            Syn::Not { operand } => {
                self.plain(|c| c.compile_node(operand))?;
                self.emit(Instr::Not);
            }
            Syn::Unary { op, operand } => {
                let method = self.vm.names.well_known().unary_method(*op);
                self.call_unary_method(operand, method)?;
            }
            Syn::Binary { op, left, right } => {
                self.plain(|c| c.compile_node(left))?;
                self.plain(|c| c.compile_node(right))?;
                self.emit(Instr::BinaryOp(*op));
            }
            Syn::Compare { op, left, right } => {
                self.plain(|c| c.compile_node(left))?;
                self.plain(|c| c.compile_node(right))?;
                self.emit(Instr::CompareOp(*op));
            }
            Syn::In { left, right } => {
                self.plain(|c| c.compile_node(left))?;
                self.plain(|c| c.compile_node(right))?;
                self.emit(Instr::In);
            }
            Syn::Is { left, right } => {
                self.plain(|c| c.compile_node(left))?;
                self.plain(|c| c.compile_node(right))?;
                self.emit(Instr::Is);
            }
            Syn::Assign { target, value } => {
                self.plain(|c| c.compile_node(value))?;
                self.with_context(Context::Assign, |c| c.compile_node(target))?;
            }
            Syn::AugAssign { op, target, value } => {
                self.plain(|c| c.compile_node(target))?;
                self.plain(|c| c.compile_node(value))?;
                self.emit(Instr::AugUpdate(*op));
                self.with_context(Context::Assign, |c| c.compile_node(target))?;
                self.emit(Instr::Pop);
                self.emit_none();
            }
            Syn::Del { targets } => {
                self.with_context(Context::Delete, |c| c.compile_node(targets))?;
            }
            Syn::AttrRef { object, name } => {
                let name = self.intern(name);
                let context = self.ctx();
                self.plain(|c| c.compile_node(object))?;
                match context {
                    Context::Assign => {
                        self.emit(Instr::SetAttr(name));
                    }
                    Context::Delete => {
                        self.emit(Instr::DelAttr(name));
                        self.emit_none();
                    }
                    _ => {
                        self.emit(Instr::GetAttr(name));
                    }
                }
            }
            Syn::Subscript { object, index } => match self.ctx() {
                Context::Assign => {
                    let setitem = self.vm.names.well_known().setitem;
                    self.plain(|c| c.compile_node(object))?;
                    self.emit(Instr::GetMethod(setitem));
                    self.plain(|c| c.compile_node(index))?;
                    self.emit(Instr::Dup(3));
                    self.emit(Instr::CallMethod(2));
                    self.emit(Instr::Swap);
                    self.emit(Instr::Pop);
                }
                Context::Delete => {
                    let delitem = self.vm.names.well_known().delitem;
                    self.call_binary_method(object, index, delitem)?;
                }
                _ => {
                    let getitem = self.vm.names.well_known().getitem;
                    self.call_binary_method(object, index, getitem)?;
                }
            },
            Syn::Slice {
                lower,
                upper,
                stride,
            } => {
                for bound in [lower, upper, stride] {
                    match bound {
                        Some(expr) => self.plain(|c| c.compile_node(expr))?,
                        None => self.emit_none(),
                    }
                }
                self.emit(Instr::Slice);
            }
            Syn::Call { func, args } => {
                let method_call = matches!(func.kind, Syn::AttrRef { .. });
                if let Syn::AttrRef { object, name } = &func.kind {
                    let name = self.intern(name);
                    self.plain(|c| c.compile_node(object))?;
                    self.emit(Instr::GetMethod(name));
                } else {
                    self.plain(|c| c.compile_node(func))?;
                }
                for arg in args {
                    self.plain(|c| c.compile_node(arg))?;
                }
                let count = count16(args.len(), syntax.pos)?;
                if method_call {
                    self.emit(Instr::CallMethod(count));
                } else {
                    self.emit(Instr::Call(count));
                }
            }
            Syn::Cond { cond, cons, alt } => {
                self.plain(|c| c.compile_node(cond))?;
                let alt_branch = self.emit(Instr::BranchIfFalse(0));
                self.plain(|c| c.compile_node(cons))?;
                let end_branch = self.emit(Instr::BranchAlways(0));
                self.cur().block.branch_here(alt_branch);
                self.plain(|c| c.compile_node(alt))?;
                self.cur().block.branch_here(end_branch);
            }
            Syn::If {
                branches,
                else_suite,
            } => {
                let mut end_branches = Vec::new();
                let mut last_cond_failed = None;
                for (index, branch) in branches.iter().enumerate() {
                    if let Some(source) = last_cond_failed {
                        self.cur().block.branch_here(source);
                    }
                    self.plain(|c| c.compile_node(&branch.cond))?;
                    last_cond_failed = Some(self.emit(Instr::BranchIfFalse(0)));
                    self.compile_node(&branch.suite)?;
                    self.emit(Instr::Pop);
                    if else_suite.is_some() || index != branches.len() - 1 {
                        end_branches.push(self.emit(Instr::BranchAlways(0)));
                    }
                }
                if let Some(source) = last_cond_failed {
                    self.cur().block.branch_here(source);
                }
                if let Some(else_suite) = else_suite {
                    self.compile_node(else_suite)?;
                    self.emit(Instr::Pop);
                }
                for source in end_branches {
                    self.cur().block.branch_here(source);
                }
                self.emit_none();
            }
            Syn::While {
                cond,
                suite,
                else_suite,
            } => self.compile_while(cond, suite, else_suite.as_deref())?,
            Syn::For {
                targets,
                iter,
                suite,
                else_suite,
            } => self.compile_for(targets, iter, suite, else_suite.as_deref())?,
            Syn::Lambda { params, body } => {
                let lambda_name = self.intern("(lambda)");
                let block = {
                    let names = self.param_name_list(params);
                    self.build(ScopeKind::Lambda, &names, body)?
                };
                self.emit_lambda(lambda_name, params, block, false)?;
            }
            Syn::ListComp {
                expr,
                target,
                iter,
                conds,
            } => self.compile_list_comp(expr, target, iter, conds, syntax.pos)?,
            Syn::Def {
                name,
                params,
                suite,
                is_generator,
            } => {
                let def_name = self.intern(name);
                let kind = if *is_generator {
                    ScopeKind::Generator
                } else {
                    ScopeKind::Function
                };
                let block = {
                    let names = self.param_name_list(params);
                    self.build(kind, &names, suite)?
                };
                self.emit_lambda(def_name, params, block, *is_generator)?;
                self.bind_definition(name, syntax.pos)?;
            }
            Syn::ClassDef { name, bases, suite } => {
                let class_name = self.intern(name);
                let bases_param = self.vm.names.well_known().bases;
                let defs = find_definitions(suite)?;
                self.enter_scope(ScopeKind::Class, &[bases_param], &defs, syntax.pos)?;
                self.cur().class_name = Some(class_name);
                self.emit_prologue(ScopeKind::Class);
                self.compile_node(suite)?;
                self.emit_epilogue(ScopeKind::Class);
                let block = self.finish_scope();
                let block_index = self.cur().block.add_nested(block);
                let lambda_index = self.cur().block.add_lambda(LambdaSpec {
                    name: class_name,
                    params: vec![bases_param],
                    block_index,
                    default_count: 0,
                    takes_rest: false,
                    is_generator: false,
                });
                self.emit(Instr::Lambda(lambda_index));
                for base in bases {
                    self.plain(|c| c.compile_node(base))?;
                }
                self.emit(Instr::Tuple(count16(bases.len(), syntax.pos)?));
                self.emit(Instr::Call(1));
                self.bind_definition(name, syntax.pos)?;
            }
            Syn::Return(value) => {
                let scope_kind = self.cur().kind;
                match scope_kind {
                    ScopeKind::Class => {
                        return Err(CompileError::new(
                            "return statement not allowed in class body",
                            syntax.pos,
                        ));
                    }
                    ScopeKind::Generator => {
                        if value.is_some() {
                            return Err(CompileError::new(
                                "'return' with argument inside generator",
                                syntax.pos,
                            ));
                        }
                        self.emit(Instr::LeaveGenerator);
                    }
                    _ => {
                        match value {
                            Some(value) => self.plain(|c| c.compile_node(value))?,
                            None => self.emit_none(),
                        }
                        let region_count = self.cur().region_depth;
                        if region_count > 0 {
                            let finally_count = self.finally_count_in_scope();
                            self.emit(Instr::ReturnThroughFinally {
                                finally_count,
                                region_count,
                            });
                        } else {
                            self.emit(Instr::Return);
                        }
                    }
                }
            }
            Syn::Raise(value) => {
                self.plain(|c| c.compile_node(value))?;
                self.emit(Instr::Raise);
            }
            Syn::Yield(value) => {
                if self.cur().kind != ScopeKind::Generator {
                    return Err(CompileError::new("'yield' outside generator", syntax.pos));
                }
                self.plain(|c| c.compile_node(value))?;
                self.emit(Instr::SuspendGenerator);
            }
            Syn::Break => {
                if !self.in_loop() {
                    return Err(CompileError::new("'break' outside loop", syntax.pos));
                }
                let finally_count = self.finally_count_in_loop();
                let region_count = self.cur().region_depth - self.cur().loop_region_depth;
                let source = self.emit(Instr::LoopControlJump {
                    finally_count,
                    region_count,
                    target: 0,
                });
                self.cur().break_sources.push(source);
            }
            Syn::Continue => {
                if !self.in_loop() {
                    return Err(CompileError::new("'continue' outside loop", syntax.pos));
                }
                let finally_count = self.finally_count_in_loop();
                let region_count = self.cur().region_depth - self.cur().loop_region_depth;
                let target = self.cur().loop_head;
                self.emit(Instr::LoopControlJump {
                    finally_count,
                    region_count,
                    target,
                });
            }
            Syn::Assert { cond, message } => {
                self.plain(|c| c.compile_node(cond))?;
                let end_branch = self.emit(Instr::BranchIfTrue(0));
                match message {
                    Some(message) => {
                        let str_method = self.vm.names.well_known().str_;
                        self.plain(|c| c.compile_node(message))?;
                        self.emit(Instr::GetMethod(str_method));
                        self.emit(Instr::CallMethod(0));
                    }
                    None => self.emit_none(),
                }
                self.emit(Instr::AssertionFailed);
                self.cur().block.branch_here(end_branch);
                self.emit_none();
            }
            Syn::Try {
                suite,
                excepts,
                else_suite,
                finally_suite,
            } => self.compile_try(suite, excepts, else_suite.as_deref(), finally_suite.as_deref())?,
            Syn::Import(names) => {
                let mut first = true;
                for name in names {
                    if !first {
                        self.emit(Instr::Pop);
                    }
                    let interned = self.intern(name);
                    self.emit(Instr::ImportModule(interned));
                    self.bind_definition(name, syntax.pos)?;
                    first = false;
                }
            }
            Syn::From { module, names } => {
                let module_name = self.intern(module);
                self.emit(Instr::ImportModule(module_name));
                for name in names {
                    let interned = self.intern(name);
                    self.emit(Instr::Dup(0));
                    self.emit(Instr::ImportFrom(interned));
                    self.bind_definition(name, syntax.pos)?;
                    self.emit(Instr::Pop);
                }
            }
        }
        Ok(())
    }

    /// Bind the value on top of the stack to a definition name.
    fn bind_definition(&mut self, text: &str, pos: Pos) -> Result<(), CompileError> {
        let name = self.intern(text);
        if let Some(slot) = self.lookup_local(name) {
            self.emit(Instr::SetStackLocal { name, slot });
        } else if let Some(frame) = self.lookup_lexical(name) {
            self.emit(Instr::SetLexical { frame, name });
        } else if self.lookup_global(name) {
            self.emit(Instr::SetGlobal(name));
        } else {
            return Err(CompileError::new(
                format!("name is not defined: {text}"),
                pos,
            ));
        }
        Ok(())
    }

    fn param_name_list(&mut self, params: &[Param]) -> Vec<Name> {
        params.iter().map(|p| self.intern(&p.name)).collect()
    }

    fn emit_lambda(
        &mut self,
        def_name: Name,
        params: &[Param],
        block: CellId,
        is_generator: bool,
    ) -> Result<(), CompileError> {
        let mut default_count: u16 = 0;
        for param in params {
            if let Some(default) = &param.default {
                default_count += 1;
                self.plain(|c| c.compile_node(default))?;
            }
        }
        let takes_rest = params.last().is_some_and(|p| p.takes_rest);
        let names = self.param_name_list(params);
        let block_index = self.cur().block.add_nested(block);
        let lambda_index = self.cur().block.add_lambda(LambdaSpec {
            name: def_name,
            params: names,
            block_index,
            default_count,
            takes_rest,
            is_generator,
        });
        self.emit(Instr::Lambda(lambda_index));
        Ok(())
    }

    fn compile_target_list(&mut self, targets: &[Syntax]) -> Result<(), CompileError> {
        let context = self.ctx();
        if context == Context::Assign {
            let wk = self.vm.names.well_known();
            let (len_name, iter_name, next_name) = (wk.len, wk.iter, wk.next);
            // Check the length first: unpacking a wrong-sized value is a
            // ValueError before any target is written.
            self.emit(Instr::Dup(0));
            self.emit(Instr::GetMethod(len_name));
            self.emit(Instr::CallMethod(0));
            let expected = i32::try_from(targets.len()).expect("target list too long");
            self.emit_const(crate::value::Value::small_int(expected));
            self.emit(Instr::CompareOp(crate::ast::CompareOp::Eq));
            let ok_branch = self.emit(Instr::BranchIfTrue(0));
            let value_error = crate::value::Value::cell(self.vm.builtins.value_error);
            self.emit_const(value_error);
            let message = self
                .vm
                .heap
                .alloc(CellKind::Str(String::from("wrong number of values to unpack")));
            self.emit_const(crate::value::Value::cell(message));
            self.emit(Instr::Call(1));
            self.emit(Instr::Raise);
            self.cur().block.branch_here(ok_branch);

            // Fetch exactly N elements off a fresh iterator.
            self.emit(Instr::GetMethod(iter_name));
            self.emit(Instr::CallMethod(0));
            self.emit(Instr::GetMethod(next_name));
            self.cur().stack_depth += 2;
            for (index, target) in targets.iter().enumerate() {
                self.emit(Instr::IteratorNext);
                let ok_branch = self.emit(Instr::BranchIfTrue(0));
                self.emit_none();
                self.emit(Instr::AssertionFailed);
                self.cur().block.branch_here(ok_branch);
                self.compile_node(target)?;
                if index != targets.len() - 1 {
                    self.emit(Instr::Pop);
                }
            }
            self.emit(Instr::Pop);
            self.emit(Instr::Pop);
            self.emit(Instr::Pop);
            self.cur().stack_depth -= 2;
        } else {
            for (index, target) in targets.iter().enumerate() {
                self.compile_node(target)?;
                if index != targets.len() - 1 {
                    self.emit(Instr::Pop);
                }
            }
        }
        Ok(())
    }

    fn compile_while(
        &mut self,
        cond: &Syntax,
        suite: &Syntax,
        else_suite: Option<&Syntax>,
    ) -> Result<(), CompileError> {
        let loop_head = self.cur().block.next_index();
        let saved_head = std::mem::replace(&mut self.cur().loop_head, loop_head);
        let saved_breaks = std::mem::take(&mut self.cur().break_sources);
        let region_depth = self.cur().region_depth;
        let saved_loop_region = std::mem::replace(&mut self.cur().loop_region_depth, region_depth);

        self.plain(|c| c.compile_node(cond))?;
        let exit_branch = self.emit(Instr::BranchIfFalse(0));
        self.with_context(Context::Loop, |c| {
            c.compile_node(suite)?;
            c.emit(Instr::Pop);
            Ok(())
        })?;
        self.emit(Instr::BranchAlways(loop_head));
        self.cur().block.branch_here(exit_branch);
        if let Some(else_suite) = else_suite {
            self.compile_node(else_suite)?;
            self.emit(Instr::Pop);
        }
        self.set_break_targets();
        self.cur().loop_head = saved_head;
        self.cur().break_sources = saved_breaks;
        self.cur().loop_region_depth = saved_loop_region;
        self.emit_none();
        Ok(())
    }

    fn compile_for(
        &mut self,
        targets: &Syntax,
        iter: &Syntax,
        suite: &Syntax,
        else_suite: Option<&Syntax>,
    ) -> Result<(), CompileError> {
        let wk = self.vm.names.well_known();
        let (iter_name, next_name) = (wk.iter, wk.next);

        self.plain(|c| c.compile_node(iter))?;
        self.emit(Instr::GetMethod(iter_name));
        self.emit(Instr::CallMethod(0));
        self.emit(Instr::GetMethod(next_name));
        self.cur().stack_depth += 2;

        let loop_head = self.cur().block.next_index();
        let saved_head = std::mem::replace(&mut self.cur().loop_head, loop_head);
        let saved_breaks = std::mem::take(&mut self.cur().break_sources);
        let region_depth = self.cur().region_depth;
        let saved_loop_region = std::mem::replace(&mut self.cur().loop_region_depth, region_depth);

        self.emit(Instr::IteratorNext);
        let exit_branch = self.emit(Instr::BranchIfFalse(0));

        self.with_context(Context::Assign, |c| c.compile_node(targets))?;
        self.emit(Instr::Pop);

        self.with_context(Context::Loop, |c| {
            c.compile_node(suite)?;
            c.emit(Instr::Pop);
            Ok(())
        })?;
        self.emit(Instr::BranchAlways(loop_head));

        self.cur().block.branch_here(exit_branch);
        self.emit(Instr::Pop);
        if let Some(else_suite) = else_suite {
            self.compile_node(else_suite)?;
            self.emit(Instr::Pop);
        }
        self.set_break_targets();
        self.cur().loop_head = saved_head;
        self.cur().break_sources = saved_breaks;
        self.cur().loop_region_depth = saved_loop_region;
        self.emit(Instr::Pop);
        self.emit(Instr::Pop);
        self.cur().stack_depth -= 2;
        self.emit_none();
        Ok(())
    }

    fn set_break_targets(&mut self) {
        let sources = std::mem::take(&mut self.cur().break_sources);
        let target = self.cur().block.next_index();
        for source in sources {
            self.cur().block.patch_target(source, target);
        }
    }

    fn compile_try(
        &mut self,
        suite: &Syntax,
        excepts: &[crate::ast::Except],
        else_suite: Option<&Syntax>,
        finally_suite: Option<&Syntax>,
    ) -> Result<(), CompileError> {
        let finally_branch = if finally_suite.is_some() {
            self.cur().contexts.push(Context::Finally);
            self.cur().region_depth += 1;
            Some(self.emit(Instr::EnterFinallyRegion(0)))
        } else {
            None
        };

        if excepts.is_empty() {
            self.compile_node(suite)?;
            self.emit(Instr::Pop);
        } else {
            self.compile_try_catch(suite, excepts, else_suite)?;
        }

        if let Some(finally_suite) = finally_suite {
            self.emit(Instr::LeaveFinallyRegion);
            self.cur().region_depth -= 1;
            // The finally suite itself runs with the region closed.
            let popped = self.cur().contexts.pop();
            debug_assert_eq!(popped, Some(Context::Finally));
            let source = finally_branch.expect("finally branch recorded");
            self.cur().block.branch_here(source);
            self.compile_node(finally_suite)?;
            self.emit(Instr::Pop);
            self.emit(Instr::FinishExceptionHandler);
        }
        self.emit_none();
        Ok(())
    }

    fn compile_try_catch(
        &mut self,
        suite: &Syntax,
        excepts: &[crate::ast::Except],
        else_suite: Option<&Syntax>,
    ) -> Result<(), CompileError> {
        let mut handler_branch = self.emit(Instr::EnterCatchRegion(0));
        self.cur().region_depth += 1;
        self.compile_node(suite)?;
        self.emit(Instr::Pop);
        self.emit(Instr::LeaveCatchRegion);
        self.cur().region_depth -= 1;
        let suite_end_branch = self.emit(Instr::BranchAlways(0));

        let mut fully_handled = false;
        let mut except_end_branches = Vec::new();
        for except in excepts {
            debug_assert!(!fully_handled, "parser rejects handlers after a bare except");
            self.cur().block.branch_here(handler_branch);
            if let Some(class) = &except.class {
                self.plain(|c| c.compile_node(class))?;
                self.emit(Instr::MatchCurrentException);
                handler_branch = self.emit(Instr::BranchIfFalse(0));
                if let Some(as_target) = &except.as_target {
                    self.with_context(Context::Assign, |c| c.compile_node(as_target))?;
                }
                self.emit(Instr::Pop);
            } else {
                debug_assert!(except.as_target.is_none());
                fully_handled = true;
                self.emit(Instr::HandleCurrentException);
            }
            self.compile_node(&except.suite)?;
            self.emit(Instr::Pop);
            except_end_branches.push(self.emit(Instr::BranchAlways(0)));
        }

        self.cur().block.branch_here(suite_end_branch);
        if let Some(else_suite) = else_suite {
            self.compile_node(else_suite)?;
            self.emit(Instr::Pop);
        }
        if !fully_handled {
            self.cur().block.branch_here(handler_branch);
        }
        self.emit(Instr::FinishExceptionHandler);
        for source in except_end_branches {
            self.cur().block.branch_here(source);
        }
        Ok(())
    }

    fn compile_list_comp(
        &mut self,
        expr: &Syntax,
        target: &Syntax,
        iter: &Syntax,
        conds: &[Syntax],
        pos: Pos,
    ) -> Result<(), CompileError> {
        let comp_name = self.intern("(listcomp)");
        let param = self.intern(".0");
        let append = self.intern("append");
        let wk = self.vm.names.well_known();
        let (iter_name, next_name) = (wk.iter, wk.next);

        // The comp body is its own scope; the target names are its locals.
        let mut defs = Definitions {
            names: target_names(target),
            ..Definitions::default()
        };
        defs.has_nested = find_definitions(expr)?.has_nested
            || conds
                .iter()
                .map(find_definitions)
                .collect::<Result<Vec<_>, _>>()?
                .iter()
                .any(|d| d.has_nested);

        self.enter_scope(ScopeKind::Comp, &[param], &defs, pos)?;
        self.emit_prologue(ScopeKind::Comp);
        self.emit(Instr::List(0));
        self.compile_name(".0", pos)?;
        self.emit(Instr::GetMethod(iter_name));
        self.emit(Instr::CallMethod(0));
        self.emit(Instr::GetMethod(next_name));
        let loop_head = self.cur().block.next_index();
        self.emit(Instr::IteratorNext);
        let exit_branch = self.emit(Instr::BranchIfFalse(0));
        self.with_context(Context::Assign, |c| c.compile_node(target))?;
        self.emit(Instr::Pop);
        for cond in conds {
            self.plain(|c| c.compile_node(cond))?;
            self.emit(Instr::BranchIfFalse(loop_head));
        }
        self.plain(|c| c.compile_node(expr))?;
        self.emit(Instr::Dup(3));
        self.emit(Instr::GetMethod(append));
        self.emit(Instr::Dup(2));
        self.emit(Instr::CallMethod(1));
        self.emit(Instr::Pop);
        self.emit(Instr::Pop);
        self.emit(Instr::BranchAlways(loop_head));
        self.cur().block.branch_here(exit_branch);
        self.emit(Instr::Pop);
        self.emit(Instr::Pop);
        self.emit(Instr::Pop);
        self.emit(Instr::Return);
        let block = self.finish_scope();

        // Call the comp block with the iterable, evaluated here.
        let block_index = self.cur().block.add_nested(block);
        let lambda_index = self.cur().block.add_lambda(LambdaSpec {
            name: comp_name,
            params: vec![param],
            block_index,
            default_count: 0,
            takes_rest: false,
            is_generator: false,
        });
        self.emit(Instr::Lambda(lambda_index));
        self.plain(|c| c.compile_node(iter))?;
        self.emit(Instr::Call(1));
        Ok(())
    }
}

impl Vm {
    /// A value for an integer literal: immediate when it fits, heap
    /// otherwise.
    pub fn int_value(&mut self, literal: IntLiteral) -> crate::value::Value {
        match literal {
            IntLiteral::Small(small) => crate::value::Value::small_int(small),
            IntLiteral::Big(big) => crate::value::Value::cell(self.heap.alloc(CellKind::Int(big))),
        }
    }
}

fn count16(count: usize, pos: Pos) -> Result<u16, CompileError> {
    u16::try_from(count).map_err(|_| CompileError::new("too many elements", pos))
}
