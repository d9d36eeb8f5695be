// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-scope definition finding.
//!
//! Walks a function body without descending into nested function, lambda
//! or class bodies and accumulates the names the scope binds: assignment
//! targets, `def` and `class` names, imports, and `for`/`except` targets.
//! `global` and `nonlocal` declarations are validated here. The pass also
//! reports whether the body contains nested scopes, which forces the
//! frame onto a heap environment so inner closures can reach it.

#[cfg(test)]
mod analysis_test;

use crate::ast::{Syn, Syntax};
use adder_core::Pos;
use thiserror::Error;

/// Scope-analysis error; surfaces as a `SyntaxError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {pos}")]
pub struct AnalysisError {
    /// Human-readable description.
    pub message: String,
    /// Position of the offending statement.
    pub pos: Pos,
}

/// What a scope binds.
#[derive(Debug, Default)]
pub struct Definitions {
    /// Names bound in this scope, in first-appearance order.
    pub names: Vec<String>,
    /// Names declared `global`.
    pub globals: Vec<String>,
    /// Names declared `nonlocal`.
    pub nonlocals: Vec<String>,
    /// Whether the body contains nested functions, lambdas, classes or
    /// comprehensions.
    pub has_nested: bool,
}

/// Find the definitions of one scope body.
///
/// # Errors
///
/// Returns an error when a name is declared both `global` and
/// `nonlocal`, or declared after it was already assigned in the scope.
pub fn find_definitions(body: &Syntax) -> Result<Definitions, AnalysisError> {
    let mut finder = Finder {
        defs: Definitions::default(),
        in_target: false,
    };
    finder.visit(body)?;
    Ok(finder.defs)
}

/// Collect the names a target expression binds, in order.
#[must_use]
pub fn target_names(target: &Syntax) -> Vec<String> {
    let mut names = Vec::new();
    collect_target_names(target, &mut names);
    names
}

fn collect_target_names(target: &Syntax, names: &mut Vec<String>) {
    match &target.kind {
        Syn::Name(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Syn::TargetList(targets) | Syn::ExprList(targets) => {
            for target in targets {
                collect_target_names(target, names);
            }
        }
        _ => {}
    }
}

struct Finder {
    defs: Definitions,
    in_target: bool,
}

impl Finder {
    fn add_name(&mut self, name: &str) {
        if self.defs.globals.iter().any(|n| n == name)
            || self.defs.nonlocals.iter().any(|n| n == name)
            || self.defs.names.iter().any(|n| n == name)
        {
            return;
        }
        self.defs.names.push(name.to_owned());
    }

    fn add_declarations(
        &mut self,
        pos: Pos,
        names: &[String],
        nonlocal: bool,
    ) -> Result<(), AnalysisError> {
        for name in names {
            if self.defs.names.iter().any(|n| n == name) {
                return Err(AnalysisError {
                    message: format!("name '{name}' is assigned to before declaration"),
                    pos,
                });
            }
            let others = if nonlocal {
                &self.defs.globals
            } else {
                &self.defs.nonlocals
            };
            if others.iter().any(|n| n == name) {
                return Err(AnalysisError {
                    message: format!("name '{name}' is nonlocal and global"),
                    pos,
                });
            }
            if nonlocal {
                self.defs.nonlocals.push(name.clone());
            } else {
                self.defs.globals.push(name.clone());
            }
        }
        Ok(())
    }

    fn visit_target(&mut self, target: &Syntax) -> Result<(), AnalysisError> {
        let was = self.in_target;
        self.in_target = true;
        self.visit(target)?;
        self.in_target = was;
        Ok(())
    }

    fn visit(&mut self, syntax: &Syntax) -> Result<(), AnalysisError> {
        match &syntax.kind {
            Syn::Name(name) => {
                if self.in_target {
                    self.add_name(name);
                }
            }
            Syn::Assign { target, value } => {
                self.visit_target(target)?;
                self.visit(value)?;
            }
            Syn::AugAssign { target, value, .. } => {
                self.visit_target(target)?;
                self.visit(value)?;
            }
            Syn::Def { name, .. } => {
                self.add_name(name);
                self.defs.has_nested = true;
            }
            Syn::ClassDef { name, bases, .. } => {
                self.add_name(name);
                for base in bases {
                    self.visit(base)?;
                }
                self.defs.has_nested = true;
            }
            Syn::Lambda { .. } => self.defs.has_nested = true,
            Syn::ListComp { .. } => self.defs.has_nested = true,
            Syn::Import(names) => {
                for name in names {
                    self.add_name(name);
                }
            }
            Syn::From { names, .. } => {
                for name in names {
                    self.add_name(name);
                }
            }
            Syn::Global(names) => self.add_declarations(syntax.pos, names, false)?,
            Syn::NonLocal(names) => self.add_declarations(syntax.pos, names, true)?,
            Syn::Block(stmts) => {
                for stmt in stmts {
                    self.visit(stmt)?;
                }
            }
            Syn::ExprList(elements) | Syn::List(elements) | Syn::TargetList(elements) => {
                for element in elements {
                    self.visit(element)?;
                }
            }
            Syn::Dict(entries) => {
                for (key, value) in entries {
                    self.visit(key)?;
                    self.visit(value)?;
                }
            }
            Syn::Binary { left, right, .. }
            | Syn::Compare { left, right, .. }
            | Syn::And { left, right }
            | Syn::Or { left, right }
            | Syn::In { left, right }
            | Syn::Is { left, right } => {
                self.visit(left)?;
                self.visit(right)?;
            }
            Syn::Not { operand } | Syn::Unary { operand, .. } => self.visit(operand)?,
            Syn::AttrRef { object, .. } => {
                // The attribute itself binds nothing, even in targets.
                let was = self.in_target;
                self.in_target = false;
                self.visit(object)?;
                self.in_target = was;
            }
            Syn::Subscript { object, index } => {
                let was = self.in_target;
                self.in_target = false;
                self.visit(object)?;
                self.visit(index)?;
                self.in_target = was;
            }
            Syn::Slice {
                lower,
                upper,
                stride,
            } => {
                for bound in [lower, upper, stride].into_iter().flatten() {
                    self.visit(bound)?;
                }
            }
            Syn::Call { func, args } => {
                self.visit(func)?;
                for arg in args {
                    self.visit(arg)?;
                }
            }
            Syn::Cond { cond, cons, alt } => {
                self.visit(cond)?;
                self.visit(cons)?;
                self.visit(alt)?;
            }
            Syn::If {
                branches,
                else_suite,
            } => {
                for branch in branches {
                    self.visit(&branch.cond)?;
                    self.visit(&branch.suite)?;
                }
                if let Some(else_suite) = else_suite {
                    self.visit(else_suite)?;
                }
            }
            Syn::While {
                cond,
                suite,
                else_suite,
            } => {
                self.visit(cond)?;
                self.visit(suite)?;
                if let Some(else_suite) = else_suite {
                    self.visit(else_suite)?;
                }
            }
            Syn::For {
                targets,
                iter,
                suite,
                else_suite,
            } => {
                self.visit_target(targets)?;
                self.visit(iter)?;
                self.visit(suite)?;
                if let Some(else_suite) = else_suite {
                    self.visit(else_suite)?;
                }
            }
            Syn::Try {
                suite,
                excepts,
                else_suite,
                finally_suite,
            } => {
                self.visit(suite)?;
                for except in excepts {
                    if let Some(class) = &except.class {
                        self.visit(class)?;
                    }
                    if let Some(as_target) = &except.as_target {
                        self.visit_target(as_target)?;
                    }
                    self.visit(&except.suite)?;
                }
                if let Some(else_suite) = else_suite {
                    self.visit(else_suite)?;
                }
                if let Some(finally_suite) = finally_suite {
                    self.visit(finally_suite)?;
                }
            }
            Syn::Return(value) => {
                if let Some(value) = value {
                    self.visit(value)?;
                }
            }
            Syn::Raise(value) | Syn::Yield(value) => self.visit(value)?,
            Syn::Assert { cond, message } => {
                self.visit(cond)?;
                if let Some(message) = message {
                    self.visit(message)?;
                }
            }
            Syn::Del { targets } => self.visit(targets)?,
            Syn::Pass | Syn::Break | Syn::Continue | Syn::Int(_) | Syn::Float(_) | Syn::Str(_) => {}
        }
        Ok(())
    }
}
