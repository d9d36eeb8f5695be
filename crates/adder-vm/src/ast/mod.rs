// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Abstract syntax tree for Adder source code.
//!
//! The parser produces these nodes; the definition finder and the
//! compiler walk them. Every node carries the position of the token that
//! started it. `Display` prints a canonical form that re-parses to an
//! identical tree.

#[cfg(test)]
mod ast_test;

use adder_core::{IntLiteral, Pos};
use core::fmt;

/// Binary operators, in the order of their method tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitOr,
    BitXor,
    BitAnd,
    LShift,
    RShift,
}

impl BinaryOp {
    /// Number of binary operators.
    pub const COUNT: usize = 12;

    /// Index into the method-name tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The source-level operator token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::LShift => "<<",
            Self::RShift => ">>",
        }
    }
}

/// Comparison operators, in the order of their method tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Number of comparison operators.
    pub const COUNT: usize = 6;

    /// Index into the method-name tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The source-level operator token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Invert,
}

impl UnaryOp {
    /// The source-level operator token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Pos => "+",
            Self::Neg => "-",
            Self::Invert => "~",
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Default value expression, if any.
    pub default: Option<Syntax>,
    /// True for a trailing `*rest` parameter.
    pub takes_rest: bool,
}

/// One `except` clause of a `try` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Except {
    /// Exception class expression; `None` for a bare `except`.
    pub class: Option<Syntax>,
    /// Optional `as` binding target.
    pub as_target: Option<Syntax>,
    /// Handler suite.
    pub suite: Syntax,
}

/// One `if` or `elif` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Branch condition.
    pub cond: Syntax,
    /// Branch suite.
    pub suite: Syntax,
}

/// A syntax node: a position plus the node kind.
#[derive(Debug, Clone)]
pub struct Syntax {
    /// Position of the token that started this node.
    pub pos: Pos,
    /// The node itself.
    pub kind: Syn,
}

/// Node equality ignores positions, so a re-parsed print compares equal
/// to the original tree.
impl PartialEq for Syntax {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Syntax {
    /// Create a node.
    #[must_use]
    pub fn new(pos: Pos, kind: Syn) -> Self {
        Self { pos, kind }
    }
}

/// The syntax node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Syn {
    /// A suite of statements.
    Block(Vec<Syntax>),
    /// The `pass` statement.
    Pass,
    /// Integer literal.
    Int(IntLiteral),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Name reference (or assignment target).
    Name(String),
    /// Tuple display, e.g. `(a, b)` or a bare `a, b`.
    ExprList(Vec<Syntax>),
    /// List display `[a, b]`.
    List(Vec<Syntax>),
    /// Dict display `{k: v}`.
    Dict(Vec<(Syntax, Syntax)>),
    /// Unary operator application.
    Unary { op: UnaryOp, operand: Box<Syntax> },
    /// Binary operator application.
    Binary {
        op: BinaryOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    /// Comparison.
    Compare {
        op: CompareOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    /// Short-circuit `and`.
    And { left: Box<Syntax>, right: Box<Syntax> },
    /// Short-circuit `or`.
    Or { left: Box<Syntax>, right: Box<Syntax> },
    /// Logical negation.
    Not { operand: Box<Syntax> },
    /// Containment test `a in b`.
    In { left: Box<Syntax>, right: Box<Syntax> },
    /// Identity test `a is b`.
    Is { left: Box<Syntax>, right: Box<Syntax> },
    /// Assignment statement.
    Assign {
        target: Box<Syntax>,
        value: Box<Syntax>,
    },
    /// Augmented assignment, e.g. `a += b`.
    AugAssign {
        op: BinaryOp,
        target: Box<Syntax>,
        value: Box<Syntax>,
    },
    /// A comma-separated target list.
    TargetList(Vec<Syntax>),
    /// Attribute reference `obj.name`.
    AttrRef { object: Box<Syntax>, name: String },
    /// Subscript `obj[index]`.
    Subscript {
        object: Box<Syntax>,
        index: Box<Syntax>,
    },
    /// Slice expression `lower:upper:stride` inside a subscript.
    Slice {
        lower: Option<Box<Syntax>>,
        upper: Option<Box<Syntax>>,
        stride: Option<Box<Syntax>>,
    },
    /// Call `func(args)`.
    Call {
        func: Box<Syntax>,
        args: Vec<Syntax>,
    },
    /// Conditional expression `cons if cond else alt`.
    Cond {
        cond: Box<Syntax>,
        cons: Box<Syntax>,
        alt: Box<Syntax>,
    },
    /// Lambda expression.
    Lambda {
        params: Vec<Param>,
        body: Box<Syntax>,
    },
    /// List comprehension with optional `if` filters.
    ListComp {
        expr: Box<Syntax>,
        target: Box<Syntax>,
        iter: Box<Syntax>,
        conds: Vec<Syntax>,
    },
    /// `if`/`elif`/`else`.
    If {
        branches: Vec<Branch>,
        else_suite: Option<Box<Syntax>>,
    },
    /// `while`/`else`.
    While {
        cond: Box<Syntax>,
        suite: Box<Syntax>,
        else_suite: Option<Box<Syntax>>,
    },
    /// `for`/`else`.
    For {
        targets: Box<Syntax>,
        iter: Box<Syntax>,
        suite: Box<Syntax>,
        else_suite: Option<Box<Syntax>>,
    },
    /// Function definition; `is_generator` when the body yields.
    Def {
        name: String,
        params: Vec<Param>,
        suite: Box<Syntax>,
        is_generator: bool,
    },
    /// Class definition.
    ClassDef {
        name: String,
        bases: Vec<Syntax>,
        suite: Box<Syntax>,
    },
    /// `return`, optionally with a value.
    Return(Option<Box<Syntax>>),
    /// `raise expr`.
    Raise(Box<Syntax>),
    /// `yield expr`.
    Yield(Box<Syntax>),
    /// `break`.
    Break,
    /// `continue`.
    Continue,
    /// `global a, b`.
    Global(Vec<String>),
    /// `nonlocal a, b`.
    NonLocal(Vec<String>),
    /// `assert cond, message`.
    Assert {
        cond: Box<Syntax>,
        message: Option<Box<Syntax>>,
    },
    /// `del target`.
    Del { targets: Box<Syntax> },
    /// `try`/`except`/`else`/`finally`.
    Try {
        suite: Box<Syntax>,
        excepts: Vec<Except>,
        else_suite: Option<Box<Syntax>>,
        finally_suite: Option<Box<Syntax>>,
    },
    /// `import a, b`.
    Import(Vec<String>),
    /// `from module import a, b`.
    From { module: String, names: Vec<String> },
}

/// Pretty printer state: the current indentation depth.
struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    indent: usize,
}

impl Printer<'_, '_> {
    fn line_start(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            write!(self.f, "    ")?;
        }
        Ok(())
    }

    fn suite(&mut self, suite: &Syntax) -> fmt::Result {
        writeln!(self.f, ":")?;
        self.indent += 1;
        match &suite.kind {
            Syn::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
                if stmts.is_empty() {
                    self.line_start()?;
                    writeln!(self.f, "pass")?;
                }
            }
            _ => self.stmt(suite)?,
        }
        self.indent -= 1;
        Ok(())
    }

    fn params(&mut self, params: &[Param]) -> fmt::Result {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                write!(self.f, ", ")?;
            }
            if param.takes_rest {
                write!(self.f, "*")?;
            }
            write!(self.f, "{}", param.name)?;
            if let Some(default) = &param.default {
                write!(self.f, "=")?;
                self.expr(default)?;
            }
        }
        Ok(())
    }

    fn comma_exprs(&mut self, exprs: &[Syntax]) -> fmt::Result {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                write!(self.f, ", ")?;
            }
            self.expr(expr)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Syntax) -> fmt::Result {
        match &stmt.kind {
            Syn::Block(stmts) => {
                for inner in stmts {
                    self.stmt(inner)?;
                }
                Ok(())
            }
            Syn::Pass => {
                self.line_start()?;
                writeln!(self.f, "pass")
            }
            Syn::If {
                branches,
                else_suite,
            } => {
                for (i, branch) in branches.iter().enumerate() {
                    self.line_start()?;
                    write!(self.f, "{}", if i == 0 { "if " } else { "elif " })?;
                    self.expr(&branch.cond)?;
                    self.suite(&branch.suite)?;
                }
                if let Some(else_suite) = else_suite {
                    self.line_start()?;
                    write!(self.f, "else")?;
                    self.suite(else_suite)?;
                }
                Ok(())
            }
            Syn::While {
                cond,
                suite,
                else_suite,
            } => {
                self.line_start()?;
                write!(self.f, "while ")?;
                self.expr(cond)?;
                self.suite(suite)?;
                if let Some(else_suite) = else_suite {
                    self.line_start()?;
                    write!(self.f, "else")?;
                    self.suite(else_suite)?;
                }
                Ok(())
            }
            Syn::For {
                targets,
                iter,
                suite,
                else_suite,
            } => {
                self.line_start()?;
                write!(self.f, "for ")?;
                self.expr(targets)?;
                write!(self.f, " in ")?;
                self.expr(iter)?;
                self.suite(suite)?;
                if let Some(else_suite) = else_suite {
                    self.line_start()?;
                    write!(self.f, "else")?;
                    self.suite(else_suite)?;
                }
                Ok(())
            }
            Syn::Def {
                name,
                params,
                suite,
                ..
            } => {
                self.line_start()?;
                write!(self.f, "def {name}(")?;
                self.params(params)?;
                write!(self.f, ")")?;
                self.suite(suite)
            }
            Syn::ClassDef { name, bases, suite } => {
                self.line_start()?;
                write!(self.f, "class {name}")?;
                if !bases.is_empty() {
                    write!(self.f, "(")?;
                    self.comma_exprs(bases)?;
                    write!(self.f, ")")?;
                }
                self.suite(suite)
            }
            Syn::Return(value) => {
                self.line_start()?;
                write!(self.f, "return")?;
                if let Some(value) = value {
                    write!(self.f, " ")?;
                    self.expr(value)?;
                }
                writeln!(self.f)
            }
            Syn::Raise(value) => {
                self.line_start()?;
                write!(self.f, "raise ")?;
                self.expr(value)?;
                writeln!(self.f)
            }
            Syn::Break => {
                self.line_start()?;
                writeln!(self.f, "break")
            }
            Syn::Continue => {
                self.line_start()?;
                writeln!(self.f, "continue")
            }
            Syn::Global(names) => {
                self.line_start()?;
                writeln!(self.f, "global {}", names.join(", "))
            }
            Syn::NonLocal(names) => {
                self.line_start()?;
                writeln!(self.f, "nonlocal {}", names.join(", "))
            }
            Syn::Assert { cond, message } => {
                self.line_start()?;
                write!(self.f, "assert ")?;
                self.expr(cond)?;
                if let Some(message) = message {
                    write!(self.f, ", ")?;
                    self.expr(message)?;
                }
                writeln!(self.f)
            }
            Syn::Del { targets } => {
                self.line_start()?;
                write!(self.f, "del ")?;
                self.expr(targets)?;
                writeln!(self.f)
            }
            Syn::Try {
                suite,
                excepts,
                else_suite,
                finally_suite,
            } => {
                self.line_start()?;
                write!(self.f, "try")?;
                self.suite(suite)?;
                for except in excepts {
                    self.line_start()?;
                    write!(self.f, "except")?;
                    if let Some(class) = &except.class {
                        write!(self.f, " ")?;
                        self.expr(class)?;
                        if let Some(as_target) = &except.as_target {
                            write!(self.f, " as ")?;
                            self.expr(as_target)?;
                        }
                    }
                    self.suite(&except.suite)?;
                }
                if let Some(else_suite) = else_suite {
                    self.line_start()?;
                    write!(self.f, "else")?;
                    self.suite(else_suite)?;
                }
                if let Some(finally_suite) = finally_suite {
                    self.line_start()?;
                    write!(self.f, "finally")?;
                    self.suite(finally_suite)?;
                }
                Ok(())
            }
            Syn::Import(names) => {
                self.line_start()?;
                writeln!(self.f, "import {}", names.join(", "))
            }
            Syn::From { module, names } => {
                self.line_start()?;
                writeln!(self.f, "from {module} import {}", names.join(", "))
            }
            Syn::Assign { target, value } => {
                self.line_start()?;
                self.expr(target)?;
                write!(self.f, " = ")?;
                self.expr(value)?;
                writeln!(self.f)
            }
            Syn::AugAssign { op, target, value } => {
                self.line_start()?;
                self.expr(target)?;
                write!(self.f, " {}= ", op.token())?;
                self.expr(value)?;
                writeln!(self.f)
            }
            _ => {
                self.line_start()?;
                self.expr(stmt)?;
                writeln!(self.f)
            }
        }
    }

    fn expr(&mut self, expr: &Syntax) -> fmt::Result {
        match &expr.kind {
            Syn::Int(IntLiteral::Small(v)) => write!(self.f, "{v}"),
            Syn::Int(IntLiteral::Big(v)) => write!(self.f, "{v}"),
            Syn::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(self.f, "{v:.1}")
                } else {
                    write!(self.f, "{v}")
                }
            }
            Syn::Str(s) => {
                write!(self.f, "\"")?;
                for c in s.chars() {
                    match c {
                        '\n' => write!(self.f, "\\n")?,
                        '\t' => write!(self.f, "\\t")?,
                        '"' => write!(self.f, "\\\"")?,
                        '\\' => write!(self.f, "\\\\")?,
                        _ => write!(self.f, "{c}")?,
                    }
                }
                write!(self.f, "\"")
            }
            Syn::Name(name) => write!(self.f, "{name}"),
            Syn::ExprList(elements) => {
                write!(self.f, "(")?;
                self.comma_exprs(elements)?;
                if elements.len() == 1 {
                    write!(self.f, ",")?;
                }
                write!(self.f, ")")
            }
            Syn::List(elements) => {
                write!(self.f, "[")?;
                self.comma_exprs(elements)?;
                write!(self.f, "]")
            }
            Syn::Dict(entries) => {
                write!(self.f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(self.f, ", ")?;
                    }
                    self.expr(key)?;
                    write!(self.f, ": ")?;
                    self.expr(value)?;
                }
                write!(self.f, "}}")
            }
            Syn::Unary { op, operand } => {
                write!(self.f, "{}", op.token())?;
                self.paren_expr(operand)
            }
            Syn::Binary { op, left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " {} ", op.token())?;
                self.paren_expr(right)
            }
            Syn::Compare { op, left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " {} ", op.token())?;
                self.paren_expr(right)
            }
            Syn::And { left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " and ")?;
                self.paren_expr(right)
            }
            Syn::Or { left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " or ")?;
                self.paren_expr(right)
            }
            Syn::Not { operand } => {
                write!(self.f, "not ")?;
                self.paren_expr(operand)
            }
            Syn::In { left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " in ")?;
                self.paren_expr(right)
            }
            Syn::Is { left, right } => {
                self.paren_expr(left)?;
                write!(self.f, " is ")?;
                self.paren_expr(right)
            }
            Syn::TargetList(targets) => self.comma_exprs(targets),
            Syn::AttrRef { object, name } => {
                self.paren_expr(object)?;
                write!(self.f, ".{name}")
            }
            Syn::Subscript { object, index } => {
                self.paren_expr(object)?;
                write!(self.f, "[")?;
                self.expr(index)?;
                write!(self.f, "]")
            }
            Syn::Slice {
                lower,
                upper,
                stride,
            } => {
                if let Some(lower) = lower {
                    self.expr(lower)?;
                }
                write!(self.f, ":")?;
                if let Some(upper) = upper {
                    self.expr(upper)?;
                }
                if let Some(stride) = stride {
                    write!(self.f, ":")?;
                    self.expr(stride)?;
                }
                Ok(())
            }
            Syn::Call { func, args } => {
                self.paren_expr(func)?;
                write!(self.f, "(")?;
                self.comma_exprs(args)?;
                write!(self.f, ")")
            }
            Syn::Cond { cond, cons, alt } => {
                self.paren_expr(cons)?;
                write!(self.f, " if ")?;
                self.paren_expr(cond)?;
                write!(self.f, " else ")?;
                self.paren_expr(alt)
            }
            Syn::Lambda { params, body } => {
                write!(self.f, "lambda")?;
                if !params.is_empty() {
                    write!(self.f, " ")?;
                    self.params(params)?;
                }
                write!(self.f, ": ")?;
                self.expr(body)
            }
            Syn::ListComp {
                expr,
                target,
                iter,
                conds,
            } => {
                write!(self.f, "[")?;
                self.expr(expr)?;
                write!(self.f, " for ")?;
                self.expr(target)?;
                write!(self.f, " in ")?;
                self.paren_expr(iter)?;
                for cond in conds {
                    write!(self.f, " if ")?;
                    self.paren_expr(cond)?;
                }
                write!(self.f, "]")
            }
            Syn::Yield(value) => {
                write!(self.f, "yield ")?;
                self.expr(value)
            }
            _ => {
                // Statement kinds only reach here through malformed trees.
                write!(self.f, "<stmt>")
            }
        }
    }

    /// Print a sub-expression, parenthesised when it could rebind.
    fn paren_expr(&mut self, expr: &Syntax) -> fmt::Result {
        let needs_parens = matches!(
            expr.kind,
            Syn::Binary { .. }
                | Syn::Compare { .. }
                | Syn::And { .. }
                | Syn::Or { .. }
                | Syn::Not { .. }
                | Syn::In { .. }
                | Syn::Is { .. }
                | Syn::Cond { .. }
                | Syn::Lambda { .. }
                | Syn::Unary { .. }
        );
        if needs_parens {
            write!(self.f, "(")?;
            self.expr(expr)?;
            write!(self.f, ")")
        } else {
            self.expr(expr)
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { f, indent: 0 };
        match &self.kind {
            Syn::Block(_)
            | Syn::Pass
            | Syn::If { .. }
            | Syn::While { .. }
            | Syn::For { .. }
            | Syn::Def { .. }
            | Syn::ClassDef { .. }
            | Syn::Return(_)
            | Syn::Raise(_)
            | Syn::Break
            | Syn::Continue
            | Syn::Global(_)
            | Syn::NonLocal(_)
            | Syn::Assert { .. }
            | Syn::Del { .. }
            | Syn::Try { .. }
            | Syn::Import(_)
            | Syn::From { .. }
            | Syn::Assign { .. }
            | Syn::AugAssign { .. } => printer.stmt(self),
            _ => printer.expr(self),
        }
    }
}
