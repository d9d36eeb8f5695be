// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Parser for Adder source code.
//!
//! Statements are parsed by recursive descent; expressions by a Pratt
//! loop over a binding-power table, with `**` handled right-associative
//! and unary operators binding between `*` and `**`.

use super::lexer::{Keyword, LexError, Lexer, Token, TokenKind};
use crate::ast::{BinaryOp, Branch, CompareOp, Except, Param, Syn, Syntax, UnaryOp};
use adder_core::{Input, Pos};
use thiserror::Error;

/// Parse error with source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {pos}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// Where the error was detected.
    pub pos: Pos,
}

impl ParseError {
    fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        let pos = match error {
            LexError::BadChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::BadNumber { pos }
            | LexError::BadDedent { pos } => pos,
        };
        Self::new(error.to_string(), pos)
    }
}

/// Parse a whole module.
///
/// # Errors
///
/// Returns the first lexical or syntactic error.
pub fn parse_module(input: &Input) -> Result<Syntax, ParseError> {
    let tokens = Lexer::new(input.text()).tokenize()?;
    let mut parser = Parser { tokens, index: 0 };
    let module = parser.module()?;
    Ok(module)
}

/// Parse a single expression, for tests and the REPL.
///
/// # Errors
///
/// Returns the first lexical or syntactic error.
pub fn parse_expr(input: &Input) -> Result<Syntax, ParseError> {
    let tokens = Lexer::new(input.text()).tokenize()?;
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.expr_list()?;
    parser.eat(&TokenKind::Newline);
    parser.expect(&TokenKind::End)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.index].kind
    }

    fn peek2(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index + 1).map(|t| &t.kind)
    }

    fn pos(&self) -> Pos {
        self.tokens[self.index].pos
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, keyword: Keyword) -> bool {
        if self.peek() == &TokenKind::Keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_kw(&self, keyword: Keyword) -> bool {
        self.peek() == &TokenKind::Keyword(keyword)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected {kind:?}, found {:?}", self.peek()),
                self.pos(),
            ))
        }
    }

    fn expect_kw(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_kw(keyword) {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("expected {keyword:?}, found {:?}", self.peek()),
                self.pos(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            TokenKind::Ident(_) => {
                let token = self.advance();
                let TokenKind::Ident(name) = token.kind else {
                    unreachable!("checked above");
                };
                Ok(name)
            }
            other => Err(ParseError::new(
                format!("expected identifier, found {other:?}"),
                self.pos(),
            )),
        }
    }

    // --- Statements ---

    fn module(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let mut statements = Vec::new();
        loop {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            if self.peek() == &TokenKind::End {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(Syntax::new(pos, Syn::Block(statements)))
    }

    fn statement(&mut self) -> Result<Syntax, ParseError> {
        match self.peek() {
            TokenKind::Keyword(Keyword::If) => self.if_stmt(),
            TokenKind::Keyword(Keyword::While) => self.while_stmt(),
            TokenKind::Keyword(Keyword::For) => self.for_stmt(),
            TokenKind::Keyword(Keyword::Try) => self.try_stmt(),
            TokenKind::Keyword(Keyword::Def) => self.def_stmt(),
            TokenKind::Keyword(Keyword::Class) => self.class_stmt(),
            _ => {
                let stmt = self.simple_stmt()?;
                self.end_of_line()?;
                Ok(stmt)
            }
        }
    }

    fn end_of_line(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Newline) || self.peek() == &TokenKind::End {
            return Ok(());
        }
        Err(ParseError::new(
            format!("expected end of line, found {:?}", self.peek()),
            self.pos(),
        ))
    }

    /// A suite: either statements on the following indented lines, or a
    /// single simple statement on the same line.
    fn suite(&mut self) -> Result<Syntax, ParseError> {
        self.expect(&TokenKind::Colon)?;
        let pos = self.pos();
        if self.eat(&TokenKind::Newline) {
            self.expect(&TokenKind::Indent)?;
            let mut statements = Vec::new();
            loop {
                if self.eat(&TokenKind::Newline) {
                    continue;
                }
                if self.eat(&TokenKind::Dedent) {
                    break;
                }
                statements.push(self.statement()?);
            }
            Ok(Syntax::new(pos, Syn::Block(statements)))
        } else {
            let stmt = self.simple_stmt()?;
            self.end_of_line()?;
            Ok(Syntax::new(pos, Syn::Block(vec![stmt])))
        }
    }

    fn simple_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        match self.peek() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Pass))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Break))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Continue))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if matches!(self.peek(), TokenKind::Newline | TokenKind::End) {
                    None
                } else {
                    Some(Box::new(self.expr_list()?))
                };
                Ok(Syntax::new(pos, Syn::Return(value)))
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.advance();
                let value = self.expr()?;
                Ok(Syntax::new(pos, Syn::Raise(Box::new(value))))
            }
            TokenKind::Keyword(Keyword::Global) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Global(self.name_list()?)))
            }
            TokenKind::Keyword(Keyword::NonLocal) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::NonLocal(self.name_list()?)))
            }
            TokenKind::Keyword(Keyword::Assert) => {
                self.advance();
                let cond = self.expr()?;
                let message = if self.eat(&TokenKind::Comma) {
                    Some(Box::new(self.expr()?))
                } else {
                    None
                };
                Ok(Syntax::new(
                    pos,
                    Syn::Assert {
                        cond: Box::new(cond),
                        message,
                    },
                ))
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.advance();
                let targets = self.expr_list()?;
                let targets = self.to_target(targets)?;
                Ok(Syntax::new(
                    pos,
                    Syn::Del {
                        targets: Box::new(targets),
                    },
                ))
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Import(self.name_list()?)))
            }
            TokenKind::Keyword(Keyword::From) => {
                self.advance();
                let module = self.expect_ident()?;
                self.expect_kw(Keyword::Import)?;
                let names = self.name_list()?;
                Ok(Syntax::new(pos, Syn::From { module, names }))
            }
            _ => self.expr_stmt(),
        }
    }

    fn name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        Ok(names)
    }

    fn expr_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let expr = self.expr_list()?;
        if let TokenKind::AugAssign(op) = *self.peek() {
            self.advance();
            let target = self.to_single_target(expr)?;
            let value = self.expr_list()?;
            return Ok(Syntax::new(
                pos,
                Syn::AugAssign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
            ));
        }
        if self.eat(&TokenKind::Assign) {
            let target = self.to_target(expr)?;
            let value = self.expr_list()?;
            return Ok(Syntax::new(
                pos,
                Syn::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
            ));
        }
        Ok(expr)
    }

    /// Convert an expression to an assignment target.
    fn to_target(&self, expr: Syntax) -> Result<Syntax, ParseError> {
        match expr.kind {
            Syn::Name(_) | Syn::AttrRef { .. } | Syn::Subscript { .. } => Ok(expr),
            Syn::ExprList(elements) | Syn::TargetList(elements) => {
                let targets = elements
                    .into_iter()
                    .map(|element| self.to_target(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Syntax::new(expr.pos, Syn::TargetList(targets)))
            }
            _ => Err(ParseError::new("cannot assign to this expression", expr.pos)),
        }
    }

    fn to_single_target(&self, expr: Syntax) -> Result<Syntax, ParseError> {
        match expr.kind {
            Syn::Name(_) | Syn::AttrRef { .. } | Syn::Subscript { .. } => Ok(expr),
            _ => Err(ParseError::new(
                "augmented assignment needs a single target",
                expr.pos,
            )),
        }
    }

    fn if_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::If)?;
        let mut branches = vec![Branch {
            cond: self.expr()?,
            suite: self.suite()?,
        }];
        let mut else_suite = None;
        loop {
            if self.eat_kw(Keyword::Elif) {
                branches.push(Branch {
                    cond: self.expr()?,
                    suite: self.suite()?,
                });
            } else if self.eat_kw(Keyword::Else) {
                else_suite = Some(Box::new(self.suite()?));
                break;
            } else {
                break;
            }
        }
        Ok(Syntax::new(
            pos,
            Syn::If {
                branches,
                else_suite,
            },
        ))
    }

    fn while_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::While)?;
        let cond = self.expr()?;
        let suite = self.suite()?;
        let else_suite = if self.eat_kw(Keyword::Else) {
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Syntax::new(
            pos,
            Syn::While {
                cond: Box::new(cond),
                suite: Box::new(suite),
                else_suite,
            },
        ))
    }

    fn for_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::For)?;
        let targets = self.expr_list_no_in()?;
        let targets = self.to_target(targets)?;
        self.expect_kw(Keyword::In)?;
        let iter = self.expr_list()?;
        let suite = self.suite()?;
        let else_suite = if self.eat_kw(Keyword::Else) {
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Syntax::new(
            pos,
            Syn::For {
                targets: Box::new(targets),
                iter: Box::new(iter),
                suite: Box::new(suite),
                else_suite,
            },
        ))
    }

    fn try_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::Try)?;
        let suite = self.suite()?;
        let mut excepts = Vec::new();
        let mut saw_bare = false;
        while self.at_kw(Keyword::Except) {
            let except_pos = self.pos();
            self.advance();
            if saw_bare {
                return Err(ParseError::new("default except must be last", except_pos));
            }
            let (class, as_target) = if self.peek() == &TokenKind::Colon {
                saw_bare = true;
                (None, None)
            } else {
                let class = self.expr()?;
                let as_target = if self.eat_kw(Keyword::As) {
                    let pos = self.pos();
                    let name = self.expect_ident()?;
                    Some(Syntax::new(pos, Syn::Name(name)))
                } else {
                    None
                };
                (Some(class), as_target)
            };
            excepts.push(Except {
                class,
                as_target,
                suite: self.suite()?,
            });
        }
        let else_suite = if !excepts.is_empty() && self.at_kw(Keyword::Else) {
            self.advance();
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        let finally_suite = if self.eat_kw(Keyword::Finally) {
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        if excepts.is_empty() && finally_suite.is_none() {
            return Err(ParseError::new("try needs except or finally", pos));
        }
        Ok(Syntax::new(
            pos,
            Syn::Try {
                suite: Box::new(suite),
                excepts,
                else_suite,
                finally_suite,
            },
        ))
    }

    fn params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if self.peek() == &TokenKind::RParen {
            return Ok(params);
        }
        loop {
            let pos = self.pos();
            if self.eat(&TokenKind::Star) {
                let name = self.expect_ident()?;
                if params.iter().any(|p: &Param| p.name == name) {
                    return Err(ParseError::new(
                        format!("duplicate parameter '{name}'"),
                        pos,
                    ));
                }
                params.push(Param {
                    name,
                    default: None,
                    takes_rest: true,
                });
                if self.peek() == &TokenKind::Comma {
                    return Err(ParseError::new("rest parameter must be last", pos));
                }
                break;
            }
            let name = self.expect_ident()?;
            if params.iter().any(|p: &Param| p.name == name) {
                return Err(ParseError::new(
                    format!("duplicate parameter '{name}'"),
                    pos,
                ));
            }
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.expr()?)
            } else {
                None
            };
            if default.is_none() && params.iter().any(|p: &Param| p.default.is_some()) {
                return Err(ParseError::new(
                    "parameter without default follows one with default",
                    pos,
                ));
            }
            params.push(Param {
                name,
                default,
                takes_rest: false,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn def_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::Def)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.params()?;
        self.expect(&TokenKind::RParen)?;
        let suite = self.suite()?;
        let is_generator = contains_yield(&suite);
        Ok(Syntax::new(
            pos,
            Syn::Def {
                name,
                params,
                suite: Box::new(suite),
                is_generator,
            },
        ))
    }

    fn class_stmt(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        self.expect_kw(Keyword::Class)?;
        let name = self.expect_ident()?;
        let mut bases = Vec::new();
        if self.eat(&TokenKind::LParen) {
            if self.peek() != &TokenKind::RParen {
                bases.push(self.expr()?);
                while self.eat(&TokenKind::Comma) {
                    bases.push(self.expr()?);
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        let suite = self.suite()?;
        Ok(Syntax::new(
            pos,
            Syn::ClassDef {
                name,
                bases,
                suite: Box::new(suite),
            },
        ))
    }

    // --- Expressions ---

    /// A possibly comma-separated expression list (tuple display).
    fn expr_list(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let first = self.expr()?;
        if self.peek() != &TokenKind::Comma {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if expr_list_ends(self.peek()) {
                break;
            }
            elements.push(self.expr()?);
        }
        Ok(Syntax::new(pos, Syn::ExprList(elements)))
    }

    /// Like `expr_list` but stops before `in`, for `for` targets.
    fn expr_list_no_in(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let first = self.postfix_expr()?;
        if self.peek() != &TokenKind::Comma {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_kw(Keyword::In) {
                break;
            }
            elements.push(self.postfix_expr()?);
        }
        Ok(Syntax::new(pos, Syn::ExprList(elements)))
    }

    fn expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        if self.eat_kw(Keyword::Lambda) {
            let mut params = Vec::new();
            if self.peek() != &TokenKind::Colon {
                loop {
                    let name = self.expect_ident()?;
                    if params.iter().any(|p: &Param| p.name == name) {
                        return Err(ParseError::new(
                            format!("duplicate parameter '{name}'"),
                            pos,
                        ));
                    }
                    let default = if self.eat(&TokenKind::Assign) {
                        Some(self.expr()?)
                    } else {
                        None
                    };
                    params.push(Param {
                        name,
                        default,
                        takes_rest: false,
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::Colon)?;
            let body = self.expr()?;
            return Ok(Syntax::new(
                pos,
                Syn::Lambda {
                    params,
                    body: Box::new(body),
                },
            ));
        }
        if self.eat_kw(Keyword::Yield) {
            let value = self.expr()?;
            return Ok(Syntax::new(pos, Syn::Yield(Box::new(value))));
        }
        let cons = self.or_expr()?;
        if self.eat_kw(Keyword::If) {
            let cond = self.or_expr()?;
            self.expect_kw(Keyword::Else)?;
            let alt = self.expr()?;
            return Ok(Syntax::new(
                pos,
                Syn::Cond {
                    cond: Box::new(cond),
                    cons: Box::new(cons),
                    alt: Box::new(alt),
                },
            ));
        }
        Ok(cons)
    }

    fn or_expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let mut left = self.and_expr()?;
        while self.eat_kw(Keyword::Or) {
            let right = self.and_expr()?;
            left = Syntax::new(
                pos,
                Syn::Or {
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let mut left = self.not_expr()?;
        while self.eat_kw(Keyword::And) {
            let right = self.not_expr()?;
            left = Syntax::new(
                pos,
                Syn::And {
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        if self.eat_kw(Keyword::Not) {
            let operand = self.not_expr()?;
            return Ok(Syntax::new(
                pos,
                Syn::Not {
                    operand: Box::new(operand),
                },
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let mut left = self.binary_expr(0)?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => Some(CompareOp::Lt),
                TokenKind::Le => Some(CompareOp::Le),
                TokenKind::Gt => Some(CompareOp::Gt),
                TokenKind::Ge => Some(CompareOp::Ge),
                TokenKind::EqEq => Some(CompareOp::Eq),
                TokenKind::NotEq => Some(CompareOp::Ne),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                let right = self.binary_expr(0)?;
                left = Syntax::new(
                    pos,
                    Syn::Compare {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
                continue;
            }
            if self.at_kw(Keyword::In) {
                self.advance();
                let right = self.binary_expr(0)?;
                left = Syntax::new(
                    pos,
                    Syn::In {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
                continue;
            }
            if self.at_kw(Keyword::Not) && self.peek2() == Some(&TokenKind::Keyword(Keyword::In)) {
                self.advance();
                self.advance();
                let right = self.binary_expr(0)?;
                let contains = Syntax::new(
                    pos,
                    Syn::In {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
                left = Syntax::new(
                    pos,
                    Syn::Not {
                        operand: Box::new(contains),
                    },
                );
                continue;
            }
            if self.at_kw(Keyword::Is) {
                self.advance();
                let negated = self.eat_kw(Keyword::Not);
                let right = self.binary_expr(0)?;
                let identity = Syntax::new(
                    pos,
                    Syn::Is {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
                left = if negated {
                    Syntax::new(
                        pos,
                        Syn::Not {
                            operand: Box::new(identity),
                        },
                    )
                } else {
                    identity
                };
                continue;
            }
            break;
        }
        Ok(left)
    }

    /// Pratt loop over the left-associative binary operators.
    fn binary_expr(&mut self, min_bp: u8) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let mut left = self.unary_expr()?;
        loop {
            let Some((op, lbp)) = binary_op_at(self.peek()) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();
            let right = self.binary_expr(lbp + 1)?;
            left = Syntax::new(
                pos,
                Syn::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary_expr()?;
            return Ok(Syntax::new(
                pos,
                Syn::Unary {
                    op,
                    operand: Box::new(operand),
                },
            ));
        }
        self.power_expr()
    }

    fn power_expr(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let base = self.postfix_expr()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.unary_expr()?;
            return Ok(Syntax::new(
                pos,
                Syn::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(base),
                    right: Box::new(exponent),
                },
            ));
        }
        Ok(base)
    }

    fn postfix_expr(&mut self) -> Result<Syntax, ParseError> {
        let mut expr = self.atom()?;
        loop {
            let pos = self.pos();
            if self.eat(&TokenKind::LParen) {
                let mut args = Vec::new();
                if self.peek() != &TokenKind::RParen {
                    args.push(self.expr()?);
                    while self.eat(&TokenKind::Comma) {
                        if self.peek() == &TokenKind::RParen {
                            break;
                        }
                        args.push(self.expr()?);
                    }
                }
                self.expect(&TokenKind::RParen)?;
                expr = Syntax::new(
                    pos,
                    Syn::Call {
                        func: Box::new(expr),
                        args,
                    },
                );
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.subscript_index()?;
                self.expect(&TokenKind::RBracket)?;
                expr = Syntax::new(
                    pos,
                    Syn::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                );
            } else if self.eat(&TokenKind::Dot) {
                let name = self.expect_ident()?;
                expr = Syntax::new(
                    pos,
                    Syn::AttrRef {
                        object: Box::new(expr),
                        name,
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// The inside of `obj[...]`: a plain expression or a slice.
    fn subscript_index(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        let lower = if self.peek() == &TokenKind::Colon {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        if !self.eat(&TokenKind::Colon) {
            return lower.map_or_else(
                || Err(ParseError::new("expected subscript expression", pos)),
                |expr| Ok(*expr),
            );
        }
        let upper = if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        let stride = if self.eat(&TokenKind::Colon) {
            if self.peek() == &TokenKind::RBracket {
                None
            } else {
                Some(Box::new(self.expr()?))
            }
        } else {
            None
        };
        Ok(Syntax::new(
            pos,
            Syn::Slice {
                lower,
                upper,
                stride,
            },
        ))
    }

    fn atom(&mut self) -> Result<Syntax, ParseError> {
        let pos = self.pos();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Name(name)))
            }
            TokenKind::Int(literal) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Int(literal)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Float(value)))
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Syntax::new(pos, Syn::Str(text)))
            }
            TokenKind::Keyword(Keyword::Lambda | Keyword::Yield) => self.expr(),
            TokenKind::LParen => {
                self.advance();
                if self.eat(&TokenKind::RParen) {
                    return Ok(Syntax::new(pos, Syn::ExprList(Vec::new())));
                }
                let first = self.expr()?;
                if self.peek() == &TokenKind::Comma {
                    let mut elements = vec![first];
                    while self.eat(&TokenKind::Comma) {
                        if self.peek() == &TokenKind::RParen {
                            break;
                        }
                        elements.push(self.expr()?);
                    }
                    self.expect(&TokenKind::RParen)?;
                    return Ok(Syntax::new(pos, Syn::ExprList(elements)));
                }
                self.expect(&TokenKind::RParen)?;
                Ok(first)
            }
            TokenKind::LBracket => {
                self.advance();
                if self.eat(&TokenKind::RBracket) {
                    return Ok(Syntax::new(pos, Syn::List(Vec::new())));
                }
                let first = self.expr()?;
                if self.at_kw(Keyword::For) {
                    self.advance();
                    let target = self.expr_list_no_in()?;
                    let target = self.to_target(target)?;
                    self.expect_kw(Keyword::In)?;
                    let iter = self.or_expr()?;
                    let mut conds = Vec::new();
                    while self.eat_kw(Keyword::If) {
                        conds.push(self.or_expr()?);
                    }
                    self.expect(&TokenKind::RBracket)?;
                    return Ok(Syntax::new(
                        pos,
                        Syn::ListComp {
                            expr: Box::new(first),
                            target: Box::new(target),
                            iter: Box::new(iter),
                            conds,
                        },
                    ));
                }
                let mut elements = vec![first];
                while self.eat(&TokenKind::Comma) {
                    if self.peek() == &TokenKind::RBracket {
                        break;
                    }
                    elements.push(self.expr()?);
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Syntax::new(pos, Syn::List(elements)))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                if self.peek() != &TokenKind::RBrace {
                    loop {
                        let key = self.expr()?;
                        self.expect(&TokenKind::Colon)?;
                        let value = self.expr()?;
                        entries.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                        if self.peek() == &TokenKind::RBrace {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                Ok(Syntax::new(pos, Syn::Dict(entries)))
            }
            other => Err(ParseError::new(
                format!("unexpected token {other:?}"),
                pos,
            )),
        }
    }
}

fn expr_list_ends(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Newline
            | TokenKind::End
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Assign
            | TokenKind::Colon
    )
}

fn binary_op_at(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::Pipe => (BinaryOp::BitOr, 10),
        TokenKind::Caret => (BinaryOp::BitXor, 20),
        TokenKind::Amp => (BinaryOp::BitAnd, 30),
        TokenKind::LShift => (BinaryOp::LShift, 40),
        TokenKind::RShift => (BinaryOp::RShift, 40),
        TokenKind::Plus => (BinaryOp::Add, 50),
        TokenKind::Minus => (BinaryOp::Sub, 50),
        TokenKind::Star => (BinaryOp::Mul, 60),
        TokenKind::Slash => (BinaryOp::Div, 60),
        TokenKind::DoubleSlash => (BinaryOp::FloorDiv, 60),
        TokenKind::Percent => (BinaryOp::Mod, 60),
        _ => return None,
    })
}

/// Whether a suite yields, without descending into nested scopes.
fn contains_yield(syntax: &Syntax) -> bool {
    match &syntax.kind {
        Syn::Yield(_) => true,
        Syn::Def { .. } | Syn::ClassDef { .. } | Syn::Lambda { .. } => false,
        Syn::Block(stmts) => stmts.iter().any(contains_yield),
        Syn::If {
            branches,
            else_suite,
        } => {
            branches
                .iter()
                .any(|b| contains_yield(&b.cond) || contains_yield(&b.suite))
                || else_suite.as_deref().is_some_and(contains_yield)
        }
        Syn::While {
            cond,
            suite,
            else_suite,
        } => {
            contains_yield(cond)
                || contains_yield(suite)
                || else_suite.as_deref().is_some_and(contains_yield)
        }
        Syn::For {
            iter,
            suite,
            else_suite,
            ..
        } => {
            contains_yield(iter)
                || contains_yield(suite)
                || else_suite.as_deref().is_some_and(contains_yield)
        }
        Syn::Try {
            suite,
            excepts,
            else_suite,
            finally_suite,
        } => {
            contains_yield(suite)
                || excepts.iter().any(|e| contains_yield(&e.suite))
                || else_suite.as_deref().is_some_and(contains_yield)
                || finally_suite.as_deref().is_some_and(contains_yield)
        }
        Syn::Assign { value, .. } => contains_yield(value),
        Syn::AugAssign { value, .. } => contains_yield(value),
        Syn::Return(value) => value.as_deref().is_some_and(contains_yield),
        Syn::ExprList(elements) | Syn::List(elements) => elements.iter().any(contains_yield),
        Syn::Call { func, args } => contains_yield(func) || args.iter().any(contains_yield),
        Syn::Binary { left, right, .. }
        | Syn::Compare { left, right, .. }
        | Syn::And { left, right }
        | Syn::Or { left, right }
        | Syn::In { left, right }
        | Syn::Is { left, right } => contains_yield(left) || contains_yield(right),
        Syn::Not { operand } | Syn::Unary { operand, .. } => contains_yield(operand),
        _ => false,
    }
}
