// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the lexer.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::lexer::{Keyword, LexError, Lexer, TokenKind};
use adder_core::IntLiteral;

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .expect("lex error")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn empty_input() {
    assert_eq!(kinds(""), vec![TokenKind::End]);
}

#[test]
fn integers_and_floats() {
    assert_eq!(
        kinds("1 42 0x1f 1.5 2e3"),
        vec![
            TokenKind::Int(IntLiteral::Small(1)),
            TokenKind::Int(IntLiteral::Small(42)),
            TokenKind::Int(IntLiteral::Small(31)),
            TokenKind::Float(1.5),
            TokenKind::Float(2000.0),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn unbounded_integer_literal() {
    let tokens = kinds("123456789012345678901234567890");
    match &tokens[0] {
        TokenKind::Int(IntLiteral::Big(big)) => {
            assert_eq!(big.to_string(), "123456789012345678901234567890");
        }
        other => panic!("expected big integer, found {other:?}"),
    }
}

#[test]
fn strings_with_escapes() {
    assert_eq!(
        kinds(r#""a\tb\nc" 'd\qe'"#),
        vec![
            TokenKind::Str(String::from("a\tb\nc")),
            // Unknown escapes stay literal.
            TokenKind::Str(String::from("d\\qe")),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("def foo None"),
        vec![
            TokenKind::Keyword(Keyword::Def),
            TokenKind::Ident(String::from("foo")),
            // True/False/None are names, not keywords.
            TokenKind::Ident(String::from("None")),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn operators_longest_match() {
    use crate::ast::BinaryOp;
    assert_eq!(
        kinds("** // <= != <<= +="),
        vec![
            TokenKind::DoubleStar,
            TokenKind::DoubleSlash,
            TokenKind::Le,
            TokenKind::NotEq,
            TokenKind::AugAssign(BinaryOp::LShift),
            TokenKind::AugAssign(BinaryOp::Add),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn indentation_structure() {
    let tokens = kinds("if x:\n    y\nz");
    assert_eq!(
        tokens,
        vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::Ident(String::from("x")),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Ident(String::from("y")),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Ident(String::from("z")),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn dedent_at_end_of_input() {
    let tokens = kinds("if x:\n    y");
    assert_eq!(
        &tokens[tokens.len() - 3..],
        &[TokenKind::Newline, TokenKind::Dedent, TokenKind::End]
    );
}

#[test]
fn newlines_inside_brackets_are_whitespace() {
    assert_eq!(
        kinds("(1,\n 2)"),
        vec![
            TokenKind::LParen,
            TokenKind::Int(IntLiteral::Small(1)),
            TokenKind::Comma,
            TokenKind::Int(IntLiteral::Small(2)),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn blank_lines_and_comments_are_skipped() {
    assert_eq!(
        kinds("# a comment\n\nx  # trailing\n"),
        vec![
            TokenKind::Ident(String::from("x")),
            TokenKind::Newline,
            TokenKind::End,
        ]
    );
}

#[test]
fn bad_dedent_is_an_error() {
    let result = Lexer::new("if x:\n        a\n    b\n").tokenize();
    assert!(matches!(result, Err(LexError::BadDedent { .. })));
}

#[test]
fn unterminated_string_is_an_error() {
    let result = Lexer::new("'abc").tokenize();
    assert!(matches!(result, Err(LexError::UnterminatedString { .. })));
}
