// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the parser.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::parser::{parse_expr, parse_module};
use crate::ast::{BinaryOp, CompareOp, Syn, Syntax};
use adder_core::Input;

fn expr(source: &str) -> Syntax {
    parse_expr(&Input::new("<test>", source)).expect("parse error")
}

fn module(source: &str) -> Syntax {
    parse_module(&Input::new("<test>", source)).expect("parse error")
}

fn module_err(source: &str) -> String {
    parse_module(&Input::new("<test>", source))
        .expect_err("expected parse error")
        .message
}

fn stmts(syntax: &Syntax) -> &[Syntax] {
    match &syntax.kind {
        Syn::Block(stmts) => stmts,
        other => panic!("expected block, found {other:?}"),
    }
}

// --- Expressions ---

#[test]
fn precedence_of_arithmetic() {
    // 1 + 2 * 3 parses as 1 + (2 * 3).
    let parsed = expr("1 + 2 * 3");
    let Syn::Binary { op, right, .. } = &parsed.kind else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        right.kind,
        Syn::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn power_is_right_associative_and_tight() {
    // 2 ** 4 - 1 parses as (2 ** 4) - 1.
    let parsed = expr("2 ** 4 - 1");
    let Syn::Binary { op, left, .. } = &parsed.kind else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(
        left.kind,
        Syn::Binary {
            op: BinaryOp::Pow,
            ..
        }
    ));
    // -2 ** 2 parses as -(2 ** 2).
    let parsed = expr("-2 ** 2");
    assert!(matches!(parsed.kind, Syn::Unary { .. }));
}

#[test]
fn comparisons_and_identity() {
    assert!(matches!(
        expr("a < b").kind,
        Syn::Compare {
            op: CompareOp::Lt,
            ..
        }
    ));
    assert!(matches!(expr("a is b").kind, Syn::Is { .. }));
    assert!(matches!(expr("a is not b").kind, Syn::Not { .. }));
    assert!(matches!(expr("a not in b").kind, Syn::Not { .. }));
    assert!(matches!(expr("a in b").kind, Syn::In { .. }));
}

#[test]
fn short_circuit_and_conditional() {
    assert!(matches!(expr("a and b or c").kind, Syn::Or { .. }));
    assert!(matches!(expr("a if b else c").kind, Syn::Cond { .. }));
}

#[test]
fn trailers_chain() {
    let parsed = expr("a.b[1](2).c");
    let Syn::AttrRef { object, name } = &parsed.kind else {
        panic!("expected attribute node");
    };
    assert_eq!(name, "c");
    assert!(matches!(object.kind, Syn::Call { .. }));
}

#[test]
fn tuple_displays() {
    assert!(matches!(expr("()").kind, Syn::ExprList(ref e) if e.is_empty()));
    assert!(matches!(expr("(1,)").kind, Syn::ExprList(ref e) if e.len() == 1));
    assert!(matches!(expr("1, 2").kind, Syn::ExprList(ref e) if e.len() == 2));
    // Parenthesised single expressions stay plain.
    assert!(matches!(expr("(1)").kind, Syn::Int(_)));
}

#[test]
fn slices() {
    let parsed = expr("a[1:2:3]");
    let Syn::Subscript { index, .. } = &parsed.kind else {
        panic!("expected subscript");
    };
    let Syn::Slice {
        lower,
        upper,
        stride,
    } = &index.kind
    else {
        panic!("expected slice");
    };
    assert!(lower.is_some() && upper.is_some() && stride.is_some());
    let parsed = expr("a[:2]");
    let Syn::Subscript { index, .. } = &parsed.kind else {
        panic!("expected subscript");
    };
    assert!(matches!(index.kind, Syn::Slice { ref lower, .. } if lower.is_none()));
}

#[test]
fn list_comprehension() {
    let parsed = expr("[x * 2 for x in xs if x]");
    let Syn::ListComp { conds, .. } = &parsed.kind else {
        panic!("expected comprehension");
    };
    assert_eq!(conds.len(), 1);
}

#[test]
fn lambda_with_defaults() {
    let parsed = expr("lambda a, b=1: a + b");
    let Syn::Lambda { params, .. } = &parsed.kind else {
        panic!("expected lambda");
    };
    assert_eq!(params.len(), 2);
    assert!(params[1].default.is_some());
}

// --- Statements ---

#[test]
fn assignment_targets() {
    let parsed = module("a, b = c\n");
    let Syn::Assign { target, .. } = &stmts(&parsed)[0].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(target.kind, Syn::TargetList(_)));
    assert_eq!(module_err("1 = 2\n"), "cannot assign to this expression");
}

#[test]
fn augmented_assignment() {
    let parsed = module("a += 1\n");
    assert!(matches!(
        stmts(&parsed)[0].kind,
        Syn::AugAssign {
            op: BinaryOp::Add,
            ..
        }
    ));
    assert!(module_err("a, b += 1\n").contains("single target"));
}

#[test]
fn def_with_rest_parameter() {
    let parsed = module("def f(x=1, *y):\n    return x\n");
    let Syn::Def { params, .. } = &stmts(&parsed)[0].kind else {
        panic!("expected def");
    };
    assert_eq!(params.len(), 2);
    assert!(params[0].default.is_some());
    assert!(params[1].takes_rest);
}

#[test]
fn generator_detection() {
    let parsed = module("def g():\n    yield 1\n");
    assert!(matches!(
        stmts(&parsed)[0].kind,
        Syn::Def {
            is_generator: true,
            ..
        }
    ));
    // A nested def's yield does not make the outer function a generator.
    let parsed = module("def f():\n    def g():\n        yield 1\n    return g\n");
    assert!(matches!(
        stmts(&parsed)[0].kind,
        Syn::Def {
            is_generator: false,
            ..
        }
    ));
}

#[test]
fn try_statement_shapes() {
    let parsed = module("try:\n    a\nexcept ValueError as e:\n    b\nfinally:\n    c\n");
    let Syn::Try {
        excepts,
        finally_suite,
        ..
    } = &stmts(&parsed)[0].kind
    else {
        panic!("expected try");
    };
    assert_eq!(excepts.len(), 1);
    assert!(excepts[0].as_target.is_some());
    assert!(finally_suite.is_some());
    assert!(module_err("try:\n    a\n").contains("except or finally"));
    assert!(module_err("try:\n    a\nexcept:\n    b\nexcept ValueError:\n    c\n")
        .contains("must be last"));
}

#[test]
fn class_with_bases() {
    let parsed = module("class Foo(Base):\n    a = 1\n");
    let Syn::ClassDef { bases, .. } = &stmts(&parsed)[0].kind else {
        panic!("expected class");
    };
    assert_eq!(bases.len(), 1);
}

#[test]
fn import_forms() {
    let parsed = module("import a, b\nfrom c import d, e\n");
    assert!(matches!(stmts(&parsed)[0].kind, Syn::Import(ref names) if names.len() == 2));
    assert!(
        matches!(stmts(&parsed)[1].kind, Syn::From { ref names, .. } if names.len() == 2)
    );
}

#[test]
fn suite_on_the_same_line() {
    let parsed = module("if x: y\n");
    let Syn::If { branches, .. } = &stmts(&parsed)[0].kind else {
        panic!("expected if");
    };
    assert!(matches!(branches[0].suite.kind, Syn::Block(_)));
}

#[test]
fn for_else_and_while_else() {
    let parsed = module("for i in xs:\n    a\nelse:\n    b\n");
    assert!(matches!(
        stmts(&parsed)[0].kind,
        Syn::For {
            else_suite: Some(_),
            ..
        }
    ));
    let parsed = module("while x:\n    a\nelse:\n    b\n");
    assert!(matches!(
        stmts(&parsed)[0].kind,
        Syn::While {
            else_suite: Some(_),
            ..
        }
    ));
}
