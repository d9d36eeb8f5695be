// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Lexer for Adder source code.
//!
//! Produces a token stream with the indentation structure made explicit:
//! `Newline` terminates a logical line, `Indent`/`Dedent` bracket suites.
//! Physical newlines inside parentheses, brackets or braces are plain
//! whitespace. Comments start with `#` and run to end of line.

use adder_core::{IntLiteral, Pos, parse_int_literal};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Keywords of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    NonLocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    Yield,
}

impl Keyword {
    fn from_ident(text: &str) -> Option<Self> {
        Some(match text {
            "and" => Self::And,
            "as" => Self::As,
            "assert" => Self::Assert,
            "break" => Self::Break,
            "class" => Self::Class,
            "continue" => Self::Continue,
            "def" => Self::Def,
            "del" => Self::Del,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "except" => Self::Except,
            "finally" => Self::Finally,
            "for" => Self::For,
            "from" => Self::From,
            "global" => Self::Global,
            "if" => Self::If,
            "import" => Self::Import,
            "in" => Self::In,
            "is" => Self::Is,
            "lambda" => Self::Lambda,
            "nonlocal" => Self::NonLocal,
            "not" => Self::Not,
            "or" => Self::Or,
            "pass" => Self::Pass,
            "raise" => Self::Raise,
            "return" => Self::Return,
            "try" => Self::Try,
            "while" => Self::While,
            "yield" => Self::Yield,
            _ => return None,
        })
    }
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// End of a logical line.
    Newline,
    /// Start of an indented suite.
    Indent,
    /// End of an indented suite.
    Dedent,
    /// End of input.
    End,
    /// Integer literal.
    Int(IntLiteral),
    /// Float literal.
    Float(f64),
    /// String literal, unescaped.
    Str(String),
    /// Identifier.
    Ident(String),
    /// Keyword.
    Keyword(Keyword),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Assign,
    /// An augmented-assignment operator, e.g. `+=`.
    AugAssign(crate::ast::BinaryOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
}

/// A token and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Start position.
    pub pos: Pos,
}

/// Lexer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character that starts no token.
    #[error("unexpected character {ch:?} at {pos}")]
    BadChar { ch: char, pos: Pos },
    /// A string literal with no closing quote.
    #[error("unterminated string literal at {pos}")]
    UnterminatedString { pos: Pos },
    /// A malformed number.
    #[error("invalid number literal at {pos}")]
    BadNumber { pos: Pos },
    /// Dedent to an indentation level that was never opened.
    #[error("unindent does not match any outer indentation level at {pos}")]
    BadDedent { pos: Pos },
}

/// The lexer.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: Pos,
    indents: Vec<u32>,
    bracket_depth: u32,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over source text.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            pos: Pos::new(1, 1),
            indents: vec![0],
            bracket_depth: 0,
        }
    }

    /// Tokenize the whole input.
    ///
    /// # Errors
    ///
    /// Returns the first lexical error encountered.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut line_had_content = false;
        loop {
            if !line_had_content && self.bracket_depth == 0 {
                match self.handle_line_start(&mut tokens)? {
                    LineStart::Content => line_had_content = true,
                    LineStart::Blank => continue,
                    LineStart::End => break,
                }
            }
            let Some(&ch) = self.chars.peek() else {
                if line_had_content {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        pos: self.pos,
                    });
                }
                break;
            };
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\n' => {
                    let pos = self.pos;
                    self.advance();
                    if self.bracket_depth == 0 {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            pos,
                        });
                        line_had_content = false;
                    }
                }
                _ => {
                    tokens.push(self.token(ch)?);
                }
            }
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            tokens.push(Token {
                kind: TokenKind::Dedent,
                pos: self.pos,
            });
        }
        tokens.push(Token {
            kind: TokenKind::End,
            pos: self.pos,
        });
        Ok(tokens)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    fn skip_comment(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Measure indentation and emit `Indent`/`Dedent` tokens.
    fn handle_line_start(&mut self, tokens: &mut Vec<Token>) -> Result<LineStart, LexError> {
        let mut width: u32 = 0;
        loop {
            match self.chars.peek() {
                Some(' ') => {
                    width += 1;
                    self.advance();
                }
                Some('\t') => {
                    width = (width / 8 + 1) * 8;
                    self.advance();
                }
                Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    self.skip_comment();
                }
                Some('\n') => {
                    self.advance();
                    return Ok(LineStart::Blank);
                }
                Some(_) => break,
                None => return Ok(LineStart::End),
            }
        }
        let current = *self.indents.last().expect("indent stack never empty");
        if width > current {
            self.indents.push(width);
            tokens.push(Token {
                kind: TokenKind::Indent,
                pos: self.pos,
            });
        } else if width < current {
            while width < *self.indents.last().expect("indent stack never empty") {
                self.indents.pop();
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    pos: self.pos,
                });
            }
            if width != *self.indents.last().expect("indent stack never empty") {
                return Err(LexError::BadDedent { pos: self.pos });
            }
        }
        Ok(LineStart::Content)
    }

    fn token(&mut self, first: char) -> Result<Token, LexError> {
        let pos = self.pos;
        let kind = match first {
            '0'..='9' => return self.number(),
            '"' | '\'' => return self.string(first),
            ch if ch.is_alphabetic() || ch == '_' => return Ok(self.ident()),
            '(' => {
                self.bracket_depth += 1;
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.advance();
                TokenKind::RParen
            }
            '[' => {
                self.bracket_depth += 1;
                self.advance();
                TokenKind::LBracket
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.advance();
                TokenKind::RBracket
            }
            '{' => {
                self.bracket_depth += 1;
                self.advance();
                TokenKind::LBrace
            }
            '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.advance();
                TokenKind::RBrace
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            '~' => {
                self.advance();
                TokenKind::Tilde
            }
            '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '<' | '>' | '=' | '!' => {
                return self.operator(first);
            }
            ch => return Err(LexError::BadChar { ch, pos }),
        };
        Ok(Token { kind, pos })
    }

    fn operator(&mut self, first: char) -> Result<Token, LexError> {
        use crate::ast::BinaryOp as Op;
        let pos = self.pos;
        self.advance();
        let second = self.chars.peek().copied();
        let eat = |lexer: &mut Self| {
            lexer.advance();
        };
        let kind = match (first, second) {
            ('*', Some('*')) => {
                eat(self);
                if self.chars.peek() == Some(&'=') {
                    eat(self);
                    TokenKind::AugAssign(Op::Pow)
                } else {
                    TokenKind::DoubleStar
                }
            }
            ('/', Some('/')) => {
                eat(self);
                if self.chars.peek() == Some(&'=') {
                    eat(self);
                    TokenKind::AugAssign(Op::FloorDiv)
                } else {
                    TokenKind::DoubleSlash
                }
            }
            ('<', Some('<')) => {
                eat(self);
                if self.chars.peek() == Some(&'=') {
                    eat(self);
                    TokenKind::AugAssign(Op::LShift)
                } else {
                    TokenKind::LShift
                }
            }
            ('>', Some('>')) => {
                eat(self);
                if self.chars.peek() == Some(&'=') {
                    eat(self);
                    TokenKind::AugAssign(Op::RShift)
                } else {
                    TokenKind::RShift
                }
            }
            ('<', Some('=')) => {
                eat(self);
                TokenKind::Le
            }
            ('>', Some('=')) => {
                eat(self);
                TokenKind::Ge
            }
            ('=', Some('=')) => {
                eat(self);
                TokenKind::EqEq
            }
            ('!', Some('=')) => {
                eat(self);
                TokenKind::NotEq
            }
            ('+', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::Add)
            }
            ('-', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::Sub)
            }
            ('*', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::Mul)
            }
            ('/', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::Div)
            }
            ('%', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::Mod)
            }
            ('&', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::BitAnd)
            }
            ('|', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::BitOr)
            }
            ('^', Some('=')) => {
                eat(self);
                TokenKind::AugAssign(Op::BitXor)
            }
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('&', _) => TokenKind::Amp,
            ('|', _) => TokenKind::Pipe,
            ('^', _) => TokenKind::Caret,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('=', _) => TokenKind::Assign,
            ('!', _) => return Err(LexError::BadChar { ch: '!', pos }),
            _ => unreachable!("operator called with non-operator"),
        };
        Ok(Token { kind, pos })
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let pos = self.pos;
        let mut text = String::new();
        let first = self.advance().expect("number called at a digit");
        text.push(first);
        if first == '0' && matches!(self.chars.peek(), Some('x' | 'X')) {
            self.advance();
            let mut hex = String::new();
            while let Some(&ch) = self.chars.peek() {
                if ch.is_ascii_hexdigit() {
                    hex.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let literal =
                parse_int_literal(&hex, 16).ok_or(LexError::BadNumber { pos })?;
            return Ok(Token {
                kind: TokenKind::Int(literal),
                pos,
            });
        }
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.chars.peek() == Some(&'.') {
            // A dot starts a fraction only when a digit follows; otherwise
            // it is an attribute access on the literal.
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(char::is_ascii_digit) {
                is_float = true;
                text.push('.');
                self.advance();
                while let Some(&ch) = self.chars.peek() {
                    if ch.is_ascii_digit() {
                        text.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.chars.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.advance();
            if matches!(self.chars.peek(), Some('+' | '-')) {
                text.push(self.advance().expect("peeked sign"));
            }
            let mut digits = false;
            while let Some(&ch) = self.chars.peek() {
                if ch.is_ascii_digit() {
                    digits = true;
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            if !digits {
                return Err(LexError::BadNumber { pos });
            }
        }
        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| LexError::BadNumber { pos })?)
        } else {
            TokenKind::Int(parse_int_literal(&text, 10).ok_or(LexError::BadNumber { pos })?)
        };
        Ok(Token { kind, pos })
    }

    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let pos = self.pos;
        self.advance();
        let mut text = String::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(LexError::UnterminatedString { pos });
            };
            if ch == quote {
                break;
            }
            if ch == '\n' {
                return Err(LexError::UnterminatedString { pos });
            }
            if ch == '\\' {
                let Some(escaped) = self.advance() else {
                    return Err(LexError::UnterminatedString { pos });
                };
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    '\\' => text.push('\\'),
                    '\'' => text.push('\''),
                    '"' => text.push('"'),
                    other => {
                        // Unknown escapes are kept literally.
                        text.push('\\');
                        text.push(other);
                    }
                }
            } else {
                text.push(ch);
            }
        }
        Ok(Token {
            kind: TokenKind::Str(text),
            pos,
        })
    }

    fn ident(&mut self) -> Token {
        let pos = self.pos;
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let kind = Keyword::from_ident(&text)
            .map_or(TokenKind::Ident(text), TokenKind::Keyword);
        Token { kind, pos }
    }
}

enum LineStart {
    Content,
    Blank,
    End,
}
