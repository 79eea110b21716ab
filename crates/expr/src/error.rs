// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors for the expression language: lexing, parsing, and evaluation.

use crate::token::{LexError, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("unexpected token {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: TokenKind,
        expected: String,
        pos: usize,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    #[error("{func} expected {expected} arguments, got {got}")]
    ArityMismatch {
        func: String,
        expected: String,
        got: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("indexed value is not a sequence: {0}")]
    NotASequence(String),
}

pub type ExprResult<T> = Result<T, ExprError>;
