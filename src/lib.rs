//! # descent
//!
//! A parser-construction toolkit: tokenizers compiled from declarative token
//! class tables, and grammars that analyze themselves before the first parse.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! diagram   → Plain-text rendering of recorded grammars
//!   ↓
//! parse     → Grammar DSL, self-analysis, lookahead engine, runtime parser
//!   ↓
//! scan      → Token classes, pattern validation/compilation, tokenizer
//!   ↓
//! base      → Primitives (Position, Span)
//! ```
//!
//! A [`scan::Lexer`] is built from a [`scan::Vocabulary`] of token classes;
//! every definition problem is reported up front, and only a fully valid
//! vocabulary compiles. A [`parse::Grammar`] is built the same way: rules are
//! recorded, structural problems and ambiguous alternations are aggregated
//! into one error report, and only a valid grammar parses. At parse time each
//! decision construct computes its lookahead function once and reuses it via
//! the grammar's cache.

/// Foundation types: Position, Span
pub mod base;

/// Tokenization: token classes, pattern compilation, the lexer runtime
pub mod scan;

/// Grammars: combinator DSL, self-analysis, lookahead, the parser runtime
pub mod parse;

/// Grammar outlines for inspection and debugging
pub mod diagram;

pub use base::{Position, Span};
pub use scan::{Lexer, LexerOutput, Token, TokenClass, TokenKind, Vocabulary};
pub use parse::{Grammar, GrammarBuilder, Parser, RuleId};
