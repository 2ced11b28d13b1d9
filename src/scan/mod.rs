//! Tokenizer: declarative token vocabularies compiled into a priority-ordered
//! regex matcher.
//!
//! A [`Vocabulary`] is an ordered list of [`TokenClass`] declarations. Before
//! any matching happens the declarations are validated as a whole
//! ([`validation`]) and compiled into a [`CompiledMatcher`]
//! ([`matcher`]): every pattern is re-anchored to match only at the start of
//! the remaining input, and per-pattern metadata (output group, longer
//! alternative, line-terminator sensitivity) is resolved to table indices.
//!
//! The [`Lexer`] then repeatedly applies the table to the remaining input:
//! first declared pattern that matches wins, subject to the declared
//! longer-alternative override. Unmatched input is collected as [`LexError`]s
//! rather than aborting, so one run reports every lexical problem.
//!
//! ```text
//! Vocabulary (TokenClass*)
//!     ↓ validation  → Vec<LexerDefinitionError> (all checks, collected)
//!     ↓ matcher     → CompiledMatcher (anchored, declaration-ordered)
//!     ↓ Lexer       → tokens + named group buckets + lexical errors
//! ```

mod lexer;
mod matcher;
mod tokens;
mod validation;

pub use lexer::{LexError, Lexer, LexerOutput};
pub use matcher::{CompiledMatcher, count_line_terminators};
pub use tokens::{PatternSpec, Token, TokenClass, TokenGroup, TokenKind, Vocabulary};
pub use validation::{LexerDefinitionError, validate};
