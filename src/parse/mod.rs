//! Grammar definition, self-analysis and the lookahead-driven runtime.
//!
//! A grammar is declared as data: rule bodies are [`GrammarNode`] combinator
//! trees built with the [`dsl`] helpers and assembled by a [`GrammarBuilder`].
//! Building records every rule into a production model, validates the
//! definition and analyzes every ungated alternation for ambiguity; only a
//! fully valid definition yields a [`Grammar`].
//!
//! At parse time every decision construct is driven by a computed lookahead
//! function, fetched from the grammar's [`LookaheadCache`] and computed on
//! first encounter. Constructs carrying an explicit [`Gate`] consult the
//! predicate instead and never touch the cache.

mod cache;
mod errors;
mod grammar;
mod lookahead;
mod parser;
mod production;

pub use cache::{DecisionKey, LookaheadCache};
pub use errors::{GrammarError, ParseError};
pub use grammar::{
    Alternative, Gate, Grammar, GrammarBuilder, GrammarNode, Peek, Rule, RuleId, dsl,
};
pub use lookahead::{Analyzer, LookaheadFn, MAX_LOOKAHEAD};
pub use parser::{CstChild, CstNode, Parser};
pub use production::{DecisionKind, DecisionNode, GrammarModel, Production};
