//! Error taxonomy for grammar definition and parsing.
//!
//! Definition errors ([`GrammarError`]) are detected once, ahead of any real
//! parse, and are fatal to grammar construction; they are aggregated and
//! reported together. Parse-time errors ([`ParseError`]) are local failures
//! carrying the rule and decision context plus the actual next token; they
//! propagate up the rule-call chain unless a recoverable rule traps them.

use smol_str::SmolStr;
use thiserror::Error;

use crate::scan::{LexerDefinitionError, Token};

/// A definition error found by grammar self-analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("token class definition error: {0}")]
    TokenClass(#[from] LexerDefinitionError),

    #[error("rule '{0}' was declared but never defined")]
    UndefinedRule(SmolStr),

    #[error("rule '{0}' contains an alternation with no alternatives")]
    EmptyAlternation(SmolStr),

    #[error("rule '{rule}' mixes gated and ungated alternatives in one alternation")]
    InconsistentGates { rule: SmolStr },

    #[error(
        "rule '{rule}', {construct}: alternatives {alternatives:?} are ambiguous \
         on lookahead [{}]; reorder them, widen their prefixes or mark the \
         alternation ignore_ambiguities",
        .tokens.join(", ")
    )]
    AmbiguousAlternatives {
        rule: SmolStr,
        construct: SmolStr,
        /// 1-based ordinals of the colliding alternatives, in declaration order.
        alternatives: Vec<usize>,
        /// Names of the overlapping token kinds.
        tokens: Vec<SmolStr>,
    },
}

/// A parse-time failure, local to one decision point or terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("in rule '{rule}': expected token '{expected}' but found {}", found_text(.found))]
    UnexpectedToken {
        rule: SmolStr,
        expected: SmolStr,
        found: Option<Token>,
    },

    #[error(
        "in rule '{rule}': {construct} expected at least one occurrence but found {}",
        found_text(.found)
    )]
    EarlyExit {
        rule: SmolStr,
        construct: SmolStr,
        found: Option<Token>,
    },

    #[error(
        "in rule '{rule}': {construct} matched none of the expected tokens [{}]; found {}",
        .expected.join(", "),
        found_text(.found)
    )]
    NoViableAlternative {
        rule: SmolStr,
        construct: SmolStr,
        /// Names of the token kinds any alternative could start with.
        expected: Vec<SmolStr>,
        found: Option<Token>,
    },
}

fn found_text(found: &Option<Token>) -> String {
    match found {
        Some(token) => format!("'{}' at {}", token.text, token.span.start),
        None => "end of input".to_string(),
    }
}
