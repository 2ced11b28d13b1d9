//! The tokenizer runtime: applies a compiled matcher table to input text.

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use crate::base::{Position, Span};

use super::matcher::{CompiledMatcher, count_line_terminators};
use super::tokens::{Token, TokenGroup, Vocabulary};
use super::validation::LexerDefinitionError;

/// A single stretch of input no pattern matched. Collected, not fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected character '{character}' at {position}")]
pub struct LexError {
    pub offset: usize,
    pub position: Position,
    pub character: char,
}

/// Everything one tokenizer run produces.
#[derive(Debug, Clone, Default)]
pub struct LexerOutput {
    /// Main token sequence, in input order.
    pub tokens: Vec<Token>,
    /// Named bucket -> tokens routed to it. Every declared bucket is present,
    /// even when empty.
    pub groups: IndexMap<SmolStr, Vec<Token>>,
    /// All lexical errors of the run, in input order.
    pub errors: Vec<LexError>,
}

/// Tokenizer over a validated, compiled vocabulary.
///
/// Holds no per-run state; each [`Lexer::tokenize`] call owns its own cursor,
/// so one lexer can serve any number of inputs.
#[derive(Debug)]
pub struct Lexer {
    matcher: CompiledMatcher,
}

impl Lexer {
    /// Validate and compile `vocab`. All definition errors are reported
    /// together; a lexer is only constructed from a fully valid vocabulary.
    pub fn new(vocab: &Vocabulary) -> Result<Self, Vec<LexerDefinitionError>> {
        Ok(Self {
            matcher: CompiledMatcher::build(vocab)?,
        })
    }

    pub fn matcher(&self) -> &CompiledMatcher {
        &self.matcher
    }

    /// Tokenize `text` from start to end, collecting tokens, group buckets
    /// and lexical errors in one pass.
    pub fn tokenize(&self, text: &str) -> LexerOutput {
        let mut out = LexerOutput::default();
        for name in &self.matcher.named_groups {
            out.groups.entry(name.clone()).or_default();
        }

        let mut offset = 0;
        let mut line = 1;
        let mut column = 1;

        while offset < text.len() {
            let rest = &text[offset..];
            match self.match_at(rest) {
                Some((table_idx, matched)) => {
                    let pattern = &self.matcher.patterns[table_idx];
                    let start = Position::new(line, column);
                    self.advance_position(table_idx, matched, &mut line, &mut column);
                    let end = Position::new(line, column);
                    let token = Token::new(
                        pattern.kind,
                        matched,
                        offset,
                        Span::new(start, end),
                    );
                    match &pattern.group {
                        TokenGroup::Default => out.tokens.push(token),
                        TokenGroup::Named(name) => {
                            out.groups.entry(name.clone()).or_default().push(token);
                        }
                        TokenGroup::Skipped => {}
                        // Category classes never enter the matcher table.
                        TokenGroup::NotApplicable => {}
                    }
                    offset += matched.len();
                }
                None => {
                    // Unmatched input: record and advance one char so the
                    // rest of the text still gets tokenized.
                    let character = rest.chars().next().unwrap_or('\u{FFFD}');
                    out.errors.push(LexError {
                        offset,
                        position: Position::new(line, column),
                        character,
                    });
                    if character == '\n'
                        || (character == '\r' && !rest[1..].starts_with('\n'))
                    {
                        line += 1;
                        column = 1;
                    } else if character != '\r' {
                        column += 1;
                    }
                    offset += character.len_utf8();
                }
            }
        }

        debug!(
            tokens = out.tokens.len(),
            errors = out.errors.len(),
            "tokenized input"
        );
        out
    }

    /// First table entry matching the remaining input wins, subject to the
    /// longer-alternative override. Zero-width matches are treated as no
    /// match: a token must consume input, or the scan position could never
    /// advance past a nullable pattern.
    fn match_at<'t>(&self, rest: &'t str) -> Option<(usize, &'t str)> {
        for (idx, pattern) in self.matcher.patterns.iter().enumerate() {
            let Some(found) = pattern.regex.find(rest) else {
                continue;
            };
            if found.as_str().is_empty() {
                continue;
            }
            if let Some(alt_idx) = pattern.longer_alt {
                let alt = &self.matcher.patterns[alt_idx];
                if let Some(alt_found) = alt.regex.find(rest) {
                    if alt_found.end() > found.end() {
                        return Some((alt_idx, alt_found.as_str()));
                    }
                }
            }
            return Some((idx, found.as_str()));
        }
        None
    }

    fn advance_position(
        &self,
        table_idx: usize,
        matched: &str,
        line: &mut usize,
        column: &mut usize,
    ) {
        if !self.matcher.patterns[table_idx].can_match_line_terminator {
            *column += matched.chars().count();
            return;
        }
        let terminators = count_line_terminators(matched);
        if terminators == 0 {
            *column += matched.chars().count();
        } else {
            *line += terminators;
            let tail_start = matched
                .rfind(['\n', '\r'])
                .map(|i| i + 1)
                .unwrap_or(0);
            *column = matched[tail_start..].chars().count() + 1;
        }
    }
}
