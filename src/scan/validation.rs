//! Structural validation of a token vocabulary.
//!
//! All checks run independently and every finding is collected; validation
//! never stops at the first error. Classes failing the missing/invalid
//! pattern checks are excluded from the later checks so one bad declaration
//! does not cascade into spurious findings.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use thiserror::Error;

use super::tokens::{TokenClass, TokenGroup, Vocabulary};

/// A definition error in a token vocabulary. Fatal to matcher construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerDefinitionError {
    #[error("token class '{0}' is missing a pattern")]
    MissingPattern(SmolStr),

    #[error("token class '{name}' has an invalid pattern: {reason}")]
    InvalidPattern { name: SmolStr, reason: String },

    #[error("token class '{0}' pattern may not contain the end-of-input anchor '$'")]
    EoiAnchorFound(SmolStr),

    #[error("token class '{0}' pattern may not use the global or multiline flags")]
    UnsupportedFlagsFound(SmolStr),

    #[error("the pattern /{pattern}/ is shared by token classes: {}", .names.join(", "))]
    DuplicatePatternsFound {
        pattern: SmolStr,
        names: Vec<SmolStr>,
    },

    #[error("token class '{0}' declares a named group with an empty name")]
    InvalidGroupTypeFound(SmolStr),
}

// Un-escaped '$' after any non-backslash character. A purely syntactic test,
// matching the matcher's contract that anchoring is always relative to the
// remaining input.
static EOI_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\\]\$").expect("hardcoded pattern compiles"));

/// Validate every class of a vocabulary, collecting all findings.
pub fn validate(vocab: &Vocabulary) -> Vec<LexerDefinitionError> {
    let mut errors = Vec::new();

    // Classes surviving the missing/invalid checks, as indices in
    // declaration order. Category classes are never matchable and are
    // exempt from pattern checks entirely.
    let mut valid: Vec<usize> = Vec::new();

    for (idx, class) in vocab.classes().enumerate() {
        if class.group == TokenGroup::NotApplicable {
            continue;
        }
        let Some(spec) = &class.pattern else {
            errors.push(LexerDefinitionError::MissingPattern(class.name.clone()));
            continue;
        };
        match Regex::new(spec.source.as_str()) {
            Ok(_) => valid.push(idx),
            Err(err) => errors.push(LexerDefinitionError::InvalidPattern {
                name: class.name.clone(),
                reason: err.to_string(),
            }),
        }
    }

    errors.extend(find_eoi_anchors(vocab, &valid));
    errors.extend(find_unsupported_flags(vocab, &valid));
    errors.extend(find_duplicate_patterns(vocab, &valid));
    errors.extend(find_invalid_group_types(vocab));

    errors
}

fn class_pattern<'v>(vocab: &'v Vocabulary, idx: usize) -> Option<(&'v TokenClass, &'v str)> {
    let class = vocab.classes().nth(idx)?;
    let spec = class.pattern.as_ref()?;
    Some((class, spec.source.as_str()))
}

fn find_eoi_anchors(vocab: &Vocabulary, valid: &[usize]) -> Vec<LexerDefinitionError> {
    valid
        .iter()
        .filter_map(|&idx| class_pattern(vocab, idx))
        .filter(|(_, source)| EOI_ANCHOR.is_match(source))
        .map(|(class, _)| LexerDefinitionError::EoiAnchorFound(class.name.clone()))
        .collect()
}

fn find_unsupported_flags(vocab: &Vocabulary, valid: &[usize]) -> Vec<LexerDefinitionError> {
    valid
        .iter()
        .filter_map(|&idx| vocab.classes().nth(idx))
        .filter(|class| {
            class
                .pattern
                .as_ref()
                .is_some_and(|spec| spec.multiline || spec.global)
        })
        .map(|class| LexerDefinitionError::UnsupportedFlagsFound(class.name.clone()))
        .collect()
}

/// One error per equivalence class of byte-identical pattern sources; each
/// class is reported in at most one group.
fn find_duplicate_patterns(vocab: &Vocabulary, valid: &[usize]) -> Vec<LexerDefinitionError> {
    let mut errors = Vec::new();
    let mut reported: Vec<usize> = Vec::new();

    for (i, &idx) in valid.iter().enumerate() {
        if reported.contains(&idx) {
            continue;
        }
        let Some((_, source)) = class_pattern(vocab, idx) else {
            continue;
        };
        let mut set: Vec<usize> = vec![idx];
        for &other in &valid[i + 1..] {
            if class_pattern(vocab, other).is_some_and(|(_, s)| s == source) {
                set.push(other);
            }
        }
        if set.len() > 1 {
            reported.extend(&set);
            errors.push(LexerDefinitionError::DuplicatePatternsFound {
                pattern: SmolStr::new(source),
                names: set
                    .iter()
                    .filter_map(|&j| vocab.classes().nth(j))
                    .map(|c| c.name.clone())
                    .collect(),
            });
        }
    }

    errors
}

// The typed `TokenGroup` enum rules out most of the invalid group values a
// stringly-typed declaration could carry; an empty bucket name is the one
// invalid value still representable.
fn find_invalid_group_types(vocab: &Vocabulary) -> Vec<LexerDefinitionError> {
    vocab
        .classes()
        .filter(|class| matches!(&class.group, TokenGroup::Named(name) if name.is_empty()))
        .map(|class| LexerDefinitionError::InvalidGroupTypeFound(class.name.clone()))
        .collect()
}
