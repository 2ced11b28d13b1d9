//! Compilation of a validated vocabulary into an ordered matcher table.
//!
//! Compiling is a pure function of the declarations: the same vocabulary
//! always yields a matcher that tokenizes any input identically.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::tokens::{PatternSpec, TokenGroup, TokenKind, Vocabulary};
use super::validation::{LexerDefinitionError, validate};

/// One entry of the matcher table.
#[derive(Debug)]
pub(crate) struct CompiledPattern {
    pub regex: Regex,
    pub kind: TokenKind,
    pub group: TokenGroup,
    /// Table index of the preferred longer alternative, if declared.
    pub longer_alt: Option<usize>,
    /// Whether the pattern can possibly match a line terminator. Conservative
    /// (false positives acceptable); undercounting would corrupt line/column
    /// tracking.
    pub can_match_line_terminator: bool,
}

/// Priority-ordered, start-anchored matcher table. Immutable once built.
#[derive(Debug)]
pub struct CompiledMatcher {
    pub(crate) patterns: Vec<CompiledPattern>,
    /// Named buckets declared in the vocabulary, in declaration order, so the
    /// tokenizer output always contains every bucket even when empty.
    pub(crate) named_groups: Vec<SmolStr>,
}

impl CompiledMatcher {
    /// Validate and compile a vocabulary. Either a complete matcher or the
    /// full list of definition errors; never a partial success.
    pub fn build(vocab: &Vocabulary) -> Result<Self, Vec<LexerDefinitionError>> {
        let errors = validate(vocab);
        if !errors.is_empty() {
            return Err(errors);
        }

        // Matchable classes in declaration order; category classes are
        // grammar-only and never enter the table.
        let matchable: Vec<(TokenKind, &PatternSpec, &TokenGroup, Option<TokenKind>)> = vocab
            .classes()
            .enumerate()
            .filter(|(_, class)| class.group != TokenGroup::NotApplicable)
            .filter_map(|(idx, class)| {
                class.pattern.as_ref().map(|spec| {
                    (
                        TokenKind(idx as u32),
                        spec,
                        &class.group,
                        class.longer_alt,
                    )
                })
            })
            .collect();

        let kind_to_table: FxHashMap<TokenKind, usize> = matchable
            .iter()
            .enumerate()
            .map(|(table_idx, (kind, ..))| (*kind, table_idx))
            .collect();

        let mut patterns = Vec::with_capacity(matchable.len());
        let mut compile_errors = Vec::new();
        for (kind, spec, group, longer_alt) in &matchable {
            match Regex::new(&add_start_of_input(spec)) {
                Ok(regex) => patterns.push(CompiledPattern {
                    regex,
                    kind: *kind,
                    group: (*group).clone(),
                    longer_alt: longer_alt.and_then(|alt| kind_to_table.get(&alt).copied()),
                    can_match_line_terminator: can_match_line_terminator(spec.source.as_str()),
                }),
                Err(err) => compile_errors.push(LexerDefinitionError::InvalidPattern {
                    name: SmolStr::new(vocab.name(*kind)),
                    reason: err.to_string(),
                }),
            }
        }
        if !compile_errors.is_empty() {
            return Err(compile_errors);
        }

        let named_groups = vocab
            .classes()
            .filter_map(|class| match &class.group {
                TokenGroup::Named(name) => Some(name.clone()),
                _ => None,
            })
            .collect();

        Ok(Self {
            patterns,
            named_groups,
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Wrap a pattern so it can only match at the very start of the remaining
/// input. Only the case-insensitivity flag is preserved.
fn add_start_of_input(spec: &PatternSpec) -> String {
    if spec.case_insensitive {
        format!("(?i)^(?:{})", spec.source)
    } else {
        format!("^(?:{})", spec.source)
    }
}

// Escape sequences in a pattern source that can textually match a line
// terminator.
static LINE_TERMINATOR_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\n|\\r|\\s").expect("hardcoded pattern compiles"));

/// Syntactic check whether a pattern source could match a line terminator.
pub(crate) fn can_match_line_terminator(source: &str) -> bool {
    LINE_TERMINATOR_HINT.is_match(source) || source.contains('\n') || source.contains('\r')
}

/// Count line terminators the way the tokenizer advances lines: `\n` counts,
/// `\r` counts unless immediately followed by `\n` (so `\r\n` is one).
pub fn count_line_terminators(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => count += 1,
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::tokens::TokenClass;

    #[test]
    fn anchoring_preserves_only_case_insensitivity() {
        assert_eq!(add_start_of_input(&PatternSpec::new("ab|c")), "^(?:ab|c)");
        assert_eq!(
            add_start_of_input(&PatternSpec::case_insensitive("select")),
            "(?i)^(?:select)"
        );
    }

    #[test]
    fn category_classes_are_excluded_from_the_table() {
        let mut vocab = Vocabulary::new();
        vocab.add(TokenClass::new("A", "a"));
        vocab.add(TokenClass::category("Abstract"));
        vocab.add(TokenClass::new("B", "b"));
        let matcher = CompiledMatcher::build(&vocab).expect("valid vocabulary");
        assert_eq!(matcher.len(), 2);
        assert_eq!(matcher.patterns[1].kind, TokenKind(2));
    }

    #[test]
    fn longer_alt_resolves_to_table_index() {
        let ident = TokenKind(1);
        let mut vocab = Vocabulary::new();
        vocab.add(TokenClass::new("ClassKw", "class").longer_alt(ident));
        vocab.add(TokenClass::new("Ident", "[a-z]+"));
        let matcher = CompiledMatcher::build(&vocab).expect("valid vocabulary");
        assert_eq!(matcher.patterns[0].longer_alt, Some(1));
        assert_eq!(matcher.patterns[1].longer_alt, None);
    }

    #[test]
    fn line_terminator_hint_is_conservative() {
        assert!(can_match_line_terminator(r"\s+"));
        assert!(can_match_line_terminator(r"a\nb"));
        assert!(can_match_line_terminator(r"\r\n"));
        assert!(!can_match_line_terminator("[a-z]+"));
        // '\s' anywhere in the source flags, even inside a class.
        assert!(can_match_line_terminator(r"[\s]"));
    }

    #[test]
    fn counts_line_terminators_like_the_tokenizer() {
        assert_eq!(count_line_terminators("no newline"), 0);
        assert_eq!(count_line_terminators("a\nb\nc"), 2);
        assert_eq!(count_line_terminators("a\r\nb"), 1);
        assert_eq!(count_line_terminators("a\rb"), 1);
        assert_eq!(count_line_terminators("\r"), 1);
    }

    #[test]
    fn build_is_deterministic() {
        let mut vocab = Vocabulary::new();
        vocab.add(TokenClass::new("Int", "[0-9]+"));
        vocab.add(TokenClass::new("Plus", "\\+"));
        let a = CompiledMatcher::build(&vocab).expect("valid vocabulary");
        let b = CompiledMatcher::build(&vocab).expect("valid vocabulary");
        assert_eq!(a.len(), b.len());
        for (x, y) in a.patterns.iter().zip(&b.patterns) {
            assert_eq!(x.regex.as_str(), y.regex.as_str());
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.longer_alt, y.longer_alt);
        }
    }
}
