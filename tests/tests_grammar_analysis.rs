//! Grammar self-analysis: every definition problem is found before the first
//! parse, and all findings arrive in one aggregated report.

use descent::parse::dsl::*;
use descent::parse::{Gate, GrammarError};
use descent::scan::TokenClass;
use descent::{GrammarBuilder, TokenKind, Vocabulary};

const ONE: TokenKind = TokenKind(0);
const TWO: TokenKind = TokenKind(1);
const THREE: TokenKind = TokenKind(2);

fn vocabulary() -> Vocabulary {
    let mut vocab = Vocabulary::new();
    vocab.add(TokenClass::new("One", "1"));
    vocab.add(TokenClass::new("Two", "2"));
    vocab.add(TokenClass::new("Three", "3"));
    vocab
}

#[test]
fn valid_grammars_build() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule("r", seq([term(ONE), optional(term(TWO))]));
    assert!(b.build().is_ok());
}

#[test]
fn all_definition_problems_are_reported_together() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.declare("never_defined");
    b.rule("empty_alt", or(vec![]));
    b.rule(
        "ambiguous",
        or(vec![term(ONE), seq([term(ONE), term(TWO)])]),
    );
    let errors = b.build().expect_err("invalid grammar");
    assert_eq!(errors.len(), 3);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, GrammarError::UndefinedRule(name) if name == "never_defined"))
    );
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, GrammarError::EmptyAlternation(name) if name == "empty_alt"))
    );
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, GrammarError::AmbiguousAlternatives { .. }))
    );
}

#[test]
fn vocabulary_problems_surface_as_grammar_errors() {
    let mut vocab = Vocabulary::new();
    vocab.add(TokenClass::new("A", "x"));
    vocab.add(TokenClass::new("B", "x"));
    let mut b = GrammarBuilder::new(vocab);
    b.rule("r", term(TokenKind(0)));
    let errors = b.build().expect_err("invalid vocabulary");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, GrammarError::TokenClass(_)))
    );
}

#[test]
fn ambiguity_report_names_the_construct_and_the_overlap() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule(
        "expr",
        seq([
            term(THREE),
            or(vec![term(ONE), seq([term(ONE), term(TWO)])]),
        ]),
    );
    let errors = b.build().expect_err("invalid grammar");
    match &errors[0] {
        GrammarError::AmbiguousAlternatives {
            rule,
            construct,
            alternatives,
            tokens,
        } => {
            assert_eq!(rule, "expr");
            assert_eq!(construct, "OR1");
            assert_eq!(alternatives, &vec![1, 2]);
            assert_eq!(tokens.as_slice(), ["One"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn alternatives_separable_within_the_window_are_accepted() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule(
        "deep",
        or(vec![
            seq([term(ONE), term(TWO), term(THREE)]),
            seq([term(ONE), term(TWO), term(ONE)]),
        ]),
    );
    assert!(b.build().is_ok());
}

#[test]
fn overlap_beyond_the_window_is_an_ambiguity() {
    let prefix = |last| {
        seq([
            term(ONE),
            term(ONE),
            term(ONE),
            term(ONE),
            term(last),
        ])
    };
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule("too_deep", or(vec![prefix(TWO), prefix(THREE)]));
    let errors = b.build().expect_err("invalid grammar");
    assert!(matches!(
        errors[0],
        GrammarError::AmbiguousAlternatives { .. }
    ));
}

#[test]
fn ignore_ambiguities_opts_out_of_the_check() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule(
        "overlapping",
        or_ignore_ambiguities(vec![term(ONE), seq([term(ONE), term(TWO)])]),
    );
    assert!(b.build().is_ok());
}

#[test]
fn fully_gated_alternations_skip_ambiguity_analysis() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule(
        "gated",
        or_gated(vec![
            alt_gated(Gate::next_is(ONE), term(ONE)),
            alt_gated(Gate::new(|_| true), seq([term(ONE), term(TWO)])),
        ]),
    );
    assert!(b.build().is_ok());
}

#[test]
fn mixing_gated_and_ungated_alternatives_is_rejected() {
    let mut b = GrammarBuilder::new(vocabulary());
    b.rule(
        "mixed",
        or_gated(vec![
            alt_gated(Gate::next_is(ONE), term(ONE)),
            alt(term(TWO)),
        ]),
    );
    let errors = b.build().expect_err("invalid grammar");
    assert!(matches!(errors[0], GrammarError::InconsistentGates { .. }));
}

#[test]
fn analysis_recurses_into_referenced_rules() {
    let mut b = GrammarBuilder::new(vocabulary());
    let leading = b.declare("leading");
    b.rule(
        "chooser",
        or(vec![
            seq([subrule(leading), term(TWO)]),
            seq([subrule(leading), term(THREE)]),
        ]),
    );
    b.define(leading, term(ONE));
    // Both alternatives start with One; Two/Three at depth two separate them.
    assert!(b.build().is_ok());
}
