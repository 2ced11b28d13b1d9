//! Grammar declaration: combinator trees, rules and the builder.
//!
//! Rule bodies are explicit data, not executable closures. A body is a
//! [`GrammarNode`] tree built from the [`dsl`] helpers; recording it into the
//! production model is a pure traversal, so there is no "trace mode" whose
//! side effects would need suppressing, and every construct's body is
//! trivially visited exactly once.
//!
//! [`GrammarBuilder::build`] is the self-analysis entry point: it validates
//! the vocabulary, records every rule, analyzes every ungated alternation
//! for ambiguity and returns either an immutable [`Grammar`] or the full
//! aggregated list of definition errors.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use tracing::debug;

use crate::scan::{Token, TokenKind, Vocabulary, validate};

use super::cache::LookaheadCache;
use super::errors::GrammarError;
use super::lookahead::Analyzer;
use super::parser::Parser;
use super::production::GrammarModel;

/// Identity of a grammar rule. Only meaningful within the grammar that
/// declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

/// Read-only window over the upcoming tokens of a live parse, handed to
/// explicit lookahead predicates.
#[derive(Debug, Clone, Copy)]
pub struct Peek<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Peek<'a> {
    pub fn new(tokens: &'a [Token], pos: usize) -> Self {
        Self { tokens, pos }
    }

    /// The next unconsumed token.
    pub fn first(&self) -> Option<&'a Token> {
        self.nth(0)
    }

    /// Lookahead `n` tokens past the next one (`nth(0) == first()`).
    pub fn nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    pub fn kind(&self, n: usize) -> Option<TokenKind> {
        self.nth(n).map(|t| t.kind)
    }
}

/// A user-supplied lookahead predicate. Decisions carrying a gate bypass
/// automatic lookahead computation and the cache entirely.
#[derive(Clone)]
pub struct Gate(Arc<dyn Fn(Peek<'_>) -> bool + Send + Sync>);

impl Gate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Peek<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Convenience gate: next token is of `kind`.
    pub fn next_is(kind: TokenKind) -> Self {
        Self::new(move |peek| peek.kind(0) == Some(kind))
    }

    pub fn check(&self, peek: Peek<'_>) -> bool {
        (self.0)(peek)
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Gate(..)")
    }
}

/// One alternative of an alternation, optionally gated.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub gate: Option<Gate>,
    pub body: GrammarNode,
}

/// A rule body: ordinary control-flow-like combinators as data.
#[derive(Debug, Clone)]
pub enum GrammarNode {
    /// Consume one token of this class.
    Terminal(TokenKind),
    /// Invoke another rule.
    Rule(RuleId),
    Sequence(Vec<GrammarNode>),
    /// Zero or one.
    Option {
        gate: Option<Gate>,
        body: Box<GrammarNode>,
    },
    /// Zero or more.
    Many {
        gate: Option<Gate>,
        body: Box<GrammarNode>,
    },
    /// Zero or more, separator-gated continuation.
    ManySep {
        separator: TokenKind,
        gate: Option<Gate>,
        body: Box<GrammarNode>,
    },
    /// One or more; zero matches is a parse failure.
    AtLeastOne {
        gate: Option<Gate>,
        body: Box<GrammarNode>,
    },
    /// One or more, separator-gated continuation.
    AtLeastOneSep {
        separator: TokenKind,
        gate: Option<Gate>,
        body: Box<GrammarNode>,
    },
    /// Ordered alternation; first matching alternative wins.
    Or {
        alternatives: Vec<Alternative>,
        ignore_ambiguities: bool,
    },
}

/// Free-function builders for [`GrammarNode`] trees.
pub mod dsl {
    use super::{Alternative, Gate, GrammarNode, RuleId};
    use crate::scan::TokenKind;

    pub fn term(kind: TokenKind) -> GrammarNode {
        GrammarNode::Terminal(kind)
    }

    pub fn subrule(rule: RuleId) -> GrammarNode {
        GrammarNode::Rule(rule)
    }

    pub fn seq(items: impl IntoIterator<Item = GrammarNode>) -> GrammarNode {
        GrammarNode::Sequence(items.into_iter().collect())
    }

    pub fn optional(body: GrammarNode) -> GrammarNode {
        GrammarNode::Option {
            gate: None,
            body: Box::new(body),
        }
    }

    pub fn optional_gated(gate: Gate, body: GrammarNode) -> GrammarNode {
        GrammarNode::Option {
            gate: Some(gate),
            body: Box::new(body),
        }
    }

    pub fn many(body: GrammarNode) -> GrammarNode {
        GrammarNode::Many {
            gate: None,
            body: Box::new(body),
        }
    }

    pub fn many_gated(gate: Gate, body: GrammarNode) -> GrammarNode {
        GrammarNode::Many {
            gate: Some(gate),
            body: Box::new(body),
        }
    }

    pub fn many_sep(separator: TokenKind, body: GrammarNode) -> GrammarNode {
        GrammarNode::ManySep {
            separator,
            gate: None,
            body: Box::new(body),
        }
    }

    pub fn many_sep_gated(separator: TokenKind, gate: Gate, body: GrammarNode) -> GrammarNode {
        GrammarNode::ManySep {
            separator,
            gate: Some(gate),
            body: Box::new(body),
        }
    }

    pub fn at_least_one(body: GrammarNode) -> GrammarNode {
        GrammarNode::AtLeastOne {
            gate: None,
            body: Box::new(body),
        }
    }

    pub fn at_least_one_gated(gate: Gate, body: GrammarNode) -> GrammarNode {
        GrammarNode::AtLeastOne {
            gate: Some(gate),
            body: Box::new(body),
        }
    }

    pub fn at_least_one_sep(separator: TokenKind, body: GrammarNode) -> GrammarNode {
        GrammarNode::AtLeastOneSep {
            separator,
            gate: None,
            body: Box::new(body),
        }
    }

    pub fn at_least_one_sep_gated(
        separator: TokenKind,
        gate: Gate,
        body: GrammarNode,
    ) -> GrammarNode {
        GrammarNode::AtLeastOneSep {
            separator,
            gate: Some(gate),
            body: Box::new(body),
        }
    }

    pub fn alt(body: GrammarNode) -> Alternative {
        Alternative { gate: None, body }
    }

    pub fn alt_gated(gate: Gate, body: GrammarNode) -> Alternative {
        Alternative {
            gate: Some(gate),
            body,
        }
    }

    pub fn or(alternatives: Vec<GrammarNode>) -> GrammarNode {
        GrammarNode::Or {
            alternatives: alternatives.into_iter().map(alt).collect(),
            ignore_ambiguities: false,
        }
    }

    /// Alternation resolving overlapping alternatives by declaration order
    /// instead of failing analysis.
    pub fn or_ignore_ambiguities(alternatives: Vec<GrammarNode>) -> GrammarNode {
        GrammarNode::Or {
            alternatives: alternatives.into_iter().map(alt).collect(),
            ignore_ambiguities: true,
        }
    }

    pub fn or_gated(alternatives: Vec<Alternative>) -> GrammarNode {
        GrammarNode::Or {
            alternatives,
            ignore_ambiguities: false,
        }
    }
}

/// A named rule: body plus its error-tolerance marker.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: SmolStr,
    pub body: GrammarNode,
    /// When true, a failure inside the body is recorded on the parser and
    /// the rule yields an empty node instead of propagating.
    pub recoverable: bool,
}

/// Declares rules against a vocabulary and assembles a [`Grammar`].
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    vocabulary: Vocabulary,
    names: Vec<SmolStr>,
    bodies: Vec<Option<GrammarNode>>,
    recoverable: Vec<bool>,
}

impl GrammarBuilder {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            names: Vec::new(),
            bodies: Vec::new(),
            recoverable: Vec::new(),
        }
    }

    /// Declare a rule name ahead of its definition, for forward and cyclic
    /// references.
    pub fn declare(&mut self, name: &str) -> RuleId {
        let id = RuleId(self.names.len() as u32);
        self.names.push(SmolStr::new(name));
        self.bodies.push(None);
        self.recoverable.push(false);
        id
    }

    pub fn define(&mut self, rule: RuleId, body: GrammarNode) {
        if let Some(slot) = self.bodies.get_mut(rule.0 as usize) {
            *slot = Some(body);
        }
    }

    /// Declare and define in one step.
    pub fn rule(&mut self, name: &str, body: GrammarNode) -> RuleId {
        let id = self.declare(name);
        self.define(id, body);
        id
    }

    /// Mark a rule error-tolerant: on body failure it records the error and
    /// yields an empty node.
    pub fn recoverable(&mut self, rule: RuleId) {
        if let Some(slot) = self.recoverable.get_mut(rule.0 as usize) {
            *slot = true;
        }
    }

    /// Self-analysis: validate the vocabulary, record every rule, analyze
    /// every ungated alternation. All definition errors are aggregated into
    /// one report; a [`Grammar`] is only built from a fully valid definition.
    pub fn build(self) -> Result<Grammar, Vec<GrammarError>> {
        let mut errors: Vec<GrammarError> = validate(&self.vocabulary)
            .into_iter()
            .map(GrammarError::TokenClass)
            .collect();

        let mut rules = Vec::with_capacity(self.names.len());
        for ((name, body), recoverable) in self
            .names
            .into_iter()
            .zip(self.bodies)
            .zip(self.recoverable)
        {
            let body = match body {
                Some(body) => body,
                None => {
                    errors.push(GrammarError::UndefinedRule(name.clone()));
                    // Placeholder keeps RuleIds aligned so analysis of the
                    // remaining rules still runs.
                    GrammarNode::Sequence(Vec::new())
                }
            };
            rules.push(Rule {
                name,
                body,
                recoverable,
            });
        }

        for rule in &rules {
            check_structure(&rule.name, &rule.body, &mut errors);
        }

        let model = GrammarModel::record(&rules);
        {
            let analyzer = Analyzer::new(&model, &self.vocabulary);
            for (idx, rule) in rules.iter().enumerate() {
                let id = RuleId(idx as u32);
                for decision in model.decisions(id) {
                    errors.extend(analyzer.validate_decision(&rule.name, decision).err());
                }
            }
        }

        if errors.is_empty() {
            debug!(rules = rules.len(), "grammar analysis complete");
            Ok(Grammar {
                vocabulary: self.vocabulary,
                rules,
                model,
                cache: LookaheadCache::new(),
            })
        } else {
            Err(errors)
        }
    }
}

fn check_structure(rule: &SmolStr, node: &GrammarNode, errors: &mut Vec<GrammarError>) {
    match node {
        GrammarNode::Terminal(_) | GrammarNode::Rule(_) => {}
        GrammarNode::Sequence(children) => {
            for child in children {
                check_structure(rule, child, errors);
            }
        }
        GrammarNode::Option { body, .. }
        | GrammarNode::Many { body, .. }
        | GrammarNode::ManySep { body, .. }
        | GrammarNode::AtLeastOne { body, .. }
        | GrammarNode::AtLeastOneSep { body, .. } => check_structure(rule, body, errors),
        GrammarNode::Or { alternatives, .. } => {
            if alternatives.is_empty() {
                errors.push(GrammarError::EmptyAlternation(rule.clone()));
            }
            let gated = alternatives.iter().filter(|a| a.gate.is_some()).count();
            if gated != 0 && gated != alternatives.len() {
                errors.push(GrammarError::InconsistentGates { rule: rule.clone() });
            }
            for alternative in alternatives {
                check_structure(rule, &alternative.body, errors);
            }
        }
    }
}

/// A fully analyzed, immutable grammar. Owns its lookahead cache: the cache
/// lives exactly as long as this definition, and redefining a grammar means
/// building a new `Grammar` with a fresh, empty cache.
#[derive(Debug)]
pub struct Grammar {
    vocabulary: Vocabulary,
    rules: Vec<Rule>,
    model: GrammarModel,
    cache: LookaheadCache,
}

impl Grammar {
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0 as usize)
    }

    pub fn rule_name(&self, id: RuleId) -> &str {
        self.rule(id).map(|r| r.name.as_str()).unwrap_or("<unknown>")
    }

    pub fn model(&self) -> &GrammarModel {
        &self.model
    }

    /// The per-grammar lookahead cache. Populated lazily by parsing; exposed
    /// so callers can observe the one-time-compute discipline.
    pub fn lookahead_cache(&self) -> &LookaheadCache {
        &self.cache
    }

    /// Start a parse over an already tokenized input.
    pub fn parser(&self, tokens: Vec<Token>) -> Parser<'_> {
        Parser::new(self, tokens)
    }
}
