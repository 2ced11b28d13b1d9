//! The runtime: drives a token stream through recorded productions.
//!
//! The parser interprets the grammar's [`Production`] trees directly. At
//! every decision construct it either consults the construct's explicit gate
//! or fetches the computed decision function from the grammar's cache,
//! computing it on first encounter. Identical inputs therefore take identical
//! paths whether or not the cache is already warm.

use std::sync::Arc;

use smol_str::SmolStr;
use tracing::trace;

use crate::scan::{Token, TokenKind};

use super::cache::DecisionKey;
use super::errors::ParseError;
use super::grammar::{Grammar, Peek, RuleId};
use super::lookahead::{Analyzer, LookaheadFn};
use super::production::{DecisionKind, DecisionNode, Production};

/// One child of a concrete syntax node: a consumed token or a nested rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstChild {
    Token(Token),
    Node(CstNode),
}

/// Concrete syntax node produced by one rule invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstNode {
    pub rule: SmolStr,
    pub children: Vec<CstChild>,
}

impl CstNode {
    fn empty(rule: SmolStr) -> Self {
        Self {
            rule,
            children: Vec::new(),
        }
    }

    /// All tokens under this node, in input order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        collect_tokens(self, &mut out);
        out
    }

    /// Texts of all tokens under this node, in input order.
    pub fn token_texts(&self) -> Vec<&str> {
        self.tokens().into_iter().map(|t| t.text.as_str()).collect()
    }
}

fn collect_tokens<'n>(node: &'n CstNode, out: &mut Vec<&'n Token>) {
    for child in &node.children {
        match child {
            CstChild::Token(token) => out.push(token),
            CstChild::Node(nested) => collect_tokens(nested, out),
        }
    }
}

/// A single parse over one token stream.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, tokens: Vec<Token>) -> Self {
        Self {
            grammar,
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the input as one invocation of `rule`.
    pub fn parse(&mut self, rule: RuleId) -> Result<CstNode, ParseError> {
        let node = self.parse_rule(rule)?;
        trace!(rule = self.grammar.rule_name(rule), consumed = self.pos, "parse finished");
        Ok(node)
    }

    /// Errors trapped by recoverable rules during this parse.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether every input token was consumed.
    pub fn fully_consumed(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::new(&self.tokens, self.pos)
    }

    fn current(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn rule_name(&self, rule: RuleId) -> SmolStr {
        SmolStr::new(self.grammar.rule_name(rule))
    }

    fn parse_rule(&mut self, rule: RuleId) -> Result<CstNode, ParseError> {
        let name = self.rule_name(rule);
        let Some(production) = self.grammar.model().production(rule) else {
            return Ok(CstNode::empty(name));
        };
        let mut node = CstNode::empty(name);
        let recoverable = self
            .grammar
            .rule(rule)
            .map(|r| r.recoverable)
            .unwrap_or(false);
        match self.parse_node(rule, production, &mut node.children) {
            Ok(()) => Ok(node),
            Err(err) if recoverable => {
                // Trap the failure and yield what was gathered so far. The
                // cursor stays where the failure left it; no resync.
                self.errors.push(err);
                Ok(node)
            }
            Err(err) => Err(err),
        }
    }

    fn parse_node(
        &mut self,
        rule: RuleId,
        production: &'g Production,
        out: &mut Vec<CstChild>,
    ) -> Result<(), ParseError> {
        match production {
            Production::Terminal(kind) => {
                let token = self.consume(rule, *kind)?;
                out.push(CstChild::Token(token));
                Ok(())
            }
            Production::RuleRef(target) => {
                let child = self.parse_rule(*target)?;
                out.push(CstChild::Node(child));
                Ok(())
            }
            Production::Sequence(children) => {
                for child in children {
                    self.parse_node(rule, child, out)?;
                }
                Ok(())
            }
            Production::Decision(decision) => self.parse_decision(rule, decision, out),
        }
    }

    fn parse_decision(
        &mut self,
        rule: RuleId,
        decision: &'g DecisionNode,
        out: &mut Vec<CstChild>,
    ) -> Result<(), ParseError> {
        match decision.kind {
            DecisionKind::Option => {
                if self.decide_enter(rule, decision) {
                    self.parse_body(rule, decision, out)?;
                }
                Ok(())
            }
            DecisionKind::Many => {
                while self.decide_enter(rule, decision) {
                    let before = self.pos;
                    self.parse_body(rule, decision, out)?;
                    if self.pos == before {
                        break;
                    }
                }
                Ok(())
            }
            DecisionKind::AtLeastOne => {
                if !self.decide_enter(rule, decision) {
                    return Err(self.early_exit(rule, decision));
                }
                self.parse_body(rule, decision, out)?;
                while self.decide_enter(rule, decision) {
                    let before = self.pos;
                    self.parse_body(rule, decision, out)?;
                    if self.pos == before {
                        break;
                    }
                }
                Ok(())
            }
            DecisionKind::ManySep => {
                if self.decide_enter(rule, decision) {
                    self.parse_body(rule, decision, out)?;
                    self.parse_separated_tail(rule, decision, out)?;
                }
                Ok(())
            }
            DecisionKind::AtLeastOneSep => {
                if !self.decide_enter(rule, decision) {
                    return Err(self.early_exit(rule, decision));
                }
                self.parse_body(rule, decision, out)?;
                self.parse_separated_tail(rule, decision, out)
            }
            DecisionKind::Or => self.parse_alternation(rule, decision, out),
        }
    }

    /// Continuation loop of the `*_SEP` constructs: driven purely by the
    /// separator token, with a mandatory body occurrence after each one.
    fn parse_separated_tail(
        &mut self,
        rule: RuleId,
        decision: &'g DecisionNode,
        out: &mut Vec<CstChild>,
    ) -> Result<(), ParseError> {
        let Some(separator) = decision.separator else {
            return Ok(());
        };
        while self.peek().kind(0) == Some(separator) {
            let token = self.consume(rule, separator)?;
            out.push(CstChild::Token(token));
            self.parse_body(rule, decision, out)?;
        }
        Ok(())
    }

    fn parse_alternation(
        &mut self,
        rule: RuleId,
        decision: &'g DecisionNode,
        out: &mut Vec<CstChild>,
    ) -> Result<(), ParseError> {
        if decision.is_gated() {
            // Explicit predicates: first alternative whose gate holds wins.
            // The cache is never consulted for gated alternations.
            for (idx, gate) in decision.gates.iter().enumerate() {
                let holds = gate
                    .as_ref()
                    .map(|g| g.check(self.peek()))
                    .unwrap_or(false);
                if holds {
                    return self.parse_node(rule, &decision.children[idx], out);
                }
            }
            return Err(ParseError::NoViableAlternative {
                rule: self.rule_name(rule),
                construct: SmolStr::new(decision.construct_label()),
                // Gate predicates are opaque.
                expected: Vec::new(),
                found: self.current(),
            });
        }

        let la = self.decision_fn(rule, decision);
        match la.choose(self.peek()) {
            Some(idx) => self.parse_node(rule, &decision.children[idx], out),
            None => Err(ParseError::NoViableAlternative {
                rule: self.rule_name(rule),
                construct: SmolStr::new(decision.construct_label()),
                expected: self.kind_names(&la.expected_kinds()),
                found: self.current(),
            }),
        }
    }

    /// Enter/continue verdict for the non-alternation constructs.
    fn decide_enter(&mut self, rule: RuleId, decision: &'g DecisionNode) -> bool {
        if let Some(gate) = &decision.gate {
            return gate.check(self.peek());
        }
        let la = self.decision_fn(rule, decision);
        la.should_enter(self.peek())
    }

    fn parse_body(
        &mut self,
        rule: RuleId,
        decision: &'g DecisionNode,
        out: &mut Vec<CstChild>,
    ) -> Result<(), ParseError> {
        match decision.children.first() {
            Some(body) => self.parse_node(rule, body, out),
            None => Ok(()),
        }
    }

    fn decision_fn(&self, rule: RuleId, decision: &'g DecisionNode) -> Arc<LookaheadFn> {
        let key = DecisionKey {
            rule,
            kind: decision.kind,
            occurrence: decision.occurrence,
        };
        self.grammar.lookahead_cache().get_or_compute(key, || {
            let analyzer =
                Analyzer::new(self.grammar.model(), self.grammar.vocabulary());
            Arc::new(analyzer.compute(decision))
        })
    }

    fn consume(&mut self, rule: RuleId, kind: TokenKind) -> Result<Token, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            found => Err(ParseError::UnexpectedToken {
                rule: self.rule_name(rule),
                expected: SmolStr::new(self.grammar.vocabulary().name(kind)),
                found: found.cloned(),
            }),
        }
    }

    fn early_exit(&self, rule: RuleId, decision: &DecisionNode) -> ParseError {
        ParseError::EarlyExit {
            rule: self.rule_name(rule),
            construct: SmolStr::new(decision.construct_label()),
            found: self.current(),
        }
    }

    fn kind_names(&self, kinds: &[TokenKind]) -> Vec<SmolStr> {
        kinds
            .iter()
            .map(|kind| SmolStr::new(self.grammar.vocabulary().name(*kind)))
            .collect()
    }
}
