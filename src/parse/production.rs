//! The recorded production model of a grammar.
//!
//! Recording turns each rule's combinator body into a [`Production`] tree:
//! the same shape, but with every decision construct numbered by its
//! occurrence within the rule and every rule reference kept as a lightweight
//! [`Production::RuleRef`] back-reference. Because rule bodies are data, a
//! rule is recorded in exactly one pass with no input stream and no side
//! effects to suppress, and self-referential rules cannot recurse: the
//! reference node is the cycle boundary.
//!
//! Trees are built once per grammar and read-only afterwards; the lookahead
//! analyzer, the runtime parser and the diagram renderer all consume this
//! one model.

use crate::scan::TokenKind;

use super::grammar::{Gate, GrammarNode, Rule, RuleId};

/// The decision construct kinds sharing the lookahead machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    Option,
    Many,
    ManySep,
    AtLeastOne,
    AtLeastOneSep,
    Or,
}

impl DecisionKind {
    /// Label used in diagnostics, e.g. `OR3` for the third alternation.
    pub fn label(self) -> &'static str {
        match self {
            Self::Option => "OPTION",
            Self::Many => "MANY",
            Self::ManySep => "MANY_SEP",
            Self::AtLeastOne => "AT_LEAST_ONE",
            Self::AtLeastOneSep => "AT_LEAST_ONE_SEP",
            Self::Or => "OR",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Option => 0,
            Self::Many => 1,
            Self::ManySep => 2,
            Self::AtLeastOne => 3,
            Self::AtLeastOneSep => 4,
            Self::Or => 5,
        }
    }
}

/// One node of a recorded rule body.
#[derive(Debug)]
pub enum Production {
    Terminal(TokenKind),
    RuleRef(RuleId),
    Sequence(Vec<Production>),
    Decision(DecisionNode),
}

/// A decision point: one node per construct, uniform across kinds so the
/// analyzer and cache operate over a single representation.
#[derive(Debug)]
pub struct DecisionNode {
    pub kind: DecisionKind,
    /// 1-based ordinal of this construct kind within its rule.
    pub occurrence: u16,
    /// Separator class for the `*_SEP` kinds.
    pub separator: Option<TokenKind>,
    /// Explicit lookahead predicate for enter/continue constructs.
    pub gate: Option<Gate>,
    /// Per-alternative predicates; non-empty for alternations only.
    pub gates: Vec<Option<Gate>>,
    pub ignore_ambiguities: bool,
    /// Single body child, or one child per alternative for alternations.
    pub children: Vec<Production>,
}

impl DecisionNode {
    /// A decision is explicitly predicated when the caller supplied gates
    /// for it; such decisions bypass automatic lookahead entirely.
    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
            || (!self.gates.is_empty() && self.gates.iter().all(Option::is_some))
    }

    /// Diagnostic name, e.g. `MANY_SEP2`.
    pub fn construct_label(&self) -> String {
        format!("{}{}", self.kind.label(), self.occurrence)
    }
}

#[derive(Default)]
struct OccurrenceCounters([u16; 6]);

impl OccurrenceCounters {
    fn next(&mut self, kind: DecisionKind) -> u16 {
        let slot = &mut self.0[kind.index()];
        *slot += 1;
        *slot
    }
}

/// All recorded productions of a grammar, indexed by [`RuleId`].
#[derive(Debug, Default)]
pub struct GrammarModel {
    productions: Vec<Production>,
}

impl GrammarModel {
    /// Record every rule exactly once, in declaration order.
    pub fn record(rules: &[Rule]) -> Self {
        let productions = rules
            .iter()
            .map(|rule| {
                let mut counters = OccurrenceCounters::default();
                record_node(&rule.body, &mut counters)
            })
            .collect();
        Self { productions }
    }

    pub fn production(&self, rule: RuleId) -> Option<&Production> {
        self.productions.get(rule.0 as usize)
    }

    /// All decision nodes of a rule in traversal order.
    pub fn decisions(&self, rule: RuleId) -> Vec<&DecisionNode> {
        let mut found = Vec::new();
        if let Some(production) = self.production(rule) {
            collect_decisions(production, &mut found);
        }
        found
    }

    /// Locate one decision point by its cache coordinates.
    pub fn find_decision(
        &self,
        rule: RuleId,
        kind: DecisionKind,
        occurrence: u16,
    ) -> Option<&DecisionNode> {
        self.decisions(rule)
            .into_iter()
            .find(|d| d.kind == kind && d.occurrence == occurrence)
    }
}

fn collect_decisions<'p>(production: &'p Production, out: &mut Vec<&'p DecisionNode>) {
    match production {
        Production::Terminal(_) | Production::RuleRef(_) => {}
        Production::Sequence(children) => {
            for child in children {
                collect_decisions(child, out);
            }
        }
        Production::Decision(node) => {
            out.push(node);
            for child in &node.children {
                collect_decisions(child, out);
            }
        }
    }
}

fn record_node(node: &GrammarNode, counters: &mut OccurrenceCounters) -> Production {
    match node {
        GrammarNode::Terminal(kind) => Production::Terminal(*kind),
        GrammarNode::Rule(rule) => Production::RuleRef(*rule),
        GrammarNode::Sequence(children) => Production::Sequence(
            children
                .iter()
                .map(|child| record_node(child, counters))
                .collect(),
        ),
        GrammarNode::Option { gate, body } => {
            record_decision(DecisionKind::Option, None, gate, body, counters)
        }
        GrammarNode::Many { gate, body } => {
            record_decision(DecisionKind::Many, None, gate, body, counters)
        }
        GrammarNode::ManySep {
            separator,
            gate,
            body,
        } => record_decision(DecisionKind::ManySep, Some(*separator), gate, body, counters),
        GrammarNode::AtLeastOne { gate, body } => {
            record_decision(DecisionKind::AtLeastOne, None, gate, body, counters)
        }
        GrammarNode::AtLeastOneSep {
            separator,
            gate,
            body,
        } => record_decision(
            DecisionKind::AtLeastOneSep,
            Some(*separator),
            gate,
            body,
            counters,
        ),
        GrammarNode::Or {
            alternatives,
            ignore_ambiguities,
        } => {
            // Pre-order numbering: the alternation gets its ordinal before
            // any decision nested inside an alternative.
            let occurrence = counters.next(DecisionKind::Or);
            let gates = alternatives.iter().map(|alt| alt.gate.clone()).collect();
            let children = alternatives
                .iter()
                .map(|alt| record_node(&alt.body, counters))
                .collect();
            Production::Decision(DecisionNode {
                kind: DecisionKind::Or,
                occurrence,
                separator: None,
                gate: None,
                gates,
                ignore_ambiguities: *ignore_ambiguities,
                children,
            })
        }
    }
}

fn record_decision(
    kind: DecisionKind,
    separator: Option<TokenKind>,
    gate: &Option<Gate>,
    body: &GrammarNode,
    counters: &mut OccurrenceCounters,
) -> Production {
    let occurrence = counters.next(kind);
    let children = vec![record_node(body, counters)];
    Production::Decision(DecisionNode {
        kind,
        occurrence,
        separator,
        gate: gate.clone(),
        gates: Vec::new(),
        ignore_ambiguities: false,
        children,
    })
}
