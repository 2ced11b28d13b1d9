//! Lookahead computation over recorded productions.
//!
//! For enter/continue decisions (OPTION, MANY and friends) the analyzer
//! computes the FIRST set of the guarded subtree: the token kinds that can
//! begin it, recursing through rule references. For alternations it computes
//! per-alternative token-kind *prefixes*, starting one token deep and
//! widening only as far as the specific alternation needs to tell its
//! alternatives apart, up to [`MAX_LOOKAHEAD`]. Alternatives still
//! overlapping at the maximum depth are ambiguous: a definition error unless
//! the alternation opted into declaration-order resolution.
//!
//! Everything here is bounded. Re-entering a rule whose FIRST computation is
//! already in progress contributes a provisional empty set (sound for
//! cycle-termination; left recursion is out of scope), prefix sets are
//! capped, and the widening loop is capped, so a pathological grammar
//! terminates with an error instead of looping.
//!
//! Every computed function is pure given the grammar: it depends on nothing
//! from any particular parse, which is what makes the one-time-compute,
//! forever-reuse cache discipline safe.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::trace;

use crate::scan::{TokenKind, Vocabulary};

use super::errors::GrammarError;
use super::grammar::{Peek, RuleId};
use super::production::{DecisionKind, DecisionNode, GrammarModel, Production};

/// Widest decision window the analyzer will consider.
pub const MAX_LOOKAHEAD: usize = 4;

// Prefix-set growth cap; keeps pathological alternations bounded.
const MAX_PREFIXES: usize = 256;

/// A token-kind sequence that can begin an alternative. Empty means the
/// alternative can match zero tokens.
type Prefix = Vec<TokenKind>;

/// A compiled decision function: pure data evaluated against the live
/// lookahead window. Re-callable by construction, as repetitions require.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookaheadFn {
    /// Enter/continue iff the next token kind is in the FIRST set.
    Enter { first: FxHashSet<TokenKind> },
    /// Choose the first alternative (declaration order) with a matching
    /// prefix at the resolved depth.
    Choose {
        depth: usize,
        alternatives: Vec<Vec<Prefix>>,
    },
}

impl LookaheadFn {
    pub fn should_enter(&self, peek: Peek<'_>) -> bool {
        match self {
            Self::Enter { first } => peek.kind(0).is_some_and(|kind| first.contains(&kind)),
            // Alternations decide via `choose`; entering means some
            // alternative matches.
            Self::Choose { .. } => self.choose(peek).is_some(),
        }
    }

    /// Index of the chosen alternative, or `None` when nothing matches.
    pub fn choose(&self, peek: Peek<'_>) -> Option<usize> {
        match self {
            Self::Enter { .. } => None,
            Self::Choose { alternatives, .. } => alternatives
                .iter()
                .position(|prefixes| prefixes.iter().any(|p| prefix_matches(p, peek))),
        }
    }

    /// Token kinds that would satisfy this decision; for diagnostics.
    pub fn expected_kinds(&self) -> Vec<TokenKind> {
        let mut kinds: Vec<TokenKind> = match self {
            Self::Enter { first } => first.iter().copied().collect(),
            Self::Choose { alternatives, .. } => alternatives
                .iter()
                .flatten()
                .filter_map(|prefix| prefix.first().copied())
                .collect(),
        };
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

fn prefix_matches(prefix: &[TokenKind], peek: Peek<'_>) -> bool {
    prefix
        .iter()
        .enumerate()
        .all(|(n, kind)| peek.kind(n) == Some(*kind))
}

/// Computes decision functions over one grammar's production model.
pub struct Analyzer<'g> {
    model: &'g GrammarModel,
    vocabulary: &'g Vocabulary,
}

impl<'g> Analyzer<'g> {
    pub fn new(model: &'g GrammarModel, vocabulary: &'g Vocabulary) -> Self {
        Self { model, vocabulary }
    }

    /// Compile the decision function for one decision point. Infallible:
    /// ambiguity is rejected at build time, so residual overlap here (only
    /// possible under `ignore_ambiguities`) resolves by declaration order.
    pub fn compute(&self, node: &DecisionNode) -> LookaheadFn {
        match node.kind {
            DecisionKind::Or => self.alternation_decision(node),
            _ => self.enter_decision(node),
        }
    }

    /// FIRST-set decision for OPTION/MANY/AT_LEAST_ONE and their `_SEP`
    /// variants.
    pub fn enter_decision(&self, node: &DecisionNode) -> LookaheadFn {
        let mut first = FxHashSet::default();
        let mut visiting = FxHashSet::default();
        if let Some(body) = node.children.first() {
            self.first_of(body, &mut first, &mut visiting);
        }
        LookaheadFn::Enter { first }
    }

    /// Prefix-based decision for an alternation, widening the window until
    /// the alternatives separate or the cap is reached.
    pub fn alternation_decision(&self, node: &DecisionNode) -> LookaheadFn {
        if node.ignore_ambiguities {
            // Declaration order resolves overlap; one token is enough.
            return LookaheadFn::Choose {
                depth: 1,
                alternatives: self.alternative_prefixes(node, 1),
            };
        }
        let mut widest = Vec::new();
        for depth in 1..=MAX_LOOKAHEAD {
            let alternatives = self.alternative_prefixes(node, depth);
            if collisions(&alternatives).is_empty() {
                trace!(depth, construct = %node.construct_label(), "lookahead resolved");
                return LookaheadFn::Choose {
                    depth,
                    alternatives,
                };
            }
            widest = alternatives;
        }
        // Build-time validation rejected truly ambiguous alternations, so
        // this path is only reachable for grammars it accepted; order wins.
        LookaheadFn::Choose {
            depth: MAX_LOOKAHEAD,
            alternatives: widest,
        }
    }

    /// Build-time ambiguity check for one decision point. Alternations
    /// without an explicit predicate must separate within [`MAX_LOOKAHEAD`]
    /// tokens unless they opted out.
    pub fn validate_decision(
        &self,
        rule_name: &SmolStr,
        node: &DecisionNode,
    ) -> Result<(), GrammarError> {
        if node.kind != DecisionKind::Or || node.ignore_ambiguities || node.is_gated() {
            return Ok(());
        }
        let mut colliding = Vec::new();
        for depth in 1..=MAX_LOOKAHEAD {
            colliding = collisions(&self.alternative_prefixes(node, depth));
            if colliding.is_empty() {
                return Ok(());
            }
        }

        let mut alternatives: Vec<usize> = colliding
            .iter()
            .flat_map(|c| [c.left + 1, c.right + 1])
            .collect();
        alternatives.sort_unstable();
        alternatives.dedup();
        let mut tokens: Vec<SmolStr> = colliding
            .iter()
            .map(|c| match c.prefix.first() {
                Some(kind) => SmolStr::new(self.vocabulary.name(*kind)),
                // A fully nullable alternative collides with a zero-token
                // prefix; name it rather than rendering an empty list.
                None => SmolStr::new("<empty>"),
            })
            .collect();
        tokens.sort();
        tokens.dedup();
        Err(GrammarError::AmbiguousAlternatives {
            rule: rule_name.clone(),
            construct: SmolStr::new(node.construct_label()),
            alternatives,
            tokens,
        })
    }

    fn alternative_prefixes(&self, node: &DecisionNode, depth: usize) -> Vec<Vec<Prefix>> {
        node.children
            .iter()
            .map(|child| {
                let mut visiting = FxHashSet::default();
                self.prefixes_of(child, depth, &mut visiting)
            })
            .collect()
    }

    /// FIRST set of a subtree; returns whether the subtree is nullable.
    fn first_of(
        &self,
        node: &Production,
        out: &mut FxHashSet<TokenKind>,
        visiting: &mut FxHashSet<RuleId>,
    ) -> bool {
        match node {
            Production::Terminal(kind) => {
                out.insert(*kind);
                false
            }
            Production::RuleRef(rule) => {
                if !visiting.insert(*rule) {
                    // Already being computed: provisional empty contribution.
                    return false;
                }
                let nullable = self
                    .model
                    .production(*rule)
                    .map(|p| self.first_of(p, out, visiting))
                    .unwrap_or(false);
                visiting.remove(rule);
                nullable
            }
            Production::Sequence(children) => {
                for child in children {
                    if !self.first_of(child, out, visiting) {
                        return false;
                    }
                }
                true
            }
            Production::Decision(decision) => match decision.kind {
                DecisionKind::Option | DecisionKind::Many | DecisionKind::ManySep => {
                    if let Some(body) = decision.children.first() {
                        self.first_of(body, out, visiting);
                    }
                    true
                }
                DecisionKind::AtLeastOne | DecisionKind::AtLeastOneSep => decision
                    .children
                    .first()
                    .map(|body| self.first_of(body, out, visiting))
                    .unwrap_or(true),
                DecisionKind::Or => {
                    let mut nullable = decision.children.is_empty();
                    for child in &decision.children {
                        if self.first_of(child, out, visiting) {
                            nullable = true;
                        }
                    }
                    nullable
                }
            },
        }
    }

    /// All token-kind sequences of length <= `depth` that can begin `node`.
    /// A sequence shorter than `depth` appears only where the subtree can
    /// end early; the empty sequence marks a nullable subtree.
    fn prefixes_of(
        &self,
        node: &Production,
        depth: usize,
        visiting: &mut FxHashSet<RuleId>,
    ) -> Vec<Prefix> {
        match node {
            Production::Terminal(kind) => vec![vec![*kind]],
            Production::RuleRef(rule) => {
                if !visiting.insert(*rule) {
                    // In-progress rule: provisional empty set. Conservative
                    // for cycle termination; left recursion is unsupported.
                    return Vec::new();
                }
                let prefixes = self
                    .model
                    .production(*rule)
                    .map(|p| self.prefixes_of(p, depth, visiting))
                    .unwrap_or_default();
                visiting.remove(rule);
                prefixes
            }
            Production::Sequence(children) => {
                let mut acc: Vec<Prefix> = vec![Vec::new()];
                for child in children {
                    let mut next: Vec<Prefix> = Vec::new();
                    for prefix in &acc {
                        if prefix.len() >= depth {
                            next.push(prefix.clone());
                            continue;
                        }
                        let continuations =
                            self.prefixes_of(child, depth - prefix.len(), visiting);
                        if continuations.is_empty() {
                            // Opaque child (cycle fallback): stop extending.
                            next.push(prefix.clone());
                            continue;
                        }
                        for continuation in &continuations {
                            let mut extended = prefix.clone();
                            extended.extend(continuation.iter().copied());
                            extended.truncate(depth);
                            next.push(extended);
                        }
                    }
                    next.sort();
                    next.dedup();
                    next.truncate(MAX_PREFIXES);
                    acc = next;
                }
                acc
            }
            Production::Decision(decision) => {
                let body_prefixes = |analyzer: &Self, visiting: &mut FxHashSet<RuleId>| {
                    decision
                        .children
                        .first()
                        .map(|body| analyzer.prefixes_of(body, depth, visiting))
                        .unwrap_or_default()
                };
                match decision.kind {
                    DecisionKind::Option | DecisionKind::Many | DecisionKind::ManySep => {
                        let mut prefixes = body_prefixes(self, visiting);
                        prefixes.push(Vec::new());
                        prefixes.sort();
                        prefixes.dedup();
                        prefixes
                    }
                    DecisionKind::AtLeastOne | DecisionKind::AtLeastOneSep => {
                        body_prefixes(self, visiting)
                    }
                    DecisionKind::Or => {
                        let mut prefixes: Vec<Prefix> = decision
                            .children
                            .iter()
                            .flat_map(|child| self.prefixes_of(child, depth, visiting))
                            .collect();
                        prefixes.sort();
                        prefixes.dedup();
                        prefixes.truncate(MAX_PREFIXES);
                        prefixes
                    }
                }
            }
        }
    }
}

struct Collision {
    left: usize,
    right: usize,
    prefix: Prefix,
}

/// Pairs of alternatives whose prefix sets overlap: one prefix equal to, or
/// a leading part of, a prefix of a later alternative.
fn collisions(alternatives: &[Vec<Prefix>]) -> Vec<Collision> {
    let mut found = Vec::new();
    for (i, left) in alternatives.iter().enumerate() {
        for (j, right) in alternatives.iter().enumerate().skip(i + 1) {
            for p in left {
                for q in right {
                    if p.starts_with(q) || q.starts_with(p) {
                        let shorter = if p.len() <= q.len() { p } else { q };
                        found.push(Collision {
                            left: i,
                            right: j,
                            prefix: shorter.clone(),
                        });
                    }
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::grammar::dsl::*;
    use crate::parse::grammar::{GrammarNode, Rule};
    use crate::scan::{Token, TokenClass, TokenKind, Vocabulary};
    use crate::base::Span;

    fn vocab(n: u32) -> Vocabulary {
        let mut v = Vocabulary::new();
        for i in 0..n {
            v.add(TokenClass::new(format!("T{i}"), format!("t{i}")));
        }
        v
    }

    fn rules_of(bodies: Vec<GrammarNode>) -> Vec<Rule> {
        bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| Rule {
                name: SmolStr::new(format!("r{i}")),
                body,
                recoverable: false,
            })
            .collect()
    }

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, "x", 0, Span::from_coords(1, 1, 1, 2))
    }

    fn peek_over(tokens: &[Token]) -> Peek<'_> {
        Peek::new(tokens, 0)
    }

    #[test]
    fn first_set_recurses_through_rule_references() {
        let v = vocab(3);
        let sub = seq([term(TokenKind(1)), term(TokenKind(2))]);
        let main = optional(subrule(crate::parse::RuleId(1)));
        let rules = rules_of(vec![main, sub]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let la = analyzer.enter_decision(decision);
        let input = [tok(TokenKind(1))];
        assert!(la.should_enter(peek_over(&input)));
        let wrong = [tok(TokenKind(2))];
        assert!(!la.should_enter(peek_over(&wrong)));
    }

    #[test]
    fn first_set_skips_over_nullable_leading_constructs() {
        let v = vocab(3);
        let body = optional(seq([optional(term(TokenKind(0))), term(TokenKind(1))]));
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let la = analyzer.enter_decision(decision);
        for kind in [TokenKind(0), TokenKind(1)] {
            let input = [tok(kind)];
            assert!(la.should_enter(peek_over(&input)));
        }
    }

    #[test]
    fn self_referential_rules_terminate() {
        let v = vocab(2);
        // r0 = T0 r0?
        let body = seq([
            term(TokenKind(0)),
            optional(subrule(crate::parse::RuleId(0))),
        ]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let la = analyzer.enter_decision(decision);
        let input = [tok(TokenKind(0))];
        assert!(la.should_enter(peek_over(&input)));
    }

    #[test]
    fn alternation_resolves_at_depth_one_when_unambiguous() {
        let v = vocab(3);
        let body = or(vec![term(TokenKind(0)), term(TokenKind(1)), term(TokenKind(2))]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let la = analyzer.alternation_decision(decision);
        let input = [tok(TokenKind(1))];
        assert_eq!(la.choose(peek_over(&input)), Some(1));
        match la {
            LookaheadFn::Choose { depth, .. } => assert_eq!(depth, 1),
            LookaheadFn::Enter { .. } => panic!("expected Choose"),
        }
    }

    #[test]
    fn alternation_widens_until_prefixes_separate() {
        let v = vocab(3);
        let body = or(vec![
            seq([term(TokenKind(0)), term(TokenKind(1))]),
            seq([term(TokenKind(0)), term(TokenKind(2))]),
        ]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        assert!(analyzer.validate_decision(&SmolStr::new("r0"), decision).is_ok());
        let la = analyzer.alternation_decision(decision);
        match &la {
            LookaheadFn::Choose { depth, .. } => assert_eq!(*depth, 2),
            LookaheadFn::Enter { .. } => panic!("expected Choose"),
        }
        let input = [tok(TokenKind(0)), tok(TokenKind(2))];
        assert_eq!(la.choose(peek_over(&input)), Some(1));
    }

    #[test]
    fn prefix_subsumption_is_an_ambiguity() {
        let v = vocab(3);
        // [T0] can end where [T0 T1] continues: ambiguous at every depth.
        let body = or(vec![
            term(TokenKind(0)),
            seq([term(TokenKind(0)), term(TokenKind(1))]),
        ]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let err = analyzer
            .validate_decision(&SmolStr::new("r0"), decision)
            .expect_err("ambiguous");
        match err {
            GrammarError::AmbiguousAlternatives {
                alternatives,
                tokens,
                ..
            } => {
                assert_eq!(alternatives, vec![1, 2]);
                assert_eq!(tokens, vec![SmolStr::new("T0")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nullable_alternative_collisions_are_named_in_the_report() {
        let v = vocab(2);
        let body = or(vec![optional(term(TokenKind(0))), term(TokenKind(0))]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let err = analyzer
            .validate_decision(&SmolStr::new("r0"), decision)
            .expect_err("ambiguous");
        match err {
            GrammarError::AmbiguousAlternatives { tokens, .. } => {
                assert!(tokens.contains(&SmolStr::new("<empty>")));
                assert!(tokens.contains(&SmolStr::new("T0")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ignore_ambiguities_resolves_by_declaration_order() {
        let v = vocab(3);
        let body = or_ignore_ambiguities(vec![
            term(TokenKind(0)),
            seq([term(TokenKind(0)), term(TokenKind(1))]),
        ]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        assert!(analyzer.validate_decision(&SmolStr::new("r0"), decision).is_ok());
        let la = analyzer.alternation_decision(decision);
        let input = [tok(TokenKind(0)), tok(TokenKind(1))];
        assert_eq!(la.choose(peek_over(&input)), Some(0));
    }

    #[test]
    fn choose_returns_none_when_nothing_matches() {
        let v = vocab(3);
        let body = or(vec![term(TokenKind(0)), term(TokenKind(1))]);
        let rules = rules_of(vec![body]);
        let model = GrammarModel::record(&rules);
        let analyzer = Analyzer::new(&model, &v);
        let decision = &model.decisions(crate::parse::RuleId(0))[0];
        let la = analyzer.alternation_decision(decision);
        let input = [tok(TokenKind(2))];
        assert_eq!(la.choose(peek_over(&input)), None);
        assert_eq!(
            la.expected_kinds(),
            vec![TokenKind(0), TokenKind(1)]
        );
    }
}
