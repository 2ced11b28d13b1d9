//! Plain-text rendering of a grammar's recorded productions.
//!
//! Produces an indented outline of each rule's production tree, useful for
//! inspecting what the recorder actually captured: construct labels with
//! occurrence ordinals, separator classes and gate markers all appear exactly
//! as the lookahead machinery sees them.

use std::fmt::Write;

use crate::parse::{DecisionKind, DecisionNode, Grammar, Production, RuleId};

/// Render every rule of the grammar, in declaration order.
pub fn render_grammar(grammar: &Grammar) -> String {
    let mut out = String::new();
    for idx in 0..grammar.rules().len() {
        let id = RuleId(idx as u32);
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&render_rule(grammar, id));
    }
    out
}

/// Render one rule as an indented outline.
pub fn render_rule(grammar: &Grammar, rule: RuleId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}:", grammar.rule_name(rule));
    if let Some(production) = grammar.model().production(rule) {
        render_node(grammar, production, 1, &mut out);
    }
    out
}

fn render_node(grammar: &Grammar, node: &Production, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match node {
        Production::Terminal(kind) => {
            let _ = writeln!(out, "{pad}token {}", grammar.vocabulary().name(*kind));
        }
        Production::RuleRef(target) => {
            let _ = writeln!(out, "{pad}rule {}", grammar.rule_name(*target));
        }
        Production::Sequence(children) => {
            for child in children {
                render_node(grammar, child, depth, out);
            }
        }
        Production::Decision(decision) => {
            let _ = writeln!(out, "{pad}{}", decision_heading(grammar, decision));
            if decision.kind == DecisionKind::Or {
                for (idx, child) in decision.children.iter().enumerate() {
                    let alt_pad = "  ".repeat(depth + 1);
                    let _ = writeln!(out, "{alt_pad}alt {}", idx + 1);
                    render_node(grammar, child, depth + 2, out);
                }
            } else {
                for child in &decision.children {
                    render_node(grammar, child, depth + 1, out);
                }
            }
        }
    }
}

fn decision_heading(grammar: &Grammar, decision: &DecisionNode) -> String {
    let mut heading = decision.construct_label();
    if let Some(separator) = decision.separator {
        let _ = write!(
            heading,
            " sep={}",
            grammar.vocabulary().name(separator)
        );
    }
    if decision.is_gated() {
        heading.push_str(" [gated]");
    }
    heading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::dsl::*;
    use crate::parse::GrammarBuilder;
    use crate::scan::{TokenClass, TokenKind, Vocabulary};

    fn build() -> Grammar {
        let mut vocab = Vocabulary::new();
        vocab.add(TokenClass::new("Name", "[a-z]+"));
        vocab.add(TokenClass::new("Comma", ","));
        let mut b = GrammarBuilder::new(vocab);
        let item = b.declare("item");
        b.rule("list", many_sep(TokenKind(1), subrule(item)));
        b.define(item, term(TokenKind(0)));
        b.build().expect("valid grammar")
    }

    #[test]
    fn outline_names_constructs_and_separators() {
        let grammar = build();
        let text = render_rule(&grammar, RuleId(0));
        assert!(text.starts_with("list:\n"));
        assert!(text.contains("MANY_SEP1 sep=Comma"));
        assert!(text.contains("rule item"));
    }

    #[test]
    fn whole_grammar_renders_every_rule() {
        let grammar = build();
        let text = render_grammar(&grammar);
        assert!(text.contains("list:"));
        assert!(text.contains("item:"));
        assert!(text.contains("token Name"));
    }
}
