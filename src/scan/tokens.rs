//! Token class declarations and lexed tokens.

use smol_str::SmolStr;

use crate::base::Span;

/// Index of a token class within its [`Vocabulary`].
///
/// Kinds are only meaningful relative to the vocabulary that produced them;
/// mixing kinds across vocabularies is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKind(pub u32);

/// Declared regex pattern plus flags.
///
/// `multiline` and `global` exist only so declarations ported from engines
/// that support them can be validated (and rejected); matching always anchors
/// fresh at an offset, so neither flag has a meaning here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    pub source: SmolStr,
    pub case_insensitive: bool,
    pub multiline: bool,
    pub global: bool,
}

impl PatternSpec {
    pub fn new(source: impl Into<SmolStr>) -> Self {
        Self {
            source: source.into(),
            case_insensitive: false,
            multiline: false,
            global: false,
        }
    }

    pub fn case_insensitive(source: impl Into<SmolStr>) -> Self {
        Self {
            case_insensitive: true,
            ..Self::new(source)
        }
    }
}

/// Where tokens of a class end up in the lexer output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenGroup {
    /// Main output sequence.
    #[default]
    Default,
    /// Matched and discarded (whitespace, comments).
    Skipped,
    /// Never matched directly; exists only as a grammar-level category.
    NotApplicable,
    /// Collected into a named bucket instead of the main sequence.
    Named(SmolStr),
}

/// A named token kind with its matching pattern and routing metadata.
#[derive(Debug, Clone)]
pub struct TokenClass {
    pub name: SmolStr,
    pub pattern: Option<PatternSpec>,
    pub group: TokenGroup,
    /// Class preferred over this one when it matches strictly longer at the
    /// same offset.
    pub longer_alt: Option<TokenKind>,
}

impl TokenClass {
    pub fn new(name: impl Into<SmolStr>, pattern_source: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(PatternSpec::new(pattern_source)),
            group: TokenGroup::Default,
            longer_alt: None,
        }
    }

    pub fn with_spec(name: impl Into<SmolStr>, pattern: PatternSpec) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern),
            group: TokenGroup::Default,
            longer_alt: None,
        }
    }

    /// A grammar-only category: never matched directly by the tokenizer.
    pub fn category(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            group: TokenGroup::NotApplicable,
            longer_alt: None,
        }
    }

    /// Matched text is discarded (whitespace, comments).
    pub fn skipped(mut self) -> Self {
        self.group = TokenGroup::Skipped;
        self
    }

    /// Matched tokens are collected under a named bucket instead of the main
    /// output sequence.
    pub fn in_group(mut self, group: impl Into<SmolStr>) -> Self {
        self.group = TokenGroup::Named(group.into());
        self
    }

    pub fn longer_alt(mut self, kind: TokenKind) -> Self {
        self.longer_alt = Some(kind);
        self
    }
}

/// Ordered collection of token classes. Declaration order is matcher
/// priority: first declared pattern that matches wins.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    classes: Vec<TokenClass>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, class: TokenClass) -> TokenKind {
        let kind = TokenKind(self.classes.len() as u32);
        self.classes.push(class);
        kind
    }

    pub fn get(&self, kind: TokenKind) -> Option<&TokenClass> {
        self.classes.get(kind.0 as usize)
    }

    /// Class name for diagnostics; placeholder when the kind is foreign.
    pub fn name(&self, kind: TokenKind) -> &str {
        self.get(kind).map(|c| c.name.as_str()).unwrap_or("<unknown>")
    }

    pub fn classes(&self) -> impl Iterator<Item = &TokenClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// A lexed token: kind, matched text and source location.
///
/// Produced only by the tokenizer; immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    /// Byte offset of the match start.
    pub offset: usize,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, offset: usize, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
            span,
        }
    }
}
