//! Rule index
//!
//! Holds the compiled allow and deny lists. An index is never mutated after
//! construction; a settings change builds a new one.

use serde::Serialize;

use crate::matcher::Matcher;
use crate::pattern::{parse_pattern, NormalizedPattern, PatternError};
use crate::specificity::specificity;
use crate::types::ListKind;
use crate::url::NormalizedUrl;

// =============================================================================
// Compiled Rule
// =============================================================================

/// One user pattern, compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    raw: String,
    pattern: Option<NormalizedPattern>,
    matcher: Matcher,
    specificity: u32,
}

impl CompiledRule {
    /// Compile a raw pattern.
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        let pattern = parse_pattern(raw)?;
        Ok(Self::from_pattern(raw, pattern))
    }

    /// Compile an already-normalized pattern.
    pub fn from_pattern(raw: &str, pattern: NormalizedPattern) -> Self {
        Self {
            raw: raw.trim().to_string(),
            matcher: Matcher::compile(&pattern),
            specificity: specificity(&pattern),
            pattern: Some(pattern),
        }
    }

    /// Placeholder for a pattern that failed to compile: never matches,
    /// specificity 0.
    pub fn invalid(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            pattern: None,
            matcher: Matcher::never(),
            specificity: 0,
        }
    }

    /// Compile, falling back to [`CompiledRule::invalid`].
    pub fn compile_or_invalid(raw: &str) -> (Self, Option<PatternError>) {
        match Self::compile(raw) {
            Ok(rule) => (rule, None),
            Err(err) => (Self::invalid(raw), Some(err)),
        }
    }

    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn pattern(&self) -> Option<&NormalizedPattern> {
        self.pattern.as_ref()
    }

    #[inline]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[inline]
    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pattern.is_some()
    }

    #[inline]
    pub fn matches(&self, url: &NormalizedUrl) -> bool {
        self.matcher.matches(url)
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// A rule that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub list: ListKind,
    /// Position in the list as supplied
    pub position: usize,
    pub raw: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: PatternError,
}

fn serialize_error<S: serde::Serializer>(error: &PatternError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

// =============================================================================
// Rule Index
// =============================================================================

/// A matching rule, borrowed from the index.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub list: ListKind,
    pub position: usize,
    pub rule: &'a CompiledRule,
}

/// Immutable compiled allow and deny lists.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    allow: Vec<CompiledRule>,
    deny: Vec<CompiledRule>,
    diagnostics: Vec<Diagnostic>,
}

impl RuleIndex {
    /// Assemble an index from compiled lists.
    pub fn new(allow: Vec<CompiledRule>, deny: Vec<CompiledRule>, diagnostics: Vec<Diagnostic>) -> Self {
        Self { allow, deny, diagnostics }
    }

    /// Compile raw lists without de-duplication or logging.
    pub fn from_raw<A, D>(allow: &[A], deny: &[D]) -> Self
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        let mut diagnostics = Vec::new();
        let allow = compile_list(ListKind::Allow, allow, &mut diagnostics);
        let deny = compile_list(ListKind::Deny, deny, &mut diagnostics);
        Self { allow, deny, diagnostics }
    }

    #[inline]
    pub fn allow(&self) -> &[CompiledRule] {
        &self.allow
    }

    #[inline]
    pub fn deny(&self) -> &[CompiledRule] {
        &self.deny
    }

    #[inline]
    pub fn list(&self, list: ListKind) -> &[CompiledRule] {
        match list {
            ListKind::Allow => &self.allow,
            ListKind::Deny => &self.deny,
        }
    }

    /// Rules that failed to compile.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// All rules of one list that match the URL, in list order.
    pub fn matching<'a>(&'a self, list: ListKind, url: &'a NormalizedUrl) -> impl Iterator<Item = RuleMatch<'a>> + 'a {
        self.list(list)
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.matches(url))
            .map(move |(position, rule)| RuleMatch { list, position, rule })
    }

    /// Highest-specificity matching rule of one list; the earliest wins ties.
    pub fn best_match<'a>(&'a self, list: ListKind, url: &'a NormalizedUrl) -> Option<RuleMatch<'a>> {
        best_of(self.matching(list, url))
    }
}

/// Pick the highest specificity, keeping the first of equals.
pub fn best_of<'a>(matches: impl Iterator<Item = RuleMatch<'a>>) -> Option<RuleMatch<'a>> {
    matches.fold(None, |best: Option<RuleMatch<'a>>, candidate| match best {
        Some(b) if b.rule.specificity() >= candidate.rule.specificity() => Some(b),
        _ => Some(candidate),
    })
}

fn compile_list<S: AsRef<str>>(list: ListKind, raws: &[S], diagnostics: &mut Vec<Diagnostic>) -> Vec<CompiledRule> {
    raws.iter()
        .enumerate()
        .map(|(position, raw)| {
            let raw = raw.as_ref();
            let (rule, error) = CompiledRule::compile_or_invalid(raw);
            if let Some(error) = error {
                diagnostics.push(Diagnostic {
                    list,
                    position,
                    raw: raw.to_string(),
                    error,
                });
            }
            rule
        })
        .collect()
}
