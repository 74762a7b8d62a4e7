//! Compiled pattern matchers
//!
//! This is the hot path - every rule of every list is tested against each
//! navigation. A [`Matcher`] is built once from a [`NormalizedPattern`] and
//! then only borrows from the URL it tests: no allocations per call.

use crate::pattern::{NormalizedPattern, PathSpec, SegmentMatcher};
use crate::types::{RuleOutcome, SchemeMask};
use crate::url::NormalizedUrl;

// =============================================================================
// Matcher
// =============================================================================

/// Immutable predicate `protocol ∧ host ∧ path` derived from one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    kind: MatcherKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatcherKind {
    /// Stand-in for a pattern that failed to compile
    Never,
    Pattern {
        protocol: ProtocolPredicate,
        host: HostPredicate,
        path: PathSpec,
        matches_query: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProtocolPredicate {
    /// http, https, or no scheme at all
    Web,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostPredicate {
    base: String,
    subdomains_only: bool,
}

impl Matcher {
    /// Build a matcher from a normalized pattern.
    pub fn compile(pattern: &NormalizedPattern) -> Self {
        let protocol = match &pattern.protocol {
            Some(protocol) => ProtocolPredicate::Exact(protocol.clone()),
            None => ProtocolPredicate::Web,
        };

        Self {
            kind: MatcherKind::Pattern {
                protocol,
                host: HostPredicate {
                    base: pattern.base_domain.clone(),
                    subdomains_only: pattern.subdomain_wildcard,
                },
                path: pattern.path_spec.clone(),
                matches_query: pattern.matches_query,
            },
        }
    }

    /// A matcher that rejects every URL.
    pub fn never() -> Self {
        Self { kind: MatcherKind::Never }
    }

    /// True when this matcher can never succeed.
    #[inline]
    pub fn is_never(&self) -> bool {
        matches!(self.kind, MatcherKind::Never)
    }

    /// Test a URL.
    #[inline]
    pub fn matches(&self, url: &NormalizedUrl) -> bool {
        self.explain(url) == RuleOutcome::Matched
    }

    /// Test a URL and report which predicate decided the outcome.
    pub fn explain(&self, url: &NormalizedUrl) -> RuleOutcome {
        let (protocol, host, path, matches_query) = match &self.kind {
            MatcherKind::Never => return RuleOutcome::Invalid,
            MatcherKind::Pattern { protocol, host, path, matches_query } => {
                (protocol, host, path, *matches_query)
            }
        };

        if url.is_opaque() {
            return RuleOutcome::OpaqueUrl;
        }
        if !protocol.matches(url) {
            return RuleOutcome::ProtocolMismatch;
        }
        if !host.matches(url.host()) {
            return RuleOutcome::HostMismatch;
        }

        let target = if matches_query { url.path_and_query() } else { url.path() };
        if !path_matches(path, target) {
            return RuleOutcome::PathMismatch;
        }

        RuleOutcome::Matched
    }
}

impl ProtocolPredicate {
    #[inline]
    fn matches(&self, url: &NormalizedUrl) -> bool {
        match self {
            Self::Web => {
                let mask = url.scheme_mask();
                mask.is_empty() || SchemeMask::WEB.contains(mask)
            }
            Self::Exact(protocol) => url.scheme() == Some(protocol.as_str()),
        }
    }
}

impl HostPredicate {
    #[inline]
    fn matches(&self, host: &str) -> bool {
        if host == self.base {
            return !self.subdomains_only;
        }
        is_subdomain_of(host, &self.base)
    }
}

/// `host` ends with `"." + base` and has at least one label before it.
#[inline]
pub fn is_subdomain_of(host: &str, base: &str) -> bool {
    host.len() > base.len() + 1
        && host.ends_with(base)
        && host.as_bytes()[host.len() - base.len() - 1] == b'.'
}

// =============================================================================
// Path Matching
// =============================================================================

/// Test a URL path (or path plus query) against a path spec.
pub fn path_matches(spec: &PathSpec, path: &str) -> bool {
    match spec {
        PathSpec::None => true,
        PathSpec::RootOnly => path.is_empty() || path == "/",
        PathSpec::AnyNonEmpty => !(path.is_empty() || path == "/"),
        PathSpec::PrefixWildcard(prefix) => match path.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        },
        PathSpec::Segmented(segments) => segments_match(segments, path),
        PathSpec::Exact(expected) => trim_trailing_slash(path) == trim_trailing_slash(expected),
    }
}

#[inline]
fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Positional segment matching with one-or-more (`**`) absorption.
///
/// Iterative star backtracking: only the most recent `**` is ever revisited,
/// and each revisit consumes one more path segment, so the work is bounded by
/// `segments.len() * path segment count`.
pub fn segments_match(pattern: &[SegmentMatcher], path: &str) -> bool {
    let body = path.strip_prefix('/').unwrap_or(path);
    let mut remaining = Segments::new(body);

    let mut p = 0;
    let mut star = None;

    loop {
        if let Some(matcher) = pattern.get(p) {
            let mut next = remaining.clone();
            match matcher {
                SegmentMatcher::Rest => return true,
                SegmentMatcher::AnyMany => {
                    if next.next().is_some() {
                        star = Some((p, next.clone()));
                        remaining = next;
                        p += 1;
                        continue;
                    }
                }
                single => {
                    if let Some(segment) = next.next() {
                        if segment_matches(single, segment) {
                            remaining = next;
                            p += 1;
                            continue;
                        }
                    }
                }
            }
        } else if remaining.clone().next().is_none() {
            return true;
        }

        // Mismatch: let the last `**` absorb one more segment and retry after it.
        match star.as_mut() {
            Some((star_p, absorbed)) => {
                if absorbed.next().is_none() {
                    return false;
                }
                remaining = absorbed.clone();
                p = *star_p + 1;
            }
            None => return false,
        }
    }
}

/// Path segments of a URL target. A query or fragment stays attached to the
/// last path segment, whatever `/` it contains.
#[derive(Debug, Clone)]
struct Segments<'a> {
    rest: Option<&'a str>,
    /// Length of the path portion of `rest`
    path_len: usize,
}

impl<'a> Segments<'a> {
    fn new(body: &'a str) -> Self {
        let path_len = body.find(['?', '#']).unwrap_or(body.len());
        let (rest, path_len) = if path_len == body.len() {
            let trimmed = body.strip_suffix('/').unwrap_or(body);
            (trimmed, trimmed.len())
        } else {
            (body, path_len)
        };
        Self {
            rest: (!rest.is_empty()).then_some(rest),
            path_len,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest[..self.path_len].find('/') {
            Some(slash) => {
                self.rest = Some(&rest[slash + 1..]);
                self.path_len -= slash + 1;
                Some(&rest[..slash])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Test one path segment against a single-segment matcher.
#[inline]
fn segment_matches(matcher: &SegmentMatcher, segment: &str) -> bool {
    match matcher {
        SegmentMatcher::Literal(literal) => segment == literal,
        SegmentMatcher::Any | SegmentMatcher::AnyMany | SegmentMatcher::Rest => true,
        SegmentMatcher::Glob { head, middle, tail } => glob_matches(head, middle, tail, segment),
    }
}

/// Partial-wildcard segment: anchored head and tail, middle pieces found
/// leftmost-first so each `*` takes as little as possible.
fn glob_matches(head: &str, middle: &[String], tail: &str, segment: &str) -> bool {
    if segment.len() < head.len() + tail.len() {
        return false;
    }
    if !segment.starts_with(head) || !segment.ends_with(tail) {
        return false;
    }

    let mut window = &segment[head.len()..segment.len() - tail.len()];
    for piece in middle {
        match window.find(piece.as_str()) {
            Some(pos) => window = &window[pos + piece.len()..],
            None => return false,
        }
    }

    true
}
