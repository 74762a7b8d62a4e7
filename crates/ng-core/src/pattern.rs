//! Pattern normalization
//!
//! Parses user-authored wildcard rules such as `*.example.com/path/*` or
//! `https://example.com/r/*/comments` into a [`NormalizedPattern`]. The path
//! part is classified once into a [`PathSpec`] so the matcher never has to
//! re-inspect the raw text.

use std::fmt;

use crate::url::{authority_end, is_valid_host, split_scheme, strip_authority, SchemeForm};

// =============================================================================
// Errors
// =============================================================================

/// Reasons a pattern cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("pattern '{pattern}' contains invalid character {ch:?}")]
    InvalidCharacter { pattern: String, ch: char },
    #[error("pattern '{pattern}' has a malformed protocol")]
    InvalidProtocol { pattern: String },
    #[error("pattern '{pattern}' has no host")]
    EmptyHost { pattern: String },
    #[error("pattern '{pattern}' may only use '*' as a leading '*.' label in the host")]
    MisplacedWildcard { pattern: String },
    #[error("pattern '{pattern}' contains an empty host label")]
    EmptyLabel { pattern: String },
    #[error("pattern '{pattern}' has an invalid host")]
    InvalidHost { pattern: String },
    #[error("pattern '{pattern}' contains an empty path segment")]
    EmptySegment { pattern: String },
}

/// Characters that are never valid anywhere in a pattern.
const FORBIDDEN_CHARS: &[char] = &['[', ']', '(', ')', '{', '}', '\\', '<', '>', '"', '|', '^', '`', '@'];

// =============================================================================
// Path Spec
// =============================================================================

/// One positional element of a [`PathSpec::Segmented`] path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentMatcher {
    /// Segment must equal this text
    Literal(String),
    /// `*`: exactly one segment of any content
    Any,
    /// `**`: one or more segments
    AnyMany,
    /// Partial wildcard such as `foo*bar`: starts with `head`, ends with
    /// `tail`, and contains each of `middle` in order in between
    Glob {
        head: String,
        middle: Vec<String>,
        tail: String,
    },
    /// Trailing `*` after an embedded wildcard: zero or more remaining segments
    Rest,
}

impl SegmentMatcher {
    fn from_segment(segment: &str) -> Self {
        match segment {
            "*" => Self::Any,
            "**" => Self::AnyMany,
            s if s.contains('*') => {
                let mut pieces: Vec<&str> = s.split('*').collect();
                // split on '*' always yields at least two pieces here
                let tail = pieces.pop().unwrap_or_default().to_string();
                let head = if pieces.is_empty() { String::new() } else { pieces.remove(0).to_string() };
                let middle = pieces
                    .into_iter()
                    .filter(|piece| !piece.is_empty())
                    .map(str::to_string)
                    .collect();
                Self::Glob { head, middle, tail }
            }
            s => Self::Literal(s.to_string()),
        }
    }

    /// True for segments that are a literal name.
    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl fmt::Display for SegmentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Any | Self::Rest => f.write_str("*"),
            Self::AnyMany => f.write_str("**"),
            Self::Glob { head, middle, tail } => {
                f.write_str(head)?;
                for piece in middle {
                    write!(f, "*{piece}")?;
                }
                write!(f, "*{tail}")
            }
        }
    }
}

/// Path constraint of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSpec {
    /// No path given: the whole domain
    None,
    /// `/`: only the root page
    RootOnly,
    /// `/*`: any page except the root
    AnyNonEmpty,
    /// `/prefix/*`: the prefix itself and everything below it
    PrefixWildcard(String),
    /// Path with embedded wildcards, matched segment by segment
    Segmented(Vec<SegmentMatcher>),
    /// Literal path, compared modulo one trailing slash
    Exact(String),
}

impl PathSpec {
    /// Stable name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RootOnly => "root-only",
            Self::AnyNonEmpty => "any-non-empty",
            Self::PrefixWildcard(_) => "prefix-wildcard",
            Self::Segmented(_) => "segmented",
            Self::Exact(_) => "exact",
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::RootOnly => f.write_str("/"),
            Self::AnyNonEmpty => f.write_str("/*"),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}/*"),
            Self::Segmented(segments) => {
                for segment in segments {
                    write!(f, "/{segment}")?;
                }
                Ok(())
            }
            Self::Exact(path) => f.write_str(path),
        }
    }
}

// =============================================================================
// Normalized Pattern
// =============================================================================

/// Structured form of a user pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPattern {
    /// Required scheme, or `None` for "http or https"
    pub protocol: Option<String>,
    /// `*.` prefix: subdomains only, never the bare domain
    pub subdomain_wildcard: bool,
    pub base_domain: String,
    pub path_spec: PathSpec,
    /// The path names a query or fragment, so the URL keeps its own
    pub matches_query: bool,
}

impl NormalizedPattern {
    /// Parse a raw pattern string.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        parse_pattern(raw)
    }

    /// Number of dot-separated labels in the base domain.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.base_domain.split('.').count()
    }
}

impl fmt::Display for NormalizedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(protocol) = &self.protocol {
            write!(f, "{protocol}://")?;
        }
        if self.subdomain_wildcard {
            f.write_str("*.")?;
        }
        write!(f, "{}{}", self.base_domain, self.path_spec)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a raw pattern into its normalized form.
pub fn parse_pattern(raw: &str) -> Result<NormalizedPattern, PatternError> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return Err(PatternError::Empty);
    }

    let pattern = || text.clone();

    if let Some(ch) = text.chars().find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c)) {
        return Err(PatternError::InvalidCharacter { pattern: pattern(), ch });
    }

    let (protocol, rest) = match split_scheme(&text) {
        SchemeForm::Hierarchical(scheme, rest) => (Some(scheme.to_string()), rest),
        SchemeForm::Absent(rest) => (None, rest),
        SchemeForm::Opaque(..) | SchemeForm::Malformed => {
            return Err(PatternError::InvalidProtocol { pattern: pattern() });
        }
    };

    let host_end = authority_end(rest);
    let authority = &rest[..host_end];
    let host = strip_authority(authority).ok_or_else(|| PatternError::InvalidHost { pattern: pattern() })?;
    let (subdomain_wildcard, base_domain) = match host.strip_prefix("*.") {
        Some(base) => (true, base),
        None => (false, host),
    };
    let base_domain = base_domain.strip_suffix('.').unwrap_or(base_domain);

    if base_domain.contains('*') || host == "*" {
        return Err(PatternError::MisplacedWildcard { pattern: pattern() });
    }
    if base_domain.is_empty() {
        return Err(PatternError::EmptyHost { pattern: pattern() });
    }
    if base_domain.split('.').any(str::is_empty) {
        return Err(PatternError::EmptyLabel { pattern: pattern() });
    }
    if !is_valid_host(base_domain) {
        return Err(PatternError::InvalidHost { pattern: pattern() });
    }

    let remainder = &rest[host_end..];
    let matches_query = remainder.contains('?') || remainder.contains('#');
    let path_spec = if remainder.is_empty() {
        PathSpec::None
    } else if remainder.starts_with('/') {
        parse_path(remainder).ok_or_else(|| PatternError::EmptySegment { pattern: pattern() })?
    } else {
        parse_path(&format!("/{remainder}")).ok_or_else(|| PatternError::EmptySegment { pattern: pattern() })?
    };

    Ok(NormalizedPattern {
        protocol,
        subdomain_wildcard,
        base_domain: base_domain.to_string(),
        path_spec,
        matches_query,
    })
}

/// Classify a path beginning with `/`. Returns `None` on an empty segment.
fn parse_path(path: &str) -> Option<PathSpec> {
    match path {
        "/" => return Some(PathSpec::RootOnly),
        "/*" | "/**" => return Some(PathSpec::AnyNonEmpty),
        _ => {}
    }

    let body = &path[1..];
    // `/` inside a query or fragment does not start a new segment
    let query_at = body.find(['?', '#']).unwrap_or(body.len());
    let (dirs, query) = body.split_at(query_at);
    let dirs = if query.is_empty() { dirs.strip_suffix('/').unwrap_or(dirs) } else { dirs };
    if query.is_empty() && (dirs == "*" || dirs == "**") {
        return Some(PathSpec::AnyNonEmpty);
    }

    let mut segments: Vec<String> = dirs.split('/').map(str::to_string).collect();
    if let Some(last) = segments.last_mut() {
        last.push_str(query);
    }
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    let (last, leading) = segments.split_last()?;
    let leading_wildcard = leading.iter().any(|segment| segment.contains('*'));

    if !leading_wildcard && !last.contains('*') {
        return Some(PathSpec::Exact(format!("/{dirs}{query}")));
    }

    if !leading_wildcard && last == "*" {
        return Some(PathSpec::PrefixWildcard(format!("/{}", leading.join("/"))));
    }

    let mut matchers: Vec<SegmentMatcher> = leading.iter().map(|s| SegmentMatcher::from_segment(s)).collect();
    if last == "*" {
        matchers.push(SegmentMatcher::Rest);
    } else {
        matchers.push(SegmentMatcher::from_segment(last));
    }

    Some(PathSpec::Segmented(matchers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(raw: &str) -> PathSpec {
        parse_pattern(raw).unwrap().path_spec
    }

    #[test]
    fn test_domain_only() {
        let p = parse_pattern("  Example.COM ").unwrap();
        assert_eq!(p.protocol, None);
        assert!(!p.subdomain_wildcard);
        assert_eq!(p.base_domain, "example.com");
        assert_eq!(p.path_spec, PathSpec::None);
        assert!(!p.matches_query);
    }

    #[test]
    fn test_protocol_and_wildcard_host() {
        let p = parse_pattern("https://*.example.com/*").unwrap();
        assert_eq!(p.protocol.as_deref(), Some("https"));
        assert!(p.subdomain_wildcard);
        assert_eq!(p.base_domain, "example.com");
        assert_eq!(p.path_spec, PathSpec::AnyNonEmpty);
    }

    #[test]
    fn test_path_classification() {
        assert_eq!(path_of("example.com/"), PathSpec::RootOnly);
        assert_eq!(path_of("example.com/*"), PathSpec::AnyNonEmpty);
        assert_eq!(path_of("example.com/*/"), PathSpec::AnyNonEmpty);
        assert_eq!(path_of("example.com/**/"), PathSpec::AnyNonEmpty);
        assert_eq!(path_of("example.com/blog/*/"), PathSpec::PrefixWildcard("/blog".into()));
        assert_eq!(path_of("example.com/blog/*"), PathSpec::PrefixWildcard("/blog".into()));
        assert_eq!(path_of("example.com/a/b/*"), PathSpec::PrefixWildcard("/a/b".into()));
        assert_eq!(path_of("example.com/blog"), PathSpec::Exact("/blog".into()));
        assert_eq!(path_of("example.com/blog/"), PathSpec::Exact("/blog".into()));
        assert_eq!(
            path_of("example.com/a/*/d"),
            PathSpec::Segmented(vec![
                SegmentMatcher::Literal("a".into()),
                SegmentMatcher::Any,
                SegmentMatcher::Literal("d".into()),
            ])
        );
        assert_eq!(
            path_of("example.com/a/**/d"),
            PathSpec::Segmented(vec![
                SegmentMatcher::Literal("a".into()),
                SegmentMatcher::AnyMany,
                SegmentMatcher::Literal("d".into()),
            ])
        );
        assert_eq!(
            path_of("example.com/*/comments/*"),
            PathSpec::Segmented(vec![
                SegmentMatcher::Any,
                SegmentMatcher::Literal("comments".into()),
                SegmentMatcher::Rest,
            ])
        );
    }

    #[test]
    fn test_glob_segment() {
        assert_eq!(
            path_of("example.com/foo*bar"),
            PathSpec::Segmented(vec![SegmentMatcher::Glob {
                head: "foo".into(),
                middle: vec![],
                tail: "bar".into(),
            }])
        );
        assert_eq!(
            path_of("example.com/a*b**c*"),
            PathSpec::Segmented(vec![SegmentMatcher::Glob {
                head: "a".into(),
                middle: vec!["b".into(), "c".into()],
                tail: String::new(),
            }])
        );
    }

    #[test]
    fn test_query_sensitive_pattern() {
        let p = parse_pattern("youtube.com/watch?v=*").unwrap();
        assert!(p.matches_query);
        assert!(matches!(p.path_spec, PathSpec::Segmented(_)));

        let p = parse_pattern("example.com?ref=x").unwrap();
        assert!(p.matches_query);
        assert_eq!(p.path_spec, PathSpec::Exact("/?ref=x".into()));

        assert_eq!(
            path_of("example.com/*/login?next=/a/*"),
            PathSpec::Segmented(vec![SegmentMatcher::Any, SegmentMatcher::from_segment("login?next=/a/*")])
        );
    }

    #[test]
    fn test_port_is_ignored() {
        let p = parse_pattern("localhost:3000/app").unwrap();
        assert_eq!(p.base_domain, "localhost");
        assert_eq!(p.path_spec, PathSpec::Exact("/app".into()));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(parse_pattern("   "), Err(PatternError::Empty));
        assert!(matches!(parse_pattern("exa mple.com"), Err(PatternError::InvalidCharacter { ch: ' ', .. })));
        assert!(matches!(parse_pattern("example.com/[a-z]+"), Err(PatternError::InvalidCharacter { .. })));
        assert!(matches!(parse_pattern("://example.com"), Err(PatternError::InvalidProtocol { .. })));
        assert!(matches!(parse_pattern("/path/only"), Err(PatternError::EmptyHost { .. })));
        assert!(matches!(parse_pattern("*."), Err(PatternError::EmptyHost { .. })));
        assert!(matches!(parse_pattern("*"), Err(PatternError::MisplacedWildcard { .. })));
        assert!(matches!(parse_pattern("ex*ample.com"), Err(PatternError::MisplacedWildcard { .. })));
        assert!(matches!(parse_pattern("*example.com"), Err(PatternError::MisplacedWildcard { .. })));
        assert!(matches!(parse_pattern("example..com"), Err(PatternError::EmptyLabel { .. })));
        assert!(matches!(parse_pattern("example.com/a//b"), Err(PatternError::EmptySegment { .. })));
        assert!(matches!(parse_pattern("example.com:http/"), Err(PatternError::InvalidProtocol { .. })));
    }

    #[test]
    fn test_display_round_trip_is_canonical() {
        for raw in ["https://*.example.com/a/*/b*c/*", "example.com/blog/*", "example.com/", "example.com"] {
            let p = parse_pattern(raw).unwrap();
            assert_eq!(parse_pattern(&p.to_string()).unwrap(), p);
        }
    }
}
