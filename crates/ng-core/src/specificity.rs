//! Specificity scoring
//!
//! Ranks how narrowly a pattern targets URLs. Scores are used only to settle
//! conflicts when a URL matches both an allow and a deny rule, and depend on
//! nothing but the pattern's structure.

use crate::pattern::{NormalizedPattern, PathSpec, SegmentMatcher};

/// Domain part: `*.example.com`
pub const DOMAIN_WILDCARD: u32 = 10;
/// Domain part: `example.com`
pub const DOMAIN_REGISTRABLE: u32 = 20;
/// Domain part: `news.example.com` (three or more labels)
pub const DOMAIN_NAMED_SUBDOMAIN: u32 = 30;

pub const PATH_NONE: u32 = 5;
pub const PATH_ANY_NON_EMPTY: u32 = 10;
pub const PATH_WILDCARD: u32 = 20;
pub const PATH_EXACT: u32 = 30;
/// Extra weight for naming a sub-collection such as `/r/rust`
pub const COLLECTION_BOOST: u32 = 10;

/// First path segments that introduce a named forum, category or channel.
const COLLECTION_MARKERS: &[&str] = &[
    "board",
    "boards",
    "c",
    "categories",
    "category",
    "channel",
    "community",
    "communities",
    "forum",
    "forums",
    "g",
    "groups",
    "r",
    "t",
    "tag",
    "tags",
    "topic",
    "topics",
    "u",
    "user",
    "users",
];

/// Total specificity of a pattern.
pub fn specificity(pattern: &NormalizedPattern) -> u32 {
    domain_score(pattern) + path_score(&pattern.path_spec)
}

/// Domain component of the score.
pub fn domain_score(pattern: &NormalizedPattern) -> u32 {
    if pattern.subdomain_wildcard {
        DOMAIN_WILDCARD
    } else if pattern.label_count() >= 3 {
        DOMAIN_NAMED_SUBDOMAIN
    } else {
        DOMAIN_REGISTRABLE
    }
}

/// Path component of the score, including the collection boost.
pub fn path_score(spec: &PathSpec) -> u32 {
    match spec {
        PathSpec::None | PathSpec::RootOnly => PATH_NONE,
        PathSpec::AnyNonEmpty => PATH_ANY_NON_EMPTY,
        PathSpec::PrefixWildcard(prefix) => PATH_WILDCARD + boost(literal_collection(prefix)),
        PathSpec::Exact(path) => PATH_EXACT + boost(literal_collection(path)),
        PathSpec::Segmented(segments) => PATH_WILDCARD + boost(segmented_collection(segments)),
    }
}

#[inline]
fn boost(names_collection: bool) -> u32 {
    if names_collection {
        COLLECTION_BOOST
    } else {
        0
    }
}

#[inline]
fn is_collection_marker(segment: &str) -> bool {
    COLLECTION_MARKERS.contains(&segment)
}

/// `/r/<name>...` written as a literal path.
fn literal_collection(path: &str) -> bool {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some(marker), Some(name)) => is_collection_marker(marker) && !name.is_empty() && !name.contains(['?', '#']),
        _ => false,
    }
}

/// `/r/<name>/...` where both leading segments are literal.
fn segmented_collection(segments: &[SegmentMatcher]) -> bool {
    match segments {
        [SegmentMatcher::Literal(marker), SegmentMatcher::Literal(_), ..] => is_collection_marker(marker),
        _ => false,
    }
}
