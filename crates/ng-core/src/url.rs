//! URL normalization
//!
//! Turns a raw navigation URL into the lowercase, structured form every
//! matcher compares against. Parsing never fails: anything that cannot be
//! read as `scheme://host/path` or `host/path` degrades to an opaque value
//! that no pattern can match.

use crate::types::SchemeMask;

// =============================================================================
// Normalized URL
// =============================================================================

/// A URL ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Trimmed, lowercased input (keywords match against this)
    original: String,
    scheme: Option<String>,
    scheme_mask: SchemeMask,
    host: String,
    /// Path plus query and fragment, always starting with `/` unless opaque
    target: String,
    /// Byte offset where the query or fragment begins in `target`
    path_end: usize,
    opaque: bool,
}

impl NormalizedUrl {
    /// Normalize a raw URL string.
    pub fn parse(raw: &str) -> Self {
        normalize_url(raw)
    }

    /// The whole trimmed, lowercased input.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Scheme without `://`, unset for bare `host/path` input.
    #[inline]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Scheme classification. Empty when no scheme was given.
    #[inline]
    pub fn scheme_mask(&self) -> SchemeMask {
        self.scheme_mask
    }

    /// Hostname without userinfo, port or trailing dot.
    /// For opaque URLs this is the whole input.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path without query or fragment.
    #[inline]
    pub fn path(&self) -> &str {
        &self.target[..self.path_end]
    }

    /// Path including query and fragment.
    #[inline]
    pub fn path_and_query(&self) -> &str {
        &self.target
    }

    /// True when the input could not be parsed into host and path.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// True for browser-internal pages (chrome://, about:, extension pages).
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.scheme_mask == SchemeMask::INTERNAL
    }

    fn opaque(original: String, scheme: Option<String>, scheme_mask: SchemeMask) -> Self {
        Self {
            host: original.clone(),
            original,
            scheme,
            scheme_mask,
            target: String::new(),
            path_end: 0,
            opaque: true,
        }
    }
}

// =============================================================================
// Scheme Extraction
// =============================================================================

/// How the scheme was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchemeForm<'a> {
    /// `scheme://rest`
    Hierarchical(&'a str, &'a str),
    /// `scheme:rest` (about:blank, data:, view-source:)
    Opaque(&'a str, &'a str),
    /// `host/path` with no scheme at all
    Absent(&'a str),
    /// `://` present but the scheme is empty or malformed
    Malformed,
}

/// Split the scheme off an already-lowercased string.
pub(crate) fn split_scheme(s: &str) -> SchemeForm<'_> {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'/' | b'?' | b'#' => break,
            b':' => {
                let scheme = &s[..i];
                if let Some(rest) = s[i..].strip_prefix("://") {
                    if !is_valid_scheme(scheme) {
                        return SchemeForm::Malformed;
                    }
                    return SchemeForm::Hierarchical(scheme, rest);
                }

                // `scheme:` without slashes, unless the colon introduces a port (`host:8080`).
                let after = &s[i + 1..];
                let port_len = after
                    .bytes()
                    .take_while(|b| !matches!(b, b'/' | b'?' | b'#'))
                    .count();
                let is_port = port_len > 0 && after.as_bytes()[..port_len].iter().all(u8::is_ascii_digit);
                if !is_port && is_valid_scheme(scheme) {
                    return SchemeForm::Opaque(scheme, after);
                }
                break;
            }
            _ => {}
        }
    }

    SchemeForm::Absent(s)
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`.
#[inline]
fn is_valid_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Position where the authority ends (first `/`, `?` or `#`).
#[inline]
pub(crate) fn authority_end(rest: &str) -> usize {
    rest.bytes()
        .position(|b| b == b'/' || b == b'?' || b == b'#')
        .unwrap_or(rest.len())
}

/// Strip userinfo and port from an authority, returning the bare host.
/// Returns `None` when the port is not numeric.
pub(crate) fn strip_authority(authority: &str) -> Option<&str> {
    let host_port = match authority.rfind('@') {
        Some(at_pos) => &authority[at_pos + 1..],
        None => authority,
    };

    // Bracketed IPv6 literal
    if host_port.starts_with('[') {
        let close = host_port.find(']')?;
        let after = &host_port[close + 1..];
        if !after.is_empty() && !is_port_suffix(after) {
            return None;
        }
        return Some(&host_port[..=close]);
    }

    match host_port.find(':') {
        Some(colon) if is_port_suffix(&host_port[colon..]) => Some(&host_port[..colon]),
        Some(_) => None,
        None => Some(host_port),
    }
}

/// `:` followed by zero or more digits.
#[inline]
fn is_port_suffix(s: &str) -> bool {
    s.strip_prefix(':')
        .map_or(false, |digits| digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Check that a host contains only characters a hostname can carry.
pub(crate) fn is_valid_host(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_hexdigit() || b == b':' || b == b'.');
    }
    host.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.' || c == '_')
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a raw URL. See [`NormalizedUrl`].
pub fn normalize_url(raw: &str) -> NormalizedUrl {
    let original = raw.trim().to_lowercase();

    let (scheme, rest) = match split_scheme(&original) {
        SchemeForm::Hierarchical(scheme, rest) => (Some(scheme), rest),
        SchemeForm::Opaque(scheme, _) => {
            let scheme = scheme.to_string();
            let mask = SchemeMask::from_scheme(&scheme);
            return NormalizedUrl::opaque(original, Some(scheme), mask);
        }
        SchemeForm::Absent(rest) => (None, rest),
        SchemeForm::Malformed => {
            return NormalizedUrl::opaque(original, None, SchemeMask::empty());
        }
    };

    let scheme_mask = scheme.map_or(SchemeMask::empty(), SchemeMask::from_scheme);
    let scheme = scheme.map(str::to_string);

    let host_end = authority_end(rest);
    let host = match strip_authority(&rest[..host_end]) {
        Some(host) => host.strip_suffix('.').unwrap_or(host),
        None => return NormalizedUrl::opaque(original, scheme, scheme_mask),
    };

    // Extension pages carry an id rather than a hostname; keep them addressable
    // so the resolver can classify them as internal.
    if !is_valid_host(host) && scheme_mask != SchemeMask::INTERNAL {
        return NormalizedUrl::opaque(original, scheme, scheme_mask);
    }
    let host = host.to_string();

    let remainder = &rest[host_end..];
    let target = if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        // Absent path means root; `?` and `#` attach to it.
        format!("/{remainder}")
    };
    let path_end = target
        .bytes()
        .position(|b| b == b'?' || b == b'#')
        .unwrap_or(target.len());

    NormalizedUrl {
        original,
        scheme,
        scheme_mask,
        host,
        target,
        path_end,
        opaque: false,
    }
}

/// Quick check used before any parsing: is this a browser-internal page?
pub fn is_internal_url(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    match split_scheme(&lowered) {
        SchemeForm::Hierarchical(scheme, _) | SchemeForm::Opaque(scheme, _) => {
            SchemeMask::from_scheme(scheme) == SchemeMask::INTERNAL
        }
        _ => false,
    }
}
