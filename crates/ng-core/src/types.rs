//! Core type definitions for NavGate
//!
//! These types are shared by the matcher, the resolver and the bindings, and
//! serialize to the camelCase JSON shape the extension glue consumes.

use serde::{Deserialize, Serialize};

// =============================================================================
// Mode
// =============================================================================

/// Global policy governing unmatched URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Block what the deny list names, allow everything else.
    #[default]
    Blacklist,
    /// Allow only what the allow list names, block everything else.
    Whitelist,
    /// Both lists apply; conflicts are settled by specificity.
    Combined,
}

impl Mode {
    /// Parse from the settings string. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blacklist" | "blocklist" | "deny" => Some(Self::Blacklist),
            "whitelist" | "allowlist" | "allow" => Some(Self::Whitelist),
            "combined" | "both" => Some(Self::Combined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
            Self::Combined => "combined",
        }
    }
}

// =============================================================================
// Rule lists
// =============================================================================

/// Which user list a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Allow,
    Deny,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

// =============================================================================
// Scheme Masks
// =============================================================================

bitflags::bitflags! {
    /// URL scheme mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SchemeMask: u8 {
        const HTTP = 1 << 0;
        const HTTPS = 1 << 1;
        const WS = 1 << 2;
        const WSS = 1 << 3;
        const FTP = 1 << 4;
        const FILE = 1 << 5;
        /// Browser-internal pages (chrome://, about:, extension pages)
        const INTERNAL = 1 << 6;
        /// Any other scheme
        const OTHER = 1 << 7;
        /// Schemes accepted by a pattern that names no protocol
        const WEB = Self::HTTP.bits() | Self::HTTPS.bits();
    }
}

impl SchemeMask {
    /// Classify a lowercase scheme name (without `:` or `//`).
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "http" => Self::HTTP,
            "https" => Self::HTTPS,
            "ws" => Self::WS,
            "wss" => Self::WSS,
            "ftp" => Self::FTP,
            "file" => Self::FILE,
            s if is_internal_scheme(s) => Self::INTERNAL,
            _ => Self::OTHER,
        }
    }
}

/// Schemes that address browser-internal pages rather than the web.
const INTERNAL_SCHEMES: &[&str] = &[
    "about",
    "brave",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "extension",
    "moz-extension",
    "opera",
    "resource",
    "safari-web-extension",
    "view-source",
    "vivaldi",
];

/// Check whether a lowercase scheme name is browser-internal.
#[inline]
pub fn is_internal_scheme(scheme: &str) -> bool {
    INTERNAL_SCHEMES.contains(&scheme)
}

// =============================================================================
// Decision
// =============================================================================

/// Machine-readable origin of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionSource {
    InternalPage,
    TemporaryAllow,
    AllowKeyword,
    AllowRule,
    DenyRule,
    DenyKeyword,
    NotOnAllowList,
    NoMatch,
}

/// The engine's verdict for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub blocked: bool,
    /// Human-readable explanation
    pub reason: String,
    /// Raw text of the winning rule or keyword
    pub matched_rule: Option<String>,
    /// Specificity of the winning rule, 0 when no rule matched
    pub specificity: u32,
    pub source: DecisionSource,
    /// Rule on the opposing list that lost the specificity comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
}

impl Decision {
    pub(crate) fn allow(source: DecisionSource, reason: impl Into<String>) -> Self {
        Self {
            blocked: false,
            reason: reason.into(),
            matched_rule: None,
            specificity: 0,
            source,
            overridden_rule: None,
            trace: None,
        }
    }

    pub(crate) fn block(source: DecisionSource, reason: impl Into<String>) -> Self {
        Self {
            blocked: true,
            ..Self::allow(source, reason)
        }
    }

    pub(crate) fn with_rule(mut self, raw: &str, specificity: u32) -> Self {
        self.matched_rule = Some(raw.to_string());
        self.specificity = specificity;
        self
    }
}

// =============================================================================
// Trace
// =============================================================================

/// Why a single rule did or did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOutcome {
    Matched,
    ProtocolMismatch,
    HostMismatch,
    PathMismatch,
    /// The rule failed to compile and can never match
    Invalid,
    /// The URL could not be parsed and can never match
    OpaqueUrl,
}

/// One evaluation recorded while deciding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TraceStep {
    #[serde(rename_all = "camelCase")]
    Rule {
        list: ListKind,
        position: usize,
        raw: String,
        specificity: u32,
        outcome: RuleOutcome,
    },
    #[serde(rename_all = "camelCase")]
    Keyword {
        list: ListKind,
        raw: String,
        matched: bool,
    },
}

/// Structured record of everything `decide` looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn matched_rules(&self, list: ListKind) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(move |step| match step {
            TraceStep::Rule { list: l, raw, outcome: RuleOutcome::Matched, .. } if *l == list => {
                Some(raw.as_str())
            }
            _ => None,
        })
    }
}
