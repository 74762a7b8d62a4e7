use serde::Serialize;

use ng_core::{parse_pattern, specificity};

/// How a single raw pattern is understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub raw: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_kind: Option<&'static str>,
    pub subdomains_only: bool,
    pub specificity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn explain_pattern(raw: &str) -> PatternReport {
    match parse_pattern(raw) {
        Ok(pattern) => PatternReport {
            raw: raw.trim().to_string(),
            valid: true,
            normalized: Some(pattern.to_string()),
            path_kind: Some(pattern.path_spec.kind()),
            subdomains_only: pattern.subdomain_wildcard,
            specificity: specificity(&pattern),
            error: None,
        },
        Err(err) => PatternReport {
            raw: raw.trim().to_string(),
            valid: false,
            normalized: None,
            path_kind: None,
            subdomains_only: false,
            specificity: 0,
            error: Some(err.to_string()),
        },
    }
}
