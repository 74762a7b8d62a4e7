//! Keyword rules
//!
//! Keywords are plain case-insensitive substrings. Settings store them either
//! as bare strings or as `{ "pattern": "..." }` objects; both shapes are
//! folded into [`Keyword`] once, at ingestion.

use serde::Serialize;
use serde_json::Value;

use crate::url::NormalizedUrl;

/// A parsed keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Keyword {
    /// Entry as the user wrote it (trimmed)
    pub raw: String,
    /// Lowercased match text
    pub text: String,
}

impl Keyword {
    /// Build a keyword from text. Empty or whitespace-only text yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            text: raw.to_lowercase(),
        })
    }

    /// Build a keyword from a settings value: a string, or an object with a
    /// string `pattern` field. Anything else yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Object(map) => map.get("pattern").and_then(Value::as_str).and_then(Self::new),
            _ => None,
        }
    }

    /// Case-insensitive substring test against the full URL or its host.
    #[inline]
    pub fn matches(&self, url: &NormalizedUrl) -> bool {
        url.as_str().contains(&self.text) || url.host().contains(&self.text)
    }
}

/// Parse a list of settings values, silently dropping unusable entries.
pub fn parse_keywords(values: &[Value]) -> Vec<Keyword> {
    values.iter().filter_map(Keyword::from_value).collect()
}

/// Parse a list of plain strings, dropping empty entries.
pub fn parse_keyword_strings<S: AsRef<str>>(values: &[S]) -> Vec<Keyword> {
    values.iter().filter_map(|value| Keyword::new(value.as_ref())).collect()
}

/// First keyword matching the URL, in list order.
pub fn find_match<'k>(keywords: &'k [Keyword], url: &NormalizedUrl) -> Option<&'k Keyword> {
    keywords.iter().find(|keyword| keyword.matches(url))
}
