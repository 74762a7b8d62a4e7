//! Persisted settings document
//!
//! Mirrors what the extension stores: the mode plus the four user lists.
//! Older builds wrote the rule lists as `whitelist`/`blacklist` or
//! `allowList`/`blockList`; both spellings are still read.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ng_core::keyword::parse_keywords;
use ng_core::{Mode, PolicySnapshot};

use crate::builder::{compile_with_stats, CompileStats};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown mode \"{0}\" (expected blacklist, whitelist or combined)")]
    UnknownMode(String),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(alias = "whitelist", alias = "allowList")]
    pub allow_rules: Vec<String>,
    #[serde(alias = "blacklist", alias = "blockList")]
    pub deny_rules: Vec<String>,
    /// Strings or `{ "pattern": ... }` objects
    pub allow_keywords: Vec<Value>,
    pub deny_keywords: Vec<Value>,
}

/// A compiled settings document, ready to publish.
#[derive(Debug, Clone)]
pub struct CompiledSettings {
    pub snapshot: PolicySnapshot,
    pub stats: CompileStats,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The configured mode; blacklist when unset.
    pub fn mode(&self) -> Result<Mode, SettingsError> {
        match &self.mode {
            None => Ok(Mode::default()),
            Some(raw) => Mode::parse(raw).ok_or_else(|| SettingsError::UnknownMode(raw.clone())),
        }
    }

    /// Compile into a snapshot for [`ng_core::Engine::update`].
    pub fn compile(&self) -> Result<CompiledSettings, SettingsError> {
        let mode = self.mode()?;
        let output = compile_with_stats(&self.allow_rules, &self.deny_rules);
        let allow_keywords = parse_keywords(&self.allow_keywords);
        let deny_keywords = parse_keywords(&self.deny_keywords);

        let dropped = self.allow_keywords.len() + self.deny_keywords.len() - allow_keywords.len() - deny_keywords.len();
        if dropped > 0 {
            log::warn!("ignoring {dropped} empty or malformed keyword entries");
        }

        Ok(CompiledSettings {
            snapshot: PolicySnapshot::new(output.index, allow_keywords, deny_keywords, mode),
            stats: output.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::DecideOptions;

    #[test]
    fn test_defaults_when_fields_missing() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings.mode().unwrap(), Mode::Blacklist);
        assert!(settings.allow_rules.is_empty());
        assert!(settings.deny_keywords.is_empty());
    }

    #[test]
    fn test_legacy_list_names() {
        let settings = Settings::from_json(r#"{"mode":"whitelist","whitelist":["a.com"],"blockList":["b.com"]}"#).unwrap();
        assert_eq!(settings.mode().unwrap(), Mode::Whitelist);
        assert_eq!(settings.allow_rules, vec!["a.com"]);
        assert_eq!(settings.deny_rules, vec!["b.com"]);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let settings = Settings::from_json(r#"{"mode":"strict"}"#).unwrap();
        assert!(matches!(settings.mode(), Err(SettingsError::UnknownMode(m)) if m == "strict"));
        assert!(settings.compile().is_err());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(Settings::from_json("{\"allowRules\": 3}"), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_compile_builds_snapshot() {
        let settings = Settings::from_json(
            r#"{
                "mode": "combined",
                "allowRules": ["reddit.com/r/askscience/*"],
                "denyRules": ["reddit.com/r/*", "reddit.com/r/*"],
                "allowKeywords": ["work", {"pattern": "docs"}, 42, ""],
                "denyKeywords": ["gaming"]
            }"#,
        )
        .unwrap();

        let compiled = settings.compile().unwrap();
        assert_eq!(compiled.stats.deduped, 1);
        assert_eq!(compiled.snapshot.allow_keywords.len(), 2);
        assert_eq!(compiled.snapshot.mode, Mode::Combined);

        let never = |_: &str| false;
        let snapshot = &compiled.snapshot;
        assert!(!snapshot.decide("https://reddit.com/r/askscience/x", &never, DecideOptions::default()).blocked);
        assert!(snapshot.decide("https://reddit.com/r/pics", &never, DecideOptions::default()).blocked);
        assert!(!snapshot.decide("https://reddit.com/r/pics/docs", &never, DecideOptions::default()).blocked);
        assert!(snapshot.decide("https://gaming.example/", &never, DecideOptions::default()).blocked);
    }

    #[test]
    fn test_round_trip_uses_current_names() {
        let settings = Settings {
            mode: Some("combined".into()),
            allow_rules: vec!["a.com".into()],
            ..Settings::default()
        };
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"allowRules\""));
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
