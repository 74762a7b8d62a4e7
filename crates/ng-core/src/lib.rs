//! NavGate Core Library
//!
//! This crate decides whether a navigation URL is blocked, given user
//! allow/deny lists of wildcard URL patterns and plain keywords.
//!
//! # Architecture
//!
//! Raw rules are normalized and compiled once into an immutable
//! [`RuleIndex`]. At query time the URL is normalized, every rule on both
//! lists is tested, and the resolver settles conflicts by specificity. The
//! [`Engine`] publishes whole snapshots so readers never see a partial
//! rebuild.
//!
//! # Modules
//!
//! - `url`: URL normalization (never fails)
//! - `pattern`: pattern parsing into `NormalizedPattern` / `PathSpec`
//! - `matcher`: compiled protocol, host and path predicates
//! - `specificity`: deterministic pattern ranking
//! - `keyword`: keyword ingestion and substring matching
//! - `index`: compiled allow/deny lists with diagnostics
//! - `resolver`: the `decide` operation
//! - `engine`: atomically swapped policy snapshots
//! - `types`: shared type definitions
//!
//! # Example
//!
//! ```
//! use ng_core::{decide, Mode, RuleIndex};
//!
//! let index = RuleIndex::from_raw(&["reddit.com/r/askscience/*"], &["reddit.com/r/*"]);
//! let decision = decide(
//!     "https://reddit.com/r/askscience/comments/1",
//!     &index,
//!     &[],
//!     &[],
//!     Mode::Combined,
//!     &|_| false,
//! );
//! assert!(!decision.blocked);
//! ```

pub mod engine;
pub mod index;
pub mod keyword;
pub mod matcher;
pub mod pattern;
pub mod resolver;
pub mod specificity;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use engine::{Engine, PolicySnapshot};
pub use index::{CompiledRule, Diagnostic, RuleIndex, RuleMatch};
pub use keyword::{parse_keywords, Keyword};
pub use matcher::Matcher;
pub use pattern::{parse_pattern, NormalizedPattern, PathSpec, PatternError, SegmentMatcher};
pub use resolver::{decide, decide_with, DecideOptions};
pub use specificity::specificity;
pub use types::{Decision, DecisionSource, ListKind, Mode, RuleOutcome, Trace, TraceStep};
pub use url::{is_internal_url, normalize_url, NormalizedUrl};
