//! NavGate Rule Compiler
//!
//! This crate turns user settings and plain-text rule lists into the
//! immutable rule index consumed by `ng-core`.

pub mod parser;
pub mod optimizer;
pub mod builder;
pub mod settings;
pub mod explain;

pub use builder::{compile, compile_with_stats, CompileOutput, CompileStats};
pub use explain::{explain_pattern, PatternReport};
pub use optimizer::optimize_rules;
pub use parser::{format_rule_list, parse_rule_list};
pub use settings::{CompiledSettings, Settings, SettingsError};
