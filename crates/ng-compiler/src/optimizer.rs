use std::collections::HashSet;

use ng_core::{CompiledRule, NormalizedPattern};

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Drop later rules whose normalized pattern repeats an earlier one.
///
/// The first occurrence wins specificity ties, so removing the rest never
/// changes a decision. Invalid placeholders are left alone.
pub fn optimize_rules(rules: &mut Vec<CompiledRule>) -> OptimizeStats {
    let before = rules.len();

    let mut seen: HashSet<RuleKey> = HashSet::new();
    let mut deduped = 0usize;
    rules.retain(|rule| {
        let Some(key) = RuleKey::from_rule(rule) else {
            return true;
        };
        if seen.contains(&key) {
            log::trace!("dropping duplicate rule \"{}\"", rule.raw());
            deduped += 1;
            false
        } else {
            seen.insert(key);
            true
        }
    });

    let after = rules.len();

    OptimizeStats { before, after, deduped }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    pattern: NormalizedPattern,
}

impl RuleKey {
    fn from_rule(rule: &CompiledRule) -> Option<Self> {
        rule.pattern().map(|pattern| Self {
            pattern: pattern.clone(),
        })
    }
}
