use serde::Serialize;

use ng_core::{CompiledRule, Diagnostic, ListKind, RuleIndex};

use crate::optimizer::optimize_rules;

/// Counters summed over both lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub index: RuleIndex,
    pub stats: CompileStats,
}

/// Compile raw allow and deny lists into a fresh index.
///
/// Rules that fail to parse are kept as never-matching placeholders and
/// reported through [`RuleIndex::diagnostics`]; compilation itself never
/// fails.
pub fn compile<A, D>(allow: &[A], deny: &[D]) -> RuleIndex
where
    A: AsRef<str>,
    D: AsRef<str>,
{
    compile_with_stats(allow, deny).index
}

pub fn compile_with_stats<A, D>(allow: &[A], deny: &[D]) -> CompileOutput
where
    A: AsRef<str>,
    D: AsRef<str>,
{
    let mut diagnostics = Vec::new();
    let mut stats = CompileStats::default();

    let allow = build_list(ListKind::Allow, allow, &mut diagnostics, &mut stats);
    let deny = build_list(ListKind::Deny, deny, &mut diagnostics, &mut stats);

    log::debug!(
        "compiled {} allow and {} deny rules ({} in, {} duplicates, {} invalid)",
        allow.len(),
        deny.len(),
        stats.before,
        stats.deduped,
        stats.invalid
    );

    CompileOutput {
        index: RuleIndex::new(allow, deny, diagnostics),
        stats,
    }
}

fn build_list<S: AsRef<str>>(
    list: ListKind,
    raws: &[S],
    diagnostics: &mut Vec<Diagnostic>,
    stats: &mut CompileStats,
) -> Vec<CompiledRule> {
    let mut rules = Vec::with_capacity(raws.len());

    for (position, raw) in raws.iter().enumerate() {
        let raw = raw.as_ref();
        let (rule, error) = CompiledRule::compile_or_invalid(raw);
        if let Some(error) = error {
            log::warn!("ignoring {} rule #{position} \"{raw}\": {error}", list.as_str());
            diagnostics.push(Diagnostic {
                list,
                position,
                raw: raw.to_string(),
                error,
            });
            stats.invalid += 1;
        }
        rules.push(rule);
    }

    let optimized = optimize_rules(&mut rules);
    stats.before += optimized.before;
    stats.after += optimized.after;
    stats.deduped += optimized.deduped;

    rules
}
