//! Decision resolver
//!
//! Combines the rule index, keyword lists and mode into a [`Decision`].
//! Resolution order:
//!
//! 1. browser-internal pages are always allowed
//! 2. a temporary user unblock for the host allows
//! 3. an allow keyword allows
//! 4. the mode decides (whitelist / blacklist / combined)
//!
//! In combined mode every matching rule on both lists is collected and the
//! most specific rule on each side is compared; allow wins ties.

use crate::index::{best_of, RuleIndex, RuleMatch};
use crate::keyword::{find_match, Keyword};
use crate::types::{Decision, DecisionSource, ListKind, Mode, RuleOutcome, Trace, TraceStep};
use crate::url::NormalizedUrl;

/// Options for [`decide_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecideOptions {
    /// Attach a [`Trace`] of every rule and keyword evaluated
    pub trace: bool,
}

/// Decide whether a URL is blocked.
pub fn decide(
    url: &str,
    index: &RuleIndex,
    allow_keywords: &[Keyword],
    deny_keywords: &[Keyword],
    mode: Mode,
    temp_allow: &dyn Fn(&str) -> bool,
) -> Decision {
    decide_with(url, index, allow_keywords, deny_keywords, mode, temp_allow, DecideOptions::default())
}

/// [`decide`] with options.
pub fn decide_with(
    url: &str,
    index: &RuleIndex,
    allow_keywords: &[Keyword],
    deny_keywords: &[Keyword],
    mode: Mode,
    temp_allow: &dyn Fn(&str) -> bool,
    options: DecideOptions,
) -> Decision {
    let mut trace = options.trace.then(Trace::default);
    let mut decision = resolve(url, index, allow_keywords, deny_keywords, mode, temp_allow, &mut trace);
    decision.trace = trace;

    log::debug!(
        "decide {url}: blocked={} source={:?} rule={:?}",
        decision.blocked,
        decision.source,
        decision.matched_rule
    );

    decision
}

fn resolve(
    raw_url: &str,
    index: &RuleIndex,
    allow_keywords: &[Keyword],
    deny_keywords: &[Keyword],
    mode: Mode,
    temp_allow: &dyn Fn(&str) -> bool,
    trace: &mut Option<Trace>,
) -> Decision {
    let url = NormalizedUrl::parse(raw_url);

    // A0: Browser-internal pages
    if url.is_internal() {
        return Decision::allow(DecisionSource::InternalPage, "internal page");
    }

    // A1: Temporary user unblock
    if temp_allow(url.host()) {
        return Decision::allow(DecisionSource::TemporaryAllow, "temporarily allowed");
    }

    // A2: Allow keywords override everything below
    if let Some(keyword) = check_keywords(ListKind::Allow, allow_keywords, &url, trace) {
        return Decision::allow(DecisionSource::AllowKeyword, format!("allow keyword \"{}\"", keyword.raw))
            .with_rule(&keyword.raw, 0);
    }

    // A3: Mode dispatch
    match mode {
        Mode::Whitelist => resolve_whitelist(index, &url, trace),
        Mode::Blacklist => resolve_blacklist(index, deny_keywords, &url, trace),
        Mode::Combined => resolve_combined(index, deny_keywords, &url, trace),
    }
}

fn resolve_whitelist(index: &RuleIndex, url: &NormalizedUrl, trace: &mut Option<Trace>) -> Decision {
    match best_of(collect_matches(index, ListKind::Allow, url, trace).into_iter()) {
        Some(best) => allowed_by(&best),
        None => Decision::block(DecisionSource::NotOnAllowList, "not on allow list"),
    }
}

fn resolve_blacklist(
    index: &RuleIndex,
    deny_keywords: &[Keyword],
    url: &NormalizedUrl,
    trace: &mut Option<Trace>,
) -> Decision {
    if let Some(best) = best_of(collect_matches(index, ListKind::Deny, url, trace).into_iter()) {
        return blocked_by(&best);
    }
    deny_keyword_or_allow(deny_keywords, url, trace)
}

fn resolve_combined(
    index: &RuleIndex,
    deny_keywords: &[Keyword],
    url: &NormalizedUrl,
    trace: &mut Option<Trace>,
) -> Decision {
    let allow = best_of(collect_matches(index, ListKind::Allow, url, trace).into_iter());
    let deny = best_of(collect_matches(index, ListKind::Deny, url, trace).into_iter());

    match (allow, deny) {
        (None, None) => deny_keyword_or_allow(deny_keywords, url, trace),
        (Some(allow), None) => allowed_by(&allow),
        (None, Some(deny)) => blocked_by(&deny),
        (Some(allow), Some(deny)) => {
            let (a, d) = (allow.rule.specificity(), deny.rule.specificity());
            if a >= d {
                let mut decision = Decision::allow(
                    DecisionSource::AllowRule,
                    format!(
                        "allowed by rule \"{}\" (specificity {a}) over deny rule \"{}\" (specificity {d})",
                        allow.rule.raw(),
                        deny.rule.raw()
                    ),
                )
                .with_rule(allow.rule.raw(), a);
                decision.overridden_rule = Some(deny.rule.raw().to_string());
                decision
            } else {
                let mut decision = Decision::block(
                    DecisionSource::DenyRule,
                    format!(
                        "blocked by rule \"{}\" (specificity {d}) over allow rule \"{}\" (specificity {a})",
                        deny.rule.raw(),
                        allow.rule.raw()
                    ),
                )
                .with_rule(deny.rule.raw(), d);
                decision.overridden_rule = Some(allow.rule.raw().to_string());
                decision
            }
        }
    }
}

fn deny_keyword_or_allow(deny_keywords: &[Keyword], url: &NormalizedUrl, trace: &mut Option<Trace>) -> Decision {
    match check_keywords(ListKind::Deny, deny_keywords, url, trace) {
        Some(keyword) => Decision::block(DecisionSource::DenyKeyword, format!("blocked by keyword \"{}\"", keyword.raw))
            .with_rule(&keyword.raw, 0),
        None => Decision::allow(DecisionSource::NoMatch, "no match"),
    }
}

fn allowed_by(m: &RuleMatch<'_>) -> Decision {
    Decision::allow(DecisionSource::AllowRule, format!("allowed by rule \"{}\"", m.rule.raw()))
        .with_rule(m.rule.raw(), m.rule.specificity())
}

fn blocked_by(m: &RuleMatch<'_>) -> Decision {
    Decision::block(DecisionSource::DenyRule, format!("blocked by rule \"{}\"", m.rule.raw()))
        .with_rule(m.rule.raw(), m.rule.specificity())
}

/// Every matching rule of one list. With tracing on, every rule's outcome
/// is recorded as well.
fn collect_matches<'a>(
    index: &'a RuleIndex,
    list: ListKind,
    url: &'a NormalizedUrl,
    trace: &mut Option<Trace>,
) -> Vec<RuleMatch<'a>> {
    let Some(trace) = trace.as_mut() else {
        return index.matching(list, url).collect();
    };

    let mut matches = Vec::new();
    for (position, rule) in index.list(list).iter().enumerate() {
        let outcome = rule.matcher().explain(url);
        log::trace!("{} rule #{position} {:?}: {outcome:?}", list.as_str(), rule.raw());
        trace.steps.push(TraceStep::Rule {
            list,
            position,
            raw: rule.raw().to_string(),
            specificity: rule.specificity(),
            outcome,
        });
        if outcome == RuleOutcome::Matched {
            matches.push(RuleMatch { list, position, rule });
        }
    }
    matches
}

fn check_keywords<'k>(
    list: ListKind,
    keywords: &'k [Keyword],
    url: &NormalizedUrl,
    trace: &mut Option<Trace>,
) -> Option<&'k Keyword> {
    let Some(trace) = trace.as_mut() else {
        return find_match(keywords, url);
    };

    let mut found = None;
    for keyword in keywords {
        let matched = keyword.matches(url);
        trace.steps.push(TraceStep::Keyword {
            list,
            raw: keyword.raw.clone(),
            matched,
        });
        if matched && found.is_none() {
            found = Some(keyword);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::parse_keyword_strings;

    fn no_temp(_: &str) -> bool {
        false
    }

    fn run(mode: Mode, allow: &[&str], deny: &[&str], url: &str) -> Decision {
        let index = RuleIndex::from_raw(allow, deny);
        decide(url, &index, &[], &[], mode, &no_temp)
    }

    #[test]
    fn test_internal_pages_always_allowed() {
        let index = RuleIndex::from_raw(&[] as &[&str], &["chrome.com"]);
        for url in ["chrome://extensions", "about:blank", "moz-extension://id/options.html"] {
            let decision = decide(url, &index, &[], &[], Mode::Whitelist, &no_temp);
            assert!(!decision.blocked);
            assert_eq!(decision.source, DecisionSource::InternalPage);
            assert_eq!(decision.reason, "internal page");
        }
    }

    #[test]
    fn test_temporary_allow_is_terminal() {
        let index = RuleIndex::from_raw(&[] as &[&str], &["example.com"]);
        let temp = |host: &str| host == "www.example.com";
        let decision = decide("https://www.example.com/x", &index, &[], &[], Mode::Blacklist, &temp);
        assert!(!decision.blocked);
        assert_eq!(decision.reason, "temporarily allowed");

        let decision = decide("https://example.com/x", &index, &[], &[], Mode::Blacklist, &temp);
        assert!(decision.blocked);
    }

    #[test]
    fn test_whitelist_default_deny() {
        let decision = run(Mode::Whitelist, &["docs.rs"], &[], "https://docs.rs/serde");
        assert!(!decision.blocked);
        assert_eq!(decision.matched_rule.as_deref(), Some("docs.rs"));

        let decision = run(Mode::Whitelist, &["docs.rs"], &["docs.rs"], "https://crates.io/");
        assert!(decision.blocked);
        assert_eq!(decision.reason, "not on allow list");
        assert_eq!(decision.matched_rule, None);
        assert_eq!(decision.specificity, 0);
    }

    #[test]
    fn test_whitelist_ignores_deny_rules() {
        let decision = run(Mode::Whitelist, &["example.com"], &["example.com/a/b"], "https://example.com/a/b");
        assert!(!decision.blocked);
    }

    #[test]
    fn test_blacklist_default_allow() {
        let decision = run(Mode::Blacklist, &[], &["reddit.com"], "https://www.reddit.com/r/news");
        assert!(decision.blocked);
        assert_eq!(decision.reason, "blocked by rule \"reddit.com\"");
        assert_eq!(decision.specificity, 25);

        let decision = run(Mode::Blacklist, &[], &["reddit.com"], "https://news.ycombinator.com/");
        assert!(!decision.blocked);
        assert_eq!(decision.reason, "no match");
        assert_eq!(decision.source, DecisionSource::NoMatch);
    }

    #[test]
    fn test_blacklist_ignores_allow_rules() {
        let decision = run(Mode::Blacklist, &["reddit.com/r/rust/*"], &["reddit.com"], "https://reddit.com/r/rust/");
        assert!(decision.blocked);
    }

    #[test]
    fn test_blacklist_deny_keyword() {
        let index = RuleIndex::default();
        let deny = parse_keyword_strings(&["casino"]);
        let decision = decide("https://best-casino.example/", &index, &[], &deny, Mode::Blacklist, &no_temp);
        assert!(decision.blocked);
        assert_eq!(decision.source, DecisionSource::DenyKeyword);
        assert_eq!(decision.matched_rule.as_deref(), Some("casino"));
        assert_eq!(decision.specificity, 0);
    }

    #[test]
    fn test_combined_more_specific_allow_wins() {
        let decision = run(
            Mode::Combined,
            &["reddit.com/r/askscience/*"],
            &["reddit.com/r/*"],
            "https://reddit.com/r/askscience/comments/1",
        );
        assert!(!decision.blocked);
        assert_eq!(decision.matched_rule.as_deref(), Some("reddit.com/r/askscience/*"));
        assert_eq!(decision.overridden_rule.as_deref(), Some("reddit.com/r/*"));
        assert!(decision.reason.contains("over deny rule \"reddit.com/r/*\""));
    }

    #[test]
    fn test_combined_more_specific_deny_wins() {
        let decision = run(Mode::Combined, &["youtube.com"], &["youtube.com/shorts/*"], "https://www.youtube.com/shorts/abc");
        assert!(decision.blocked);
        assert_eq!(decision.specificity, 40);
        assert_eq!(decision.overridden_rule.as_deref(), Some("youtube.com"));
        assert!(decision.reason.starts_with("blocked by rule \"youtube.com/shorts/*\""));
    }

    #[test]
    fn test_combined_tie_favors_allow() {
        let decision = run(Mode::Combined, &["example.com/a/*"], &["example.com/b/*", "example.com/a/*"], "https://example.com/a/1");
        assert!(!decision.blocked);
        assert_eq!(decision.specificity, 40);
        assert_eq!(decision.source, DecisionSource::AllowRule);
    }

    #[test]
    fn test_combined_single_side() {
        let decision = run(Mode::Combined, &["docs.rs"], &["reddit.com"], "https://docs.rs/");
        assert!(!decision.blocked);
        assert_eq!(decision.overridden_rule, None);

        let decision = run(Mode::Combined, &["docs.rs"], &["reddit.com"], "https://reddit.com/");
        assert!(decision.blocked);
        assert_eq!(decision.reason, "blocked by rule \"reddit.com\"");
    }

    #[test]
    fn test_combined_keyword_fallthrough() {
        let index = RuleIndex::from_raw(&["docs.rs"], &["reddit.com"]);
        let deny = parse_keyword_strings(&["poker"]);
        let decision = decide("https://poker.example/", &index, &[], &deny, Mode::Combined, &no_temp);
        assert!(decision.blocked);
        assert_eq!(decision.source, DecisionSource::DenyKeyword);

        // A rule match on either side pre-empts deny keywords.
        let decision = decide("https://docs.rs/poker", &index, &[], &deny, Mode::Combined, &no_temp);
        assert!(!decision.blocked);
        assert_eq!(decision.source, DecisionSource::AllowRule);
    }

    #[test]
    fn test_allow_keyword_overrides_deny() {
        let index = RuleIndex::from_raw(&[] as &[&str], &["gaming.com"]);
        let allow = parse_keyword_strings(&["work"]);
        let deny = parse_keyword_strings(&["gaming"]);
        for mode in [Mode::Blacklist, Mode::Combined, Mode::Whitelist] {
            let decision = decide("https://work.gaming.com/", &index, &allow, &deny, mode, &no_temp);
            assert!(!decision.blocked, "{mode:?}");
            assert_eq!(decision.reason, "allow keyword \"work\"");
        }
    }

    #[test]
    fn test_unparsable_url_degrades_to_allowed() {
        let decision = run(Mode::Blacklist, &[], &["example.com"], "https://exa mple.com/");
        assert!(!decision.blocked);
        let decision = run(Mode::Blacklist, &[], &["example.com"], "");
        assert!(!decision.blocked);
    }

    #[test]
    fn test_trace_records_every_evaluation() {
        let index = RuleIndex::from_raw(&["a.com/x/*", "bad..com"], &["a.com"]);
        let allow = parse_keyword_strings(&["zzz"]);
        let decision = decide_with(
            "https://a.com/x/1",
            &index,
            &allow,
            &[],
            Mode::Combined,
            &no_temp,
            DecideOptions { trace: true },
        );
        let trace = decision.trace.expect("trace requested");
        assert_eq!(trace.steps.len(), 4);
        assert!(matches!(&trace.steps[0], TraceStep::Keyword { matched: false, .. }));
        assert!(matches!(&trace.steps[2], TraceStep::Rule { outcome: RuleOutcome::Invalid, .. }));
        assert_eq!(trace.matched_rules(ListKind::Allow).collect::<Vec<_>>(), vec!["a.com/x/*"]);
        assert_eq!(trace.matched_rules(ListKind::Deny).collect::<Vec<_>>(), vec!["a.com"]);
    }

    #[test]
    fn test_decide_is_idempotent() {
        let index = RuleIndex::from_raw(&["a.com/x/*"], &["a.com"]);
        let first = decide("https://a.com/x/1", &index, &[], &[], Mode::Combined, &no_temp);
        let second = decide("https://a.com/x/1", &index, &[], &[], Mode::Combined, &no_temp);
        assert_eq!(first, second);
    }
}
