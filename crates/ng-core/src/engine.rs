//! Published policy snapshots
//!
//! The navigation hooks call [`Engine::decide`] from any thread while the
//! settings layer calls [`Engine::update`] whenever the user edits a list.
//! Each update publishes a complete [`PolicySnapshot`]; readers hold the
//! snapshot they loaded for the whole call, so a decision is never made
//! against a half-rebuilt index.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::index::RuleIndex;
use crate::keyword::Keyword;
use crate::resolver::{decide_with, DecideOptions};
use crate::types::{Decision, Mode};

/// Everything `decide` needs, frozen at one point in time.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    pub generation: u64,
    pub index: RuleIndex,
    pub allow_keywords: Vec<Keyword>,
    pub deny_keywords: Vec<Keyword>,
    pub mode: Mode,
}

impl PolicySnapshot {
    pub fn new(index: RuleIndex, allow_keywords: Vec<Keyword>, deny_keywords: Vec<Keyword>, mode: Mode) -> Self {
        Self {
            generation: 0,
            index,
            allow_keywords,
            deny_keywords,
            mode,
        }
    }

    /// Decide against this snapshot.
    pub fn decide(&self, url: &str, temp_allow: &dyn Fn(&str) -> bool, options: DecideOptions) -> Decision {
        decide_with(
            url,
            &self.index,
            &self.allow_keywords,
            &self.deny_keywords,
            self.mode,
            temp_allow,
            options,
        )
    }
}

/// Holder of the current policy snapshot.
pub struct Engine {
    current: ArcSwap<PolicySnapshot>,
    /// Serializes writers so generations are published in order
    update_lock: Mutex<()>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(PolicySnapshot::default())
    }
}

impl Engine {
    /// Create an engine publishing `snapshot` as generation 1.
    pub fn new(mut snapshot: PolicySnapshot) -> Self {
        snapshot.generation = 1;
        Self {
            current: ArcSwap::from_pointee(snapshot),
            update_lock: Mutex::new(()),
        }
    }

    /// Replace the published snapshot. Returns the new generation.
    pub fn update(&self, mut snapshot: PolicySnapshot) -> u64 {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.current.load().generation + 1;
        snapshot.generation = generation;
        log::debug!(
            "publishing policy generation {generation}: {} allow, {} deny, mode {}",
            snapshot.index.allow().len(),
            snapshot.index.deny().len(),
            snapshot.mode.as_str()
        );
        self.current.store(Arc::new(snapshot));
        generation
    }

    /// The snapshot currently published.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Generation of the snapshot currently published.
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Decide against the current snapshot.
    pub fn decide(&self, url: &str, temp_allow: &dyn Fn(&str) -> bool) -> Decision {
        self.decide_with(url, temp_allow, DecideOptions::default())
    }

    pub fn decide_with(&self, url: &str, temp_allow: &dyn Fn(&str) -> bool, options: DecideOptions) -> Decision {
        self.current.load().decide(url, temp_allow, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::parse_keyword_strings;
    use std::thread;

    fn never(_: &str) -> bool {
        false
    }

    fn snapshot(deny: &[&str], mode: Mode) -> PolicySnapshot {
        PolicySnapshot::new(RuleIndex::from_raw(&[] as &[&str], deny), Vec::new(), Vec::new(), mode)
    }

    #[test]
    fn test_update_swaps_whole_snapshot() {
        let engine = Engine::new(snapshot(&["a.com"], Mode::Blacklist));
        assert_eq!(engine.generation(), 1);
        assert!(engine.decide("https://a.com/", &never).blocked);

        let generation = engine.update(snapshot(&["b.com"], Mode::Blacklist));
        assert_eq!(generation, 2);
        assert!(!engine.decide("https://a.com/", &never).blocked);
        assert!(engine.decide("https://b.com/", &never).blocked);
    }

    #[test]
    fn test_loaded_snapshot_is_stable_across_updates() {
        let engine = Engine::new(snapshot(&["a.com"], Mode::Blacklist));
        let held = engine.snapshot();
        engine.update(snapshot(&[], Mode::Whitelist));
        assert_eq!(held.generation, 1);
        assert!(held.decide("https://a.com/", &never, DecideOptions::default()).blocked);
        assert_eq!(engine.snapshot().mode, Mode::Whitelist);
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let engine = Arc::new(Engine::new(snapshot(&["a.com"], Mode::Blacklist)));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = engine.snapshot();
                        let blocked = snap.decide("https://a.com/", &never, DecideOptions::default()).blocked;
                        // generation 1 and odd generations block a.com, even ones block b.com
                        assert_eq!(blocked, snap.generation % 2 == 1);
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let deny: &[&str] = if i % 2 == 0 { &["b.com"] } else { &["a.com"] };
            let mut next = snapshot(deny, Mode::Blacklist);
            next.deny_keywords = parse_keyword_strings(&["unused"]);
            engine.update(next);
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_writers_publish_in_generation_order() {
        let engine = Arc::new(Engine::default());

        let reader = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..2_000 {
                    let generation = engine.generation();
                    assert!(generation >= last, "generation went back from {last} to {generation}");
                    last = generation;
                }
            })
        };

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..50 {
                        engine.update(snapshot(&["a.com"], Mode::Blacklist));
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(engine.generation(), 201);
        assert_eq!(engine.snapshot().generation, 201);
    }
}
