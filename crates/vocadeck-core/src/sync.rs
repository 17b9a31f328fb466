//! Reconcile a parsed corpus against the card store.
//!
//! New entries are inserted, known entries get their display fields
//! refreshed, and cards whose entry disappeared are deleted. Learning
//! progress on surviving cards is never touched.

use std::collections::HashSet;

use serde::Serialize;

use crate::corpus::{MalformedEntry, ParsedCorpus};
use crate::store::Store;

/// A candidate whose id already belongs to an unrelated card in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedCandidate {
    pub id: String,
    /// Source term of the parsed candidate.
    pub candidate_term: String,
    /// Source term of the card already holding the id.
    pub existing_term: String,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Cards inserted.
    pub imported: usize,
    /// Existing cards whose display fields changed.
    pub updated: usize,
    /// Cards deleted because their entry is gone.
    pub removed: usize,
    /// Candidates dropped on an id collision.
    pub dropped: Vec<DroppedCandidate>,
    #[serde(skip)]
    pub malformed: Vec<MalformedEntry>,
    /// Cards in the store after the pass.
    pub total: usize,
}

impl SyncReport {
    /// `true` if the pass changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.imported == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Apply a parse pass to the store.
pub fn reconcile(store: &mut Store, parsed: ParsedCorpus) -> SyncReport {
    let mut report = SyncReport {
        malformed: parsed.malformed,
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(parsed.cards.len());

    for candidate in parsed.cards {
        seen.insert(candidate.id.clone());
        match store.cards.get_mut(&candidate.id) {
            None => {
                store.cards.insert(candidate);
                report.imported += 1;
            }
            Some(existing) if existing.term_source != candidate.term_source => {
                tracing::warn!(
                    "id {:?} already belongs to {:?}, dropping candidate {:?}",
                    candidate.id,
                    existing.term_source,
                    candidate.term_source
                );
                report.dropped.push(DroppedCandidate {
                    id: candidate.id,
                    candidate_term: candidate.term_source,
                    existing_term: existing.term_source.clone(),
                });
            }
            Some(existing) => {
                if existing.refresh_display(&candidate) {
                    report.updated += 1;
                }
            }
        }
    }

    let stale = store.retain_cards(|card| seen.contains(&card.id));
    for card in &stale {
        tracing::debug!("retiring {:?} ({}), no longer in the corpus", card.id, card.deck);
    }
    report.removed = stale.len();

    report.total = store.cards.len();
    tracing::info!(
        "sync: {} imported, {} updated, {} removed, {} dropped, {} total",
        report.imported,
        report.updated,
        report.removed,
        report.dropped.len(),
        report.total
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{parse_corpus_str, IdAllocator};
    use crate::model::{Card, Deck, Direction, Rating};
    use std::path::Path;

    fn parse(content: &str) -> ParsedCorpus {
        let mut out = ParsedCorpus::default();
        parse_corpus_str(content, Path::new("deck.md"), &mut IdAllocator::new(), &mut out);
        out
    }

    const CORPUS: &str = "# Animals\n- 猫: cat [neko] [ねこ]\n- 犬: dog [inu] [いぬ]\n";

    #[test]
    fn first_sync_imports_everything() {
        let mut store = Store::new();
        let report = reconcile(&mut store, parse(CORPUS));
        assert_eq!(report.imported, 2);
        assert_eq!(report.total, 2);
        let cat = store.cards.get("猫").unwrap();
        assert_eq!(cat.term_target, "cat");
        assert_eq!(cat.deck, Deck::NoDeck);
        assert_eq!(cat.category.as_deref(), Some("Animals"));
    }

    #[test]
    fn resync_is_noop() {
        let mut store = Store::new();
        reconcile(&mut store, parse(CORPUS));
        store.pull_into_study("猫");
        store
            .cards
            .get_mut("猫")
            .unwrap()
            .record_rating(Direction::J2E, Rating::A, 100.0);
        let before = store.clone();

        let report = reconcile(&mut store, parse(CORPUS));
        assert!(report.is_noop());
        assert_eq!(store, before);
    }

    #[test]
    fn display_update_keeps_progress() {
        let mut store = Store::new();
        reconcile(&mut store, parse(CORPUS));
        store.pull_into_study("犬");
        store
            .cards
            .get_mut("犬")
            .unwrap()
            .record_rating(Direction::E2J, Rating::D, 5.0);

        let edited = "# Pets\n- 猫: cat [neko] [ねこ]\n- 犬: doggo [inu] [いぬ]\n";
        let report = reconcile(&mut store, parse(edited));
        assert_eq!(report.updated, 2);
        let dog = store.cards.get("犬").unwrap();
        assert_eq!(dog.term_target, "doggo");
        assert_eq!(dog.category.as_deref(), Some("Pets"));
        assert_eq!(dog.deck, Deck::Study);
        assert_eq!(dog.ratings.e2j, vec![Rating::D]);
        assert_eq!(dog.skill.e2j, 1);
    }

    #[test]
    fn removed_entry_leaves_store_and_study_deck() {
        let mut store = Store::new();
        reconcile(&mut store, parse(CORPUS));
        store.pull_into_study("猫");
        store.pull_into_study("犬");

        let report = reconcile(&mut store, parse("- 犬: dog [inu] [いぬ]\n"));
        assert_eq!(report.removed, 1);
        assert!(!store.cards.contains("猫"));
        assert_eq!(store.study_deck, vec!["犬"]);
        assert!(store.invariant_violations().is_empty());
    }

    #[test]
    fn collision_with_unrelated_card_is_dropped() {
        let mut store = Store::new();
        let mut legacy = Card::new("橋", "端", "edge");
        legacy.deck = Deck::Review;
        store.cards.insert(legacy);

        let report = reconcile(&mut store, parse("- 橋: bridge [hashi] [はし]\n"));
        assert_eq!(report.imported, 0);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].existing_term, "端");
        let kept = store.cards.get("橋").unwrap();
        assert_eq!(kept.term_target, "edge");
        assert_eq!(kept.deck, Deck::Review);
        assert_eq!(report.removed, 0);
    }

    #[test]
    fn prune_keeps_survivors_in_order() {
        let full: String = (0..200).map(|i| format!("- w{i}: word {i} [p{i}] [r{i}]\n")).collect();
        let mut store = Store::new();
        reconcile(&mut store, parse(&full));
        for i in (0..200).step_by(3) {
            store.pull_into_study(&format!("w{i}"));
        }

        let even: String = (0..200)
            .step_by(2)
            .map(|i| format!("- w{i}: word {i} [p{i}] [r{i}]\n"))
            .collect();
        let report = reconcile(&mut store, parse(&even));
        assert_eq!(report.removed, 100);
        assert_eq!(report.total, 100);
        let expected: Vec<String> = (0..200).step_by(2).map(|i| format!("w{i}")).collect();
        let ids: Vec<&str> = store.cards.ids().collect();
        assert_eq!(ids, expected);
        assert_eq!(store.cards.get("w198").unwrap().term_target, "word 198");
        assert!(store.study_deck.iter().all(|id| store.cards.contains(id)));
        assert_eq!(store.study_deck.len(), 34);
        assert!(store.invariant_violations().is_empty());
    }

    #[test]
    fn empty_corpus_prunes_everything() {
        let mut store = Store::new();
        reconcile(&mut store, parse(CORPUS));
        let report = reconcile(&mut store, ParsedCorpus::default());
        assert_eq!(report.removed, 2);
        assert!(store.cards.is_empty());
    }
}
