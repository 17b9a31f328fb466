//! The card store: every known card, the ordered study deck and the date of
//! the last session.
//!
//! Cards keep their insertion order. New-card selection takes the first
//! `no_deck` cards in that order, so it is preserved through the on-disk
//! JSON object as well.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

use chrono::NaiveDate;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::model::{window_skill, Card, Deck, Direction, RATING_WINDOW};

/// Version discriminator written into every current-shape store document.
pub const CURRENT_VERSION: u32 = 2;

/// Id → card mapping that remembers insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardMap {
    cards: Vec<Card>,
    index: HashMap<String, usize>,
}

impl CardMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.index.get(id).map(|&i| &self.cards[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.index.get(id).map(|&i| &mut self.cards[i])
    }

    /// Insert a card under its own id.
    ///
    /// Replacing an existing card keeps the original position and returns the
    /// old card.
    pub fn insert(&mut self, card: Card) -> Option<Card> {
        match self.index.get(&card.id) {
            Some(&i) => Some(std::mem::replace(&mut self.cards[i], card)),
            None => {
                self.index.insert(card.id.clone(), self.cards.len());
                self.cards.push(card);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Card> {
        let pos = self.index.remove(id)?;
        let card = self.cards.remove(pos);
        for c in &self.cards[pos..] {
            if let Some(i) = self.index.get_mut(&c.id) {
                *i -= 1;
            }
        }
        Some(card)
    }

    /// Keep only the cards `keep` accepts, in order, and return the rest.
    ///
    /// One pass over the cards and one index rebuild, however many go.
    pub fn retain<F: FnMut(&Card) -> bool>(&mut self, mut keep: F) -> Vec<Card> {
        let (kept, removed): (Vec<Card>, Vec<Card>) =
            std::mem::take(&mut self.cards).into_iter().partition(|c| keep(c));
        self.cards = kept;
        if !removed.is_empty() {
            self.index = self
                .cards
                .iter()
                .enumerate()
                .map(|(i, c)| (c.id.clone(), i))
                .collect();
        }
        removed
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    /// Mutable iteration. Callers must not change card ids.
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Card> {
        self.cards.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.id.as_str())
    }
}

impl FromIterator<Card> for CardMap {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut map = CardMap::new();
        for card in iter {
            map.insert(card);
        }
        map
    }
}

impl<'a> IntoIterator for &'a CardMap {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

impl Serialize for CardMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cards.len()))?;
        for card in &self.cards {
            map.serialize_entry(&card.id, card)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CardMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, Card)> = deserialize_ordered(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(key, mut card)| {
                // The object key is authoritative.
                card.id = key;
                card
            })
            .collect())
    }
}

/// Deserialize a JSON object into its entries in document order.
pub(crate) fn deserialize_ordered<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of card id to card")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, T>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

/// Number of cards in each deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeckCounts {
    pub study: usize,
    pub review: usize,
    pub no_deck: usize,
}

/// The whole persistent state of a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    pub cards: CardMap,
    /// Ids currently being drilled, in the order they were pulled.
    #[serde(default)]
    pub study_deck: Vec<String>,
    #[serde(default)]
    pub last_session: Option<NaiveDate>,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            cards: CardMap::new(),
            study_deck: Vec::new(),
            last_session: None,
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn counts(&self) -> DeckCounts {
        let mut counts = DeckCounts::default();
        for card in &self.cards {
            match card.deck {
                Deck::Study => counts.study += 1,
                Deck::Review => counts.review += 1,
                Deck::NoDeck => counts.no_deck += 1,
            }
        }
        counts
    }

    pub fn is_studying(&self, id: &str) -> bool {
        self.study_deck.iter().any(|s| s == id)
    }

    /// Move a card into the study deck with fresh counters.
    pub(crate) fn pull_into_study(&mut self, id: &str) {
        let Some(card) = self.cards.get_mut(id) else {
            return;
        };
        card.deck = Deck::Study;
        card.clear_progress();
        if !self.study_deck.iter().any(|s| s == id) {
            self.study_deck.push(id.to_string());
        }
    }

    /// Promote a card to review, clearing its counters.
    pub(crate) fn retire(&mut self, id: &str) {
        if let Some(card) = self.cards.get_mut(id) {
            card.deck = Deck::Review;
            card.clear_progress();
        }
        self.study_deck.retain(|s| s != id);
    }

    /// Remove a card from the store and the study deck.
    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        self.study_deck.retain(|s| s != id);
        self.cards.remove(id)
    }

    /// Delete every card `keep` rejects, along with its study-deck entry.
    pub fn retain_cards<F: FnMut(&Card) -> bool>(&mut self, keep: F) -> Vec<Card> {
        let removed = self.cards.retain(keep);
        if !removed.is_empty() {
            let gone: HashSet<&str> = removed.iter().map(|c| c.id.as_str()).collect();
            self.study_deck.retain(|id| !gone.contains(id.as_str()));
        }
        removed
    }

    /// Re-establish the structural invariants after loading.
    ///
    /// Returns `true` if anything was repaired.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;

        for card in self.cards.iter_mut() {
            if card.rederive_skill() {
                tracing::warn!("card {:?}: rating window or skill out of step, rederived", card.id);
                changed = true;
            }
        }

        let mut seen = HashSet::new();
        let before = self.study_deck.len();
        let cards = &self.cards;
        self.study_deck.retain(|id| {
            let keep = cards.get(id).is_some_and(|c| c.deck == Deck::Study)
                && seen.insert(id.clone());
            if !keep {
                tracing::warn!("dropping {id:?} from the study deck");
            }
            keep
        });
        changed |= self.study_deck.len() != before;

        let missing: Vec<String> = self
            .cards
            .iter()
            .filter(|c| c.deck == Deck::Study && !seen.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();
        for id in missing {
            tracing::warn!("card {id:?} is in study but missing from the study deck, appending");
            self.study_deck.push(id);
            changed = true;
        }

        changed
    }

    /// Describe every broken structural invariant. Empty when the store is sound.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for card in &self.cards {
            for direction in Direction::ALL {
                let window = &card.ratings[direction];
                if window.len() > RATING_WINDOW {
                    problems.push(format!(
                        "{}: {direction} holds {} ratings",
                        card.id,
                        window.len()
                    ));
                }
                if card.skill[direction] != window_skill(window) {
                    problems.push(format!(
                        "{}: {direction} skill {} does not match its ratings",
                        card.id, card.skill[direction]
                    ));
                }
            }
            if (card.deck == Deck::Study) != self.is_studying(&card.id) {
                problems.push(format!(
                    "{}: deck is {} but study deck membership disagrees",
                    card.id, card.deck
                ));
            }
        }

        let mut seen = HashSet::new();
        for id in &self.study_deck {
            if !seen.insert(id) {
                problems.push(format!("{id}: listed twice in the study deck"));
            }
            if !self.cards.contains(id) {
                problems.push(format!("{id}: in the study deck but not in the store"));
            }
        }

        problems
    }
}
