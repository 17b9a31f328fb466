//! Scheduling engine.
//!
//! A session is assembled once per day from unseen and review cards. During
//! the session a random card and direction is presented, the user rates it,
//! and once both directions reach the mastery threshold the card is promoted
//! to review and leaves the study deck.
//!
//! Every function here works on an in-memory [`Store`]; persisting the
//! result is the caller's job (see [`crate::session::StudySession`]).

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::DeckError;
use crate::model::{Deck, Direction, Rating};
use crate::store::Store;

/// What a new-day assembly did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewDaySummary {
    /// Cards already in the study deck whose counters were reset.
    pub reprimed: usize,
    /// Unseen cards pulled in.
    pub new_cards: Vec<String>,
    /// Review cards pulled back in.
    pub review_cards: Vec<String>,
    /// Size of the study deck afterwards.
    pub study_deck_size: usize,
}

/// The next thing to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Drill `id` in `direction`.
    Card { id: String, direction: Direction },
    /// The study deck is empty.
    SessionOver,
}

/// Result of a presentation pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub presentation: Presentation,
    /// Stale cards promoted to review while picking.
    pub retired: Vec<String>,
}

/// Result of applying one rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateOutcome {
    /// Skill of the rated direction after the rating.
    pub skill: i32,
    /// Struggle of the rated direction after the rating.
    pub struggle: u32,
    /// The card reached mastery in both directions and moved to review.
    pub promoted: bool,
}

/// Start a new day: re-prime the study deck, then pull in up to
/// `config.new_cards` unseen cards (store order) and `config.review_cards`
/// review cards (struggle order).
///
/// Calling this mid-session discards the partial progress of every card
/// already in the study deck.
pub fn assemble_session(
    store: &mut Store,
    config: &SessionConfig,
    today: NaiveDate,
) -> NewDaySummary {
    let mut summary = NewDaySummary::default();

    // Re-prime survivors of the previous session.
    for id in &store.study_deck {
        if let Some(card) = store.cards.get_mut(id) {
            card.clear_progress();
            summary.reprimed += 1;
        }
    }

    summary.new_cards = store
        .cards
        .iter()
        .filter(|c| c.deck == Deck::NoDeck)
        .take(config.new_cards)
        .map(|c| c.id.clone())
        .collect();
    for id in &summary.new_cards {
        store.pull_into_study(id);
    }

    summary.review_cards = select_review_cards(store, config.review_cards);
    for id in &summary.review_cards {
        store.pull_into_study(id);
    }

    store.last_session = Some(today);
    summary.study_deck_size = store.study_deck.len();

    tracing::info!(
        "new session: {} reprimed, {} new, {} review, {} in study deck",
        summary.reprimed,
        summary.new_cards.len(),
        summary.review_cards.len(),
        summary.study_deck_size
    );
    summary
}

/// Review cards in pull order: most combined struggle first, then the
/// longest unstudied (never-studied cards first), then store order.
pub fn select_review_cards(store: &Store, count: usize) -> Vec<String> {
    let mut review: Vec<_> = store
        .cards
        .iter()
        .filter(|c| c.deck == Deck::Review)
        .collect();
    review.sort_by(|a, b| {
        b.combined_struggle()
            .cmp(&a.combined_struggle())
            .then_with(|| match (a.earliest_study(), b.earliest_study()) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => x.total_cmp(&y),
            })
    });
    review
        .into_iter()
        .take(count)
        .map(|c| c.id.clone())
        .collect()
}

/// Choose the next card and direction to present.
///
/// Stale cards (both directions already mastered) found along the way are
/// promoted to review and removed from the study deck.
pub fn pick_presentation<R: Rng>(store: &mut Store, rng: &mut R) -> Pick {
    let mut retired = Vec::new();

    loop {
        if store.study_deck.is_empty() {
            return Pick {
                presentation: Presentation::SessionOver,
                retired,
            };
        }

        let idx = rng.random_range(0..store.study_deck.len());
        let id = store.study_deck[idx].clone();
        let eligible = match store.cards.get(&id) {
            Some(card) => card.eligible_directions(),
            None => {
                tracing::warn!("study deck lists unknown card {id:?}, dropping it");
                store.study_deck.remove(idx);
                continue;
            }
        };

        if eligible.is_empty() {
            tracing::debug!("card {id:?} is already mastered, promoting to review");
            store.retire(&id);
            retired.push(id);
            continue;
        }

        let direction = eligible[rng.random_range(0..eligible.len())];
        return Pick {
            presentation: Presentation::Card { id, direction },
            retired,
        };
    }
}

/// Apply a rating to a card in the study deck.
///
/// The store is left untouched when an error is returned.
pub fn apply_rating(
    store: &mut Store,
    id: &str,
    direction: Direction,
    rating: Rating,
    now: f64,
) -> Result<RateOutcome, DeckError> {
    if !store.cards.contains(id) {
        return Err(DeckError::UnknownCard(id.to_string()));
    }
    if !store.is_studying(id) {
        return Err(DeckError::NotStudying(id.to_string()));
    }

    let Some(card) = store.cards.get_mut(id) else {
        return Err(DeckError::UnknownCard(id.to_string()));
    };
    card.record_rating(direction, rating, now);
    let mut outcome = RateOutcome {
        skill: card.skill[direction],
        struggle: card.struggle[direction],
        promoted: false,
    };

    if card.is_mastered() {
        store.retire(id);
        outcome.promoted = true;
    }

    tracing::debug!(
        "rated {id:?} {direction} {rating}: skill {} struggle {}{}",
        outcome.skill,
        outcome.struggle,
        if outcome.promoted { ", promoted" } else { "" }
    );
    Ok(outcome)
}

/// Apply a rating given as a raw symbol.
pub fn apply_rating_symbol(
    store: &mut Store,
    id: &str,
    direction: Direction,
    symbol: &str,
    now: f64,
) -> Result<RateOutcome, DeckError> {
    let rating: Rating = symbol.parse()?;
    apply_rating(store, id, direction, rating, now)
}
