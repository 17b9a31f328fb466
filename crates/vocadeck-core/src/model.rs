//! Core data model types for vocadeck.
//!
//! A [`Card`] is one vocabulary pair drilled in two directions. Each direction
//! keeps its own small rating window, derived skill, struggle counter and
//! last-study timestamp; the card as a whole sits in exactly one [`Deck`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::DeckError;

/// Skill at which a direction counts as passed.
pub const MASTERY_THRESHOLD: i32 = 2;

/// Number of recent ratings kept per direction.
pub const RATING_WINDOW: usize = 3;

/// Which way a card is being drilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Source term shown, target term answered.
    #[serde(rename = "J2E")]
    J2E,
    /// Target term shown, source term answered.
    #[serde(rename = "E2J")]
    E2J,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::J2E, Direction::E2J];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::J2E => write!(f, "J2E"),
            Direction::E2J => write!(f, "E2J"),
        }
    }
}

impl FromStr for Direction {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "J2E" => Ok(Direction::J2E),
            "E2J" => Ok(Direction::E2J),
            _ => Err(DeckError::InvalidDirection(s.to_string())),
        }
    }
}

/// Life-cycle bucket a card occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deck {
    /// Never pulled into a session.
    #[default]
    NoDeck,
    /// Being drilled in the current session.
    Study,
    /// Mastered, dormant until pulled back in.
    Review,
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deck::NoDeck => write!(f, "no_deck"),
            Deck::Study => write!(f, "study"),
            Deck::Review => write!(f, "review"),
        }
    }
}

/// A self-assessed answer quality, named after the home-row key used to give it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    /// Wrong.
    A,
    /// Unsure.
    S,
    /// Correct.
    D,
    /// Easy.
    F,
}

impl Rating {
    /// Contribution of this rating to a direction's skill.
    pub fn weight(self) -> i32 {
        match self {
            Rating::A => -2,
            Rating::S => -1,
            Rating::D => 1,
            Rating::F => 2,
        }
    }

    /// Struggle added when this rating is applied.
    pub fn struggle_penalty(self) -> u32 {
        match self {
            Rating::A => 3,
            Rating::S => 1,
            Rating::D | Rating::F => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::A => "Wrong",
            Rating::S => "Unsure",
            Rating::D => "Correct",
            Rating::F => "Easy",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Rating::A => "A",
            Rating::S => "S",
            Rating::D => "D",
            Rating::F => "F",
        };
        f.write_str(symbol)
    }
}

impl FromStr for Rating {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Rating::A),
            "S" | "s" => Ok(Rating::S),
            "D" | "d" => Ok(Rating::D),
            "F" | "f" => Ok(Rating::F),
            other => Err(DeckError::InvalidRating(other.to_string())),
        }
    }
}

/// One value per drilling direction, serialized as `{"J2E": .., "E2J": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerDirection<T> {
    #[serde(rename = "J2E", default)]
    pub j2e: T,
    #[serde(rename = "E2J", default)]
    pub e2j: T,
}

impl<T> PerDirection<T> {
    pub fn new(j2e: T, e2j: T) -> Self {
        Self { j2e, e2j }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        [(Direction::J2E, &self.j2e), (Direction::E2J, &self.e2j)].into_iter()
    }
}

impl<T: Default> PerDirection<T> {
    /// Puts `value` under `direction` and the default under the other one.
    pub fn only(direction: Direction, value: T) -> Self {
        let mut out = Self::default();
        out[direction] = value;
        out
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        match direction {
            Direction::J2E => &self.j2e,
            Direction::E2J => &self.e2j,
        }
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::J2E => &mut self.j2e,
            Direction::E2J => &mut self.e2j,
        }
    }
}

/// One vocabulary pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Stable identifier, derived from the source term.
    pub id: String,
    /// Source-language term (the `J2E` prompt).
    pub term_source: String,
    /// Target-language term (the `E2J` prompt).
    pub term_target: String,
    /// Phonetic transcription.
    #[serde(default)]
    pub pronunciation: Option<String>,
    /// Secondary script rendering of the source term.
    #[serde(default)]
    pub orthographic_aid: Option<String>,
    /// Heading the entry was listed under in the corpus.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub deck: Deck,
    /// Last ratings per direction, oldest first.
    #[serde(default)]
    pub ratings: PerDirection<Vec<Rating>>,
    /// Sum of the weights in `ratings`; never mutated on its own.
    #[serde(default)]
    pub skill: PerDirection<i32>,
    #[serde(default)]
    pub struggle: PerDirection<u32>,
    /// Seconds since the Unix epoch of the last rating.
    #[serde(default)]
    pub last_study: PerDirection<Option<f64>>,
}

impl Card {
    /// A fresh card outside every deck with all counters zeroed.
    pub fn new(
        id: impl Into<String>,
        term_source: impl Into<String>,
        term_target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            term_source: term_source.into(),
            term_target: term_target.into(),
            pronunciation: None,
            orthographic_aid: None,
            category: None,
            deck: Deck::NoDeck,
            ratings: PerDirection::default(),
            skill: PerDirection::default(),
            struggle: PerDirection::default(),
            last_study: PerDirection::default(),
        }
    }

    /// Term shown when drilling `direction`.
    pub fn prompt(&self, direction: Direction) -> &str {
        match direction {
            Direction::J2E => &self.term_source,
            Direction::E2J => &self.term_target,
        }
    }

    /// Term expected as the answer when drilling `direction`.
    pub fn answer(&self, direction: Direction) -> &str {
        match direction {
            Direction::J2E => &self.term_target,
            Direction::E2J => &self.term_source,
        }
    }

    /// Record a rating in one direction.
    ///
    /// The window keeps the newest [`RATING_WINDOW`] symbols and skill is
    /// recomputed from it. Deck membership is left to the caller.
    pub fn record_rating(&mut self, direction: Direction, rating: Rating, now: f64) {
        let window = &mut self.ratings[direction];
        window.push(rating);
        if window.len() > RATING_WINDOW {
            let excess = window.len() - RATING_WINDOW;
            window.drain(..excess);
        }
        self.skill[direction] = window_skill(window);
        self.struggle[direction] += rating.struggle_penalty();
        self.last_study[direction] = Some(now);
    }

    /// Both directions at or above the mastery threshold.
    pub fn is_mastered(&self) -> bool {
        Direction::ALL
            .iter()
            .all(|&d| self.skill[d] >= MASTERY_THRESHOLD)
    }

    /// Directions still below the mastery threshold, in `J2E`, `E2J` order.
    pub fn eligible_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.skill[d] < MASTERY_THRESHOLD)
            .collect()
    }

    /// Clear ratings, skill and struggle in both directions. `last_study` survives.
    pub fn clear_progress(&mut self) {
        self.ratings = PerDirection::default();
        self.skill = PerDirection::default();
        self.struggle = PerDirection::default();
    }

    pub fn combined_struggle(&self) -> u32 {
        self.struggle.j2e + self.struggle.e2j
    }

    /// Earliest non-null `last_study` across both directions.
    pub fn earliest_study(&self) -> Option<f64> {
        self.last_study
            .iter()
            .filter_map(|(_, t)| *t)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Copy the display fields of `other` onto this card.
    ///
    /// Returns `true` if anything changed.
    pub fn refresh_display(&mut self, other: &Card) -> bool {
        let changed = self.term_source != other.term_source
            || self.term_target != other.term_target
            || self.pronunciation != other.pronunciation
            || self.orthographic_aid != other.orthographic_aid
            || self.category != other.category;
        if changed {
            self.term_source.clone_from(&other.term_source);
            self.term_target.clone_from(&other.term_target);
            self.pronunciation.clone_from(&other.pronunciation);
            self.orthographic_aid.clone_from(&other.orthographic_aid);
            self.category.clone_from(&other.category);
        }
        changed
    }

    /// Re-derive skill from the rating windows, trimming over-long windows.
    ///
    /// Returns `true` if the card had drifted.
    pub(crate) fn rederive_skill(&mut self) -> bool {
        let mut changed = false;
        for direction in Direction::ALL {
            let window = &mut self.ratings[direction];
            if window.len() > RATING_WINDOW {
                let excess = window.len() - RATING_WINDOW;
                window.drain(..excess);
                changed = true;
            }
            let skill = window_skill(window);
            if self.skill[direction] != skill {
                self.skill[direction] = skill;
                changed = true;
            }
        }
        changed
    }
}

/// Sum of the rating weights in a window.
pub fn window_skill(window: &[Rating]) -> i32 {
    window.iter().map(|r| r.weight()).sum()
}
