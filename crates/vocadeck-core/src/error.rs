//! Caller contract violations.
//!
//! These are returned by the scheduling engine when a caller asks for
//! something the deck cannot do. They are always detected before any state
//! is touched, so the store is unchanged when one is returned. I/O and
//! format failures travel as `anyhow::Error` instead.

use thiserror::Error;

/// Errors raised for requests that break the deck's contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    /// The rating symbol is not one of `A`, `S`, `D`, `F`.
    #[error("unrecognized rating symbol: {0:?}")]
    InvalidRating(String),

    /// The direction is not one of `J2E`, `E2J`.
    #[error("unrecognized direction: {0:?}")]
    InvalidDirection(String),

    /// A rating was applied to a card outside the study deck.
    #[error("card {0:?} is not in the study deck")]
    NotStudying(String),

    /// The card id does not exist in the store.
    #[error("unknown card: {0:?}")]
    UnknownCard(String),
}
