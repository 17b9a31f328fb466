//! vocadeck-core: card store, scheduling engine, corpus sync and format
//! migration for a two-way vocabulary flashcard deck.
//!
//! Cards come from a directory of plain-text corpus files ([`corpus`]), are
//! reconciled into a persistent JSON store ([`sync`], [`persist`]) and drilled
//! in daily sessions ([`scheduler`], [`session`]). Stores written by older
//! releases are upgraded on load ([`migration`]).

pub mod config;
pub mod corpus;
pub mod error;
pub mod migration;
pub mod model;
pub mod persist;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod sync;
