pub mod init;
pub mod migrate;
pub mod new_day;
pub mod scan;
pub mod status;
pub mod study;

use std::path::{Path, PathBuf};

use anyhow::Result;

use vocadeck_core::config::{load_config_from, VocadeckConfig};
use vocadeck_core::session::{Clock, StudySession};

use self::scan::print_report;

/// Config file plus environment, with command-line paths on top.
pub fn resolve_config(
    config_path: Option<&Path>,
    store: Option<PathBuf>,
    corpus: Option<PathBuf>,
) -> Result<VocadeckConfig> {
    let mut config = load_config_from(config_path)?;
    if let Some(store) = store {
        config.store_path = store;
    }
    if let Some(corpus) = corpus {
        config.corpus_dir = corpus;
    }
    Ok(config)
}

/// Tell the user what happened to the store while it was opened.
pub fn report_load<R: rand::Rng, C: Clock>(session: &StudySession<R, C>) {
    if let Some(report) = session.upgraded() {
        println!(
            "Upgraded legacy store: {} record(s) -> {} card(s).",
            report.legacy_cards, report.cards
        );
    }
    if session.repaired() {
        println!("Repaired inconsistent deck membership in the store.");
    }
}

/// Make sure the store has cards before a drill command runs.
///
/// An empty store is synced from the corpus directory when there is one.
/// Returns `false` if there is still nothing to work on.
pub fn sync_if_empty<R: rand::Rng, C: Clock>(
    session: &mut StudySession<R, C>,
    config: &VocadeckConfig,
) -> Result<bool> {
    if !session.store().cards.is_empty() {
        return Ok(true);
    }
    if !config.corpus_dir.is_dir() {
        println!("The store has no cards. Run `vocadeck scan` first.");
        return Ok(false);
    }

    tracing::info!("store is empty, syncing from {}", config.corpus_dir.display());
    let report = session.sync(&config.corpus_dir)?;
    print_report(&report);
    if session.store().cards.is_empty() {
        println!("No entries found in {}.", config.corpus_dir.display());
        return Ok(false);
    }
    Ok(true)
}
