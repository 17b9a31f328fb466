//! The `vocadeck new-day` command.

use anyhow::Result;

use vocadeck_core::config::VocadeckConfig;
use vocadeck_core::session::StudySession;

use super::{report_load, sync_if_empty};

pub fn execute(config: &VocadeckConfig) -> Result<()> {
    let mut session = StudySession::open(&config.store_path)?;
    report_load(&session);

    if !sync_if_empty(&mut session, config)? {
        return Ok(());
    }

    let summary = session.assemble_session(&config.session)?;
    println!(
        "New day: {} new, {} review, {} carried over. {} cards in the study deck.",
        summary.new_cards.len(),
        summary.review_cards.len(),
        summary.reprimed,
        summary.study_deck_size
    );
    Ok(())
}
