//! The `vocadeck scan` command.

use anyhow::Result;

use vocadeck_core::config::VocadeckConfig;
use vocadeck_core::session::StudySession;
use vocadeck_core::sync::SyncReport;

use super::report_load;

pub fn execute(config: &VocadeckConfig, json: bool) -> Result<()> {
    let mut session = StudySession::open(&config.store_path)?;
    report_load(&session);

    let report = session.sync(&config.corpus_dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

/// Counts, dropped candidates and malformed lines of a sync pass.
pub fn print_report(report: &SyncReport) {
    println!(
        "Scan: {} imported, {} updated, {} removed, {} dropped ({} cards total)",
        report.imported,
        report.updated,
        report.removed,
        report.dropped.len(),
        report.total
    );

    if !report.dropped.is_empty() {
        println!("\nDropped (id already taken):");
        for d in &report.dropped {
            println!("  {} ({} vs existing {})", d.id, d.candidate_term, d.existing_term);
        }
    }

    if !report.malformed.is_empty() {
        println!("\nSkipped malformed lines:");
        for m in &report.malformed {
            println!("  {}:{}: {}", m.file.display(), m.line, m.text);
        }
    }
}
