//! The `vocadeck migrate` command.

use anyhow::Result;

use vocadeck_core::config::VocadeckConfig;
use vocadeck_core::migration::{repair_file, RepairOutcome};

pub fn execute(config: &VocadeckConfig) -> Result<()> {
    match repair_file(&config.store_path)? {
        RepairOutcome::AlreadyCurrent => {
            println!(
                "{} is already in the current format, nothing to do.",
                config.store_path.display()
            );
        }
        RepairOutcome::Converted { report, backup } => {
            println!(
                "Converted {} legacy record(s) into {} card(s).",
                report.legacy_cards, report.cards
            );
            println!("Original saved as {}", backup.display());
        }
    }
    Ok(())
}
