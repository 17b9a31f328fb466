//! The `vocadeck status` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use vocadeck_core::config::VocadeckConfig;
use vocadeck_core::persist::StoreFile;

pub fn execute(config: &VocadeckConfig) -> Result<()> {
    let loaded = StoreFile::new(&config.store_path).load()?;
    let store = &loaded.store;
    let counts = store.counts();

    let mut table = Table::new();
    table.set_header(vec!["Deck", "Cards"]);
    table.add_row(vec![Cell::new("Study"), Cell::new(counts.study)]);
    table.add_row(vec![Cell::new("Review"), Cell::new(counts.review)]);
    table.add_row(vec![Cell::new("No Deck"), Cell::new(counts.no_deck)]);
    table.add_row(vec![Cell::new("Total"), Cell::new(store.cards.len())]);
    println!("{table}");

    match store.last_session {
        Some(date) => println!("Last session: {date}"),
        None => println!("Last session: never"),
    }
    Ok(())
}
