//! `nereus import` command implementation.

use std::path::Path;

use colored::Colorize;
use nereus::{GraphSnapshot, GraphStore, SqliteStore};

use super::Context;
use super::display::print_json;

/// Run the import command.
pub fn run(ctx: &Context, snapshot_path: &Path) -> Result<(), nereus::Error> {
    let snapshot = GraphSnapshot::from_path(snapshot_path)?;
    let store = SqliteStore::import(&ctx.db, &snapshot)?;
    let stats = store.stats()?;

    if ctx.json {
        return print_json(&stats);
    }

    println!(
        "Imported {} entities and {} relations into {}",
        stats.entity_count.to_string().green().bold(),
        stats.relation_count.to_string().green().bold(),
        ctx.db.display().to_string().cyan()
    );

    if stats.dangling_relations > 0 {
        println!(
            "{}: {} relations point at missing entities and will be skipped by analyses",
            "warning".yellow(),
            stats.dangling_relations
        );
    }

    Ok(())
}
