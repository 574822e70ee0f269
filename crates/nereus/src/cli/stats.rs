//! `nereus stats` command implementation.

use colored::Colorize;

use super::Context;
use super::display::print_json;

/// Run the stats command.
pub fn run(ctx: &Context) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let stats = nereus.stats()?;

    if ctx.json {
        return print_json(&stats);
    }

    let db_size_str = match std::fs::metadata(&ctx.db) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to get database file size");
            "size unknown".to_string()
        }
    };

    println!("{}", "Nereus Graph Statistics".cyan().bold());
    println!();
    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        ctx.db.display(),
        db_size_str
    );
    println!(
        "  {}: {}",
        "Files".white().bold(),
        stats.file_count.to_string().green()
    );
    println!();

    println!(
        "  {}: {} total",
        "Entities".white().bold(),
        stats.entity_count.to_string().green()
    );
    // Sort by count descending, then by kind for deterministic output
    let mut kinds: Vec<_> = stats.entities_by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (kind, count) in kinds {
        println!("    {}: {count}", kind.dimmed());
    }
    println!();

    println!(
        "  {}: {} total",
        "Relations".white().bold(),
        stats.relation_count.to_string().green()
    );
    let mut kinds: Vec<_> = stats.relations_by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (kind, count) in kinds {
        println!("    {}: {count}", kind.dimmed());
    }

    if stats.dangling_relations > 0 {
        println!();
        println!(
            "  {}: {} relations point at missing entities",
            "Dangling".yellow().bold(),
            stats.dangling_relations
        );
    }

    Ok(())
}

/// Format a byte count as a human-readable size.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
