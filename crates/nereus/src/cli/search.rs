//! `nereus search` command implementation.

use colored::Colorize;
use nereus::EntityKind;

use super::Context;
use super::display::{format_entity, print_json};

/// Run the search command.
pub fn run(
    ctx: &Context,
    pattern: &str,
    kind_filter: Option<&str>,
    limit: usize,
) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let kind = kind_filter.map(EntityKind::parse);
    let entities = nereus.search(pattern, kind.as_ref(), limit)?;

    if ctx.json {
        return print_json(&entities);
    }

    if entities.is_empty() {
        println!("No entities found matching \"{pattern}\"");

        let stats = nereus.stats()?;
        if stats.entity_count == 0 {
            println!(
                "\n{}: The graph is empty. Run '{}' to load a snapshot.",
                "hint".dimmed(),
                "nereus import".cyan()
            );
        } else if kind_filter.is_some() {
            println!(
                "\n{}: Try searching without the --kind filter, or check available kinds with '{}'.",
                "hint".dimmed(),
                "nereus stats".cyan()
            );
        }
        return Ok(());
    }

    println!(
        "Found {} entities matching \"{}\":",
        entities.len().to_string().green().bold(),
        pattern.cyan()
    );
    println!();

    for entity in &entities {
        println!("  {}", format_entity(entity));
    }

    Ok(())
}
