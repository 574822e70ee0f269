//! `nereus resolve` command implementation.

use colored::Colorize;
use nereus::Resolution;

use super::Context;
use super::display::{format_entity, print_json};

/// Run the resolve command.
pub fn run(ctx: &Context, identifier: &str) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let resolution = nereus.resolve(identifier)?;

    if ctx.json {
        return print_json(&resolution);
    }

    match resolution {
        Resolution::Found { entity, strategy } => {
            println!("{}", format_entity(&entity));
            println!("  {}: {}", "id".dimmed(), entity.id);
            println!("  {}: {strategy:?}", "matched by".dimmed());
        }
        Resolution::NotFound { identifier } => {
            println!("No entity matches \"{}\"", identifier.cyan());
            println!(
                "\n{}: try '{}' for a substring search.",
                "hint".dimmed(),
                format!("nereus search {identifier}").cyan()
            );
        }
    }

    Ok(())
}
