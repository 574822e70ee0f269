//! `nereus hotspots` / `largest` / `refactor` command implementations.

use colored::Colorize;
use nereus::{Priority, RefactoringResult};

use super::Context;
use super::display::{format_entity, print_json};

/// Run the hotspots command.
pub fn hotspots(ctx: &Context, limit: usize) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let ranked = nereus.most_connected(limit)?;

    if ctx.json {
        return print_json(&ranked);
    }

    if ranked.is_empty() {
        println!("{}", "No connected entities.".dimmed());
        return Ok(());
    }

    println!("{}", "Most connected entities".cyan().bold());
    println!();
    for (i, item) in ranked.iter().enumerate() {
        println!(
            "  {:>3}. {} {}",
            i + 1,
            format_entity(&item.entity),
            format!(
                "score {} ({} in / {} out)",
                item.score, item.incoming, item.outgoing
            )
            .green()
        );
    }

    Ok(())
}

/// Run the largest command.
pub fn largest(ctx: &Context, limit: usize) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let sized = nereus.largest_functions(limit)?;

    if ctx.json {
        return print_json(&sized);
    }

    if sized.is_empty() {
        println!("{}", "No functions with a known line span.".dimmed());
        return Ok(());
    }

    println!("{}", "Largest functions".cyan().bold());
    println!();
    for (i, item) in sized.iter().enumerate() {
        println!(
            "  {:>3}. {} {}",
            i + 1,
            format_entity(&item.entity),
            format!("{} lines", item.line_span).yellow()
        );
    }

    Ok(())
}

/// Run the refactor command.
pub fn refactor(ctx: &Context, identifier: &str) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;

    let Some(entity) = nereus.resolve(identifier)?.into_entity() else {
        if ctx.json {
            return print_json(&RefactoringResult::NotFound {
                id: identifier.into(),
            });
        }
        println!("No entity matches \"{}\"", identifier.cyan());
        return Ok(());
    };

    let result = nereus.suggest_refactoring(&entity.id)?;
    if ctx.json {
        return print_json(&result);
    }

    let RefactoringResult::Found(report) = result else {
        println!("No entity matches \"{}\"", identifier.cyan());
        return Ok(());
    };

    println!("{}", format_entity(&report.entity));
    println!();

    let span = report
        .metrics
        .line_span
        .map_or_else(|| "unknown".to_string(), |span| span.to_string());
    println!("  {}: {span}", "Line span".white().bold());
    println!(
        "  {}: {} in / {} out",
        "Coupling".white().bold(),
        report.metrics.incoming,
        report.metrics.outgoing
    );
    println!();

    if report.suggestions.is_empty() {
        println!("  {}", "No refactoring suggested.".green());
        return Ok(());
    }

    println!("  {}:", "Suggestions".white().bold());
    for suggestion in &report.suggestions {
        let priority = match suggestion.priority {
            Priority::High => "high".red().bold(),
            Priority::Medium => "medium".yellow(),
        };
        println!(
            "    {} [{priority}] {:?}: {}",
            "•".dimmed(),
            suggestion.kind,
            suggestion.message
        );
    }

    Ok(())
}
