//! `nereus cycles` command implementation.

use colored::Colorize;
use nereus::CycleStrategy;

use super::Context;
use super::display::print_json;

/// Run the cycles command.
pub fn run(
    ctx: &Context,
    max_depth: Option<u32>,
    strategy: Option<CycleStrategy>,
    scc: bool,
) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;

    if scc {
        let groups = nereus.strongly_connected_modules()?;
        if ctx.json {
            return print_json(&groups);
        }
        print_groups(&groups);
        return Ok(());
    }

    let max_depth = max_depth.unwrap_or(nereus.config().cycles.default_max_depth);
    let strategy = strategy.unwrap_or(nereus.config().cycles.strategy);
    let report = nereus.cycle_detector().find_cycles(max_depth, strategy)?;

    if ctx.json {
        return print_json(&report);
    }

    if report.cycles.is_empty() {
        println!(
            "{} (up to {max_depth} files per cycle)",
            "No circular dependencies detected.".green()
        );
    } else {
        println!(
            "Found {} circular dependencies:",
            report.cycles.len().to_string().red().bold()
        );
        println!();

        for (i, cycle) in report.cycles.iter().enumerate() {
            println!("  {} {}:", "Cycle".yellow().bold(), i + 1);
            println!("    {}", cycle.files.join(" → ").dimmed());
        }
    }

    if report.truncated {
        println!();
        println!(
            "  {}",
            format!(
                "(search stopped on its budget after {} roots; results may be incomplete)",
                report.roots_examined
            )
            .yellow()
        );
    }

    Ok(())
}

fn print_groups(groups: &[Vec<String>]) {
    if groups.is_empty() {
        println!("{}", "No mutually importing modules.".green());
        return;
    }

    println!(
        "Found {} groups of mutually importing files:",
        groups.len().to_string().red().bold()
    );
    println!();

    for (i, files) in groups.iter().enumerate() {
        println!(
            "  {} {} ({} files):",
            "Group".yellow().bold(),
            i + 1,
            files.len()
        );
        for file in files {
            println!("    {} {file}", "•".dimmed());
        }
    }
}
