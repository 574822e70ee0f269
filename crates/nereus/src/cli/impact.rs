//! `nereus impact` command implementation.

use colored::Colorize;
use nereus::{ImpactReport, RiskLevel};

use super::Context;
use super::display::{print_files, print_json};

/// Run the impact command.
pub fn run(ctx: &Context, files: &[String]) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let report = nereus.analyze_impact(files)?;

    if ctx.json {
        return print_json(&report);
    }

    println!(
        "Impact analysis for {} changed file(s):",
        report.summary.changed.to_string().cyan().bold()
    );
    print_impact(&report);
    Ok(())
}

fn print_impact(report: &ImpactReport) {
    println!();

    println!(
        "  {} ({} files):",
        "Directly affected".white().bold(),
        report.summary.direct.to_string().green()
    );
    print_files(report.directly_affected.iter(), "(none)");
    println!();

    println!(
        "  {} ({} files):",
        "Transitively affected".white().bold(),
        report.summary.transitive.to_string().yellow()
    );
    print_files(report.transitively_affected.iter(), "(none beyond direct)");
    println!();

    println!(
        "  {} ({} files):",
        "Affected tests".white().bold(),
        report.summary.tests.to_string().cyan()
    );
    print_files(report.affected_tests.iter(), "(none)");
    println!();

    let risk = report.risk_level.to_string();
    let risk = match report.risk_level {
        RiskLevel::Low => risk.green(),
        RiskLevel::Medium => risk.yellow(),
        RiskLevel::High => risk.red(),
        RiskLevel::Critical => risk.red().bold(),
    };
    println!(
        "  {}: {risk} ({} files affected)",
        "Risk".white().bold(),
        report.summary.total
    );

    if report.truncated {
        println!(
            "  {}",
            "(stopped at the configured file budget; the real impact is larger)".yellow()
        );
    }
}
