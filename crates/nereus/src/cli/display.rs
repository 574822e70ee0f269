//! Common display utilities for CLI commands.

use colored::Colorize;
use nereus::{CallTree, Entity};
use serde::Serialize;

const MAX_DISPLAY_ITEMS: usize = 10;

/// Print any result structure as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), nereus::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `file:line`, or just `file` when the entity has no start line.
pub fn location(entity: &Entity) -> String {
    match entity.start_line {
        Some(line) => format!("{}:{line}", entity.file),
        None => entity.file.clone(),
    }
}

/// Qualified name when known, otherwise the short name.
pub fn display_name(entity: &Entity) -> &str {
    entity.qualified_name.as_deref().unwrap_or(&entity.name)
}

/// One-line entity summary: `name (kind) file:line`.
pub fn format_entity(entity: &Entity) -> String {
    format!(
        "{} {} {}",
        display_name(entity).white().bold(),
        format!("({})", entity.kind).dimmed(),
        location(entity).dimmed()
    )
}

/// Display a list of files with optional truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` files with bullet points. If there are more,
/// shows "... and N more". If empty, shows the provided `empty_message`.
pub fn print_files<'a>(files: impl ExactSizeIterator<Item = &'a String>, empty_message: &str) {
    let total = files.len();
    if total == 0 {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for file in files.take(MAX_DISPLAY_ITEMS) {
        println!("    {} {file}", "•".dimmed());
    }

    if total > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            total - MAX_DISPLAY_ITEMS
        );
    }
}

/// Print a call tree as an indented outline.
pub fn print_call_tree(tree: &CallTree) {
    let mut stack = vec![(0usize, &tree.root)];
    while let Some((depth, node)) = stack.pop() {
        let indent = "  ".repeat(depth + 1);
        if depth == 0 {
            println!("{indent}{}", format_entity(&node.entity));
        } else {
            println!("{indent}{} {}", "└─".dimmed(), format_entity(&node.entity));
        }
        stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
    }

    if tree.truncated {
        println!(
            "  {}",
            "(truncated at depth limit; increase --depth to see more)".yellow()
        );
    }
}
