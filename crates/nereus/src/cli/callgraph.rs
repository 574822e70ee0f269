//! `nereus callers` / `nereus callees` command implementation.

use colored::Colorize;
use nereus::{CallDirection, CallGraph, CallGraphOptions, CallGraphResult, Nereus};

use super::Context;
use super::display::{format_entity, print_call_tree, print_json};

/// Run the callers or callees command.
///
/// `name` is first matched as an exact function name; if no function has
/// that name it is resolved like `nereus resolve` does.
pub fn run(
    ctx: &Context,
    name: &str,
    depth: Option<u32>,
    direction: CallDirection,
) -> Result<(), nereus::Error> {
    let nereus = ctx.open()?;
    let options = CallGraphOptions {
        depth: depth.unwrap_or(nereus.config().traversal.default_depth),
        direction,
    };

    let result = match nereus.call_graph(name, options)? {
        CallGraphResult::NotFound { .. } => resolve_fallback(&nereus, name, options)?,
        found => found,
    };

    if ctx.json {
        return print_json(&result);
    }

    let CallGraphResult::Found(graph) = result else {
        println!("No function found matching \"{}\"", name.cyan());
        return Ok(());
    };

    print_graph(&graph, direction);
    Ok(())
}

/// Build the trees around whatever entity `identifier` resolves to.
fn resolve_fallback(
    nereus: &Nereus,
    identifier: &str,
    options: CallGraphOptions,
) -> Result<CallGraphResult, nereus::Error> {
    let Some(entity) = nereus.resolve(identifier)?.into_entity() else {
        return Ok(CallGraphResult::NotFound {
            name: identifier.to_string(),
        });
    };

    tracing::debug!(identifier, entity_id = %entity.id, "Using resolved entity as call graph root");

    let callers = match options.direction {
        CallDirection::Callers | CallDirection::Both => nereus.callers(&entity.id, options.depth)?,
        CallDirection::Callees => None,
    };
    let callees = match options.direction {
        CallDirection::Callees | CallDirection::Both => nereus.callees(&entity.id, options.depth)?,
        CallDirection::Callers => None,
    };

    Ok(CallGraphResult::Found(CallGraph {
        entity,
        callers,
        callees,
    }))
}

fn print_graph(graph: &CallGraph, direction: CallDirection) {
    println!("{}", format_entity(&graph.entity));
    println!();

    if let Some(tree) = &graph.callers {
        let count = tree.node_count - 1;
        println!(
            "  {} ({}):",
            "Callers".white().bold(),
            count.to_string().green()
        );
        if count == 0 {
            println!("    {}", "(none)".dimmed());
        } else {
            print_call_tree(tree);
        }
        if direction == CallDirection::Both {
            println!();
        }
    }

    if let Some(tree) = &graph.callees {
        let count = tree.node_count - 1;
        println!(
            "  {} ({}):",
            "Callees".white().bold(),
            count.to_string().green()
        );
        if count == 0 {
            println!("    {}", "(none)".dimmed());
        } else {
            print_call_tree(tree);
        }
    }
}
