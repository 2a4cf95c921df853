//! Graph command implementation

use colored::Colorize;
use yard_core::{Context, Roles};

use crate::commands::target_title;
use crate::error::Result;

/// Run the graph command
///
/// Prints the build order of every unit the block needs, then the tree
/// below its top-level. Unless `detect` is off, the top-level and
/// testbench are identified and recorded in the block's marker.
pub fn run_graph(ctx: &mut Context, title: Option<&str>, detect: bool) -> Result<()> {
    let title = target_title(ctx, title)?;
    let graph = ctx.build_graph(&title)?;
    let order = graph.topological_sort()?;

    let roles = if detect {
        ctx.detect_roles(&title, &graph)?
    } else {
        let meta = ctx.inventory.preferred(&title).map(|b| b.metadata().clone());
        let find = |name: Option<&String>| {
            name.and_then(|n| graph.find_unit(Some(title.library()), n))
                .cloned()
        };
        Roles {
            top: meta.as_ref().and_then(|m| find(m.toplevel.as_ref())),
            bench: meta.as_ref().and_then(|m| find(m.bench.as_ref())),
        }
    };

    println!("{}", "Build order".bold());
    for (i, unit) in order.units.iter().enumerate() {
        let file = unit.file.display().to_string();
        println!("  {:>3}. {} {}", i + 1, unit.to_string().cyan(), file.dimmed());
    }
    println!();

    if order.blocks.len() > 1 {
        println!("{}", "Blocks".bold());
        for block in &order.blocks {
            println!("  {}", block);
        }
        println!();
    }

    println!(
        "{}:   {}",
        "Top".dimmed(),
        roles.top.as_ref().map_or("-".to_string(), ToString::to_string)
    );
    println!(
        "{}: {}",
        "Bench".dimmed(),
        roles.bench.as_ref().map_or("-".to_string(), ToString::to_string)
    );

    if let Some(top) = &roles.top {
        println!();
        print!("{}", graph.render_tree(top));
    }
    Ok(())
}
