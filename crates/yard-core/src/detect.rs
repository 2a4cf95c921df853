//! Picking a block's top-level unit and its testbench.

use crate::block::Block;
use crate::chooser::Chooser;
use crate::error::Result;
use crate::graph::UnitGraph;
use crate::unit::Unit;

/// Units of `block` that could be its top level.
///
/// A candidate is neither a testbench nor a package, and no other design
/// unit of the same block requires it. Testbenches requiring it do not count.
pub fn top_candidates<'g>(graph: &'g UnitGraph, block: &Block) -> Vec<&'g Unit> {
    let title = block.title();
    graph
        .units()
        .filter(|u| u.block == *title && !u.is_testbench && !u.is_package())
        .filter(|u| {
            !graph
                .dependents_of(u)
                .iter()
                .any(|d| d.block == *title && !d.is_testbench && d.key() != u.key())
        })
        .collect()
}

/// Testbenches of `block` that exercise `top`.
pub fn bench_candidates<'g>(graph: &'g UnitGraph, block: &Block, top: &Unit) -> Vec<&'g Unit> {
    graph
        .units()
        .filter(|u| u.block == *block.title() && u.is_testbench)
        .filter(|u| u.requires_unit(top.library(), &top.name))
        .collect()
}

/// Pick among candidates: none gives `None`, one is taken, several go to
/// the chooser unless `current` names one of them.
fn pick<'g>(
    candidates: Vec<&'g Unit>,
    current: Option<&str>,
    prompt: &str,
    chooser: &dyn Chooser,
) -> Option<&'g Unit> {
    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        many => {
            if let Some(kept) = current
                .and_then(|name| many.iter().find(|u| u.name.eq_ignore_ascii_case(name)))
            {
                return Some(*kept);
            }
            let options: Vec<String> = many.iter().map(|u| u.to_string()).collect();
            chooser.choose(prompt, &options).and_then(|i| many.get(i).copied())
        }
    }
}

/// Determine the block's top-level unit and record it in the marker.
pub fn identify_top(
    graph: &UnitGraph,
    block: &mut Block,
    chooser: &dyn Chooser,
) -> Result<Option<Unit>> {
    let candidates = top_candidates(graph, block);
    if candidates.is_empty() {
        tracing::warn!(block = %block.title(), "no top-level unit found");
        return Ok(None);
    }
    let current = block.metadata().toplevel.clone();
    let Some(top) = pick(
        candidates,
        current.as_deref(),
        "Select the top-level unit",
        chooser,
    ) else {
        tracing::warn!(block = %block.title(), "no top-level unit selected");
        return Ok(None);
    };

    if current.as_deref() != Some(top.name.as_str()) {
        block.metadata_mut().toplevel = Some(top.name.clone());
        block.save()?;
        tracing::info!(block = %block.title(), top = %top.name, "top-level unit set");
    }
    Ok(Some(top.clone()))
}

/// Determine the testbench for `top` and record it (or its absence) in the marker.
pub fn identify_bench(
    graph: &UnitGraph,
    block: &mut Block,
    top: &Unit,
    chooser: &dyn Chooser,
) -> Result<Option<Unit>> {
    let candidates = bench_candidates(graph, block, top);
    let current = block.metadata().bench.clone();
    let bench = if candidates.is_empty() {
        tracing::warn!(block = %block.title(), top = %top.name, "no testbench found");
        None
    } else {
        pick(candidates, current.as_deref(), "Select the testbench", chooser)
    };

    let chosen = bench.map(|b| b.name.clone());
    if chosen != current {
        block.metadata_mut().bench = chosen;
        block.save()?;
    }
    Ok(bench.cloned())
}
