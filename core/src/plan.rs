//! Turning a flat set of symbol changes into an ordered, labeled plan.
//!
//! Changes are clustered into weakly connected components of the symbol
//! graph (`component_N`), ordered topologically inside each component, and
//! tagged with the file group their file falls into (`commit_N`).

use crate::symbols::files::plan_file_groups;
use crate::symbols::graph::{build_symbol_graph, topo_sort, weakly_connected_components};
use crate::symbols::SymbolChange;
use std::collections::HashMap;

/// Label and order `changes`.
///
/// Output is cluster-major, topological-order-minor. Changes sharing a name
/// (the same symbol name in different files) share a node and stay in input
/// order relative to each other. Numbering starts at 1.
pub fn assemble_plan(changes: Vec<SymbolChange>) -> Vec<SymbolChange> {
    let file_groups = plan_file_groups(&changes);
    let graph = build_symbol_graph(&changes);
    let clusters = weakly_connected_components(&graph);

    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, change) in changes.iter().enumerate() {
        by_name.entry(change.name.clone()).or_default().push(i);
    }
    let mut slots: Vec<Option<SymbolChange>> = changes.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());

    for (i, subgraph) in graph.component_subgraphs(&clusters).iter().enumerate() {
        let component_id = format!("component_{}", i + 1);
        let order = topo_sort(subgraph).unwrap_or_else(|cycle| {
            log::warn!("[plan] {component_id}: {cycle}; using insertion order for the cycle");
            cycle.fallback
        });
        for name in &order {
            for &idx in by_name.get(name).map(Vec::as_slice).unwrap_or_default() {
                if let Some(mut change) = slots[idx].take() {
                    change.component_id = Some(component_id.clone());
                    ordered.push(change);
                }
            }
        }
    }

    let mut commit_of: HashMap<&str, String> = HashMap::new();
    for (j, group) in file_groups.iter().enumerate() {
        for file in group {
            commit_of.insert(file.as_str(), format!("commit_{}", j + 1));
        }
    }
    for change in &mut ordered {
        change.commit_id = commit_of.get(change.file_path.as_str()).cloned();
    }

    ordered
}
