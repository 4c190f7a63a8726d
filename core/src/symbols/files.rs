//! File-level commit planning.
//!
//! Collapses symbol dependency edges onto the files that own the symbols,
//! then groups files into connected components: files joined by any
//! cross-file dependency must land in the same commit.

use super::SymbolChange;
use std::collections::{BTreeSet, HashMap};

/// Graph over file paths. Edges point from the file defining a dependency
/// to the file depending on it; grouping ignores direction.
#[derive(Debug, Clone, Default)]
pub struct FileGraph {
    files: Vec<String>,
    index: HashMap<String, usize>,
    /// Directed edges, deduplicated.
    edges: BTreeSet<(usize, usize)>,
}

impl FileGraph {
    fn add_file(&mut self, file: &str) -> usize {
        if let Some(&i) = self.index.get(file) {
            return i;
        }
        let i = self.files.len();
        self.files.push(file.to_owned());
        self.index.insert(file.to_owned(), i);
        i
    }

    /// Files in first-seen order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Directed `(defining file, dependent file)` pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .map(|&(f, t)| (self.files[f].as_str(), self.files[t].as_str()))
            .collect()
    }

    /// Connected components by iterative depth-first search.
    ///
    /// Groups come out in order of their first file; files inside a group
    /// keep first-seen order.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let n = self.files.len();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(f, t) in &self.edges {
            neighbors[f].push(t);
            neighbors[t].push(f);
        }

        let mut visited = vec![false; n];
        let mut groups = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut members = Vec::new();
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(node) = stack.pop() {
                members.push(node);
                for &next in &neighbors[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
            members.sort_unstable();
            groups.push(members.into_iter().map(|i| self.files[i].clone()).collect());
        }
        groups
    }
}

/// Build the file graph for a set of changes.
///
/// Every file owning a change is a node. For each change whose symbol
/// depends on another changed symbol, an edge runs from each file owning a
/// change with that name to the dependent's file, skipping same-file pairs.
pub fn build_file_graph(changes: &[SymbolChange]) -> FileGraph {
    let mut graph = FileGraph::default();
    let mut owners: HashMap<&str, Vec<usize>> = HashMap::new();
    for change in changes {
        let file = graph.add_file(&change.file_path);
        let files = owners.entry(change.name.as_str()).or_default();
        if !files.contains(&file) {
            files.push(file);
        }
    }

    for change in changes {
        let dependent = graph.index[&change.file_path];
        for target in change.symbol.dependency_targets() {
            let Some(defining) = owners.get(target) else {
                continue;
            };
            for &definer in defining {
                if definer != dependent {
                    graph.edges.insert((definer, dependent));
                }
            }
        }
    }
    graph
}

/// Which files must be committed together.
///
/// Returns one group per connected component of the file graph. Files with
/// no cross-file dependency edges form singleton groups.
pub fn plan_file_groups(changes: &[SymbolChange]) -> Vec<Vec<String>> {
    build_file_graph(changes).connected_components()
}
