//! Dependency graph over changed symbols.
//!
//! Nodes are symbol names. An edge `X -> Y` means Y depends on X, so X's
//! change is upstream of Y's. The graph is rebuilt for every planning
//! request and clustered into weakly connected components, each of which
//! is then ordered topologically.

use super::SymbolChange;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Directed graph over symbol names, deduplicated, without self-edges.
///
/// Node order is insertion order and is what every deterministic tie-break
/// in this module falls back on.
#[derive(Debug, Clone, Default)]
pub struct SymbolGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    edge_set: HashSet<(usize, usize)>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if absent; returns its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(name.to_owned());
        self.index.insert(name.to_owned(), i);
        self.successors.push(Vec::new());
        i
    }

    /// Add `from -> to`, creating missing nodes. Returns `false` for
    /// self-edges and edges already present.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let f = self.add_node(from);
        let t = self.add_node(to);
        if f == t || !self.edge_set.insert((f, t)) {
            return false;
        }
        self.successors[f].push(t);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Node names in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }

    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| {
                self.successors[i]
                    .iter()
                    .map(|&j| self.nodes[j].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All edges as `(from, to)`, grouped by source in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.successors.iter().enumerate().flat_map(move |(f, succ)| {
            succ.iter()
                .map(move |&t| (self.nodes[f].as_str(), self.nodes[t].as_str()))
        })
    }

    /// Subgraph induced by `names`: nodes in this graph's insertion order,
    /// edges kept only when both endpoints are included.
    pub fn induced(&self, names: &[String]) -> SymbolGraph {
        let keep: HashSet<usize> = names
            .iter()
            .filter_map(|name| self.index.get(name).copied())
            .collect();
        let mut sub = SymbolGraph::new();
        for (i, name) in self.nodes.iter().enumerate() {
            if keep.contains(&i) {
                sub.add_node(name);
            }
        }
        for (from, to) in self.edges() {
            if sub.contains(from) && sub.contains(to) {
                sub.add_edge(from, to);
            }
        }
        sub
    }

    /// One induced subgraph per component, built in a single pass over the
    /// edges. Same result as calling [`induced`](Self::induced) for each
    /// component of a partition.
    pub fn component_subgraphs(&self, components: &[Vec<String>]) -> Vec<SymbolGraph> {
        let mut component_of: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut subgraphs = Vec::with_capacity(components.len());
        for (c, names) in components.iter().enumerate() {
            let mut members: Vec<usize> = names
                .iter()
                .filter_map(|name| self.index.get(name).copied())
                .collect();
            members.sort_unstable();
            let mut sub = SymbolGraph::new();
            for i in members {
                component_of[i] = Some(c);
                sub.add_node(&self.nodes[i]);
            }
            subgraphs.push(sub);
        }

        for (f, succ) in self.successors.iter().enumerate() {
            let Some(c) = component_of[f] else {
                continue;
            };
            for &t in succ {
                if component_of[t] == Some(c) {
                    subgraphs[c].add_edge(&self.nodes[f], &self.nodes[t]);
                }
            }
        }
        subgraphs
    }
}

/// Build the graph over every changed symbol.
///
/// Every change contributes a node. For each dependency target that is
/// itself a changed symbol, an edge `target -> dependent` is added.
pub fn build_symbol_graph(changes: &[SymbolChange]) -> SymbolGraph {
    let mut graph = SymbolGraph::new();
    for change in changes {
        graph.add_node(&change.name);
    }
    for change in changes {
        for target in change.symbol.dependency_targets() {
            if graph.contains(target) {
                graph.add_edge(target, &change.name);
            }
        }
    }
    graph
}

/// Partition the graph into weakly connected components.
///
/// Components are returned in order of their first node; members of each
/// component are in insertion order. Isolated nodes are singletons.
pub fn weakly_connected_components(graph: &SymbolGraph) -> Vec<Vec<String>> {
    let n = graph.node_count();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (f, succ) in graph.successors.iter().enumerate() {
        for &t in succ {
            neighbors[f].push(t);
            neighbors[t].push(f);
        }
    }

    let mut component_of: Vec<Option<usize>> = vec![None; n];
    let mut components: Vec<Vec<usize>> = Vec::new();

    for start in 0..n {
        if component_of[start].is_some() {
            continue;
        }
        let id = components.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        component_of[start] = Some(id);
        while let Some(node) = queue.pop_front() {
            members.push(node);
            for &next in &neighbors[node] {
                if component_of[next].is_none() {
                    component_of[next] = Some(id);
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }

    components
        .into_iter()
        .map(|members| {
            members
                .into_iter()
                .map(|i| graph.nodes[i].clone())
                .collect()
        })
        .collect()
}

/// A directed cycle prevented a complete topological order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dependency cycle among symbols: {}", cyclic.join(", "))]
pub struct CycleDetected {
    /// Every node exactly once: the acyclic prefix, then the nodes left on
    /// or behind a cycle in insertion order.
    pub fallback: Vec<String>,
    /// Nodes that could not be ordered.
    pub cyclic: Vec<String>,
}

/// Order nodes so every edge `X -> Y` puts X before Y (Kahn's algorithm).
///
/// Among nodes that are ready at the same time, the earliest-inserted goes
/// first, so the result is stable for a fixed graph.
pub fn topo_sort(graph: &SymbolGraph) -> Result<Vec<String>, CycleDetected> {
    let n = graph.node_count();
    let mut in_degree = vec![0usize; n];
    for succ in &graph.successors {
        for &t in succ {
            in_degree[t] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut emitted = vec![false; n];

    while let Some(node) = ready.pop_first() {
        order.push(node);
        emitted[node] = true;
        for &next in &graph.successors[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    let names = |ids: &[usize]| -> Vec<String> {
        ids.iter().map(|&i| graph.nodes[i].clone()).collect()
    };

    if order.len() == n {
        return Ok(names(&order));
    }

    let remaining: Vec<usize> = (0..n).filter(|&i| !emitted[i]).collect();
    let mut fallback = order;
    fallback.extend(&remaining);
    Err(CycleDetected {
        fallback: names(&fallback),
        cyclic: names(&remaining),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::diff::diff_snapshots;
    use crate::symbols::tests::sym;
    use crate::symbols::SymbolSnapshot;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> SymbolGraph {
        let mut g = SymbolGraph::new();
        for n in nodes {
            g.add_node(n);
        }
        for (f, t) in edges {
            g.add_edge(f, t);
        }
        g
    }

    fn added(file: &str, symbols: Vec<crate::symbols::Symbol>) -> Vec<SymbolChange> {
        let renderer = |_: &str, _: &str, _: &str| String::new();
        diff_snapshots(
            file,
            &SymbolSnapshot::default(),
            &SymbolSnapshot::new(symbols),
            &renderer,
            0,
        )
    }

    fn assert_topological(g: &SymbolGraph, order: &[String]) {
        let pos: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        for (f, t) in g.edges() {
            assert!(pos[f] < pos[t], "{f} should precede {t} in {order:?}");
        }
    }

    #[test]
    fn edges_point_from_dependency_to_dependent() {
        let changes = added(
            "f.rs",
            vec![
                sym("f.rs", "A", "a", &[]),
                sym("f.rs", "C", "c", &["A", "not_changed"]),
            ],
        );
        let g = build_symbol_graph(&changes);

        assert_eq!(g.nodes(), &["A".to_owned(), "C".to_owned()]);
        assert_eq!(g.successors("A"), vec!["C"]);
        assert!(g.successors("C").is_empty());
        assert!(!g.contains("not_changed"));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn duplicate_and_self_edges_are_dropped() {
        let changes = added(
            "f.rs",
            vec![
                sym("f.rs", "A", "a", &["A"]),
                sym("f.rs", "B", "b", &["A", "A"]),
            ],
        );
        let g = build_symbol_graph(&changes);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges().collect::<Vec<_>>(), vec![("A", "B")]);
    }

    #[test]
    fn isolated_nodes_are_singleton_components() {
        let g = graph(&["A", "B", "C"], &[]);
        let components = weakly_connected_components(&g);
        assert_eq!(
            components,
            vec![vec!["A".to_owned()], vec!["B".to_owned()], vec!["C".to_owned()]]
        );
    }

    #[test]
    fn components_ignore_edge_direction() {
        // A -> B <- C, D -> E, F alone
        let g = graph(
            &["A", "B", "C", "D", "E", "F"],
            &[("A", "B"), ("C", "B"), ("D", "E")],
        );
        let components = weakly_connected_components(&g);
        assert_eq!(components.len(), 3);
        assert_eq!(components[0], vec!["A", "B", "C"]);
        assert_eq!(components[1], vec!["D", "E"]);
        assert_eq!(components[2], vec!["F"]);
    }

    #[test]
    fn components_form_a_partition() {
        let g = graph(
            &["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"],
            &[("n7", "n0"), ("n2", "n5"), ("n5", "n3"), ("n1", "n1"), ("n4", "n6")],
        );
        let components = weakly_connected_components(&g);

        let mut seen = HashSet::new();
        for component in &components {
            for node in component {
                assert!(seen.insert(node.clone()), "{node} appears twice");
            }
        }
        let all: HashSet<String> = g.nodes().iter().cloned().collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn topo_sort_respects_edges() {
        // Inserted in reverse dependency order on purpose.
        let g = graph(
            &["render", "layout", "parse", "lex"],
            &[("lex", "parse"), ("parse", "layout"), ("layout", "render"), ("lex", "render")],
        );
        let order = topo_sort(&g).unwrap();
        assert_eq!(order, vec!["lex", "parse", "layout", "render"]);
        assert_topological(&g, &order);
    }

    #[test]
    fn topo_sort_ties_break_by_insertion_order() {
        let g = graph(&["b", "a", "c"], &[("b", "c"), ("a", "c")]);
        assert_eq!(topo_sort(&g).unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn topo_sort_reports_cycle_with_stable_fallback() {
        // root -> x -> y -> x, y -> leaf
        let g = graph(
            &["leaf", "x", "root", "y"],
            &[("root", "x"), ("x", "y"), ("y", "x"), ("y", "leaf")],
        );
        let err = topo_sort(&g).unwrap_err();
        assert_eq!(err.cyclic, vec!["leaf", "x", "y"]);
        assert_eq!(err.fallback, vec!["root", "leaf", "x", "y"]);
        assert!(err.to_string().contains("x, y"));
    }

    #[test]
    fn induced_subgraph_keeps_internal_edges_only() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let sub = g.induced(&["C".to_owned(), "B".to_owned()]);
        assert_eq!(sub.nodes(), &["B".to_owned(), "C".to_owned()]);
        assert_eq!(sub.edges().collect::<Vec<_>>(), vec![("B", "C")]);
    }

    #[test]
    fn component_subgraphs_match_induced() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("c", "a"), ("a", "c"), ("b", "d"), ("d", "b"), ("c", "b")],
        );
        let g = g.induced(&["a".to_owned(), "c".to_owned(), "d".to_owned(), "e".to_owned()]);
        let components = weakly_connected_components(&g);
        let subgraphs = g.component_subgraphs(&components);

        assert_eq!(subgraphs.len(), components.len());
        for (component, sub) in components.iter().zip(&subgraphs) {
            let expected = g.induced(component);
            assert_eq!(sub.nodes(), expected.nodes());
            assert_eq!(
                sub.edges().collect::<Vec<_>>(),
                expected.edges().collect::<Vec<_>>()
            );
        }
        assert_eq!(subgraphs[0].edge_count(), 2);
        assert_eq!(subgraphs[0].nodes(), ["a", "c"]);
    }

    #[test]
    fn empty_graph() {
        let g = SymbolGraph::new();
        assert!(weakly_connected_components(&g).is_empty());
        assert_eq!(topo_sort(&g).unwrap(), Vec::<String>::new());
    }
}
