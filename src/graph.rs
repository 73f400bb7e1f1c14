//! Dependency graph over entity names, cycle detection and cycle breaking.
//!
//! An edge `A -> B` means entity `A` has a field whose type is `B`, so `B`
//! must be emitted before `A`. Nodes and edges keep their discovery order,
//! which is the tiebreak everywhere an order has to be chosen.
//!
//! ## Resolution
//!
//! 1. Every detected cycle is broken at its most recently discovered edge.
//! 2. The graph is recomputed without the broken edges and checked again;
//!    any cycle that survives is broken the same way. Each round removes at
//!    least one edge from a finite set, so this terminates.
//! 3. The reduced, acyclic graph is ordered dependencies-first.
//!
//! Fields behind a broken edge are emitted as deferred references.
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::{debug, debug_span, info};

use crate::error::{Error, Result};
use crate::model::EntitySet;

// ------------------------------- Graph ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// An edge removed to make the emission graph acyclic.
pub type BrokenEdge = Edge;

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Directed graph over entity names. Parallel edges collapse into one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    nodes: IndexSet<String>,
    edges: IndexSet<Edge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph of an entity set: one node per entity, one edge per
    /// distinct (entity, referenced entity) pair, both in set order.
    pub fn from_entities(entities: &EntitySet) -> Self {
        let mut graph = Self::new();
        graph.extend_from(entities);
        graph
    }

    pub fn extend_from(&mut self, entities: &EntitySet) {
        for entity in entities.iter() {
            self.add_node(&entity.name);
        }
        for entity in entities.iter() {
            for (_, target) in entity.references() {
                self.add_edge(&entity.name, target);
            }
        }
    }

    pub fn add_node(&mut self, name: &str) -> usize {
        match self.nodes.get_index_of(name) {
            Some(index) => index,
            None => self.nodes.insert_full(name.to_string()).0,
        }
    }

    /// Returns false if the edge was already present.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.add_node(from);
        self.add_node(to);
        self.edges.insert(Edge::new(from, to))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges.contains(&Edge::new(from, to))
    }

    /// Discovery position of an edge.
    pub fn edge_index(&self, edge: &Edge) -> Option<usize> {
        self.edges.get_index_of(edge)
    }

    /// A copy with the given edges removed; nodes are kept.
    pub fn without(&self, removed: &IndexSet<Edge>) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.iter().filter(|e| !removed.contains(*e)).cloned().collect(),
        }
    }

    /// Successor indices per node, in edge discovery order.
    fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            if let (Some(from), Some(to)) = (self.nodes.get_index_of(&edge.from), self.nodes.get_index_of(&edge.to)) {
                adjacency[from].push(to);
            }
        }
        adjacency
    }

    fn name(&self, index: usize) -> &str {
        self.nodes.get_index(index).map(String::as_str).unwrap_or_default()
    }
}

// ------------------------------- Cycles ---------------------------------- //

/// Entities along one dependency cycle, each depending on the next and the
/// last on the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cycle {
    entities: Vec<String>,
}

impl Cycle {
    pub fn new(entities: Vec<String>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e == name)
    }

    /// Edges along the cycle, including the closing one.
    pub fn edges(&self) -> Vec<Edge> {
        let n = self.entities.len();
        (0..n)
            .map(|i| Edge::new(self.entities[i].clone(), self.entities[(i + 1) % n].clone()))
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Cycles found so far, deduplicated up to rotation.
#[derive(Default)]
struct CycleSet {
    cycles: Vec<Vec<usize>>,
    seen: HashSet<Vec<usize>>,
}

impl CycleSet {
    fn push(&mut self, cycle: Vec<usize>) {
        let Some(start) = cycle.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i) else {
            return;
        };
        let mut canonical = cycle[start..].to_vec();
        canonical.extend_from_slice(&cycle[..start]);
        if self.seen.insert(canonical) {
            self.cycles.push(cycle);
        }
    }

    fn members(&self) -> HashSet<usize> {
        self.cycles.iter().flatten().copied().collect()
    }
}

/// Find the cycles of `graph` such that every entity on any cycle appears in
/// at least one returned cycle.
///
/// A depth-first search reports the stack slice closed by each back edge.
/// Back edges alone can miss members of a strongly connected component that
/// are only reachable through cross edges, so any such member gets the
/// shortest cycle through it within its component.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let adjacency = graph.adjacency();
    let mut found = CycleSet::default();

    let mut marks = vec![Mark::Unvisited; adjacency.len()];
    let mut stack = Vec::new();
    for start in 0..adjacency.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, &adjacency, &mut marks, &mut stack, &mut found);
        }
    }

    let mut covered = found.members();
    for component in strongly_connected(&adjacency) {
        let cyclic = component.len() > 1 || adjacency[component[0]].contains(&component[0]);
        if !cyclic {
            continue;
        }
        let members: HashSet<usize> = component.iter().copied().collect();
        let mut component = component;
        component.sort_unstable();
        for node in component {
            if covered.contains(&node) {
                continue;
            }
            if let Some(cycle) = shortest_cycle_through(node, &adjacency, &members) {
                covered.extend(cycle.iter().copied());
                found.push(cycle);
            }
        }
    }

    found
        .cycles
        .into_iter()
        .map(|cycle| Cycle::new(cycle.into_iter().map(|i| graph.name(i).to_string()).collect()))
        .collect()
}

fn visit(
    node: usize,
    adjacency: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    found: &mut CycleSet,
) {
    marks[node] = Mark::OnStack;
    stack.push(node);
    for &next in &adjacency[node] {
        match marks[next] {
            Mark::OnStack => {
                if let Some(start) = stack.iter().position(|&n| n == next) {
                    found.push(stack[start..].to_vec());
                }
            }
            Mark::Unvisited => visit(next, adjacency, marks, stack, found),
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
}

fn strongly_connected(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut graph = DiGraph::<(), ()>::with_capacity(adjacency.len(), 0);
    let indices: Vec<NodeIndex> = (0..adjacency.len()).map(|_| graph.add_node(())).collect();
    for (from, successors) in adjacency.iter().enumerate() {
        for &to in successors {
            graph.add_edge(indices[from], indices[to], ());
        }
    }
    tarjan_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().map(NodeIndex::index).collect())
        .collect()
}

/// Breadth-first search from `start` back to itself, staying inside
/// `members`.
fn shortest_cycle_through(
    start: usize,
    adjacency: &[Vec<usize>],
    members: &HashSet<usize>,
) -> Option<Vec<usize>> {
    let mut parent = HashMap::<usize, usize>::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if next == start {
                let mut path = vec![node];
                let mut cursor = node;
                while cursor != start {
                    cursor = parent[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            if members.contains(&next) && !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

// ----------------------------- Resolution -------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Entity names, every one after all of its non-deferred dependencies.
    pub order: Vec<String>,
    /// Removed edges, in the order they were chosen.
    pub broken: Vec<BrokenEdge>,
}

impl Resolution {
    pub fn is_broken(&self, from: &str, to: &str) -> bool {
        self.broken.iter().any(|e| e.from == from && e.to == to)
    }
}

/// Break `cycles` (and any cycle that survives them), then order the
/// reduced graph dependencies-first.
pub fn resolve(graph: &DependencyGraph, cycles: &[Cycle]) -> Result<Resolution> {
    let _span = debug_span!("resolve", cycles = cycles.len()).entered();
    let budget = graph.edge_count();
    let mut removed = IndexSet::<Edge>::new();
    let mut pending = cycles.to_vec();
    let mut rounds = 0usize;

    let reduced = loop {
        for cycle in &pending {
            break_cycle(graph, cycle, &mut removed);
        }
        let reduced = graph.without(&removed);
        let remaining = detect_cycles(&reduced);
        if remaining.is_empty() {
            break reduced;
        }
        rounds += 1;
        debug!(round = rounds, remaining = remaining.len(), "cycles survive the broken edges");
        if rounds > budget {
            return Err(Error::UnresolvableCycle { remaining: cycle_members(&remaining) });
        }
        pending = remaining;
    };

    let order = emission_order(&reduced)?;
    Ok(Resolution { order, broken: removed.into_iter().collect() })
}

/// Remove the cycle's most recently discovered edge unless one of its edges
/// is already gone.
fn break_cycle(graph: &DependencyGraph, cycle: &Cycle, removed: &mut IndexSet<Edge>) {
    let edges = cycle.edges();
    if edges.iter().any(|e| removed.contains(e)) {
        return;
    }
    let last = edges
        .into_iter()
        .filter_map(|e| graph.edge_index(&e).map(|i| (i, e)))
        .max_by_key(|(i, _)| *i);
    if let Some((_, edge)) = last {
        info!(from = %edge.from, to = %edge.to, "breaking dependency cycle");
        removed.insert(edge);
    }
}

/// Kahn's algorithm over reversed edges; ties go to the earliest discovered
/// node.
fn emission_order(graph: &DependencyGraph) -> Result<Vec<String>> {
    let adjacency = graph.adjacency();
    let mut waiting: Vec<usize> = adjacency.iter().map(Vec::len).collect();
    let mut dependents = vec![Vec::new(); adjacency.len()];
    for (from, successors) in adjacency.iter().enumerate() {
        for &to in successors {
            dependents[to].push(from);
        }
    }

    let mut ready: BTreeSet<usize> = (0..adjacency.len()).filter(|&n| waiting[n] == 0).collect();
    let mut order = Vec::with_capacity(adjacency.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &dependent in &dependents[node] {
            waiting[dependent] -= 1;
            if waiting[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < adjacency.len() {
        let emitted: HashSet<usize> = order.iter().copied().collect();
        let remaining = (0..adjacency.len())
            .filter(|n| !emitted.contains(n))
            .map(|n| graph.name(n).to_string())
            .collect();
        return Err(Error::UnresolvableCycle { remaining });
    }
    Ok(order.into_iter().map(|n| graph.name(n).to_string()).collect())
}

fn cycle_members(cycles: &[Cycle]) -> Vec<String> {
    let mut names = IndexSet::<String>::new();
    for cycle in cycles {
        names.extend(cycle.entities().iter().cloned());
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    fn members(cycles: &[Cycle]) -> BTreeSet<String> {
        cycles.iter().flat_map(|c| c.entities().iter().cloned()).collect()
    }

    /// Every surviving edge points at something earlier in the order.
    fn assert_dependencies_first(g: &DependencyGraph, resolution: &Resolution) {
        let position: HashMap<&str, usize> =
            resolution.order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        assert_eq!(position.len(), g.node_count());
        for edge in g.edges() {
            if resolution.is_broken(&edge.from, &edge.to) {
                continue;
            }
            assert!(
                position[edge.to.as_str()] < position[edge.from.as_str()],
                "{} emitted before its dependency {}",
                edge.from,
                edge.to
            );
        }
    }

    #[test]
    fn acyclic_graph_orders_dependencies_first() {
        let g = graph(&[("Root", "Root_address")]);
        assert!(detect_cycles(&g).is_empty());
        let resolution = resolve(&g, &[]).unwrap();
        assert_eq!(resolution.order, ["Root_address", "Root"]);
        assert!(resolution.broken.is_empty());
    }

    #[test]
    fn ties_follow_discovery_order() {
        let mut g = graph(&[("Root", "X"), ("Root", "Y"), ("Y", "Z")]);
        g.add_node("Lonely");
        let resolution = resolve(&g, &[]).unwrap();
        assert_eq!(resolution.order, ["X", "Z", "Lonely", "Y", "Root"]);
    }

    #[test]
    fn two_entity_cycle_breaks_the_later_edge() {
        let g = graph(&[("A", "B"), ("B", "A")]);
        let cycles = detect_cycles(&g);
        assert_eq!(cycles, [Cycle::new(vec!["A".into(), "B".into()])]);

        let resolution = resolve(&g, &cycles).unwrap();
        assert_eq!(resolution.broken, [Edge::new("B", "A")]);
        assert_eq!(resolution.order, ["B", "A"]);
        assert_dependencies_first(&g, &resolution);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let g = graph(&[("Root", "Node"), ("Node", "Node")]);
        let cycles = detect_cycles(&g);
        assert_eq!(cycles, [Cycle::new(vec!["Node".into()])]);
        let resolution = resolve(&g, &cycles).unwrap();
        assert_eq!(resolution.broken, [Edge::new("Node", "Node")]);
        assert_eq!(resolution.order, ["Node", "Root"]);
    }

    #[test]
    fn members_reached_only_by_cross_edges_are_reported() {
        // DFS from a: a->b closes on a; c->b is a cross edge once b is done.
        let g = graph(&[("a", "b"), ("b", "a"), ("a", "c"), ("c", "b")]);
        let cycles = detect_cycles(&g);
        assert_eq!(members(&cycles), BTreeSet::from(["a".to_string(), "b".into(), "c".into()]));
        let resolution = resolve(&g, &cycles).unwrap();
        assert!(detect_cycles(&g.without(&resolution.broken.iter().cloned().collect())).is_empty());
        assert_dependencies_first(&g, &resolution);
    }

    #[test]
    fn overlapping_cycles_are_all_broken() {
        let g = graph(&[("A", "B"), ("B", "A"), ("B", "C"), ("C", "B"), ("C", "D")]);
        let cycles = detect_cycles(&g);
        assert_eq!(members(&cycles).len(), 3);
        let resolution = resolve(&g, &cycles).unwrap();
        assert_eq!(resolution.broken.len(), 2);
        assert_eq!(resolution.order.first().map(String::as_str), Some("D"));
        assert_dependencies_first(&g, &resolution);
    }

    #[test]
    fn resolve_finds_cycles_it_was_not_told_about() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let resolution = resolve(&g, &[]).unwrap();
        assert_eq!(resolution.broken, [Edge::new("C", "A")]);
        assert_eq!(resolution.order, ["C", "B", "A"]);
    }

    #[test]
    fn dense_graph_resolves_to_a_valid_order() {
        let names = ["n0", "n1", "n2", "n3", "n4", "n5"];
        let mut g = DependencyGraph::new();
        for (i, from) in names.iter().enumerate() {
            for (j, to) in names.iter().enumerate() {
                if (i * 7 + j * 3) % 4 == 1 {
                    g.add_edge(from, to);
                }
            }
        }
        let cycles = detect_cycles(&g);
        let resolution = resolve(&g, &cycles).unwrap();
        assert_dependencies_first(&g, &resolution);
        let reduced = g.without(&resolution.broken.iter().cloned().collect());
        assert!(detect_cycles(&reduced).is_empty());
    }

    #[test]
    fn parallel_edges_collapse() {
        let mut g = DependencyGraph::new();
        assert!(g.add_edge("A", "B"));
        assert!(!g.add_edge("A", "B"));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
    }
}
