//! In-memory dependency graph and the algorithms that run over it.
//!
//! Every engine call loads the portion of the persisted graph it needs into
//! a [`DependencyGraph`] once, then runs cycle detection, chain traversal and
//! critical-path search against that structure without going back to the
//! store.
//!
//! ## Edge Direction Convention
//!
//! Edges point from the **dependent** to the **dependency**: an edge
//! `A -> B` means "A depends on B". Following outgoing edges from an entity
//! therefore walks its dependency chain.

use crate::domain::{DependencyEdge, EntityRef};
use crate::error::{Error, Result};
use crate::storage::DependencyStore;
use petgraph::algo;
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Default ceiling on traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default ceiling on the number of edges loaded for one traversal.
pub const DEFAULT_MAX_EDGES: usize = 10_000;

/// Ceilings applied while loading a subgraph from the store.
///
/// Exceeding either ceiling fails the operation with
/// [`Error::TraversalLimitExceeded`]; a truncated graph would let the cycle
/// detector miss real cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLimits {
    /// Maximum distance from the start entity, in edges
    pub max_depth: Option<usize>,

    /// Maximum number of edges loaded
    pub max_edges: Option<usize>,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_edges: Some(DEFAULT_MAX_EDGES),
        }
    }
}

/// Adjacency structure over a set of dependency edges.
///
/// Nodes hold [`EntityRef`]s and edge weights hold the full
/// [`DependencyEdge`]. Outgoing edges are always visited in the order they
/// were added.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<EntityRef, DependencyEdge>,
    nodes: HashMap<EntityRef, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of edges, preserving their order.
    pub fn from_edges(edges: impl IntoIterator<Item = DependencyEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Load every edge reachable from `start` by following outgoing edges.
    ///
    /// The store is walked breadth-first, one `outgoing` lookup per distinct
    /// entity. Each entity is expanded once, so each persisted edge is added
    /// exactly once even when several paths reach the same descendant.
    ///
    /// # Errors
    ///
    /// - `Error::TraversalLimitExceeded` if `limits` are exceeded
    /// - Any storage error raised by the store
    pub async fn load_reachable(
        store: &dyn DependencyStore,
        start: &EntityRef,
        limits: TraversalLimits,
    ) -> Result<Self> {
        let mut graph = Self::new();
        graph.node(start);

        let mut visited: HashSet<EntityRef> = HashSet::new();
        let mut queue: VecDeque<(EntityRef, usize)> = VecDeque::new();
        visited.insert(start.clone());
        queue.push_back((start.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            let edges = store.outgoing(&current).await?;
            if edges.is_empty() {
                continue;
            }

            if let Some(max) = limits.max_depth {
                if depth >= max {
                    return Err(Error::TraversalLimitExceeded {
                        limit: "depth",
                        value: max,
                    });
                }
            }

            for edge in edges {
                if visited.insert(edge.to.clone()) {
                    queue.push_back((edge.to.clone(), depth + 1));
                }
                graph.add_edge(edge);
            }

            if let Some(max) = limits.max_edges {
                if graph.edge_count() > max {
                    return Err(Error::TraversalLimitExceeded {
                        limit: "edges",
                        value: max,
                    });
                }
            }
        }

        debug!(
            start = %start,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Loaded reachable dependency subgraph"
        );

        Ok(graph)
    }

    /// Add an edge, creating its endpoint nodes as needed.
    pub fn add_edge(&mut self, edge: DependencyEdge) {
        let from = self.node(&edge.from);
        let to = self.node(&edge.to);
        self.graph.add_edge(from, to, edge);
    }

    fn node(&mut self, entity: &EntityRef) -> NodeIndex {
        if let Some(&index) = self.nodes.get(entity) {
            return index;
        }
        let index = self.graph.add_node(entity.clone());
        self.nodes.insert(entity.clone(), index);
        index
    }

    /// Number of distinct entities.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_weights()
    }

    /// Outgoing edges of an entity, in insertion order.
    pub fn outgoing(&self, entity: &EntityRef) -> Vec<&DependencyEdge> {
        self.nodes
            .get(entity)
            .map(|&node| {
                self.outgoing_refs(node)
                    .into_iter()
                    .map(|edge| edge.weight())
                    .collect()
            })
            .unwrap_or_default()
    }

    // petgraph yields a node's edges newest-first; sort back into insertion order.
    fn outgoing_refs(&self, node: NodeIndex) -> Vec<EdgeReference<'_, DependencyEdge>> {
        let mut edges: Vec<_> = self.graph.edges(node).collect();
        edges.sort_by_key(|edge| edge.id().index());
        edges
    }

    /// Returns `true` if `target` can be reached from `source` by following
    /// outgoing edges. An entity always reaches itself.
    pub fn has_path(&self, source: &EntityRef, target: &EntityRef) -> bool {
        match (self.nodes.get(source), self.nodes.get(target)) {
            (Some(&s), Some(&t)) => algo::has_path_connecting(&self.graph, s, t, None),
            _ => false,
        }
    }

    /// Transitive closure of outgoing edges from `start`.
    ///
    /// Depth-first, visiting each entity once. Every edge leaving a visited
    /// entity is emitted exactly once, so a diamond `A -> B -> C`,
    /// `A -> D -> C` yields all four edges even though `C` is reached twice.
    pub fn chain(&self, start: &EntityRef) -> Vec<DependencyEdge> {
        let mut result = Vec::new();
        if let Some(&node) = self.nodes.get(start) {
            let mut visited = HashSet::new();
            self.collect_chain(node, &mut visited, &mut result);
        }
        result
    }

    fn collect_chain(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        result: &mut Vec<DependencyEdge>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for edge in self.outgoing_refs(node) {
            result.push(edge.weight().clone());
            self.collect_chain(edge.target(), visited, result);
        }
    }
}

/// Returns `true` if adding `from -> to` to `graph` would close a cycle.
///
/// A self-edge is always a cycle. Otherwise the edge closes a cycle exactly
/// when `from` is already reachable from `to`. `graph` must hold the
/// persisted edges reachable from `to`, before the candidate is inserted.
pub fn would_create_cycle(graph: &DependencyGraph, from: &EntityRef, to: &EntityRef) -> bool {
    if from == to {
        return true;
    }
    graph.has_path(to, from)
}

/// Longest simple path of edges starting at a root entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Entity the path starts from
    pub root: EntityRef,

    /// Edges along the path, in order
    pub edges: Vec<DependencyEdge>,
}

impl CriticalPath {
    /// Number of edges on the path.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the root has no dependencies.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Entities along the path, starting with the root.
    pub fn entities(&self) -> Vec<&EntityRef> {
        std::iter::once(&self.root)
            .chain(self.edges.iter().map(|edge| &edge.to))
            .collect()
    }
}

/// Find the longest path, by edge count, through `chain` starting at `start`.
///
/// Memoized depth-first search: each entity's longest tail is computed
/// once and stored as its length plus the first edge to take, so shared
/// descendants cost nothing after their first visit. Outgoing edges are
/// tried in chain order and a tail is replaced only by a strictly longer
/// one, so ties go to the path found first in chain order.
pub fn critical_path(chain: &[DependencyEdge], start: &EntityRef) -> CriticalPath {
    let mut adjacency: HashMap<&EntityRef, Vec<&DependencyEdge>> = HashMap::new();
    for edge in chain {
        adjacency.entry(&edge.from).or_default().push(edge);
    }

    let mut tails: HashMap<&EntityRef, Tail<'_>> = HashMap::new();
    let mut in_progress: HashSet<&EntityRef> = HashSet::new();
    longest_tail(start, &adjacency, &mut tails, &mut in_progress);

    // Each `next` points at an entity whose tail was finished earlier, so
    // the walk always terminates.
    let mut edges = Vec::new();
    let mut node = start;
    while let Some(edge) = tails.get(node).and_then(|tail| tail.next) {
        edges.push(edge.clone());
        node = &edge.to;
    }

    CriticalPath {
        root: start.clone(),
        edges,
    }
}

/// Longest path found from one entity.
#[derive(Clone, Copy)]
struct Tail<'a> {
    len: usize,
    next: Option<&'a DependencyEdge>,
}

fn longest_tail<'a>(
    node: &'a EntityRef,
    adjacency: &HashMap<&'a EntityRef, Vec<&'a DependencyEdge>>,
    tails: &mut HashMap<&'a EntityRef, Tail<'a>>,
    in_progress: &mut HashSet<&'a EntityRef>,
) -> usize {
    if let Some(tail) = tails.get(node) {
        return tail.len;
    }

    let mut best = Tail { len: 0, next: None };
    if let Some(edges) = adjacency.get(node) {
        // Chains are acyclic; the guard only stops a corrupt chain from
        // recursing forever.
        in_progress.insert(node);
        for &edge in edges {
            if in_progress.contains(&edge.to) {
                continue;
            }
            let len = 1 + longest_tail(&edge.to, adjacency, tails, in_progress);
            if len > best.len {
                best = Tail {
                    len,
                    next: Some(edge),
                };
            }
        }
        in_progress.remove(node);
    }

    tails.insert(node, best);
    best.len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyId, DependencyKind};
    use chrono::Utc;

    fn edge(from: &str, to: &str) -> DependencyEdge {
        DependencyEdge {
            id: DependencyId::new(format!("{from}-{to}")),
            from: EntityRef::task(from),
            to: EntityRef::task(to),
            kind: DependencyKind::FinishToStart,
            created_at: Utc::now(),
        }
    }

    fn pairs(edges: &[DependencyEdge]) -> Vec<(String, String)> {
        edges
            .iter()
            .map(|e| (e.from.entity_id.clone(), e.to.entity_id.clone()))
            .collect()
    }

    fn diamond() -> DependencyGraph {
        DependencyGraph::from_edges([edge("A", "B"), edge("B", "C"), edge("A", "D"), edge("D", "C")])
    }

    // ========== Cycle Detection ==========

    #[test]
    fn test_self_edge_is_cycle() {
        let graph = DependencyGraph::new();
        assert!(would_create_cycle(
            &graph,
            &EntityRef::task("A"),
            &EntityRef::task("A")
        ));
    }

    #[test]
    fn test_back_edge_is_cycle() {
        let graph = DependencyGraph::from_edges([edge("A", "B"), edge("B", "C")]);
        assert!(would_create_cycle(
            &graph,
            &EntityRef::task("C"),
            &EntityRef::task("A")
        ));
    }

    #[test]
    fn test_forward_edge_is_not_cycle() {
        let graph = DependencyGraph::from_edges([edge("A", "B"), edge("B", "C")]);
        assert!(!would_create_cycle(
            &graph,
            &EntityRef::task("A"),
            &EntityRef::task("C")
        ));
    }

    #[test]
    fn test_unknown_entities_are_not_cycle() {
        let graph = diamond();
        assert!(!would_create_cycle(
            &graph,
            &EntityRef::task("X"),
            &EntityRef::task("Y")
        ));
    }

    #[test]
    fn test_cycle_check_respects_entity_type() {
        let graph = DependencyGraph::from_edges([edge("A", "B")]);
        let subtask_b = EntityRef::new(crate::domain::EntityType::Subtask, "B");
        assert!(!would_create_cycle(&graph, &subtask_b, &EntityRef::task("A")));
    }

    // ========== Chain Traversal ==========

    #[test]
    fn test_chain_diamond_contains_each_edge_once() {
        let chain = diamond().chain(&EntityRef::task("A"));
        assert_eq!(
            pairs(&chain),
            vec![
                ("A".into(), "B".into()),
                ("B".into(), "C".into()),
                ("A".into(), "D".into()),
                ("D".into(), "C".into()),
            ]
        );
    }

    #[test]
    fn test_chain_of_leaf_is_empty() {
        assert!(diamond().chain(&EntityRef::task("C")).is_empty());
    }

    #[test]
    fn test_chain_of_unknown_entity_is_empty() {
        assert!(diamond().chain(&EntityRef::task("Z")).is_empty());
    }

    #[test]
    fn test_chain_starts_mid_graph() {
        let chain = diamond().chain(&EntityRef::task("D"));
        assert_eq!(pairs(&chain), vec![("D".into(), "C".into())]);
    }

    #[test]
    fn test_outgoing_preserves_insertion_order() {
        let graph = DependencyGraph::from_edges([edge("A", "B"), edge("A", "C"), edge("A", "D")]);
        let targets: Vec<_> = graph
            .outgoing(&EntityRef::task("A"))
            .iter()
            .map(|e| e.to.entity_id.clone())
            .collect();
        assert_eq!(targets, vec!["B", "C", "D"]);
    }

    // ========== Critical Path ==========

    #[test]
    fn test_critical_path_prefers_longest_branch() {
        let chain = vec![edge("A", "D"), edge("A", "B"), edge("B", "C")];
        let path = critical_path(&chain, &EntityRef::task("A"));
        assert_eq!(path.len(), 2);
        assert_eq!(
            pairs(&path.edges),
            vec![("A".into(), "B".into()), ("B".into(), "C".into())]
        );
        let ids: Vec<_> = path.entities().iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_critical_path_explores_shared_descendants_on_every_branch() {
        // C is first reached through B; the D -> X branch reaches it again
        // with a longer prefix and must still continue on to E.
        let chain = vec![
            edge("A", "B"),
            edge("A", "D"),
            edge("D", "X"),
            edge("X", "C"),
            edge("B", "C"),
            edge("C", "E"),
        ];
        let path = critical_path(&chain, &EntityRef::task("A"));
        assert_eq!(
            pairs(&path.edges),
            vec![
                ("A".into(), "D".into()),
                ("D".into(), "X".into()),
                ("X".into(), "C".into()),
                ("C".into(), "E".into()),
            ]
        );
    }

    #[test]
    fn test_critical_path_tie_goes_to_first_found() {
        let chain = diamond().chain(&EntityRef::task("A"));
        let path = critical_path(&chain, &EntityRef::task("A"));
        assert_eq!(
            pairs(&path.edges),
            vec![("A".into(), "B".into()), ("B".into(), "C".into())]
        );
    }

    #[test]
    fn test_critical_path_diamond_ladder_takes_first_branch_per_rung() {
        // 40 rungs give 2^40 distinct paths; each entity is solved once
        let mut chain = Vec::new();
        for i in 0..40 {
            let (node, next) = (format!("N{i}"), format!("N{}", i + 1));
            let (left, right) = (format!("L{i}"), format!("R{i}"));
            chain.push(edge(&node, &left));
            chain.push(edge(&node, &right));
            chain.push(edge(&left, &next));
            chain.push(edge(&right, &next));
        }

        let path = critical_path(&chain, &EntityRef::task("N0"));

        assert_eq!(path.len(), 80);
        assert!(path
            .edges
            .iter()
            .all(|e| !e.from.entity_id.starts_with('R') && !e.to.entity_id.starts_with('R')));
        assert_eq!(path.entities().last(), Some(&&EntityRef::task("N40")));
    }

    #[test]
    fn test_critical_path_stops_at_corrupt_cycle() {
        let chain = vec![edge("A", "B"), edge("B", "C"), edge("C", "A")];
        let path = critical_path(&chain, &EntityRef::task("A"));
        assert_eq!(
            pairs(&path.edges),
            vec![("A".into(), "B".into()), ("B".into(), "C".into())]
        );
    }

    #[test]
    fn test_critical_path_of_isolated_entity_is_empty() {
        let path = critical_path(&[], &EntityRef::task("A"));
        assert!(path.is_empty());
        assert_eq!(path.entities(), vec![&EntityRef::task("A")]);
    }
}
