//! Core in-memory storage data structures.
//!
//! This module contains the inner storage structure that holds all edges
//! and is wrapped in `Arc<Mutex<>>` for thread safety.

use crate::domain::{DependencyEdge, DependencyId, DependencyKind, EntityRef};
use crate::error::{Rejection, Result, StorageError};
use crate::id_generation::IdGenerator;
use petgraph::Direction;
use petgraph::algo;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Edge weight stored in the graph.
#[derive(Debug, Clone)]
pub(crate) struct StoredEdge {
    /// Insertion sequence number, used to order listings
    pub(super) seq: u64,

    pub(super) edge: DependencyEdge,
}

/// Inner storage structure (not thread-safe).
///
/// The graph uses edges directed from **dependent to dependency**
/// (source -> target means source depends on target).
pub(crate) struct InMemoryStorageInner {
    /// Dependency graph. Nodes are entities, edges carry the full record.
    pub(super) graph: StableDiGraph<EntityRef, StoredEdge>,

    /// Mapping from entity to graph node.
    pub(super) node_map: HashMap<EntityRef, NodeIndex>,

    /// Mapping from edge ID to graph edge.
    ///
    /// Every edge in `graph` has exactly one entry here.
    pub(super) edge_map: HashMap<DependencyId, EdgeIndex>,

    /// ID generator for new edges
    pub(super) id_generator: IdGenerator,

    next_seq: u64,
}

impl InMemoryStorageInner {
    /// Create a new empty storage instance
    pub(crate) fn new(prefix: String) -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
            edge_map: HashMap::new(),
            id_generator: IdGenerator::new(prefix, 0),
            next_seq: 0,
        }
    }

    /// Get or create the node for an entity.
    pub(super) fn node_for(&mut self, entity: &EntityRef) -> NodeIndex {
        if let Some(&node) = self.node_map.get(entity) {
            return node;
        }
        let node = self.graph.add_node(entity.clone());
        self.node_map.insert(entity.clone(), node);
        node
    }

    /// Returns `true` if `target` is reachable from `source`.
    pub(super) fn has_path(&self, source: &EntityRef, target: &EntityRef) -> bool {
        match (self.node_map.get(source), self.node_map.get(target)) {
            (Some(&s), Some(&t)) => algo::has_path_connecting(&self.graph, s, t, None),
            _ => false,
        }
    }

    /// Find the edge `from -> to`, if any.
    pub(super) fn find_edge(&self, from: &EntityRef, to: &EntityRef) -> Option<EdgeIndex> {
        let from_node = self.node_map.get(from)?;
        let to_node = self.node_map.get(to)?;
        self.graph.find_edge(*from_node, *to_node)
    }

    /// Check whether `from -> to` may be added to the current graph.
    ///
    /// Checks run in the same order the engine reports them: self-edge,
    /// cycle, duplicate.
    pub(super) fn check_new_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
    ) -> std::result::Result<(), Rejection> {
        if from == to {
            return Err(Rejection::SelfDependency {
                entity: from.clone(),
            });
        }

        // Adding `from -> to` closes a cycle iff `from` is reachable from `to`.
        if self.has_path(to, from) {
            return Err(Rejection::CircularDependency {
                from: from.clone(),
                to: to.clone(),
            });
        }

        if self.find_edge(from, to).is_some() {
            return Err(Rejection::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            });
        }

        Ok(())
    }

    /// Generate a fresh edge ID.
    pub(super) fn generate_id(
        &mut self,
        from: &EntityRef,
        to: &EntityRef,
        kind: DependencyKind,
    ) -> Result<DependencyId> {
        let id = self
            .id_generator
            .generate(from, to, kind)
            .map_err(|e| StorageError::IdGeneration(e.to_string()))?;
        Ok(DependencyId::new(id))
    }

    /// Add an edge that has already passed [`Self::check_new_edge`].
    pub(super) fn add_edge(&mut self, edge: DependencyEdge) {
        let from_node = self.node_for(&edge.from);
        let to_node = self.node_for(&edge.to);

        let seq = self.next_seq;
        self.next_seq += 1;

        self.id_generator.register_id(edge.id.as_str());
        let id = edge.id.clone();
        let index = self
            .graph
            .add_edge(from_node, to_node, StoredEdge { seq, edge });
        self.edge_map.insert(id, index);
    }

    /// Remove an edge by ID, returning it.
    pub(super) fn remove_edge(&mut self, id: &DependencyId) -> Option<DependencyEdge> {
        let index = self.edge_map.remove(id)?;
        let stored = self.graph.remove_edge(index)?;
        self.id_generator.release_id(id.as_str());
        Some(stored.edge)
    }

    /// Remove every edge touching `entity`, then the entity's node.
    pub(super) fn remove_entity(&mut self, entity: &EntityRef) -> usize {
        let Some(&node) = self.node_map.get(entity) else {
            return 0;
        };

        let ids: Vec<DependencyId> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(self.graph.edges_directed(node, Direction::Incoming))
            .map(|edge| edge.weight().edge.id.clone())
            .collect();

        let removed = ids
            .iter()
            .filter(|id| self.remove_edge(id).is_some())
            .count();

        self.graph.remove_node(node);
        self.node_map.remove(entity);

        removed
    }

    /// Edges touching `entity` in the given direction, in insertion order.
    pub(super) fn edges_directed(
        &self,
        entity: &EntityRef,
        direction: Direction,
    ) -> Vec<DependencyEdge> {
        let Some(&node) = self.node_map.get(entity) else {
            return Vec::new();
        };

        let mut stored: Vec<&StoredEdge> = self
            .graph
            .edges_directed(node, direction)
            .map(|edge| edge.weight())
            .collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.edge.clone()).collect()
    }

    /// All edges, in insertion order.
    pub(super) fn all_edges(&self) -> Vec<DependencyEdge> {
        let mut stored: Vec<&StoredEdge> = self.graph.edge_weights().collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.edge.clone()).collect()
    }
}
