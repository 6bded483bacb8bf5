//! Dependency engine facade.
//!
//! [`DependencyEngine`] is what request handlers and the CLI talk to. It
//! combines a [`DependencyStore`], a [`DateProvider`] and a
//! [`NameResolver`], and holds no graph state of its own: every call loads
//! what it needs from the store, so one engine can be shared behind an
//! `Arc` by any number of concurrent callers.
//!
//! # Validation order
//!
//! [`DependencyEngine::create`] reports the first failing check, in this
//! order:
//!
//! 1. `SelfDependency` when `from == to`
//! 2. `CircularDependency` when `to` already reaches `from`
//! 3. `DuplicateEdge` when `from -> to` already exists, whatever its kind
//! 4. `SchedulingConflict` when the endpoints' dates violate the kind
//!
//! The store then repeats checks 1, 2 and 3 under its write lock, so two
//! concurrent creates cannot jointly close a cycle.

use crate::catalog::NameResolver;
use crate::domain::{
    DependencyEdge, DependencyId, DependencyKind, EdgeDirection, EntityRef, NewDependency,
};
use crate::error::{Error, Rejection, Result};
use crate::graph::{self, CriticalPath, DependencyGraph, TraversalLimits};
use crate::schedule::{self, DateProvider};
use crate::storage::DependencyStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tunables for a [`DependencyEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Ceilings applied to every graph traversal
    pub limits: TraversalLimits,

    /// Re-run the scheduling check when an edge's kind is changed
    pub revalidate_on_kind_change: bool,
}

/// Outcome of a dry-run validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Every check that failed, in validation order
    pub rejections: Vec<Rejection>,
}

impl ValidationReport {
    /// Returns `true` if no check failed.
    pub fn is_valid(&self) -> bool {
        self.rejections.is_empty()
    }

    /// Human-readable reasons, one per failed check.
    pub fn reasons(&self) -> Vec<String> {
        self.rejections.iter().map(ToString::to_string).collect()
    }
}

/// An entity in a [`GraphView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The entity this node stands for
    pub entity: EntityRef,

    /// Display name, or `Unknown` when no catalog entry exists
    pub name: String,

    /// Whether this is the entity the view was built for
    pub is_root: bool,
}

/// One entity in a [`DependencyTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// The entity this node stands for
    pub entity: EntityRef,

    /// Display name, or `Unknown` when no catalog entry exists
    pub name: String,

    /// Edge linking this node to its parent; `None` for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<DependencyId>,

    /// Kind of the edge linking this node to its parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DependencyKind>,

    /// Set when this entity's dependencies are already shown elsewhere in
    /// the tree. Its `dependencies` list is then left empty; the full
    /// subtree sits under the first occurrence in depth-first order.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeated: bool,

    /// Child nodes, one per outgoing edge, in creation order
    pub dependencies: Vec<TreeNode>,
}

/// Parent/child view rooted at one entity.
///
/// Dependencies are nested to full depth, except that an entity reached
/// a second time is marked `repeated` and not expanded again. Dependents
/// (entities that depend on the root) are listed one level only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    /// The entity the tree was built for, with its nested dependencies
    pub root: TreeNode,

    /// Entities with an edge into the root
    pub dependents: Vec<TreeNode>,
}

/// Node/edge listing of an entity's chain, for visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    /// The entity the view was built for
    pub root: EntityRef,

    /// Every entity in the chain, root first, in discovery order
    pub nodes: Vec<GraphNode>,

    /// Every edge in the chain, in traversal order
    pub edges: Vec<DependencyEdge>,

    /// Same chain as a nested tree; see [`TreeNode::repeated`]
    pub tree: DependencyTree,
}

/// Stateless facade over the dependency store and its collaborators.
#[derive(Clone)]
pub struct DependencyEngine {
    store: Arc<dyn DependencyStore>,
    dates: Arc<dyn DateProvider>,
    names: Arc<dyn NameResolver>,
    settings: EngineSettings,
}

impl std::fmt::Debug for DependencyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyEngine")
            .field("store", &"<dyn DependencyStore>")
            .field("dates", &"<dyn DateProvider>")
            .field("names", &"<dyn NameResolver>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl DependencyEngine {
    /// Create an engine from its collaborators.
    pub fn new(
        store: Arc<dyn DependencyStore>,
        dates: Arc<dyn DateProvider>,
        names: Arc<dyn NameResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            dates,
            names,
            settings,
        }
    }

    /// Create an engine whose dates and names come from one source.
    pub fn with_lookup<L>(store: Arc<dyn DependencyStore>, lookup: L, settings: EngineSettings) -> Self
    where
        L: DateProvider + NameResolver + 'static,
    {
        let lookup = Arc::new(lookup);
        Self::new(store, lookup.clone(), lookup, settings)
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn DependencyStore {
        self.store.as_ref()
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Create a dependency: `from` depends on `to`.
    ///
    /// # Errors
    ///
    /// - `Error::Rejected(..)` if a validation check fails (see module docs)
    /// - `Error::TraversalLimitExceeded` if the cycle check hits a ceiling
    /// - Storage errors if the store fails; nothing is written in that case
    pub async fn create(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: DependencyKind,
    ) -> Result<DependencyEdge> {
        if from == to {
            return Err(rejected(Rejection::SelfDependency {
                entity: from.clone(),
            }));
        }

        let reachable = self.load(to).await?;
        if graph::would_create_cycle(&reachable, from, to) {
            return Err(rejected(Rejection::CircularDependency {
                from: from.clone(),
                to: to.clone(),
            }));
        }

        if self.store.exists(from, to).await? {
            return Err(rejected(Rejection::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            }));
        }

        if let Some(message) = schedule::check_edge(self.dates.as_ref(), from, to, kind).await? {
            return Err(rejected(Rejection::SchedulingConflict(message)));
        }

        let edge = self
            .store
            .insert(NewDependency::new(from.clone(), to.clone(), kind))
            .await
            .map_err(|e| {
                if let Some(rejection) = e.rejection() {
                    warn!(reason = %rejection, "Dependency rejected by store re-check");
                }
                e
            })?;
        self.persist().await?;

        info!(id = %edge.id, edge = %edge, "Created dependency");
        Ok(edge)
    }

    /// Run every creation check without writing anything.
    ///
    /// Unlike [`Self::create`], all failing checks are reported.
    pub async fn validate(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: DependencyKind,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        if from == to {
            report.rejections.push(Rejection::SelfDependency {
                entity: from.clone(),
            });
        } else {
            let reachable = self.load(to).await?;
            if graph::would_create_cycle(&reachable, from, to) {
                report.rejections.push(Rejection::CircularDependency {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        if self.store.exists(from, to).await? {
            report.rejections.push(Rejection::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            });
        }

        if let Some(message) = schedule::check_edge(self.dates.as_ref(), from, to, kind).await? {
            report.rejections.push(Rejection::SchedulingConflict(message));
        }

        debug!(from = %from, to = %to, kind = %kind, failed = report.rejections.len(), "Validated dependency");
        Ok(report)
    }

    /// Change the kind of an existing edge.
    ///
    /// The scheduling check only runs when
    /// [`EngineSettings::revalidate_on_kind_change`] is set.
    ///
    /// # Errors
    ///
    /// - `Error::DependencyNotFound` if the edge doesn't exist
    /// - `Error::Rejected(SchedulingConflict)` when revalidation fails
    pub async fn update_kind(&self, id: &DependencyId, kind: DependencyKind) -> Result<DependencyEdge> {
        if self.settings.revalidate_on_kind_change {
            let edge = self
                .store
                .get(id)
                .await?
                .ok_or_else(|| Error::DependencyNotFound(id.clone()))?;
            if let Some(message) =
                schedule::check_edge(self.dates.as_ref(), &edge.from, &edge.to, kind).await?
            {
                return Err(rejected(Rejection::SchedulingConflict(message)));
            }
        }

        let edge = self.store.update_kind(id, kind).await?;
        self.persist().await?;

        info!(id = %edge.id, kind = %kind, "Updated dependency kind");
        Ok(edge)
    }

    /// Delete one edge, returning it.
    pub async fn delete(&self, id: &DependencyId) -> Result<DependencyEdge> {
        let edge = self.store.delete(id).await?;
        self.persist().await?;

        info!(id = %edge.id, edge = %edge, "Deleted dependency");
        Ok(edge)
    }

    /// Delete every edge touching `entity`, e.g. after the entity itself was
    /// deleted. Returns the number of edges removed.
    pub async fn delete_all_for_entity(&self, entity: &EntityRef) -> Result<usize> {
        let removed = self.store.delete_all_for_entity(entity).await?;
        if removed > 0 {
            self.persist().await?;
            info!(entity = %entity, removed, "Deleted all dependencies of entity");
        }
        Ok(removed)
    }

    /// Direct edges of `entity`. `Both` lists outgoing edges first.
    pub async fn dependencies(
        &self,
        entity: &EntityRef,
        direction: EdgeDirection,
    ) -> Result<Vec<DependencyEdge>> {
        match direction {
            EdgeDirection::Outgoing => self.store.outgoing(entity).await,
            EdgeDirection::Incoming => self.store.incoming(entity).await,
            EdgeDirection::Both => {
                let mut edges = self.store.outgoing(entity).await?;
                edges.extend(self.store.incoming(entity).await?);
                Ok(edges)
            }
        }
    }

    /// Every edge reachable from `entity` by following dependencies.
    pub async fn chain(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        Ok(self.load(entity).await?.chain(entity))
    }

    /// Scheduling violations over the whole chain of `entity`.
    ///
    /// Returns every violation message, in chain order; empty means the
    /// chain is consistent.
    pub async fn validate_chain(&self, entity: &EntityRef) -> Result<Vec<String>> {
        let chain = self.chain(entity).await?;

        let mut violations = Vec::new();
        for edge in &chain {
            if let Some(message) =
                schedule::check_edge(self.dates.as_ref(), &edge.from, &edge.to, edge.kind).await?
            {
                violations.push(message);
            }
        }

        debug!(entity = %entity, edges = chain.len(), violations = violations.len(), "Validated chain");
        Ok(violations)
    }

    /// Longest path of dependencies, by edge count, starting at `entity`.
    pub async fn critical_path(&self, entity: &EntityRef) -> Result<CriticalPath> {
        let chain = self.chain(entity).await?;
        Ok(graph::critical_path(&chain, entity))
    }

    /// Chain of `entity` as named nodes and edges, plus a tree view.
    pub async fn graph_view(&self, entity: &EntityRef) -> Result<GraphView> {
        let reachable = self.load(entity).await?;
        let chain = reachable.chain(entity);
        let dependents = self.store.incoming(entity).await?;

        // Root first, then chain entities in order of appearance
        let mut ordered: Vec<&EntityRef> = vec![entity];
        let mut seen: HashSet<&EntityRef> = HashSet::from([entity]);
        for edge in &chain {
            for endpoint in [&edge.from, &edge.to] {
                if seen.insert(endpoint) {
                    ordered.push(endpoint);
                }
            }
        }

        let mut names: HashMap<EntityRef, String> = HashMap::new();
        for candidate in ordered.iter().copied().chain(dependents.iter().map(|e| &e.from)) {
            if !names.contains_key(candidate) {
                let name = self.names.display_name(candidate).await?;
                names.insert(candidate.clone(), name);
            }
        }

        let nodes = ordered
            .iter()
            .map(|&node| GraphNode {
                entity: node.clone(),
                name: name_of(&names, node),
                is_root: node == entity,
            })
            .collect();

        let mut expanded = HashSet::new();
        let root = build_tree(&reachable, entity, None, &names, &mut expanded);
        let dependents = dependents
            .iter()
            .map(|edge| TreeNode {
                entity: edge.from.clone(),
                name: name_of(&names, &edge.from),
                dependency_id: Some(edge.id.clone()),
                kind: Some(edge.kind),
                repeated: false,
                dependencies: Vec::new(),
            })
            .collect();

        Ok(GraphView {
            root: entity.clone(),
            nodes,
            edges: chain,
            tree: DependencyTree { root, dependents },
        })
    }

    async fn load(&self, start: &EntityRef) -> Result<DependencyGraph> {
        DependencyGraph::load_reachable(self.store.as_ref(), start, self.settings.limits).await
    }

    /// Save after a mutation. On failure the store is reloaded so memory
    /// matches what is on disk, and the save error is returned.
    async fn persist(&self) -> Result<()> {
        if let Err(save_err) = self.store.save().await {
            error!(error = %save_err, "Failed to save dependencies, reloading store");
            if let Err(reload_err) = self.store.reload().await {
                error!(error = %reload_err, "Failed to reload store after save failure");
            }
            return Err(save_err);
        }
        Ok(())
    }
}

fn rejected(rejection: Rejection) -> Error {
    warn!(reason = %rejection, "Dependency rejected");
    Error::Rejected(rejection)
}

fn name_of(names: &HashMap<EntityRef, String>, entity: &EntityRef) -> String {
    names
        .get(entity)
        .cloned()
        .unwrap_or_else(|| crate::catalog::UNKNOWN_NAME.to_string())
}

fn build_tree(
    graph: &DependencyGraph,
    entity: &EntityRef,
    via: Option<&DependencyEdge>,
    names: &HashMap<EntityRef, String>,
    expanded: &mut HashSet<EntityRef>,
) -> TreeNode {
    let outgoing = graph.outgoing(entity);
    let repeated = !outgoing.is_empty() && !expanded.insert(entity.clone());

    let dependencies = if repeated {
        Vec::new()
    } else {
        outgoing
            .into_iter()
            .map(|edge| build_tree(graph, &edge.to, Some(edge), names, expanded))
            .collect()
    };

    TreeNode {
        entity: entity.clone(),
        name: name_of(names, entity),
        dependency_id: via.map(|edge| edge.id.clone()),
        kind: via.map(|edge| edge.kind),
        repeated,
        dependencies,
    }
}
