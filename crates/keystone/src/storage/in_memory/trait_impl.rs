//! DependencyStore trait implementation for in-memory storage.

use super::InMemoryStorage;
use crate::domain::{DependencyEdge, DependencyId, DependencyKind, EntityRef, NewDependency};
use crate::error::{Error, Result};
use crate::storage::DependencyStore;
use async_trait::async_trait;
use chrono::Utc;
use petgraph::Direction;
use tracing::{debug, warn};

#[async_trait]
impl DependencyStore for InMemoryStorage {
    async fn insert(&self, new: NewDependency) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        // === Phase 1: Validation under the write lock (no mutations) ===
        inner.check_new_edge(&new.from, &new.to)?;

        // === Phase 2: ID generation ===
        let id = inner.generate_id(&new.from, &new.to, new.kind)?;

        // === Phase 3: Write ===
        let edge = DependencyEdge {
            id,
            from: new.from,
            to: new.to,
            kind: new.kind,
            created_at: Utc::now(),
        };
        inner.add_edge(edge.clone());

        debug!(id = %edge.id, edge = %edge, "Inserted dependency");
        Ok(edge)
    }

    async fn get(&self, id: &DependencyId) -> Result<Option<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner
            .edge_map
            .get(id)
            .and_then(|&index| inner.graph.edge_weight(index))
            .map(|stored| stored.edge.clone()))
    }

    async fn update_kind(
        &self,
        id: &DependencyId,
        kind: DependencyKind,
    ) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        let index = *inner
            .edge_map
            .get(id)
            .ok_or_else(|| Error::DependencyNotFound(id.clone()))?;
        let stored = inner
            .graph
            .edge_weight_mut(index)
            .ok_or_else(|| Error::DependencyNotFound(id.clone()))?;

        stored.edge.kind = kind;
        Ok(stored.edge.clone())
    }

    async fn delete(&self, id: &DependencyId) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;
        inner
            .remove_edge(id)
            .ok_or_else(|| Error::DependencyNotFound(id.clone()))
    }

    async fn delete_all_for_entity(&self, entity: &EntityRef) -> Result<usize> {
        let mut inner = self.lock().await;
        Ok(inner.remove_entity(entity))
    }

    async fn outgoing(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner.edges_directed(entity, Direction::Outgoing))
    }

    async fn incoming(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner.edges_directed(entity, Direction::Incoming))
    }

    async fn exists(&self, from: &EntityRef, to: &EntityRef) -> Result<bool> {
        let inner = self.lock().await;
        Ok(inner.find_edge(from, to).is_some())
    }

    async fn import_edges(&self, edges: Vec<DependencyEdge>) -> Result<usize> {
        let mut inner = self.lock().await;

        let mut imported = 0;
        for edge in edges {
            if inner.edge_map.contains_key(&edge.id) {
                warn!(id = %edge.id, "Skipping imported edge with duplicate ID");
                continue;
            }
            if let Err(rejection) = inner.check_new_edge(&edge.from, &edge.to) {
                // Skip edges that would break graph invariants
                // This provides resilience for hand-edited or merged data files
                warn!(id = %edge.id, reason = %rejection, "Skipping imported edge");
                continue;
            }
            inner.add_edge(edge);
            imported += 1;
        }

        Ok(imported)
    }

    async fn export_all(&self) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        Ok(inner.all_edges())
    }

    async fn save(&self) -> Result<()> {
        // In-memory storage doesn't persist to disk
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        // In-memory storage has no backing store to reload from
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{DependencyKind, EntityRef, EntityType, NewDependency};
    use crate::error::{Error, Rejection};
    use crate::storage::in_memory::new_in_memory_storage;

    fn dep(from: &str, to: &str) -> NewDependency {
        NewDependency::new(
            EntityRef::task(from),
            EntityRef::task(to),
            DependencyKind::FinishToStart,
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_self_dependency() {
        let storage = new_in_memory_storage("dep".to_string());
        let err = storage.insert(dep("A", "A")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Rejected(Rejection::SelfDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_cycle_atomically() {
        let storage = new_in_memory_storage("dep".to_string());
        storage.insert(dep("A", "B")).await.unwrap();
        storage.insert(dep("B", "C")).await.unwrap();

        let err = storage.insert(dep("C", "A")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Rejected(Rejection::CircularDependency { .. })
        ));
        assert_eq!(storage.export_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_regardless_of_kind() {
        let storage = new_in_memory_storage("dep".to_string());
        storage.insert(dep("A", "B")).await.unwrap();

        let mut again = dep("A", "B");
        again.kind = DependencyKind::StartToStart;
        let err = storage.insert(again).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::DuplicateEdge { .. })));
    }

    #[tokio::test]
    async fn test_outgoing_and_incoming_keep_insertion_order() {
        let storage = new_in_memory_storage("dep".to_string());
        storage.insert(dep("A", "B")).await.unwrap();
        storage.insert(dep("A", "C")).await.unwrap();
        storage.insert(dep("D", "C")).await.unwrap();

        let out: Vec<_> = storage
            .outgoing(&EntityRef::task("A"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.to.entity_id)
            .collect();
        assert_eq!(out, vec!["B", "C"]);

        let inc: Vec<_> = storage
            .incoming(&EntityRef::task("C"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.from.entity_id)
            .collect();
        assert_eq!(inc, vec!["A", "D"]);
    }

    #[tokio::test]
    async fn test_order_survives_index_reuse() {
        let storage = new_in_memory_storage("dep".to_string());
        let first = storage.insert(dep("A", "B")).await.unwrap();
        storage.insert(dep("A", "C")).await.unwrap();
        storage.delete(&first.id).await.unwrap();
        storage.insert(dep("A", "D")).await.unwrap();

        let out: Vec<_> = storage
            .outgoing(&EntityRef::task("A"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.to.entity_id)
            .collect();
        assert_eq!(out, vec!["C", "D"]);
    }

    #[tokio::test]
    async fn test_update_kind_in_place() {
        let storage = new_in_memory_storage("dep".to_string());
        let edge = storage.insert(dep("A", "B")).await.unwrap();

        let updated = storage
            .update_kind(&edge.id, DependencyKind::FinishToFinish)
            .await
            .unwrap();
        assert_eq!(updated.id, edge.id);
        assert_eq!(updated.kind, DependencyKind::FinishToFinish);
        assert_eq!(
            storage.get(&edge.id).await.unwrap().unwrap().kind,
            DependencyKind::FinishToFinish
        );
    }

    #[tokio::test]
    async fn test_delete_missing_edge() {
        let storage = new_in_memory_storage("dep".to_string());
        let err = storage.delete(&"dep-none".into()).await.unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_all_for_entity_removes_both_directions() {
        let storage = new_in_memory_storage("dep".to_string());
        storage.insert(dep("A", "B")).await.unwrap();
        storage.insert(dep("B", "C")).await.unwrap();
        storage.insert(dep("D", "C")).await.unwrap();

        let removed = storage
            .delete_all_for_entity(&EntityRef::task("B"))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = storage.export_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].from, EntityRef::task("D"));

        // Unknown entity is not an error
        let none = storage
            .delete_all_for_entity(&EntityRef::new(EntityType::Program, "X"))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_import_skips_invalid_edges() {
        let source = new_in_memory_storage("dep".to_string());
        source.insert(dep("A", "B")).await.unwrap();
        source.insert(dep("B", "C")).await.unwrap();
        let mut edges = source.export_all().await.unwrap();

        // Hand-crafted back edge closing a cycle
        let mut back = edges[0].clone();
        back.id = "dep-back".into();
        back.from = EntityRef::task("C");
        back.to = EntityRef::task("A");
        edges.push(back);

        let target = new_in_memory_storage("dep".to_string());
        let imported = target.import_edges(edges.clone()).await.unwrap();
        assert_eq!(imported, 2);

        // Importing the same IDs again is a no-op
        assert_eq!(target.import_edges(edges).await.unwrap(), 0);
    }
}
