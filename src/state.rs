//! List-shaped state reconciliation for pushed domain events.
//!
//! Screens hold their entities in an [`EntityList`] and wire its three
//! update operations into the handler factories. All operations key on the
//! entity id; list order is receipt order, never a sort key.

use crate::types::{ActionItem, Identified, Thought};

/// Authoritative entity list for one screen, keyed by entity id.
#[derive(Clone, Debug)]
pub struct EntityList<T: Identified> {
    items: Vec<T>,
}

impl<T: Identified> Default for EntityList<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ThoughtList = EntityList<Thought>;
pub type ActionItemList = EntityList<ActionItem>;

impl<T: Identified> EntityList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append `entity` unless an entity with the same id is already present.
    /// Idempotent against duplicate delivery.
    pub fn create(&mut self, entity: T) {
        if self.contains(entity.entity_id()) {
            return;
        }
        self.items.push(entity);
    }

    /// Replace the entity with the matching id, preserving its list
    /// position. An update for an unknown id is dropped, not inserted:
    /// an upsert here would resurrect entities a racing delete removed.
    pub fn update(&mut self, entity: T) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|e| e.entity_id() == entity.entity_id())
        {
            *existing = entity;
        }
    }

    /// Remove the entity with the matching id; no-op if absent.
    pub fn delete(&mut self, entity: &T) {
        self.delete_by_id(entity.entity_id());
    }

    pub fn delete_by_id(&mut self, id: &str) {
        self.items.retain(|e| e.entity_id() != id);
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|e| e.entity_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|e| e.entity_id() == id)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
