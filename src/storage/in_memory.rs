//! In-memory implementation of PersistenceService for testing and development

use crate::core::entity::{Attributes, Entity, EntityLookup, EntityResolver, Resolved};
use crate::core::field::FieldValue;
use crate::core::metadata::EntityMetadata;
use crate::core::service::{Mutation, PersistenceService, ProjectionQuery, SelectQuery};
use crate::query::eval::{Matcher, terminal_values};
use crate::query::predicate::{Predicate, PropertyPath};
use crate::query::sort::{Direction, Sort};
use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory persistence service
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Insertion order is the order of unsorted queries.
///
/// References to entities of another type resolve through stores linked
/// with [`with_linked`](Self::with_linked). Saving an entity that references
/// an unsaved entity fails; nothing is cascaded.
pub struct InMemoryDataService<T: Entity> {
    entities: Arc<RwLock<IndexMap<Uuid, T>>>,
    metadata: Arc<EntityMetadata>,
    linked: Vec<Arc<dyn EntityLookup>>,
}

impl<T: Entity> Clone for InMemoryDataService<T> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
            metadata: Arc::clone(&self.metadata),
            linked: self.linked.clone(),
        }
    }
}

impl<T: Entity> InMemoryDataService<T> {
    /// Create a new, empty in-memory service
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(IndexMap::new())),
            metadata: Arc::new(T::metadata()),
            linked: Vec::new(),
        }
    }

    /// Resolve references to another entity type through `lookup`
    pub fn with_linked(mut self, lookup: Arc<dyn EntityLookup>) -> Self {
        self.linked.push(lookup);
        self
    }

    /// Number of stored entities
    pub fn len(&self) -> Result<usize> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(entities.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn resolver<'a>(&'a self, rows: &'a IndexMap<Uuid, T>) -> StoreResolver<'a, T> {
        StoreResolver {
            rows,
            linked: &self.linked,
        }
    }

    /// Ids of rows matching `predicate`, in storage order
    fn matching_ids(&self, rows: &IndexMap<Uuid, T>, predicate: Option<&Predicate>) -> Result<Vec<Uuid>> {
        let resolver = self.resolver(rows);
        let matcher = predicate.map(Matcher::compile).transpose()?;
        Ok(rows
            .values()
            .filter(|entity| {
                matcher
                    .as_ref()
                    .is_none_or(|m| m.matches(*entity, &resolver))
            })
            .map(Entity::id)
            .collect())
    }

    /// Reject references to entities that were never saved
    fn check_references(&self, rows: &IndexMap<Uuid, T>, entity: &T) -> Result<()> {
        for reference in self.metadata.references() {
            let Some(target) = reference.target() else {
                continue;
            };
            let ids = entity.references(&reference.name).unwrap_or_default();
            for id in ids {
                let known = if target == T::entity_type() {
                    id == entity.id() || rows.contains_key(&id)
                } else {
                    match self.linked.iter().find(|l| l.entity_type() == target) {
                        Some(lookup) => lookup.contains(id),
                        None => {
                            tracing::trace!(target_type = %target, "No linked store, reference not checked");
                            true
                        }
                    }
                };
                if !known {
                    return Err(anyhow!(
                        "{} {} references an unsaved {} ({}) through '{}'",
                        T::entity_type(),
                        entity.id(),
                        target,
                        id,
                        reference.name
                    ));
                }
            }
        }
        Ok(())
    }

    fn sort_rows<'a>(&self, rows: &'a IndexMap<Uuid, T>, selected: Vec<&'a T>, sort: &Sort) -> Vec<&'a T> {
        if sort.is_unsorted() {
            return selected;
        }

        let resolver = self.resolver(rows);
        let paths: Vec<(PropertyPath, Direction, bool)> = sort
            .orders()
            .iter()
            .map(|o| (PropertyPath::dotted(&o.property), o.direction, o.ignore_case))
            .collect();

        let mut keyed: Vec<(Vec<FieldValue>, &T)> = selected
            .into_iter()
            .map(|entity| {
                let keys = paths
                    .iter()
                    .map(|(path, _, ignore_case)| {
                        let value = terminal_values(path, entity, &resolver)
                            .into_iter()
                            .next()
                            .unwrap_or(FieldValue::Null);
                        if *ignore_case {
                            value.to_lowercase()
                        } else {
                            value
                        }
                    })
                    .collect();
                (keys, entity)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            paths
                .iter()
                .zip(a.iter().zip(b.iter()))
                .map(|((_, direction, _), (x, y))| match direction {
                    Direction::Asc => x.sort_cmp(y),
                    Direction::Desc => y.sort_cmp(x),
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        keyed.into_iter().map(|(_, entity)| entity).collect()
    }

    /// Projected values of every matching row, before windowing
    fn project(&self, rows: &IndexMap<Uuid, T>, query: &ProjectionQuery) -> Result<Vec<FieldValue>> {
        let resolver = self.resolver(rows);
        let mut values: Vec<FieldValue> = self
            .matching_ids(rows, query.predicate.as_ref())?
            .iter()
            .filter_map(|id| rows.get(id))
            .flat_map(|entity| terminal_values(&query.path, entity, &resolver))
            .collect();

        if query.grouped {
            let mut groups: Vec<FieldValue> = Vec::with_capacity(values.len());
            for value in values {
                if !groups.contains(&value) {
                    groups.push(value);
                }
            }
            values = groups;
        }

        match query.direction {
            Some(Direction::Asc) => values.sort_by(|a, b| a.sort_cmp(b)),
            Some(Direction::Desc) => values.sort_by(|a, b| b.sort_cmp(a)),
            None => {}
        }
        Ok(values)
    }
}

impl<T: Entity> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> PersistenceService<T> for InMemoryDataService<T> {
    fn save(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        self.check_references(&entities, &entity)?;
        entities.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    fn find_by_id(&self, id: &Uuid) -> Result<Option<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.get(id).cloned())
    }

    fn delete_by_id(&self, id: &Uuid) -> Result<()> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities.shift_remove(id);

        Ok(())
    }

    fn execute_query(&self, query: &SelectQuery) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        // Rows are keyed by identity, so every result is already distinct.
        let selected: Vec<&T> = self
            .matching_ids(&entities, query.predicate.as_ref())?
            .iter()
            .filter_map(|id| entities.get(id))
            .collect();
        let sorted = self.sort_rows(&entities, selected, &query.sort);
        let window = query.window.unwrap_or_default();

        Ok(window.apply(sorted).into_iter().cloned().collect())
    }

    fn execute_count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(self.matching_ids(&entities, predicate)?.len() as u64)
    }

    fn execute_projection(&self, query: &ProjectionQuery) -> Result<Vec<FieldValue>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let values = self.project(&entities, query)?;
        Ok(query.window.unwrap_or_default().apply(values))
    }

    fn execute_projection_count(&self, query: &ProjectionQuery) -> Result<u64> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(self.project(&entities, query)?.len() as u64)
    }

    fn execute_bulk_update(&self, predicate: Option<&Predicate>, mutation: &Mutation) -> Result<u64> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let ids = self.matching_ids(&entities, predicate)?;
        let mut updated = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(entity) = entities.get(id) {
                let mut entity = entity.clone();
                mutation.apply(&mut entity)?;
                updated.push(entity);
            }
        }

        let affected = updated.len() as u64;
        for entity in updated {
            entities.insert(entity.id(), entity);
        }

        Ok(affected)
    }

    fn execute_bulk_delete(&self, predicate: Option<&Predicate>) -> Result<u64> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let ids = self.matching_ids(&entities, predicate)?;
        for id in &ids {
            entities.shift_remove(id);
        }

        Ok(ids.len() as u64)
    }
}

impl<T: Entity> EntityLookup for InMemoryDataService<T> {
    fn entity_type(&self) -> &str {
        T::entity_type()
    }

    fn lookup(&self, id: Uuid) -> Option<Box<dyn Attributes>> {
        let entities = self.entities.read().ok()?;
        entities
            .get(&id)
            .cloned()
            .map(|entity| Box::new(entity) as Box<dyn Attributes>)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.entities
            .read()
            .map(|entities| entities.contains_key(&id))
            .unwrap_or(false)
    }
}

/// Resolves references against the locked rows first, then linked stores
struct StoreResolver<'a, T: Entity> {
    rows: &'a IndexMap<Uuid, T>,
    linked: &'a [Arc<dyn EntityLookup>],
}

impl<T: Entity> EntityResolver for StoreResolver<'_, T> {
    fn resolve(&self, id: Uuid) -> Option<Resolved<'_>> {
        if let Some(entity) = self.rows.get(&id) {
            return Some(Resolved::Borrowed(entity));
        }
        self.linked
            .iter()
            .find_map(|lookup| lookup.lookup(id))
            .map(Resolved::Owned)
    }
}
