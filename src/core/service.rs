//! Service trait for the persistence collaborator a repository delegates to

use crate::core::entity::Entity;
use crate::core::field::FieldValue;
use crate::query::page::QueryWindow;
use crate::query::predicate::{Predicate, PropertyPath};
use crate::query::sort::{Direction, Sort};
use anyhow::Result;
use uuid::Uuid;

/// A fully bound row query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// `None` selects every row
    pub predicate: Option<Predicate>,
    pub sort: Sort,
    /// `None` returns every matching row
    pub window: Option<QueryWindow>,
    /// Drop rows with an identity already returned
    pub distinct: bool,
}

impl SelectQuery {
    pub fn new(predicate: Option<Predicate>) -> Self {
        Self {
            predicate,
            ..Self::default()
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn windowed(mut self, window: Option<QueryWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// Values of one attribute across the matching rows
///
/// A grouped projection returns each distinct value once, in first-seen
/// order unless `direction` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionQuery {
    pub path: PropertyPath,
    pub predicate: Option<Predicate>,
    pub grouped: bool,
    pub direction: Option<Direction>,
    pub window: Option<QueryWindow>,
}

impl ProjectionQuery {
    pub fn new(path: PropertyPath, predicate: Option<Predicate>) -> Self {
        Self {
            path,
            predicate,
            grouped: false,
            direction: None,
            window: None,
        }
    }

    pub fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }

    pub fn ordered(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn windowed(mut self, window: Option<QueryWindow>) -> Self {
        self.window = window;
        self
    }
}

/// Attribute assignments applied by a bulk update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    assignments: Vec<(String, FieldValue)>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assignment; a later assignment to the same attribute wins
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.assignments.push((attribute.into(), value.into()));
        self
    }

    pub fn assignments(&self) -> &[(String, FieldValue)] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Apply every assignment to an entity
    pub fn apply<T: Entity>(&self, entity: &mut T) -> Result<()> {
        for (attribute, value) in &self.assignments {
            entity.set_field_value(attribute, value.clone())?;
        }
        Ok(())
    }
}

/// Persistence collaborator for one entity type
///
/// Implementations own the stored entities and execute fully bound
/// queries. Repositories never touch storage directly. Failures are
/// reported as `anyhow::Error` and passed to the caller unchanged.
pub trait PersistenceService<T: Entity>: Send + Sync {
    /// Insert or replace an entity
    fn save(&self, entity: T) -> Result<T>;

    /// Get an entity by ID
    fn find_by_id(&self, id: &Uuid) -> Result<Option<T>>;

    /// Delete an entity; deleting an unknown entity is a no-op
    fn delete(&self, entity: &T) -> Result<()> {
        self.delete_by_id(&entity.id())
    }

    /// Delete an entity by ID; deleting an unknown ID is a no-op
    fn delete_by_id(&self, id: &Uuid) -> Result<()>;

    /// Rows matching the query, in query order
    fn execute_query(&self, query: &SelectQuery) -> Result<Vec<T>>;

    /// Number of rows matching the predicate (all rows for `None`)
    fn execute_count(&self, predicate: Option<&Predicate>) -> Result<u64>;

    /// Projected values in query order, windowed
    fn execute_projection(&self, query: &ProjectionQuery) -> Result<Vec<FieldValue>>;

    /// Number of projected values before windowing; counts groups when
    /// the projection is grouped
    fn execute_projection_count(&self, query: &ProjectionQuery) -> Result<u64>;

    /// Apply a mutation to every matching row without loading it for the
    /// caller; returns the affected row count
    fn execute_bulk_update(&self, predicate: Option<&Predicate>, mutation: &Mutation)
    -> Result<u64>;

    /// Remove every matching row; returns the affected row count
    fn execute_bulk_delete(&self, predicate: Option<&Predicate>) -> Result<u64>;

    /// Push pending changes to the store
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
