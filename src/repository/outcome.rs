//! Results of repository method invocations

use crate::core::field::FieldValue;
use crate::query::page::Page;

/// What an invoked repository method produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Entity(Option<T>),
    Entities(Vec<T>),
    Page(Page<T>),
    /// Projected attribute values
    Values(Vec<FieldValue>),
    ValuePage(Page<FieldValue>),
    Count(u64),
    Exists(bool),
    /// Rows touched by a bulk update or delete
    Affected(u64),
    Unit,
}

impl<T> Outcome<T> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Outcome::Entity(_) => "an entity",
            Outcome::Entities(_) => "a collection",
            Outcome::Page(_) => "a page",
            Outcome::Values(_) => "a list of values",
            Outcome::ValuePage(_) => "a page of values",
            Outcome::Count(_) => "a count",
            Outcome::Exists(_) => "an existence flag",
            Outcome::Affected(_) => "an affected row count",
            Outcome::Unit => "nothing",
        }
    }

    pub fn into_entity(self) -> Option<Option<T>> {
        match self {
            Outcome::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Entities of a collection or page outcome
    pub fn into_entities(self) -> Option<Vec<T>> {
        match self {
            Outcome::Entities(entities) => Some(entities),
            Outcome::Page(page) => Some(page.into_content()),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<Page<T>> {
        match self {
            Outcome::Page(page) => Some(page),
            _ => None,
        }
    }

    /// Values of a projection, paged or not
    pub fn into_values(self) -> Option<Vec<FieldValue>> {
        match self {
            Outcome::Values(values) => Some(values),
            Outcome::ValuePage(page) => Some(page.into_content()),
            _ => None,
        }
    }

    pub fn into_value_page(self) -> Option<Page<FieldValue>> {
        match self {
            Outcome::ValuePage(page) => Some(page),
            _ => None,
        }
    }

    /// A count or affected row count
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Outcome::Count(n) | Outcome::Affected(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_exists(&self) -> Option<bool> {
        match self {
            Outcome::Exists(flag) => Some(*flag),
            _ => None,
        }
    }
}
