//! Entity traits defining the core abstraction for all stored types

use crate::core::field::FieldValue;
use crate::core::metadata::{EntityMetadata, ID_ATTRIBUTE};
use anyhow::{Result, anyhow};
use uuid::Uuid;

/// Base trait for all entities managed by a repository.
///
/// Entities are owned by the persistence collaborator. The query engine only
/// reads them through this trait:
/// - `id`: stable identity
/// - `field_value`: dynamic access to scalar attributes
/// - `references`: identities held by reference attributes
///
/// `set_field_value` is only needed by backends that execute bulk updates in
/// memory.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The entity type name (e.g., "User")
    fn entity_type() -> &'static str;

    /// Declared attributes of this entity type
    fn metadata() -> EntityMetadata;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> Uuid;

    /// Get the value of a scalar attribute by its declared name
    ///
    /// Returns `None` for unknown attributes. A known attribute without a
    /// value should return `Some(FieldValue::Null)`.
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Get the identities held by a reference attribute
    ///
    /// A to-one reference yields zero or one id, a to-many reference any
    /// number.
    fn references(&self, _field: &str) -> Option<Vec<Uuid>> {
        None
    }

    /// Overwrite a scalar attribute
    fn set_field_value(&mut self, field: &str, _value: FieldValue) -> Result<()> {
        Err(anyhow!(
            "Entity type '{}' does not support updating '{}'",
            Self::entity_type(),
            field
        ))
    }
}

/// Object-safe view of an entity used while evaluating predicates
///
/// Implemented for every [`Entity`]; traversal through references hands out
/// related entities of other types through this trait.
pub trait Attributes {
    fn entity_id(&self) -> Uuid;

    /// Scalar attribute value, `id` included
    fn attribute_value(&self, name: &str) -> Option<FieldValue>;

    fn reference_ids(&self, name: &str) -> Option<Vec<Uuid>>;
}

impl<T: Entity> Attributes for T {
    fn entity_id(&self) -> Uuid {
        self.id()
    }

    fn attribute_value(&self, name: &str) -> Option<FieldValue> {
        if name == ID_ATTRIBUTE {
            return Some(FieldValue::Uuid(self.id()));
        }
        self.field_value(name)
    }

    fn reference_ids(&self, name: &str) -> Option<Vec<Uuid>> {
        self.references(name)
    }
}

/// An entity handed out by an [`EntityResolver`]
pub enum Resolved<'a> {
    /// Borrowed from the store being queried
    Borrowed(&'a dyn Attributes),
    /// Cloned out of another store
    Owned(Box<dyn Attributes>),
}

impl Resolved<'_> {
    pub fn get(&self) -> &dyn Attributes {
        match self {
            Resolved::Borrowed(entity) => *entity,
            Resolved::Owned(entity) => entity.as_ref(),
        }
    }
}

/// Resolves referenced identities to entities during evaluation
pub trait EntityResolver {
    fn resolve(&self, id: Uuid) -> Option<Resolved<'_>>;
}

/// A resolver that knows no entities; every traversal comes up empty
pub struct NoReferences;

impl EntityResolver for NoReferences {
    fn resolve(&self, _id: Uuid) -> Option<Resolved<'_>> {
        None
    }
}

/// Owned lookup into another store, used for cross-type references
pub trait EntityLookup: Send + Sync {
    /// The entity type this lookup serves
    fn entity_type(&self) -> &str;

    fn lookup(&self, id: Uuid) -> Option<Box<dyn Attributes>>;

    fn contains(&self, id: Uuid) -> bool {
        self.lookup(id).is_some()
    }
}
