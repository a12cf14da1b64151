//! Entity attribute metadata
//!
//! Metadata is declared once per entity type when a repository is registered
//! and is static afterwards. The method-name parser and the explicit query
//! parser resolve every property expression against it.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the identity attribute every entity exposes
pub const ID_ATTRIBUTE: &str = "id";

/// Cardinality of a reference attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one referenced entity (e.g. `manager`)
    ToOne,
    /// Any number of referenced entities (e.g. `colleagues`)
    ToMany,
}

/// What an attribute holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// A comparable scalar surfaced as a [`FieldValue`](crate::core::FieldValue)
    Scalar,
    /// A reference to other entities of type `target`
    Reference {
        target: String,
        cardinality: Cardinality,
    },
}

/// A single declared attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMetadata {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeMetadata {
    /// Whether the attribute can be traversed
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, AttributeKind::Reference { .. })
    }

    /// Target entity type for references
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Reference { target, .. } => Some(target),
            AttributeKind::Scalar => None,
        }
    }
}

/// Declared attributes of one entity type
///
/// Lookups are case-insensitive and ignore underscores, so `EmailAddress`
/// (from a method name) resolves `email_address` (the declared attribute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    entity_type: String,
    attributes: IndexMap<String, AttributeMetadata>,
}

impl EntityMetadata {
    /// Start declaring an entity type. The `id` attribute is always present.
    pub fn builder(entity_type: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            metadata: EntityMetadata {
                entity_type: entity_type.into(),
                attributes: IndexMap::new(),
            },
        }
        .scalar(ID_ATTRIBUTE)
    }

    /// The entity type name (e.g., "User")
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Look up an attribute by name, ignoring case and underscores
    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.get(&normalize(name))
    }

    /// All declared attributes in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.values()
    }

    /// Declared reference attributes in declaration order
    pub fn references(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.values().filter(|a| a.is_reference())
    }
}

/// Builder for [`EntityMetadata`]
pub struct EntityMetadataBuilder {
    metadata: EntityMetadata,
}

impl EntityMetadataBuilder {
    /// Declare a scalar attribute
    pub fn scalar(self, name: &str) -> Self {
        self.attribute(name, AttributeKind::Scalar)
    }

    /// Declare a to-one reference to `target`
    pub fn to_one(self, name: &str, target: &str) -> Self {
        self.attribute(
            name,
            AttributeKind::Reference {
                target: target.to_string(),
                cardinality: Cardinality::ToOne,
            },
        )
    }

    /// Declare a to-many reference to `target`
    pub fn to_many(self, name: &str, target: &str) -> Self {
        self.attribute(
            name,
            AttributeKind::Reference {
                target: target.to_string(),
                cardinality: Cardinality::ToMany,
            },
        )
    }

    fn attribute(mut self, name: &str, kind: AttributeKind) -> Self {
        self.metadata.attributes.insert(
            normalize(name),
            AttributeMetadata {
                name: name.to_string(),
                kind,
            },
        );
        self
    }

    pub fn build(self) -> EntityMetadata {
        self.metadata
    }
}

/// Metadata for every entity type reachable from a repository
///
/// Traversal through a reference looks up the target type here.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    entities: HashMap<String, Arc<EntityMetadata>>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the metadata of an entity type
    pub fn register(&mut self, metadata: EntityMetadata) -> Arc<EntityMetadata> {
        let metadata = Arc::new(metadata);
        self.entities
            .insert(metadata.entity_type().to_string(), Arc::clone(&metadata));
        metadata
    }

    pub fn get(&self, entity_type: &str) -> Option<&Arc<EntityMetadata>> {
        self.entities.get(entity_type)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> EntityMetadata {
        EntityMetadata::builder("User")
            .scalar("firstname")
            .scalar("email_address")
            .to_one("manager", "User")
            .to_many("colleagues", "User")
            .build()
    }

    #[test]
    fn test_id_is_always_declared() {
        let meta = EntityMetadata::builder("Empty").build();
        assert!(meta.attribute("id").is_some());
        assert_eq!(meta.attributes().count(), 1);
    }

    #[test]
    fn test_lookup_ignores_case_and_underscores() {
        let meta = user();
        assert_eq!(
            meta.attribute("EmailAddress").map(|a| a.name.as_str()),
            Some("email_address")
        );
        assert!(meta.attribute("FIRSTNAME").is_some());
        assert!(meta.attribute("lastname").is_none());
    }

    #[test]
    fn test_references() {
        let meta = user();
        let refs: Vec<&str> = meta.references().map(|a| a.name.as_str()).collect();
        assert_eq!(refs, vec!["manager", "colleagues"]);
        assert_eq!(meta.attribute("manager").and_then(|a| a.target()), Some("User"));
    }

    #[test]
    fn test_catalog_register() {
        let mut catalog = MetadataCatalog::new();
        assert!(catalog.is_empty());
        catalog.register(user());
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("User").is_some());
        assert!(catalog.get("Role").is_none());
    }
}
