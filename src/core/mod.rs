//! Core module containing fundamental traits and types for the engine

pub mod entity;
pub mod error;
pub mod field;
pub mod metadata;
pub mod service;

pub use entity::{Attributes, Entity, EntityLookup, EntityResolver, NoReferences, Resolved};
pub use error::{ParseError, RepositoryError, RepositoryResult};
pub use field::{FieldValue, FromFieldValue};
pub use metadata::{
    AttributeKind, AttributeMetadata, Cardinality, EntityMetadata, EntityMetadataBuilder,
    ID_ATTRIBUTE, MetadataCatalog,
};
pub use service::{Mutation, PersistenceService, ProjectionQuery, SelectQuery};
