//! # Finder
//!
//! A repository engine that turns declarative method names into executable
//! queries over entity stores.
//!
//! ## Features
//!
//! - **Derived Queries**: `findByLastnameAndFirstnameOrderByAgeDesc` parsed into a predicate tree
//! - **Property Traversal**: `findByManagerLastname` follows references between entity types
//! - **Specifications**: Composable filters combined with `and`, `or` and `not`
//! - **Paging and Sorting**: Page requests with totals, merged with method-name ordering
//! - **Explicit Queries**: Query text with positional or named parameters, also via YAML config
//! - **Template Cache**: Each method name is parsed once and shared across threads
//! - **Pluggable Persistence**: Any [`PersistenceService`](core::PersistenceService) backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finder::prelude::*;
//!
//! impl_entity!(
//!     User,
//!     "User",
//!     { firstname: Option<String>, lastname: Option<String> },
//!     to_one { manager => "User" },
//! );
//!
//! let users = Repository::builder(Arc::new(InMemoryDataService::<User>::new()))
//!     .method(MethodSignature::collection("findByLastname").param("lastname"))
//!     .method(MethodSignature::collection("findByManagerLastname").param("lastname"))
//!     .build()?;
//!
//! users.save(User::new(Some("Oliver".into()), Some("Gierke".into())))?;
//! let gierkes = users.invoke_list("findByLastname", &args!["Gierke"])?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod query;
pub mod repository;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        entity::{Attributes, Entity, EntityLookup},
        error::{ParseError, RepositoryError, RepositoryResult},
        field::{FieldValue, FromFieldValue},
        metadata::{EntityMetadata, MetadataCatalog},
        service::{Mutation, PersistenceService, ProjectionQuery, SelectQuery},
    };

    // === Macros ===
    pub use crate::{args, impl_entity};

    // === Query Model ===
    pub use crate::query::{
        Condition, Direction, Operand, Operator, Order, Page, PageRequest, PaginatedResponse,
        Predicate, PropertyPath, Sort, Specification,
        explicit::ParamBindingMode,
    };

    // === Repository ===
    pub use crate::repository::{
        Argument, ExecutionPlan, MethodSignature, Outcome, PlanAction, Repository,
        RepositoryDefinition, ReturnShape,
    };

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryDataService;

    // === Config ===
    pub use crate::config::{BulkDeleteMode, CacheScope, RepositoryConfig};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
