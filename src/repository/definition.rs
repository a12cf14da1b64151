//! Repository registration
//!
//! Every operation a repository offers is declared once, up front, and
//! resolved into one of three kinds:
//! - derived from its method name
//! - explicit query text (declared here or as a named query in config)
//! - custom code

use crate::config::{CacheScope, RepositoryConfig};
use crate::core::entity::Entity;
use crate::core::error::{RepositoryError, RepositoryResult};
use crate::core::metadata::{EntityMetadata, MetadataCatalog};
use crate::core::service::PersistenceService;
use crate::query::explicit::{ExplicitQuery, ParamBindingMode};
use crate::repository::Repository;
use crate::repository::argument::Argument;
use crate::repository::cache::TemplateCache;
use crate::repository::method::MethodSignature;
use crate::repository::outcome::Outcome;
use indexmap::IndexMap;
use std::sync::Arc;

/// Hand-written implementation of a repository method
pub type CustomHandler<T> = Arc<
    dyn Fn(&dyn PersistenceService<T>, &[Argument]) -> RepositoryResult<Outcome<T>> + Send + Sync,
>;

/// How a registered method is executed
pub enum Operation<T> {
    /// Parsed from the method name on first use
    Derived,
    Explicit(Arc<ExplicitQuery>),
    Custom(CustomHandler<T>),
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        match self {
            Operation::Derived => Operation::Derived,
            Operation::Explicit(query) => Operation::Explicit(Arc::clone(query)),
            Operation::Custom(handler) => Operation::Custom(Arc::clone(handler)),
        }
    }
}

impl<T> std::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Derived => f.write_str("Derived"),
            Operation::Explicit(query) => f.debug_tuple("Explicit").field(&query.text()).finish(),
            Operation::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredMethod<T> {
    pub signature: MethodSignature,
    pub operation: Operation<T>,
}

enum Declared<T> {
    Derived,
    Query {
        text: String,
        binding: ParamBindingMode,
    },
    Custom(CustomHandler<T>),
}

/// Builder collecting the operations of a [`Repository`]
///
/// ```rust,ignore
/// let users = Repository::builder(Arc::new(InMemoryDataService::<User>::new()))
///     .method(MethodSignature::collection("findByLastname").param("lastname"))
///     .query(
///         MethodSignature::modifying("renameAllUsersTo").param("lastname"),
///         "update set lastname = ?1",
///         ParamBindingMode::Positional,
///     )
///     .build()?;
/// ```
pub struct RepositoryDefinition<T: Entity> {
    service: Arc<dyn PersistenceService<T>>,
    catalog: MetadataCatalog,
    config: RepositoryConfig,
    methods: IndexMap<String, (MethodSignature, Declared<T>)>,
    duplicates: Vec<String>,
}

impl<T: Entity> RepositoryDefinition<T> {
    pub fn new(service: Arc<dyn PersistenceService<T>>) -> Self {
        Self {
            service,
            catalog: MetadataCatalog::new(),
            config: RepositoryConfig::default(),
            methods: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Make another entity type available for traversal
    pub fn entity(mut self, metadata: EntityMetadata) -> Self {
        self.catalog.register(metadata);
        self
    }

    /// Use a prepared catalog; the repository's own type is added on build
    pub fn catalog(mut self, catalog: MetadataCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare a method whose query is derived from its name
    pub fn method(self, signature: MethodSignature) -> Self {
        self.declare(signature, Declared::Derived)
    }

    /// Declare a method backed by explicit query text
    pub fn query(self, signature: MethodSignature, text: &str, binding: ParamBindingMode) -> Self {
        self.declare(
            signature,
            Declared::Query {
                text: text.to_string(),
                binding,
            },
        )
    }

    /// Declare a method implemented by custom code
    pub fn custom<F>(self, signature: MethodSignature, handler: F) -> Self
    where
        F: Fn(&dyn PersistenceService<T>, &[Argument]) -> RepositoryResult<Outcome<T>>
            + Send
            + Sync
            + 'static,
    {
        self.declare(signature, Declared::Custom(Arc::new(handler)))
    }

    fn declare(mut self, signature: MethodSignature, declared: Declared<T>) -> Self {
        let name = signature.name().to_string();
        if self
            .methods
            .insert(name.clone(), (signature, declared))
            .is_some()
        {
            self.duplicates.push(name);
        }
        self
    }

    /// Resolve every declared operation and build the repository
    ///
    /// Explicit queries are parsed here. Derived methods are parsed on
    /// first use unless `strict` is set.
    pub fn build(self) -> RepositoryResult<Repository<T>> {
        if let Some(name) = self.duplicates.first() {
            return Err(RepositoryError::Config(format!(
                "Method '{}' is declared more than once",
                name
            )));
        }
        self.config
            .validate()
            .map_err(|e| RepositoryError::Config(e.to_string()))?;

        let entity_type = T::entity_type();
        let mut catalog = self.catalog;
        let root = catalog.register(T::metadata());
        let catalog = Arc::new(catalog);
        let config = self.config;

        let mut operations = IndexMap::with_capacity(self.methods.len());
        for (name, (signature, declared)) in self.methods {
            signature.validate().map_err(RepositoryError::Config)?;

            let declared = match (config.named_query(entity_type, &name), declared) {
                (Some(named), Declared::Derived) => Declared::Query {
                    text: named.query.clone(),
                    binding: named.binding,
                },
                (_, declared) => declared,
            };

            let operation = match declared {
                Declared::Derived => Operation::Derived,
                Declared::Query { text, binding } => {
                    let query = ExplicitQuery::parse(
                        &name,
                        &text,
                        binding,
                        &signature.value_names(),
                        &root,
                        &catalog,
                    )?;
                    if query.arity() > signature.value_count() {
                        return Err(RepositoryError::Config(format!(
                            "Query for '{}' binds {} parameter(s) but the method declares {}",
                            name,
                            query.arity(),
                            signature.value_count()
                        )));
                    }
                    Operation::Explicit(Arc::new(query))
                }
                Declared::Custom(handler) => Operation::Custom(handler),
            };

            operations.insert(
                name,
                RegisteredMethod {
                    signature,
                    operation,
                },
            );
        }

        if let Some((method, _)) = config
            .named_queries_for(entity_type)
            .find(|(method, _)| !operations.contains_key(*method))
        {
            return Err(RepositoryError::Config(format!(
                "Named query '{}.{}' has no declared method",
                entity_type, method
            )));
        }

        let cache = match config.template_cache {
            CacheScope::Global => TemplateCache::global(),
            CacheScope::Repository => Arc::new(TemplateCache::new()),
        };

        let repository = Repository {
            service: self.service,
            root,
            catalog,
            config,
            cache,
            operations: Arc::new(operations),
        };

        if repository.config.strict {
            repository.validate()?;
        }

        Ok(repository)
    }
}
