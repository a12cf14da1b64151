//! Configuration loading and management

use crate::query::explicit::ParamBindingMode;
use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How `deleteBy…` methods and batch deletes remove rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkDeleteMode {
    /// One bulk statement against the store
    #[default]
    Direct,
    /// Load the matching entities and delete them one by one, letting the
    /// store apply its per-entity delete rules
    PerEntity,
}

/// Where parsed method templates are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// One process-wide cache shared by every repository
    #[default]
    Global,
    /// A cache owned by the repository
    Repository,
}

/// Query text registered under a method name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQuery {
    pub query: String,

    #[serde(default)]
    pub binding: ParamBindingMode,
}

/// Repository configuration
///
/// ```yaml
/// strict: true
/// bulk_delete: per_entity
/// template_cache: global
/// max_page_size: 100
/// named_queries:
///   User.findByNamedQuery:
///     query: "where lastname = ?1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Parse every derived method when the repository is built
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub bulk_delete: BulkDeleteMode,

    #[serde(default)]
    pub template_cache: CacheScope,

    /// Explicit queries keyed by `<Entity>.<method>`
    #[serde(default)]
    pub named_queries: IndexMap<String, NamedQuery>,

    /// Upper bound applied to requested page sizes
    #[serde(default)]
    pub max_page_size: Option<usize>,
}

impl RepositoryConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == Some(0) {
            bail!("max_page_size must be at least 1");
        }
        if let Some(key) = self.named_queries.keys().find(|k| split_key(k).is_none()) {
            bail!("Named query key '{}' must have the form <Entity>.<method>", key);
        }
        Ok(())
    }

    /// The named query registered for a method, if any
    pub fn named_query(&self, entity_type: &str, method: &str) -> Option<&NamedQuery> {
        self.named_queries
            .iter()
            .find(|(key, _)| split_key(key) == Some((entity_type, method)))
            .map(|(_, query)| query)
    }

    /// Named queries declared for one entity type, as (method, query)
    pub fn named_queries_for<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a NamedQuery)> + 'a {
        self.named_queries.iter().filter_map(move |(key, query)| {
            split_key(key)
                .filter(|(entity, _)| *entity == entity_type)
                .map(|(_, method)| (method, query))
        })
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_bulk_delete(mut self, mode: BulkDeleteMode) -> Self {
        self.bulk_delete = mode;
        self
    }

    pub fn with_template_cache(mut self, scope: CacheScope) -> Self {
        self.template_cache = scope;
        self
    }

    pub fn with_named_query(
        mut self,
        entity_type: &str,
        method: &str,
        query: &str,
        binding: ParamBindingMode,
    ) -> Self {
        self.named_queries.insert(
            format!("{entity_type}.{method}"),
            NamedQuery {
                query: query.to_string(),
                binding,
            },
        );
        self
    }

    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = Some(max);
        self
    }
}

fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('.')
        .filter(|(entity, method)| !entity.is_empty() && !method.is_empty())
}
