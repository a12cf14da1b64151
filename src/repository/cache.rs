//! Parsed method template cache
//!
//! Templates are parsed on first use and kept for the life of the cache.
//! Parse failures are cached too, so a broken method fails the same way on
//! every call. Concurrent first calls may parse redundantly; the first
//! entry stored wins and every caller sees it.

use crate::core::error::ParseError;
use crate::query::parser::MethodTemplate;
use crate::repository::method::MethodSignature;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

pub type CachedTemplate = Result<Arc<MethodTemplate>, ParseError>;

/// Cache key: the entity type plus the full method signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub entity_type: String,
    pub signature: MethodSignature,
}

impl TemplateKey {
    pub fn new(entity_type: impl Into<String>, signature: MethodSignature) -> Self {
        Self {
            entity_type: entity_type.into(),
            signature,
        }
    }
}

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<TemplateKey, CachedTemplate>>,
    parses: AtomicUsize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<TemplateCache> {
        static GLOBAL: OnceLock<Arc<TemplateCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TemplateCache::new())))
    }

    /// Return the cached template for `key`, parsing it on a miss
    pub fn get_or_parse(
        &self,
        key: &TemplateKey,
        parse: impl FnOnce() -> CachedTemplate,
    ) -> CachedTemplate {
        if let Some(cached) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            tracing::trace!(method = %key.signature.name(), "Template cache hit");
            return cached.clone();
        }

        let parsed = parse();
        self.parses.fetch_add(1, Ordering::Relaxed);

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert(parsed)
            .clone()
    }

    /// Whether `key` has been parsed already
    pub fn contains(&self, key: &TemplateKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parses performed, redundant ones included
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}
