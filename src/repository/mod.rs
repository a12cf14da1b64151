//! Repository facade
//!
//! A [`Repository`] offers the standard CRUD and specification surface for
//! one entity type plus every method declared on its
//! [`RepositoryDefinition`]. Declared methods are dispatched by name:
//!
//! ```rust,ignore
//! let users = Repository::builder(Arc::new(InMemoryDataService::<User>::new()))
//!     .method(MethodSignature::collection("findByLastname").param("lastname"))
//!     .method(MethodSignature::page("findByFirstname").param("firstname").page_param())
//!     .build()?;
//!
//! let gierkes = users.invoke_list("findByLastname", &args!["Gierke"])?;
//! let page = users.invoke_page("findByFirstname", &args!["Oliver", PageRequest::of(0, 10)?])?;
//! ```

pub mod argument;
pub mod cache;
pub mod definition;
pub mod method;
pub mod outcome;
pub mod plan;

pub use argument::Argument;
pub use cache::{TemplateCache, TemplateKey};
pub use definition::{CustomHandler, Operation, RegisteredMethod, RepositoryDefinition};
pub use method::{MethodSignature, ParamKind, Parameter, ReturnShape};
pub use outcome::Outcome;
pub use plan::{ExecutionPlan, PlanAction};

use crate::config::{BulkDeleteMode, RepositoryConfig};
use crate::core::entity::Entity;
use crate::core::error::{ParseError, RepositoryError, RepositoryResult};
use crate::core::field::FieldValue;
use crate::core::metadata::{EntityMetadata, ID_ATTRIBUTE, MetadataCatalog};
use crate::core::service::{PersistenceService, ProjectionQuery, SelectQuery};
use crate::query::page::{Page, PageRequest, QueryWindow};
use crate::query::parser::{MethodTemplate, PropertyResolver};
use crate::query::predicate::{Predicate, PropertyPath};
use crate::query::sort::{Direction, Order, Sort};
use crate::query::specification::Specification;
use indexmap::IndexMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for one entity type
pub struct Repository<T: Entity> {
    service: Arc<dyn PersistenceService<T>>,
    root: Arc<EntityMetadata>,
    catalog: Arc<MetadataCatalog>,
    config: RepositoryConfig,
    cache: Arc<TemplateCache>,
    operations: Arc<IndexMap<String, RegisteredMethod<T>>>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            root: Arc::clone(&self.root),
            catalog: Arc::clone(&self.catalog),
            config: self.config.clone(),
            cache: Arc::clone(&self.cache),
            operations: Arc::clone(&self.operations),
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn builder(service: Arc<dyn PersistenceService<T>>) -> RepositoryDefinition<T> {
        RepositoryDefinition::new(service)
    }

    pub fn service(&self) -> &Arc<dyn PersistenceService<T>> {
        &self.service
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.root
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn template_cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Signatures of all declared methods, in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.operations.values().map(|m| &m.signature)
    }

    /// Parse every derived method now instead of on first use
    pub fn validate(&self) -> RepositoryResult<()> {
        let mut derived = 0;
        for registered in self.operations.values() {
            if let Operation::Derived = registered.operation {
                self.template(&registered.signature)?;
                derived += 1;
            }
        }
        tracing::info!(
            entity_type = %T::entity_type(),
            methods = derived,
            "Validated derived repository methods"
        );
        Ok(())
    }

    // === CRUD ===

    pub fn save(&self, entity: T) -> RepositoryResult<T> {
        Ok(self.service.save(entity)?)
    }

    /// Save each entity in order; `None` saves nothing
    pub fn save_all(&self, entities: Option<Vec<T>>) -> RepositoryResult<Vec<T>> {
        entities
            .unwrap_or_default()
            .into_iter()
            .map(|entity| self.save(entity))
            .collect()
    }

    pub fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<T>> {
        Ok(self.service.find_by_id(id)?)
    }

    pub fn exists_by_id(&self, id: &Uuid) -> RepositoryResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    pub fn find_all(&self) -> RepositoryResult<Vec<T>> {
        Ok(self.service.execute_query(&SelectQuery::default())?)
    }

    pub fn find_all_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let predicate = id_predicate(ids.iter().copied());
        Ok(self
            .service
            .execute_query(&SelectQuery::new(Some(predicate)))?)
    }

    /// All entities in the given order; `None` is unsorted
    pub fn find_all_sorted(&self, sort: Option<&Sort>) -> RepositoryResult<Vec<T>> {
        self.find_all_by_spec_sorted(None, sort)
    }

    /// One page of all entities; `None` returns everything as a single page
    pub fn find_all_paged(&self, page: Option<&PageRequest>) -> RepositoryResult<Page<T>> {
        self.find_all_by_spec_paged(None, page)
    }

    pub fn count(&self) -> RepositoryResult<u64> {
        Ok(self.service.execute_count(None)?)
    }

    pub fn delete(&self, entity: &T) -> RepositoryResult<()> {
        Ok(self.service.delete(entity)?)
    }

    pub fn delete_by_id(&self, id: &Uuid) -> RepositoryResult<()> {
        Ok(self.service.delete_by_id(id)?)
    }

    /// Delete each entity one by one; `None` deletes nothing
    pub fn delete_entities(&self, entities: Option<&[T]>) -> RepositoryResult<()> {
        for entity in entities.unwrap_or_default() {
            self.delete(entity)?;
        }
        Ok(())
    }

    /// Delete the given entities with as few backend calls as possible
    ///
    /// `None` or an empty slice is a no-op.
    pub fn delete_in_batch(&self, entities: Option<&[T]>) -> RepositoryResult<()> {
        let entities = entities.unwrap_or_default();
        if entities.is_empty() {
            return Ok(());
        }
        match self.config.bulk_delete {
            BulkDeleteMode::Direct => {
                let predicate = id_predicate(entities.iter().map(|e| e.id()));
                let affected = self.service.execute_bulk_delete(Some(&predicate))?;
                tracing::debug!(requested = entities.len(), affected, "Batch delete");
                Ok(())
            }
            BulkDeleteMode::PerEntity => self.delete_entities(Some(entities)),
        }
    }

    /// Delete every entity one by one
    pub fn delete_all(&self) -> RepositoryResult<()> {
        let all = self.find_all()?;
        self.delete_entities(Some(&all))
    }

    /// Delete every entity in a single backend call
    pub fn delete_all_in_batch(&self) -> RepositoryResult<()> {
        self.service.execute_bulk_delete(None)?;
        Ok(())
    }

    pub fn flush(&self) -> RepositoryResult<()> {
        Ok(self.service.flush()?)
    }

    // === Specifications ===

    /// All entities satisfying `spec`; `None` matches everything
    pub fn find_all_by_spec(&self, spec: Option<&Specification>) -> RepositoryResult<Vec<T>> {
        self.find_all_by_spec_sorted(spec, None)
    }

    pub fn find_all_by_spec_sorted(
        &self,
        spec: Option<&Specification>,
        sort: Option<&Sort>,
    ) -> RepositoryResult<Vec<T>> {
        let predicate = self.spec_predicate("findAll", spec)?;
        let sort = match sort {
            Some(sort) => self.resolve_sort("findAll", sort)?,
            None => Sort::unsorted(),
        };
        Ok(self
            .service
            .execute_query(&SelectQuery::new(predicate).sorted(sort))?)
    }

    pub fn find_all_by_spec_paged(
        &self,
        spec: Option<&Specification>,
        page: Option<&PageRequest>,
    ) -> RepositoryResult<Page<T>> {
        let predicate = self.spec_predicate("findAll", spec)?;
        let (sort, page) = match page {
            Some(page) => {
                let sort = self.resolve_sort("findAll", page.sort())?;
                (sort.clone(), Some(page.clone().with_sort(sort)))
            }
            None => (Sort::unsorted(), None),
        };
        self.paginate(predicate, sort, page, false)
    }

    /// The single entity satisfying `spec`
    ///
    /// Fails with [`RepositoryError::NonUniqueResult`] when more than one
    /// entity matches.
    pub fn find_one_by_spec(&self, spec: Option<&Specification>) -> RepositoryResult<Option<T>> {
        let predicate = self.spec_predicate("findOne", spec)?;
        self.single("findOne", SelectQuery::new(predicate))
    }

    pub fn count_by_spec(&self, spec: Option<&Specification>) -> RepositoryResult<u64> {
        let predicate = self.spec_predicate("count", spec)?;
        Ok(self.service.execute_count(predicate.as_ref())?)
    }

    // === Declared methods ===

    /// The bound execution plan for a declared method, without running it
    pub fn derive(&self, method: &str, args: &[Argument]) -> RepositoryResult<ExecutionPlan> {
        let registered = self.registered(method)?;
        let args = self.resolve_arguments(method, args)?;
        match &registered.operation {
            Operation::Derived => {
                let template = self.template(&registered.signature)?;
                plan::derive(&template, &registered.signature, &args)
            }
            Operation::Explicit(query) => plan::explicit(query, &registered.signature, &args),
            Operation::Custom(_) => Err(RepositoryError::Config(format!(
                "Method '{}' is implemented by custom code and has no query plan",
                method
            ))),
        }
    }

    /// Invoke a declared method by name
    pub fn invoke(&self, method: &str, args: &[Argument]) -> RepositoryResult<Outcome<T>> {
        let registered = self.registered(method)?;
        if let Operation::Custom(handler) = &registered.operation {
            tracing::debug!(method, "Invoking custom repository method");
            return handler(self.service.as_ref(), args);
        }

        let plan = self.derive(method, args)?;
        tracing::debug!(
            method,
            action = ?plan.action,
            shape = %plan.shape,
            "Executing repository method"
        );
        self.execute(plan)
    }

    pub fn invoke_one(&self, method: &str, args: &[Argument]) -> RepositoryResult<Option<T>> {
        let outcome = self.invoke(method, args)?;
        let actual = outcome.kind_name();
        outcome
            .into_entity()
            .ok_or_else(|| unexpected(method, "an entity", actual))
    }

    pub fn invoke_list(&self, method: &str, args: &[Argument]) -> RepositoryResult<Vec<T>> {
        let outcome = self.invoke(method, args)?;
        let actual = outcome.kind_name();
        outcome
            .into_entities()
            .ok_or_else(|| unexpected(method, "a collection", actual))
    }

    pub fn invoke_page(&self, method: &str, args: &[Argument]) -> RepositoryResult<Page<T>> {
        let outcome = self.invoke(method, args)?;
        let actual = outcome.kind_name();
        outcome
            .into_page()
            .ok_or_else(|| unexpected(method, "a page", actual))
    }

    /// Invoke a projecting method, returning the selected values
    pub fn invoke_values(&self, method: &str, args: &[Argument]) -> RepositoryResult<Vec<FieldValue>> {
        let outcome = self.invoke(method, args)?;
        let actual = outcome.kind_name();
        outcome
            .into_values()
            .ok_or_else(|| unexpected(method, "a list of values", actual))
    }

    pub fn invoke_value_page(
        &self,
        method: &str,
        args: &[Argument],
    ) -> RepositoryResult<Page<FieldValue>> {
        let outcome = self.invoke(method, args)?;
        let actual = outcome.kind_name();
        outcome
            .into_value_page()
            .ok_or_else(|| unexpected(method, "a page of values", actual))
    }

    pub fn invoke_count(&self, method: &str, args: &[Argument]) -> RepositoryResult<u64> {
        let outcome = self.invoke(method, args)?;
        outcome
            .as_count()
            .ok_or_else(|| unexpected(method, "a count", outcome.kind_name()))
    }

    pub fn invoke_exists(&self, method: &str, args: &[Argument]) -> RepositoryResult<bool> {
        let outcome = self.invoke(method, args)?;
        outcome
            .as_exists()
            .ok_or_else(|| unexpected(method, "an existence flag", outcome.kind_name()))
    }

    /// Invoke a modifying method, returning the number of rows touched
    pub fn invoke_modifying(&self, method: &str, args: &[Argument]) -> RepositoryResult<u64> {
        match self.invoke(method, args)? {
            Outcome::Affected(n) | Outcome::Count(n) => Ok(n),
            Outcome::Unit => Ok(0),
            other => Err(unexpected(method, "an affected row count", other.kind_name())),
        }
    }

    // === Execution ===

    fn execute(&self, plan: ExecutionPlan) -> RepositoryResult<Outcome<T>> {
        let ExecutionPlan {
            method,
            action,
            predicate,
            sort,
            page,
            shape,
        } = plan;

        match action {
            PlanAction::Select { distinct, limit } => match shape {
                ReturnShape::Single | ReturnShape::Optional => {
                    let query = SelectQuery::new(predicate)
                        .sorted(sort)
                        .windowed(limit.map(QueryWindow::limit))
                        .distinct(distinct);
                    self.single(&method, query).map(Outcome::Entity)
                }
                ReturnShape::Page => {
                    let page = match (page, limit) {
                        (None, Some(limit)) => Some(PageRequest::of(0, limit)?),
                        (page, _) => page,
                    };
                    self.paginate(predicate, sort, page, distinct)
                        .map(Outcome::Page)
                }
                _ => {
                    let window = match page {
                        Some(page) => {
                            let mut window =
                                page.clamped(self.config.max_page_size).window();
                            window.limit = match (window.limit, limit) {
                                (Some(size), Some(limit)) => Some(size.min(limit)),
                                (size, limit) => size.or(limit),
                            };
                            Some(window)
                        }
                        None => limit.map(QueryWindow::limit),
                    };
                    let query = SelectQuery::new(predicate)
                        .sorted(sort)
                        .windowed(window)
                        .distinct(distinct);
                    Ok(Outcome::Entities(self.service.execute_query(&query)?))
                }
            },
            PlanAction::Project { path, grouped } => {
                let direction = projection_order(&method, &path, &sort)?;
                let query = ProjectionQuery::new(path, predicate)
                    .grouped(grouped)
                    .ordered(direction);
                match shape {
                    ReturnShape::Count => Ok(Outcome::Count(
                        self.service.execute_projection_count(&query)?,
                    )),
                    ReturnShape::Page => self.paginate_values(query, page).map(Outcome::ValuePage),
                    _ => {
                        let window = page.map(|p| p.clamped(self.config.max_page_size).window());
                        Ok(Outcome::Values(
                            self.service.execute_projection(&query.windowed(window))?,
                        ))
                    }
                }
            }
            PlanAction::Count => Ok(Outcome::Count(
                self.service.execute_count(predicate.as_ref())?,
            )),
            PlanAction::Exists => Ok(Outcome::Exists(
                self.service.execute_count(predicate.as_ref())? > 0,
            )),
            PlanAction::Delete => self.bulk_delete(predicate.as_ref()).map(Outcome::Affected),
            PlanAction::Update(mutation) => Ok(Outcome::Affected(
                self.service
                    .execute_bulk_update(predicate.as_ref(), &mutation)?,
            )),
        }
    }

    /// Run a query expected to match at most one entity
    fn single(&self, operation: &str, query: SelectQuery) -> RepositoryResult<Option<T>> {
        let mut rows = self.service.execute_query(&query)?;
        if rows.len() > 1 {
            tracing::warn!(
                operation,
                rows = rows.len(),
                "Single-result query matched more than one entity"
            );
            return Err(RepositoryError::NonUniqueResult {
                operation: operation.to_string(),
                actual: rows.len(),
            });
        }
        Ok(rows.pop())
    }

    /// Count, then fetch the requested window
    ///
    /// The row query is skipped when the page starts past the last match.
    fn paginate(
        &self,
        predicate: Option<Predicate>,
        sort: Sort,
        page: Option<PageRequest>,
        distinct: bool,
    ) -> RepositoryResult<Page<T>> {
        let query = SelectQuery::new(predicate).sorted(sort).distinct(distinct);
        let Some(request) = page else {
            return Ok(Page::unpaged(self.service.execute_query(&query)?));
        };

        let request = request.clamped(self.config.max_page_size);
        let total = self.service.execute_count(query.predicate.as_ref())?;
        if request.offset() as u64 >= total {
            return Ok(Page::new(Vec::new(), request, total));
        }

        let content = self
            .service
            .execute_query(&query.windowed(Some(request.window())))?;
        Ok(Page::new(content, request, total))
    }

    /// [`paginate`](Self::paginate) for projections; the total counts
    /// groups when the projection is grouped
    fn paginate_values(
        &self,
        query: ProjectionQuery,
        page: Option<PageRequest>,
    ) -> RepositoryResult<Page<FieldValue>> {
        let Some(request) = page else {
            return Ok(Page::unpaged(self.service.execute_projection(&query)?));
        };

        let request = request.clamped(self.config.max_page_size);
        let total = self.service.execute_projection_count(&query)?;
        if request.offset() as u64 >= total {
            return Ok(Page::new(Vec::new(), request, total));
        }

        let content = self
            .service
            .execute_projection(&query.windowed(Some(request.window())))?;
        Ok(Page::new(content, request, total))
    }

    fn bulk_delete(&self, predicate: Option<&Predicate>) -> RepositoryResult<u64> {
        match self.config.bulk_delete {
            BulkDeleteMode::Direct => Ok(self.service.execute_bulk_delete(predicate)?),
            BulkDeleteMode::PerEntity => {
                let rows = self
                    .service
                    .execute_query(&SelectQuery::new(predicate.cloned()))?;
                for row in &rows {
                    self.service.delete(row)?;
                }
                Ok(rows.len() as u64)
            }
        }
    }

    // === Resolution ===

    fn registered(&self, method: &str) -> RepositoryResult<&RegisteredMethod<T>> {
        self.operations
            .get(method)
            .ok_or_else(|| RepositoryError::UnknownMethod {
                entity_type: T::entity_type().to_string(),
                method: method.to_string(),
            })
    }

    fn template(&self, signature: &MethodSignature) -> RepositoryResult<Arc<MethodTemplate>> {
        let key = TemplateKey::new(T::entity_type(), signature.clone());
        let template = self.cache.get_or_parse(&key, || {
            MethodTemplate::parse(signature.name(), &self.root, &self.catalog).map(Arc::new)
        })?;
        Ok(template)
    }

    /// Canonicalize sort properties carried by sort and page arguments
    fn resolve_arguments(&self, method: &str, args: &[Argument]) -> RepositoryResult<Vec<Argument>> {
        args.iter()
            .map(|arg| {
                Ok(match arg {
                    Argument::Sort(Some(sort)) => {
                        Argument::Sort(Some(self.resolve_sort(method, sort)?))
                    }
                    Argument::Page(Some(page)) => {
                        let sort = self.resolve_sort(method, page.sort())?;
                        Argument::Page(Some(page.clone().with_sort(sort)))
                    }
                    other => other.clone(),
                })
            })
            .collect()
    }

    fn resolve_sort(&self, method: &str, sort: &Sort) -> RepositoryResult<Sort> {
        let resolver = PropertyResolver::new(&self.root, &self.catalog, method);
        let orders = sort
            .orders()
            .iter()
            .map(|order| {
                let path = resolver.resolve_dotted(&order.property)?;
                Ok(Order {
                    property: path.to_string(),
                    ..order.clone()
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(Sort::new(orders))
    }

    fn spec_predicate(
        &self,
        operation: &str,
        spec: Option<&Specification>,
    ) -> RepositoryResult<Option<Predicate>> {
        let resolver = PropertyResolver::new(&self.root, &self.catalog, operation);
        Ok(spec
            .and_then(Specification::predicate)
            .map(|p| canonical(p.clone(), &resolver))
            .transpose()?)
    }
}

/// Direction of a projection's order; only the selected attribute sorts
fn projection_order(
    method: &str,
    path: &PropertyPath,
    sort: &Sort,
) -> RepositoryResult<Option<Direction>> {
    let selected = path.to_string();
    if let Some(order) = sort.orders().iter().find(|o| o.property != selected) {
        return Err(RepositoryError::Config(format!(
            "Method '{}' projects '{}' and cannot be ordered by '{}'",
            method, selected, order.property
        )));
    }
    Ok(sort.orders().first().map(|o| o.direction))
}

/// Rewrite every condition path to its declared attribute names
fn canonical(predicate: Predicate, resolver: &PropertyResolver<'_>) -> Result<Predicate, ParseError> {
    Ok(match predicate {
        Predicate::Condition(mut condition) => {
            condition.path = resolver.resolve_dotted(&condition.path.to_string())?;
            Predicate::Condition(condition)
        }
        Predicate::And(children) => Predicate::And(
            children
                .into_iter()
                .map(|p| canonical(p, resolver))
                .collect::<Result<_, _>>()?,
        ),
        Predicate::Or(children) => Predicate::Or(
            children
                .into_iter()
                .map(|p| canonical(p, resolver))
                .collect::<Result<_, _>>()?,
        ),
        Predicate::Not(inner) => Predicate::Not(Box::new(canonical(*inner, resolver)?)),
    })
}

fn id_predicate(ids: impl Iterator<Item = Uuid>) -> Predicate {
    Predicate::in_list(ID_ATTRIBUTE, ids.map(FieldValue::from).collect())
}

fn unexpected(method: &str, expected: &'static str, actual: &'static str) -> RepositoryError {
    RepositoryError::UnexpectedOutcome {
        method: method.to_string(),
        expected,
        actual,
    }
}
