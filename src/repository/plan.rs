//! Execution plans: templates and query text bound to runtime arguments

use crate::core::error::{RepositoryError, RepositoryResult};
use crate::core::field::FieldValue;
use crate::core::service::Mutation;
use crate::query::explicit::{BoundStatement, ExplicitQuery};
use crate::query::page::PageRequest;
use crate::query::parser::{MethodTemplate, QueryAction};
use crate::query::predicate::{Condition, Operand, Operator, Predicate, PropertyPath};
use crate::query::sort::Sort;
use crate::repository::argument::Argument;
use crate::repository::method::{MethodSignature, ParamKind, ReturnShape};

/// What the persistence backend is asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAction {
    Select {
        distinct: bool,
        limit: Option<usize>,
    },
    /// Values of one attribute; a count shape counts them instead
    Project {
        path: PropertyPath,
        grouped: bool,
    },
    Count,
    Exists,
    Delete,
    Update(Mutation),
}

/// A fully bound repository call, ready to execute
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub method: String,
    pub action: PlanAction,
    pub predicate: Option<Predicate>,
    /// Method-name order first, then keys from the sort/page argument
    pub sort: Sort,
    pub page: Option<PageRequest>,
    pub shape: ReturnShape,
}

struct SplitArguments {
    values: Vec<Operand>,
    sort: Option<Sort>,
    page: Option<PageRequest>,
}

impl SplitArguments {
    /// The caller's sort, taken from the page request when paging
    fn explicit_sort(&self) -> Sort {
        self.page
            .as_ref()
            .map(|p| p.sort().clone())
            .or_else(|| self.sort.clone())
            .unwrap_or_default()
    }
}

/// Bind a parsed method template to runtime arguments
pub fn derive(
    template: &MethodTemplate,
    signature: &MethodSignature,
    args: &[Argument],
) -> RepositoryResult<ExecutionPlan> {
    let split = split_arguments(signature, args)?;

    if split.values.len() != template.arity() {
        return Err(RepositoryError::ArgumentCountMismatch {
            method: signature.name().to_string(),
            expected: template.arity(),
            actual: split.values.len(),
        });
    }

    let predicate = bind_criteria(template, signature, &split.values)?;
    let action = match template.action {
        QueryAction::Find => PlanAction::Select {
            distinct: template.distinct,
            limit: template.limit,
        },
        QueryAction::Count => PlanAction::Count,
        QueryAction::Exists => PlanAction::Exists,
        QueryAction::Delete => PlanAction::Delete,
    };
    check_shape(signature, &action)?;

    Ok(ExecutionPlan {
        method: signature.name().to_string(),
        action,
        predicate,
        sort: template.order_by.merge(&split.explicit_sort()),
        page: split.page,
        shape: signature.returns(),
    })
}

/// Bind explicit query text to runtime arguments
pub fn explicit(
    query: &ExplicitQuery,
    signature: &MethodSignature,
    args: &[Argument],
) -> RepositoryResult<ExecutionPlan> {
    let split = split_arguments(signature, args)?;
    let explicit_sort = split.explicit_sort();

    let (action, predicate, sort) = match query.bind(&split.values)? {
        BoundStatement::Select { predicate, sort } => {
            let action = match signature.returns() {
                ReturnShape::Count => PlanAction::Count,
                ReturnShape::Exists => PlanAction::Exists,
                _ => PlanAction::Select {
                    distinct: false,
                    limit: None,
                },
            };
            (action, predicate, sort.merge(&explicit_sort))
        }
        BoundStatement::Project {
            path,
            predicate,
            grouped,
            sort,
        } => (
            PlanAction::Project { path, grouped },
            predicate,
            sort.merge(&explicit_sort),
        ),
        BoundStatement::Update {
            predicate,
            mutation,
        } => (PlanAction::Update(mutation), predicate, Sort::unsorted()),
        BoundStatement::Delete { predicate } => (PlanAction::Delete, predicate, Sort::unsorted()),
    };
    check_shape(signature, &action)?;

    Ok(ExecutionPlan {
        method: signature.name().to_string(),
        action,
        predicate,
        sort,
        page: split.page,
        shape: signature.returns(),
    })
}

fn split_arguments(
    signature: &MethodSignature,
    args: &[Argument],
) -> RepositoryResult<SplitArguments> {
    let parameters = signature.parameters();
    if args.len() != parameters.len() {
        return Err(RepositoryError::ArgumentCountMismatch {
            method: signature.name().to_string(),
            expected: parameters.len(),
            actual: args.len(),
        });
    }

    let type_error = |index: usize, expected: &'static str| RepositoryError::ArgumentType {
        method: signature.name().to_string(),
        index,
        expected,
    };

    let mut split = SplitArguments {
        values: Vec::new(),
        sort: None,
        page: None,
    };
    for (index, (parameter, arg)) in parameters.iter().zip(args).enumerate() {
        match parameter.kind {
            ParamKind::Value => {
                let operand = arg
                    .as_operand()
                    .ok_or_else(|| type_error(index, "a value or a list"))?;
                split.values.push(operand);
            }
            ParamKind::Sort => {
                split.sort = match arg {
                    Argument::Sort(sort) => sort.clone(),
                    Argument::Value(FieldValue::Null) => None,
                    _ => return Err(type_error(index, "a sort")),
                };
            }
            ParamKind::Pageable => {
                split.page = match arg {
                    Argument::Page(page) => page.clone(),
                    Argument::Value(FieldValue::Null) => None,
                    _ => return Err(type_error(index, "a page request")),
                };
            }
        }
    }
    Ok(split)
}

/// Build the OR of AND groups, consuming value arguments left to right
fn bind_criteria(
    template: &MethodTemplate,
    signature: &MethodSignature,
    values: &[Operand],
) -> RepositoryResult<Option<Predicate>> {
    let method = signature.name();
    let mut cursor = values.iter().enumerate();
    let mut next = || {
        cursor
            .next()
            .ok_or_else(|| RepositoryError::ArgumentCountMismatch {
                method: method.to_string(),
                expected: template.arity(),
                actual: values.len(),
            })
    };
    let scalar = |(index, operand): (usize, &Operand)| match operand {
        Operand::Value(v) => Ok(v.clone()),
        _ => Err(RepositoryError::ArgumentType {
            method: method.to_string(),
            index,
            expected: "a single value",
        }),
    };

    let mut groups = Vec::with_capacity(template.criteria.len());
    for group in &template.criteria {
        let mut conditions = Vec::with_capacity(group.len());
        for part in group {
            let operand = match (part.operator, part.arity()) {
                (_, 0) => Operand::None,
                (_, 2) => {
                    let low = scalar(next()?)?;
                    let high = scalar(next()?)?;
                    Operand::Range(low, high)
                }
                (Operator::In | Operator::NotIn, _) => match next()?.1 {
                    Operand::List(items) => Operand::List(items.clone()),
                    Operand::Value(FieldValue::Null) => Operand::List(Vec::new()),
                    Operand::Value(v) => Operand::List(vec![v.clone()]),
                    _ => Operand::List(Vec::new()),
                },
                _ => Operand::Value(scalar(next()?)?),
            };
            let condition = Condition::new(part.path.clone(), part.operator, operand)
                .ignoring_case(part.ignore_case);
            conditions.push(Predicate::Condition(condition));
        }
        groups.extend(Predicate::all_of(conditions));
    }

    Ok(Predicate::any_of(groups))
}

fn check_shape(signature: &MethodSignature, action: &PlanAction) -> RepositoryResult<()> {
    let shape = signature.returns();
    let supported = match action {
        PlanAction::Select { .. } => matches!(
            shape,
            ReturnShape::Single | ReturnShape::Optional | ReturnShape::Collection | ReturnShape::Page
        ),
        PlanAction::Project { .. } => matches!(
            shape,
            ReturnShape::Collection | ReturnShape::Page | ReturnShape::Count
        ),
        PlanAction::Count => shape == ReturnShape::Count,
        PlanAction::Exists => shape == ReturnShape::Exists,
        PlanAction::Delete | PlanAction::Update(_) => {
            matches!(shape, ReturnShape::Modifying | ReturnShape::Count)
        }
    };
    if supported {
        Ok(())
    } else {
        Err(RepositoryError::Config(format!(
            "Method '{}' cannot return {}",
            signature.name(),
            shape
        )))
    }
}
