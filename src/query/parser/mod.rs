//! Method-name parser
//!
//! Decomposes a repository method name into a [`MethodTemplate`]:
//!
//! ```text
//! findDistinctFirst3ByLastnameLikeAndManagerLastnameOrFirstnameIgnoreCaseOrderByFirstnameDesc
//! └┬─┘└───┬────────┘  └──────────────┬─────────────────────────────────────┘       └──┬───────┘
//!  action  subject          criteria: OR of AND groups                            order clause
//! ```
//!
//! `Or` binds looser than `And`, so the criteria above read as
//! `(lastname like ? and manager.lastname = ?) or upper(firstname) = upper(?)`.

mod order;
mod part;
mod property;

pub use part::PartTemplate;
pub use property::PropertyResolver;

use crate::core::error::ParseError;
use crate::core::metadata::{EntityMetadata, MetadataCatalog};
use crate::query::sort::Sort;
use regex::Regex;
use std::sync::OnceLock;

fn prefix_with_criteria() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(find|read|get|query|search|stream|count|exists|delete|remove)((?:\p{Lu}.*?)??)By",
        )
        .expect("valid method prefix pattern")
    })
}

fn prefix_only() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(find|read|get|query|search|stream|count|exists|delete|remove)(\p{Lu}\w*)?$")
            .expect("valid method prefix pattern")
    })
}

fn limiting_subject() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(First|Top)(\d*)").expect("valid subject pattern"))
}

/// What a derived method does with the rows its criteria select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryAction {
    Find,
    Count,
    Exists,
    Delete,
}

impl QueryAction {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "count" => QueryAction::Count,
            "exists" => QueryAction::Exists,
            "delete" | "remove" => QueryAction::Delete,
            _ => QueryAction::Find,
        }
    }
}

/// A parsed method name, independent of any runtime arguments
#[derive(Debug, Clone, PartialEq)]
pub struct MethodTemplate {
    pub method: String,
    pub action: QueryAction,
    pub distinct: bool,
    /// Row limit from a `First<N>`/`Top<N>` subject
    pub limit: Option<usize>,
    /// OR of AND groups; empty when the method has no criteria
    pub criteria: Vec<Vec<PartTemplate>>,
    /// Sort from a trailing `OrderBy` clause
    pub order_by: Sort,
}

impl MethodTemplate {
    /// Parse `method` against the metadata of the repository's entity
    pub fn parse(
        method: &str,
        root: &EntityMetadata,
        catalog: &MetadataCatalog,
    ) -> Result<Self, ParseError> {
        let (action, subject, criteria_source) = split_method(method)?;
        let resolver = PropertyResolver::new(root, catalog, method);

        let distinct = subject.contains("Distinct");
        let limit = limiting_subject().captures(subject).map(|caps| {
            caps.get(2)
                .and_then(|n| n.as_str().parse::<usize>().ok())
                .unwrap_or(1)
        });

        let (criteria_source, order_source) = split_order_by(criteria_source);
        let (criteria_source, all_ignore_case) = strip_all_ignore_case(criteria_source);

        let mut criteria = Vec::new();
        if !criteria_source.is_empty() {
            for group in split_keyword(criteria_source, "Or") {
                let parts = split_keyword(group, "And")
                    .into_iter()
                    .map(|source| part::parse_part(source, all_ignore_case, &resolver))
                    .collect::<Result<Vec<_>, _>>()?;
                criteria.push(parts);
            }
        }

        let order_by = match order_source {
            Some(clause) => order::parse_order_clause(clause, &resolver)?,
            None => Sort::unsorted(),
        };

        let template = Self {
            method: method.to_string(),
            action,
            distinct,
            limit,
            criteria,
            order_by,
        };

        tracing::debug!(
            method = %method,
            entity_type = %root.entity_type(),
            action = ?template.action,
            parts = template.parts().count(),
            "Parsed query method"
        );

        Ok(template)
    }

    /// All condition parts in argument order
    pub fn parts(&self) -> impl Iterator<Item = &PartTemplate> {
        self.criteria.iter().flatten()
    }

    /// Number of value arguments the criteria bind
    pub fn arity(&self) -> usize {
        self.parts().map(PartTemplate::arity).sum()
    }

    pub fn has_criteria(&self) -> bool {
        !self.criteria.is_empty()
    }
}

/// Split into (action, subject, text after `By`)
fn split_method(method: &str) -> Result<(QueryAction, &str, &str), ParseError> {
    if let Some(caps) = prefix_with_criteria().captures(method) {
        let whole = caps.get(0).map_or(0, |m| m.end());
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let subject = caps.get(2).map_or("", |m| m.as_str());
        return Ok((QueryAction::from_prefix(prefix), subject, &method[whole..]));
    }

    if let Some(caps) = prefix_only().captures(method) {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let subject = caps.get(2).map_or("", |m| m.as_str());
        return Ok((QueryAction::from_prefix(prefix), subject, ""));
    }

    Err(ParseError::UnsupportedMethodName {
        method: method.to_string(),
    })
}

/// Split off a trailing `OrderBy` clause
fn split_order_by(source: &str) -> (&str, Option<&str>) {
    const ORDER_BY: &str = "OrderBy";
    let mut search_from = 0;
    while let Some(found) = source[search_from..].find(ORDER_BY) {
        let at = search_from + found;
        let rest = &source[at + ORDER_BY.len()..];
        if rest.is_empty() || rest.starts_with(char::is_uppercase) {
            return (&source[..at], Some(rest));
        }
        search_from = at + ORDER_BY.len();
    }
    (source, None)
}

fn strip_all_ignore_case(source: &str) -> (&str, bool) {
    ["AllIgnoringCase", "AllIgnoreCase"]
        .iter()
        .find_map(|suffix| source.strip_suffix(suffix))
        .map_or((source, false), |rest| (rest, true))
}

/// Split at `keyword` where it starts a new camel-case word
///
/// A keyword at the very start or followed by a lowercase letter is part of
/// a property name (`Origin`, `Andrew`, `Order`).
fn split_keyword<'a>(source: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(found) = source[search_from..].find(keyword) {
        let at = search_from + found;
        let end = at + keyword.len();
        let follows_word = at > start && source[end..].starts_with(char::is_uppercase);
        if follows_word {
            parts.push(&source[start..at]);
            start = end;
        }
        search_from = end;
    }

    parts.push(&source[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::Operator;
    use crate::query::sort::Order;

    fn catalog() -> MetadataCatalog {
        let mut catalog = MetadataCatalog::new();
        catalog.register(
            EntityMetadata::builder("User")
                .scalar("firstname")
                .scalar("lastname")
                .scalar("email_address")
                .scalar("age")
                .scalar("active")
                .scalar("origin")
                .to_one("manager", "User")
                .to_many("colleagues", "User")
                .build(),
        );
        catalog
    }

    fn parse(method: &str) -> Result<MethodTemplate, ParseError> {
        let catalog = catalog();
        let root = catalog.get("User").unwrap().clone();
        MethodTemplate::parse(method, &root, &catalog)
    }

    fn shape(template: &MethodTemplate) -> Vec<Vec<(String, Operator)>> {
        template
            .criteria
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|p| (p.path.to_string(), p.operator))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_simple_finder() {
        let template = parse("findByLastname").unwrap();
        assert_eq!(template.action, QueryAction::Find);
        assert_eq!(shape(&template), vec![vec![("lastname".to_string(), Operator::Equals)]]);
        assert_eq!(template.arity(), 1);
        assert!(template.order_by.is_unsorted());
    }

    #[test]
    fn test_like_with_order_by() {
        let template = parse("findByLastnameLikeOrderByFirstnameDesc").unwrap();
        assert_eq!(shape(&template), vec![vec![("lastname".to_string(), Operator::Like)]]);
        assert_eq!(template.order_by, Sort::desc("firstname"));
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let template = parse("findByFirstnameAndLastnameOrEmailAddress").unwrap();
        assert_eq!(
            shape(&template),
            vec![
                vec![
                    ("firstname".to_string(), Operator::Equals),
                    ("lastname".to_string(), Operator::Equals),
                ],
                vec![("email_address".to_string(), Operator::Equals)],
            ]
        );
        assert_eq!(template.arity(), 3);
    }

    #[test]
    fn test_unary_parts_bind_nothing() {
        let template = parse("findByLastnameNullAndFirstnameNotNull").unwrap();
        assert_eq!(template.arity(), 0);
        let template = parse("findByAgeBetweenAndActiveTrue").unwrap();
        assert_eq!(template.arity(), 2);
    }

    #[test]
    fn test_keywords_inside_property_names() {
        let template = parse("findByOriginOrLastname").unwrap();
        assert_eq!(
            shape(&template),
            vec![
                vec![("origin".to_string(), Operator::Equals)],
                vec![("lastname".to_string(), Operator::Equals)],
            ]
        );
    }

    #[test]
    fn test_traversal_parts() {
        let template = parse("findByManagerLastname").unwrap();
        assert_eq!(shape(&template), vec![vec![("manager.lastname".to_string(), Operator::Equals)]]);
        let template = parse("findByColleaguesLastname").unwrap();
        assert_eq!(
            shape(&template),
            vec![vec![("colleagues.lastname".to_string(), Operator::Equals)]]
        );
    }

    #[test]
    fn test_actions() {
        assert_eq!(parse("countByLastname").unwrap().action, QueryAction::Count);
        assert_eq!(parse("existsByLastname").unwrap().action, QueryAction::Exists);
        assert_eq!(parse("deleteByLastname").unwrap().action, QueryAction::Delete);
        assert_eq!(parse("removeByLastname").unwrap().action, QueryAction::Delete);
        assert_eq!(parse("readByLastname").unwrap().action, QueryAction::Find);
    }

    #[test]
    fn test_subject_modifiers() {
        let template = parse("findDistinctByLastname").unwrap();
        assert!(template.distinct);
        assert_eq!(template.limit, None);

        assert_eq!(parse("findFirstByLastname").unwrap().limit, Some(1));
        assert_eq!(parse("findTop3ByLastname").unwrap().limit, Some(3));
        assert_eq!(parse("findFirst10ByOrderByLastnameAsc").unwrap().limit, Some(10));
    }

    #[test]
    fn test_order_only() {
        let template = parse("findAllByOrderByLastnameAscFirstnameDesc").unwrap();
        assert!(!template.has_criteria());
        assert_eq!(
            template.order_by,
            Sort::new(vec![Order::asc("lastname"), Order::desc("firstname")])
        );
    }

    #[test]
    fn test_prefix_without_criteria() {
        let template = parse("countAll").unwrap();
        assert_eq!(template.action, QueryAction::Count);
        assert!(!template.has_criteria());
        assert!(parse("findAll").is_ok());
    }

    #[test]
    fn test_all_ignore_case() {
        let template = parse("findByFirstnameAndLastnameAllIgnoreCase").unwrap();
        assert!(template.parts().all(|p| p.ignore_case));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("lookupByLastname").unwrap_err(),
            ParseError::UnsupportedMethodName { .. }
        ));
        assert_eq!(
            parse("findByNickname").unwrap_err(),
            ParseError::unresolvable("User", "Nickname", "findByNickname")
        );
        assert!(matches!(
            parse("findByLastnameOrderBy").unwrap_err(),
            ParseError::InvalidOrderClause { .. }
        ));
        assert!(parse("findByLastnameAnd").is_err());
    }
}
