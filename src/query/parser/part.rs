//! Single condition parts of a method name (`LastnameNotLike`, `AgeBetween`)

use super::property::PropertyResolver;
use crate::core::error::ParseError;
use crate::query::predicate::{Operator, PropertyPath};
use std::sync::OnceLock;

/// Operator keywords recognised as part suffixes
const KEYWORDS: &[(&str, Operator)] = &[
    ("IsNotNull", Operator::IsNotNull),
    ("NotNull", Operator::IsNotNull),
    ("IsNull", Operator::IsNull),
    ("Null", Operator::IsNull),
    ("IsNotLike", Operator::NotLike),
    ("NotLike", Operator::NotLike),
    ("IsLike", Operator::Like),
    ("Like", Operator::Like),
    ("IsStartingWith", Operator::StartingWith),
    ("StartingWith", Operator::StartingWith),
    ("StartsWith", Operator::StartingWith),
    ("IsEndingWith", Operator::EndingWith),
    ("EndingWith", Operator::EndingWith),
    ("EndsWith", Operator::EndingWith),
    ("IsNotContaining", Operator::NotContaining),
    ("NotContaining", Operator::NotContaining),
    ("NotContains", Operator::NotContaining),
    ("IsContaining", Operator::Containing),
    ("Containing", Operator::Containing),
    ("Contains", Operator::Containing),
    ("IsGreaterThanEqual", Operator::GreaterThanEqual),
    ("GreaterThanEqual", Operator::GreaterThanEqual),
    ("IsGreaterThan", Operator::GreaterThan),
    ("GreaterThan", Operator::GreaterThan),
    ("IsLessThanEqual", Operator::LessThanEqual),
    ("LessThanEqual", Operator::LessThanEqual),
    ("IsLessThan", Operator::LessThan),
    ("LessThan", Operator::LessThan),
    ("IsBetween", Operator::Between),
    ("Between", Operator::Between),
    ("IsNotIn", Operator::NotIn),
    ("NotIn", Operator::NotIn),
    ("IsIn", Operator::In),
    ("In", Operator::In),
    ("IsTrue", Operator::IsTrue),
    ("True", Operator::IsTrue),
    ("IsFalse", Operator::IsFalse),
    ("False", Operator::IsFalse),
    ("IsNot", Operator::NotEquals),
    ("Not", Operator::NotEquals),
    ("Equals", Operator::Equals),
    ("Is", Operator::Equals),
];

const IGNORE_CASE_SUFFIXES: &[&str] = &["IgnoringCase", "IgnoreCase"];

/// Keywords ordered longest first, so `NotLike` is never read as `Not` + `Like`
fn keywords_by_length() -> &'static [(&'static str, Operator)] {
    static SORTED: OnceLock<Vec<(&'static str, Operator)>> = OnceLock::new();
    SORTED.get_or_init(|| {
        let mut keywords = KEYWORDS.to_vec();
        keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        keywords
    })
}

/// A parsed condition descriptor awaiting its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct PartTemplate {
    pub path: PropertyPath,
    pub operator: Operator,
    pub ignore_case: bool,
}

impl PartTemplate {
    /// Number of method arguments this part consumes
    pub fn arity(&self) -> usize {
        self.operator.arity()
    }
}

/// Strip a trailing `IgnoreCase`/`IgnoringCase`
pub(crate) fn strip_ignore_case(source: &str) -> (&str, bool) {
    IGNORE_CASE_SUFFIXES
        .iter()
        .find_map(|suffix| source.strip_suffix(suffix))
        .map_or((source, false), |rest| (rest, true))
}

/// Parse one part of a criteria clause
///
/// A keyword is only accepted when the text before it resolves to a
/// property, so a property whose name ends in a keyword (`Origin`,
/// `Status`) still parses as plain equality.
pub(crate) fn parse_part(
    source: &str,
    always_ignore_case: bool,
    resolver: &PropertyResolver<'_>,
) -> Result<PartTemplate, ParseError> {
    let (source, ignore_case) = strip_ignore_case(source);
    let ignore_case = ignore_case || always_ignore_case;
    let mut first_failure = None;

    for (keyword, operator) in keywords_by_length() {
        let Some(property) = source.strip_suffix(keyword) else {
            continue;
        };
        if property.is_empty() {
            continue;
        }
        match resolver.resolve(property) {
            Ok(path) => {
                return Ok(PartTemplate {
                    path,
                    operator: *operator,
                    ignore_case,
                });
            }
            Err(e) => {
                first_failure.get_or_insert(e);
            }
        }
    }

    match resolver.resolve(source) {
        Ok(path) => Ok(PartTemplate {
            path,
            operator: Operator::Equals,
            ignore_case,
        }),
        Err(e) => Err(first_failure.unwrap_or(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{EntityMetadata, MetadataCatalog};

    fn parse(source: &str) -> Result<(String, Operator, bool), ParseError> {
        let mut catalog = MetadataCatalog::new();
        catalog.register(
            EntityMetadata::builder("User")
                .scalar("firstname")
                .scalar("lastname")
                .scalar("age")
                .scalar("active")
                .scalar("origin")
                .to_one("manager", "User")
                .build(),
        );
        let root = catalog.get("User").unwrap().clone();
        let resolver = PropertyResolver::new(&root, &catalog, "findByTest");
        parse_part(source, false, &resolver)
            .map(|p| (p.path.to_string(), p.operator, p.ignore_case))
    }

    #[test]
    fn test_plain_equality() {
        assert_eq!(
            parse("Lastname").unwrap(),
            ("lastname".to_string(), Operator::Equals, false)
        );
    }

    #[test]
    fn test_longest_keyword_wins() {
        assert_eq!(parse("LastnameNotLike").unwrap().1, Operator::NotLike);
        assert_eq!(parse("LastnameLike").unwrap().1, Operator::Like);
        assert_eq!(parse("LastnameNot").unwrap().1, Operator::NotEquals);
        assert_eq!(parse("LastnameNotNull").unwrap().1, Operator::IsNotNull);
        assert_eq!(parse("LastnameIsNotNull").unwrap().1, Operator::IsNotNull);
        assert_eq!(parse("LastnameNull").unwrap().1, Operator::IsNull);
        assert_eq!(parse("AgeGreaterThanEqual").unwrap().1, Operator::GreaterThanEqual);
        assert_eq!(parse("AgeNotIn").unwrap().1, Operator::NotIn);
    }

    #[test]
    fn test_keyword_only_accepted_when_property_resolves() {
        // "Origin" ends with "In" but "Orig" is not a property
        assert_eq!(
            parse("Origin").unwrap(),
            ("origin".to_string(), Operator::Equals, false)
        );
        assert_eq!(parse("OriginIn").unwrap().1, Operator::In);
    }

    #[test]
    fn test_nested_with_keyword() {
        let (path, op, _) = parse("ManagerLastnameLike").unwrap();
        assert_eq!(path, "manager.lastname");
        assert_eq!(op, Operator::Like);
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(
            parse("FirstnameIgnoreCase").unwrap(),
            ("firstname".to_string(), Operator::Equals, true)
        );
        assert_eq!(
            parse("FirstnameStartingWithIgnoringCase").unwrap(),
            ("firstname".to_string(), Operator::StartingWith, true)
        );
    }

    #[test]
    fn test_boolean_keywords() {
        assert_eq!(parse("ActiveTrue").unwrap().1, Operator::IsTrue);
        assert_eq!(parse("ActiveIsFalse").unwrap().1, Operator::IsFalse);
    }

    #[test]
    fn test_unresolvable_reports_stripped_property() {
        let err = parse("NicknameLike").unwrap_err();
        assert_eq!(
            err,
            ParseError::unresolvable("User", "Nickname", "findByTest")
        );
    }
}
