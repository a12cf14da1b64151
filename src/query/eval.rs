//! In-process predicate evaluation
//!
//! Backends that hold entities in memory evaluate predicates here. Semantics
//! follow SQL:
//! - evaluation is three-valued: a comparison against `NULL` is unknown, and
//!   `NOT unknown` is still unknown, so only `IS [NOT] NULL` selects nulls
//! - `LIKE` treats `%` as any run of characters and `_` as one character
//! - a path ending in a reference's `id` reads the stored key, so an unset
//!   reference is `NULL` there
//! - traversing further behaves like an inner join: a row matches when any
//!   reachable value satisfies the condition, and a row with no referenced
//!   entity never matches a condition on that path

use crate::core::entity::{Attributes, EntityResolver};
use crate::core::field::FieldValue;
use crate::core::metadata::ID_ATTRIBUTE;
use crate::query::predicate::{Condition, Operand, Operator, Predicate, PropertyPath};
use regex::Regex;

/// A predicate compiled for repeated evaluation
///
/// LIKE patterns are translated to regular expressions once, at compile time.
pub struct Matcher<'p> {
    node: Node<'p>,
}

enum Node<'p> {
    Condition {
        condition: &'p Condition,
        pattern: Option<Regex>,
    },
    And(Vec<Node<'p>>),
    Or(Vec<Node<'p>>),
    Not(Box<Node<'p>>),
}

impl<'p> Matcher<'p> {
    pub fn compile(predicate: &'p Predicate) -> Result<Self, regex::Error> {
        Ok(Self {
            node: compile_node(predicate)?,
        })
    }

    /// True only when the predicate is known to hold; unknown counts as a miss
    pub fn matches(&self, entity: &dyn Attributes, resolver: &dyn EntityResolver) -> bool {
        eval_node(&self.node, entity, resolver) == Some(true)
    }
}

impl Predicate {
    /// Evaluate once against a single entity
    ///
    /// Prefer [`Matcher`] when evaluating many rows.
    pub fn matches(
        &self,
        entity: &dyn Attributes,
        resolver: &dyn EntityResolver,
    ) -> Result<bool, regex::Error> {
        Ok(Matcher::compile(self)?.matches(entity, resolver))
    }
}

fn compile_node(predicate: &Predicate) -> Result<Node<'_>, regex::Error> {
    Ok(match predicate {
        Predicate::Condition(condition) => Node::Condition {
            condition,
            pattern: compile_pattern(condition)?,
        },
        Predicate::And(children) => {
            Node::And(children.iter().map(compile_node).collect::<Result<_, _>>()?)
        }
        Predicate::Or(children) => {
            Node::Or(children.iter().map(compile_node).collect::<Result<_, _>>()?)
        }
        Predicate::Not(inner) => Node::Not(Box::new(compile_node(inner)?)),
    })
}

fn compile_pattern(condition: &Condition) -> Result<Option<Regex>, regex::Error> {
    if !matches!(condition.operator, Operator::Like | Operator::NotLike) {
        return Ok(None);
    }
    match &condition.operand {
        Operand::Value(FieldValue::String(pattern)) => {
            like_to_regex(pattern, condition.ignore_case).map(Some)
        }
        _ => Ok(None),
    }
}

/// Translate a SQL LIKE pattern into an anchored regular expression
pub fn like_to_regex(pattern: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str(if ignore_case { "(?is)^" } else { "(?s)^" });
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');
    Regex::new(&source)
}

/// `None` is SQL's unknown
type Truth = Option<bool>;

fn eval_node(node: &Node<'_>, entity: &dyn Attributes, resolver: &dyn EntityResolver) -> Truth {
    match node {
        Node::Condition { condition, pattern } => {
            let values = terminal_values(&condition.path, entity, resolver);
            if values.is_empty() {
                return None;
            }
            values
                .iter()
                .map(|value| test_value(condition, pattern.as_ref(), value))
                .fold(Some(false), or3)
        }
        Node::And(children) => children
            .iter()
            .map(|c| eval_node(c, entity, resolver))
            .fold(Some(true), and3),
        Node::Or(children) => children
            .iter()
            .map(|c| eval_node(c, entity, resolver))
            .fold(Some(false), or3),
        Node::Not(inner) => eval_node(inner, entity, resolver).map(|b| !b),
    }
}

fn and3(a: Truth, b: Truth) -> Truth {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Truth, b: Truth) -> Truth {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Values reached by walking `path` from `entity`
///
/// Unknown terminal attributes read as `Null`, as does the `id` of an unset
/// reference. Dangling references contribute nothing once the path goes
/// past their key.
pub fn terminal_values(
    path: &PropertyPath,
    entity: &dyn Attributes,
    resolver: &dyn EntityResolver,
) -> Vec<FieldValue> {
    let mut out = Vec::new();
    collect_values(path.segments(), entity, resolver, &mut out);
    out
}

fn collect_values(
    segments: &[String],
    entity: &dyn Attributes,
    resolver: &dyn EntityResolver,
    out: &mut Vec<FieldValue>,
) {
    match segments {
        [] => {}
        [leaf] => out.push(entity.attribute_value(leaf).unwrap_or(FieldValue::Null)),
        [reference, key] if key == ID_ATTRIBUTE => {
            let Some(ids) = entity.reference_ids(reference) else {
                return;
            };
            if ids.is_empty() {
                out.push(FieldValue::Null);
            } else {
                out.extend(ids.into_iter().map(FieldValue::Uuid));
            }
        }
        [head, rest @ ..] => {
            for id in entity.reference_ids(head).unwrap_or_default() {
                if let Some(related) = resolver.resolve(id) {
                    collect_values(rest, related.get(), resolver, out);
                }
            }
        }
    }
}

fn test_value(condition: &Condition, pattern: Option<&Regex>, value: &FieldValue) -> Truth {
    match condition.operator {
        Operator::IsNull => return Some(value.is_null()),
        Operator::IsNotNull => return Some(!value.is_null()),
        Operator::IsTrue => return Some(value.as_boolean() == Some(true)),
        Operator::IsFalse => return Some(value.as_boolean() == Some(false)),
        _ if value.is_null() => return None,
        _ => {}
    }

    let ignore_case = condition.ignore_case;
    let fold = |v: &FieldValue| {
        if ignore_case {
            v.to_lowercase()
        } else {
            v.clone()
        }
    };
    let ordered = |expected: &FieldValue, test: fn(std::cmp::Ordering) -> bool| {
        fold(value).compare(&fold(expected)).map(test)
    };

    match (condition.operator, &condition.operand) {
        (Operator::Like | Operator::NotLike, _) => {
            let pattern = pattern?;
            let found = value.as_string().is_some_and(|s| pattern.is_match(s));
            Some(found == (condition.operator == Operator::Like))
        }
        (op, Operand::Value(expected)) if op.is_textual() => {
            if expected.is_null() {
                return None;
            }
            let (Some(actual), Some(expected)) = (text(&fold(value)), text(&fold(expected))) else {
                return Some(false);
            };
            Some(match op {
                Operator::StartingWith => actual.starts_with(&expected),
                Operator::EndingWith => actual.ends_with(&expected),
                Operator::Containing => actual.contains(&expected),
                Operator::NotContaining => !actual.contains(&expected),
                _ => false,
            })
        }
        (_, Operand::Value(expected)) if expected.is_null() => None,
        (Operator::Equals, Operand::Value(expected)) => Some(fold(value).sql_eq(&fold(expected))),
        (Operator::NotEquals, Operand::Value(expected)) => {
            Some(!fold(value).sql_eq(&fold(expected)))
        }
        (Operator::GreaterThan, Operand::Value(expected)) => ordered(expected, |o| o.is_gt()),
        (Operator::GreaterThanEqual, Operand::Value(expected)) => ordered(expected, |o| o.is_ge()),
        (Operator::LessThan, Operand::Value(expected)) => ordered(expected, |o| o.is_lt()),
        (Operator::LessThanEqual, Operand::Value(expected)) => ordered(expected, |o| o.is_le()),
        (Operator::Between, Operand::Range(low, high)) => {
            if low.is_null() || high.is_null() {
                return None;
            }
            and3(ordered(low, |o| o.is_ge()), ordered(high, |o| o.is_le()))
        }
        (Operator::In | Operator::NotIn, Operand::List(values)) => {
            let v = fold(value);
            let found = if values.iter().any(|candidate| v.sql_eq(&fold(candidate))) {
                Some(true)
            } else if values.iter().any(FieldValue::is_null) {
                None
            } else {
                Some(false)
            };
            if condition.operator == Operator::In {
                found
            } else {
                found.map(|b| !b)
            }
        }
        _ => None,
    }
}

fn text(v: &FieldValue) -> Option<String> {
    v.as_string().map(str::to_owned)
}
