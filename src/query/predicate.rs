//! Predicate model
//!
//! A predicate is an immutable boolean expression tree over attribute paths.
//! Leaves are [`Condition`]s; inner nodes combine children with AND, OR and
//! NOT. Trees are built per call and consumed by the persistence backend.

use crate::core::field::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Dot-separated traversal over references ending in a comparable attribute
///
/// `manager.lastname` means "follow `manager`, then compare `lastname`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Split a dotted path without validating it
    pub fn dotted(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The terminal attribute
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Whether the path traverses at least one reference
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::dotted(path)
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self::dotted(&path)
    }
}

/// Comparison operator of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    NotEquals,
    /// SQL `LIKE`; `%` and `_` are wildcards
    Like,
    NotLike,
    StartingWith,
    EndingWith,
    Containing,
    NotContaining,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
}

impl Operator {
    /// Number of method arguments the operator binds
    pub fn arity(self) -> usize {
        match self {
            Operator::IsNull | Operator::IsNotNull | Operator::IsTrue | Operator::IsFalse => 0,
            Operator::Between => 2,
            _ => 1,
        }
    }

    /// Operators that compare text
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Operator::Like
                | Operator::NotLike
                | Operator::StartingWith
                | Operator::EndingWith
                | Operator::Containing
                | Operator::NotContaining
        )
    }

    /// The operator a null-valued argument degrades to
    ///
    /// Binding `null` to a positive match means "attribute is null", binding
    /// it to a negated match means "attribute is not null".
    fn null_counterpart(self) -> Option<Operator> {
        match self {
            Operator::Equals
            | Operator::Like
            | Operator::StartingWith
            | Operator::EndingWith
            | Operator::Containing => Some(Operator::IsNull),
            Operator::NotEquals | Operator::NotLike | Operator::NotContaining => {
                Some(Operator::IsNotNull)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::StartingWith => "starts with",
            Operator::EndingWith => "ends with",
            Operator::Containing => "contains",
            Operator::NotContaining => "not contains",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::IsTrue => "is true",
            Operator::IsFalse => "is false",
        };
        f.write_str(symbol)
    }
}

/// Bound value(s) of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Value(FieldValue),
    Range(FieldValue, FieldValue),
    List(Vec<FieldValue>),
}

/// A leaf condition: attribute path, operator, bound value(s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: PropertyPath,
    pub operator: Operator,
    pub operand: Operand,
    pub ignore_case: bool,
}

impl Condition {
    /// Build a condition, rewriting null-valued matches to null checks
    pub fn new(path: impl Into<PropertyPath>, operator: Operator, operand: Operand) -> Self {
        let (operator, operand) = match (&operand, operator.null_counterpart()) {
            (Operand::Value(FieldValue::Null), Some(null_operator)) => {
                (null_operator, Operand::None)
            }
            _ => (operator, operand),
        };
        Self {
            path: path.into(),
            operator,
            operand,
            ignore_case: false,
        }
    }

    pub fn ignoring_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.operator)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Value(v) => write!(f, " {v:?}"),
            Operand::Range(low, high) => write!(f, " {low:?} and {high:?}"),
            Operand::List(values) => write!(f, " {values:?}"),
        }
    }
}

/// Boolean expression tree over conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Condition(Condition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn condition(path: impl Into<PropertyPath>, operator: Operator, operand: Operand) -> Self {
        Predicate::Condition(Condition::new(path, operator, operand))
    }

    pub fn eq(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::Equals, Operand::Value(value.into()))
    }

    pub fn ne(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::NotEquals, Operand::Value(value.into()))
    }

    pub fn like(path: impl Into<PropertyPath>, pattern: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::Like, Operand::Value(pattern.into()))
    }

    pub fn not_like(path: impl Into<PropertyPath>, pattern: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::NotLike, Operand::Value(pattern.into()))
    }

    pub fn gt(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::GreaterThan, Operand::Value(value.into()))
    }

    pub fn gte(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::GreaterThanEqual, Operand::Value(value.into()))
    }

    pub fn lt(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::LessThan, Operand::Value(value.into()))
    }

    pub fn lte(path: impl Into<PropertyPath>, value: impl Into<FieldValue>) -> Self {
        Self::condition(path, Operator::LessThanEqual, Operand::Value(value.into()))
    }

    pub fn between(
        path: impl Into<PropertyPath>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::condition(path, Operator::Between, Operand::Range(low.into(), high.into()))
    }

    pub fn in_list(path: impl Into<PropertyPath>, values: Vec<FieldValue>) -> Self {
        Self::condition(path, Operator::In, Operand::List(values))
    }

    pub fn is_null(path: impl Into<PropertyPath>) -> Self {
        Self::condition(path, Operator::IsNull, Operand::None)
    }

    pub fn is_not_null(path: impl Into<PropertyPath>) -> Self {
        Self::condition(path, Operator::IsNotNull, Operand::None)
    }

    /// Conjunction; nested ANDs are flattened. Neither operand is mutated.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), right) => {
                left.push(right);
                Predicate::And(left)
            }
            (left, Predicate::And(mut right)) => {
                right.insert(0, left);
                Predicate::And(right)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    /// Disjunction; nested ORs are flattened. Neither operand is mutated.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), right) => {
                left.push(right);
                Predicate::Or(left)
            }
            (left, Predicate::Or(mut right)) => {
                right.insert(0, left);
                Predicate::Or(right)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    /// Negation; double negation cancels out
    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Combine a list with AND, collapsing the single-element case
    pub fn all_of(mut predicates: Vec<Predicate>) -> Option<Self> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::And(predicates)),
        }
    }

    /// Combine a list with OR, collapsing the single-element case
    pub fn any_of(mut predicates: Vec<Predicate>) -> Option<Self> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::Or(predicates)),
        }
    }

    /// Every leaf condition, depth first
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Predicate::Condition(c) => out.push(c),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_conditions(out);
                }
            }
            Predicate::Not(inner) => inner.collect_conditions(out),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }

        match self {
            Predicate::Condition(c) => write!(f, "{c}"),
            Predicate::And(children) => join(f, children, " and "),
            Predicate::Or(children) => join(f, children, " or "),
            Predicate::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

impl From<Condition> for Predicate {
    fn from(condition: Condition) -> Self {
        Predicate::Condition(condition)
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}
