//! Field value types and comparison rules

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
///
/// Every scalar attribute exposed by an [`Entity`](crate::core::Entity) is
/// surfaced as a `FieldValue`, and every bound argument of a derived query is
/// one as well. `Null` follows SQL semantics: it never compares equal to
/// anything, including another `Null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a boolean if possible
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Null => "null",
        }
    }

    /// Compare two non-null values of compatible types
    ///
    /// Integers and floats compare numerically. A UUID compares against its
    /// string rendering so that ids can be bound from text. Returns `None`
    /// when either side is `Null` or the types are incompatible.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::String(b)) => {
                Uuid::parse_str(b).ok().map(|b| a.cmp(&b))
            }
            (FieldValue::String(a), FieldValue::Uuid(b)) => {
                Uuid::parse_str(a).ok().map(|a| a.cmp(b))
            }
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL equality: false whenever either side is null
    pub fn sql_eq(&self, other: &FieldValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Total order used for sorting result sets
    ///
    /// Nulls sort first. Values of unrelated types are grouped by variant so
    /// the order stays deterministic.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }

    /// Lowercase string values; other variants are returned unchanged
    pub fn to_lowercase(&self) -> FieldValue {
        match self {
            FieldValue::String(s) => FieldValue::String(s.to_lowercase()),
            other => other.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Boolean(_) => 1,
            FieldValue::Integer(_) | FieldValue::Float(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::Uuid(_) => 4,
            FieldValue::DateTime(_) => 5,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::from)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::String)
    }
}

impl From<Option<Uuid>> for FieldValue {
    fn from(value: Option<Uuid>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Uuid)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Integer)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Float)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Boolean)
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::DateTime)
    }
}

/// Conversion back from a [`FieldValue`] into a typed attribute
///
/// Used by generated entities to apply bulk updates. `Option<T>` accepts
/// `Null`; plain types reject it.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Result<Self>;
}

macro_rules! from_field_value {
    ($ty:ty, $name:literal, $($pattern:pat => $out:expr),+ $(,)?) => {
        impl FromFieldValue for $ty {
            fn from_field_value(value: FieldValue) -> Result<Self> {
                match value {
                    $($pattern => Ok($out),)+
                    other => Err(anyhow!(
                        "Cannot assign a {} value to a {} attribute",
                        other.type_name(),
                        $name
                    )),
                }
            }
        }

        impl FromFieldValue for Option<$ty> {
            fn from_field_value(value: FieldValue) -> Result<Self> {
                match value {
                    FieldValue::Null => Ok(None),
                    other => <$ty>::from_field_value(other).map(Some),
                }
            }
        }
    };
}

from_field_value!(String, "string", FieldValue::String(s) => s);
from_field_value!(i64, "integer", FieldValue::Integer(i) => i);
from_field_value!(
    f64,
    "float",
    FieldValue::Float(f) => f,
    FieldValue::Integer(i) => i as f64,
);
from_field_value!(bool, "boolean", FieldValue::Boolean(b) => b);
from_field_value!(Uuid, "uuid", FieldValue::Uuid(u) => u);
from_field_value!(DateTime<Utc>, "datetime", FieldValue::DateTime(d) => d);
