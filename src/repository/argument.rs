//! Runtime arguments of a repository call

use crate::core::field::FieldValue;
use crate::query::page::PageRequest;
use crate::query::predicate::Operand;
use crate::query::sort::Sort;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One runtime argument
///
/// `Value(FieldValue::Null)` is the null argument. Sort and page arguments
/// are optional; `None` means "no sort" / "no paging".
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(FieldValue),
    List(Vec<FieldValue>),
    Sort(Option<Sort>),
    Page(Option<PageRequest>),
}

impl Argument {
    pub fn value(value: impl Into<FieldValue>) -> Self {
        Argument::Value(value.into())
    }

    pub fn null() -> Self {
        Argument::Value(FieldValue::Null)
    }

    pub fn list<V: Into<FieldValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Argument::List(values.into_iter().map(Into::into).collect())
    }

    pub fn sort(sort: Option<Sort>) -> Self {
        Argument::Sort(sort)
    }

    pub fn page(page: Option<PageRequest>) -> Self {
        Argument::Page(page)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Argument::Value(_) => "value",
            Argument::List(_) => "list",
            Argument::Sort(_) => "sort",
            Argument::Page(_) => "page request",
        }
    }

    /// The operand form of a value or list argument
    pub(crate) fn as_operand(&self) -> Option<Operand> {
        match self {
            Argument::Value(v) => Some(Operand::Value(v.clone())),
            Argument::List(values) => Some(Operand::List(values.clone())),
            _ => None,
        }
    }
}

macro_rules! value_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::Value(FieldValue::from(value))
                }
            }
        )*
    };
}

value_argument!(
    FieldValue,
    &str,
    String,
    i64,
    i32,
    f64,
    bool,
    Uuid,
    DateTime<Utc>,
    Option<&str>,
    Option<String>,
    Option<Uuid>,
);

impl From<Vec<FieldValue>> for Argument {
    fn from(values: Vec<FieldValue>) -> Self {
        Argument::List(values)
    }
}

impl From<Sort> for Argument {
    fn from(sort: Sort) -> Self {
        Argument::Sort(Some(sort))
    }
}

impl From<PageRequest> for Argument {
    fn from(page: PageRequest) -> Self {
        Argument::Page(Some(page))
    }
}

/// Build a `Vec<Argument>` from values, sorts and page requests
///
/// ```rust,ignore
/// let users = repository.invoke_list("findByLastname", &args!["Gierke"])?;
/// let page = repository.invoke_page("findByLastname", &args!["Gierke", PageRequest::of(0, 10)?])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::repository::Argument>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::repository::Argument::from($arg)),+]
    };
}
