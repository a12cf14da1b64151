//! Specification composer
//!
//! A [`Specification`] wraps an optional predicate built by the caller. An
//! empty specification means "no filter". Composition never mutates an
//! operand; each combinator consumes its inputs and returns a new value, so
//! reuse requires an explicit `clone()`.
//!
//! ```rust,ignore
//! let spec = Specification::matching(Predicate::eq("firstname", "Oliver"))
//!     .or(Predicate::eq("lastname", "Arrasz"));
//! let users = repository.find_all_by_spec(Some(&spec))?;
//! ```

use crate::query::predicate::Predicate;
use std::ops::{BitAnd, BitOr, Not};

/// Composable, immutable filter over entities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    predicate: Option<Predicate>,
}

impl Specification {
    /// The unrestricted specification
    pub fn all() -> Self {
        Self::default()
    }

    /// Start from a predicate
    pub fn matching(predicate: impl Into<Predicate>) -> Self {
        Self {
            predicate: Some(predicate.into()),
        }
    }

    /// Start from an optional specification; `None` is unrestricted
    pub fn where_(spec: Option<Specification>) -> Self {
        spec.unwrap_or_default()
    }

    /// Both must hold. An unrestricted side is ignored.
    pub fn and(self, other: impl Into<Specification>) -> Self {
        self.combine(other.into(), Predicate::and)
    }

    /// Either may hold. An unrestricted side is ignored.
    pub fn or(self, other: impl Into<Specification>) -> Self {
        self.combine(other.into(), Predicate::or)
    }

    /// Negation of a specification; negating "no filter" leaves it unrestricted
    pub fn not(spec: impl Into<Specification>) -> Self {
        Self {
            predicate: spec.into().predicate.map(Predicate::negate),
        }
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn into_predicate(self) -> Option<Predicate> {
        self.predicate
    }

    pub fn is_unrestricted(&self) -> bool {
        self.predicate.is_none()
    }

    fn combine(self, other: Specification, op: fn(Predicate, Predicate) -> Predicate) -> Self {
        let predicate = match (self.predicate, other.predicate) {
            (Some(left), Some(right)) => Some(op(left, right)),
            (left, right) => left.or(right),
        };
        Self { predicate }
    }
}

impl From<Predicate> for Specification {
    fn from(predicate: Predicate) -> Self {
        Self::matching(predicate)
    }
}

impl From<Option<Predicate>> for Specification {
    fn from(predicate: Option<Predicate>) -> Self {
        Self { predicate }
    }
}

impl BitAnd for Specification {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Specification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Specification {
    type Output = Self;

    fn not(self) -> Self::Output {
        Specification::not(self)
    }
}
