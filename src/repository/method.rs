//! Declared repository method signatures

use std::fmt;

/// What a formal parameter carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// A value bound to the method's criteria
    Value,
    /// An optional [`Sort`](crate::query::Sort)
    Sort,
    /// An optional [`PageRequest`](crate::query::PageRequest)
    Pageable,
}

/// Declared result shape of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// One entity, or none when nothing matches
    Single,
    /// An optional entity
    Optional,
    /// Every matching entity
    Collection,
    /// One page of matching entities plus totals
    Page,
    /// Number of matching rows
    Count,
    /// Whether any row matches
    Exists,
    /// Bulk update/delete; yields the affected row count
    Modifying,
}

impl ReturnShape {
    /// Shapes that expect at most one row
    pub fn is_single(self) -> bool {
        matches!(self, ReturnShape::Single | ReturnShape::Optional)
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnShape::Single => "single",
            ReturnShape::Optional => "optional",
            ReturnShape::Collection => "collection",
            ReturnShape::Page => "page",
            ReturnShape::Count => "count",
            ReturnShape::Exists => "exists",
            ReturnShape::Modifying => "modifying",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
}

/// Name, formal parameters and return shape of a repository method
///
/// ```rust,ignore
/// let signature = MethodSignature::collection("findByEmailAddressLike")
///     .param("emailAddress")
///     .sort_param();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    name: String,
    parameters: Vec<Parameter>,
    returns: ReturnShape,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, returns: ReturnShape) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns,
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Single)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Optional)
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Collection)
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Page)
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Count)
    }

    pub fn exists(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Exists)
    }

    pub fn modifying(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Modifying)
    }

    /// Add a value parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            kind: ParamKind::Value,
        });
        self
    }

    /// Add several value parameters
    pub fn params(self, names: &[&str]) -> Self {
        names.iter().fold(self, |signature, name| signature.param(*name))
    }

    /// Add a trailing sort parameter
    pub fn sort_param(mut self) -> Self {
        self.parameters.push(Parameter {
            name: "sort".to_string(),
            kind: ParamKind::Sort,
        });
        self
    }

    /// Add a trailing page request parameter
    pub fn page_param(mut self) -> Self {
        self.parameters.push(Parameter {
            name: "pageable".to_string(),
            kind: ParamKind::Pageable,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Number of value parameters
    pub fn value_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.kind == ParamKind::Value)
            .count()
    }

    /// Names of the value parameters in declaration order
    pub fn value_names(&self) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| p.kind == ParamKind::Value)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Sort or page parameter, if the method declares one
    pub fn special_param(&self) -> Option<ParamKind> {
        self.parameters
            .last()
            .map(|p| p.kind)
            .filter(|kind| *kind != ParamKind::Value)
    }

    /// Check the parameter list is well formed
    ///
    /// At most one sort or page parameter is allowed and it must be last. A
    /// page parameter requires a page or collection result.
    pub fn validate(&self) -> Result<(), String> {
        let specials = self
            .parameters
            .iter()
            .filter(|p| p.kind != ParamKind::Value)
            .count();
        if specials > 1 || (specials == 1 && self.special_param().is_none()) {
            return Err(format!(
                "Method '{}' must declare at most one Sort or Pageable parameter, as its last parameter",
                self.name
            ));
        }
        if self.special_param() == Some(ParamKind::Pageable)
            && !matches!(self.returns, ReturnShape::Page | ReturnShape::Collection)
        {
            return Err(format!(
                "Method '{}' takes a Pageable but returns {}",
                self.name, self.returns
            ));
        }
        Ok(())
    }
}
