//! Query model: predicates, specifications, sorting, paging and parsers

pub mod eval;
pub mod explicit;
pub mod page;
pub mod parser;
pub mod predicate;
pub mod sort;
pub mod specification;

pub use eval::{Matcher, like_to_regex};
pub use explicit::{BoundStatement, ExplicitQuery, ParamBindingMode};
pub use page::{Page, PageRequest, PaginatedResponse, PaginationMeta, QueryWindow};
pub use parser::{MethodTemplate, PartTemplate, QueryAction};
pub use predicate::{Condition, Operand, Operator, Predicate, PropertyPath};
pub use sort::{Direction, Order, Sort};
pub use specification::Specification;
