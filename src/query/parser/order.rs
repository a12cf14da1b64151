//! `OrderBy` clause parsing (`OrderByLastnameAscFirstnameDesc`)

use super::property::PropertyResolver;
use crate::core::error::ParseError;
use crate::query::sort::{Direction, Order, Sort};

const DIRECTIONS: &[(&str, Direction)] = &[("Desc", Direction::Desc), ("Asc", Direction::Asc)];

/// Parse the text following `OrderBy` into a sort
///
/// The clause splits after every `Asc`/`Desc` that is followed by an
/// uppercase letter. A chunk without a direction sorts ascending.
pub(crate) fn parse_order_clause(
    clause: &str,
    resolver: &PropertyResolver<'_>,
) -> Result<Sort, ParseError> {
    let invalid = || ParseError::InvalidOrderClause {
        method: resolver.method().to_string(),
        clause: clause.to_string(),
    };

    if clause.is_empty() {
        return Err(invalid());
    }

    let mut orders = Vec::new();
    for chunk in split_after_directions(clause) {
        let (property, direction) = DIRECTIONS
            .iter()
            .find_map(|(keyword, direction)| {
                chunk
                    .strip_suffix(keyword)
                    .filter(|p| !p.is_empty())
                    .map(|p| (p, *direction))
            })
            .unwrap_or((chunk, Direction::Asc));

        if !property.starts_with(char::is_uppercase) {
            return Err(invalid());
        }
        let path = resolver.resolve(property)?;
        orders.push(Order::new(direction, path.to_string()));
    }

    Ok(Sort::new(orders))
}

fn split_after_directions(clause: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;

    for (i, _) in clause.char_indices() {
        let rest = &clause[i..];
        for (keyword, _) in DIRECTIONS {
            if !rest.starts_with(keyword) {
                continue;
            }
            let end = i + keyword.len();
            if clause[end..].starts_with(char::is_uppercase) {
                chunks.push(&clause[start..end]);
                start = end;
            }
        }
    }

    chunks.push(&clause[start..]);
    chunks
}
