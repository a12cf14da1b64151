//! Sort specifications

use crate::core::metadata::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `asc`/`desc`, ignoring case
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn is_ascending(self) -> bool {
        self == Direction::Asc
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    /// Dotted property path (e.g. `manager.lastname`)
    pub property: String,
    pub direction: Direction,
    #[serde(default)]
    pub ignore_case: bool,
}

impl Order {
    pub fn new(direction: Direction, property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(Direction::Asc, property)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(Direction::Desc, property)
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Whether both orders sort on the same property
    pub fn same_property(&self, other: &Order) -> bool {
        normalize(&self.property) == normalize(&other.property)
    }
}

/// Ordered sequence of sort keys; the first entry is the primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// No ordering at all
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Sort the given properties in one direction
    pub fn by(direction: Direction, properties: &[&str]) -> Self {
        Self {
            orders: properties
                .iter()
                .map(|p| Order::new(direction, *p))
                .collect(),
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(vec![Order::asc(property)])
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(vec![Order::desc(property)])
    }

    /// Append the orders of `other`
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// The order for a property, if this sort mentions it
    pub fn order_for(&self, property: &str) -> Option<&Order> {
        let key = normalize(property);
        self.orders.iter().find(|o| normalize(&o.property) == key)
    }

    /// Every order with its direction flipped
    pub fn reversed(&self) -> Self {
        Self {
            orders: self
                .orders
                .iter()
                .map(|o| Order {
                    direction: o.direction.reverse(),
                    ..o.clone()
                })
                .collect(),
        }
    }

    /// Merge an explicitly passed sort into one parsed from a method name
    ///
    /// Parsed keys keep their position. A parsed key that the explicit sort
    /// also names takes the explicit direction. Explicit keys not already
    /// present are appended in their own order.
    pub fn merge(&self, explicit: &Sort) -> Self {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|parsed| {
                explicit
                    .orders
                    .iter()
                    .find(|o| o.same_property(parsed))
                    .cloned()
                    .unwrap_or_else(|| parsed.clone())
            })
            .collect();
        for order in &explicit.orders {
            if !orders.iter().any(|o| o.same_property(order)) {
                orders.push(order.clone());
            }
        }
        Self { orders }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.orders.is_empty() {
            return f.write_str("UNSORTED");
        }
        let parts: Vec<String> = self
            .orders
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{}: {}", o.property, dir)
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl From<Order> for Sort {
    fn from(order: Order) -> Self {
        Self::new(vec![order])
    }
}
