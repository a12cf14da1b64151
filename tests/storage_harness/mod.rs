//! Shared test harness for persistence backend testing
//!
//! Provides `Contact`, an entity with fields covering all `FieldValue`
//! variants plus a self reference, and helper functions for creating test
//! data. `persistence_service_tests!` turns any backend into a full contract
//! suite.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod persistence_service_tests;

use chrono::{DateTime, TimeZone, Utc};
use finder::impl_entity;
use finder::core::field::FieldValue;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Contact: covers all FieldValue variants for thorough testing
// ---------------------------------------------------------------------------

impl_entity!(
    Contact,
    "Contact",
    {
        name: String,
        email: Option<String>,
        age: i64,
        score: f64,
        active: bool,
        joined_at: DateTime<Utc>,
    },
    to_one { referrer => "Contact" },
);

// ---------------------------------------------------------------------------
// Helper functions: Contact creation
// ---------------------------------------------------------------------------

/// Create a `Contact` with a random ID, joined on the 1st of January 2024
/// plus `age` days.
pub fn create_contact(name: &str, email: &str, age: i64, score: f64, active: bool) -> Contact {
    let joined_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
        + chrono::Duration::days(age);
    Contact::new(
        name.to_string(),
        Some(email.to_string()),
        age,
        score,
        active,
        joined_at,
    )
}

/// Create a `Contact` with a specific ID for deterministic testing.
pub fn create_contact_with_id(
    id: Uuid,
    name: &str,
    email: &str,
    age: i64,
    score: f64,
    active: bool,
) -> Contact {
    Contact {
        id,
        ..create_contact(name, email, age, score, active)
    }
}

/// Generate a batch of `n` diverse contacts with varied field values.
///
/// Useful for list/pagination/search testing. Each contact has a unique name
/// and varied age/score/active values.
pub fn sample_batch(n: usize) -> Vec<Contact> {
    (0..n)
        .map(|i| {
            create_contact(
                &format!("Contact_{:02}", i),
                &format!("contact_{}@test.com", i),
                (20 + i as i64) % 100, // ages: 20, 21, 22, ..., wraps at 100
                (i as f64) * 1.5 + 0.5, // scores: 0.5, 2.0, 3.5, 5.0, ...
                i % 2 == 0,            // alternating active: true, false, true, ...
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Assertions helpers
// ---------------------------------------------------------------------------

pub fn names(contacts: &[Contact]) -> Vec<&str> {
    contacts.iter().map(|c| c.name.as_str()).collect()
}

/// Names in alphabetical order, for unsorted query results
pub fn sorted_names(contacts: &[Contact]) -> Vec<&str> {
    let mut names = names(contacts);
    names.sort_unstable();
    names
}

/// Assert that a list contains exactly `n` entities.
pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}

/// Assert that a `FieldValue` holds the expected string.
pub fn assert_field_value_string(fv: &FieldValue, expected: &str) {
    match fv {
        FieldValue::String(s) => assert_eq!(s, expected),
        other => panic!("Expected FieldValue::String(\"{}\"), got {:?}", expected, other),
    }
}

pub fn assert_field_value_integer(fv: &FieldValue, expected: i64) {
    match fv {
        FieldValue::Integer(i) => assert_eq!(*i, expected),
        other => panic!("Expected FieldValue::Integer({}), got {:?}", expected, other),
    }
}
