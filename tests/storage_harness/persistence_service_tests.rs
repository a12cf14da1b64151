//! Macro-generated test suite for `PersistenceService<Contact>` contract validation.
//!
//! The `persistence_service_tests!` macro generates a test module that
//! validates any `PersistenceService<Contact>` implementation against the full
//! contract: CRUD operations, filtering across all `FieldValue` variants,
//! ordering, windows, bulk operations and concurrent access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use finder::storage::InMemoryDataService;
//!
//! persistence_service_tests!(InMemoryDataService::<Contact>::new());
//! ```
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_save_and_find`: save then retrieve, verify all fields
//! - `test_find_nonexistent`: find with random UUID returns None
//! - `test_query_empty`: unfiltered query on empty store returns empty vec
//! - `test_save_overwrites`: saving an existing id replaces the entity
//! - `test_delete_existing` / `test_delete_nonexistent`
//!
//! ## Filtering
//! - one test per `FieldValue` variant, plus null, like and no-match cases
//! - `test_traversal_is_inner_join`: conditions on a missing reference never match
//!
//! ## Ordering and windows
//! - `test_sort_and_window`, `test_count_matches_query`
//!
//! ## Bulk operations
//! - `test_bulk_update`, `test_bulk_delete`
//!
//! ## Edge Cases
//! - `test_concurrent_access`: parallel saves from spawned threads

/// Generate a full `PersistenceService<Contact>` conformance test suite.
///
/// `$factory` must be an expression that evaluates to an instance implementing
/// `PersistenceService<Contact>`. It is re-evaluated for each test to ensure
/// isolation. For the concurrent access test, the returned service must also
/// implement `Clone + 'static` (shared state via Arc pattern).
#[macro_export]
macro_rules! persistence_service_tests {
    ($factory:expr) => {
        mod persistence_service_contract_tests {
            use super::*;
            use finder::core::entity::Entity;
            use finder::core::field::FieldValue;
            use finder::core::service::{Mutation, PersistenceService, SelectQuery};
            use finder::query::{Predicate, QueryWindow, Sort};
            use uuid::Uuid;

            fn filtered(predicate: Predicate) -> SelectQuery {
                SelectQuery::new(Some(predicate))
            }

            // ==================================================================
            // CRUD: Save & Find
            // ==================================================================

            #[test]
            fn test_save_and_find() {
                let service = $factory;
                let contact = create_contact("Alice", "alice@test.com", 30, 4.5, true);
                let original_id = contact.id;

                let saved = service.save(contact.clone()).unwrap();
                assert_eq!(saved.id(), original_id);
                assert_eq!(saved, contact);

                let retrieved = service.find_by_id(&original_id).unwrap();
                assert_eq!(retrieved, Some(contact));
            }

            #[test]
            fn test_find_nonexistent() {
                let service = $factory;
                let result = service.find_by_id(&Uuid::new_v4()).unwrap();
                assert!(result.is_none(), "Finding a nonexistent entity should return None");
            }

            #[test]
            fn test_query_empty() {
                let service = $factory;
                let all = service.execute_query(&SelectQuery::default()).unwrap();
                assert!(all.is_empty(), "Query on empty store should return empty vec");
                assert_eq!(service.execute_count(None).unwrap(), 0);
            }

            #[test]
            fn test_save_overwrites() {
                let service = $factory;
                let id = Uuid::new_v4();
                service
                    .save(create_contact_with_id(id, "First", "first@test.com", 20, 1.0, true))
                    .unwrap();
                service
                    .save(create_contact_with_id(id, "Second", "second@test.com", 30, 2.0, false))
                    .unwrap();

                let retrieved = service.find_by_id(&id).unwrap().unwrap();
                assert_eq!(retrieved.name, "Second");
                assert_eq!(service.execute_count(None).unwrap(), 1);
            }

            #[test]
            fn test_delete_existing() {
                let service = $factory;
                let contact = service
                    .save(create_contact("ToDelete", "delete@test.com", 40, 1.0, true))
                    .unwrap();

                service.delete(&contact).unwrap();
                assert!(service.find_by_id(&contact.id).unwrap().is_none());
            }

            #[test]
            fn test_delete_nonexistent() {
                let service = $factory;
                service.delete_by_id(&Uuid::new_v4()).unwrap();
            }

            // ==================================================================
            // Filtering: one FieldValue variant each
            // ==================================================================

            #[test]
            fn test_filter_string_field() {
                let service = $factory;
                for contact in sample_batch(4) {
                    service.save(contact).unwrap();
                }

                let found = service
                    .execute_query(&filtered(Predicate::eq("email", "contact_2@test.com")))
                    .unwrap();
                assert_eq!(names(&found), vec!["Contact_02"]);
                assert_field_value_string(
                    &found[0].field_value("email").unwrap(),
                    "contact_2@test.com",
                );
            }

            #[test]
            fn test_filter_integer_field() {
                let service = $factory;
                for contact in sample_batch(4) {
                    service.save(contact).unwrap();
                }

                let found = service
                    .execute_query(&filtered(Predicate::gt("age", 21)))
                    .unwrap();
                assert_eq!(sorted_names(&found), vec!["Contact_02", "Contact_03"]);
                let second = found.iter().find(|c| c.name == "Contact_02").unwrap();
                assert_field_value_integer(&second.field_value("age").unwrap(), 22);
            }

            #[test]
            fn test_filter_float_field() {
                let service = $factory;
                for contact in sample_batch(4) {
                    service.save(contact).unwrap();
                }

                let found = service
                    .execute_query(&filtered(Predicate::between("score", 1.0, 4.0)))
                    .unwrap();
                assert_eq!(sorted_names(&found), vec!["Contact_01", "Contact_02"]);
            }

            #[test]
            fn test_filter_boolean_field() {
                let service = $factory;
                for contact in sample_batch(5) {
                    service.save(contact).unwrap();
                }

                let active = service
                    .execute_query(&filtered(Predicate::eq("active", true)))
                    .unwrap();
                assert_eq!(active.len(), 3, "Should find 3 active contacts");
                assert!(active.iter().all(|c| c.active));
            }

            #[test]
            fn test_filter_uuid_and_datetime_fields() {
                let service = $factory;
                let batch = sample_batch(3);
                let target = batch[1].clone();
                for contact in batch {
                    service.save(contact).unwrap();
                }

                let by_id = service
                    .execute_query(&filtered(Predicate::eq("id", target.id)))
                    .unwrap();
                assert_eq!(by_id, vec![target.clone()]);

                let joined_later = service
                    .execute_query(&filtered(Predicate::gte("joined_at", target.joined_at)))
                    .unwrap();
                assert_eq!(sorted_names(&joined_later), vec!["Contact_01", "Contact_02"]);
            }

            #[test]
            fn test_filter_null_and_like() {
                let service = $factory;
                let mut silent = create_contact("Silent", "unused@test.com", 50, 0.0, true);
                silent.email = None;
                service.save(silent).unwrap();
                for contact in sample_batch(2) {
                    service.save(contact).unwrap();
                }

                let without_email = service
                    .execute_query(&filtered(Predicate::is_null("email")))
                    .unwrap();
                assert_eq!(names(&without_email), vec!["Silent"]);

                // Null never equals anything, itself included
                let equal_to_null = service
                    .execute_query(&filtered(Predicate::ne("email", "contact_0@test.com")))
                    .unwrap();
                assert_eq!(names(&equal_to_null), vec!["Contact_01"]);

                let like = service
                    .execute_query(&filtered(Predicate::like("email", "contact_%@test.com")))
                    .unwrap();
                assert_count(&like, 2);
            }

            #[test]
            fn test_filter_no_results() {
                let service = $factory;
                service
                    .save(create_contact("Alice", "alice@test.com", 25, 4.0, true))
                    .unwrap();

                let results = service
                    .execute_query(&filtered(Predicate::eq("email", "nonexistent@nowhere.com")))
                    .unwrap();
                assert!(results.is_empty());
            }

            #[test]
            fn test_traversal_is_inner_join() {
                let service = $factory;
                let referrer = service
                    .save(create_contact("Referrer", "r@test.com", 30, 1.0, true))
                    .unwrap();
                let mut referred = create_contact("Referred", "d@test.com", 31, 1.0, true);
                referred.referrer = Some(referrer.id);
                service.save(referred).unwrap();

                let found = service
                    .execute_query(&filtered(Predicate::eq("referrer.name", "Referrer")))
                    .unwrap();
                assert_eq!(names(&found), vec!["Referred"]);

                let found = service
                    .execute_query(&filtered(Predicate::ne("referrer.name", "Nobody")))
                    .unwrap();
                assert_eq!(names(&found), vec!["Referred"]);
            }

            // ==================================================================
            // Ordering and windows
            // ==================================================================

            #[test]
            fn test_sort_and_window() {
                let service = $factory;
                for contact in sample_batch(6) {
                    service.save(contact).unwrap();
                }

                let query = SelectQuery::default()
                    .sorted(Sort::desc("name"))
                    .windowed(Some(QueryWindow {
                        offset: 2,
                        limit: Some(3),
                    }));
                let page = service.execute_query(&query).unwrap();
                assert_eq!(names(&page), vec!["Contact_03", "Contact_02", "Contact_01"]);

                let past_end = service
                    .execute_query(&SelectQuery::default().windowed(Some(QueryWindow {
                        offset: 10,
                        limit: Some(3),
                    })))
                    .unwrap();
                assert!(past_end.is_empty());
            }

            #[test]
            fn test_count_matches_query() {
                let service = $factory;
                for contact in sample_batch(7) {
                    service.save(contact).unwrap();
                }

                let predicate = Predicate::eq("active", false).or(Predicate::lt("age", 21));
                let rows = service.execute_query(&filtered(predicate.clone())).unwrap();
                let count = service.execute_count(Some(&predicate)).unwrap();
                assert_eq!(rows.len() as u64, count);
                assert_eq!(count, 4);
            }

            // ==================================================================
            // Bulk operations
            // ==================================================================

            #[test]
            fn test_bulk_update() {
                let service = $factory;
                for contact in sample_batch(4) {
                    service.save(contact).unwrap();
                }

                let affected = service
                    .execute_bulk_update(
                        Some(&Predicate::eq("active", false)),
                        &Mutation::new().set("score", 9.5).set("email", FieldValue::Null),
                    )
                    .unwrap();
                assert_eq!(affected, 2);

                let updated = service
                    .execute_query(&filtered(Predicate::eq("score", 9.5)))
                    .unwrap();
                assert_eq!(sorted_names(&updated), vec!["Contact_01", "Contact_03"]);
                assert!(updated.iter().all(|c| c.email.is_none()));
            }

            #[test]
            fn test_bulk_delete() {
                let service = $factory;
                for contact in sample_batch(4) {
                    service.save(contact).unwrap();
                }

                let removed = service
                    .execute_bulk_delete(Some(&Predicate::eq("active", true)))
                    .unwrap();
                assert_eq!(removed, 2);
                assert_eq!(service.execute_count(None).unwrap(), 2);

                let removed = service.execute_bulk_delete(None).unwrap();
                assert_eq!(removed, 2);
                assert_eq!(service.execute_count(None).unwrap(), 0);
            }

            // ==================================================================
            // Edge case: Concurrent access
            // ==================================================================

            /// Parallel saves from spawned threads.
            ///
            /// Requires the service to be `Clone + Send + 'static` (which is the
            /// standard pattern: Clone shares the backing store via Arc).
            #[test]
            fn test_concurrent_access() {
                let service = $factory;
                let handles: Vec<_> = sample_batch(8)
                    .into_iter()
                    .map(|contact| {
                        let service = service.clone();
                        std::thread::spawn(move || service.save(contact).map(|c| c.id))
                    })
                    .collect();

                let ids: Vec<Uuid> = handles
                    .into_iter()
                    .map(|h| h.join().unwrap().unwrap())
                    .collect();

                let all = service.execute_query(&SelectQuery::default()).unwrap();
                assert_eq!(all.len(), 8, "All concurrently saved contacts should be present");
                assert!(ids.iter().all(|id| all.iter().any(|c| c.id == *id)));
            }
        }
    };
}
