//! Tests for repository configuration
//!
//! Covers loading YAML files, the settings that change how a repository is
//! built, and the registrations that must be rejected at build time.

mod repository_harness;

use finder::prelude::*;
use finder::repository::TemplateKey;
use finder::storage::InMemoryDataService;
use repository_harness::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn user_store() -> Arc<InMemoryDataService<User>> {
    Arc::new(InMemoryDataService::<User>::new())
}

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_from_yaml_file() {
    let file = write_yaml(
        r#"
strict: true
bulk_delete: per_entity
template_cache: repository
max_page_size: 2
named_queries:
  User.findInactive:
    query: "active = false"
"#,
    );

    let config = RepositoryConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert!(config.strict);
    assert_eq!(config.bulk_delete, BulkDeleteMode::PerEntity);
    assert_eq!(config.template_cache, CacheScope::Repository);
    assert_eq!(config.max_page_size, Some(2));

    let mut fixture = Fixture::empty_with(config);
    fixture.seed();

    let inactive = fixture.users.invoke_list("findInactive", &args![]).unwrap();
    assert_eq!(lastnames(&inactive), vec!["Matthews"]);

    let page = fixture
        .users
        .find_all_paged(Some(&PageRequest::of(0, 10).unwrap()))
        .unwrap();
    assert_eq!(page.size(), 2);
    assert_eq!(page.total_pages(), 2);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = RepositoryConfig::from_yaml_file("/nonexistent/finder-config.yaml");
    assert!(result.is_err());
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_yaml("strict: [not, a, bool]");
    assert!(RepositoryConfig::from_yaml_file(file.path().to_str().unwrap()).is_err());
}

// =============================================================================
// Template cache scope
// =============================================================================

#[test]
fn test_global_cache_is_shared() {
    let a = Repository::builder(user_store())
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .build()
        .unwrap();
    let b = Repository::builder(user_store())
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .build()
        .unwrap();

    assert!(Arc::ptr_eq(a.template_cache(), b.template_cache()));

    a.invoke_list("findByLastname", &args!["Gierke"]).unwrap();
    b.invoke_list("findByLastname", &args!["Gierke"]).unwrap();
    let key = TemplateKey::new(
        "User",
        MethodSignature::collection("findByLastname").param("lastname"),
    );
    assert!(b.template_cache().contains(&key));
}

#[test]
fn test_repository_cache_is_private() {
    let config = RepositoryConfig::default().with_template_cache(CacheScope::Repository);
    let a = Repository::builder(user_store())
        .config(config.clone())
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .build()
        .unwrap();
    let b = Repository::builder(user_store())
        .config(config)
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .build()
        .unwrap();

    assert!(!Arc::ptr_eq(a.template_cache(), b.template_cache()));

    a.invoke_list("findByLastname", &args!["Gierke"]).unwrap();
    a.invoke_list("findByLastname", &args!["Arrasz"]).unwrap();
    assert_eq!(a.template_cache().len(), 1);
    assert_eq!(a.template_cache().parse_count(), 1);
    assert!(b.template_cache().is_empty());
}

#[test]
fn test_strict_mode_parses_at_build() {
    let config = RepositoryConfig::default()
        .with_strict(true)
        .with_template_cache(CacheScope::Repository);
    let repository = Repository::builder(user_store())
        .config(config)
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .method(MethodSignature::count("countByActiveTrue"))
        .build()
        .unwrap();

    assert_eq!(repository.template_cache().len(), 2);
}

// =============================================================================
// Rejected registrations
// =============================================================================

#[test]
fn test_strict_mode_rejects_unresolvable_method() {
    let result = Repository::builder(user_store())
        .config(RepositoryConfig::default().with_strict(true))
        .method(MethodSignature::collection("findByNickname").param("nickname"))
        .build();

    let err = result.err().unwrap();
    assert_eq!(err.error_code(), "UNRESOLVABLE_PROPERTY");
    assert!(err.to_string().contains("Nickname"));
}

#[test]
fn test_lenient_mode_defers_the_failure() {
    let repository = Repository::builder(user_store())
        .config(RepositoryConfig::default().with_template_cache(CacheScope::Repository))
        .method(MethodSignature::collection("findByNickname").param("nickname"))
        .build()
        .unwrap();

    let err = repository
        .invoke_list("findByNickname", &args!["Ollie"])
        .unwrap_err();
    assert_eq!(err.error_code(), "UNRESOLVABLE_PROPERTY");
    assert!(repository.validate().is_err());
}

#[test]
fn test_duplicate_method_is_rejected() {
    let err = Repository::builder(user_store())
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .method(MethodSignature::optional("findByLastname").param("lastname"))
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_named_query_without_method_is_rejected() {
    let config = RepositoryConfig::default().with_named_query(
        "User",
        "findUndeclared",
        "lastname = ?1",
        ParamBindingMode::Positional,
    );
    let err = declare_user_methods(Repository::builder(user_store()))
        .config(config)
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.to_string().contains("User.findUndeclared"));
}

#[test]
fn test_named_queries_for_other_entities_are_ignored() {
    let config = RepositoryConfig::default().with_named_query(
        "Department",
        "findByName",
        "name = ?1",
        ParamBindingMode::Positional,
    );
    assert!(
        Repository::builder(user_store())
            .config(config)
            .build()
            .is_ok()
    );
}

#[test]
fn test_explicit_query_with_unknown_property_is_rejected() {
    let err = Repository::builder(user_store())
        .query(
            MethodSignature::collection("findByNick").param("nick"),
            "nickname = ?1",
            ParamBindingMode::Positional,
        )
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "UNRESOLVABLE_PROPERTY");
}

#[test]
fn test_explicit_query_binding_more_than_declared_is_rejected() {
    let err = Repository::builder(user_store())
        .query(
            MethodSignature::collection("findByBoth").param("lastname"),
            "lastname = ?1 and firstname = ?2",
            ParamBindingMode::Positional,
        )
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.to_string().contains("findByBoth"));
}

#[test]
fn test_malformed_explicit_query_is_rejected() {
    let err = Repository::builder(user_store())
        .query(
            MethodSignature::collection("findBroken").param("lastname"),
            "lastname = = ?1",
            ParamBindingMode::Positional,
        )
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "INVALID_QUERY");
}

#[test]
fn test_misplaced_special_parameter_is_rejected() {
    let err = Repository::builder(user_store())
        .method(
            MethodSignature::count("countByLastname")
                .param("lastname")
                .page_param(),
        )
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.to_string().contains("Pageable"));
}

#[test]
fn test_invalid_config_values_are_rejected() {
    let config = RepositoryConfig {
        max_page_size: Some(0),
        ..RepositoryConfig::default()
    };
    let err = Repository::builder(user_store())
        .config(config)
        .build()
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
}
