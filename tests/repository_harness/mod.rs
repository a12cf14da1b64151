//! Shared test harness for repository testing
//!
//! Provides the `User` and `Department` entities, the three reference users
//! and a `UserRepository` fixture declaring every derived, explicit and
//! custom method the repository tests exercise.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod repository_harness;
//! use repository_harness::*;
//! ```

#![allow(dead_code)]

use finder::prelude::*;
use finder::storage::InMemoryDataService;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

impl_entity!(Department, "Department", { name: String });

impl_entity!(
    User,
    "User",
    {
        firstname: Option<String>,
        lastname: Option<String>,
        email_address: Option<String>,
        age: i64,
        active: bool,
    },
    to_one { manager => "User", department => "Department" },
    to_many { colleagues => "User" },
);

/// Create an active user aged 28
pub fn user(firstname: &str, lastname: &str, email: &str) -> User {
    User::new(
        Some(firstname.to_string()),
        Some(lastname.to_string()),
        Some(email.to_string()),
        28,
        true,
    )
}

pub fn lastnames(users: &[User]) -> Vec<&str> {
    users
        .iter()
        .map(|u| u.lastname.as_deref().unwrap_or("<null>"))
        .collect()
}

/// Lastnames in alphabetical order, for results without a defined order
pub fn sorted_lastnames(users: &[User]) -> Vec<&str> {
    let mut names = lastnames(users);
    names.sort_unstable();
    names
}

pub fn firstnames(users: &[User]) -> Vec<&str> {
    users
        .iter()
        .map(|u| u.firstname.as_deref().unwrap_or("<null>"))
        .collect()
}

// ---------------------------------------------------------------------------
// Repository declaration
// ---------------------------------------------------------------------------

/// Every method the `User` repository declares
pub fn declare_user_methods(definition: RepositoryDefinition<User>) -> RepositoryDefinition<User> {
    definition
        .entity(Department::metadata())
        // Derived
        .method(MethodSignature::collection("findByLastname").param("lastname"))
        .method(MethodSignature::optional("findByEmailAddress").param("emailAddress"))
        .method(MethodSignature::optional("findByFirstname").param("firstname"))
        .method(
            MethodSignature::collection("findByFirstnameOrLastname")
                .params(&["firstname", "lastname"]),
        )
        .method(
            MethodSignature::collection("findByLastnameOrderByFirstnameAsc").param("lastname"),
        )
        .method(
            MethodSignature::collection("findByFirstnameLike")
                .param("firstname")
                .sort_param(),
        )
        .method(MethodSignature::collection("findByFirstnameNotLike").param("firstname"))
        .method(MethodSignature::collection("findByLastnameNot").param("lastname"))
        .method(MethodSignature::collection("findByFirstnameIgnoreCase").param("firstname"))
        .method(MethodSignature::collection("findByLastnameIn").param("lastnames"))
        .method(MethodSignature::collection("findByAgeBetween").params(&["from", "to"]))
        .method(MethodSignature::collection("findByAgeGreaterThanEqual").param("age"))
        .method(MethodSignature::collection("findByActiveFalse"))
        .method(MethodSignature::collection("findByEmailAddressIsNull"))
        .method(MethodSignature::collection("findByManagerLastname").param("lastname"))
        .method(MethodSignature::collection("findByManager").param("manager"))
        .method(MethodSignature::collection("findByColleaguesLastname").param("lastname"))
        .method(MethodSignature::collection("findByDepartmentName").param("name"))
        .method(MethodSignature::collection("findTop2ByOrderByAgeDesc"))
        .method(MethodSignature::optional("findFirstByLastname").param("lastname"))
        .method(
            MethodSignature::page("findAllByLastname")
                .param("lastname")
                .page_param(),
        )
        .method(MethodSignature::collection("findInactive"))
        .method(MethodSignature::count("countByLastname").param("lastname"))
        .method(MethodSignature::exists("existsByEmailAddress").param("emailAddress"))
        .method(MethodSignature::modifying("deleteByLastname").param("lastname"))
        // Explicit
        .query(
            MethodSignature::modifying("renameAllUsersTo").param("lastname"),
            "update set lastname = ?1",
            ParamBindingMode::Positional,
        )
        .query(
            MethodSignature::count("countWithFirstname").param("firstname"),
            "firstname = ?1",
            ParamBindingMode::Positional,
        )
        .query(
            MethodSignature::collection("findByLastnameOrFirstnameNamed")
                .params(&["lastname", "firstname"]),
            "lastname = :lastname or firstname = :firstname order by firstname desc",
            ParamBindingMode::Named,
        )
        .query(
            MethodSignature::page("findByLastnameGrouped").page_param(),
            "select lastname group by lastname",
            ParamBindingMode::Positional,
        )
        .query(
            MethodSignature::collection("findDistinctManagerLastnames"),
            "select manager.lastname group by manager.lastname order by manager.lastname",
            ParamBindingMode::Positional,
        )
        .query(
            MethodSignature::optional("findByAnnotatedQuery").param("emailAddress"),
            "where email_address = ?1",
            ParamBindingMode::Positional,
        )
        // Custom
        .custom(MethodSignature::optional("findOldest"), |service, _args| {
            let oldest = service.execute_query(
                &SelectQuery::default()
                    .sorted(Sort::desc("age"))
                    .windowed(Some(finder::query::QueryWindow::limit(1))),
            )?;
            Ok(Outcome::Entity(oldest.into_iter().next()))
        })
}

/// Named queries shipped in the fixture config
pub fn user_config() -> RepositoryConfig {
    RepositoryConfig::default()
        .with_template_cache(CacheScope::Repository)
        .with_named_query("User", "findInactive", "active = false", ParamBindingMode::Positional)
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Repositories over fresh in-memory stores plus the three reference users
pub struct Fixture {
    pub users: Repository<User>,
    pub departments: Repository<Department>,
    pub user_store: InMemoryDataService<User>,
    pub first: User,
    pub second: User,
    pub third: User,
}

impl Fixture {
    /// Empty stores, default fixture config
    pub fn empty() -> Self {
        Self::empty_with(user_config())
    }

    pub fn empty_with(config: RepositoryConfig) -> Self {
        init_tracing();

        let department_store = InMemoryDataService::<Department>::new();
        let user_store =
            InMemoryDataService::<User>::new().with_linked(Arc::new(department_store.clone()));

        let users = declare_user_methods(Repository::builder(Arc::new(user_store.clone())))
            .config(config)
            .build()
            .expect("user repository must build");
        let departments = Repository::builder(Arc::new(department_store))
            .method(MethodSignature::optional("findByName").param("name"))
            .build()
            .expect("department repository must build");

        Self {
            users,
            departments,
            user_store,
            first: user("Oliver", "Gierke", "gierke@synyx.de"),
            second: user("Joachim", "Arrasz", "arrasz@synyx.de"),
            third: user("Dave", "Matthews", "no@email.com"),
        }
    }

    /// Stores seeded with the three reference users
    ///
    /// Ages are 28, 35 and 43; Dave is the only inactive user.
    pub fn seeded() -> Self {
        let mut fixture = Self::empty();
        fixture.seed();
        fixture
    }

    pub fn seed(&mut self) {
        self.second.age = 35;
        self.third.age = 43;
        self.third.active = false;
        self.first = self.users.save(self.first.clone()).unwrap();
        self.second = self.users.save(self.second.clone()).unwrap();
        self.third = self.users.save(self.third.clone()).unwrap();
    }
}

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
