//! Macros for reducing boilerplate when defining entities
//!
//! `impl_entity!` generates the struct, its [`Entity`](crate::core::Entity)
//! implementation and the attribute metadata from a single declaration.

/// Declare an entity type with scalar and reference attributes
///
/// Scalars become public fields of the declared type. A to-one reference
/// becomes an `Option<Uuid>` field, a to-many reference a `Vec<Uuid>`.
/// Every entity also gets an `id: Uuid` field.
///
/// # Example
/// ```rust,ignore
/// use finder::prelude::*;
///
/// impl_entity!(
///     User,
///     "User",
///     {
///         firstname: Option<String>,
///         lastname: Option<String>,
///         age: i64,
///     },
///     to_one { manager => "User", department => "Department" },
///     to_many { colleagues => "User" },
/// );
///
/// let mut user = User::new(Some("Oliver".into()), Some("Gierke".into()), 28);
/// user.manager = Some(boss.id);
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $type_name:expr,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
        $(, to_one { $( $one:ident => $one_target:expr ),* $(,)? } )?
        $(, to_many { $( $many:ident => $many_target:expr ),* $(,)? } )?
        $(,)?
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Unique identifier for this entity
            pub id: ::uuid::Uuid,
            $( pub $field : $field_type, )*
            $( $( pub $one : Option<::uuid::Uuid>, )* )?
            $( $( pub $many : Vec<::uuid::Uuid>, )* )?
        }

        impl $crate::core::entity::Entity for $type {
            fn entity_type() -> &'static str {
                $type_name
            }

            fn metadata() -> $crate::core::metadata::EntityMetadata {
                $crate::core::metadata::EntityMetadata::builder($type_name)
                    $( .scalar(stringify!($field)) )*
                    $( $( .to_one(stringify!($one), $one_target) )* )?
                    $( $( .to_many(stringify!($many), $many_target) )* )?
                    .build()
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                $(
                    if field == stringify!($field) {
                        return Some($crate::core::field::FieldValue::from(self.$field.clone()));
                    }
                )*
                None
            }

            fn references(&self, field: &str) -> Option<Vec<::uuid::Uuid>> {
                $( $(
                    if field == stringify!($one) {
                        return Some(self.$one.into_iter().collect());
                    }
                )* )?
                $( $(
                    if field == stringify!($many) {
                        return Some(self.$many.clone());
                    }
                )* )?
                let _ = field;
                None
            }

            fn set_field_value(
                &mut self,
                field: &str,
                value: $crate::core::field::FieldValue,
            ) -> ::anyhow::Result<()> {
                $(
                    if field == stringify!($field) {
                        self.$field =
                            <$field_type as $crate::core::field::FromFieldValue>::from_field_value(value)?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Err(::anyhow::anyhow!(
                    "Entity type '{}' has no scalar attribute '{}'",
                    $type_name,
                    field
                ))
            }
        }

        impl $type {
            /// Create a new instance with a fresh id and no references
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: $field_type ),*) -> Self {
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    $( $field, )*
                    $( $( $one: None, )* )?
                    $( $( $many: Vec::new(), )* )?
                }
            }
        }
    };
}
