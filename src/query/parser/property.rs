//! Property expression resolution
//!
//! Turns `ManagerLastname` (method-name form) or `manager.lastname` (dotted
//! form) into a validated [`PropertyPath`].

use crate::core::error::ParseError;
use crate::core::metadata::{AttributeKind, EntityMetadata, ID_ATTRIBUTE, MetadataCatalog};
use crate::query::predicate::PropertyPath;

/// Resolves property expressions against entity metadata
pub struct PropertyResolver<'a> {
    root: &'a EntityMetadata,
    catalog: &'a MetadataCatalog,
    method: &'a str,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(root: &'a EntityMetadata, catalog: &'a MetadataCatalog, method: &'a str) -> Self {
        Self {
            root,
            catalog,
            method,
        }
    }

    pub fn method(&self) -> &str {
        self.method
    }

    /// Resolve a property expression taken from a method name
    ///
    /// A direct attribute match wins. Otherwise the longest prefix naming a
    /// reference is traversed and the remainder resolved against the
    /// referenced type. `_` forces segment boundaries (`Manager_Lastname`).
    /// A terminal reference compares by identity (`Manager` → `manager.id`).
    pub fn resolve(&self, source: &str) -> Result<PropertyPath, ParseError> {
        let segments = if source.contains('_') {
            let parts: Vec<&str> = source.split('_').filter(|s| !s.is_empty()).collect();
            self.walk(&parts)
        } else {
            self.resolve_camel(source, self.root)
        };

        segments
            .map(PropertyPath::new)
            .ok_or_else(|| self.unresolvable(source))
    }

    /// Resolve a dotted path (`manager.lastname`)
    pub fn resolve_dotted(&self, dotted: &str) -> Result<PropertyPath, ParseError> {
        let parts: Vec<&str> = dotted.split('.').collect();
        self.walk(&parts)
            .map(PropertyPath::new)
            .ok_or_else(|| self.unresolvable(dotted))
    }

    fn unresolvable(&self, property: &str) -> ParseError {
        ParseError::unresolvable(self.root.entity_type(), property, self.method)
    }

    fn resolve_camel(&self, source: &str, meta: &EntityMetadata) -> Option<Vec<String>> {
        if source.is_empty() {
            return None;
        }

        if let Some(attr) = meta.attribute(source) {
            return Some(match attr.kind {
                AttributeKind::Scalar => vec![attr.name.clone()],
                AttributeKind::Reference { .. } => {
                    vec![attr.name.clone(), ID_ATTRIBUTE.to_string()]
                }
            });
        }

        let boundaries: Vec<usize> = source
            .char_indices()
            .filter(|(i, c)| *i > 0 && c.is_uppercase())
            .map(|(i, _)| i)
            .collect();

        for &split in boundaries.iter().rev() {
            let (head, tail) = source.split_at(split);
            let Some(attr) = meta.attribute(head) else {
                continue;
            };
            let Some(target) = attr.target().and_then(|t| self.catalog.get(t)) else {
                continue;
            };
            if let Some(rest) = self.resolve_camel(tail, target) {
                let mut segments = vec![attr.name.clone()];
                segments.extend(rest);
                return Some(segments);
            }
        }

        None
    }

    fn walk(&self, parts: &[&str]) -> Option<Vec<String>> {
        let mut meta = self.root;
        let mut segments = Vec::with_capacity(parts.len() + 1);

        for (i, part) in parts.iter().enumerate() {
            let attr = meta.attribute(part)?;
            let last = i + 1 == parts.len();
            segments.push(attr.name.clone());
            match (&attr.kind, last) {
                (AttributeKind::Scalar, true) => {}
                (AttributeKind::Scalar, false) => return None,
                (AttributeKind::Reference { .. }, true) => {
                    segments.push(ID_ATTRIBUTE.to_string());
                }
                (AttributeKind::Reference { target, .. }, false) => {
                    meta = self.catalog.get(target).map(|m| m.as_ref())?;
                }
            }
        }

        if segments.is_empty() {
            None
        } else {
            Some(segments)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MetadataCatalog {
        let mut catalog = MetadataCatalog::new();
        catalog.register(
            EntityMetadata::builder("User")
                .scalar("firstname")
                .scalar("lastname")
                .scalar("email_address")
                .to_one("manager", "User")
                .to_many("colleagues", "User")
                .to_one("department", "Department")
                .build(),
        );
        catalog.register(
            EntityMetadata::builder("Department")
                .scalar("name")
                .to_one("head", "User")
                .build(),
        );
        catalog
    }

    fn resolve(source: &str) -> Result<String, ParseError> {
        let catalog = catalog();
        let root = catalog.get("User").expect("User registered");
        PropertyResolver::new(root, &catalog, "test")
            .resolve(source)
            .map(|p| p.to_string())
    }

    #[test]
    fn test_direct_match() {
        assert_eq!(resolve("Lastname").unwrap(), "lastname");
        assert_eq!(resolve("EmailAddress").unwrap(), "email_address");
    }

    #[test]
    fn test_nested_traversal() {
        assert_eq!(resolve("ManagerLastname").unwrap(), "manager.lastname");
        assert_eq!(resolve("ColleaguesLastname").unwrap(), "colleagues.lastname");
        assert_eq!(resolve("DepartmentName").unwrap(), "department.name");
    }

    #[test]
    fn test_deep_traversal() {
        assert_eq!(
            resolve("ManagerManagerEmailAddress").unwrap(),
            "manager.manager.email_address"
        );
        assert_eq!(
            resolve("DepartmentHeadLastname").unwrap(),
            "department.head.lastname"
        );
    }

    #[test]
    fn test_terminal_reference_compares_identity() {
        assert_eq!(resolve("Manager").unwrap(), "manager.id");
    }

    #[test]
    fn test_explicit_separator() {
        assert_eq!(resolve("Manager_Lastname").unwrap(), "manager.lastname");
        assert!(resolve("Lastname_Firstname").is_err());
    }

    #[test]
    fn test_unresolvable() {
        let err = resolve("Nickname").unwrap_err();
        assert_eq!(err, ParseError::unresolvable("User", "Nickname", "test"));
        assert!(resolve("ManagerNickname").is_err());
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_dotted() {
        let catalog = catalog();
        let root = catalog.get("User").unwrap();
        let resolver = PropertyResolver::new(root, &catalog, "test");
        assert_eq!(
            resolver.resolve_dotted("manager.lastName").unwrap().to_string(),
            "manager.lastname"
        );
        assert!(resolver.resolve_dotted("lastname.manager").is_err());
        assert!(resolver.resolve_dotted("").is_err());
    }
}
