//! Duplicate-free collections of declarations.

use std::collections::BTreeMap;

use sanders_common::error::{InfraError, Result};

use crate::resource::{ResourceDeclaration, ResourceKind};

const MAX_LOGICAL_ID_LEN: usize = 255;

/// Declarations keyed by logical id.
///
/// Each logical resource is owned by exactly one component; inserting a
/// second declaration under the same id is an error, never an overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    resources: BTreeMap<String, ResourceDeclaration>,
}

impl ResourceSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Adds a declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if the logical id is not alphanumeric or is already
    /// taken.
    pub fn insert(&mut self, declaration: ResourceDeclaration) -> Result<()> {
        let logical_id = declaration.logical_id().to_owned();
        let kind = declaration.kind();
        self.admit(declaration)?;
        tracing::debug!(logical_id = %logical_id, kind = %kind, "declared resource");
        Ok(())
    }

    /// Moves every declaration of `other` into this set.
    ///
    /// The declarations were already logged when first inserted.
    ///
    /// # Errors
    ///
    /// Returns an error on the first logical id collision.
    pub fn absorb(&mut self, other: Self) -> Result<()> {
        for declaration in other.resources.into_values() {
            self.admit(declaration)?;
        }
        Ok(())
    }

    fn admit(&mut self, declaration: ResourceDeclaration) -> Result<()> {
        let id = declaration.logical_id();
        if id.is_empty()
            || id.len() > MAX_LOGICAL_ID_LEN
            || !id.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(InfraError::config(format!(
                "logical id \"{id}\" must be 1-{MAX_LOGICAL_ID_LEN} alphanumeric characters"
            )));
        }
        if self.resources.contains_key(id) {
            return Err(InfraError::DuplicateResource {
                logical_id: id.to_owned(),
            });
        }
        let _ = self.resources.insert(id.to_owned(), declaration);
        Ok(())
    }

    /// Looks up a declaration by logical id.
    #[must_use]
    pub fn get(&self, logical_id: &str) -> Option<&ResourceDeclaration> {
        self.resources.get(logical_id)
    }

    /// Whether a logical id is declared.
    #[must_use]
    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    /// Iterates declarations in logical-id order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values()
    }

    /// Declarations of one kind, in logical-id order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values().filter(move |r| r.kind() == kind)
    }

    /// Number of declarations of one kind.
    #[must_use]
    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Total number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use sanders_common::tags::TagSet;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn decl(id: &str, kind: ResourceKind) -> ResourceDeclaration {
        ResourceDeclaration::new(id, kind, TagSet::new())
    }

    #[test]
    fn insert_and_count() {
        let mut set = ResourceSet::new();
        set.insert(decl("A", ResourceKind::Subnet)).expect("a");
        set.insert(decl("B", ResourceKind::Subnet)).expect("b");
        set.insert(decl("C", ResourceKind::Vpc)).expect("c");
        assert_eq!(set.len(), 3);
        assert_eq!(set.count_of(ResourceKind::Subnet), 2);
        assert!(set.contains("C"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut set = ResourceSet::new();
        set.insert(decl("Vpc", ResourceKind::Vpc)).expect("first");
        let err = set.insert(decl("Vpc", ResourceKind::Vpc)).unwrap_err();
        assert!(err.to_string().contains("duplicate logical id"), "got: {err}");
    }

    #[test]
    fn non_alphanumeric_ids_are_rejected() {
        let mut set = ResourceSet::new();
        assert!(set.insert(decl("My-Bucket", ResourceKind::S3Bucket)).is_err());
        assert!(set.insert(decl("", ResourceKind::S3Bucket)).is_err());
    }

    #[test]
    fn absorb_detects_collisions() {
        let mut left = ResourceSet::new();
        left.insert(decl("Shared", ResourceKind::Vpc)).expect("left");
        let mut right = ResourceSet::new();
        right.insert(decl("Shared", ResourceKind::Vpc)).expect("right");
        assert!(left.absorb(right).is_err());
    }

    #[test]
    fn absorbed_declarations_are_logged_once() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut component = ResourceSet::new();
            component.insert(decl("Vpc", ResourceKind::Vpc)).expect("insert");
            let mut root = ResourceSet::new();
            root.absorb(component).expect("absorb");
            assert!(root.contains("Vpc"));
        });

        let text = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
        assert_eq!(text.matches("declared resource").count(), 1, "{text}");
    }
}
