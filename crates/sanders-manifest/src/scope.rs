//! Construction scopes.
//!
//! A [`Scope`] is the (path, tags) pair a component is built in. Logical ids
//! are the concatenation of the path segments and the local name, so a
//! declaration's id depends only on where it sits in the tree and never on
//! run-time state. Tags flow down by value: a child scope merges its own set
//! over the parent's.

use std::fmt;

use sanders_common::tags::TagSet;

use crate::resource::{ResourceDeclaration, ResourceKind};

/// Position in the component tree plus the tags in force there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    path: Vec<String>,
    tags: TagSet,
}

impl Scope {
    /// The root scope; its tags apply to every declaration below it.
    #[must_use]
    pub const fn root(tags: TagSet) -> Self {
        Self {
            path: Vec::new(),
            tags,
        }
    }

    /// A nested scope named `name`, with `tags` merged over this scope's.
    #[must_use]
    pub fn child(&self, name: &str, tags: &TagSet) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_owned());
        Self {
            path,
            tags: self.tags.merge(tags),
        }
    }

    /// Logical id of a declaration named `name` in this scope.
    #[must_use]
    pub fn logical_id(&self, name: &str) -> String {
        let mut id = self.path.concat();
        id.push_str(name);
        id
    }

    /// Starts a declaration in this scope, carrying its tags.
    #[must_use]
    pub fn declare(&self, name: &str, kind: ResourceKind) -> ResourceDeclaration {
        ResourceDeclaration::new(self.logical_id(name), kind, self.tags.clone())
    }

    /// Tags in force in this scope.
    #[must_use]
    pub const fn tags(&self) -> &TagSet {
        &self.tags
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str("/")
        } else {
            write!(f, "/{}", self.path.join("/"))
        }
    }
}
