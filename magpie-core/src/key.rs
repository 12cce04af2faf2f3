// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed keys for every vertex collection in the catalog graph.
//!
//! Keys are string-backed and carry their collection in the type. The
//! canonical display form is `<prefix>/<id>`, matching the persisted id
//! scheme, and composite enums group the collections a relation may point at
//! (principals, owners, ACL-bearing objects, lockable resources).

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("malformed key: {0}")]
    Malformed(String),
}

const RANDOM_KEY_LEN: usize = 10;

macro_rules! typed_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Collection prefix used in the canonical string form.
            pub const PREFIX: &'static str = $prefix;

            /// Create a key from a bare identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a random key.
            pub fn random() -> Self {
                let id: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(RANDOM_KEY_LEN)
                    .map(char::from)
                    .collect();
                Self(id.to_lowercase())
            }

            /// Bare identifier without the collection prefix.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.split_once('/') {
                    Some((prefix, id)) if prefix == $prefix && !id.is_empty() => {
                        Ok(Self::new(id))
                    }
                    _ => Err(KeyError::Malformed(value.to_string())),
                }
            }
        }
    };
}

typed_key!(
    /// Key of a User vertex.
    UserKey,
    "u"
);
typed_key!(
    /// Key of a linked external account (identity) vertex.
    AccountKey,
    "uuid"
);
typed_key!(
    /// Key of a Group vertex.
    GroupKey,
    "g"
);
typed_key!(
    /// Key of a Project vertex.
    ProjectKey,
    "p"
);
typed_key!(
    /// Key of a Data record vertex.
    RecordKey,
    "d"
);
typed_key!(
    /// Key of a Collection vertex.
    CollectionKey,
    "c"
);
typed_key!(
    /// Key of an Alias vertex. Alias keys are namespaced by their owner, see
    /// [`AliasKey::namespaced`].
    AliasKey,
    "a"
);
typed_key!(
    /// Key of a Repo (storage endpoint) vertex.
    RepoKey,
    "repo"
);
typed_key!(
    /// Key of a Task vertex.
    TaskKey,
    "task"
);

impl AliasKey {
    /// Build an alias key namespaced by its owning principal, avoiding global
    /// collisions between identically-named aliases of different owners.
    pub fn namespaced(owner: &OwnerKey, name: &str) -> Self {
        match owner {
            OwnerKey::User(user) => Self::new(format!("u:{}:{}", user.as_str(), name)),
            OwnerKey::Project(project) => Self::new(format!("p:{}:{}", project.as_str(), name)),
        }
    }
}

macro_rules! composite_key {
    (
        $(#[$meta:meta])* $name:ident { $($variant:ident($inner:ty)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
        pub enum $name {
            $($variant($inner),)+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant(key) => fmt::Display::fmt(key, f),)+
                }
            }
        }

        $(
            impl From<$inner> for $name {
                fn from(key: $inner) -> Self {
                    Self::$variant(key)
                }
            }
        )+
    };
}

composite_key!(
    /// A principal an ACL entry can be granted to.
    PrincipalKey {
        User(UserKey),
        Group(GroupKey),
    }
);

composite_key!(
    /// A principal that can own catalog objects and hold repo allocations.
    OwnerKey {
        User(UserKey),
        Project(ProjectKey),
    }
);

composite_key!(
    /// An ACL-bearing catalog object.
    ObjectKey {
        Record(RecordKey),
        Collection(CollectionKey),
    }
);

composite_key!(
    /// A resource a task may lock.
    ResourceKey {
        Record(RecordKey),
        Collection(CollectionKey),
        Project(ProjectKey),
        User(UserKey),
        Repo(RepoKey),
    }
);

composite_key!(
    /// Any vertex in the graph.
    VertexKey {
        User(UserKey),
        Account(AccountKey),
        Group(GroupKey),
        Project(ProjectKey),
        Record(RecordKey),
        Collection(CollectionKey),
        Alias(AliasKey),
        Repo(RepoKey),
        Task(TaskKey),
    }
);

impl From<ObjectKey> for ResourceKey {
    fn from(key: ObjectKey) -> Self {
        match key {
            ObjectKey::Record(record) => Self::Record(record),
            ObjectKey::Collection(collection) => Self::Collection(collection),
        }
    }
}

impl From<OwnerKey> for ResourceKey {
    fn from(key: OwnerKey) -> Self {
        match key {
            OwnerKey::User(user) => Self::User(user),
            OwnerKey::Project(project) => Self::Project(project),
        }
    }
}

impl From<ObjectKey> for VertexKey {
    fn from(key: ObjectKey) -> Self {
        match key {
            ObjectKey::Record(record) => Self::Record(record),
            ObjectKey::Collection(collection) => Self::Collection(collection),
        }
    }
}

impl From<OwnerKey> for VertexKey {
    fn from(key: OwnerKey) -> Self {
        match key {
            OwnerKey::User(user) => Self::User(user),
            OwnerKey::Project(project) => Self::Project(project),
        }
    }
}

impl From<ResourceKey> for VertexKey {
    fn from(key: ResourceKey) -> Self {
        match key {
            ResourceKey::Record(record) => Self::Record(record),
            ResourceKey::Collection(collection) => Self::Collection(collection),
            ResourceKey::Project(project) => Self::Project(project),
            ResourceKey::User(user) => Self::User(user),
            ResourceKey::Repo(repo) => Self::Repo(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn canonical_form_round_trip() {
        let key = RecordKey::new("41xb9");
        assert_eq!(key.to_string(), "d/41xb9");
        assert_eq!(RecordKey::from_str("d/41xb9"), Ok(key));
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        assert!(RecordKey::from_str("u/41xb9").is_err());
        assert!(RecordKey::from_str("d/").is_err());
        assert!(RecordKey::from_str("41xb9").is_err());
    }

    #[test]
    fn alias_keys_are_owner_namespaced() {
        let user = OwnerKey::User(UserKey::new("ada"));
        let project = OwnerKey::Project(ProjectKey::new("ember"));

        assert_ne!(
            AliasKey::namespaced(&user, "thesis"),
            AliasKey::namespaced(&project, "thesis")
        );
        assert_eq!(
            AliasKey::namespaced(&user, "thesis").to_string(),
            "a/u:ada:thesis"
        );
    }

    #[test]
    fn composite_keys_display_as_inner() {
        let object: ObjectKey = CollectionKey::new("root").into();
        assert_eq!(object.to_string(), "c/root");

        let resource: ResourceKey = ObjectKey::from(RecordKey::new("x1")).into();
        assert_eq!(resource.to_string(), "d/x1");
    }
}
