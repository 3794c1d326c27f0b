//! Identifier newtypes.
//!
//! All identifiers are opaque, case-sensitive strings. They serialize
//! transparently so policy documents and request payloads stay plain JSON/TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// An email-address-shaped principal, e.g. `alice@example.com`.
    Identity
);

string_id!(
    /// A directory group, identified by its email address.
    GroupId
);

string_id!(
    /// A permission role, e.g. `roles/cloudsql.admin`.
    RoleId
);

string_id!(
    /// A cloud resource reference, e.g. `projects/testing`.
    ResourceId
);

/// The set of groups an identity belongs to.
pub type GroupSet = BTreeSet<GroupId>;

impl Identity {
    /// Check that this identity belongs to `domain`.
    ///
    /// The match is an exact, case-sensitive suffix match on `@<domain>`, so
    /// `alice@example.com.evil` and `alice@EXAMPLE.com` are both rejected for
    /// `example.com`.
    #[must_use]
    pub fn in_domain(&self, domain: &str) -> bool {
        self.0
            .strip_suffix(domain)
            .is_some_and(|local| local.ends_with('@'))
    }

    /// The IAM member string for this identity (`user:<email>`).
    #[must_use]
    pub fn principal(&self) -> String {
        format!("user:{}", self.0)
    }
}
