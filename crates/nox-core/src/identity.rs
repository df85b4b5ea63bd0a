//! Opaque platform identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// A member of the community server (applicant or staff).
    MemberId
);
opaque_id!(
    /// The server an application was started from.
    ServerId
);
opaque_id!(
    /// A review surface (private channel) created for an application.
    SurfaceId
);

/// Numeric role identifier, as configured by server staff.
pub type RoleId = u64;

/// Numeric identifier of the category review surfaces are created under.
pub type CategoryId = u64;

/// The person filling in an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: MemberId,
    /// Display handle, used to derive the review surface name.
    pub handle: String,
}

impl Applicant {
    pub fn new(id: impl Into<MemberId>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
        }
    }
}
