//! UUID-backed row identifiers.
//!
//! Every backend row other than profiles is keyed by an opaque UUID. Each
//! collection gets its own newtype so a like id can never be passed where a
//! retweet or post id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a row identifier is not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be a valid UUID, got {value:?}")]
pub struct IdentifierError {
    kind: &'static str,
    value: String,
}

impl IdentifierError {
    /// Name of the identifier type that rejected the value.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident => $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Parse an identifier from its textual form.
            pub fn new(id: impl AsRef<str>) -> Result<Self, IdentifierError> {
                let raw = id.as_ref();
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| IdentifierError {
                        kind: $kind,
                        value: raw.to_owned(),
                    })
            }

            /// Wrap an already parsed UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

uuid_identifier! {
    /// Identifier of a post row.
    PostId => "post id"
}

uuid_identifier! {
    /// Identifier of a like or retweet row.
    InteractionId => "interaction id"
}

uuid_identifier! {
    /// Identifier of a comment row.
    CommentId => "comment id"
}

uuid_identifier! {
    /// Identifier of a follow edge.
    FollowId => "follow id"
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3fa85f64-5717-4562-b3fc-2c963f66afa6", true)]
    #[case("not-a-uuid", false)]
    #[case("", false)]
    fn post_id_parsing(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(PostId::new(raw).is_ok(), valid);
    }

    #[test]
    fn error_names_the_identifier_kind() {
        let err = InteractionId::new("nope").expect_err("invalid id");
        assert_eq!(err.kind(), "interaction id");
        assert!(err.to_string().contains("\"nope\""));
    }

    #[test]
    fn serialises_as_bare_string() {
        let id = CommentId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid id");
        let value = serde_json::to_value(id).expect("serialises");
        assert_eq!(value, "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }
}
