//! Authenticated principals as reported by the identity provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdValidationError {
    EmptyId,
    InvalidId,
}

impl fmt::Display for UserIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
        }
    }
}

impl std::error::Error for UserIdValidationError {}

/// Stable identity identifier stored as a UUID.
///
/// Profiles reuse the identity id as their primary key, so the same type
/// addresses both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserIdValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserIdValidationError> {
        if id.is_empty() {
            return Err(UserIdValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserIdValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| UserIdValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Optional profile hints supplied by the identity provider at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    /// Display name chosen by the user, if any.
    pub full_name: Option<String>,
    /// Avatar image URL, if any.
    pub avatar_url: Option<String>,
}

/// An externally authenticated principal.
///
/// ## Invariants
/// - `id` is the primary key of the matching profile row once provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: UserId,
    email: Option<String>,
    #[serde(default)]
    metadata: IdentityMetadata,
}

impl Identity {
    /// Build an identity from its parts.
    pub fn new(id: UserId, email: Option<String>, metadata: IdentityMetadata) -> Self {
        Self {
            id,
            email,
            metadata,
        }
    }

    /// Identity identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Email address, when the provider exposes one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Provider metadata.
    pub fn metadata(&self) -> &IdentityMetadata {
        &self.metadata
    }
}

/// Kind of identity transition reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Notification delivered to identity subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEvent {
    /// What happened.
    pub kind: IdentityEventKind,
    /// Identity after the transition; `None` once signed out.
    pub identity: Option<Identity>,
}

impl IdentityEvent {
    /// Event for a fresh sign-in.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::SignedIn,
            identity: Some(identity),
        }
    }

    /// Event for a sign-out.
    pub fn signed_out() -> Self {
        Self {
            kind: IdentityEventKind::SignedOut,
            identity: None,
        }
    }

    /// Event for a token refresh of an existing identity.
    pub fn token_refreshed(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::TokenRefreshed,
            identity: Some(identity),
        }
    }
}
