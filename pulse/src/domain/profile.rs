//! Profile data model and handle derivation.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::UserId;

/// Handle used when the identity carries no usable email local part.
pub const FALLBACK_HANDLE: &str = "user";

/// Exclusive upper bound of the numeric suffix appended to derived handles.
pub const USERNAME_SUFFIX_BOUND: u32 = 10_000;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameValidationError {
    Empty,
    InvalidCharacters,
}

impl fmt::Display for UsernameValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "username must not be empty"),
            Self::InvalidCharacters => write!(
                f,
                "username may only contain ASCII letters, digits, or underscores",
            ),
        }
    }
}

impl std::error::Error for UsernameValidationError {}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
static HANDLE_STRIP_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

fn handle_strip_regex() -> &'static Regex {
    HANDLE_STRIP_RE.get_or_init(|| {
        Regex::new("[^A-Za-z0-9_]")
            .unwrap_or_else(|error| panic!("handle strip regex failed to compile: {error}"))
    })
}

/// Globally unique public handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(value: impl Into<String>) -> Result<Self, UsernameValidationError> {
        Self::from_owned(value.into())
    }

    fn from_owned(value: String) -> Result<Self, UsernameValidationError> {
        if value.is_empty() {
            return Err(UsernameValidationError::Empty);
        }
        if !username_regex().is_match(&value) {
            return Err(UsernameValidationError::InvalidCharacters);
        }
        Ok(Self(value))
    }

    /// Join a derived base handle with a numeric suffix.
    ///
    /// # Examples
    /// ```
    /// use pulse::domain::{BaseHandle, Username};
    ///
    /// let base = BaseHandle::from_email(Some("jane.doe@x.com"));
    /// assert_eq!(Username::with_suffix(&base, 42).as_ref(), "janedoe42");
    /// ```
    pub fn with_suffix(base: &BaseHandle, suffix: u32) -> Self {
        // BaseHandle only holds characters accepted by the username pattern
        // and the decimal suffix is never empty.
        Self(format!("{}{suffix}", base.as_str()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Handle stem derived from an identity's email.
///
/// ## Invariants
/// - Contains only `[A-Za-z0-9_]` and is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseHandle(String);

impl BaseHandle {
    /// Derive the handle from the email local part.
    ///
    /// Characters outside `[A-Za-z0-9_]` are dropped. A missing email, or a
    /// local part with nothing left after stripping, yields
    /// [`FALLBACK_HANDLE`].
    pub fn from_email(email: Option<&str>) -> Self {
        let local = email
            .map(|value| value.split('@').next().unwrap_or_default())
            .unwrap_or(FALLBACK_HANDLE);
        let stripped = handle_strip_regex().replace_all(local, "");
        if stripped.is_empty() {
            Self(FALLBACK_HANDLE.to_owned())
        } else {
            Self(stripped.into_owned())
        }
    }

    /// Borrow the handle text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Application user record, one per identity.
///
/// ## Invariants
/// - `id` equals the owning identity's id.
/// - `username` is unique across all profiles (backend enforced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: Username,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown on cards, falling back to the handle when blank.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            self.username.as_ref()
        } else {
            self.full_name.as_str()
        }
    }
}

/// Insert payload for a new profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub id: UserId,
    pub username: Username,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("jane.doe@x.com"), "janedoe")]
    #[case(Some("first_last+tag@example.com"), "first_lasttag")]
    #[case(Some("ÄÖÜ@example.com"), "user")]
    #[case(Some("@example.com"), "user")]
    #[case(Some("no-at-sign"), "noatsign")]
    #[case(None, "user")]
    fn base_handle_strips_disallowed_characters(
        #[case] email: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(BaseHandle::from_email(email).as_str(), expected);
    }

    #[rstest]
    #[case("", UsernameValidationError::Empty)]
    #[case("jane doe", UsernameValidationError::InvalidCharacters)]
    #[case("jane.doe", UsernameValidationError::InvalidCharacters)]
    fn username_rejects_invalid_values(
        #[case] raw: &str,
        #[case] expected: UsernameValidationError,
    ) {
        assert_eq!(Username::new(raw).expect_err("invalid"), expected);
    }

    #[test]
    fn suffixed_usernames_pass_validation() {
        let base = BaseHandle::from_email(Some("jane.doe@x.com"));
        let username = Username::with_suffix(&base, USERNAME_SUFFIX_BOUND - 1);
        assert_eq!(username.as_ref(), "janedoe9999");
        assert!(Username::new(username.as_ref()).is_ok());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let profile = Profile {
            id: UserId::random(),
            username: Username::new("ada").expect("valid"),
            full_name: "  ".to_owned(),
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        };
        assert_eq!(profile.display_name(), "ada");
    }
}
