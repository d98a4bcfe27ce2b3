//! Comment rows and their composition payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, Profile, UserId};

/// Validation errors returned by [`CommentContent::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentContentValidationError {
    Empty,
}

impl fmt::Display for CommentContentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "comment must not be empty"),
        }
    }
}

impl std::error::Error for CommentContentValidationError {}

/// Trimmed, non-empty comment body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentContent(String);

impl CommentContent {
    /// Trim and validate input.
    pub fn new(raw: &str) -> Result<Self, CommentContentValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CommentContentValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for CommentContent {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Comment joined with the commenter's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub post_id: PostId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Profile>,
}

impl Comment {
    /// Keyset position of this comment in newest-first order.
    pub fn sort_key(&self) -> CommentSortKey {
        CommentSortKey {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Keyset for paging through a thread newest-first.
///
/// Ties on `created_at` are broken by descending id so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSortKey {
    pub created_at: DateTime<Utc>,
    pub id: CommentId,
}

impl CommentSortKey {
    /// Whether `comment` sorts strictly after this key in newest-first order.
    pub fn precedes(&self, comment: &Comment) -> bool {
        (comment.created_at, comment.id) < (self.created_at, self.id)
    }
}

/// Insert payload for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub user_id: UserId,
    pub post_id: PostId,
    pub content: CommentContent,
}
