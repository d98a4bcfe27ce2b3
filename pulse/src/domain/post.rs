//! Posts, their composition payload and the hydrated feed view model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InteractionId, InteractionKind, PostId, Profile, UserId};

/// Maximum length of a post in Unicode scalar values.
pub const POST_CONTENT_MAX: usize = 280;

/// Validation errors returned by [`PostContent::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostContentValidationError {
    Empty,
    TooLong { max: usize, actual: usize },
}

impl fmt::Display for PostContentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "post content must not be empty"),
            Self::TooLong { max, actual } => {
                write!(f, "post content must be at most {max} characters, got {actual}")
            }
        }
    }
}

impl std::error::Error for PostContentValidationError {}

/// Trimmed, non-empty, length-bounded post body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

impl PostContent {
    /// Trim and validate composer input.
    pub fn new(raw: &str) -> Result<Self, PostContentValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PostContentValidationError::Empty);
        }
        let actual = trimmed.chars().count();
        if actual > POST_CONTENT_MAX {
            return Err(PostContentValidationError::TooLong {
                max: POST_CONTENT_MAX,
                actual,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for PostContent {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Backend-maintained aggregate counters.
///
/// These are never computed or adjusted client-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounters {
    pub likes: u64,
    pub retweets: u64,
    pub comments: u64,
}

impl PostCounters {
    /// Counter matching an interaction kind.
    pub fn for_kind(&self, kind: InteractionKind) -> u64 {
        match kind {
            InteractionKind::Like => self.likes,
            InteractionKind::Retweet => self.retweets,
        }
    }
}

/// Immutable post row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub counters: PostCounters,
}

/// Insert payload for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: UserId,
    pub content: PostContent,
}

/// Author join as returned by the backend.
///
/// Some backends report a to-one join as a one-element array. The feed
/// normalises every shape to a single optional profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AuthorRelation {
    Single(Profile),
    Collection(Vec<Profile>),
    #[default]
    Absent,
}

impl AuthorRelation {
    /// Collapse the join to at most one profile, keeping the first element
    /// of a collection.
    pub fn into_profile(self) -> Option<Profile> {
        match self {
            Self::Single(profile) => Some(profile),
            Self::Collection(profiles) => profiles.into_iter().next(),
            Self::Absent => None,
        }
    }
}

/// Post row joined with its author, as read from the feed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post: Post,
    pub author: AuthorRelation,
}

/// Whether the viewer holds an interaction row for a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Absent,
    Present(InteractionId),
}

impl InteractionState {
    /// `true` when a row exists.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Row id, needed to delete the interaction.
    pub fn id(&self) -> Option<InteractionId> {
        match self {
            Self::Present(id) => Some(*id),
            Self::Absent => None,
        }
    }
}

/// Viewer-specific interaction flags for one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerInteractions {
    pub like: InteractionState,
    pub retweet: InteractionState,
}

impl ViewerInteractions {
    /// State for one interaction kind.
    pub fn state(&self, kind: InteractionKind) -> InteractionState {
        match kind {
            InteractionKind::Like => self.like,
            InteractionKind::Retweet => self.retweet,
        }
    }
}

/// Post merged with its author and, when a viewer is signed in, the
/// viewer's interaction state.
///
/// Transient: recomputed on every feed load and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub post: Post,
    pub author: Option<Profile>,
    /// `None` when the feed was loaded without a viewer.
    pub viewer: Option<ViewerInteractions>,
}

impl FeedPost {
    /// Post identifier.
    pub fn id(&self) -> PostId {
        self.post.id
    }

    /// Whether the viewer liked this post.
    pub fn liked_by_me(&self) -> Option<bool> {
        self.viewer.map(|viewer| viewer.like.is_present())
    }

    /// Id of the viewer's like row.
    pub fn like_id(&self) -> Option<InteractionId> {
        self.viewer.and_then(|viewer| viewer.like.id())
    }

    /// Whether the viewer retweeted this post.
    pub fn retweeted_by_me(&self) -> Option<bool> {
        self.viewer.map(|viewer| viewer.retweet.is_present())
    }

    /// Id of the viewer's retweet row.
    pub fn retweet_id(&self) -> Option<InteractionId> {
        self.viewer.and_then(|viewer| viewer.retweet.id())
    }

    /// Interaction state for one kind; absent flags read as
    /// [`InteractionState::Absent`].
    pub fn interaction(&self, kind: InteractionKind) -> InteractionState {
        self.viewer
            .map(|viewer| viewer.state(kind))
            .unwrap_or_default()
    }
}
