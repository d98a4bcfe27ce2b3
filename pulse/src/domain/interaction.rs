//! Like and retweet rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{InteractionId, PostId, UserId};

/// The two toggleable interactions a viewer can hold on a post.
///
/// Both share one state machine; only the backing collection and the
/// user-facing wording differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Retweet,
}

impl InteractionKind {
    /// Both kinds, in display order.
    pub const ALL: [Self; 2] = [Self::Like, Self::Retweet];

    /// Backend collection holding rows of this kind.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Retweet => "retweets",
        }
    }

    /// Message shown when creating the interaction fails.
    pub fn add_failed_message(self) -> &'static str {
        match self {
            Self::Like => "Could not like the post.",
            Self::Retweet => "Could not retweet the post.",
        }
    }

    /// Message shown when removing the interaction fails.
    pub fn remove_failed_message(self) -> &'static str {
        match self {
            Self::Like => "Could not remove the like.",
            Self::Retweet => "Could not undo the retweet.",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Retweet => f.write_str("retweet"),
        }
    }
}

/// Persisted like or retweet.
///
/// ## Invariants
/// - At most one row per (`user_id`, `post_id`) and kind (backend enforced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: InteractionId,
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}
