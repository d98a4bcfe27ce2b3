//! Directed follow edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FollowId, UserId};

/// Persisted follow edge.
///
/// ## Invariants
/// - At most one edge per ordered (`follower_id`, `following_id`) pair
///   (backend enforced).
/// - Self-follow is not rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: FollowId,
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
}
