//! Port for the directed follow graph.

use async_trait::async_trait;

use crate::domain::{Follow, UserId};

use super::DataAccessError;

/// Storage contract for follow edges.
///
/// At most one edge exists per ordered (follower, following) pair; a
/// duplicate insert fails with [`DataAccessError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Ids of every profile `follower` follows.
    async fn following_ids(&self, follower: &UserId) -> Result<Vec<UserId>, DataAccessError>;

    /// Create an edge from `follower` to `following`.
    async fn insert(&self, follower: &UserId, following: &UserId)
    -> Result<Follow, DataAccessError>;

    /// Remove the edge from `follower` to `following`, if any.
    async fn delete(&self, follower: &UserId, following: &UserId) -> Result<(), DataAccessError>;
}
