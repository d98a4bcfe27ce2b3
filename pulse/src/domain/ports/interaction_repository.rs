//! Port for like and retweet rows.
//!
//! Both interaction kinds live in separate collections with identical
//! shape, so a single port addresses either one by [`InteractionKind`].

use async_trait::async_trait;

use crate::domain::{InteractionId, InteractionKind, InteractionRecord, PostId, UserId};

use super::DataAccessError;

/// Storage contract for viewer interactions.
///
/// A second row for the same (user, post) pair must fail with
/// [`DataAccessError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Rows of `kind` owned by `viewer` for any of `post_ids`.
    async fn list_for_viewer(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_ids: &[PostId],
    ) -> Result<Vec<InteractionRecord>, DataAccessError>;

    /// Record that `viewer` holds `kind` on `post_id`.
    async fn insert(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_id: PostId,
    ) -> Result<InteractionRecord, DataAccessError>;

    /// Remove an interaction row by id. Deleting a missing row succeeds.
    async fn delete(&self, kind: InteractionKind, id: InteractionId)
    -> Result<(), DataAccessError>;
}
