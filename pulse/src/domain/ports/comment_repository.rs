//! Port for comment persistence.

use async_trait::async_trait;

use crate::domain::{Comment, CommentSortKey, NewComment, PostId};

use super::DataAccessError;

/// Storage contract for comments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Comments on `post_id` joined with the commenter profile, newest
    /// first.
    ///
    /// When `after` is set only comments strictly older than that keyset
    /// position are returned. At most `limit` rows are returned.
    async fn list_for_post(
        &self,
        post_id: PostId,
        after: Option<CommentSortKey>,
        limit: usize,
    ) -> Result<Vec<Comment>, DataAccessError>;

    /// Insert a comment and return the stored row.
    async fn insert(&self, comment: &NewComment) -> Result<Comment, DataAccessError>;
}
