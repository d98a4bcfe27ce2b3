//! Port for post persistence and the feed read view.

use async_trait::async_trait;

use crate::domain::{NewPost, Post, PostRecord};

use super::DataAccessError;

/// Storage contract for posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Every post joined with its author and aggregate counters, newest
    /// first. Ties on `created_at` keep the backend's order.
    async fn list_feed(&self) -> Result<Vec<PostRecord>, DataAccessError>;

    /// Insert a post and return the stored row.
    async fn create(&self, post: &NewPost) -> Result<Post, DataAccessError>;
}
