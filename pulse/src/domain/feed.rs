//! Feed loading and per-viewer hydration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ports::{DataAccessError, InteractionRepository, PostRepository};
use crate::domain::{
    Error, FeedPost, InteractionId, InteractionKind, InteractionRecord, InteractionState, PostId,
    PostRecord, UserId, ViewerInteractions,
};

/// Loads every post with its author and, for a signed-in viewer, whether
/// the viewer liked or retweeted it.
#[derive(Clone)]
pub struct FeedSynchronizer {
    posts: Arc<dyn PostRepository>,
    interactions: Arc<dyn InteractionRepository>,
}

impl FeedSynchronizer {
    /// Build a synchronizer over the post and interaction ports.
    pub fn new(posts: Arc<dyn PostRepository>, interactions: Arc<dyn InteractionRepository>) -> Self {
        Self {
            posts,
            interactions,
        }
    }

    /// Load the feed newest first.
    ///
    /// Without a viewer the interaction flags stay unset. With a viewer the
    /// like and retweet rows for the loaded posts are fetched concurrently.
    /// Any failure discards the partial result.
    pub async fn load(&self, viewer: Option<&UserId>) -> Result<Vec<FeedPost>, Error> {
        let records = self.posts.list_feed().await.map_err(|error| {
            warn!(error = %error, kind = error.variant_name(), "feed fetch failed");
            Error::from(error)
        })?;

        let posts: Vec<FeedPost> = records.into_iter().map(normalise).collect();
        let Some(viewer) = viewer else {
            debug!(count = posts.len(), "feed loaded without viewer");
            return Ok(posts);
        };
        if posts.is_empty() {
            return Ok(posts);
        }

        let post_ids: Vec<PostId> = posts.iter().map(FeedPost::id).collect();
        let (likes, retweets) = tokio::join!(
            self.interactions
                .list_for_viewer(InteractionKind::Like, viewer, &post_ids),
            self.interactions
                .list_for_viewer(InteractionKind::Retweet, viewer, &post_ids),
        );
        let likes = index_by_post(likes.map_err(hydration_error)?);
        let retweets = index_by_post(retweets.map_err(hydration_error)?);

        let hydrated: Vec<FeedPost> = posts
            .into_iter()
            .map(|mut post| {
                post.viewer = Some(ViewerInteractions {
                    like: state_for(&likes, post.id()),
                    retweet: state_for(&retweets, post.id()),
                });
                post
            })
            .collect();
        debug!(
            count = hydrated.len(),
            liked = likes.len(),
            retweeted = retweets.len(),
            "feed hydrated"
        );
        Ok(hydrated)
    }
}

fn normalise(record: PostRecord) -> FeedPost {
    FeedPost {
        post: record.post,
        author: record.author.into_profile(),
        viewer: None,
    }
}

fn hydration_error(error: DataAccessError) -> Error {
    warn!(error = %error, kind = error.variant_name(), "feed hydration failed");
    error.into()
}

fn index_by_post(rows: Vec<InteractionRecord>) -> HashMap<PostId, InteractionId> {
    rows.into_iter().map(|row| (row.post_id, row.id)).collect()
}

fn state_for(index: &HashMap<PostId, InteractionId>, post_id: PostId) -> InteractionState {
    index
        .get(&post_id)
        .copied()
        .map_or(InteractionState::Absent, InteractionState::Present)
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
