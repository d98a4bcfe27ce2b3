//! Feed state owner and the mutations that complete by reloading it.
//!
//! Every mutation is sequential: write, then reload. Local flags are never
//! flipped directly; the feed is replaced wholesale by each reload, so the
//! counters on screen always come from the backend. Overlapping reloads are
//! not coordinated and the last response to arrive wins.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::{CommentRepository, InteractionRepository, PostRepository};
use crate::domain::{
    Comment, CommentContent, Error, FeedPost, FeedSynchronizer, InteractionKind,
    InteractionState, NewComment, NewPost, Post, PostContent, PostId, SessionState, UserId,
};

/// Message shown in place of the feed when a load fails.
pub const FEED_UNAVAILABLE: &str = "The feed is unavailable right now.";
/// Message shown when the viewer's profile cannot be provisioned before
/// composing.
pub const PROFILE_UNAVAILABLE: &str = "Could not create profile.";
/// Message shown when a post cannot be published.
pub const POST_FAILED: &str = "Could not publish the post.";
/// Message shown when a comment cannot be stored.
pub const COMMENT_FAILED: &str = "Could not post the comment.";

/// Snapshot of the feed as rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Hydrated posts, newest first.
    pub posts: Vec<FeedPost>,
    /// A reload is in flight.
    pub loading: bool,
    /// Feed-level failure message; the list is empty while set.
    pub error: Option<String>,
}

impl FeedState {
    /// Post by id from the current snapshot.
    pub fn post(&self, id: PostId) -> Option<&FeedPost> {
        self.posts.iter().find(|post| post.id() == id)
    }
}

/// Owns the feed and applies viewer actions to it.
pub struct Timeline {
    session: Arc<SessionState>,
    feed: FeedSynchronizer,
    posts: Arc<dyn PostRepository>,
    interactions: Arc<dyn InteractionRepository>,
    comments: Arc<dyn CommentRepository>,
    state: watch::Sender<FeedState>,
}

impl Timeline {
    /// Empty timeline; call [`Timeline::reload`] to populate it.
    pub fn new(
        session: Arc<SessionState>,
        posts: Arc<dyn PostRepository>,
        interactions: Arc<dyn InteractionRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            session,
            feed: FeedSynchronizer::new(Arc::clone(&posts), Arc::clone(&interactions)),
            posts,
            interactions,
            comments,
            state,
        }
    }

    /// Session the timeline reads its viewer from.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Copy of the current feed state.
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Subscribe to feed state changes.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Reload the feed for the current viewer.
    ///
    /// On failure the list is cleared and [`FEED_UNAVAILABLE`] is recorded
    /// before the error is returned.
    pub async fn reload(&self) -> Result<(), Error> {
        self.state.send_modify(|state| state.loading = true);
        let viewer = self.session.viewer();
        match self.feed.load(viewer.as_ref()).await {
            Ok(posts) => {
                self.state.send_replace(FeedState {
                    posts,
                    loading: false,
                    error: None,
                });
                Ok(())
            }
            Err(error) => {
                self.state.send_replace(FeedState {
                    posts: Vec::new(),
                    loading: false,
                    error: Some(FEED_UNAVAILABLE.to_owned()),
                });
                Err(error)
            }
        }
    }

    /// Flip the viewer's `kind` interaction on `post`.
    ///
    /// A present row is deleted by id; an absent one is inserted. An insert
    /// rejected as a duplicate already holds the desired state and counts as
    /// success. Failures carry an action-specific message and leave the
    /// feed untouched.
    pub async fn toggle(&self, kind: InteractionKind, post: &FeedPost) -> Result<(), Error> {
        let viewer = self.require_viewer()?;
        match post.interaction(kind) {
            InteractionState::Present(id) => {
                self.interactions.delete(kind, id).await.map_err(|error| {
                    warn!(%kind, post_id = %post.id(), error = %error, "interaction removal failed");
                    Error::from(error).with_message(kind.remove_failed_message())
                })?;
            }
            InteractionState::Absent => {
                match self.interactions.insert(kind, &viewer, post.id()).await {
                    Ok(_) => {}
                    Err(error) if error.is_conflict() => {
                        debug!(%kind, post_id = %post.id(), "interaction already present");
                    }
                    Err(error) => {
                        warn!(
                            %kind,
                            post_id = %post.id(),
                            error = %error,
                            "interaction insert failed"
                        );
                        return Err(Error::from(error).with_message(kind.add_failed_message()));
                    }
                }
            }
        }
        self.reload_after_write().await;
        Ok(())
    }

    /// Like or unlike `post`.
    pub async fn toggle_like(&self, post: &FeedPost) -> Result<(), Error> {
        self.toggle(InteractionKind::Like, post).await
    }

    /// Retweet or undo the retweet of `post`.
    pub async fn toggle_retweet(&self, post: &FeedPost) -> Result<(), Error> {
        self.toggle(InteractionKind::Retweet, post).await
    }

    /// Add a comment to `post_id` and reload the feed so the counter
    /// updates.
    pub async fn comment(&self, post_id: PostId, raw: &str) -> Result<Comment, Error> {
        let viewer = self.require_viewer()?;
        let content =
            CommentContent::new(raw).map_err(|error| Error::invalid_request(error.to_string()))?;
        let comment = self
            .comments
            .insert(&NewComment {
                user_id: viewer,
                post_id,
                content,
            })
            .await
            .map_err(|error| {
                warn!(%post_id, error = %error, "comment insert failed");
                Error::from(error).with_message(COMMENT_FAILED)
            })?;
        self.reload_after_write().await;
        Ok(comment)
    }

    /// Publish a post as the viewer.
    ///
    /// The viewer's profile is provisioned first since posts reference it.
    pub async fn compose(&self, raw: &str) -> Result<Post, Error> {
        self.require_viewer()?;
        let content =
            PostContent::new(raw).map_err(|error| Error::invalid_request(error.to_string()))?;
        let profile = self
            .session
            .ensure_profile()
            .await
            .map_err(|error| error.with_message(PROFILE_UNAVAILABLE))?;
        let post = self
            .posts
            .create(&NewPost {
                author_id: profile.id,
                content,
            })
            .await
            .map_err(|error| {
                warn!(error = %error, "post insert failed");
                Error::from(error).with_message(POST_FAILED)
            })?;
        info!(post_id = %post.id, "post published");
        self.reload_after_write().await;
        Ok(post)
    }

    /// Reload whenever the session's viewer changes.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn reload_on_viewer_change(self: &Arc<Self>) -> JoinHandle<()> {
        let timeline = Arc::clone(self);
        let mut snapshots = self.session.watch();
        let mut current: Option<UserId> = snapshots.borrow_and_update().viewer().cloned();
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let next = snapshots.borrow_and_update().viewer().cloned();
                if next == current {
                    continue;
                }
                current = next;
                debug!(viewer = ?current, "viewer changed; reloading feed");
                if let Err(error) = timeline.reload().await {
                    warn!(error = %error, "feed reload after viewer change failed");
                }
            }
        })
    }

    fn require_viewer(&self) -> Result<UserId, Error> {
        self.session
            .viewer()
            .ok_or_else(|| Error::unauthorized("sign in to continue"))
    }

    async fn reload_after_write(&self) {
        // The failure is already reflected in the feed state.
        if let Err(error) = self.reload().await {
            warn!(error = %error, "feed reload after write failed");
        }
    }
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
