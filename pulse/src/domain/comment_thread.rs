//! On-demand comment thread for a single post.
//!
//! The first expansion loads the newest page; later expansions reuse what
//! is already loaded. Further pages follow an opaque keyset cursor.

use std::sync::Arc;

use pagination::{Cursor, Page, PageLimit, PageRequest};
use tracing::{debug, warn};

use crate::domain::ports::CommentRepository;
use crate::domain::{Comment, CommentSortKey, Error, PostId, Timeline};

/// Message shown inside a thread whose comments failed to load.
pub const COMMENTS_UNAVAILABLE: &str = "Could not load comments.";

/// Expandable comment list under one post card.
pub struct CommentThread {
    post_id: PostId,
    comments: Arc<dyn CommentRepository>,
    limit: PageLimit,
    expanded: bool,
    loaded: bool,
    items: Vec<Comment>,
    next: Option<Cursor<CommentSortKey>>,
    error: Option<String>,
}

impl CommentThread {
    /// Collapsed, unloaded thread for `post_id`.
    pub fn new(post_id: PostId, comments: Arc<dyn CommentRepository>, limit: PageLimit) -> Self {
        Self {
            post_id,
            comments,
            limit,
            expanded: false,
            loaded: false,
            items: Vec::new(),
            next: None,
            error: None,
        }
    }

    /// Post the thread belongs to.
    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Whether the thread is open under its card.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Loaded comments, newest first.
    pub fn comments(&self) -> &[Comment] {
        &self.items
    }

    /// Whether older comments remain.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Opaque cursor for the next page.
    pub fn next_cursor(&self) -> Option<String> {
        self.next.as_ref().map(Cursor::encode)
    }

    /// Load failure message, if the last fetch failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Expand or collapse. Comments are fetched on the first successful
    /// expansion only.
    pub async fn toggle_expanded(&mut self) -> Result<(), Error> {
        self.expanded = !self.expanded;
        if self.expanded && !self.loaded {
            self.load(PageRequest::first(self.limit), false).await?;
        }
        Ok(())
    }

    /// Append the next page of older comments. Does nothing when no page
    /// remains.
    pub async fn load_more(&mut self) -> Result<(), Error> {
        let Some(cursor) = self.next.clone() else {
            return Ok(());
        };
        self.load(PageRequest::after(cursor.into_key(), self.limit), true)
            .await
    }

    /// Expand and load the page following an externally held cursor.
    pub async fn resume(&mut self, cursor: &str) -> Result<(), Error> {
        let request = PageRequest::from_cursor(Some(cursor), self.limit)
            .map_err(|error| Error::invalid_request(format!("invalid cursor: {error}")))?;
        self.expanded = true;
        self.load(request, false).await
    }

    /// Drop loaded comments and fetch the newest page again.
    pub async fn reload(&mut self) -> Result<(), Error> {
        self.loaded = false;
        self.load(PageRequest::first(self.limit), false).await
    }

    /// Comment on the post through `timeline`, then refresh the thread if
    /// it is open. A collapsed thread fetches again on its next expansion.
    ///
    /// Once the comment is stored the call succeeds; a failed thread reload
    /// only shows up in [`CommentThread::error`].
    pub async fn submit(&mut self, timeline: &Timeline, raw: &str) -> Result<Comment, Error> {
        let comment = timeline.comment(self.post_id, raw).await?;
        if !self.expanded {
            self.loaded = false;
            return Ok(comment);
        }
        if let Err(error) = self.reload().await {
            debug!(post_id = %self.post_id, error = %error, "thread reload after comment failed");
        }
        Ok(comment)
    }

    async fn load(
        &mut self,
        request: PageRequest<CommentSortKey>,
        append: bool,
    ) -> Result<(), Error> {
        let rows = self
            .comments
            .list_for_post(
                self.post_id,
                request.after_key().copied(),
                request.limit().overfetch(),
            )
            .await;
        let rows = match rows {
            Ok(rows) => rows,
            Err(error) => {
                warn!(post_id = %self.post_id, error = %error, "comment fetch failed");
                self.error = Some(COMMENTS_UNAVAILABLE.to_owned());
                return Err(Error::from(error).with_message(COMMENTS_UNAVAILABLE));
            }
        };

        let page = Page::from_overfetch(rows, request.limit(), Comment::sort_key);
        let (items, next) = page.into_parts();
        debug!(
            post_id = %self.post_id,
            count = items.len(),
            more = next.is_some(),
            "comments loaded"
        );
        if append {
            self.items.extend(items);
        } else {
            self.items = items;
        }
        self.next = next;
        self.loaded = true;
        self.error = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "comment_thread_tests.rs"]
mod tests;
