//! Plain-text rendering of feed, thread and suggestion state.
//!
//! Renderers return strings so the binary decides where output goes and
//! tests can assert on exact text.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::{
    Comment, CommentThread, Error, FeedPost, FeedState, FollowGraph, InteractionKind, Profile,
    format_relative,
};

const UNKNOWN_AUTHOR: &str = "unknown author";
const EMPTY_FEED: &str = "No posts yet.";
const LOADING_FEED: &str = "Loading feed...";
const EMPTY_THREAD: &str = "No comments yet.";
const EMPTY_SUGGESTIONS: &str = "No one to suggest right now.";

/// Renders domain state for a terminal, labelling ages against `clock`.
#[derive(Clone)]
pub struct TerminalView {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl TerminalView {
    /// Create a view reading "now" from `clock`.
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { clock }
    }

    /// One post card: author line, content, then counters with the
    /// viewer's marks.
    pub fn card(&self, post: &FeedPost) -> String {
        let age = format_relative(post.post.created_at, self.clock.utc());
        let author = post
            .author
            .as_ref()
            .map_or_else(|| UNKNOWN_AUTHOR.to_owned(), byline);
        let interactions = InteractionKind::ALL.map(|kind| counter(post, kind)).join("  ");
        format!(
            "{author} · {age}\n{}\n{interactions}  {} comments\nid {}",
            post.post.content,
            post.post.counters.comments,
            post.id(),
        )
    }

    /// Whole feed, or its loading, error or empty notice.
    pub fn feed(&self, state: &FeedState) -> String {
        if state.loading && state.posts.is_empty() {
            return LOADING_FEED.to_owned();
        }
        if let Some(error) = state.error.as_deref() {
            return error.to_owned();
        }
        if state.posts.is_empty() {
            return EMPTY_FEED.to_owned();
        }
        state
            .posts
            .iter()
            .map(|post| self.card(post))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Expanded thread; collapsed threads render as an empty string.
    pub fn thread(&self, thread: &CommentThread) -> String {
        if !thread.is_expanded() {
            return String::new();
        }
        let mut lines = Vec::new();
        if let Some(error) = thread.error() {
            lines.push(error.to_owned());
        }
        if thread.comments().is_empty() && thread.error().is_none() {
            lines.push(EMPTY_THREAD.to_owned());
        }
        lines.extend(thread.comments().iter().map(|comment| self.comment(comment)));
        if let Some(cursor) = thread.next_cursor() {
            lines.push(format!("more: {cursor}"));
        }
        lines.join("\n")
    }

    fn comment(&self, comment: &Comment) -> String {
        let age = format_relative(comment.created_at, self.clock.utc());
        let who = comment
            .author
            .as_ref()
            .map_or_else(|| UNKNOWN_AUTHOR.to_owned(), byline);
        format!("{who} · {age}: {}", comment.content)
    }

    /// Follow suggestions with the viewer's current follow marks.
    pub fn suggestions(graph: &FollowGraph) -> String {
        let mut lines = Vec::new();
        if let Some(error) = graph.error() {
            lines.push(error.to_owned());
        }
        if graph.candidates().is_empty() && graph.error().is_none() {
            lines.push(EMPTY_SUGGESTIONS.to_owned());
        }
        lines.extend(graph.candidates().iter().map(|profile| {
            let mark = if graph.is_following(&profile.id) {
                "following"
            } else {
                "follow"
            };
            format!("{} [{mark}] id {}", byline(profile), profile.id)
        }));
        if let Some(cursor) = graph.next_cursor() {
            lines.push(format!("more: {cursor}"));
        }
        lines.join("\n")
    }

    /// User-facing line for a failed action.
    pub fn error(error: &Error) -> String {
        format!("error: {}", error.message())
    }
}

fn byline(profile: &Profile) -> String {
    format!("{} @{}", profile.display_name(), profile.username)
}

fn counter(post: &FeedPost, kind: InteractionKind) -> String {
    let mark = if post.interaction(kind).is_present() {
        " (you)"
    } else {
        ""
    };
    let count = post.post.counters.for_kind(kind);
    format!("{count} {}{mark}", kind.collection())
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
