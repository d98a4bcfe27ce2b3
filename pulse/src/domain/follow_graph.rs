//! "Who to follow" widget state.
//!
//! Holds a page of suggested profiles plus the viewer's outgoing follow set.
//! Toggling a follow only touches the local set; suggestions are not
//! refetched. The viewer is read from the session on every action, so a
//! sign-out or account switch resets the widget before anything is written.

use std::collections::HashSet;
use std::sync::Arc;

use pagination::{Cursor, Page, PageLimit, PageRequest};
use tracing::{debug, warn};

use crate::domain::ports::{FollowRepository, ProfileRepository};
use crate::domain::{Error, Profile, SessionState, UserId};

/// Default number of suggested profiles per page.
pub const DEFAULT_SUGGESTION_PAGE: usize = 5;

/// Message shown when suggestions cannot be loaded.
pub const SUGGESTIONS_UNAVAILABLE: &str = "Could not load suggestions.";
/// Message shown when following fails.
pub const FOLLOW_FAILED: &str = "Could not follow this profile.";
/// Message shown when unfollowing fails.
pub const UNFOLLOW_FAILED: &str = "Could not unfollow this profile.";

/// Follow suggestions and the viewer's following set.
pub struct FollowGraph {
    session: Arc<SessionState>,
    profiles: Arc<dyn ProfileRepository>,
    follows: Arc<dyn FollowRepository>,
    limit: PageLimit,
    viewer: Option<UserId>,
    candidates: Vec<Profile>,
    next: Option<Cursor<UserId>>,
    following: HashSet<UserId>,
    error: Option<String>,
}

impl FollowGraph {
    /// Empty widget; call [`FollowGraph::refresh`] to load it.
    pub fn new(
        session: Arc<SessionState>,
        profiles: Arc<dyn ProfileRepository>,
        follows: Arc<dyn FollowRepository>,
        limit: PageLimit,
    ) -> Self {
        Self {
            session,
            profiles,
            follows,
            limit,
            viewer: None,
            candidates: Vec::new(),
            next: None,
            following: HashSet::new(),
            error: None,
        }
    }

    /// Suggested profiles loaded so far.
    pub fn candidates(&self) -> &[Profile] {
        &self.candidates
    }

    /// Profiles the viewer follows.
    pub fn following(&self) -> &HashSet<UserId> {
        &self.following
    }

    /// Whether the viewer follows `profile_id`.
    pub fn is_following(&self, profile_id: &UserId) -> bool {
        self.following.contains(profile_id)
    }

    /// Whether more suggestions can be fetched.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Opaque cursor for the next page of suggestions.
    pub fn next_cursor(&self) -> Option<String> {
        self.next.as_ref().map(Cursor::encode)
    }

    /// Load failure message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reset for the session's current viewer.
    ///
    /// Without a viewer everything is cleared. Otherwise the first page of
    /// other profiles and the complete following set are fetched together.
    pub async fn refresh(&mut self) -> Result<(), Error> {
        self.viewer = self.session.viewer();
        self.candidates.clear();
        self.following.clear();
        self.next = None;
        self.error = None;
        let Some(viewer) = self.viewer.clone() else {
            return Ok(());
        };

        let request = PageRequest::first(self.limit);
        let (page, following) = tokio::join!(
            self.fetch_page(&viewer, &request),
            self.follows.following_ids(&viewer),
        );
        let following = following.map_err(|error| {
            warn!(viewer = %viewer, error = %error, "following set fetch failed");
            Error::from(error).with_message(SUGGESTIONS_UNAVAILABLE)
        });
        match (page, following) {
            (Ok(page), Ok(following)) => {
                let (items, next) = page.into_parts();
                self.candidates = items;
                self.next = next;
                self.following = following.into_iter().collect();
                debug!(
                    viewer = %viewer,
                    candidates = self.candidates.len(),
                    following = self.following.len(),
                    "follow graph loaded"
                );
                Ok(())
            }
            (Err(error), _) | (_, Err(error)) => {
                self.error = Some(SUGGESTIONS_UNAVAILABLE.to_owned());
                Err(error)
            }
        }
    }

    /// Append the next page of suggestions.
    pub async fn load_more(&mut self) -> Result<(), Error> {
        if self.sync_viewer().await? {
            return Ok(());
        }
        let (Some(viewer), Some(cursor)) = (self.viewer.clone(), self.next.clone()) else {
            return Ok(());
        };
        self.load_after(&viewer, PageRequest::after(cursor.into_key(), self.limit))
            .await
    }

    /// Load the page of suggestions following an externally held cursor.
    pub async fn resume(&mut self, cursor: &str) -> Result<(), Error> {
        self.sync_viewer().await?;
        let viewer = self.require_viewer()?;
        let request = PageRequest::from_cursor(Some(cursor), self.limit)
            .map_err(|error| Error::invalid_request(format!("invalid cursor: {error}")))?;
        self.load_after(&viewer, request).await
    }

    /// Follow or unfollow `profile_id`, returning whether the viewer now
    /// follows it.
    ///
    /// A duplicate edge on insert means the viewer already follows the
    /// profile.
    pub async fn toggle(&mut self, profile_id: &UserId) -> Result<bool, Error> {
        self.sync_viewer().await?;
        let viewer = self.require_viewer()?;
        if self.following.contains(profile_id) {
            self.follows
                .delete(&viewer, profile_id)
                .await
                .map_err(|error| {
                    warn!(%viewer, target = %profile_id, error = %error, "unfollow failed");
                    Error::from(error).with_message(UNFOLLOW_FAILED)
                })?;
            self.following.remove(profile_id);
            return Ok(false);
        }

        match self.follows.insert(&viewer, profile_id).await {
            Ok(_) => {}
            Err(error) if error.is_conflict() => {
                debug!(%viewer, target = %profile_id, "already following");
            }
            Err(error) => {
                warn!(%viewer, target = %profile_id, error = %error, "follow failed");
                return Err(Error::from(error).with_message(FOLLOW_FAILED));
            }
        }
        self.following.insert(profile_id.clone());
        Ok(true)
    }

    /// Refresh when the session's viewer differs from the loaded one.
    /// Returns `true` when a refresh ran.
    async fn sync_viewer(&mut self) -> Result<bool, Error> {
        if self.session.viewer() == self.viewer {
            return Ok(false);
        }
        debug!(previous = ?self.viewer, "viewer changed; resetting follow graph");
        self.refresh().await?;
        Ok(true)
    }

    fn require_viewer(&self) -> Result<UserId, Error> {
        self.viewer
            .clone()
            .ok_or_else(|| Error::unauthorized("sign in to continue"))
    }

    async fn load_after(
        &mut self,
        viewer: &UserId,
        request: PageRequest<UserId>,
    ) -> Result<(), Error> {
        match self.fetch_page(viewer, &request).await {
            Ok(page) => {
                let (items, next) = page.into_parts();
                self.candidates.extend(items);
                self.next = next;
                self.error = None;
                Ok(())
            }
            Err(error) => {
                self.error = Some(SUGGESTIONS_UNAVAILABLE.to_owned());
                Err(error)
            }
        }
    }

    async fn fetch_page(
        &self,
        viewer: &UserId,
        request: &PageRequest<UserId>,
    ) -> Result<Page<Profile, UserId>, Error> {
        let rows = self
            .profiles
            .list_suggestions(
                viewer,
                request.after_key().cloned(),
                request.limit().overfetch(),
            )
            .await
            .map_err(|error| {
                warn!(viewer = %viewer, error = %error, "suggestion fetch failed");
                Error::from(error).with_message(SUGGESTIONS_UNAVAILABLE)
            })?;
        Ok(Page::from_overfetch(rows, request.limit(), |profile| {
            profile.id.clone()
        }))
    }
}

#[cfg(test)]
#[path = "follow_graph_tests.rs"]
mod tests;
