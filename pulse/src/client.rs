//! Composition root wiring backend ports into the domain services.

use std::sync::Arc;

use pagination::PageLimit;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::PulseSettings;
use crate::domain::ports::{
    CommentRepository, FollowRepository, IdentityProvider, InteractionRepository, PostRepository,
    ProfileRepository,
};
use crate::domain::{
    CommentThread, DEFAULT_SUGGESTION_PAGE, DEFAULT_USERNAME_ATTEMPTS, DomainResult, FollowGraph,
    PostId, ProfileProvisioner, SessionMount, SessionState, Timeline, UsernameSuffixSource,
};

/// Every port the client needs, as trait objects.
#[derive(Clone)]
pub struct PulsePorts {
    /// Sign-in and identity change stream.
    pub identity: Arc<dyn IdentityProvider>,
    /// `profiles` table.
    pub profiles: Arc<dyn ProfileRepository>,
    /// Posts and the feed view.
    pub posts: Arc<dyn PostRepository>,
    /// Likes and retweets.
    pub interactions: Arc<dyn InteractionRepository>,
    /// Comment rows under posts.
    pub comments: Arc<dyn CommentRepository>,
    /// Follow edges between profiles.
    pub follows: Arc<dyn FollowRepository>,
}

impl PulsePorts {
    /// Share one backend implementing every port.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: IdentityProvider
            + ProfileRepository
            + PostRepository
            + InteractionRepository
            + CommentRepository
            + FollowRepository
            + 'static,
    {
        let shared = Arc::new(backend);
        Self {
            identity: Arc::clone(&shared) as Arc<dyn IdentityProvider>,
            profiles: Arc::clone(&shared) as Arc<dyn ProfileRepository>,
            posts: Arc::clone(&shared) as Arc<dyn PostRepository>,
            interactions: Arc::clone(&shared) as Arc<dyn InteractionRepository>,
            comments: Arc::clone(&shared) as Arc<dyn CommentRepository>,
            follows: shared as Arc<dyn FollowRepository>,
        }
    }
}

/// Tunables applied when building the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Username suffixes tried before provisioning gives up.
    pub username_attempts: u32,
    /// Comments fetched per thread page.
    pub comment_page: PageLimit,
    /// Profiles fetched per suggestion page.
    pub suggestion_page: PageLimit,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            username_attempts: DEFAULT_USERNAME_ATTEMPTS,
            comment_page: PageLimit::saturating(crate::config::DEFAULT_COMMENT_PAGE),
            suggestion_page: PageLimit::saturating(DEFAULT_SUGGESTION_PAGE),
        }
    }
}

impl From<&PulseSettings> for ClientOptions {
    fn from(settings: &PulseSettings) -> Self {
        Self {
            username_attempts: settings.username_attempts(),
            comment_page: PageLimit::saturating(settings.comment_page_size()),
            suggestion_page: PageLimit::saturating(settings.suggestion_page_size()),
        }
    }
}

/// Session, timeline and widget factories over one set of ports.
#[derive(Clone)]
pub struct PulseClient {
    ports: PulsePorts,
    session: Arc<SessionState>,
    timeline: Arc<Timeline>,
    options: ClientOptions,
}

impl PulseClient {
    /// Build the services with random username suffixes.
    pub fn new(ports: PulsePorts, options: ClientOptions) -> Self {
        let provisioner = ProfileProvisioner::new(Arc::clone(&ports.profiles))
            .with_max_attempts(options.username_attempts);
        Self::with_provisioner(ports, options, provisioner)
    }

    /// Build the services drawing username suffixes from `suffixes`.
    pub fn with_suffix_source(
        ports: PulsePorts,
        options: ClientOptions,
        suffixes: Arc<dyn UsernameSuffixSource>,
    ) -> Self {
        let provisioner = ProfileProvisioner::new(Arc::clone(&ports.profiles))
            .with_suffix_source(suffixes)
            .with_max_attempts(options.username_attempts);
        Self::with_provisioner(ports, options, provisioner)
    }

    fn with_provisioner(
        ports: PulsePorts,
        options: ClientOptions,
        provisioner: ProfileProvisioner,
    ) -> Self {
        let session = Arc::new(SessionState::new(
            Arc::clone(&ports.identity),
            provisioner,
        ));
        let timeline = Arc::new(Timeline::new(
            Arc::clone(&session),
            Arc::clone(&ports.posts),
            Arc::clone(&ports.interactions),
            Arc::clone(&ports.comments),
        ));
        Self {
            ports,
            session,
            timeline,
            options,
        }
    }

    /// Shared session state.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Shared timeline.
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Follow the identity provider and load the first feed.
    ///
    /// From then on every change of viewer reloads the feed. Keep the
    /// returned mount alive for as long as session updates matter.
    pub async fn start(&self) -> DomainResult<ClientMount> {
        let session = self.session.mount().await;
        let reload = self.timeline.reload_on_viewer_change();
        let mount = ClientMount {
            session: Some(session),
            reload: Some(reload),
        };
        self.timeline.reload().await?;
        Ok(mount)
    }

    /// Collapsed comment thread for one post.
    pub fn comment_thread(&self, post_id: PostId) -> CommentThread {
        CommentThread::new(
            post_id,
            Arc::clone(&self.ports.comments),
            self.options.comment_page,
        )
    }

    /// Empty follow suggestion widget bound to the session's viewer.
    pub fn follow_graph(&self) -> FollowGraph {
        FollowGraph::new(
            Arc::clone(&self.session),
            Arc::clone(&self.ports.profiles),
            Arc::clone(&self.ports.follows),
            self.options.suggestion_page,
        )
    }
}

/// Background work started by [`PulseClient::start`].
///
/// Dropping the mount stops the session listener and the feed reload task;
/// [`ClientMount::unmount`] also waits for the listener to finish.
#[derive(Debug)]
pub struct ClientMount {
    session: Option<SessionMount>,
    reload: Option<JoinHandle<()>>,
}

impl ClientMount {
    /// Stop following identity changes and stop reloading the feed.
    pub async fn unmount(mut self) {
        if let Some(reload) = self.reload.take() {
            reload.abort();
            match reload.await {
                Err(error) if !error.is_cancelled() => {
                    warn!(error = %error, "feed reload task ended abnormally");
                }
                _ => {}
            }
        }
        if let Some(session) = self.session.take() {
            session.unmount().await;
        }
    }
}

impl Drop for ClientMount {
    fn drop(&mut self) {
        if let Some(reload) = self.reload.take() {
            reload.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::domain::{
        Credentials, FeedPost, FeedState, IdentityMetadata, InteractionKind, NewProfile, UserId,
        Username,
    };
    use crate::outbound::memory::InMemoryBackend;

    async fn wait_for_feed(client: &PulseClient, ready: impl Fn(&FeedState) -> bool) -> FeedState {
        let mut feed = client.timeline().watch();
        let state = tokio::time::timeout(Duration::from_secs(1), feed.wait_for(|state| ready(state)))
            .await
            .expect("feed reloaded in time")
            .expect("timeline alive");
        state.clone()
    }

    #[tokio::test]
    async fn start_mounts_session_and_loads_feed() {
        let backend = InMemoryBackend::new();
        backend
            .register_account("ada@example.com", "secret", IdentityMetadata::default())
            .expect("account");
        let client = PulseClient::new(
            PulsePorts::from_backend(backend.clone()),
            ClientOptions::default(),
        );

        let mount = client.start().await.expect("start");
        assert!(client.session().snapshot().identity.is_none());
        assert!(client.timeline().state().posts.is_empty());

        let credentials = Credentials::try_from_parts("ada@example.com", "secret").expect("creds");
        let snapshot = client.session().sign_in(&credentials).await.expect("sign in");
        let profile = snapshot.profile.expect("profile provisioned");
        assert!(profile.username.as_ref().starts_with("ada"));

        client.timeline().compose("first post").await.expect("compose");
        assert_eq!(client.timeline().state().posts.len(), 1);
        mount.unmount().await;
    }

    #[tokio::test]
    async fn viewer_changes_reload_the_feed() {
        let backend = InMemoryBackend::new();
        let ada = backend
            .register_account("ada@example.com", "secret", IdentityMetadata::default())
            .expect("account");
        let author = backend
            .seed_profile(&NewProfile {
                id: UserId::random(),
                username: Username::new("grace").expect("username"),
                full_name: "Grace".to_owned(),
                avatar_url: None,
            })
            .expect("author");
        let post = backend
            .seed_post(&author.id, "hello", Utc::now())
            .expect("post");
        InteractionRepository::insert(&backend, InteractionKind::Like, ada.id(), post.id)
            .await
            .expect("seed like");
        let client = PulseClient::new(
            PulsePorts::from_backend(backend.clone()),
            ClientOptions::default(),
        );

        let mount = client.start().await.expect("start");
        assert_eq!(client.timeline().state().posts[0].liked_by_me(), None);

        let credentials = Credentials::try_from_parts("ada@example.com", "secret").expect("creds");
        client.session().sign_in(&credentials).await.expect("sign in");
        let signed_in = wait_for_feed(&client, |state| {
            state.posts.first().and_then(FeedPost::liked_by_me) == Some(true)
        })
        .await;
        assert!(signed_in.posts[0].like_id().is_some());

        client.session().sign_out().await.expect("sign out");
        let signed_out = wait_for_feed(&client, |state| {
            state.posts.first().is_some_and(|post| post.viewer.is_none())
        })
        .await;
        assert_eq!(signed_out.posts[0].liked_by_me(), None);
        mount.unmount().await;
    }

    #[test]
    fn options_clamp_configured_page_sizes() {
        let options = ClientOptions {
            comment_page: PageLimit::saturating(0),
            ..ClientOptions::default()
        };
        assert_eq!(options.comment_page.get(), 1);
        assert_eq!(ClientOptions::default().suggestion_page.get(), 5);
    }
}
