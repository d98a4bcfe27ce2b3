//! In-process backend implementing every port.
//!
//! Mirrors the hosted backend's contract closely enough for behaviour tests
//! and demos: primary keys and uniqueness constraints are enforced and
//! reported as conflicts, foreign keys are checked, and aggregate counters
//! are computed on read. Nothing is persisted.

mod identity;
mod repositories;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use zeroize::Zeroizing;

use crate::domain::ports::{DataAccessError, IdentityBroadcaster};
use crate::domain::{
    Comment, Follow, Identity, IdentityMetadata, InteractionKind, InteractionRecord, NewProfile,
    Post, PostCounters, PostId, Profile, UserId,
};

/// Stored post plus its insertion sequence, used to order timestamp ties.
#[derive(Debug, Clone)]
struct PostRow {
    seq: u64,
    post: Post,
}

#[derive(Clone)]
struct Account {
    identity: Identity,
    password: Zeroizing<String>,
}

#[derive(Default)]
struct Tables {
    seq: u64,
    profiles: BTreeMap<UserId, Profile>,
    posts: Vec<PostRow>,
    likes: Vec<InteractionRecord>,
    retweets: Vec<InteractionRecord>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn interactions(&self, kind: InteractionKind) -> &Vec<InteractionRecord> {
        match kind {
            InteractionKind::Like => &self.likes,
            InteractionKind::Retweet => &self.retweets,
        }
    }

    fn interactions_mut(&mut self, kind: InteractionKind) -> &mut Vec<InteractionRecord> {
        match kind {
            InteractionKind::Like => &mut self.likes,
            InteractionKind::Retweet => &mut self.retweets,
        }
    }

    fn counters(&self, post_id: PostId) -> PostCounters {
        let count = |rows: usize| u64::try_from(rows).unwrap_or(u64::MAX);
        PostCounters {
            likes: count(self.likes.iter().filter(|row| row.post_id == post_id).count()),
            retweets: count(
                self.retweets
                    .iter()
                    .filter(|row| row.post_id == post_id)
                    .count(),
            ),
            comments: count(
                self.comments
                    .iter()
                    .filter(|row| row.post_id == post_id)
                    .count(),
            ),
        }
    }

    fn insert_profile(
        &mut self,
        profile: &NewProfile,
        now: DateTime<Utc>,
    ) -> Result<Profile, DataAccessError> {
        if self.profiles.contains_key(&profile.id) {
            return Err(DataAccessError::conflict(
                "duplicate key value violates unique constraint \"profiles_pkey\"",
            ));
        }
        if self
            .profiles
            .values()
            .any(|existing| existing.username == profile.username)
        {
            return Err(DataAccessError::conflict(
                "duplicate key value violates unique constraint \"profiles_username_key\"",
            ));
        }
        let stored = Profile {
            id: profile.id.clone(),
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            bio: None,
            created_at: now,
        };
        self.profiles.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn insert_post(&mut self, post: Post) -> Post {
        let seq = self.next_seq();
        self.posts.push(PostRow {
            seq,
            post: post.clone(),
        });
        post
    }
}

/// Shared in-memory backend.
///
/// Cloning is cheap and every clone observes the same tables.
#[derive(Clone)]
pub struct InMemoryBackend {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
    events: IdentityBroadcaster,
    clock: Arc<dyn Clock + Send + Sync>,
    require_confirmation: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Empty backend reading timestamps from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            offline: Arc::new(AtomicBool::new(false)),
            events: IdentityBroadcaster::default(),
            clock,
            require_confirmation: false,
        }
    }

    /// Require email confirmation before sign-up opens a session.
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Simulate the backend becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Create a confirmed account that can sign in with `password`.
    pub fn register_account(
        &self,
        email: &str,
        password: &str,
        metadata: IdentityMetadata,
    ) -> Result<Identity, DataAccessError> {
        let identity = Identity::new(UserId::random(), Some(email.to_owned()), metadata);
        let mut tables = self.lock()?;
        if tables.accounts.contains_key(email) {
            return Err(DataAccessError::conflict(format!(
                "account {email} already exists"
            )));
        }
        tables.accounts.insert(
            email.to_owned(),
            Account {
                identity: identity.clone(),
                password: Zeroizing::new(password.to_owned()),
            },
        );
        Ok(identity)
    }

    /// Insert a profile row directly.
    pub fn seed_profile(&self, profile: &NewProfile) -> Result<Profile, DataAccessError> {
        let now = self.clock.utc();
        self.lock()?.insert_profile(profile, now)
    }

    /// Insert a post with an explicit timestamp.
    pub fn seed_post(
        &self,
        author_id: &UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Post, DataAccessError> {
        let mut tables = self.lock()?;
        if !tables.profiles.contains_key(author_id) {
            return Err(DataAccessError::rejected(format!(
                "author {author_id} has no profile"
            )));
        }
        Ok(tables.insert_post(Post {
            id: PostId::random(),
            author_id: author_id.clone(),
            content: content.to_owned(),
            image_url: None,
            created_at,
            counters: PostCounters::default(),
        }))
    }

    /// Number of stored profile rows for `id`.
    pub fn profile_count(&self, id: &UserId) -> usize {
        self.lock()
            .map(|tables| usize::from(tables.profiles.contains_key(id)))
            .unwrap_or_default()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    fn ensure_online(&self) -> Result<(), DataAccessError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DataAccessError::connection("backend offline"));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, DataAccessError> {
        self.tables
            .lock()
            .map_err(|_| DataAccessError::query("in-memory tables lock poisoned"))
    }

    /// Lock the tables after checking connectivity.
    fn connect(&self) -> Result<MutexGuard<'_, Tables>, DataAccessError> {
        self.ensure_online()?;
        self.lock()
    }
}

#[cfg(test)]
mod tests;
