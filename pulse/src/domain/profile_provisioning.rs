//! Lazy creation of the profile row owned by an identity.
//!
//! Provisioning is idempotent per identity: concurrent callers may all try
//! to insert, the backend keeps one row, and the losers adopt it on re-read.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::domain::ports::{DataAccessError, ProfileRepository};
use crate::domain::{
    BaseHandle, Error, Identity, NewProfile, Profile, USERNAME_SUFFIX_BOUND, Username,
};

/// Default number of usernames tried before provisioning gives up.
pub const DEFAULT_USERNAME_ATTEMPTS: u32 = 3;

/// Source of numeric username suffixes in `[0, USERNAME_SUFFIX_BOUND)`.
#[cfg_attr(test, mockall::automock)]
pub trait UsernameSuffixSource: Send + Sync {
    /// Draw the next suffix.
    fn next_suffix(&self) -> u32;
}

/// Suffix source backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSuffix;

impl UsernameSuffixSource for ThreadRngSuffix {
    fn next_suffix(&self) -> u32 {
        rand::thread_rng().gen_range(0..USERNAME_SUFFIX_BOUND)
    }
}

/// Ensures every signed-in identity owns exactly one profile.
#[derive(Clone)]
pub struct ProfileProvisioner {
    profiles: Arc<dyn ProfileRepository>,
    suffixes: Arc<dyn UsernameSuffixSource>,
    max_attempts: u32,
}

impl ProfileProvisioner {
    /// Provisioner drawing suffixes from the thread RNG.
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            profiles,
            suffixes: Arc::new(ThreadRngSuffix),
            max_attempts: DEFAULT_USERNAME_ATTEMPTS,
        }
    }

    /// Replace the suffix source.
    pub fn with_suffix_source(mut self, suffixes: Arc<dyn UsernameSuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Bound the number of usernames tried. Values below one are raised to
    /// one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Return the identity's profile, creating it on first use.
    ///
    /// A uniqueness conflict on insert triggers a re-read by identity id.
    /// If the row now exists (another session won the race) it is adopted;
    /// otherwise the username was taken and a fresh suffix is tried.
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<Profile, Error> {
        if let Some(profile) = self.profiles.find_by_id(identity.id()).await? {
            debug!(user_id = %identity.id(), "profile already provisioned");
            return Ok(profile);
        }

        let base = BaseHandle::from_email(identity.email());
        let full_name = identity
            .metadata()
            .full_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| base.as_str().to_owned());

        let mut last_conflict = None;
        for attempt in 1..=self.max_attempts {
            let candidate = NewProfile {
                id: identity.id().clone(),
                username: Username::with_suffix(&base, self.suffixes.next_suffix()),
                full_name: full_name.clone(),
                avatar_url: identity.metadata().avatar_url.clone(),
            };

            match self.profiles.insert(&candidate).await {
                Ok(profile) => {
                    info!(
                        user_id = %profile.id,
                        username = %profile.username,
                        attempt,
                        "profile provisioned"
                    );
                    return Ok(profile);
                }
                Err(DataAccessError::Conflict { message }) => {
                    if let Some(existing) = self.profiles.find_by_id(identity.id()).await? {
                        debug!(user_id = %identity.id(), "adopted concurrently created profile");
                        return Ok(existing);
                    }
                    warn!(
                        user_id = %identity.id(),
                        username = %candidate.username,
                        attempt,
                        "username taken; retrying with a new suffix"
                    );
                    last_conflict = Some(message);
                }
                Err(error) => {
                    warn!(
                        user_id = %identity.id(),
                        error = %error,
                        kind = error.variant_name(),
                        "profile insert failed"
                    );
                    return Err(error.into());
                }
            }
        }

        let message = last_conflict.unwrap_or_default();
        Err(Error::conflict(format!(
            "no free username after {} attempts",
            self.max_attempts
        ))
        .with_details(serde_json::json!({ "lastConflict": message })))
    }
}

#[cfg(test)]
#[path = "profile_provisioning_tests.rs"]
mod tests;
