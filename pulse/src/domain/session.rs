//! Session state: the signed-in identity and its provisioned profile.
//!
//! [`SessionState`] is owned by the application and injected wherever the
//! viewer is needed. Observers follow it through a `watch` channel and see
//! every snapshot the session publishes. [`SessionState::mount`] wires the
//! session to the identity provider's change stream until the returned
//! [`SessionMount`] is unmounted.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::{IdentityProvider, IdentitySubscription};
use crate::domain::{
    Credentials, Error, Identity, ProfileProvisioner, Profile, SignUpOutcome, UserId,
};

/// Immutable view of the session published to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Signed-in identity; `None` when signed out.
    pub identity: Option<Identity>,
    /// Profile owned by `identity`, once provisioned.
    pub profile: Option<Profile>,
    /// Provisioning failure for the current identity.
    pub error: Option<Error>,
}

impl SessionSnapshot {
    /// Identifier of the signed-in viewer.
    pub fn viewer(&self) -> Option<&UserId> {
        self.identity.as_ref().map(Identity::id)
    }
}

/// Current identity plus derived profile.
pub struct SessionState {
    provider: Arc<dyn IdentityProvider>,
    provisioner: ProfileProvisioner,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    /// Signed-out session over `provider`.
    pub fn new(provider: Arc<dyn IdentityProvider>, provisioner: ProfileProvisioner) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            provider,
            provisioner,
            snapshot,
        }
    }

    /// Copy of the latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Identifier of the signed-in viewer.
    pub fn viewer(&self) -> Option<UserId> {
        self.snapshot.borrow().viewer().cloned()
    }

    /// Replace the identity and derive the profile.
    ///
    /// A present identity runs provisioning; an absent one clears the cached
    /// profile. Observers are notified either way.
    pub async fn observe(&self, identity: Option<Identity>) {
        let next = match identity {
            Some(identity) => match self.provisioner.ensure_profile(&identity).await {
                Ok(profile) => SessionSnapshot {
                    identity: Some(identity),
                    profile: Some(profile),
                    error: None,
                },
                Err(error) => {
                    warn!(user_id = %identity.id(), error = %error, "profile provisioning failed");
                    SessionSnapshot {
                        identity: Some(identity),
                        profile: None,
                        error: Some(error),
                    }
                }
            },
            None => SessionSnapshot::default(),
        };
        self.snapshot.send_replace(next);
    }

    /// Start following the identity provider.
    ///
    /// The current session is fetched once; a failure is treated as signed
    /// out and not retried. Identity events are then applied until the
    /// returned mount is unmounted.
    pub async fn mount(self: &Arc<Self>) -> SessionMount {
        let initial = match self.provider.current_identity().await {
            Ok(identity) => identity,
            Err(error) => {
                warn!(error = %error, "initial session fetch failed; treating as signed out");
                None
            }
        };
        self.observe(initial).await;

        let subscription = self.provider.subscribe();
        let (shutdown, stop) = oneshot::channel();
        let state = Arc::clone(self);
        let task = tokio::spawn(async move { state.follow(subscription, stop).await });
        SessionMount {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    async fn follow(&self, mut subscription: IdentitySubscription, mut stop: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    debug!(kind = ?event.kind, "identity event");
                    self.observe(event.identity).await;
                }
            }
        }
        if subscription.unsubscribe() {
            debug!("identity subscription released");
        }
    }

    /// Sign in and provision the profile.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SessionSnapshot, Error> {
        let identity = self.provider.sign_in(credentials).await?;
        info!(user_id = %identity.id(), "signed in");
        self.observe(Some(identity)).await;
        Ok(self.snapshot())
    }

    /// Register an account.
    ///
    /// When the provider opens a session immediately the profile is
    /// provisioned; otherwise the caller must ask the user to confirm their
    /// email.
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, Error> {
        let outcome = self.provider.sign_up(credentials).await?;
        match &outcome {
            SignUpOutcome::SignedIn(identity) => {
                info!(user_id = %identity.id(), "signed up");
                self.observe(Some(identity.clone())).await;
            }
            SignUpOutcome::ConfirmationRequired => {
                info!(email = credentials.email(), "sign-up awaiting confirmation");
            }
        }
        Ok(outcome)
    }

    /// Sign out, clearing identity and profile.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.provider.sign_out().await?;
        info!("signed out");
        self.observe(None).await;
        Ok(())
    }

    /// Profile of the signed-in viewer, provisioning it if still missing.
    pub async fn ensure_profile(&self) -> Result<Profile, Error> {
        let current = self.snapshot();
        if let Some(profile) = current.profile {
            return Ok(profile);
        }
        let identity = current
            .identity
            .ok_or_else(|| Error::unauthorized("sign in to continue"))?;
        let profile = self.provisioner.ensure_profile(&identity).await?;
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.viewer() != Some(identity.id()) {
                return false;
            }
            snapshot.profile = Some(profile.clone());
            snapshot.error = None;
            true
        });
        Ok(profile)
    }
}

/// Live link between a [`SessionState`] and the identity change stream.
///
/// Dropping the mount stops the listener as well; [`SessionMount::unmount`]
/// additionally waits for it to finish.
#[derive(Debug)]
pub struct SessionMount {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionMount {
    /// Stop applying identity events and release the subscription.
    ///
    /// Once this returns no further event reaches the session.
    pub async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(error) = task.await {
            warn!(error = %error, "session listener ended abnormally");
        }
    }
}

impl Drop for SessionMount {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
