//! Port for the hosted identity service.
//!
//! The provider owns authentication and pushes identity transitions to
//! subscribers. Adapters publish through an [`IdentityBroadcaster`]; callers
//! hold an [`IdentitySubscription`] until they unsubscribe.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::{Credentials, Error, Identity, IdentityEvent, SignUpOutcome};

use super::define_port_error;

/// Number of buffered identity events per subscriber.
const EVENT_BUFFER: usize = 16;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The identity service could not be reached.
        Connection { message: String } => "identity service unreachable: {message}",
        /// Email/password pair was not accepted.
        InvalidCredentials => "invalid email or password",
        /// The request was refused, e.g. the email is already registered.
        Rejected { message: String } => "identity request rejected: {message}",
        /// The response could not be interpreted.
        Query { message: String } => "identity response invalid: {message}",
    }
}

impl From<IdentityProviderError> for Error {
    fn from(value: IdentityProviderError) -> Self {
        match value {
            IdentityProviderError::Connection { message } => {
                Error::service_unavailable(format!("identity service unreachable: {message}"))
            }
            IdentityProviderError::InvalidCredentials => {
                Error::unauthorized("invalid email or password")
            }
            IdentityProviderError::Rejected { message } => {
                Error::invalid_request(format!("identity request rejected: {message}"))
            }
            IdentityProviderError::Query { message } => {
                Error::internal(format!("identity response invalid: {message}"))
            }
        }
    }
}

/// Fan-out sender for identity transitions.
#[derive(Debug, Clone)]
pub struct IdentityBroadcaster {
    sender: broadcast::Sender<IdentityEvent>,
}

impl Default for IdentityBroadcaster {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }
}

impl IdentityBroadcaster {
    /// Register a new subscriber. Only events published afterwards are seen.
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Deliver `event` to every live subscriber.
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, event: IdentityEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Handle to an identity-change stream.
///
/// Dropping the handle also unsubscribes.
#[derive(Debug)]
pub struct IdentitySubscription {
    receiver: Option<broadcast::Receiver<IdentityEvent>>,
}

impl IdentitySubscription {
    /// A subscription that never yields, for providers without push support.
    pub fn closed() -> Self {
        Self { receiver: None }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once unsubscribed or when the provider has gone away.
    /// Events skipped because the subscriber fell behind are logged and
    /// dropped; only the newest state matters to observers.
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "identity subscriber lagged; dropping stale events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving events.
    ///
    /// Returns `true` on the call that actually detached the receiver and
    /// `false` on every later call.
    pub fn unsubscribe(&mut self) -> bool {
        self.receiver.take().is_some()
    }

    /// Whether the subscription still receives events.
    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Port for authentication and identity observation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identity of the active session, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityProviderError>;

    /// Subscribe to identity transitions.
    fn subscribe(&self) -> IdentitySubscription;

    /// Exchange credentials for a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, IdentityProviderError>;

    /// Register a new account.
    async fn sign_up(&self, credentials: &Credentials)
    -> Result<SignUpOutcome, IdentityProviderError>;

    /// End the active session.
    async fn sign_out(&self) -> Result<(), IdentityProviderError>;
}
