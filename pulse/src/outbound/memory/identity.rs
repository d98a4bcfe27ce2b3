//! Identity provider over the in-memory account table.

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{Account, InMemoryBackend};
use crate::domain::ports::{
    DataAccessError, IdentityProvider, IdentityProviderError, IdentitySubscription,
};
use crate::domain::{
    Credentials, Identity, IdentityEvent, IdentityMetadata, SignUpOutcome, UserId,
};

fn provider_error(error: DataAccessError) -> IdentityProviderError {
    match error {
        DataAccessError::Connection { message } => IdentityProviderError::connection(message),
        other => IdentityProviderError::query(other.to_string()),
    }
}

impl InMemoryBackend {
    /// Publish an identity event to subscribers, as the hosted provider
    /// would on token refresh or a sign-in from another tab.
    pub fn publish(&self, event: IdentityEvent) -> usize {
        self.events.publish(event)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityProviderError> {
        let tables = self.connect().map_err(provider_error)?;
        Ok(tables.current.clone())
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.events.subscribe()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, IdentityProviderError> {
        let identity = {
            let mut tables = self.connect().map_err(provider_error)?;
            let identity = match tables.accounts.get(credentials.email()) {
                Some(account) if account.password.as_str() == credentials.password() => {
                    account.identity.clone()
                }
                _ => return Err(IdentityProviderError::invalid_credentials()),
            };
            tables.current = Some(identity.clone());
            identity
        };
        self.events.publish(IdentityEvent::signed_in(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
    ) -> Result<SignUpOutcome, IdentityProviderError> {
        let identity = {
            let mut tables = self.connect().map_err(provider_error)?;
            if tables.accounts.contains_key(credentials.email()) {
                return Err(IdentityProviderError::rejected("user already registered"));
            }
            let identity = Identity::new(
                UserId::random(),
                Some(credentials.email().to_owned()),
                IdentityMetadata::default(),
            );
            tables.accounts.insert(
                credentials.email().to_owned(),
                Account {
                    identity: identity.clone(),
                    password: Zeroizing::new(credentials.password().to_owned()),
                },
            );
            if self.require_confirmation {
                return Ok(SignUpOutcome::ConfirmationRequired);
            }
            tables.current = Some(identity.clone());
            identity
        };
        self.events.publish(IdentityEvent::signed_in(identity.clone()));
        Ok(SignUpOutcome::SignedIn(identity))
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        self.connect().map_err(provider_error)?.current = None;
        self.events.publish(IdentityEvent::signed_out());
        Ok(())
    }
}
