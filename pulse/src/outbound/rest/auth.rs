//! Identity provider over the GoTrue password endpoints.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::dto::{AuthErrorDto, AuthSessionDto, PasswordBody};
use super::{AUTH_PATH, AuthSession, RestBackend, body_preview};
use crate::domain::ports::{IdentityProvider, IdentityProviderError, IdentitySubscription};
use crate::domain::{Credentials, Identity, IdentityEvent, SignUpOutcome};

/// Which endpoint produced a failure; sign-in treats client errors as a
/// credential mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthCall {
    SignIn,
    Other,
}

impl RestBackend {
    fn auth_url(&self, endpoint: &str) -> Result<Url, IdentityProviderError> {
        self.base
            .join(AUTH_PATH)
            .and_then(|auth| auth.join(endpoint))
            .map_err(|error| IdentityProviderError::query(format!("invalid auth url: {error}")))
    }

    async fn send_auth(
        &self,
        call: AuthCall,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, IdentityProviderError> {
        let response = self
            .authorised(request)
            .send()
            .await
            .map_err(|error| IdentityProviderError::connection(error.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| IdentityProviderError::connection(error.to_string()))?;
        if !status.is_success() {
            return Err(map_auth_error(call, status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    fn store_session(&self, access_token: String, identity: Identity) {
        *self.session() = Some(AuthSession {
            access_token: Zeroizing::new(access_token),
            identity,
        });
    }
}

fn decode_session(body: &[u8]) -> Result<AuthSessionDto, IdentityProviderError> {
    serde_json::from_slice(body).map_err(|error| {
        IdentityProviderError::query(format!("invalid auth payload: {error}"))
    })
}

fn map_auth_error(call: AuthCall, status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let text = serde_json::from_slice::<AuthErrorDto>(body)
        .ok()
        .and_then(AuthErrorDto::text)
        .unwrap_or_else(|| body_preview(body));
    let message = if text.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {text}", status.as_u16())
    };

    if status.is_server_error() {
        return IdentityProviderError::connection(message);
    }
    match (call, status) {
        (AuthCall::SignIn, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) => {
            IdentityProviderError::invalid_credentials()
        }
        _ if status.is_client_error() => IdentityProviderError::rejected(message),
        _ => IdentityProviderError::query(message),
    }
}

#[async_trait]
impl IdentityProvider for RestBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityProviderError> {
        Ok(self.session().as_ref().map(|session| session.identity.clone()))
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.events.subscribe()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, IdentityProviderError> {
        let request = self
            .client
            .post(self.auth_url("token")?)
            .query(&[("grant_type", "password")])
            .json(&PasswordBody {
                email: credentials.email(),
                password: credentials.password(),
            });
        let body = self.send_auth(AuthCall::SignIn, request).await?;
        let dto = decode_session(&body)?;
        let (Some(token), Some(user)) = (dto.access_token, dto.user) else {
            return Err(IdentityProviderError::query("token response without session"));
        };
        let identity = Identity::from(user);
        self.store_session(token, identity.clone());
        info!(user_id = %identity.id(), "signed in");
        self.events.publish(IdentityEvent::signed_in(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
    ) -> Result<SignUpOutcome, IdentityProviderError> {
        let request = self.client.post(self.auth_url("signup")?).json(&PasswordBody {
            email: credentials.email(),
            password: credentials.password(),
        });
        let body = self.send_auth(AuthCall::Other, request).await?;
        let dto = decode_session(&body)?;
        match (dto.access_token, dto.user) {
            (Some(token), Some(user)) => {
                let identity = Identity::from(user);
                self.store_session(token, identity.clone());
                info!(user_id = %identity.id(), "signed up");
                self.events.publish(IdentityEvent::signed_in(identity.clone()));
                Ok(SignUpOutcome::SignedIn(identity))
            }
            _ => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        let signed_in = self.session().is_some();
        let outcome = if signed_in {
            let request = self.client.post(self.auth_url("logout")?);
            self.send_auth(AuthCall::Other, request).await.map(|_| ())
        } else {
            Ok(())
        };
        *self.session() = None;
        self.events.publish(IdentityEvent::signed_out());

        match outcome {
            Err(IdentityProviderError::Rejected { message }) => {
                debug!(%message, "logout refused; local session cleared");
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for GoTrue error mapping.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bad_password(AuthCall::SignIn, StatusCode::BAD_REQUEST, "InvalidCredentials")]
    #[case::unauthorised(AuthCall::SignIn, StatusCode::UNAUTHORIZED, "InvalidCredentials")]
    #[case::throttled(AuthCall::SignIn, StatusCode::TOO_MANY_REQUESTS, "Rejected")]
    #[case::duplicate_signup(AuthCall::Other, StatusCode::UNPROCESSABLE_ENTITY, "Rejected")]
    #[case::outage(AuthCall::SignIn, StatusCode::SERVICE_UNAVAILABLE, "Connection")]
    fn maps_auth_statuses(
        #[case] call: AuthCall,
        #[case] status: StatusCode,
        #[case] expected: &str,
    ) {
        let body = br#"{"msg":"User already registered"}"#;
        assert_eq!(map_auth_error(call, status, body).variant_name(), expected);
    }

    #[test]
    fn rejection_keeps_server_text() {
        let body = br#"{"msg":"User already registered"}"#;
        let error = map_auth_error(AuthCall::Other, StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            error,
            IdentityProviderError::rejected("status 422: User already registered")
        );
    }

    #[test]
    fn unconfirmed_signup_has_no_session() {
        let body = br#"{"id":"3fa85f64-5717-4562-b3fc-2c963f66afa6","email":"a@b.c"}"#;
        let dto = decode_session(body).expect("payload");
        assert!(dto.access_token.is_none());
    }
}
