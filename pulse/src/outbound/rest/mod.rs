//! Reqwest-backed adapter for a hosted PostgREST + GoTrue backend.
//!
//! This adapter owns transport details only: URL and header construction,
//! HTTP error mapping, and JSON decoding into domain rows. Data ports live in
//! `tables`, the identity provider in `auth`.

mod auth;
mod dto;
mod query;
mod tables;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use self::dto::PostgrestErrorDto;
use self::query::Params;
use crate::domain::Identity;
use crate::domain::ports::{DataAccessError, IdentityBroadcaster};

const REST_PATH: &str = "rest/v1/";
const AUTH_PATH: &str = "auth/v1/";
const UNIQUE_VIOLATION: &str = "23505";

/// Access token and identity of the signed-in user.
struct AuthSession {
    access_token: Zeroizing<String>,
    identity: Identity,
}

/// Backend adapter speaking to one project URL.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base: Url,
    anon_key: Zeroizing<String>,
    session: Arc<Mutex<Option<AuthSession>>>,
    events: IdentityBroadcaster,
}

impl RestBackend {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
            anon_key: Zeroizing::new(anon_key.into()),
            session: Arc::new(Mutex::new(None)),
            events: IdentityBroadcaster::default(),
        })
    }

    fn rest_url(&self, table: &str) -> Result<Url, DataAccessError> {
        self.base
            .join(REST_PATH)
            .and_then(|rest| rest.join(table))
            .map_err(|error| DataAccessError::query(format!("invalid table url: {error}")))
    }

    fn session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bearer(&self) -> String {
        let token = self
            .session()
            .as_ref()
            .map(|session| session.access_token.as_str().to_owned())
            .unwrap_or_else(|| self.anon_key.as_str().to_owned());
        format!("Bearer {token}")
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.anon_key.as_str())
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, DataAccessError> {
        let response = self
            .authorised(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> Result<Vec<T>, DataAccessError> {
        let request = self.client.get(self.rest_url(table)?).query(params);
        decode(&self.send(request).await?)
    }

    async fn insert_row<B, T>(
        &self,
        table: &str,
        select: &str,
        body: &B,
    ) -> Result<T, DataAccessError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.rest_url(table)?)
            .query(&[("select", select)])
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = decode(&self.send(request).await?)?;
        rows.into_iter().next().ok_or_else(|| {
            DataAccessError::query(format!("insert into {table} returned no row"))
        })
    }

    async fn delete_rows(&self, table: &str, params: &Params) -> Result<(), DataAccessError> {
        let request = self.client.delete(self.rest_url(table)?).query(params);
        self.send(request).await.map(|_| ())
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DataAccessError> {
    serde_json::from_slice(body)
        .map_err(|error| DataAccessError::query(format!("invalid response payload: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> DataAccessError {
    DataAccessError::connection(error.to_string())
}

/// Map a non-success PostgREST response.
///
/// Unique violations are conflicts. PostgREST also answers 409 for foreign
/// key violations, which are rejections rather than duplicates.
fn map_status_error(status: StatusCode, body: &[u8]) -> DataAccessError {
    let parsed: PostgrestErrorDto = serde_json::from_slice(body).unwrap_or_default();
    let preview = body_preview(body);
    let message = match parsed.message.as_deref() {
        Some(text) if !text.is_empty() => format!("status {}: {text}", status.as_u16()),
        _ if preview.is_empty() => format!("status {}", status.as_u16()),
        _ => format!("status {}: {preview}", status.as_u16()),
    };

    match (status, parsed.code.as_deref()) {
        (_, Some(UNIQUE_VIOLATION)) => DataAccessError::conflict(message),
        (StatusCode::CONFLICT, None) => DataAccessError::conflict(message),
        _ if status.is_client_error() => DataAccessError::rejected(message),
        _ => DataAccessError::connection(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network mapping helpers.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unique_violation(StatusCode::CONFLICT, r#"{"code":"23505","message":"dup"}"#, "Conflict")]
    #[case::unique_without_409(StatusCode::BAD_REQUEST, r#"{"code":"23505"}"#, "Conflict")]
    #[case::bare_conflict(StatusCode::CONFLICT, "", "Conflict")]
    #[case::foreign_key(StatusCode::CONFLICT, r#"{"code":"23503","message":"fk"}"#, "Rejected")]
    #[case::row_level_security(StatusCode::FORBIDDEN, r#"{"code":"42501"}"#, "Rejected")]
    #[case::server_error(StatusCode::BAD_GATEWAY, "upstream", "Connection")]
    fn maps_statuses_to_port_errors(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let error = map_status_error(status, body.as_bytes());
        assert_eq!(error.variant_name(), expected);
    }

    #[test]
    fn preview_compacts_and_truncates() {
        let body = format!("  a \n b {}", "x".repeat(200));
        let preview = body_preview(body.as_bytes());
        assert!(preview.starts_with("a b x"));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }

    #[rstest]
    #[case("https://project.example.co", "https://project.example.co/rest/v1/tweets")]
    #[case("https://gw.example.com/pulse", "https://gw.example.com/pulse/rest/v1/tweets")]
    #[case("https://gw.example.com/pulse/", "https://gw.example.com/pulse/rest/v1/tweets")]
    fn table_urls_are_relative_to_the_project(#[case] base: &str, #[case] expected: &str) {
        let backend = RestBackend::new(
            Url::parse(base).expect("url"),
            "anon",
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(backend.rest_url("tweets").expect("url").as_str(), expected);
    }

    #[test]
    fn anonymous_requests_use_the_anon_key() {
        let backend = RestBackend::new(
            Url::parse("https://project.example.co").expect("url"),
            "anon-key",
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(backend.bearer(), "Bearer anon-key");
    }
}
