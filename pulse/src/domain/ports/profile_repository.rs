//! Port for profile persistence.

use async_trait::async_trait;

use crate::domain::{NewProfile, Profile, UserId};

use super::DataAccessError;

/// Storage contract for profile rows.
///
/// Adapters must enforce uniqueness of both `id` and `username` and report a
/// violation as [`DataAccessError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile owned by an identity.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataAccessError>;

    /// Insert a new profile and return the stored row.
    async fn insert(&self, profile: &NewProfile) -> Result<Profile, DataAccessError>;

    /// List profiles other than `exclude`, ordered by id ascending.
    ///
    /// `after` skips every profile whose id is not strictly greater. At most
    /// `limit` rows are returned.
    async fn list_suggestions(
        &self,
        exclude: &UserId,
        after: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<Profile>, DataAccessError>;
}
