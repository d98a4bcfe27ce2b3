//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod comment_repository;
mod data_access_error;
mod follow_repository;
mod identity_provider;
mod interaction_repository;
mod post_repository;
mod profile_repository;

#[cfg(test)]
pub use comment_repository::MockCommentRepository;
pub use comment_repository::CommentRepository;
pub use data_access_error::DataAccessError;
#[cfg(test)]
pub use follow_repository::MockFollowRepository;
pub use follow_repository::FollowRepository;
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    IdentityBroadcaster, IdentityProvider, IdentityProviderError, IdentitySubscription,
};
#[cfg(test)]
pub use interaction_repository::MockInteractionRepository;
pub use interaction_repository::InteractionRepository;
#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::PostRepository;
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::ProfileRepository;
