//! Domain primitives, ports and the services composing them.
//!
//! Purpose: model the social feed (identities, profiles, posts and the
//! viewer's interactions with them) independently of any backend. Adapters
//! plug in through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — presentation-agnostic failure payload.
//! - SessionState — current identity and provisioned profile.
//! - Timeline — feed state plus like, retweet, comment and compose actions.
//! - CommentThread, FollowGraph — per-widget state with cursor paging.

pub mod auth;
pub mod comment;
pub mod comment_thread;
pub mod error;
pub mod feed;
pub mod follow;
pub mod follow_graph;
pub mod identity;
pub mod ids;
pub mod interaction;
pub mod ports;
pub mod post;
pub mod profile;
pub mod profile_provisioning;
pub mod relative_time;
pub mod session;
pub mod timeline;

pub use self::auth::{Credentials, CredentialsValidationError, SignUpOutcome};
pub use self::comment::{
    Comment, CommentContent, CommentContentValidationError, CommentSortKey, NewComment,
};
pub use self::comment_thread::{COMMENTS_UNAVAILABLE, CommentThread};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::feed::FeedSynchronizer;
pub use self::follow::Follow;
pub use self::follow_graph::{
    DEFAULT_SUGGESTION_PAGE, FOLLOW_FAILED, FollowGraph, SUGGESTIONS_UNAVAILABLE,
    UNFOLLOW_FAILED,
};
pub use self::identity::{
    Identity, IdentityEvent, IdentityEventKind, IdentityMetadata, UserId, UserIdValidationError,
};
pub use self::ids::{CommentId, FollowId, IdentifierError, InteractionId, PostId};
pub use self::interaction::{InteractionKind, InteractionRecord};
pub use self::post::{
    AuthorRelation, FeedPost, InteractionState, NewPost, POST_CONTENT_MAX, Post, PostContent,
    PostContentValidationError, PostCounters, PostRecord, ViewerInteractions,
};
pub use self::profile::{
    BaseHandle, FALLBACK_HANDLE, NewProfile, Profile, USERNAME_SUFFIX_BOUND, Username,
    UsernameValidationError,
};
pub use self::profile_provisioning::{
    DEFAULT_USERNAME_ATTEMPTS, ProfileProvisioner, ThreadRngSuffix, UsernameSuffixSource,
};
pub use self::relative_time::format_relative;
pub use self::session::{SessionMount, SessionSnapshot, SessionState};
pub use self::timeline::{
    COMMENT_FAILED, FEED_UNAVAILABLE, FeedState, POST_FAILED, PROFILE_UNAVAILABLE, Timeline,
};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use pulse::domain::{DomainResult, Error};
///
/// fn publish() -> DomainResult<()> {
///     Err(Error::unauthorized("sign in to continue"))
/// }
/// assert!(publish().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
