//! Wire rows for the PostgREST and GoTrue endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthorRelation, Comment, CommentId, Identity, IdentityMetadata, InteractionId,
    InteractionRecord, Post, PostCounters, PostId, PostRecord, UserId,
};

fn counter(value: Option<i64>) -> u64 {
    value.and_then(|count| u64::try_from(count).ok()).unwrap_or(0)
}

/// Row of the `tweets_with_counts` view with the author embedded.
#[derive(Debug, Deserialize)]
pub(super) struct FeedRowDto {
    id: PostId,
    user_id: UserId,
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    likes_count: Option<i64>,
    #[serde(default)]
    retweets_count: Option<i64>,
    #[serde(default)]
    comments_count: Option<i64>,
    #[serde(default)]
    profile: AuthorRelation,
}

impl FeedRowDto {
    pub(super) fn into_record(self) -> PostRecord {
        PostRecord {
            post: Post {
                id: self.id,
                author_id: self.user_id,
                content: self.content,
                image_url: self.image_url,
                created_at: self.created_at,
                counters: PostCounters {
                    likes: counter(self.likes_count),
                    retweets: counter(self.retweets_count),
                    comments: counter(self.comments_count),
                },
            },
            author: self.profile,
        }
    }
}

/// Row of the `tweets` table as returned by an insert.
#[derive(Debug, Deserialize)]
pub(super) struct PostRowDto {
    id: PostId,
    user_id: UserId,
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl PostRowDto {
    pub(super) fn into_post(self) -> Post {
        Post {
            id: self.id,
            author_id: self.user_id,
            content: self.content,
            image_url: self.image_url,
            created_at: self.created_at,
            counters: PostCounters::default(),
        }
    }
}

/// Row of the `likes` or `retweets` table.
#[derive(Debug, Deserialize)]
pub(super) struct InteractionRowDto {
    id: InteractionId,
    user_id: UserId,
    tweet_id: PostId,
    created_at: DateTime<Utc>,
}

impl From<InteractionRowDto> for InteractionRecord {
    fn from(row: InteractionRowDto) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            post_id: row.tweet_id,
            created_at: row.created_at,
        }
    }
}

/// Row of the `comments` table with the commenter embedded.
#[derive(Debug, Deserialize)]
pub(super) struct CommentRowDto {
    id: CommentId,
    user_id: UserId,
    tweet_id: PostId,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    profile: AuthorRelation,
}

impl From<CommentRowDto> for Comment {
    fn from(row: CommentRowDto) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            post_id: row.tweet_id,
            content: row.content,
            created_at: row.created_at,
            author: row.profile.into_profile(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FollowingIdDto {
    pub(super) following_id: UserId,
}

#[derive(Debug, Serialize)]
pub(super) struct NewPostBody<'a> {
    pub(super) user_id: &'a UserId,
    pub(super) content: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct InteractionBody<'a> {
    pub(super) user_id: &'a UserId,
    pub(super) tweet_id: PostId,
}

#[derive(Debug, Serialize)]
pub(super) struct CommentBody<'a> {
    pub(super) user_id: &'a UserId,
    pub(super) tweet_id: PostId,
    pub(super) content: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct FollowBody<'a> {
    pub(super) follower_id: &'a UserId,
    pub(super) following_id: &'a UserId,
}

/// PostgREST error payload.
#[derive(Debug, Default, Deserialize)]
pub(super) struct PostgrestErrorDto {
    #[serde(default)]
    pub(super) code: Option<String>,
    #[serde(default)]
    pub(super) message: Option<String>,
}

#[derive(Serialize)]
pub(super) struct PasswordBody<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

/// GoTrue user object.
#[derive(Debug, Deserialize)]
pub(super) struct AuthUserDto {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: IdentityMetadata,
}

impl From<AuthUserDto> for Identity {
    fn from(user: AuthUserDto) -> Self {
        Identity::new(user.id, user.email, user.user_metadata)
    }
}

/// GoTrue token or sign-up response.
///
/// Sign-up without auto-confirmation returns a bare user and no token.
#[derive(Deserialize)]
pub(super) struct AuthSessionDto {
    #[serde(default)]
    pub(super) access_token: Option<String>,
    #[serde(default)]
    pub(super) user: Option<AuthUserDto>,
}

/// GoTrue error payload; the field carrying the text varies by endpoint.
#[derive(Debug, Default, Deserialize)]
pub(super) struct AuthErrorDto {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AuthErrorDto {
    pub(super) fn text(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}
