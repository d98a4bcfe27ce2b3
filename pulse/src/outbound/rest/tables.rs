//! Data ports over PostgREST tables and views.

use async_trait::async_trait;

use super::RestBackend;
use super::dto::{
    CommentBody, CommentRowDto, FeedRowDto, FollowBody, FollowingIdDto, InteractionBody,
    InteractionRowDto, NewPostBody, PostRowDto,
};
use super::query::{self, FOLLOW_SELECT, INTERACTION_SELECT, POST_SELECT, PROFILE_COLUMNS};
use crate::domain::ports::{
    CommentRepository, DataAccessError, FollowRepository, InteractionRepository, PostRepository,
    ProfileRepository,
};
use crate::domain::{
    Comment, CommentSortKey, Follow, InteractionId, InteractionKind, InteractionRecord,
    NewComment, NewPost, NewProfile, Post, PostId, PostRecord, Profile, UserId,
};

const PROFILES: &str = "profiles";
const POSTS: &str = "tweets";
const FEED_VIEW: &str = "tweets_with_counts";
const COMMENTS: &str = "comments";
const FOLLOWS: &str = "follows";

#[async_trait]
impl ProfileRepository for RestBackend {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataAccessError> {
        let rows: Vec<Profile> = self.select(PROFILES, &query::profile_by_id(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, DataAccessError> {
        self.insert_row(PROFILES, PROFILE_COLUMNS, profile).await
    }

    async fn list_suggestions(
        &self,
        exclude: &UserId,
        after: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<Profile>, DataAccessError> {
        let params = query::suggestions(exclude, after.as_ref(), limit);
        self.select(PROFILES, &params).await
    }
}

#[async_trait]
impl PostRepository for RestBackend {
    async fn list_feed(&self) -> Result<Vec<PostRecord>, DataAccessError> {
        let rows: Vec<FeedRowDto> = self.select(FEED_VIEW, &query::feed()).await?;
        Ok(rows.into_iter().map(FeedRowDto::into_record).collect())
    }

    async fn create(&self, post: &NewPost) -> Result<Post, DataAccessError> {
        let body = NewPostBody {
            user_id: &post.author_id,
            content: post.content.as_ref(),
        };
        let row: PostRowDto = self.insert_row(POSTS, POST_SELECT, &body).await?;
        Ok(row.into_post())
    }
}

#[async_trait]
impl InteractionRepository for RestBackend {
    async fn list_for_viewer(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_ids: &[PostId],
    ) -> Result<Vec<InteractionRecord>, DataAccessError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = query::viewer_interactions(viewer, post_ids);
        let rows: Vec<InteractionRowDto> = self.select(kind.collection(), &params).await?;
        Ok(rows.into_iter().map(InteractionRecord::from).collect())
    }

    async fn insert(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_id: PostId,
    ) -> Result<InteractionRecord, DataAccessError> {
        let body = InteractionBody {
            user_id: viewer,
            tweet_id: post_id,
        };
        let row: InteractionRowDto =
            self.insert_row(kind.collection(), INTERACTION_SELECT, &body).await?;
        Ok(row.into())
    }

    async fn delete(
        &self,
        kind: InteractionKind,
        id: InteractionId,
    ) -> Result<(), DataAccessError> {
        self.delete_rows(kind.collection(), &query::interaction_by_id(id)).await
    }
}

#[async_trait]
impl CommentRepository for RestBackend {
    async fn list_for_post(
        &self,
        post_id: PostId,
        after: Option<CommentSortKey>,
        limit: usize,
    ) -> Result<Vec<Comment>, DataAccessError> {
        let params = query::comments(post_id, after.as_ref(), limit);
        let rows: Vec<CommentRowDto> = self.select(COMMENTS, &params).await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn insert(&self, comment: &NewComment) -> Result<Comment, DataAccessError> {
        let body = CommentBody {
            user_id: &comment.user_id,
            tweet_id: comment.post_id,
            content: comment.content.as_ref(),
        };
        let select = query::comment_select();
        let row: CommentRowDto = self.insert_row(COMMENTS, &select, &body).await?;
        Ok(row.into())
    }
}

#[async_trait]
impl FollowRepository for RestBackend {
    async fn following_ids(&self, follower: &UserId) -> Result<Vec<UserId>, DataAccessError> {
        let rows: Vec<FollowingIdDto> = self.select(FOLLOWS, &query::following(follower)).await?;
        Ok(rows.into_iter().map(|row| row.following_id).collect())
    }

    async fn insert(
        &self,
        follower: &UserId,
        following: &UserId,
    ) -> Result<Follow, DataAccessError> {
        let body = FollowBody {
            follower_id: follower,
            following_id: following,
        };
        self.insert_row(FOLLOWS, FOLLOW_SELECT, &body).await
    }

    async fn delete(&self, follower: &UserId, following: &UserId) -> Result<(), DataAccessError> {
        self.delete_rows(FOLLOWS, &query::follow_edge(follower, following)).await
    }
}
