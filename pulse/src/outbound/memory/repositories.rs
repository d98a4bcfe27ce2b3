//! Data port implementations over the in-memory tables.

use std::cmp::Reverse;

use async_trait::async_trait;

use super::InMemoryBackend;
use crate::domain::ports::{
    CommentRepository, DataAccessError, FollowRepository, InteractionRepository, PostRepository,
    ProfileRepository,
};
use crate::domain::{
    AuthorRelation, Comment, CommentId, CommentSortKey, Follow, FollowId, InteractionId,
    InteractionKind, InteractionRecord, NewComment, NewPost, NewProfile, Post, PostCounters,
    PostId, PostRecord, Profile, UserId,
};

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataAccessError> {
        Ok(self.connect()?.profiles.get(id).cloned())
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, DataAccessError> {
        let now = self.now();
        self.connect()?.insert_profile(profile, now)
    }

    async fn list_suggestions(
        &self,
        exclude: &UserId,
        after: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<Profile>, DataAccessError> {
        let tables = self.connect()?;
        Ok(tables
            .profiles
            .values()
            .filter(|profile| &profile.id != exclude)
            .filter(|profile| after.as_ref().is_none_or(|key| profile.id > *key))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostRepository for InMemoryBackend {
    async fn list_feed(&self) -> Result<Vec<PostRecord>, DataAccessError> {
        let tables = self.connect()?;
        let mut rows: Vec<_> = tables.posts.iter().collect();
        rows.sort_by_key(|row| Reverse((row.post.created_at, row.seq)));
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut post = row.post.clone();
                post.counters = tables.counters(post.id);
                let author = tables
                    .profiles
                    .get(&post.author_id)
                    .cloned()
                    .map_or(AuthorRelation::Absent, AuthorRelation::Single);
                PostRecord { post, author }
            })
            .collect())
    }

    async fn create(&self, post: &NewPost) -> Result<Post, DataAccessError> {
        let now = self.now();
        let mut tables = self.connect()?;
        if !tables.profiles.contains_key(&post.author_id) {
            return Err(DataAccessError::rejected(
                "insert on \"tweets\" violates foreign key constraint \"tweets_user_id_fkey\"",
            ));
        }
        Ok(tables.insert_post(Post {
            id: PostId::random(),
            author_id: post.author_id.clone(),
            content: post.content.as_ref().to_owned(),
            image_url: None,
            created_at: now,
            counters: PostCounters::default(),
        }))
    }
}

#[async_trait]
impl InteractionRepository for InMemoryBackend {
    async fn list_for_viewer(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_ids: &[PostId],
    ) -> Result<Vec<InteractionRecord>, DataAccessError> {
        let tables = self.connect()?;
        Ok(tables
            .interactions(kind)
            .iter()
            .filter(|row| &row.user_id == viewer && post_ids.contains(&row.post_id))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        kind: InteractionKind,
        viewer: &UserId,
        post_id: PostId,
    ) -> Result<InteractionRecord, DataAccessError> {
        let now = self.now();
        let mut tables = self.connect()?;
        if !tables.posts.iter().any(|row| row.post.id == post_id) {
            return Err(DataAccessError::rejected(format!(
                "insert on \"{}\" violates foreign key constraint on tweet_id",
                kind.collection()
            )));
        }
        let rows = tables.interactions_mut(kind);
        if rows
            .iter()
            .any(|row| &row.user_id == viewer && row.post_id == post_id)
        {
            return Err(DataAccessError::conflict(format!(
                "duplicate key value violates unique constraint \"{}_user_id_tweet_id_key\"",
                kind.collection()
            )));
        }
        let record = InteractionRecord {
            id: InteractionId::random(),
            user_id: viewer.clone(),
            post_id,
            created_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, kind: InteractionKind, id: InteractionId) -> Result<(), DataAccessError> {
        self.connect()?
            .interactions_mut(kind)
            .retain(|row| row.id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryBackend {
    async fn list_for_post(
        &self,
        post_id: PostId,
        after: Option<CommentSortKey>,
        limit: usize,
    ) -> Result<Vec<Comment>, DataAccessError> {
        let tables = self.connect()?;
        let mut rows: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter(|comment| after.is_none_or(|key| key.precedes(comment)))
            .collect();
        rows.sort_by_key(|comment| Reverse((comment.created_at, comment.id)));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|comment| Comment {
                author: tables.profiles.get(&comment.user_id).cloned(),
                ..comment.clone()
            })
            .collect())
    }

    async fn insert(&self, comment: &NewComment) -> Result<Comment, DataAccessError> {
        let now = self.now();
        let mut tables = self.connect()?;
        if !tables.posts.iter().any(|row| row.post.id == comment.post_id) {
            return Err(DataAccessError::rejected(
                "insert on \"comments\" violates foreign key constraint on tweet_id",
            ));
        }
        let stored = Comment {
            id: CommentId::random(),
            user_id: comment.user_id.clone(),
            post_id: comment.post_id,
            content: comment.content.as_ref().to_owned(),
            created_at: now,
            author: None,
        };
        tables.comments.push(stored.clone());
        Ok(Comment {
            author: tables.profiles.get(&stored.user_id).cloned(),
            ..stored
        })
    }
}

#[async_trait]
impl FollowRepository for InMemoryBackend {
    async fn following_ids(&self, follower: &UserId) -> Result<Vec<UserId>, DataAccessError> {
        let tables = self.connect()?;
        Ok(tables
            .follows
            .iter()
            .filter(|edge| &edge.follower_id == follower)
            .map(|edge| edge.following_id.clone())
            .collect())
    }

    async fn insert(
        &self,
        follower: &UserId,
        following: &UserId,
    ) -> Result<Follow, DataAccessError> {
        let now = self.now();
        let mut tables = self.connect()?;
        if tables
            .follows
            .iter()
            .any(|edge| &edge.follower_id == follower && &edge.following_id == following)
        {
            return Err(DataAccessError::conflict(
                "duplicate key value violates unique constraint \"follows_pkey\"",
            ));
        }
        let edge = Follow {
            id: FollowId::random(),
            follower_id: follower.clone(),
            following_id: following.clone(),
            created_at: now,
        };
        tables.follows.push(edge.clone());
        Ok(edge)
    }

    async fn delete(&self, follower: &UserId, following: &UserId) -> Result<(), DataAccessError> {
        self.connect()?
            .follows
            .retain(|edge| !(&edge.follower_id == follower && &edge.following_id == following));
        Ok(())
    }
}
