//! Tests for feed loading and hydration.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{MockInteractionRepository, MockPostRepository};
use crate::domain::{AuthorRelation, ErrorCode, Post, PostCounters, Profile, Username};

fn profile(username: &str) -> Profile {
    Profile {
        id: UserId::random(),
        username: Username::new(username).expect("username"),
        full_name: username.to_owned(),
        avatar_url: None,
        bio: None,
        created_at: Utc::now(),
    }
}

fn record(minutes_ago: i64, author: AuthorRelation) -> PostRecord {
    let now = Utc
        .with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
        .single()
        .expect("timestamp");
    PostRecord {
        post: Post {
            id: PostId::random(),
            author_id: UserId::random(),
            content: format!("posted {minutes_ago} minutes ago"),
            image_url: None,
            created_at: now - Duration::minutes(minutes_ago),
            counters: PostCounters {
                likes: 1,
                retweets: 0,
                comments: 2,
            },
        },
        author,
    }
}

fn interaction(viewer: &UserId, post_id: PostId) -> InteractionRecord {
    InteractionRecord {
        id: InteractionId::random(),
        user_id: viewer.clone(),
        post_id,
        created_at: Utc::now(),
    }
}

fn feed_of(records: Vec<PostRecord>) -> MockPostRepository {
    let mut posts = MockPostRepository::new();
    posts
        .expect_list_feed()
        .times(1)
        .return_once(move || Ok(records));
    posts
}

#[fixture]
fn viewer() -> UserId {
    UserId::random()
}

#[tokio::test]
async fn anonymous_feed_has_no_interaction_flags() {
    let author = profile("ada");
    let records = vec![
        record(1, AuthorRelation::Single(author.clone())),
        record(5, AuthorRelation::Collection(vec![author.clone()])),
        record(9, AuthorRelation::Absent),
    ];
    let mut interactions = MockInteractionRepository::new();
    interactions.expect_list_for_viewer().never();

    let sync = FeedSynchronizer::new(Arc::new(feed_of(records)), Arc::new(interactions));
    let feed = sync.load(None).await.expect("feed");

    assert_eq!(feed.len(), 3);
    assert!(feed.iter().all(|post| post.viewer.is_none()));
    assert_eq!(feed[0].author.as_ref(), Some(&author));
    assert_eq!(feed[1].author.as_ref(), Some(&author));
    assert_eq!(feed[2].author, None);
}

#[rstest]
#[tokio::test]
async fn empty_feed_skips_hydration(viewer: UserId) {
    let mut interactions = MockInteractionRepository::new();
    interactions.expect_list_for_viewer().never();

    let sync = FeedSynchronizer::new(Arc::new(feed_of(Vec::new())), Arc::new(interactions));
    let feed = sync.load(Some(&viewer)).await.expect("feed");
    assert!(feed.is_empty());
}

#[rstest]
#[tokio::test]
async fn hydration_marks_only_matching_posts(viewer: UserId) {
    let newer = record(1, AuthorRelation::Absent);
    let older = record(10, AuthorRelation::Absent);
    let newer_id = newer.post.id;
    let older_id = older.post.id;
    let like = interaction(&viewer, older_id);
    let retweet = interaction(&viewer, newer_id);
    let (like_id, retweet_id) = (like.id, retweet.id);

    let mut interactions = MockInteractionRepository::new();
    interactions
        .expect_list_for_viewer()
        .withf(move |kind, _, ids| {
            *kind == InteractionKind::Like && ids.to_vec() == vec![newer_id, older_id]
        })
        .times(1)
        .return_once(move |_, _, _| Ok(vec![like]));
    interactions
        .expect_list_for_viewer()
        .withf(|kind, _, _| *kind == InteractionKind::Retweet)
        .times(1)
        .return_once(move |_, _, _| Ok(vec![retweet]));

    let sync = FeedSynchronizer::new(Arc::new(feed_of(vec![newer, older])), Arc::new(interactions));
    let feed = sync.load(Some(&viewer)).await.expect("feed");

    assert_eq!(feed[0].id(), newer_id);
    assert_eq!(feed[0].liked_by_me(), Some(false));
    assert_eq!(feed[0].like_id(), None);
    assert_eq!(feed[0].retweeted_by_me(), Some(true));
    assert_eq!(feed[0].retweet_id(), Some(retweet_id));
    assert_eq!(feed[1].id(), older_id);
    assert_eq!(feed[1].liked_by_me(), Some(true));
    assert_eq!(feed[1].like_id(), Some(like_id));
    assert_eq!(feed[1].retweeted_by_me(), Some(false));
}

#[tokio::test]
async fn post_fetch_failure_surfaces() {
    let mut posts = MockPostRepository::new();
    posts
        .expect_list_feed()
        .return_once(|| Err(DataAccessError::connection("offline")));

    let sync = FeedSynchronizer::new(Arc::new(posts), Arc::new(MockInteractionRepository::new()));
    let error = sync.load(None).await.expect_err("failure");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[case(InteractionKind::Like)]
#[case(InteractionKind::Retweet)]
#[tokio::test]
async fn hydration_failure_discards_feed(viewer: UserId, #[case] failing: InteractionKind) {
    let mut interactions = MockInteractionRepository::new();
    interactions
        .expect_list_for_viewer()
        .returning(move |kind, _, _| {
            if kind == failing {
                Err(DataAccessError::query("bad row"))
            } else {
                Ok(Vec::new())
            }
        });

    let sync = FeedSynchronizer::new(
        Arc::new(feed_of(vec![record(3, AuthorRelation::Absent)])),
        Arc::new(interactions),
    );
    let error = sync.load(Some(&viewer)).await.expect_err("failure");
    assert_eq!(error.code(), ErrorCode::InternalError);
}
