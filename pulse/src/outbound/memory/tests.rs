//! Regression coverage for the in-memory backend's constraints.

use chrono::{Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    CommentRepository, FollowRepository, IdentityProvider, IdentityProviderError,
    InteractionRepository, PostRepository, ProfileRepository,
};
use crate::domain::{
    AuthorRelation, CommentContent, Credentials, IdentityEvent, NewComment, NewPost, PostContent,
    SignUpOutcome, Username,
};

fn new_profile(handle: &str) -> NewProfile {
    NewProfile {
        id: UserId::random(),
        username: Username::new(handle).expect("username"),
        full_name: handle.to_owned(),
        avatar_url: None,
    }
}

#[fixture]
fn backend() -> InMemoryBackend {
    InMemoryBackend::new()
}

#[rstest]
#[tokio::test]
async fn profile_keys_and_usernames_are_unique(backend: InMemoryBackend) {
    let ada = new_profile("ada");
    ProfileRepository::insert(&backend, &ada).await.expect("first insert");

    let same_id = ProfileRepository::insert(&backend, &ada)
        .await
        .expect_err("duplicate id");
    assert!(same_id.is_conflict());

    let same_name = ProfileRepository::insert(&backend, &new_profile("ada"))
        .await
        .expect_err("duplicate username");
    assert!(same_name.is_conflict());
    assert_eq!(backend.profile_count(&ada.id), 1);
}

#[rstest]
#[tokio::test]
async fn feed_is_newest_first_with_counters(backend: InMemoryBackend) {
    let author = backend.seed_profile(&new_profile("author")).expect("author");
    let base = Utc
        .with_ymd_and_hms(2026, 2, 1, 10, 0, 0)
        .single()
        .expect("timestamp");
    let older = backend
        .seed_post(&author.id, "older", base)
        .expect("older");
    let newer = backend
        .seed_post(&author.id, "newer", base + Duration::minutes(1))
        .expect("newer");
    InteractionRepository::insert(&backend, InteractionKind::Like, &author.id, older.id)
        .await
        .expect("like");

    let feed = backend.list_feed().await.expect("feed");
    let ids: Vec<PostId> = feed.iter().map(|record| record.post.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert_eq!(feed[1].post.counters.likes, 1);
    assert!(matches!(feed[0].author, AuthorRelation::Single(_)));
}

#[rstest]
#[tokio::test]
async fn timestamp_ties_list_latest_insert_first(backend: InMemoryBackend) {
    let author = backend.seed_profile(&new_profile("author")).expect("author");
    let at = Utc::now();
    let first = backend.seed_post(&author.id, "first", at).expect("first");
    let second = backend.seed_post(&author.id, "second", at).expect("second");

    let feed = backend.list_feed().await.expect("feed");
    assert_eq!(feed[0].post.id, second.id);
    assert_eq!(feed[1].post.id, first.id);
}

#[rstest]
#[case(InteractionKind::Like)]
#[case(InteractionKind::Retweet)]
#[tokio::test]
async fn duplicate_interactions_conflict(backend: InMemoryBackend, #[case] kind: InteractionKind) {
    let author = backend.seed_profile(&new_profile("author")).expect("author");
    let post = backend
        .seed_post(&author.id, "hello", Utc::now())
        .expect("post");

    InteractionRepository::insert(&backend, kind, &author.id, post.id)
        .await
        .expect("first");
    let error = InteractionRepository::insert(&backend, kind, &author.id, post.id)
        .await
        .expect_err("duplicate");
    assert!(error.is_conflict());
}

#[rstest]
#[tokio::test]
async fn writes_against_missing_posts_are_rejected(backend: InMemoryBackend) {
    let viewer = UserId::random();
    let error =
        InteractionRepository::insert(&backend, InteractionKind::Like, &viewer, PostId::random())
            .await
            .expect_err("missing post");
    assert!(matches!(error, DataAccessError::Rejected { .. }));

    let error = backend
        .create(&NewPost {
            author_id: viewer,
            content: PostContent::new("hi").expect("content"),
        })
        .await
        .expect_err("missing profile");
    assert!(matches!(error, DataAccessError::Rejected { .. }));
}

#[rstest]
#[tokio::test]
async fn comments_page_newest_first(backend: InMemoryBackend) {
    let author = backend.seed_profile(&new_profile("author")).expect("author");
    let post = backend
        .seed_post(&author.id, "hello", Utc::now())
        .expect("post");
    for text in ["one", "two", "three"] {
        CommentRepository::insert(
            &backend,
            &NewComment {
                user_id: author.id.clone(),
                post_id: post.id,
                content: CommentContent::new(text).expect("content"),
            },
        )
        .await
        .expect("comment");
    }

    let first = backend
        .list_for_post(post.id, None, 2)
        .await
        .expect("first page");
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|comment| comment.author.is_some()));
    let rest = backend
        .list_for_post(post.id, Some(first[1].sort_key()), 2)
        .await
        .expect("second page");
    assert_eq!(rest.len(), 1);
    let seen: std::collections::HashSet<_> =
        first.iter().chain(rest.iter()).map(|comment| comment.id).collect();
    assert_eq!(seen.len(), 3);
}

#[rstest]
#[tokio::test]
async fn suggestions_exclude_viewer_and_page_by_id(backend: InMemoryBackend) {
    let viewer = backend.seed_profile(&new_profile("viewer")).expect("viewer");
    for index in 0..4 {
        backend
            .seed_profile(&new_profile(&format!("other{index}")))
            .expect("other");
    }

    let first = backend
        .list_suggestions(&viewer.id, None, 2)
        .await
        .expect("first");
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|profile| profile.id != viewer.id));
    let rest = backend
        .list_suggestions(&viewer.id, Some(first[1].id.clone()), 10)
        .await
        .expect("rest");
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().all(|profile| profile.id > first[1].id));
}

#[rstest]
#[tokio::test]
async fn follow_edges_are_unique_per_pair(backend: InMemoryBackend) {
    let (a, b) = (UserId::random(), UserId::random());
    FollowRepository::insert(&backend, &a, &b).await.expect("edge");
    let error = FollowRepository::insert(&backend, &a, &b)
        .await
        .expect_err("duplicate");
    assert!(error.is_conflict());
    FollowRepository::insert(&backend, &b, &a)
        .await
        .expect("reverse edge is distinct");

    assert_eq!(backend.following_ids(&a).await.expect("ids"), vec![b.clone()]);
    FollowRepository::delete(&backend, &a, &b).await.expect("delete");
    assert!(backend.following_ids(&a).await.expect("ids").is_empty());
}

#[rstest]
#[tokio::test]
async fn offline_backend_reports_connection_errors(backend: InMemoryBackend) {
    backend.set_offline(true);
    let error = backend.list_feed().await.expect_err("offline");
    assert!(matches!(error, DataAccessError::Connection { .. }));
    let error = backend.current_identity().await.expect_err("offline");
    assert!(matches!(error, IdentityProviderError::Connection { .. }));

    backend.set_offline(false);
    assert!(backend.list_feed().await.expect("online").is_empty());
}

#[rstest]
#[tokio::test]
async fn sign_in_checks_password_and_publishes(backend: InMemoryBackend) {
    let identity = backend
        .register_account("ada@example.com", "secret", IdentityMetadata::default())
        .expect("account");
    let mut events = backend.subscribe();

    let wrong = Credentials::try_from_parts("ada@example.com", "nope").expect("credentials");
    let error = backend.sign_in(&wrong).await.expect_err("wrong password");
    assert_eq!(error, IdentityProviderError::invalid_credentials());

    let right = Credentials::try_from_parts("ada@example.com", "secret").expect("credentials");
    let signed_in = backend.sign_in(&right).await.expect("signed in");
    assert_eq!(signed_in, identity);
    assert_eq!(
        events.recv().await,
        Some(IdentityEvent::signed_in(identity.clone()))
    );
    assert_eq!(
        backend.current_identity().await.expect("current"),
        Some(identity)
    );

    backend.sign_out().await.expect("signed out");
    assert_eq!(events.recv().await, Some(IdentityEvent::signed_out()));
    assert_eq!(backend.current_identity().await.expect("current"), None);
}

#[tokio::test]
async fn sign_up_can_require_confirmation() {
    let backend = InMemoryBackend::new().requiring_confirmation();
    let credentials = Credentials::try_from_parts("new@example.com", "pw").expect("credentials");

    let outcome = backend.sign_up(&credentials).await.expect("signed up");
    assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
    assert_eq!(backend.current_identity().await.expect("current"), None);

    let again = backend.sign_up(&credentials).await.expect_err("duplicate");
    assert!(matches!(again, IdentityProviderError::Rejected { .. }));
}
