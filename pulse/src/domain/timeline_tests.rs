//! Tests for feed state transitions driven by viewer actions.

use std::sync::Arc;

use chrono::Utc;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    DataAccessError, MockCommentRepository, MockIdentityProvider, MockInteractionRepository,
    MockPostRepository, MockProfileRepository,
};
use crate::domain::{
    AuthorRelation, ErrorCode, Identity, IdentityMetadata, InteractionId, InteractionRecord,
    PostCounters, PostRecord, Profile, ProfileProvisioner, Username, ViewerInteractions,
};

struct Ports {
    posts: MockPostRepository,
    interactions: MockInteractionRepository,
    comments: MockCommentRepository,
    profiles: MockProfileRepository,
}

#[fixture]
fn ports() -> Ports {
    Ports {
        posts: MockPostRepository::new(),
        interactions: MockInteractionRepository::new(),
        comments: MockCommentRepository::new(),
        profiles: MockProfileRepository::new(),
    }
}

fn viewer_profile(id: &UserId) -> Profile {
    Profile {
        id: id.clone(),
        username: Username::new("viewer1").expect("username"),
        full_name: "viewer".to_owned(),
        avatar_url: None,
        bio: None,
        created_at: Utc::now(),
    }
}

fn sample_post() -> Post {
    Post {
        id: PostId::random(),
        author_id: UserId::random(),
        content: "hello".to_owned(),
        image_url: None,
        created_at: Utc::now(),
        counters: PostCounters::default(),
    }
}

fn feed_post(like: InteractionState) -> FeedPost {
    FeedPost {
        post: sample_post(),
        author: None,
        viewer: Some(ViewerInteractions {
            like,
            retweet: InteractionState::Absent,
        }),
    }
}

/// Expect one successful reload returning `records` with no interactions.
fn expect_reload(ports: &mut Ports, records: Vec<PostRecord>) {
    let hydrate = !records.is_empty();
    ports
        .posts
        .expect_list_feed()
        .times(1)
        .return_once(move || Ok(records));
    if hydrate {
        ports
            .interactions
            .expect_list_for_viewer()
            .times(2)
            .returning(|_, _, _| Ok(Vec::new()));
    }
}

/// Build a timeline; a viewer is signed in when `viewer` is set.
async fn timeline(mut ports: Ports, viewer: Option<UserId>) -> Timeline {
    if let Some(id) = &viewer {
        let profile = viewer_profile(id);
        ports
            .profiles
            .expect_find_by_id()
            .returning(move |_| Ok(Some(profile.clone())));
    }
    let session = Arc::new(SessionState::new(
        Arc::new(MockIdentityProvider::new()),
        ProfileProvisioner::new(Arc::new(ports.profiles)),
    ));
    if let Some(id) = viewer {
        session
            .observe(Some(Identity::new(id, None, IdentityMetadata::default())))
            .await;
    }
    Timeline::new(
        session,
        Arc::new(ports.posts),
        Arc::new(ports.interactions),
        Arc::new(ports.comments),
    )
}

#[rstest]
#[case(InteractionKind::Like)]
#[case(InteractionKind::Retweet)]
#[tokio::test]
async fn toggle_without_viewer_is_unauthorised(mut ports: Ports, #[case] kind: InteractionKind) {
    ports.interactions.expect_insert().never();
    ports.interactions.expect_delete().never();
    ports.posts.expect_list_feed().never();
    let timeline = timeline(ports, None).await;

    let error = timeline
        .toggle(kind, &feed_post(InteractionState::Absent))
        .await
        .expect_err("signed out");
    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn absent_like_inserts_then_reloads(mut ports: Ports) {
    let viewer = UserId::random();
    let post = feed_post(InteractionState::Absent);
    let post_id = post.id();
    let owner = viewer.clone();
    ports
        .interactions
        .expect_insert()
        .withf(move |kind, user, id| {
            *kind == InteractionKind::Like && *user == owner && *id == post_id
        })
        .times(1)
        .returning(|_, user, post_id| {
            Ok(InteractionRecord {
                id: InteractionId::random(),
                user_id: user.clone(),
                post_id,
                created_at: Utc::now(),
            })
        });
    expect_reload(
        &mut ports,
        vec![PostRecord {
            post: post.post.clone(),
            author: AuthorRelation::Absent,
        }],
    );
    let timeline = timeline(ports, Some(viewer)).await;

    timeline.toggle_like(&post).await.expect("liked");
    assert_eq!(timeline.state().posts.len(), 1);
    assert!(!timeline.state().loading);
}

#[rstest]
#[tokio::test]
async fn present_retweet_deletes_by_row_id(mut ports: Ports) {
    let row = InteractionId::random();
    let post = FeedPost {
        post: sample_post(),
        author: None,
        viewer: Some(ViewerInteractions {
            like: InteractionState::Absent,
            retweet: InteractionState::Present(row),
        }),
    };
    ports
        .interactions
        .expect_delete()
        .withf(move |kind, id| *kind == InteractionKind::Retweet && *id == row)
        .times(1)
        .returning(|_, _| Ok(()));
    ports.interactions.expect_insert().never();
    expect_reload(&mut ports, Vec::new());
    let timeline = timeline(ports, Some(UserId::random())).await;

    timeline.toggle_retweet(&post).await.expect("undone");
}

#[rstest]
#[tokio::test]
async fn duplicate_insert_counts_as_present(mut ports: Ports) {
    ports
        .interactions
        .expect_insert()
        .times(1)
        .returning(|_, _, _| Err(DataAccessError::conflict("23505")));
    expect_reload(&mut ports, Vec::new());
    let timeline = timeline(ports, Some(UserId::random())).await;

    timeline
        .toggle_like(&feed_post(InteractionState::Absent))
        .await
        .expect("conflict is benign");
}

#[rstest]
#[case(InteractionKind::Like, "Could not like the post.")]
#[case(InteractionKind::Retweet, "Could not retweet the post.")]
#[tokio::test]
async fn failed_insert_reports_action_and_skips_reload(
    mut ports: Ports,
    #[case] kind: InteractionKind,
    #[case] message: &str,
) {
    ports
        .interactions
        .expect_insert()
        .times(1)
        .returning(|_, _, _| Err(DataAccessError::rejected("row level security")));
    ports.posts.expect_list_feed().never();
    let timeline = timeline(ports, Some(UserId::random())).await;

    let error = timeline
        .toggle(kind, &feed_post(InteractionState::Absent))
        .await
        .expect_err("rejected");
    assert_eq!(error.message(), message);
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn failed_delete_reports_removal(mut ports: Ports) {
    ports
        .interactions
        .expect_delete()
        .times(1)
        .returning(|_, _| Err(DataAccessError::connection("offline")));
    ports.posts.expect_list_feed().never();
    let timeline = timeline(ports, Some(UserId::random())).await;

    let error = timeline
        .toggle_like(&feed_post(InteractionState::Present(InteractionId::random())))
        .await
        .expect_err("offline");
    assert_eq!(error.message(), "Could not remove the like.");
}

#[rstest]
#[tokio::test]
async fn failed_reload_clears_feed(mut ports: Ports) {
    let mut seq = mockall::Sequence::new();
    let record = PostRecord {
        post: sample_post(),
        author: AuthorRelation::Absent,
    };
    ports
        .posts
        .expect_list_feed()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move || Ok(vec![record]));
    ports
        .posts
        .expect_list_feed()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|| Err(DataAccessError::connection("offline")));
    let timeline = timeline(ports, None).await;

    timeline.reload().await.expect("first load");
    assert_eq!(timeline.state().posts.len(), 1);

    timeline.reload().await.expect_err("second load fails");
    let state = timeline.state();
    assert!(state.posts.is_empty());
    assert_eq!(state.error.as_deref(), Some(FEED_UNAVAILABLE));
    assert!(!state.loading);
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_posts_are_rejected(mut ports: Ports, #[case] raw: &str) {
    ports.posts.expect_create().never();
    let timeline = timeline(ports, Some(UserId::random())).await;

    let error = timeline.compose(raw).await.expect_err("blank");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn compose_publishes_trimmed_content(mut ports: Ports) {
    let viewer = UserId::random();
    let author = viewer.clone();
    ports
        .posts
        .expect_create()
        .withf(move |new| new.author_id == author && new.content.as_ref() == "hi")
        .times(1)
        .returning(|new| {
            let mut post = sample_post();
            post.author_id = new.author_id.clone();
            post.content = new.content.as_ref().to_owned();
            Ok(post)
        });
    expect_reload(&mut ports, Vec::new());
    let timeline = timeline(ports, Some(viewer.clone())).await;

    let post = timeline.compose("  hi  ").await.expect("published");
    assert_eq!(post.author_id, viewer);
}

#[rstest]
#[tokio::test]
async fn compose_reports_profile_failure(mut ports: Ports) {
    ports
        .profiles
        .expect_find_by_id()
        .returning(|_| Err(DataAccessError::connection("offline")));
    ports.posts.expect_create().never();
    let session = Arc::new(SessionState::new(
        Arc::new(MockIdentityProvider::new()),
        ProfileProvisioner::new(Arc::new(ports.profiles)),
    ));
    session
        .observe(Some(Identity::new(
            UserId::random(),
            None,
            IdentityMetadata::default(),
        )))
        .await;
    let timeline = Timeline::new(
        session,
        Arc::new(ports.posts),
        Arc::new(ports.interactions),
        Arc::new(ports.comments),
    );

    let error = timeline.compose("hello").await.expect_err("no profile");
    assert_eq!(error.message(), PROFILE_UNAVAILABLE);
}

#[rstest]
#[tokio::test]
async fn blank_comment_is_rejected(mut ports: Ports) {
    ports.comments.expect_insert().never();
    let timeline = timeline(ports, Some(UserId::random())).await;

    let error = timeline
        .comment(PostId::random(), " \n ")
        .await
        .expect_err("blank");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn comment_failure_has_action_message(mut ports: Ports) {
    ports
        .comments
        .expect_insert()
        .times(1)
        .returning(|_| Err(DataAccessError::rejected("rls")));
    ports.posts.expect_list_feed().never();
    let timeline = timeline(ports, Some(UserId::random())).await;

    let error = timeline
        .comment(PostId::random(), "nice")
        .await
        .expect_err("rejected");
    assert_eq!(error.message(), COMMENT_FAILED);
}
