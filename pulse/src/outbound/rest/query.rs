//! PostgREST query-string builders.
//!
//! Kept free of I/O so filter syntax can be unit tested.

use std::fmt::Display;

use chrono::SecondsFormat;

use crate::domain::{CommentSortKey, InteractionId, PostId, UserId};

/// Query parameters as ordered key/value pairs; keys may repeat.
pub(super) type Params = Vec<(&'static str, String)>;

pub(super) const PROFILE_COLUMNS: &str = "id,username,full_name,avatar_url,bio,created_at";

pub(super) fn feed_select() -> String {
    format!(
        "id,user_id,content,image_url,created_at,likes_count,retweets_count,comments_count,\
         profile:profiles({PROFILE_COLUMNS})"
    )
}

pub(super) fn comment_select() -> String {
    format!("id,user_id,tweet_id,content,created_at,profile:profiles({PROFILE_COLUMNS})")
}

pub(super) const INTERACTION_SELECT: &str = "id,user_id,tweet_id,created_at";
pub(super) const POST_SELECT: &str = "id,user_id,content,image_url,created_at";
pub(super) const FOLLOW_SELECT: &str = "id,follower_id,following_id,created_at";

fn eq(value: impl Display) -> String {
    format!("eq.{value}")
}

fn in_list<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let joined = values
        .into_iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

fn quoted_timestamp(key: &CommentSortKey) -> String {
    format!(
        "\"{}\"",
        key.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

pub(super) fn profile_by_id(id: &UserId) -> Params {
    vec![("select", PROFILE_COLUMNS.to_owned()), ("id", eq(id))]
}

pub(super) fn feed() -> Params {
    vec![
        ("select", feed_select()),
        ("order", "created_at.desc".to_owned()),
    ]
}

pub(super) fn viewer_interactions(viewer: &UserId, post_ids: &[PostId]) -> Params {
    vec![
        ("select", INTERACTION_SELECT.to_owned()),
        ("user_id", eq(viewer)),
        ("tweet_id", in_list(post_ids)),
    ]
}

pub(super) fn interaction_by_id(id: InteractionId) -> Params {
    vec![("id", eq(id))]
}

pub(super) fn suggestions(exclude: &UserId, after: Option<&UserId>, limit: usize) -> Params {
    let mut params = vec![
        ("select", PROFILE_COLUMNS.to_owned()),
        ("id", format!("neq.{exclude}")),
    ];
    if let Some(after) = after {
        params.push(("id", format!("gt.{after}")));
    }
    params.push(("order", "id.asc".to_owned()));
    params.push(("limit", limit.to_string()));
    params
}

/// Newest-first page of a post's comments, resuming strictly after `after`.
pub(super) fn comments(post_id: PostId, after: Option<&CommentSortKey>, limit: usize) -> Params {
    let mut params = vec![("select", comment_select()), ("tweet_id", eq(post_id))];
    if let Some(key) = after {
        let at = quoted_timestamp(key);
        params.push((
            "or",
            format!("(created_at.lt.{at},and(created_at.eq.{at},id.lt.{}))", key.id),
        ));
    }
    params.push(("order", "created_at.desc,id.desc".to_owned()));
    params.push(("limit", limit.to_string()));
    params
}

pub(super) fn following(follower: &UserId) -> Params {
    vec![
        ("select", "following_id".to_owned()),
        ("follower_id", eq(follower)),
    ]
}

pub(super) fn follow_edge(follower: &UserId, following: &UserId) -> Params {
    vec![
        ("follower_id", eq(follower)),
        ("following_id", eq(following)),
    ]
}

#[cfg(test)]
mod tests {
    //! Regression coverage for filter syntax.
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    use crate::domain::CommentId;

    fn value<'a>(params: &'a Params, key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    #[test]
    fn viewer_interactions_filter_by_user_and_post_list() {
        let viewer = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("id");
        let a = PostId::new("00000000-0000-0000-0000-00000000000a").expect("id");
        let b = PostId::new("00000000-0000-0000-0000-00000000000b").expect("id");
        let params = viewer_interactions(&viewer, &[a, b]);

        assert_eq!(
            value(&params, "user_id"),
            ["eq.3fa85f64-5717-4562-b3fc-2c963f66afa6"]
        );
        assert_eq!(
            value(&params, "tweet_id"),
            ["in.(00000000-0000-0000-0000-00000000000a,00000000-0000-0000-0000-00000000000b)"]
        );
    }

    #[test]
    fn suggestions_exclude_viewer_and_resume_after_cursor() {
        let viewer = UserId::random();
        let after = UserId::random();
        let params = suggestions(&viewer, Some(&after), 6);

        assert_eq!(
            value(&params, "id"),
            [format!("neq.{viewer}"), format!("gt.{after}")]
        );
        assert_eq!(value(&params, "order"), ["id.asc"]);
        assert_eq!(value(&params, "limit"), ["6"]);
    }

    #[test]
    fn comment_keyset_uses_timestamp_then_id() {
        let key = CommentSortKey {
            created_at: Utc
                .with_ymd_and_hms(2026, 5, 1, 12, 30, 0)
                .single()
                .expect("timestamp"),
            id: CommentId::new("00000000-0000-0000-0000-000000000007").expect("id"),
        };
        let params = comments(PostId::random(), Some(&key), 21);

        assert_eq!(
            value(&params, "or"),
            [concat!(
                "(created_at.lt.\"2026-05-01T12:30:00.000000Z\",",
                "and(created_at.eq.\"2026-05-01T12:30:00.000000Z\",",
                "id.lt.00000000-0000-0000-0000-000000000007))"
            )]
        );
        assert_eq!(value(&params, "order"), ["created_at.desc,id.desc"]);
    }

    #[test]
    fn first_comment_page_has_no_keyset() {
        let params = comments(PostId::random(), None, 21);
        assert!(value(&params, "or").is_empty());
        assert!(value(&params, "select")[0].contains("profile:profiles("));
    }
}
