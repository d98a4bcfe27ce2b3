//! Compact "time ago" labels for cards and comments.

use chrono::{DateTime, Utc};

/// Format the age of `at` relative to `now`.
///
/// Under an hour the label is in minutes, under a day in hours, otherwise in
/// whole days. Timestamps in the future read as `0 min`.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use pulse::domain::format_relative;
///
/// let now = Utc::now();
/// assert_eq!(format_relative(now - Duration::minutes(5), now), "5 min");
/// assert_eq!(format_relative(now - Duration::hours(3), now), "3 h");
/// ```
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - at).num_minutes().max(0);
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} h");
    }
    format!("{} d", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case(Duration::seconds(30), "0 min")]
    #[case(Duration::minutes(59), "59 min")]
    #[case(Duration::minutes(60), "1 h")]
    #[case(Duration::hours(23) + Duration::minutes(59), "23 h")]
    #[case(Duration::hours(24), "1 d")]
    #[case(Duration::days(9), "9 d")]
    #[case(Duration::minutes(-10), "0 min")]
    fn labels_by_magnitude(#[case] age: Duration, #[case] expected: &str) {
        let now = Utc
            .with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(format_relative(now - age, now), expected);
    }
}
