use chrono::{DateTime, Utc};
use pulse_core::{Comment, Report};

use crate::report_marker::parse_report;

/// Reports from comments created at or after `since`, newest first.
///
/// Equal timestamps keep their input order.
pub fn select_reports(comments: &[Comment], since: DateTime<Utc>) -> Vec<Report> {
    let mut reports = comments
        .iter()
        .filter(|comment| comment.created_at >= since)
        .filter_map(|comment| parse_report(&comment.body, comment.created_at, &comment.url))
        .collect::<Vec<_>>();
    reports.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    reports
}

/// Trimmed body of the last comment in the slice, ignoring any time window.
///
/// The slice is expected to be in chronological order. Returns `None` when it
/// is empty or the last body is blank.
pub fn most_recent_non_empty_body(comments: &[Comment]) -> Option<String> {
    let body = comments.last()?.body.trim();
    (!body.is_empty()).then(|| body.to_string())
}
