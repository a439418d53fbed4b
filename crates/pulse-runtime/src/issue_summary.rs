use pulse_core::{Comment, IssueRef, Report, SentimentAssessment};
use pulse_github::most_recent_non_empty_body;
use serde::Serialize;

/// Longest slice of a raw comment body used as fallback summary text.
pub const FALLBACK_COMMENT_MAX_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Generated by the summarization backend.
    Ai,
    /// Update texts joined without a backend.
    Joined,
    /// Latest update or recent comment, used when no generated summary exists.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSummary {
    pub issue: IssueRef,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentAssessment>,
    pub source: SummarySource,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFailure {
    pub issue: IssueRef,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Outcome of one run: summaries sorted by issue URL plus the issues that could not be fetched.
pub struct PulseReport {
    pub summaries: Vec<IssueSummary>,
    pub failures: Vec<IssueFailure>,
}

/// First non-blank value of a report field, searching newest first.
pub fn latest_field<F>(reports: &[Report], field: F) -> Option<String>
where
    F: Fn(&Report) -> Option<&String>,
{
    reports
        .iter()
        .filter_map(&field)
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Non-AI text for an issue: the latest report update, else the most recent
/// comment body cut to [`FALLBACK_COMMENT_MAX_CHARS`].
pub fn fallback_summary_text(reports: &[Report], comments: &[Comment]) -> String {
    if let Some(update) = latest_field(reports, |report| report.update_text.as_ref()) {
        return update;
    }
    most_recent_non_empty_body(comments)
        .map(|body| truncate_chars(&body, FALLBACK_COMMENT_MAX_CHARS))
        .unwrap_or_default()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
