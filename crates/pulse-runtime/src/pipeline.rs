use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use pulse_ai::Summarizer;
use pulse_core::{
    report_window_start, BatchItem, BatchResults, CancellationToken, Comment, IssueRef, Report,
};
use pulse_github::{select_reports, GithubApiError, IssueFetcher, IssueMetadata};
use tracing::{debug, info, warn};

use crate::issue_summary::{
    fallback_summary_text, latest_field, IssueFailure, IssueSummary, PulseReport, SummarySource,
};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_SINCE_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Reports created before this instant are ignored.
    pub since: DateTime<Utc>,
    /// Upper bound on concurrent issue fetches.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            since: report_window_start(Utc::now(), DEFAULT_SINCE_DAYS),
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug)]
struct FetchedIssue {
    issue: IssueRef,
    metadata: IssueMetadata,
    comments: Vec<Comment>,
    reports: Vec<Report>,
}

async fn fetch_issue(
    fetcher: &dyn IssueFetcher,
    issue: &IssueRef,
    since: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<FetchedIssue, GithubApiError> {
    let metadata = fetcher.fetch_issue_metadata(issue, cancel).await?;
    let comments = fetcher.fetch_comments_since(issue, since, cancel).await?;
    let reports = select_reports(&comments, since);
    debug!(
        issue = %issue.url,
        comments = comments.len(),
        reports = reports.len(),
        "fetched issue"
    );
    Ok(FetchedIssue {
        issue: issue.clone(),
        metadata,
        comments,
        reports,
    })
}

/// Fetches, selects and summarizes every issue.
///
/// Individual fetch failures are recorded in [`PulseReport::failures`] and do
/// not stop the run; the run fails only when no issue could be fetched. A
/// failed batch summarization falls back to non-AI text for every issue.
pub async fn run_pipeline(
    issues: &[IssueRef],
    fetcher: &dyn IssueFetcher,
    summarizer: &dyn Summarizer,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<PulseReport> {
    if issues.is_empty() {
        bail!("no issue references to process");
    }
    let since = config.since;
    let outcomes = stream::iter(issues.iter())
        .map(move |issue| async move {
            let outcome = fetch_issue(fetcher, issue, since, cancel).await;
            (issue, outcome)
        })
        .buffer_unordered(config.workers.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut fetched = Vec::new();
    let mut failures = Vec::new();
    for (issue, outcome) in outcomes {
        match outcome {
            Ok(issue_data) => fetched.push(issue_data),
            Err(error) => {
                warn!(issue = %issue.url, error = %error, "failed to fetch issue");
                failures.push(IssueFailure {
                    issue: issue.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
    if fetched.is_empty() {
        bail!(
            "no issue data could be fetched ({} of {} issues failed)",
            failures.len(),
            issues.len()
        );
    }
    info!(
        fetched = fetched.len(),
        failed = failures.len(),
        "issue fetch finished"
    );

    let items = fetched
        .iter()
        .filter_map(batch_item_for)
        .collect::<Vec<_>>();
    let results = summarize_items(summarizer, &items, cancel).await;
    let generated_source = if summarizer.uses_backend() {
        SummarySource::Ai
    } else {
        SummarySource::Joined
    };

    let mut summaries = fetched
        .into_iter()
        .map(|issue_data| assemble_summary(issue_data, &results, generated_source))
        .collect::<Vec<_>>();
    summaries.sort_by(|left, right| left.issue.url.cmp(&right.issue.url));
    failures.sort_by(|left, right| left.issue.url.cmp(&right.issue.url));
    Ok(PulseReport {
        summaries,
        failures,
    })
}

/// Batch entry for an issue with at least one update in the window.
fn batch_item_for(issue_data: &FetchedIssue) -> Option<BatchItem> {
    let updates = issue_data
        .reports
        .iter()
        .filter_map(|report| report.update_text.as_deref())
        .map(str::trim)
        .filter(|update| !update.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if updates.is_empty() {
        return None;
    }
    Some(BatchItem {
        issue_url: issue_data.issue.url.clone(),
        issue_title: issue_data.metadata.title.clone(),
        updates,
        reported_status: latest_field(&issue_data.reports, |report| report.status_text.as_ref())
            .unwrap_or_default(),
    })
}

async fn summarize_items(
    summarizer: &dyn Summarizer,
    items: &[BatchItem],
    cancel: &CancellationToken,
) -> BatchResults {
    if items.is_empty() {
        return BatchResults::new();
    }
    if cancel.is_cancelled() {
        warn!("run cancelled before summarization; using fallback text");
        return BatchResults::new();
    }
    match summarizer.summarize_batch(items, cancel).await {
        Ok(results) => {
            let missing = items
                .iter()
                .filter(|item| !results.contains_key(&item.issue_url))
                .count();
            if missing > 0 {
                warn!(missing, "batch summarization omitted issues; using fallback text");
            }
            results
        }
        Err(error) => {
            warn!(
                error = %error,
                items = items.len(),
                "batch summarization failed; using fallback text"
            );
            BatchResults::new()
        }
    }
}

fn assemble_summary(
    issue_data: FetchedIssue,
    results: &BatchResults,
    generated_source: SummarySource,
) -> IssueSummary {
    let reported_status = latest_field(&issue_data.reports, |report| report.status_text.as_ref());
    let target_date = latest_field(&issue_data.reports, |report| {
        report.target_date_text.as_ref()
    });
    let generated = results
        .get(&issue_data.issue.url)
        .filter(|result| !result.summary.trim().is_empty());
    let (summary, sentiment, source) = match generated {
        Some(result) => (
            result.summary.trim().to_string(),
            result.sentiment.clone(),
            generated_source,
        ),
        None => (
            fallback_summary_text(&issue_data.reports, &issue_data.comments),
            None,
            SummarySource::Fallback,
        ),
    };
    let title = if issue_data.metadata.title.trim().is_empty() {
        issue_data.issue.slug()
    } else {
        issue_data.metadata.title
    };
    IssueSummary {
        issue: issue_data.issue,
        title,
        reported_status,
        target_date,
        summary,
        sentiment,
        source,
        report_count: issue_data.reports.len(),
    }
}
