use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use pulse_ai::{NoopSummarizer, SummarizeError, Summarizer};
use pulse_core::{
    BatchItem, BatchResult, BatchResults, CancellationToken, Comment, IssueRef,
    SentimentAssessment,
};
use pulse_github::{GithubApiError, IssueFetcher, IssueMetadata};
use pulse_runtime::{run_pipeline, PipelineConfig, SummarySource};

fn window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        since: window_start(),
        workers,
    }
}

fn report_comment(hours: i64, status: &str, update: &str) -> Comment {
    Comment {
        body: format!(
            "<!-- data key=\"isReport\" value=\"true\" -->\n\
             <!-- data key=\"trending\" start -->{status}<!-- data end -->\n\
             <!-- data key=\"target_date\" start -->2024-06-30<!-- data end -->\n\
             <!-- data key=\"update\" start -->{update}<!-- data end -->"
        ),
        author: "dev".to_string(),
        created_at: window_start() + ChronoDuration::hours(hours),
        url: format!("https://github.com/acme/widgets/issues/1#issuecomment-{hours}"),
    }
}

fn plain_comment(hours: i64, body: &str) -> Comment {
    Comment {
        body: body.to_string(),
        author: "dev".to_string(),
        created_at: window_start() + ChronoDuration::hours(hours),
        url: format!("https://github.com/acme/widgets/issues/2#issuecomment-{hours}"),
    }
}

#[derive(Default)]
struct FakeFetcher {
    issues: HashMap<String, (String, Vec<Comment>)>,
    missing: Vec<String>,
    delay_ms: u64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    fn with_issue(mut self, issue: &IssueRef, title: &str, comments: Vec<Comment>) -> Self {
        self.issues
            .insert(issue.url.clone(), (title.to_string(), comments));
        self
    }

    fn with_missing(mut self, issue: &IssueRef) -> Self {
        self.missing.push(issue.url.clone());
        self
    }
}

#[async_trait]
impl IssueFetcher for FakeFetcher {
    async fn fetch_issue_metadata(
        &self,
        issue: &IssueRef,
        _cancel: &CancellationToken,
    ) -> Result<IssueMetadata, GithubApiError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.missing.contains(&issue.url) {
            return Err(GithubApiError::NotFound {
                context: format!("fetch issue {}", issue.slug()),
            });
        }
        let (title, _) = self.issues.get(&issue.url).cloned().unwrap_or_default();
        Ok(IssueMetadata {
            title,
            url: issue.url.clone(),
            labels: Vec::new(),
            assignees: Vec::new(),
        })
    }

    async fn fetch_comments_since(
        &self,
        issue: &IssueRef,
        since: DateTime<Utc>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, GithubApiError> {
        let (_, comments) = self.issues.get(&issue.url).cloned().unwrap_or_default();
        Ok(comments
            .into_iter()
            .filter(|comment| comment.created_at >= since)
            .collect())
    }
}

type BatchResponder = Box<dyn Fn(&[BatchItem]) -> Result<BatchResults, SummarizeError> + Send + Sync>;

struct RecordingSummarizer {
    batches: Mutex<Vec<Vec<BatchItem>>>,
    responder: BatchResponder,
}

impl RecordingSummarizer {
    fn new(responder: BatchResponder) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            responder,
        }
    }

    fn batches(&self) -> Vec<Vec<BatchItem>> {
        self.batches.lock().expect("batches lock").clone()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(
        &self,
        text: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        Ok(text.to_string())
    }

    async fn summarize_updates(
        &self,
        updates: &[String],
        _cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        Ok(updates.join("\n"))
    }

    async fn summarize_batch(
        &self,
        items: &[BatchItem],
        _cancel: &CancellationToken,
    ) -> Result<BatchResults, SummarizeError> {
        self.batches
            .lock()
            .expect("batches lock")
            .push(items.to_vec());
        (self.responder)(items)
    }
}

#[tokio::test]
async fn functional_pipeline_summarizes_reports_and_falls_back_for_plain_issues() {
    let reported = IssueRef::new("acme", "widgets", 1);
    let plain = IssueRef::new("acme", "widgets", 2);
    let fetcher = FakeFetcher::default()
        .with_issue(
            &reported,
            "Ship widgets",
            vec![
                report_comment(-48, "off_track", "outside the window"),
                report_comment(2, "on_track", "kickoff done"),
                report_comment(30, "at_risk", "vendor slipped"),
            ],
        )
        .with_issue(
            &plain,
            "Tidy docs",
            vec![plain_comment(1, "first pass"), plain_comment(5, "  docs merged  ")],
        );
    let summarizer = RecordingSummarizer::new(Box::new(|items| {
        Ok(items
            .iter()
            .map(|item| {
                (
                    item.issue_url.clone(),
                    BatchResult {
                        summary: format!("  {} update(s)  ", item.updates.len()),
                        sentiment: Some(SentimentAssessment {
                            suggested_status: "off_track".to_string(),
                            explanation: "vendor delay".to_string(),
                        }),
                    },
                )
            })
            .collect())
    }));

    let report = run_pipeline(
        &[plain.clone(), reported.clone()],
        &fetcher,
        &summarizer,
        &config(4),
        &CancellationToken::new(),
    )
    .await
    .expect("pipeline");

    let batches = summarizer.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].issue_url, reported.url);
    assert_eq!(batches[0][0].updates, vec!["vendor slipped", "kickoff done"]);
    assert_eq!(batches[0][0].reported_status, "at_risk");

    assert!(report.failures.is_empty());
    let urls = report
        .summaries
        .iter()
        .map(|summary| summary.issue.url.as_str())
        .collect::<Vec<_>>();
    assert_eq!(urls, vec![reported.url.as_str(), plain.url.as_str()]);

    let first = &report.summaries[0];
    assert_eq!(first.title, "Ship widgets");
    assert_eq!(first.summary, "2 update(s)");
    assert_eq!(first.source, SummarySource::Ai);
    assert_eq!(first.reported_status.as_deref(), Some("at_risk"));
    assert_eq!(first.target_date.as_deref(), Some("2024-06-30"));
    assert_eq!(first.report_count, 2);
    assert_eq!(
        first
            .sentiment
            .as_ref()
            .map(|sentiment| sentiment.suggested_status.as_str()),
        Some("off_track")
    );

    let second = &report.summaries[1];
    assert_eq!(second.summary, "docs merged");
    assert_eq!(second.source, SummarySource::Fallback);
    assert!(second.reported_status.is_none());
    assert!(second.sentiment.is_none());
}

#[tokio::test]
async fn regression_single_fetch_failure_does_not_abort_the_run() {
    let healthy = IssueRef::new("acme", "widgets", 1);
    let missing = IssueRef::new("acme", "widgets", 404);
    let fetcher = FakeFetcher::default()
        .with_issue(&healthy, "Ship widgets", vec![report_comment(1, "on_track", "ok")])
        .with_missing(&missing);

    let report = run_pipeline(
        &[healthy.clone(), missing.clone()],
        &fetcher,
        &NoopSummarizer,
        &config(2),
        &CancellationToken::new(),
    )
    .await
    .expect("partial success");

    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.summaries[0].summary, "ok");
    assert_eq!(report.summaries[0].source, SummarySource::Joined);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].issue, missing);
    assert!(report.failures[0].error.contains("acme/widgets#404"));
}

#[tokio::test]
async fn regression_run_fails_when_every_fetch_fails() {
    let first = IssueRef::new("acme", "widgets", 8);
    let second = IssueRef::new("acme", "widgets", 9);
    let fetcher = FakeFetcher::default()
        .with_missing(&first)
        .with_missing(&second);

    let error = run_pipeline(
        &[first, second],
        &fetcher,
        &NoopSummarizer,
        &config(2),
        &CancellationToken::new(),
    )
    .await
    .expect_err("no data");

    assert!(error.to_string().contains("no issue data could be fetched"));
}

#[tokio::test]
async fn functional_batch_failure_falls_back_to_latest_update() {
    let issue = IssueRef::new("acme", "widgets", 1);
    let fetcher = FakeFetcher::default().with_issue(
        &issue,
        "Ship widgets",
        vec![
            report_comment(1, "on_track", "older update"),
            report_comment(9, "on_track", "newest update"),
        ],
    );
    let summarizer = RecordingSummarizer::new(Box::new(|_| {
        Err(SummarizeError::Unparsable {
            preview: "I cannot help".to_string(),
        })
    }));

    let report = run_pipeline(
        &[issue],
        &fetcher,
        &summarizer,
        &config(1),
        &CancellationToken::new(),
    )
    .await
    .expect("fallback run");

    assert_eq!(summarizer.batches().len(), 1);
    assert_eq!(report.summaries[0].summary, "newest update");
    assert_eq!(report.summaries[0].source, SummarySource::Fallback);
    assert!(report.summaries[0].sentiment.is_none());
}

#[tokio::test]
async fn functional_items_omitted_by_the_backend_use_fallback_text() {
    let answered = IssueRef::new("acme", "widgets", 1);
    let omitted = IssueRef::new("acme", "widgets", 3);
    let fetcher = FakeFetcher::default()
        .with_issue(&answered, "A", vec![report_comment(1, "on_track", "answered")])
        .with_issue(&omitted, "B", vec![report_comment(1, "on_track", "omitted")]);
    let answered_url = answered.url.clone();
    let summarizer = RecordingSummarizer::new(Box::new(move |_| {
        let mut results = BatchResults::new();
        results.insert(answered_url.clone(), BatchResult::plain("generated"));
        Ok(results)
    }));

    let report = run_pipeline(
        &[answered, omitted],
        &fetcher,
        &summarizer,
        &config(2),
        &CancellationToken::new(),
    )
    .await
    .expect("run");

    assert_eq!(report.summaries[0].summary, "generated");
    assert_eq!(report.summaries[0].source, SummarySource::Ai);
    assert_eq!(report.summaries[1].summary, "omitted");
    assert_eq!(report.summaries[1].source, SummarySource::Fallback);
}

#[tokio::test]
async fn integration_fetch_fan_out_respects_worker_bound() {
    let issues = (1..=6)
        .map(|number| IssueRef::new("acme", "widgets", number))
        .collect::<Vec<_>>();
    let mut fetcher = issues.iter().fold(FakeFetcher::default(), |fetcher, issue| {
        fetcher.with_issue(issue, "title", Vec::new())
    });
    fetcher.delay_ms = 20;

    let report = run_pipeline(
        &issues,
        &fetcher,
        &NoopSummarizer,
        &config(2),
        &CancellationToken::new(),
    )
    .await
    .expect("run");

    assert_eq!(report.summaries.len(), 6);
    let peak = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 2, "observed {peak} concurrent fetches");
    assert!(peak >= 1);
}

#[tokio::test]
async fn regression_empty_reference_list_is_rejected() {
    let error = run_pipeline(
        &[],
        &FakeFetcher::default(),
        &NoopSummarizer,
        &config(1),
        &CancellationToken::new(),
    )
    .await
    .expect_err("empty");
    assert!(error.to_string().contains("no issue references"));
}
