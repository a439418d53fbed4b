use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pulse_core::{parse_rfc3339_utc, CancellationToken, Comment, IssueRef};
use pulse_transport::{RetryPolicy, RetryTransport, TransportError};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::github_types::{GithubIssue, GithubIssueComment};

const COMMENTS_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
/// GitHub fetch failures, with 401/403/404 rewritten into actionable messages.
pub enum GithubApiError {
    #[error("github rejected the credentials while trying to {context} (401); check that the token is set and has not expired")]
    Unauthorized { context: String },
    #[error("github denied access while trying to {context} (403): {body}; the token may lack the scopes needed for this repository")]
    Forbidden { context: String, body: String },
    #[error("github could not find the target while trying to {context} (404); check the reference and that the token can see the repository")]
    NotFound { context: String },
    #[error("github request cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(TransportError),
    #[error("failed to decode github response while trying to {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid github client configuration: {0}")]
    InvalidConfig(String),
}

impl GithubApiError {
    fn from_transport(context: String, error: TransportError) -> Self {
        match error {
            TransportError::Cancelled { .. } => Self::Cancelled,
            TransportError::Status { status: 401, .. } => Self::Unauthorized { context },
            TransportError::Status {
                status: 403, body, ..
            } => Self::Forbidden { context, body },
            TransportError::Status { status: 404, .. } => Self::NotFound { context },
            other => Self::Transport(other),
        }
    }

    /// HTTP status behind the failure, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Transport(error) => error.status(),
            Self::Cancelled | Self::Decode { .. } | Self::InvalidConfig(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub title: String,
    pub url: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

#[async_trait]
/// Supplies issue metadata and comment history.
pub trait IssueFetcher: Send + Sync {
    async fn fetch_issue_metadata(
        &self,
        issue: &IssueRef,
        cancel: &CancellationToken,
    ) -> Result<IssueMetadata, GithubApiError>;

    /// Comments created at or after `since`, oldest first.
    async fn fetch_comments_since(
        &self,
        issue: &IssueRef,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, GithubApiError>;
}

#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    pub api_base: String,
    /// Bearer token; requests are sent anonymously when blank.
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: String::new(),
            request_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
/// GitHub REST client; cheap to clone and safe to share between workers.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    transport: RetryTransport,
}

impl GithubApiClient {
    pub fn new(config: GithubClientConfig) -> Result<Self, GithubApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("pulse-status-reports"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let token = config.token.trim();
        if !token.is_empty() {
            let auth_header = format!("Bearer {token}");
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&auth_header).map_err(|error| {
                    GithubApiError::InvalidConfig(format!("invalid authorization header: {error}"))
                })?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| {
                GithubApiError::InvalidConfig(format!("failed to create http client: {error}"))
            })?;
        Ok(Self {
            http,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            transport: RetryTransport::new(config.retry),
        })
    }

    async fn request_json<T, F>(
        &self,
        context: String,
        cancel: &CancellationToken,
        request_builder: F,
    ) -> Result<T, GithubApiError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self
            .transport
            .send(&context, cancel, request_builder)
            .await
            .map_err(|error| GithubApiError::from_transport(context.clone(), error))?;
        response
            .json::<T>()
            .await
            .map_err(|source| GithubApiError::Decode { context, source })
    }
}

#[async_trait]
impl IssueFetcher for GithubApiClient {
    async fn fetch_issue_metadata(
        &self,
        issue: &IssueRef,
        cancel: &CancellationToken,
    ) -> Result<IssueMetadata, GithubApiError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_base, issue.owner, issue.repo, issue.number
        );
        let payload: GithubIssue = self
            .request_json(format!("fetch issue {}", issue.slug()), cancel, || {
                self.http.get(&url)
            })
            .await?;
        Ok(IssueMetadata {
            title: payload.title,
            url: payload.html_url,
            labels: payload.labels.into_iter().map(|label| label.name).collect(),
            assignees: payload
                .assignees
                .into_iter()
                .map(|user| user.login)
                .collect(),
        })
    }

    async fn fetch_comments_since(
        &self,
        issue: &IssueRef,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, GithubApiError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, issue.owner, issue.repo, issue.number
        );
        let since_value = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let per_page = COMMENTS_PAGE_SIZE.to_string();
        let mut page = 1_u32;
        let mut comments = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueComment> = self
                .request_json(
                    format!("list comments on {}", issue.slug()),
                    cancel,
                    || {
                        self.http.get(&url).query(&[
                            ("since", since_value.as_str()),
                            ("per_page", per_page.as_str()),
                            ("page", page_value.as_str()),
                        ])
                    },
                )
                .await?;
            let chunk_len = chunk.len();
            comments.extend(
                chunk
                    .into_iter()
                    .filter_map(|comment| to_comment(issue, comment)),
            );
            if chunk_len < COMMENTS_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }

        // The API's `since` filters on update time; the window is about creation.
        comments.retain(|comment| comment.created_at >= since);
        comments.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        debug!(issue = %issue.url, pages = page, comments = comments.len(), "fetched comments");
        Ok(comments)
    }
}

fn to_comment(issue: &IssueRef, comment: GithubIssueComment) -> Option<Comment> {
    let Some(created_at) = parse_rfc3339_utc(&comment.created_at) else {
        warn!(
            issue = %issue.url,
            comment_id = comment.id,
            created_at = %comment.created_at,
            "skipping comment with unparsable timestamp"
        );
        return None;
    };
    let url = if comment.html_url.trim().is_empty() {
        format!("{}#issuecomment-{}", issue.url, comment.id)
    } else {
        comment.html_url
    };
    Some(Comment {
        body: comment.body.unwrap_or_default(),
        author: comment.user.map(|user| user.login).unwrap_or_default(),
        created_at,
        url,
    })
}
