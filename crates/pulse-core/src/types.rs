use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one tracked issue. Equality and hashing use the canonical URL only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub url: String,
}

impl IssueRef {
    /// Builds a reference whose canonical URL is derived from its parts.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        let url = format!("https://github.com/{owner}/{repo}/issues/{number}");
        Self {
            owner,
            repo,
            number,
            url,
        }
    }

    pub fn slug(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl PartialEq for IssueRef {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for IssueRef {}

impl Hash for IssueRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// One discussion entry on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

/// Structured status fragment recovered from a single comment.
///
/// At least one of the three raw fields is present; the marker parser is the
/// only producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub status_text: Option<String>,
    pub target_date_text: Option<String>,
    pub update_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub source_url: String,
}

/// One issue's worth of update texts submitted for summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Unique key of the item within a batch.
    pub issue_url: String,
    pub issue_title: String,
    /// Newest first.
    pub updates: Vec<String>,
    pub reported_status: String,
}

/// Backend-detected mismatch between the reported status and the updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentAssessment {
    pub suggested_status: String,
    pub explanation: String,
}

/// Summarization outcome for one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentAssessment>,
}

impl BatchResult {
    pub fn plain(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            sentiment: None,
        }
    }
}

/// Batch results keyed by issue URL. A missing key means "use fallback text".
pub type BatchResults = BTreeMap<String, BatchResult>;
