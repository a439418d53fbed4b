use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Subset of the REST issue payload used for metadata.
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub assignees: Vec<GithubUser>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Subset of the REST issue-comment payload.
pub struct GithubIssueComment {
    pub id: u64,
    pub body: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub html_url: String,
    pub user: Option<GithubUser>,
}
