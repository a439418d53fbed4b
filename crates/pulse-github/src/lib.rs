//! GitHub-facing pieces of the pulse pipeline.
//!
//! Recovers structured status reports embedded in issue comments, selects the
//! reports inside a time window, resolves issue references, and fetches issue
//! metadata and comments over the REST API through the retry transport.

pub mod github_api_client;
pub mod github_types;
pub mod issue_ref;
pub mod issue_source;
pub mod report_marker;
pub mod report_selector;

pub use github_api_client::{
    GithubApiClient, GithubApiError, GithubClientConfig, IssueFetcher, IssueMetadata,
};
pub use issue_ref::{dedupe_issue_refs, parse_issue_ref, IssueRefParseError};
pub use issue_source::{IssueRefSource, StaticIssueRefSource};
pub use report_marker::parse_report;
pub use report_selector::{most_recent_non_empty_body, select_reports};
