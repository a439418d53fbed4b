//! Foundational types shared across pulse crates.
//!
//! Provides the transient pipeline data model (issue references, comments,
//! reports, batch items and results), the cooperative cancellation token that
//! is threaded through every suspending call, the shared issue-source
//! configuration value, and small time helpers.

pub mod cancellation;
pub mod issue_source;
pub mod time_utils;
pub mod types;

pub use cancellation::CancellationToken;
pub use issue_source::{IssueSourceConfig, ProjectBoardQuery};
pub use time_utils::{current_unix_timestamp, parse_rfc3339_utc, report_window_start};
pub use types::{
    BatchItem, BatchResult, BatchResults, Comment, IssueRef, Report, SentimentAssessment,
};
