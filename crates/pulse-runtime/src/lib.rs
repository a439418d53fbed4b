//! Orchestration for a pulse run.
//!
//! Resolves issue references, fetches every issue with bounded concurrency,
//! selects the reports inside the window, submits one batch for
//! summarization, and assembles per-issue summaries with fallback text when
//! the backend cannot help.
mod issue_summary;
mod pipeline;
mod resolve;

pub use issue_summary::{
    fallback_summary_text, latest_field, IssueFailure, IssueSummary, PulseReport, SummarySource,
    FALLBACK_COMMENT_MAX_CHARS,
};
pub use pipeline::{run_pipeline, PipelineConfig, DEFAULT_SINCE_DAYS, DEFAULT_WORKERS};
pub use resolve::resolve_issue_refs;
