use async_trait::async_trait;
use pulse_core::{CancellationToken, IssueRef};

use crate::github_api_client::GithubApiError;

#[async_trait]
/// Producer of issue references, such as a project-board query.
///
/// Implementations apply their own server-side filtering; the pipeline treats
/// their output exactly like a hand-written list.
pub trait IssueRefSource: Send + Sync {
    async fn issue_refs(&self, cancel: &CancellationToken)
        -> Result<Vec<IssueRef>, GithubApiError>;
}

#[derive(Debug, Clone, Default)]
/// An already-resolved list of references.
pub struct StaticIssueRefSource {
    refs: Vec<IssueRef>,
}

impl StaticIssueRefSource {
    pub fn new(refs: Vec<IssueRef>) -> Self {
        Self { refs }
    }
}

#[async_trait]
impl IssueRefSource for StaticIssueRefSource {
    async fn issue_refs(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<IssueRef>, GithubApiError> {
        if cancel.is_cancelled() {
            return Err(GithubApiError::Cancelled);
        }
        Ok(self.refs.clone())
    }
}
