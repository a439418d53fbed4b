use anyhow::{anyhow, bail, Context, Result};
use pulse_core::{CancellationToken, IssueRef, IssueSourceConfig};
use pulse_github::{dedupe_issue_refs, parse_issue_ref, IssueRefSource};
use tracing::debug;

/// Turns an issue-source description into a de-duplicated reference list.
///
/// Project boards are delegated to `project_source`; explicit lists are parsed
/// locally and fail on the first malformed entry.
pub async fn resolve_issue_refs(
    source: &IssueSourceConfig,
    project_source: Option<&dyn IssueRefSource>,
    cancel: &CancellationToken,
) -> Result<Vec<IssueRef>> {
    let refs = match source {
        IssueSourceConfig::References { references } => references
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| parse_issue_ref(raw).map_err(|error| anyhow!(error)))
            .collect::<Result<Vec<_>>>()?,
        IssueSourceConfig::ProjectBoard(query) => {
            let Some(project_source) = project_source else {
                bail!(
                    "project board {}/{} requires a project source",
                    query.owner,
                    query.number
                );
            };
            project_source
                .issue_refs(cancel)
                .await
                .with_context(|| {
                    format!(
                        "failed to list issues on project board {}/{}",
                        query.owner, query.number
                    )
                })?
        }
    };
    let total = refs.len();
    let refs = dedupe_issue_refs(refs);
    debug!(total, unique = refs.len(), "resolved issue references");
    if refs.is_empty() {
        bail!("no issue references were supplied");
    }
    Ok(refs)
}
