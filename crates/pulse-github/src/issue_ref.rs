use std::collections::HashSet;

use pulse_core::IssueRef;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid issue reference '{raw}': {reason}")]
pub struct IssueRefParseError {
    pub raw: String,
    pub reason: &'static str,
}

fn invalid(raw: &str, reason: &'static str) -> IssueRefParseError {
    IssueRefParseError {
        raw: raw.to_string(),
        reason,
    }
}

/// Parses `https://github.com/{owner}/{repo}/issues/{n}` (or `/pull/{n}`) and
/// the `{owner}/{repo}#{n}` shorthand into an [`IssueRef`] with a canonical URL.
pub fn parse_issue_ref(raw: &str) -> Result<IssueRef, IssueRefParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "reference is empty"));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return parse_issue_url(raw, trimmed);
    }

    let (slug, number) = trimmed
        .split_once('#')
        .ok_or_else(|| invalid(raw, "expected a GitHub issue URL or owner/repo#number"))?;
    let (owner, repo) = slug
        .split_once('/')
        .ok_or_else(|| invalid(raw, "expected owner/repo before '#'"))?;
    build_ref(raw, owner, repo, number)
}

fn parse_issue_url(raw: &str, trimmed: &str) -> Result<IssueRef, IssueRefParseError> {
    let url = reqwest::Url::parse(trimmed).map_err(|_| invalid(raw, "malformed URL"))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if host != "github.com" && host != "www.github.com" {
        return Err(invalid(raw, "only github.com issue URLs are supported"));
    }
    let segments = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    match segments.as_slice() {
        [owner, repo, "issues" | "pull", number, ..] => build_ref(raw, owner, repo, number),
        _ => Err(invalid(raw, "expected /{owner}/{repo}/issues/{number}")),
    }
}

fn build_ref(
    raw: &str,
    owner: &str,
    repo: &str,
    number: &str,
) -> Result<IssueRef, IssueRefParseError> {
    let owner = owner.trim();
    let repo = repo.trim();
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid(raw, "owner and repository must be non-empty"));
    }
    let number = number
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|number| *number > 0)
        .ok_or_else(|| invalid(raw, "issue number must be a positive integer"))?;
    Ok(IssueRef::new(owner, repo, number))
}

/// Drops repeated references, keeping the first occurrence of each canonical URL.
pub fn dedupe_issue_refs(refs: Vec<IssueRef>) -> Vec<IssueRef> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|issue| seen.insert(issue.url.clone()))
        .collect()
}
