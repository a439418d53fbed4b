use serde::{Deserialize, Serialize};

/// Server-side query describing which project-board items to pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBoardQuery {
    pub owner: String,
    pub number: u64,
    /// Field-filter expression forwarded verbatim to the board collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Where a run takes its issue references from.
///
/// Shared by the reference resolver and the project-board collaborator so
/// neither needs to know the other's types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueSourceConfig {
    References { references: Vec<String> },
    ProjectBoard(ProjectBoardQuery),
}

impl IssueSourceConfig {
    pub fn references<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::References {
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::References { references } => references
                .iter()
                .all(|reference| reference.trim().is_empty()),
            Self::ProjectBoard(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IssueSourceConfig, ProjectBoardQuery};

    #[test]
    fn unit_blank_reference_lists_are_empty() {
        assert!(IssueSourceConfig::references(["", "  "]).is_empty());
        assert!(!IssueSourceConfig::references(["acme/widgets#1"]).is_empty());
        assert!(!IssueSourceConfig::ProjectBoard(ProjectBoardQuery {
            owner: "acme".to_string(),
            number: 3,
            filter: None,
        })
        .is_empty());
    }

    #[test]
    fn unit_issue_source_serializes_with_kind_tag() {
        let value = serde_json::to_value(IssueSourceConfig::references(["acme/widgets#1"]))
            .expect("serialize");
        assert_eq!(value["kind"], "references");
        assert_eq!(value["references"][0], "acme/widgets#1");
    }
}
