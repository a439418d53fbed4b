use thiserror::Error;

#[derive(Debug, Error)]
/// Terminal outcome of a request issued through the retry transport.
pub enum TransportError {
    #[error("{operation} cancelled")]
    Cancelled { operation: String },
    #[error("{operation} request failed: {source}")]
    Http {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: usize,
        #[source]
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// HTTP status of the final response, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            Self::Cancelled { .. } | Self::Http { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Number of attempts made before giving up; 1 for errors that were never retried.
    pub fn attempts(&self) -> usize {
        match self {
            Self::RetriesExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

/// Truncates `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut truncated = trimmed.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
