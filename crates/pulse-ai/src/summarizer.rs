use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::{BatchItem, BatchResult, BatchResults, CancellationToken};
use pulse_transport::truncate_for_error;
use thiserror::Error;
use tracing::{debug, warn};

use crate::batch_prompt::{build_batch_user_prompt, chunk_batch_items};
use crate::batch_response::parse_batch_response;
use crate::prompts::{BATCH_SYSTEM_PROMPT, MULTI_UPDATE_SYSTEM_PROMPT, SINGLE_SYSTEM_PROMPT};
use crate::{ChatRequest, LlmClient, Message, PulseAiError};

/// Items per backend call; larger batches are chunked.
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 25;

const UNPARSABLE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarization backend failed: {0}")]
    Backend(#[from] PulseAiError),
    #[error("failed to build batch prompt: {0}")]
    Prompt(#[from] serde_json::Error),
    #[error("could not parse batch response: {preview}")]
    Unparsable { preview: String },
    #[error("batch chunk {chunk}/{total} failed: {source}")]
    ChunkFailed {
        chunk: usize,
        total: usize,
        #[source]
        source: Box<SummarizeError>,
    },
}

#[async_trait]
/// Condenses status updates into short summaries.
pub trait Summarizer: Send + Sync {
    /// Whether summaries come from a generative backend rather than joined text.
    fn uses_backend(&self) -> bool {
        true
    }

    /// Summarizes one update. The backend's text is returned untrimmed.
    async fn summarize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError>;

    /// Summarizes several updates (newest first) belonging to one issue.
    async fn summarize_updates(
        &self,
        updates: &[String],
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError>;

    /// Summarizes many issues at once, keyed by issue URL.
    ///
    /// An item missing from the result means the caller should fall back to non-AI text.
    async fn summarize_batch(
        &self,
        items: &[BatchItem],
        cancel: &CancellationToken,
    ) -> Result<BatchResults, SummarizeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummarizerConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_batch_items: usize,
}

impl Default for BatchSummarizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.3),
            max_tokens: None,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}

#[derive(Clone)]
/// Summarizer backed by a chat-completion client.
pub struct AiSummarizer {
    client: Arc<dyn LlmClient>,
    config: BatchSummarizerConfig,
}

impl AiSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, config: BatchSummarizerConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, system_prompt: &str, user_prompt: String) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn complete_text(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        let response = self.client.complete(request, cancel).await?;
        debug!(
            model = %self.config.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "completion finished"
        );
        if response.is_truncated() {
            warn!(
                model = %self.config.model,
                output_tokens = response.usage.output_tokens,
                "completion hit the token limit; output may be cut short"
            );
        }
        Ok(response.message.content)
    }

    async fn summarize_chunk(
        &self,
        items: &[BatchItem],
        cancel: &CancellationToken,
    ) -> Result<BatchResults, SummarizeError> {
        let user_prompt = build_batch_user_prompt(items)?;
        let content = self
            .complete_text(self.request(BATCH_SYSTEM_PROMPT, user_prompt), cancel)
            .await?;

        let known_ids = items
            .iter()
            .map(|item| item.issue_url.as_str())
            .collect::<Vec<_>>();
        let Some((format, results)) = parse_batch_response(&content, &known_ids) else {
            return Err(SummarizeError::Unparsable {
                preview: truncate_for_error(&content, UNPARSABLE_PREVIEW_CHARS),
            });
        };
        debug!(
            format = format.as_str(),
            requested = items.len(),
            parsed = results.len(),
            "parsed batch summarization response"
        );
        Ok(results)
    }
}

#[async_trait]
impl Summarizer for AiSummarizer {
    async fn summarize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        self.complete_text(self.request(SINGLE_SYSTEM_PROMPT, text.to_string()), cancel)
            .await
    }

    async fn summarize_updates(
        &self,
        updates: &[String],
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        match updates {
            [] => Ok(String::new()),
            [single] => self.summarize(single, cancel).await,
            _ => {
                let user_prompt = updates
                    .iter()
                    .enumerate()
                    .map(|(index, update)| {
                        format!(
                            "Update {} of {} (newest first):\n{}",
                            index + 1,
                            updates.len(),
                            update.trim()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n");
                self.complete_text(self.request(MULTI_UPDATE_SYSTEM_PROMPT, user_prompt), cancel)
                    .await
            }
        }
    }

    async fn summarize_batch(
        &self,
        items: &[BatchItem],
        cancel: &CancellationToken,
    ) -> Result<BatchResults, SummarizeError> {
        if items.is_empty() {
            return Ok(BatchResults::new());
        }
        let max_items = self.config.max_batch_items.max(1);
        if items.len() <= max_items {
            return self.summarize_chunk(items, cancel).await;
        }

        let chunks = chunk_batch_items(items, max_items);
        let total = chunks.len();
        let mut merged = BatchResults::new();
        // Chunks run one at a time; backends rate-limit per caller.
        for (index, chunk) in chunks.into_iter().enumerate() {
            let results = self
                .summarize_chunk(chunk, cancel)
                .await
                .map_err(|source| {
                    warn!(chunk = index + 1, total, error = %source, "batch chunk failed");
                    SummarizeError::ChunkFailed {
                        chunk: index + 1,
                        total,
                        source: Box::new(source),
                    }
                })?;
            merged.extend(results);
        }
        Ok(merged)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Summarizer used when AI summarization is disabled; it never touches the network.
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    fn uses_backend(&self) -> bool {
        false
    }

    async fn summarize(
        &self,
        text: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        Ok(text.to_string())
    }

    async fn summarize_updates(
        &self,
        updates: &[String],
        _cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        Ok(updates.join(" "))
    }

    async fn summarize_batch(
        &self,
        items: &[BatchItem],
        _cancel: &CancellationToken,
    ) -> Result<BatchResults, SummarizeError> {
        Ok(items
            .iter()
            .map(|item| {
                (
                    item.issue_url.clone(),
                    BatchResult::plain(item.updates.join(" ")),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pulse_core::{BatchItem, CancellationToken};

    use super::{NoopSummarizer, Summarizer};

    fn item(url: &str, updates: &[&str]) -> BatchItem {
        BatchItem {
            issue_url: url.to_string(),
            issue_title: "title".to_string(),
            updates: updates.iter().map(|update| update.to_string()).collect(),
            reported_status: "on_track".to_string(),
        }
    }

    #[tokio::test]
    async fn unit_noop_summarizer_joins_updates_with_single_spaces() {
        let cancel = CancellationToken::new();
        let results = NoopSummarizer
            .summarize_batch(&[item("u1", &["a", "b"]), item("u2", &[])], &cancel)
            .await
            .expect("noop batch");
        assert_eq!(results["u1"].summary, "a b");
        assert_eq!(results["u2"].summary, "");
        assert!(results.values().all(|result| result.sentiment.is_none()));

        let joined = NoopSummarizer
            .summarize_updates(&["x".to_string(), "y".to_string()], &cancel)
            .await
            .expect("noop updates");
        assert_eq!(joined, "x y");
        assert_eq!(
            NoopSummarizer
                .summarize(" raw ", &cancel)
                .await
                .expect("noop single"),
            " raw "
        );
    }
}
