//! Completion-backend client and issue summarization for pulse.
mod batch_prompt;
mod batch_response;
mod openai;
mod prompts;
mod summarizer;
mod types;

pub use batch_prompt::{build_batch_user_prompt, chunk_batch_items, BatchPromptItem};
pub use batch_response::{
    parse_batch_response, parse_flat_json, parse_markdown_sections, parse_nested_json,
    strip_code_fence, BatchResponseFormat, RESPONSE_PARSERS,
};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompts::{BATCH_SYSTEM_PROMPT, MULTI_UPDATE_SYSTEM_PROMPT, SINGLE_SYSTEM_PROMPT};
pub use summarizer::{
    AiSummarizer, BatchSummarizerConfig, NoopSummarizer, SummarizeError, Summarizer,
    DEFAULT_MAX_BATCH_ITEMS,
};
pub use types::{
    ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, MessageRole, PulseAiError,
};
