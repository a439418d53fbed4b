use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use pulse_ai::{
    AiSummarizer, BatchSummarizerConfig, NoopSummarizer, OpenAiClient, OpenAiConfig, Summarizer,
};
use pulse_core::{report_window_start, CancellationToken, IssueSourceConfig};
use pulse_github::{GithubApiClient, GithubClientConfig};
use pulse_runtime::{resolve_issue_refs, run_pipeline, PipelineConfig, PulseReport};
use pulse_transport::RetryPolicy;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::Cli;

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Splits reference-list text into entries, skipping blank lines and `#` comments.
pub fn parse_reference_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn read_reference_file(path: &Path) -> Result<Vec<String>> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read issue references from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read issue references from {}", path.display()))?
    };
    Ok(parse_reference_lines(&text))
}

/// Positional references followed by the input file's entries.
pub async fn collect_references(cli: &Cli) -> Result<Vec<String>> {
    let mut references = cli.issues.clone();
    if let Some(path) = cli.input_file.as_deref() {
        references.extend(read_reference_file(path).await?);
    }
    Ok(references)
}

fn retry_policy(cli: &Cli, base: RetryPolicy) -> RetryPolicy {
    RetryPolicy {
        max_retries: cli.max_retries,
        base_delay_ms: cli.retry_base_delay_ms,
        ..base
    }
}

pub fn github_client_config(cli: &Cli) -> GithubClientConfig {
    let defaults = GithubClientConfig::default();
    GithubClientConfig {
        api_base: cli.github_api_base.clone(),
        token: cli.github_token.clone().unwrap_or_default(),
        request_timeout_ms: cli
            .request_timeout_ms
            .unwrap_or(defaults.request_timeout_ms),
        retry: retry_policy(cli, defaults.retry),
    }
}

/// Chat backend settings, taking the key from `--ai-api-key` or `OPENAI_API_KEY`.
pub fn openai_config(cli: &Cli) -> OpenAiConfig {
    let defaults = OpenAiConfig::default();
    let api_key = cli
        .ai_api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
        .unwrap_or_default();
    OpenAiConfig {
        api_base: cli.ai_api_base.clone(),
        api_key,
        request_timeout_ms: cli
            .request_timeout_ms
            .unwrap_or(defaults.request_timeout_ms),
        retry: retry_policy(cli, defaults.retry),
    }
}

pub fn build_summarizer(cli: &Cli) -> Result<Arc<dyn Summarizer>> {
    if cli.no_ai {
        info!("AI summarization disabled; joining update texts");
        return Ok(Arc::new(NoopSummarizer));
    }
    let client = OpenAiClient::new(openai_config(cli)).with_context(|| {
        format!(
            "failed to configure AI client (set --ai-api-key, PULSE_AI_API_KEY or \
             {OPENAI_API_KEY_ENV}, or pass --no-ai)"
        )
    })?;
    Ok(Arc::new(AiSummarizer::new(
        Arc::new(client),
        BatchSummarizerConfig {
            model: cli.ai_model.clone(),
            max_batch_items: cli.batch_size,
            ..BatchSummarizerConfig::default()
        },
    )))
}

/// Runs one full pass: resolve, fetch, summarize.
pub async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<PulseReport> {
    let references = collect_references(cli).await?;
    let source = IssueSourceConfig::References { references };
    let issues = resolve_issue_refs(&source, None, cancel).await?;

    let fetcher = GithubApiClient::new(github_client_config(cli))
        .context("failed to configure GitHub client")?;
    let summarizer = build_summarizer(cli)?;
    let config = PipelineConfig {
        since: report_window_start(Utc::now(), cli.since_days),
        workers: cli.workers,
    };
    info!(
        issues = issues.len(),
        since = %config.since,
        workers = config.workers,
        "starting pulse run"
    );
    run_pipeline(&issues, &fetcher, summarizer.as_ref(), &config, cancel).await
}
