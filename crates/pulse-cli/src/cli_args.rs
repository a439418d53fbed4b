use std::path::PathBuf;

use clap::{ArgAction, Parser};
use pulse_ai::DEFAULT_MAX_BATCH_ITEMS;
use pulse_runtime::{DEFAULT_SINCE_DAYS, DEFAULT_WORKERS};
use pulse_transport::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    about = "Summarize recent status reports posted on GitHub issues",
    version
)]
pub struct Cli {
    #[arg(
        value_name = "ISSUE",
        help = "Issue references: https://github.com/{owner}/{repo}/issues/{n} or {owner}/{repo}#{n}"
    )]
    pub issues: Vec<String>,

    #[arg(
        long = "input-file",
        env = "PULSE_INPUT_FILE",
        help = "File with one issue reference per line ('-' reads stdin; '#' starts a comment)"
    )]
    pub input_file: Option<PathBuf>,

    #[arg(
        long = "since-days",
        env = "PULSE_SINCE_DAYS",
        default_value_t = DEFAULT_SINCE_DAYS,
        value_parser = parse_positive_u32,
        help = "Only reports posted within this many days are considered"
    )]
    pub since_days: u32,

    #[arg(
        long,
        env = "PULSE_WORKERS",
        default_value_t = DEFAULT_WORKERS,
        value_parser = parse_positive_usize,
        help = "Maximum number of issues fetched concurrently"
    )]
    pub workers: usize,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used for REST API calls"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "PULSE_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub REST API base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long = "ai-api-base",
        env = "PULSE_AI_API_BASE",
        default_value = "https://api.openai.com/v1",
        help = "Base URL for the OpenAI-compatible chat completion API"
    )]
    pub ai_api_base: String,

    #[arg(
        long = "ai-api-key",
        env = "PULSE_AI_API_KEY",
        hide_env_values = true,
        help = "API key for the chat completion API (falls back to OPENAI_API_KEY)"
    )]
    pub ai_api_key: Option<String>,

    #[arg(
        long = "ai-model",
        env = "PULSE_AI_MODEL",
        default_value = "gpt-4o-mini",
        help = "Chat completion model used for summaries"
    )]
    pub ai_model: String,

    #[arg(
        long = "no-ai",
        env = "PULSE_NO_AI",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Join update texts instead of calling the summarization backend"
    )]
    pub no_ai: bool,

    #[arg(
        long = "batch-size",
        env = "PULSE_BATCH_SIZE",
        default_value_t = DEFAULT_MAX_BATCH_ITEMS,
        value_parser = parse_positive_usize,
        help = "Maximum issues per summarization request"
    )]
    pub batch_size: usize,

    #[arg(
        long = "max-retries",
        env = "PULSE_MAX_RETRIES",
        default_value_t = DEFAULT_MAX_RETRIES,
        help = "Retries after the first attempt for transient HTTP failures"
    )]
    pub max_retries: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "PULSE_RETRY_BASE_DELAY_MS",
        default_value_t = DEFAULT_BASE_DELAY_MS,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential backoff between retries"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "PULSE_REQUEST_TIMEOUT_MS",
        value_parser = parse_positive_u64,
        help = "Per-request timeout for GitHub and AI calls (defaults: 30000 and 120000)"
    )]
    pub request_timeout_ms: Option<u64>,

    #[arg(
        long,
        short = 'v',
        env = "PULSE_VERBOSE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Log debug output to stderr"
    )]
    pub verbose: bool,
}
