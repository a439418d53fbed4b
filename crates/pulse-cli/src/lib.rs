//! Command-line front end for pulse.
mod app;
mod bootstrap_helpers;
mod cli_args;

pub use app::{
    build_summarizer, collect_references, github_client_config, openai_config,
    parse_reference_lines, run,
};
pub use bootstrap_helpers::init_tracing;
pub use cli_args::Cli;
