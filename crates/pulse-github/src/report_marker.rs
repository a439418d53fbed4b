//! Marker protocol for status reports embedded in comment bodies.
//!
//! A report comment carries `<!-- data key="isReport" value="true" -->` and
//! any number of `<!-- data key="<name>" start --> ... <!-- data end -->`
//! blocks. Matching is case-insensitive and whitespace-tolerant.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use pulse_core::Report;
use regex::Regex;

const KEY_TRENDING: &str = "trending";
const KEY_TARGET_DATE: &str = "target_date";
const KEY_UPDATE: &str = "update";

fn report_marker_regex() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| {
            Regex::new(r#"(?i)<!--\s*data\s+key\s*=\s*"isReport"\s+value\s*=\s*"true"\s*-->"#)
                .ok()
        })
        .as_ref()
}

fn data_block_regex() -> Option<&'static Regex> {
    static BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    BLOCK
        .get_or_init(|| {
            Regex::new(
                r#"(?is)<!--\s*data\s+key\s*=\s*"([^"]*)"\s+start\s*-->(.*?)<!--\s*data\s+end\s*-->"#,
            )
            .ok()
        })
        .as_ref()
}

/// Recovers a [`Report`] from a comment body.
///
/// Returns `None` when the body lacks the report marker or when no recognised
/// block (`trending`, `target_date`, `update`) holds non-whitespace text.
/// Unknown keys are ignored; for a repeated key the first non-empty block wins.
pub fn parse_report(body: &str, created_at: DateTime<Utc>, source_url: &str) -> Option<Report> {
    let (marker, block) = (report_marker_regex()?, data_block_regex()?);
    if !marker.is_match(body) {
        return None;
    }

    let mut status_text = None;
    let mut target_date_text = None;
    let mut update_text = None;
    for captures in block.captures_iter(body) {
        let (Some(key), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let value = value.as_str().trim();
        if value.is_empty() {
            continue;
        }
        let slot = match key.as_str().trim().to_ascii_lowercase().as_str() {
            KEY_TRENDING => &mut status_text,
            KEY_TARGET_DATE => &mut target_date_text,
            KEY_UPDATE => &mut update_text,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    if status_text.is_none() && target_date_text.is_none() && update_text.is_none() {
        return None;
    }
    Some(Report {
        status_text,
        target_date_text,
        update_text,
        created_at,
        source_url: source_url.to_string(),
    })
}
