use std::collections::BTreeMap;

use pulse_core::{BatchResult, BatchResults, SentimentAssessment};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Shape a batch response was recognised as.
pub enum BatchResponseFormat {
    NestedJson,
    FlatJson,
    MarkdownSections,
}

impl BatchResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NestedJson => "nested_json",
            Self::FlatJson => "flat_json",
            Self::MarkdownSections => "markdown_sections",
        }
    }
}

/// A tier parser: response content and the batch's known ids in, entries out.
/// `None` means the tier extracted nothing.
pub type ResponseParser = fn(&str, &[&str]) -> Option<BatchResults>;

/// Tier order is part of the contract: each later tier accepts more and risks more false positives.
pub const RESPONSE_PARSERS: [(BatchResponseFormat, ResponseParser); 3] = [
    (BatchResponseFormat::NestedJson, parse_nested_json),
    (BatchResponseFormat::FlatJson, parse_flat_json),
    (BatchResponseFormat::MarkdownSections, parse_markdown_sections),
];

/// Runs the tiers in order and returns the first that extracted at least one entry.
pub fn parse_batch_response(
    content: &str,
    known_ids: &[&str],
) -> Option<(BatchResponseFormat, BatchResults)> {
    RESPONSE_PARSERS.iter().find_map(|(format, parser)| {
        parser(content, known_ids).map(|results| (*format, results))
    })
}

#[derive(Debug, Deserialize)]
struct NestedEntry {
    summary: String,
    #[serde(default)]
    sentiment: Option<NestedSentiment>,
}

#[derive(Debug, Deserialize)]
struct NestedSentiment {
    #[serde(default)]
    status: String,
    #[serde(default)]
    explanation: String,
}

/// Tier 1: `{"<id>": {"summary": "...", "sentiment": null | {"status", "explanation"}}}`.
pub fn parse_nested_json(content: &str, known_ids: &[&str]) -> Option<BatchResults> {
    let entries = decode_json_object::<NestedEntry>(content)?;
    let results = entries
        .into_iter()
        .filter_map(|(id, entry)| {
            let id = known_id(&id, known_ids)?;
            let summary = non_empty(&entry.summary)?;
            let sentiment = entry.sentiment.and_then(|sentiment| {
                let suggested_status = non_empty(&sentiment.status)?;
                Some(SentimentAssessment {
                    suggested_status,
                    explanation: sentiment.explanation.trim().to_string(),
                })
            });
            Some((id, BatchResult { summary, sentiment }))
        })
        .collect::<BatchResults>();
    (!results.is_empty()).then_some(results)
}

/// Tier 2: `{"<id>": "summary"}`; never carries sentiment.
pub fn parse_flat_json(content: &str, known_ids: &[&str]) -> Option<BatchResults> {
    let entries = decode_json_object::<String>(content)?;
    let results = entries
        .into_iter()
        .filter_map(|(id, summary)| {
            let id = known_id(&id, known_ids)?;
            Some((id, BatchResult::plain(non_empty(&summary)?)))
        })
        .collect::<BatchResults>();
    (!results.is_empty()).then_some(results)
}

/// Tier 3: `## SUMMARY <id or fragment>` sections, only when the payload is not JSON at all.
///
/// A header matches the longest known id it contains. Failing that, it matches
/// the single known id that ends with the header text. Unmatched `## SUMMARY`
/// sections are dropped, while other unmatched `## Summary ...` lines are kept
/// as body text. The first non-empty section per id wins.
pub fn parse_markdown_sections(content: &str, known_ids: &[&str]) -> Option<BatchResults> {
    if serde_json::from_str::<serde_json::Value>(strip_code_fence(content)).is_ok() {
        return None;
    }

    let mut results = BatchResults::new();
    let mut current: Option<(Option<&str>, Vec<&str>)> = None;
    for line in content.lines() {
        if let Some((explicit, header)) = summary_header(line) {
            let matched = match_section_header(header, known_ids);
            // An unmatched "## Summary of ..." sub-heading stays in the open section.
            if matched.is_some() || explicit || current.is_none() {
                if let Some((id, body)) = current.take() {
                    push_section(&mut results, id, &body);
                }
                current = Some((matched, Vec::new()));
                continue;
            }
        }
        if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((id, body)) = current.take() {
        push_section(&mut results, id, &body);
    }
    (!results.is_empty()).then_some(results)
}

/// Removes a surrounding Markdown code fence such as ```` ```json ... ``` ````.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return trimmed,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn decode_json_object<T>(content: &str) -> Option<BTreeMap<String, T>>
where
    T: for<'de> Deserialize<'de>,
{
    let candidate = strip_code_fence(content);
    if let Ok(entries) = serde_json::from_str(candidate) {
        return Some(entries);
    }
    // Tolerate prose around the object.
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&candidate[start..=end]).ok()
}

fn known_id(id: &str, known_ids: &[&str]) -> Option<String> {
    let id = id.trim();
    known_ids
        .iter()
        .find(|known| **known == id)
        .map(|known| (*known).to_string())
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Splits a `## summary <text>` line into (uppercase `SUMMARY` token, header text).
fn summary_header(line: &str) -> Option<(bool, &str)> {
    let rest = line.trim_start().strip_prefix("##")?.trim_start();
    let keyword = rest.get(..7)?;
    if !keyword.eq_ignore_ascii_case("summary") {
        return None;
    }
    let header = &rest[7..];
    if header.starts_with(|ch: char| ch.is_alphanumeric()) {
        return None;
    }
    Some((keyword == "SUMMARY", header.trim()))
}

fn match_section_header<'a>(header: &str, known_ids: &[&'a str]) -> Option<&'a str> {
    let contained = known_ids
        .iter()
        .copied()
        .filter(|id| !id.is_empty() && header.contains(id))
        .max_by_key(|id| id.len());
    if contained.is_some() {
        return contained;
    }

    let fragment =
        header.trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, ':' | '-' | '#' | '*'));
    if fragment.is_empty() {
        return None;
    }
    let mut suffix_matches = known_ids.iter().copied().filter(|id| id.ends_with(fragment));
    match (suffix_matches.next(), suffix_matches.next()) {
        (Some(id), None) => Some(id),
        _ => None,
    }
}

fn push_section(results: &mut BatchResults, id: Option<&str>, body: &[&str]) {
    let Some(id) = id else {
        return;
    };
    if results.contains_key(id) {
        return;
    }
    if let Some(summary) = non_empty(&body.join("\n")) {
        results.insert(id.to_string(), BatchResult::plain(summary));
    }
}
