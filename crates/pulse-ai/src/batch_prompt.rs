use pulse_core::BatchItem;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Wire shape of one item inside the batch user turn.
pub struct BatchPromptItem<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub updates: &'a [String],
    pub reported_status: &'a str,
}

impl<'a> From<&'a BatchItem> for BatchPromptItem<'a> {
    fn from(item: &'a BatchItem) -> Self {
        Self {
            id: &item.issue_url,
            title: &item.issue_title,
            updates: &item.updates,
            reported_status: &item.reported_status,
        }
    }
}

/// Serializes the items into the batch user turn, preserving their order.
pub fn build_batch_user_prompt(items: &[BatchItem]) -> Result<String, serde_json::Error> {
    let payload = items.iter().map(BatchPromptItem::from).collect::<Vec<_>>();
    let json = serde_json::to_string_pretty(&payload)?;
    Ok(format!(
        "Summarize each of the following {} issues. Key your JSON reply by the \"id\" values.\n\n{json}",
        items.len()
    ))
}

/// Splits items into ordered chunks of at most `max_items` (treated as 1 when 0).
pub fn chunk_batch_items(items: &[BatchItem], max_items: usize) -> Vec<&[BatchItem]> {
    items.chunks(max_items.max(1)).collect()
}
