/// System turn for summarizing a single status update.
pub const SINGLE_SYSTEM_PROMPT: &str = "You condense engineering status updates. \
Rewrite the update you are given as one or two plain sentences describing progress, \
blockers and next steps. Do not invent facts, dates or owners. Reply with the summary text only.";

/// System turn for condensing several updates that belong to one issue.
pub const MULTI_UPDATE_SYSTEM_PROMPT: &str = "You condense engineering status updates. \
You are given several updates for the same issue, newest first. Write one or two plain \
sentences describing the current state, weighting the newest update most heavily and \
mentioning earlier updates only where they explain the current state. Do not invent facts. \
Reply with the summary text only.";

/// System turn for batch mode; the reply must be one JSON object keyed by issue id.
pub const BATCH_SYSTEM_PROMPT: &str = "You condense engineering status updates for many issues at once. \
The user message is a JSON array. Each element has an \"id\", a \"title\", an \"updates\" array \
(newest first) and the \"reported_status\" chosen by a human.\n\
For every element write a summary of one or two plain sentences describing progress, blockers \
and next steps, weighting the newest update most heavily. Do not invent facts.\n\
Also compare the reported status with the substance of the updates. If they clearly disagree \
(for example the status says on track but the updates describe a blocker), suggest a better \
status from: on_track, at_risk, off_track, complete, not_started, and explain why in one sentence.\n\
Respond with exactly one JSON object and nothing else. Its keys are the \"id\" values, unchanged. \
Each value is an object {\"summary\": string, \"sentiment\": null | {\"status\": string, \"explanation\": string}}. \
Use null for sentiment when the reported status matches the updates.";
