//! Agent transcripts.
//!
//! Two agent frameworks write transcripts in different message shapes:
//!
//! - **scratch**: OpenAI-style chat messages. Assistant `content` is a string,
//!   tool calls live in `tool_calls[*].function.name`, tool results are
//!   separate `role: "tool"` messages.
//! - **strands**: Bedrock-style messages. `content` is a list of blocks, each
//!   carrying one of `text`, `toolUse` or `toolResult`.
//!
//! Messages are kept as raw JSON; the helpers here only read the fields they
//! need and ignore everything else.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Agent framework that produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Scratch,
    Strands,
}

impl Framework {
    pub const ALL: [Framework; 2] = [Framework::Scratch, Framework::Strands];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Scratch => "scratch",
            Framework::Strands => "strands",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown framework: {0} (expected scratch or strands)")]
pub struct UnknownFramework(pub String);

impl FromStr for Framework {
    type Err = UnknownFramework;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scratch" => Ok(Framework::Scratch),
            "strands" => Ok(Framework::Strands),
            other => Err(UnknownFramework(other.to_string())),
        }
    }
}

/// A transcript as written by an agent loop.
///
/// Older scratch runs wrote only the message array; newer writers wrap it with
/// run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptFile {
    // Bare goes first: a derived struct also accepts a JSON array, and an
    // empty one would otherwise land in Wrapped.
    Bare(Vec<JsonValue>),
    Wrapped(Transcript),
}

impl TranscriptFile {
    pub fn into_transcript(self) -> Transcript {
        match self {
            TranscriptFile::Wrapped(t) => t,
            TranscriptFile::Bare(messages) => Transcript {
                messages,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,

    /// The answer under test, if the writer recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,

    /// When the answer was produced (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_time_unix: Option<f64>,

    /// Where the writer took `final_text` from, if it said.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text_source: Option<String>,

    #[serde(default)]
    pub messages: Vec<JsonValue>,
}

impl Transcript {
    /// Recorded final answer, else the one derived from the messages.
    pub fn answer(&self, framework: Framework) -> String {
        match &self.final_text {
            Some(text) => text.clone(),
            None => derive_final_text(framework, &self.messages).unwrap_or_default(),
        }
    }

    /// Where [`answer`](Self::answer) comes from.
    ///
    /// The writer's own label wins. Otherwise `final_text` when the field is
    /// set, `messages` when the answer is derived, and `unknown` when there
    /// is nothing to derive it from.
    pub fn final_text_source(&self, framework: Framework) -> String {
        if let Some(source) = &self.final_text_source {
            return source.clone();
        }
        if self.final_text.is_some() {
            "final_text".to_string()
        } else if derive_final_text(framework, &self.messages).is_some() {
            "messages".to_string()
        } else {
            "unknown".to_string()
        }
    }
}

/// Whether any tool was used, and which.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    pub used: bool,
    /// Sorted and de-duplicated.
    pub names: Vec<String>,
}

/// Per-transcript counters used by the comparison summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMetrics {
    pub assistant_turns: usize,
    pub tool_calls: usize,
}

fn role(message: &JsonValue) -> Option<&str> {
    message.get("role").and_then(JsonValue::as_str)
}

fn blocks(message: &JsonValue) -> &[JsonValue] {
    message
        .get("content")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn scratch_tool_calls(message: &JsonValue) -> &[JsonValue] {
    message
        .get("tool_calls")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn sorted_unique<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    items.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Detect tool use in a transcript.
pub fn detect_tool_use(framework: Framework, messages: &[JsonValue]) -> ToolUse {
    let mut used = false;
    let mut names = Vec::new();

    match framework {
        Framework::Scratch => {
            for message in messages {
                match role(message) {
                    Some("tool") => {
                        used = true;
                        if let Some(name) = message.get("name").and_then(JsonValue::as_str) {
                            names.push(name.to_string());
                        }
                    }
                    Some("assistant") => {
                        let calls = scratch_tool_calls(message);
                        if !calls.is_empty() {
                            used = true;
                            names.extend(
                                calls
                                    .iter()
                                    .filter_map(|c| c.pointer("/function/name"))
                                    .filter_map(JsonValue::as_str)
                                    .map(str::to_string),
                            );
                        }
                        // Text-protocol agents emit the call as JSON inside the content.
                        if let Some(content) = message.get("content").and_then(JsonValue::as_str) {
                            if content.contains("tool_name") && content.contains("tool_arguments") {
                                used = true;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Framework::Strands => {
            for block in messages.iter().flat_map(blocks) {
                if let Some(tool_use) = block.get("toolUse") {
                    used = true;
                    if let Some(name) = tool_use.get("name").and_then(JsonValue::as_str) {
                        names.push(name.to_string());
                    }
                }
            }
        }
    }

    ToolUse {
        used,
        names: sorted_unique(names),
    }
}

/// Count assistant turns and tool calls.
pub fn transcript_metrics(framework: Framework, messages: &[JsonValue]) -> TranscriptMetrics {
    let mut metrics = TranscriptMetrics::default();
    for message in messages.iter().filter(|m| role(m) == Some("assistant")) {
        metrics.assistant_turns += 1;
        metrics.tool_calls += match framework {
            Framework::Scratch => scratch_tool_calls(message).len(),
            Framework::Strands => {
                blocks(message).iter().filter(|b| b.get("toolUse").is_some()).count()
            }
        };
    }
    metrics
}

/// Final answer text from the last assistant message.
///
/// Scratch uses the string content; strands joins the non-empty `text`
/// blocks with newlines. `None` if there is no usable assistant message.
pub fn derive_final_text(framework: Framework, messages: &[JsonValue]) -> Option<String> {
    let last = messages.iter().rev().find(|m| role(m) == Some("assistant"))?;
    match framework {
        Framework::Scratch => last.get("content").and_then(JsonValue::as_str).map(str::to_string),
        Framework::Strands => {
            let parts: Vec<&str> = blocks(last)
                .iter()
                .filter_map(|b| b.get("text").and_then(JsonValue::as_str))
                .filter(|t| !t.is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
    }
}

/// Raw tool output strings, in transcript order.
///
/// Structured strands `json` results are re-serialized so they can be scanned
/// as text.
pub fn tool_outputs(framework: Framework, messages: &[JsonValue]) -> Vec<String> {
    let mut outputs = Vec::new();
    match framework {
        Framework::Scratch => {
            for message in messages.iter().filter(|m| role(m) == Some("tool")) {
                match message.get("content") {
                    Some(JsonValue::String(s)) => outputs.push(s.clone()),
                    Some(JsonValue::Null) | None => {}
                    Some(other) => outputs.push(other.to_string()),
                }
            }
        }
        Framework::Strands => {
            for result in messages.iter().flat_map(blocks).filter_map(|b| b.get("toolResult")) {
                let items = result.get("content").and_then(JsonValue::as_array);
                for item in items.into_iter().flatten() {
                    if let Some(text) = item.get("text").and_then(JsonValue::as_str) {
                        outputs.push(text.to_string());
                    }
                    if let Some(json) = item.get("json") {
                        outputs.push(json.to_string());
                    }
                }
            }
        }
    }
    outputs
}
