//! Persisted transcript messages and their content parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Why an assistant message stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Cancelled,
    Error,
    PermissionDenied,
    Unknown,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Reasoning { text: String },
    Binary(BinaryContent),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
    Finish(Finish),
}

/// Binary attachment embedded in a user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinaryContent {
    pub path: String,
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// File attached to a user turn before it becomes a message part.
pub type Attachment = BinaryContent;

/// A tool call requested by the model.
///
/// `input` holds the raw JSON text streamed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub finished: bool,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: input.into(),
            finished: false,
        }
    }
}

/// Outcome of one tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// An error result for a call.
    pub fn error(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            metadata: None,
            is_error: true,
        }
    }
}

/// Terminal marker of an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finish {
    pub reason: FinishReason,
    pub time: DateTime<Utc>,
}

/// A message persisted in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub parts: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Create an unsaved message with a fresh id.
    pub fn new(session_id: impl Into<String>, role: Role, parts: Vec<ContentPart>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            parts,
            model: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Concatenated visible text.
    pub fn content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Concatenated reasoning text.
    pub fn reasoning(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Reasoning { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn binary_parts(&self) -> Vec<&BinaryContent> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Binary(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(tr) => Some(tr.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finish_part(&self) -> Option<&Finish> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::Finish(f) => Some(f),
            _ => None,
        })
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_part().map(|f| f.reason)
    }

    pub fn is_finished(&self) -> bool {
        self.finish_part().is_some()
    }

    /// Append a visible-text delta, extending the trailing text part.
    pub fn append_content(&mut self, delta: &str) {
        for part in self.parts.iter_mut().rev() {
            if let ContentPart::Text { text } = part {
                text.push_str(delta);
                return;
            }
        }
        self.parts.push(ContentPart::Text {
            text: delta.to_string(),
        });
    }

    /// Append a reasoning delta to the trailing reasoning part, kept apart
    /// from visible text.
    pub fn append_reasoning(&mut self, delta: &str) {
        for part in self.parts.iter_mut().rev() {
            if let ContentPart::Reasoning { text } = part {
                text.push_str(delta);
                return;
            }
        }
        self.parts.push(ContentPart::Reasoning {
            text: delta.to_string(),
        });
    }

    /// Register a pending tool call. A call with a known id is replaced in place.
    pub fn add_tool_call(&mut self, call: ToolCall) {
        for part in self.parts.iter_mut() {
            if let ContentPart::ToolCall(existing) = part {
                if existing.id == call.id {
                    *existing = call;
                    return;
                }
            }
        }
        self.parts.push(ContentPart::ToolCall(call));
    }

    /// Mark a tool call's input as fully streamed. Returns false for unknown ids.
    pub fn finish_tool_call(&mut self, id: &str) -> bool {
        for part in self.parts.iter_mut() {
            if let ContentPart::ToolCall(existing) = part {
                if existing.id == id {
                    existing.finished = true;
                    return true;
                }
            }
        }
        false
    }

    /// Replace every tool-call part with the final list from the backend.
    pub fn set_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.parts
            .retain(|part| !matches!(part, ContentPart::ToolCall(_)));
        for mut call in calls {
            call.finished = true;
            self.parts.push(ContentPart::ToolCall(call));
        }
    }

    pub fn add_binary(&mut self, binary: BinaryContent) {
        self.parts.push(ContentPart::Binary(binary));
    }

    /// Set the finish marker, replacing any earlier one.
    pub fn add_finish(&mut self, reason: FinishReason) {
        self.parts
            .retain(|part| !matches!(part, ContentPart::Finish(_)));
        self.parts.push(ContentPart::Finish(Finish {
            reason,
            time: Utc::now(),
        }));
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
