use crate::EmotionState;

/// Inbound structured message carried on the room's data channel.
///
/// The envelope is a JSON object discriminated by `type`. Anything that does not
/// decode into one of these variants is a protocol error for the caller to drop.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum DataMessage {
    #[serde(rename = "emotion_update")]
    EmotionUpdate { emotion: EmotionState },
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallEvent),
}

impl DataMessage {
    /// Decodes a raw UTF-8 JSON payload.
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Name of the UI action a tool call requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolName {
    ShowMap,
    CheckIn,
    Other(String),
}

impl From<String> for ToolName {
    fn from(value: String) -> Self {
        match value.as_str() {
            "show_map" => ToolName::ShowMap,
            "check_in" => ToolName::CheckIn,
            _ => ToolName::Other(value),
        }
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        match value {
            ToolName::ShowMap => "show_map".to_string(),
            ToolName::CheckIn => "check_in".to_string(),
            ToolName::Other(name) => name,
        }
    }
}

/// `tool_call` payload
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallEvent {
    tool: ToolName,

    /// Sender-side clock reading, opaque to us
    #[serde(default)]
    timestamp: f64,

    /// Pre-fill for the check-in form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl ToolCallEvent {
    pub fn new(tool: ToolName, timestamp: f64) -> Self {
        Self {
            tool,
            timestamp,
            name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn tool(&self) -> &ToolName {
        &self.tool
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
