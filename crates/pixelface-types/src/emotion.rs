use std::fmt;
use std::str::FromStr;

/// The discrete mood/activity tag that drives the face.
///
/// Serialized in upper case (`"NEUTRAL"`, `"TALKING"`, ...) to match the
/// `emotion_update` data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmotionState {
    #[default]
    Neutral,
    Happy,
    Sad,
    Confused,
    Thinking,
    Listening,
    Talking,
}

impl EmotionState {
    /// Every state, in debug-console order.
    pub const ALL: [EmotionState; 7] = [
        EmotionState::Neutral,
        EmotionState::Happy,
        EmotionState::Sad,
        EmotionState::Confused,
        EmotionState::Thinking,
        EmotionState::Listening,
        EmotionState::Talking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionState::Neutral => "NEUTRAL",
            EmotionState::Happy => "HAPPY",
            EmotionState::Sad => "SAD",
            EmotionState::Confused => "CONFUSED",
            EmotionState::Thinking => "THINKING",
            EmotionState::Listening => "LISTENING",
            EmotionState::Talking => "TALKING",
        }
    }

    /// Confused and thinking are one expression reached by two triggers.
    pub fn is_pensive(&self) -> bool {
        matches!(self, EmotionState::Confused | EmotionState::Thinking)
    }

    /// Returns true if `value` names a member of the closed set.
    pub fn is_valid(value: &str) -> bool {
        value.parse::<EmotionState>().is_ok()
    }
}

impl fmt::Display for EmotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEmotionError(pub String);

impl fmt::Display for ParseEmotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emotion state: {}", self.0)
    }
}

impl std::error::Error for ParseEmotionError {}

impl FromStr for EmotionState {
    type Err = ParseEmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEmotionError(s.to_string()))
    }
}
