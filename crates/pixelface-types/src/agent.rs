/// Participant attribute carrying the agent's processing phase.
pub const AGENT_STATE_ATTRIBUTE: &str = "lk.agent.state";

/// The remote agent's self-reported phase, distinct from [`crate::EmotionState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentSubState {
    Initializing,
    Listening,
    Thinking,
    Speaking,
    /// Any value the provider reports that we do not recognise.
    Other(String),
}

impl AgentSubState {
    pub fn parse(value: &str) -> Self {
        match value {
            "initializing" => AgentSubState::Initializing,
            "listening" => AgentSubState::Listening,
            "thinking" => AgentSubState::Thinking,
            "speaking" => AgentSubState::Speaking,
            other => AgentSubState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentSubState::Initializing => "initializing",
            AgentSubState::Listening => "listening",
            AgentSubState::Thinking => "thinking",
            AgentSubState::Speaking => "speaking",
            AgentSubState::Other(value) => value,
        }
    }
}
