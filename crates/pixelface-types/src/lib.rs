pub mod agent;
pub mod emotion;
pub mod events;
pub mod random;

pub use agent::{AGENT_STATE_ATTRIBUTE, AgentSubState};
pub use emotion::{EmotionState, ParseEmotionError};
pub use events::{DataMessage, ToolCallEvent, ToolName};
pub use random::{RandomSource, SequenceRandom, ThreadRandom};
