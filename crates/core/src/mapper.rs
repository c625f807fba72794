use crate::dispatcher::ToolCallDispatcher;
use pixelface_types::{
    AGENT_STATE_ATTRIBUTE, AgentSubState, DataMessage, EmotionState, RandomSource,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type SharedMapper = Arc<Mutex<StateMapper>>;

/// Turns live session signals into [`EmotionState`] transitions.
///
/// Precedence, highest first:
/// 1. a held override from the debug console ([`StateMapper::hold`]);
/// 2. live signals, applied in arrival order. Direct `emotion_update` messages
///    and the agent's sub-state both write here; the sub-state is
///    edge-triggered, so a direct update stays in effect until the agent
///    actually changes phase.
///
/// One-shot manual writes ([`StateMapper::set_emotion`]) land immediately and
/// are simply the newest write.
pub struct StateMapper {
    emotion_tx: tokio::sync::watch::Sender<EmotionState>,
    live: EmotionState,
    held: Option<EmotionState>,
    agent_state: Option<AgentSubState>,
    rng: Box<dyn RandomSource>,
    dispatcher: ToolCallDispatcher,
}

impl StateMapper {
    pub fn new(rng: impl RandomSource + 'static, dispatcher: ToolCallDispatcher) -> Self {
        let (emotion_tx, _) = tokio::sync::watch::channel(EmotionState::Neutral);
        Self {
            emotion_tx,
            live: EmotionState::Neutral,
            held: None,
            agent_state: None,
            rng: Box::new(rng),
            dispatcher,
        }
    }

    pub fn shared(self) -> SharedMapper {
        Arc::new(Mutex::new(self))
    }

    /// Receiver that always holds the current emotion.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<EmotionState> {
        self.emotion_tx.subscribe()
    }

    pub fn emotion(&self) -> EmotionState {
        *self.emotion_tx.borrow()
    }

    pub fn agent_state(&self) -> Option<&AgentSubState> {
        self.agent_state.as_ref()
    }

    pub fn held(&self) -> Option<EmotionState> {
        self.held
    }

    pub fn dispatcher(&self) -> &ToolCallDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut ToolCallDispatcher {
        &mut self.dispatcher
    }

    /// Handles one raw data-channel payload. Malformed payloads are dropped.
    pub fn on_data(&mut self, payload: &[u8]) {
        match DataMessage::decode(payload) {
            Ok(DataMessage::EmotionUpdate { emotion }) => {
                tracing::debug!("emotion update received: {}", emotion);
                self.apply(emotion);
            }
            Ok(DataMessage::ToolCall(event)) => {
                tracing::debug!("tool call received: {:?}", event.tool());
                self.dispatcher.dispatch(&event);
            }
            Err(e) => {
                tracing::warn!(
                    "dropping malformed data message: {}, payload=> {:?}",
                    e,
                    String::from_utf8_lossy(payload)
                );
            }
        }
    }

    /// Reads the agent's sub-state attribute and transitions only when it
    /// differs from the last one seen.
    pub fn on_agent_attributes(&mut self, attributes: &HashMap<String, String>) {
        let Some(raw) = attributes.get(AGENT_STATE_ATTRIBUTE) else {
            return;
        };
        let sub_state = AgentSubState::parse(raw);
        if self.agent_state.as_ref() == Some(&sub_state) {
            return;
        }

        let emotion = self.map_sub_state(&sub_state);
        tracing::info!("agent state: {} -> emotion: {}", sub_state.as_str(), emotion);
        self.agent_state = Some(sub_state);
        self.apply(emotion);
    }

    /// The agent left: forget its sub-state and go back to neutral.
    pub fn on_agent_disconnected(&mut self) {
        self.agent_state = None;
        self.apply(EmotionState::Neutral);
    }

    /// Manual write from a developer control. Never queued.
    pub fn set_emotion(&mut self, state: EmotionState) {
        if self.held.is_some() {
            self.held = Some(state);
        }
        self.live = state;
        self.publish(state);
    }

    /// Pins the face to `state`, or releases the pin with `None` and returns to
    /// the latest live state.
    pub fn hold(&mut self, state: Option<EmotionState>) {
        self.held = state;
        self.publish(state.unwrap_or(self.live));
    }

    fn map_sub_state(&mut self, sub_state: &AgentSubState) -> EmotionState {
        match sub_state {
            AgentSubState::Initializing => EmotionState::Neutral,
            AgentSubState::Listening => EmotionState::Listening,
            AgentSubState::Thinking => EmotionState::Thinking,
            AgentSubState::Speaking => {
                if self.rng.chance(0.5) {
                    EmotionState::Talking
                } else {
                    EmotionState::Happy
                }
            }
            AgentSubState::Other(_) => EmotionState::Neutral,
        }
    }

    fn apply(&mut self, state: EmotionState) {
        self.live = state;
        if let Some(held) = self.held {
            tracing::debug!("holding {}, live state is now {}", held, state);
            return;
        }
        self.publish(state);
    }

    fn publish(&self, state: EmotionState) {
        let previous = self.emotion_tx.send_replace(state);
        if previous != state {
            tracing::info!("emotion {} -> {}", previous, state);
        }
    }
}
