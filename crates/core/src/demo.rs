use crate::mapper::SharedMapper;
use pixelface_types::EmotionState;
use std::time::Duration;

/// Steps of the demo loop and how long each is shown.
pub const DEMO_SEQUENCE: [(EmotionState, Duration); 4] = [
    (EmotionState::Talking, Duration::from_secs(3)),
    (EmotionState::Listening, Duration::from_secs(2)),
    (EmotionState::Happy, Duration::from_secs(3)),
    (EmotionState::Neutral, Duration::from_secs(1)),
];

/// Cycles the face through [`DEMO_SEQUENCE`] until the task is aborted.
pub async fn run_demo(mapper: SharedMapper) {
    tracing::info!("demo loop started");
    loop {
        for (state, hold) in DEMO_SEQUENCE {
            match mapper.lock() {
                Ok(mut guard) => guard.set_emotion(state),
                Err(e) => {
                    tracing::error!("mapper lock poisoned, stopping demo: {}", e);
                    return;
                }
            }
            tokio::time::sleep(hold).await;
        }
    }
}
