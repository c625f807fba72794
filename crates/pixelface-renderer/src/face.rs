use crate::render::render;
use crate::timers::TimerArena;
use crate::visual::VisualTree;
use pixelface_types::{EmotionState, RandomSource};
use std::time::Duration;

/// Per-frame flags layered on top of the base expression. Owned by [`Face`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AnimationCue {
    pub blink: bool,
    pub eye_smile: bool,
    pub squeeze: bool,
}

/// Blink timing for one state, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkProfile {
    pub interval: (f32, f32),
    pub closed: (f32, f32),
}

pub fn blink_profile(state: EmotionState) -> Option<BlinkProfile> {
    match state {
        EmotionState::Neutral => Some(BlinkProfile {
            interval: (2500.0, 4500.0),
            closed: (180.0, 220.0),
        }),
        EmotionState::Sad => Some(BlinkProfile {
            interval: (3000.0, 6000.0),
            closed: (200.0, 300.0),
        }),
        EmotionState::Talking => Some(BlinkProfile {
            interval: (2000.0, 4000.0),
            closed: (150.0, 300.0),
        }),
        EmotionState::Confused | EmotionState::Thinking => Some(BlinkProfile {
            interval: (3000.0, 5000.0),
            closed: (150.0, 250.0),
        }),
        EmotionState::Happy | EmotionState::Listening => None,
    }
}

pub fn blinks_in(state: EmotionState) -> bool {
    blink_profile(state).is_some()
}

const SMILE_ROLL_MS: f32 = 3000.0;
const SMILE_HOLD_MS: f32 = 800.0;
const SMILE_CHANCE: f32 = 0.3;
const SQUEEZE_GAP_MS: (f32, f32) = (3000.0, 4000.0);
const SQUEEZE_HOLD_MS: (f32, f32) = (500.0, 1000.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Effect {
    Blink,
    SmileHold,
    SmileRoll,
    Squeeze,
}

fn ms(value: f32) -> Duration {
    Duration::from_millis(value.max(0.0).round() as u64)
}

/// One rendered face: current emotion, its cue, and the timers that drive it.
///
/// Time is whatever the owner says it is: call [`Face::advance`] from a frame
/// tick. Every timer belongs to the arena, and the arena is emptied whenever the
/// emotion changes or the face is torn down.
pub struct Face<R: RandomSource> {
    emotion: EmotionState,
    cue: AnimationCue,
    timers: TimerArena<Effect>,
    rng: R,
    clock: Duration,
}

impl<R: RandomSource> Face<R> {
    pub fn new(rng: R) -> Self {
        let mut face = Self {
            emotion: EmotionState::Neutral,
            cue: AnimationCue::default(),
            timers: TimerArena::new(),
            rng,
            clock: Duration::ZERO,
        };
        face.arm();
        face
    }

    pub fn emotion(&self) -> EmotionState {
        self.emotion
    }

    pub fn cue(&self) -> AnimationCue {
        self.cue
    }

    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Switches expression. Returns false if `state` is already current, in
    /// which case running timers are left alone.
    pub fn set_emotion(&mut self, state: EmotionState) -> bool {
        if state == self.emotion {
            return false;
        }
        let cancelled = self.timers.clear();
        tracing::debug!(
            "face {} -> {} (cancelled {} timers)",
            self.emotion,
            state,
            cancelled
        );
        self.emotion = state;
        self.cue = AnimationCue::default();
        self.arm();
        true
    }

    pub fn advance(&mut self, dt: Duration) {
        self.advance_to(self.clock + dt);
    }

    /// Runs every timer due up to `now`, in deadline order.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((effect, at)) = self.timers.pop_due(now) {
            self.clock = at;
            self.fire(effect);
        }
        self.clock = self.clock.max(now);
    }

    pub fn render(&self) -> VisualTree {
        render(self.emotion, &self.cue)
    }

    /// Cancels every timer. Call on unmount.
    pub fn teardown(&mut self) {
        self.timers.clear();
        self.cue = AnimationCue::default();
    }

    fn arm(&mut self) {
        if let Some(profile) = blink_profile(self.emotion) {
            let wait = self.rng.range(profile.interval.0, profile.interval.1);
            self.timers.schedule(Effect::Blink, self.clock + ms(wait));
        }
        if self.emotion == EmotionState::Talking {
            self.timers
                .schedule(Effect::SmileRoll, self.clock + ms(SMILE_ROLL_MS));
            let wait = self.rng.range(SQUEEZE_GAP_MS.0, SQUEEZE_GAP_MS.1);
            self.timers.schedule(Effect::Squeeze, self.clock + ms(wait));
        }
    }

    fn fire(&mut self, effect: Effect) {
        let at = self.clock;
        match effect {
            Effect::Blink => {
                let Some(profile) = blink_profile(self.emotion) else {
                    return;
                };
                if self.cue.blink {
                    self.cue.blink = false;
                    let wait = self.rng.range(profile.interval.0, profile.interval.1);
                    self.timers.schedule(Effect::Blink, at + ms(wait));
                } else {
                    self.cue.blink = true;
                    let hold = self.rng.range(profile.closed.0, profile.closed.1);
                    self.timers.schedule(Effect::Blink, at + ms(hold));
                }
            }
            Effect::SmileRoll => {
                self.timers.schedule(Effect::SmileRoll, at + ms(SMILE_ROLL_MS));
                if self.rng.next_f32() >= 1.0 - SMILE_CHANCE {
                    self.cue.eye_smile = true;
                    self.timers.schedule(Effect::SmileHold, at + ms(SMILE_HOLD_MS));
                }
            }
            Effect::SmileHold => self.cue.eye_smile = false,
            Effect::Squeeze => {
                if self.cue.squeeze {
                    self.cue.squeeze = false;
                    let wait = self.rng.range(SQUEEZE_GAP_MS.0, SQUEEZE_GAP_MS.1);
                    self.timers.schedule(Effect::Squeeze, at + ms(wait));
                } else {
                    self.cue.squeeze = true;
                    let hold = self.rng.range(SQUEEZE_HOLD_MS.0, SQUEEZE_HOLD_MS.1);
                    self.timers.schedule(Effect::Squeeze, at + ms(hold));
                }
            }
        }
    }
}
