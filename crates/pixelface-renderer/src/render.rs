use crate::animation::{Easing, Track, Transition};
use crate::face::{AnimationCue, blinks_in};
use crate::shapes::{
    self, EyePair, INDICATOR_DOTS, LEFT_BROW, LEFT_EYE_ORIGIN, RIGHT_BROW, RIGHT_EYE_ORIGIN,
};
use crate::visual::{BrowElement, Element, EyeElement, IndicatorDot, Side, VisualTree};
use pixelface_types::EmotionState;

/// Eyelid scale while a blink is closed.
pub const BLINK_SCALE_Y: f32 = 0.1;
pub const SQUEEZE_SCALE_Y: f32 = 0.65;
pub const SQUEEZE_SCALE_X: f32 = 1.18;
pub const SMILE_SCALE_X: f32 = 1.03;
/// Horizontal shift of each eye during a squeeze, away from the centre line.
pub const SQUEEZE_SHIFT_X: f32 = 8.0;

/// Length of one pass of the indicator sequence, in seconds.
pub const INDICATOR_CYCLE: f32 = 2.4;
/// Normalised offset between consecutive dots appearing.
pub const INDICATOR_STAGGER: f32 = 0.25;
const INDICATOR_FADE: f32 = 0.15;

const MORPH: Transition = Transition::Tween {
    duration: 0.4,
    ease: Easing::EaseInOut,
};

/// Builds the frame description for `state` under the current cue.
///
/// Total over every state; there is no fallback path because the shape table is
/// exhaustive.
pub fn render(state: EmotionState, cue: &AnimationCue) -> VisualTree {
    let talking = state == EmotionState::Talking;
    let smiling = talking && cue.eye_smile;
    let squeezing = talking && cue.squeeze;

    let pair: EyePair = if smiling {
        shapes::base_shapes(EmotionState::Happy)
    } else {
        shapes::base_shapes(state)
    };

    let scale_y = if blinks_in(state) && cue.blink {
        BLINK_SCALE_Y
    } else if squeezing {
        SQUEEZE_SCALE_Y
    } else {
        1.0
    };
    let scale_x = if squeezing {
        SQUEEZE_SCALE_X
    } else if smiling {
        SMILE_SCALE_X
    } else {
        1.0
    };
    let scale_y = Track::to(scale_y, Transition::tween(0.15, Easing::EaseInOut));
    let scale_x = Track::to(scale_x, Transition::tween(0.4, Easing::EaseInOut));

    let mut elements = Vec::new();

    if state == EmotionState::Listening {
        elements.push(Element::Brow(BrowElement {
            side: Side::Left,
            path: LEFT_BROW,
            y: Track::looping(vec![0.0, -0.5, 0.0, 0.5, 0.0], 3.0),
        }));
        elements.push(Element::Brow(BrowElement {
            side: Side::Right,
            path: RIGHT_BROW,
            y: Track::looping(vec![0.0, 0.5, 0.0, -0.5, 0.0], 3.0).with_delay(0.4),
        }));
    }

    let (left_x, left_y, right_x, right_y) = eye_drift(talking, squeezing);

    elements.push(Element::Eye(EyeElement {
        side: Side::Left,
        shape: pair.left,
        morph: MORPH,
        origin: LEFT_EYE_ORIGIN,
        x: left_x,
        y: left_y,
        scale_x: scale_x.clone(),
        scale_y: scale_y.clone(),
    }));
    elements.push(Element::Eye(EyeElement {
        side: Side::Right,
        shape: pair.right,
        morph: MORPH,
        origin: RIGHT_EYE_ORIGIN,
        x: right_x,
        y: right_y,
        scale_x,
        scale_y,
    }));

    if state == EmotionState::Listening {
        elements.extend(indicator_dots().into_iter().map(Element::Dot));
    }

    let container = match state {
        EmotionState::Listening => Track::looping(vec![1.0, 1.05, 1.0], 3.5),
        _ => Track::to(1.0, Transition::SPRING),
    };
    let bob = match state {
        EmotionState::Listening => Some(Track::looping(vec![-3.0, 3.0, -3.0], 2.0)),
        EmotionState::Happy => Some(Track::looping(vec![-2.0, 2.0, -2.0], 2.5)),
        _ => None,
    };

    VisualTree {
        emotion: state,
        container,
        bob,
        elements,
    }
}

/// Idle drift for (left x, left y, right x, right y). The two eyes run at
/// different periods and delays so they never move in lockstep.
fn eye_drift(talking: bool, squeezing: bool) -> (Track, Track, Track, Track) {
    if squeezing {
        let shift = Transition::tween(0.2, Easing::EaseInOut);
        return (
            Track::to(-SQUEEZE_SHIFT_X, shift),
            Track::to(0.0, Transition::SPRING),
            Track::to(SQUEEZE_SHIFT_X, shift),
            Track::to(0.0, Transition::SPRING),
        );
    }
    if talking {
        return (
            Track::looping(vec![-1.0, 1.0, -1.0], 2.8).with_delay(0.5),
            Track::looping(vec![-1.5, 1.5, -1.5], 2.2),
            Track::looping(vec![1.0, -1.0, 1.0], 3.2).with_delay(0.8),
            Track::looping(vec![-1.0, 2.0, -1.0], 2.5).with_delay(0.3),
        );
    }
    (
        Track::looping(vec![-0.5, 0.5, -0.5], 4.0).with_delay(0.5),
        Track::looping(vec![-1.0, 1.0, -1.0], 3.0),
        Track::looping(vec![0.5, -0.5, 0.5], 3.8).with_delay(0.8),
        Track::looping(vec![-0.5, 1.5, -0.5], 3.2).with_delay(0.3),
    )
}

/// Dots that appear one by one, hold, then all reset together each cycle.
fn indicator_dots() -> Vec<IndicatorDot> {
    INDICATOR_DOTS
        .iter()
        .enumerate()
        .map(|(index, &(cx, cy, r))| {
            let start = index as f32 * INDICATOR_STAGGER;
            let shown = start + INDICATOR_FADE;
            let settled = (shown + 0.1).min(1.0);

            let (opacity, opacity_times, scale, scale_times) = if start == 0.0 {
                (
                    vec![0.0, 1.0, 1.0],
                    vec![0.0, shown, 1.0],
                    vec![0.0, 1.2, 1.0, 1.0],
                    vec![0.0, shown, settled, 1.0],
                )
            } else {
                (
                    vec![0.0, 0.0, 1.0, 1.0],
                    vec![0.0, start, shown, 1.0],
                    vec![0.0, 0.0, 1.2, 1.0, 1.0],
                    vec![0.0, start, shown, settled, 1.0],
                )
            };

            IndicatorDot {
                index,
                cx,
                cy,
                r,
                opacity: Track::looping(opacity, INDICATOR_CYCLE)
                    .with_times(opacity_times)
                    .with_ease(Easing::EaseOut),
                scale: Track::looping(scale, INDICATOR_CYCLE)
                    .with_times(scale_times)
                    .with_ease(Easing::EaseOut),
            }
        })
        .collect()
}
