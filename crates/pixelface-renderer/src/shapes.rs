//! Shape tables, in the face's 300x300 viewbox.

use pixelface_types::EmotionState;

/// SVG path for one eye plus the uniform scale it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EyeShape {
    pub path: &'static str,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EyePair {
    pub left: EyeShape,
    pub right: EyeShape,
}

/// Transform origins for the left and right eye.
pub const LEFT_EYE_ORIGIN: (f32, f32) = (100.0, 100.0);
pub const RIGHT_EYE_ORIGIN: (f32, f32) = (200.0, 100.0);

const NEUTRAL: EyePair = EyePair {
    left: EyeShape {
        path: "M 60,70 Q 60,50 80,50 L 120,50 Q 140,50 140,70 L 140,130 Q 140,150 120,150 L 80,150 Q 60,150 60,130 Z",
        scale: 1.0,
    },
    right: EyeShape {
        path: "M 160,70 Q 160,50 180,50 L 220,50 Q 240,50 240,70 L 240,130 Q 240,150 220,150 L 180,150 Q 160,150 160,130 Z",
        scale: 1.0,
    },
};

const HAPPY: EyePair = EyePair {
    left: EyeShape {
        path: "M 60,120 Q 100,70 140,120 L 140,130 Q 100,80 60,130 Z",
        scale: 1.05,
    },
    right: EyeShape {
        path: "M 160,120 Q 200,70 240,120 L 240,130 Q 200,80 160,130 Z",
        scale: 1.05,
    },
};

const SAD: EyePair = EyePair {
    left: EyeShape {
        path: "M 60,90 Q 60,70 80,70 L 120,70 Q 140,70 140,90 L 140,160 Q 140,180 120,180 L 80,180 Q 60,180 60,160 Z",
        scale: 1.0,
    },
    right: EyeShape {
        path: "M 160,90 Q 160,70 180,70 L 220,70 Q 240,70 240,90 L 240,160 Q 240,180 220,180 L 180,180 Q 160,180 160,160 Z",
        scale: 1.0,
    },
};

// The non-dominant (right) eye opens wider and taller than the left.
const PENSIVE: EyePair = EyePair {
    left: EyeShape {
        path: "M 55,75 Q 55,55 75,55 L 115,55 Q 135,55 135,75 L 135,125 Q 135,145 115,145 L 75,145 Q 55,145 55,125 Z",
        scale: 0.9,
    },
    right: EyeShape {
        path: "M 165,65 Q 165,45 190,45 L 235,45 Q 260,45 260,65 L 260,135 Q 260,155 235,155 L 190,155 Q 165,155 165,135 Z",
        scale: 1.15,
    },
};

const LISTENING: EyePair = EyePair {
    left: EyeShape {
        path: "M 60,70 L 120,70 L 120,150 L 60,150 Z",
        scale: 1.0,
    },
    right: EyeShape {
        path: "M 170,70 L 240,70 L 240,150 L 170,150 Z",
        scale: 1.0,
    },
};

const TALKING: EyePair = EyePair {
    left: EyeShape {
        path: "M 60,75 Q 60,55 80,55 L 120,55 Q 140,55 140,75 L 140,125 Q 140,145 120,145 L 80,145 Q 60,145 60,125 Z",
        scale: 1.0,
    },
    right: EyeShape {
        path: "M 160,75 Q 160,55 180,55 L 220,55 Q 240,55 240,75 L 240,125 Q 240,145 220,145 L 180,145 Q 160,145 160,125 Z",
        scale: 1.0,
    },
};

/// Base eye shapes for a state. Exhaustive: a new variant will not compile
/// until it has an entry here.
pub fn base_shapes(state: EmotionState) -> EyePair {
    match state {
        EmotionState::Neutral => NEUTRAL,
        EmotionState::Happy => HAPPY,
        EmotionState::Sad => SAD,
        EmotionState::Confused | EmotionState::Thinking => PENSIVE,
        EmotionState::Listening => LISTENING,
        EmotionState::Talking => TALKING,
    }
}

/// Raised brows shown while listening.
pub const LEFT_BROW: &str = "M 50,30 L 130,25 L 130,32 L 50,37 Z";
pub const RIGHT_BROW: &str = "M 170,25 L 250,20 L 250,27 L 170,32 Z";

/// Indicator dots, drawn up and to the right of the right eye: a small lead
/// dot near the brow followed by an ellipsis.
pub const INDICATOR_DOTS: [(f32, f32, f32); 4] = [
    (255.0, 45.0, 4.0),
    (268.0, 30.0, 5.0),
    (280.0, 30.0, 5.0),
    (292.0, 30.0, 5.0),
];
