/// Easing curve applied between keyframes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Maps linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    Once,
    Forever,
}

/// How a single target value is approached.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transition {
    Spring { stiffness: f32, damping: f32 },
    Tween { duration: f32, ease: Easing },
}

impl Transition {
    /// The damped spring every morph defaults to.
    pub const SPRING: Transition = Transition::Spring {
        stiffness: 150.0,
        damping: 18.0,
    };

    pub fn tween(duration: f32, ease: Easing) -> Self {
        Transition::Tween { duration, ease }
    }
}

/// A keyframed property animation.
///
/// `times` holds normalised offsets (0..=1) for each keyframe; when absent the
/// keyframes are spread evenly. Durations and delays are in seconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    keyframes: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    times: Option<Vec<f32>>,
    duration: f32,
    delay: f32,
    ease: Easing,
    repeat: Repeat,
}

impl Track {
    /// Loops through `keyframes` forever.
    pub fn looping(keyframes: Vec<f32>, duration: f32) -> Self {
        Self {
            keyframes,
            times: None,
            duration,
            delay: 0.0,
            ease: Easing::EaseInOut,
            repeat: Repeat::Forever,
        }
    }

    /// Moves to `value` once.
    pub fn to(value: f32, transition: Transition) -> Self {
        let (duration, ease) = match transition {
            Transition::Tween { duration, ease } => (duration, ease),
            // Springs settle in roughly half a second at these constants.
            Transition::Spring { .. } => (0.5, Easing::EaseOut),
        };
        Self {
            keyframes: vec![value],
            times: None,
            duration,
            delay: 0.0,
            ease,
            repeat: Repeat::Once,
        }
    }

    pub fn still(value: f32) -> Self {
        Self::to(value, Transition::tween(0.0, Easing::Linear))
    }

    pub fn with_times(mut self, times: Vec<f32>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_ease(mut self, ease: Easing) -> Self {
        self.ease = ease;
        self
    }

    pub fn keyframes(&self) -> &[f32] {
        &self.keyframes
    }

    pub fn times(&self) -> Option<&[f32]> {
        self.times.as_deref()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn ease(&self) -> Easing {
        self.ease
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    /// Final value once a one-shot track has settled.
    pub fn target(&self) -> f32 {
        self.keyframes.last().copied().unwrap_or(0.0)
    }

    fn offset(&self, index: usize) -> f32 {
        match &self.times {
            Some(times) => times.get(index).copied().unwrap_or(1.0),
            None if self.keyframes.len() > 1 => index as f32 / (self.keyframes.len() - 1) as f32,
            None => 1.0,
        }
    }

    /// Value of the track `elapsed` seconds after it started.
    ///
    /// One-shot tracks with a single keyframe report their target; the
    /// interpolation from the previous value belongs to whoever is displaying it.
    pub fn sample(&self, elapsed: f32) -> f32 {
        let Some(&first) = self.keyframes.first() else {
            return 0.0;
        };
        if self.keyframes.len() == 1 {
            return first;
        }

        let local = (elapsed - self.delay).max(0.0);
        let progress = if self.duration <= 0.0 {
            1.0
        } else {
            match self.repeat {
                Repeat::Forever => (local % self.duration) / self.duration,
                Repeat::Once => (local / self.duration).min(1.0),
            }
        };

        for index in 1..self.keyframes.len() {
            let start = self.offset(index - 1);
            let end = self.offset(index);
            if progress <= end {
                if end <= start {
                    return self.keyframes[index];
                }
                let t = self.ease.apply((progress - start) / (end - start));
                let from = self.keyframes[index - 1];
                let to = self.keyframes[index];
                return from + (to - from) * t;
            }
        }
        self.target()
    }
}
