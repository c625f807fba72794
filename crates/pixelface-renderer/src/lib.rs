//! Animated face for the voice agent.
//!
//! [`render`] is a pure mapping from an emotion plus the current
//! [`AnimationCue`] to a [`VisualTree`]. [`Face`] is one rendered instance: it
//! owns the cue and the timers that flip it (blinks, smiles, squeezes), and
//! re-seeds them whenever the emotion changes.

pub mod animation;
pub mod face;
pub mod render;
pub mod shapes;
pub mod timers;
pub mod visual;

pub use animation::{Easing, Repeat, Track, Transition};
pub use face::{AnimationCue, Face};
pub use render::render;
pub use shapes::{EyePair, EyeShape};
pub use visual::{Element, EyeElement, Side, VisualTree};
