use crate::animation::{Track, Transition};
use crate::shapes::EyeShape;
use pixelface_types::EmotionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One eye: the shape it morphs toward and the motion layered on top.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EyeElement {
    pub side: Side,
    pub shape: EyeShape,
    /// How `shape` is reached from whatever was drawn before
    pub morph: Transition,
    pub origin: (f32, f32),
    pub x: Track,
    pub y: Track,
    pub scale_x: Track,
    pub scale_y: Track,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BrowElement {
    pub side: Side,
    pub path: &'static str,
    pub y: Track,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndicatorDot {
    pub index: usize,
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    pub opacity: Track,
    pub scale: Track,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
    Eye(EyeElement),
    Brow(BrowElement),
    Dot(IndicatorDot),
}

/// Everything needed to draw one frame of the face.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VisualTree {
    pub emotion: EmotionState,
    /// Scale of the whole face
    pub container: Track,
    /// Vertical drift of the eye group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bob: Option<Track>,
    pub elements: Vec<Element>,
}

impl VisualTree {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn eyes(&self) -> impl Iterator<Item = &EyeElement> {
        self.elements.iter().filter_map(|element| match element {
            Element::Eye(eye) => Some(eye),
            _ => None,
        })
    }

    pub fn eye(&self, side: Side) -> Option<&EyeElement> {
        self.eyes().find(|eye| eye.side == side)
    }

    pub fn brows(&self) -> impl Iterator<Item = &BrowElement> {
        self.elements.iter().filter_map(|element| match element {
            Element::Brow(brow) => Some(brow),
            _ => None,
        })
    }

    pub fn dots(&self) -> impl Iterator<Item = &IndicatorDot> {
        self.elements.iter().filter_map(|element| match element {
            Element::Dot(dot) => Some(dot),
            _ => None,
        })
    }
}
