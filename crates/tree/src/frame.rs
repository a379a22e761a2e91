use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// One complete set of pixel colors in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    pixels: Vec<Rgb>,
}

impl Frame {
    pub fn new(pixels: Vec<Rgb>) -> Self {
        Self { pixels }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<Rgb> {
        self.pixels.get(id).copied()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Rgb> {
        self.pixels
    }
}

/// A manually drawn frame; `None` slots keep the pixel's current color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFrame {
    slots: Vec<Option<Rgb>>,
}

impl RawFrame {
    pub fn new(slots: Vec<Option<Rgb>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<Rgb>] {
        &self.slots
    }

    /// `(id, color)` for every slot that carries a color.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, Rgb)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.map(|color| (id, color)))
    }
}

impl From<Frame> for RawFrame {
    fn from(frame: Frame) -> Self {
        Self::new(frame.into_pixels().into_iter().map(Some).collect())
    }
}
