//! Label → color lookup for physical regions and boundary groups.

use crate::color::{new_color, Color};

/// Full hue sweep shared between all labels of a table.
const HUE_SPAN_DEG: f32 = 359.0;

/// Labels per brightness step.
const LABELS_PER_VALUE_STEP: usize = 100;

/// Brightness lost past the first hundred labels. Applied once; larger
/// tables stay at this level instead of fading to black.
const VALUE_STEP: f32 = 0.25;

/// Unique labels in first-seen order, with one color each once generated.
///
/// Colors are a function of the whole table: every call to
/// [`LabelTable::generate_colors`] reassigns all of them from the current
/// label count, so it must run after the last [`LabelTable::add`] of a batch.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: Vec<i32>,
    colors: Vec<Color>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `label` if it has not been seen yet. Returns `true` when added.
    pub fn add(&mut self, label: i32) -> bool {
        if self.labels.contains(&label) {
            return false;
        }
        self.labels.push(label);
        true
    }

    /// Recomputes the color of every label from scratch.
    pub fn generate_colors(&mut self) {
        let count = self.labels.len();
        self.colors.clear();
        if count == 0 {
            return;
        }

        let step = HUE_SPAN_DEG / count as f32;
        self.colors.extend((0..count).map(|i| {
            let value = if i >= LABELS_PER_VALUE_STEP { 1.0 - VALUE_STEP } else { 1.0 };
            new_color(i as f32 * step, value, 1.0)
        }));
    }

    /// Color of `label`, or opaque black if the label is unknown or colors
    /// have not been generated since it was added.
    pub fn color(&self, label: i32) -> Color {
        self.labels
            .iter()
            .position(|&l| l == label)
            .and_then(|i| self.colors.get(i).copied())
            .unwrap_or(Color::BLACK)
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.colors.clear();
    }
}
