// Viewport geometry for the two side-by-side eyes.
// Visual: `size` scales both squares with the window width, `spacing` moves
// them apart symmetrically, `offset` slides the whole pair left or right.

use serde::{Deserialize, Serialize};

pub const SIZE_RANGE: (f64, f64) = (0.1, 0.5);
pub const SPACING_RANGE: (f64, f64) = (0.25, 0.75);
pub const OFFSET_RANGE: (f64, f64) = (-0.25, 0.25);

/// Slider resolution of the control panel.
pub const RATIO_STEP: f64 = 0.05;

/// The three display ratios, all relative to the canvas width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ratios {
    pub size: f64,
    pub spacing: f64,
    pub offset: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatioKind {
    Size,
    Spacing,
    Offset,
}

impl Default for Ratios {
    fn default() -> Self {
        Self { size: 0.3, spacing: 0.5, offset: 0.0 }
    }
}

impl Ratios {
    pub fn new(size: f64, spacing: f64, offset: f64) -> Self {
        Self { size, spacing, offset }.clamped()
    }

    /// Copy with every ratio forced into its declared range.
    /// NaN falls back to the default value for that ratio.
    pub fn clamped(self) -> Self {
        let d = Ratios::default();
        Self {
            size: clamp_or(self.size, SIZE_RANGE, d.size),
            spacing: clamp_or(self.spacing, SPACING_RANGE, d.spacing),
            offset: clamp_or(self.offset, OFFSET_RANGE, d.offset),
        }
    }

    pub fn set(&mut self, kind: RatioKind, value: f64) {
        match kind {
            RatioKind::Size => self.size = value,
            RatioKind::Spacing => self.spacing = value,
            RatioKind::Offset => self.offset = value,
        }
        *self = self.clamped();
    }

    pub fn get(&self, kind: RatioKind) -> f64 {
        match kind {
            RatioKind::Size => self.size,
            RatioKind::Spacing => self.spacing,
            RatioKind::Offset => self.offset,
        }
    }

    /// Move one ratio by `steps` slider steps, snapping to the step grid.
    pub fn nudge(&mut self, kind: RatioKind, steps: i32) {
        let snapped = ((self.get(kind) / RATIO_STEP).round() + steps as f64) * RATIO_STEP;
        self.set(kind, (snapped * 100.0).round() / 100.0);
    }
}

fn clamp_or(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.clamp(min, max) }
}

/// Where the two viewports go on the canvas (centers, in canvas pixels).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub left_center_x: i64,
    pub right_center_x: i64,
    pub center_y: i64,
    pub viewport_size: u32,
}

/// Recompute the layout for a canvas size and ratio set. Pure.
pub fn compute(canvas_width: u32, canvas_height: u32, ratios: &Ratios) -> Layout {
    let r = ratios.clamped();
    let cw = canvas_width as f64;

    let viewport_size = ((cw * r.size).round() as u32).max(1);
    let center_spacing = (cw * r.spacing / 2.0).round() as i64;
    let center_offset = (cw * r.offset).round() as i64;

    let half_w = (canvas_width / 2) as i64;
    Layout {
        left_center_x: half_w - center_spacing + center_offset,
        right_center_x: half_w + center_spacing + center_offset,
        center_y: (canvas_height / 2) as i64,
        viewport_size,
    }
}
