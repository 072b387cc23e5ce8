use serde::{Deserialize, Serialize};

/// A zoom factor that is always finite and strictly positive.
///
/// Only [`ZoomRange`] hands these out, so every value has already been clamped
/// to a configured range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Zoom(f64);

impl Zoom {
    pub const ACTUAL_SIZE: Zoom = Zoom(1.0);

    pub fn factor(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::ACTUAL_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub initial: f64,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 0.5, max: 2.0, step: 0.1, initial: 1.0 }
    }
}

impl ZoomRange {
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min > 0.0
            && self.min <= self.max
            && self.step.is_finite()
            && self.step > 0.0
            && (self.min..=self.max).contains(&self.initial)
    }

    pub fn clamp(&self, factor: f64) -> Zoom {
        if !factor.is_finite() {
            return self.initial_zoom();
        }

        Zoom(factor.clamp(self.min, self.max))
    }

    pub fn initial_zoom(&self) -> Zoom {
        Zoom(self.initial.clamp(self.min, self.max))
    }

    pub fn step_in(&self, current: Zoom) -> Zoom {
        self.clamp(round_hundredths(current.factor() + self.step))
    }

    pub fn step_out(&self, current: Zoom) -> Zoom {
        self.clamp(round_hundredths(current.factor() - self.step))
    }

    /// Zoom at which a page of `page_width_pt` fills the viewport width.
    pub fn fit_width(&self, viewport_width_px: f64, page_width_pt: f64) -> Zoom {
        if viewport_width_px <= 0.0 || page_width_pt <= 0.0 {
            return self.initial_zoom();
        }

        self.clamp(viewport_width_px / page_width_pt)
    }

    /// Zoom at which the whole page fits inside the viewport.
    pub fn fit_page(
        &self,
        viewport_width_px: f64,
        viewport_height_px: f64,
        page_width_pt: f64,
        page_height_pt: f64,
    ) -> Zoom {
        if viewport_width_px <= 0.0
            || viewport_height_px <= 0.0
            || page_width_pt <= 0.0
            || page_height_pt <= 0.0
        {
            return self.initial_zoom();
        }

        let width = viewport_width_px / page_width_pt;
        let height = viewport_height_px / page_height_pt;

        self.clamp(width.min(height))
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
