use serde::{Deserialize, Serialize};
use viewer_core::ZoomRange;

use crate::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRules {
    pub default_font_size: u32,
    pub min_font_size: u32,
    /// Fill opacity used when text is burned into the page.
    pub opacity: f32,
}

impl Default for TextRules {
    fn default() -> Self {
        Self { default_font_size: 11, min_font_size: 8, opacity: 0.95 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureRules {
    pub default_width: f64,
    pub default_height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub grow_factor: f64,
    pub shrink_factor: f64,
}

impl Default for SignatureRules {
    fn default() -> Self {
        Self {
            default_width: 200.0,
            default_height: 100.0,
            min_width: 50.0,
            min_height: 25.0,
            grow_factor: 1.1,
            shrink_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub zoom: ZoomRange,
    pub text: TextRules,
    pub signature: SignatureRules,
    /// Prepended to the uploaded file name when naming the export.
    pub export_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomRange::default(),
            text: TextRules::default(),
            signature: SignatureRules::default(),
            export_prefix: "edited_".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.zoom.is_valid() {
            return Err(ModelError::InvalidConfig(format!(
                "zoom range {}..={} (step {}, initial {}) is not usable",
                self.zoom.min, self.zoom.max, self.zoom.step, self.zoom.initial
            )));
        }

        let text = &self.text;
        if text.min_font_size == 0 || text.default_font_size < text.min_font_size {
            return Err(ModelError::InvalidConfig(format!(
                "font size default {} must be at least the floor {} (and the floor positive)",
                text.default_font_size, text.min_font_size
            )));
        }
        if !(0.0..=1.0).contains(&text.opacity) {
            return Err(ModelError::InvalidConfig(format!(
                "text opacity {} is outside 0..=1",
                text.opacity
            )));
        }

        let sig = &self.signature;
        if !(sig.min_width > 0.0 && sig.min_height > 0.0) {
            return Err(ModelError::InvalidConfig("signature floor must be positive".to_owned()));
        }
        if sig.default_width < sig.min_width || sig.default_height < sig.min_height {
            return Err(ModelError::InvalidConfig(format!(
                "default signature size {}x{} is below the floor {}x{}",
                sig.default_width, sig.default_height, sig.min_width, sig.min_height
            )));
        }
        if !(sig.grow_factor > 1.0) || !(sig.shrink_factor > 0.0 && sig.shrink_factor < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "signature scale factors grow={} shrink={} must be >1 and in (0, 1)",
                sig.grow_factor, sig.shrink_factor
            )));
        }

        Ok(())
    }
}
