//! Text and signature annotations.
//!
//! Positions are stored in document space (zoom 1.0, origin top-left) so a
//! zoom change never rewrites stored data; only the render transform moves.

use serde::{Deserialize, Serialize};
use viewer_core::DocPoint;

use crate::config::{SignatureRules, TextRules};
use crate::signature::SignatureImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Text,
    Signature,
}

/// Points at one entry of an [`AnnotationStore`](crate::AnnotationStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationRef {
    pub kind: AnnotationKind,
    pub index: usize,
}

impl AnnotationRef {
    pub fn text(index: usize) -> Self {
        Self { kind: AnnotationKind::Text, index }
    }

    pub fn signature(index: usize) -> Self {
        Self { kind: AnnotationKind::Signature, index }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub position: DocPoint,
    pub text: String,
    /// 1-based page number.
    pub page: u32,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

fn default_font_size() -> u32 {
    TextRules::default().default_font_size
}

impl TextAnnotation {
    pub fn increase_font_size(&mut self) {
        self.font_size = self.font_size.saturating_add(1);
    }

    /// Step down by one point, never below the configured floor.
    pub fn decrease_font_size(&mut self, rules: &TextRules) {
        if self.font_size > rules.min_font_size {
            self.font_size -= 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureAnnotation {
    /// Top-left corner of the image in document space.
    pub position: DocPoint,
    pub image: SignatureImage,
    pub width: f64,
    pub height: f64,
    /// 1-based page number.
    pub page: u32,
}

impl SignatureAnnotation {
    pub fn grow(&mut self, rules: &SignatureRules) {
        self.scale(rules.grow_factor, rules);
    }

    pub fn shrink(&mut self, rules: &SignatureRules) {
        self.scale(rules.shrink_factor, rules);
    }

    // Each dimension is floored on its own.
    fn scale(&mut self, factor: f64, rules: &SignatureRules) {
        self.width = (self.width * factor).max(rules.min_width);
        self.height = (self.height * factor).max(rules.min_height);
    }
}
