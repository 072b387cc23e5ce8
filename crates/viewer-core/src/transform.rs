//! Mapping between the three coordinate spaces an annotation passes through.
//!
//! - Screen space: pixel offsets from the top-left of a rendered surface, only
//!   meaningful at the zoom that was active when the pointer event fired.
//! - Document space: screen space divided by that zoom. Origin top-left,
//!   y grows downward, units are PDF points at 100%. Annotations are stored here.
//! - PDF page space: origin bottom-left, y grows upward, natural page size.

use serde::{Deserialize, Serialize};

use crate::zoom::Zoom;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

/// How a document-space position attaches to the thing drawn there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Text baseline origin. Maps straight across.
    Point,
    /// Top-left corner of a box of the given height. PDF draws images from
    /// their bottom edge, so the height has to come off as well.
    TopLeft { height: f64 },
}

pub fn to_document_space(screen: ScreenPoint, zoom: Zoom) -> DocPoint {
    let factor = zoom.factor();
    DocPoint { x: screen.x / factor, y: screen.y / factor }
}

pub fn to_screen_space(doc: DocPoint, zoom: Zoom) -> ScreenPoint {
    let factor = zoom.factor();
    ScreenPoint { x: doc.x * factor, y: doc.y * factor }
}

/// Flip a document-space position into PDF page space for a page whose
/// unscaled height is `page_height`.
pub fn to_pdf_space(doc: DocPoint, page_height: f64, anchor: Anchor) -> PdfPoint {
    let y = match anchor {
        Anchor::Point => page_height - doc.y,
        Anchor::TopLeft { height } => page_height - doc.y - height,
    };

    PdfPoint { x: doc.x, y }
}

/// Scale a document-space length (width, height, font size) to pixels.
pub fn to_screen_length(length: f64, zoom: Zoom) -> f64 {
    length * zoom.factor()
}
