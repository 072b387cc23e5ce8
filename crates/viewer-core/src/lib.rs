mod transform;
mod zoom;

pub use transform::{
    to_document_space, to_pdf_space, to_screen_length, to_screen_space, Anchor, DocPoint, PdfPoint,
    ScreenPoint,
};
pub use zoom::{Zoom, ZoomRange};

/// Clamp a 1-based page number into `1..=page_count`.
pub fn clamp_page(page: u32, page_count: u32) -> u32 {
    page.max(1).min(page_count.max(1))
}
