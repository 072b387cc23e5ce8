//! Burn stored annotations into a copy of the source PDF.

use doc_model::{AnnotationStore, EditorConfig};
use pdf_engine::{DrawImage, DrawText, PdfEngineError, PdfMutator, RgbColor};
use viewer_core::{to_pdf_space, Anchor};

use crate::error::ExportError;
use crate::source::PDF_MIME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

pub fn exported_file_name(prefix: &str, original: &str) -> String {
    format!("{prefix}{original}")
}

/// Load `source` into `M`, draw every text annotation and then every
/// signature in store order, and serialize the result.
pub fn export_annotations<M: PdfMutator>(
    source: &[u8],
    original_name: &str,
    store: &AnnotationStore,
    config: &EditorConfig,
) -> Result<ExportedFile, ExportError> {
    let mut doc = M::load(source)?;

    for text in store.texts() {
        let page_index = page_index(text.page, doc.page_count())?;
        let size = doc.page_size(page_index)?;
        let at = to_pdf_space(text.position, f64::from(size.height_pt), Anchor::Point);

        doc.draw_text(
            page_index,
            &DrawText {
                text: &text.text,
                x: at.x as f32,
                y: at.y as f32,
                size: text.font_size as f32,
                color: RgbColor::BLACK,
                opacity: config.text.opacity,
            },
        )?;
    }

    for signature in store.signatures() {
        let page_index = page_index(signature.page, doc.page_count())?;
        let size = doc.page_size(page_index)?;
        let at = to_pdf_space(
            signature.position,
            f64::from(size.height_pt),
            Anchor::TopLeft { height: signature.height },
        );

        doc.draw_image(
            page_index,
            &DrawImage {
                bytes: signature.image.bytes(),
                x: at.x as f32,
                y: at.y as f32,
                width: signature.width as f32,
                height: signature.height as f32,
            },
        )?;
    }

    let bytes = doc.save()?;
    tracing::info!(
        texts = store.texts().len(),
        signatures = store.signatures().len(),
        bytes = bytes.len(),
        "exported document"
    );

    Ok(ExportedFile {
        file_name: exported_file_name(&config.export_prefix, original_name),
        mime: PDF_MIME,
        bytes,
    })
}

fn page_index(page: u32, page_count: u32) -> Result<u32, PdfEngineError> {
    match page.checked_sub(1) {
        Some(index) if index < page_count => Ok(index),
        _ => Err(PdfEngineError::PageOutOfRange { page, page_count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{SignatureAnnotation, SignatureImage, TextAnnotation};
    use pdf_engine::testing::{sample_pdf, sample_png};
    use pdf_engine::PageSize;
    use std::cell::RefCell;
    use viewer_core::DocPoint;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Text { page: u32, x: f32, y: f32, size: f32, opacity: f32, text: String },
        Image { page: u32, x: f32, y: f32, width: f32, height: f32 },
    }

    fn text_call(page: u32, x: f32, y: f32, text: &str) -> Call {
        Call::Text { page, x, y, size: 11.0, opacity: 0.95, text: text.to_owned() }
    }

    /// Mutator stand-in that records what it is asked to draw.
    struct Recorder {
        calls: Vec<Call>,
    }

    thread_local! {
        static RECORDED: RefCell<Vec<Call>> = const { RefCell::new(Vec::new()) };
    }

    impl PdfMutator for Recorder {
        fn load(_bytes: &[u8]) -> Result<Self, PdfEngineError> {
            Ok(Self { calls: Vec::new() })
        }

        fn page_count(&self) -> u32 {
            2
        }

        fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
            Ok(match page_index {
                0 => PageSize { width_pt: 612.0, height_pt: 792.0 },
                _ => PageSize { width_pt: 842.0, height_pt: 595.0 },
            })
        }

        fn draw_text(
            &mut self,
            page_index: u32,
            text: &DrawText<'_>,
        ) -> Result<(), PdfEngineError> {
            self.calls.push(Call::Text {
                page: page_index,
                x: text.x,
                y: text.y,
                size: text.size,
                opacity: text.opacity,
                text: text.text.to_owned(),
            });
            Ok(())
        }

        fn draw_image(
            &mut self,
            page_index: u32,
            image: &DrawImage<'_>,
        ) -> Result<(), PdfEngineError> {
            self.calls.push(Call::Image {
                page: page_index,
                x: image.x,
                y: image.y,
                width: image.width,
                height: image.height,
            });
            Ok(())
        }

        fn save(self) -> Result<Vec<u8>, PdfEngineError> {
            RECORDED.with(|recorded| *recorded.borrow_mut() = self.calls);
            Ok(b"%PDF-recorded".to_vec())
        }
    }

    fn recorded() -> Vec<Call> {
        RECORDED.with(|recorded| recorded.borrow().clone())
    }

    fn signature(page: u32, x: f64, y: f64) -> SignatureAnnotation {
        SignatureAnnotation {
            position: DocPoint::new(x, y),
            image: SignatureImage::from_png_bytes(sample_png(8, 4)).expect("png"),
            width: 200.0,
            height: 100.0,
            page,
        }
    }

    fn text(page: u32, x: f64, y: f64, body: &str) -> TextAnnotation {
        TextAnnotation { position: DocPoint::new(x, y), text: body.to_owned(), page, font_size: 11 }
    }

    #[test]
    fn texts_then_signatures_in_store_order_with_flipped_y() {
        let mut store = AnnotationStore::new();
        store.push_signature(signature(1, 50.0, 80.0));
        store.push_text(text(1, 50.0, 80.0, "first"));
        store.push_text(text(2, 10.0, 95.0, "second"));

        let config = EditorConfig::default();
        let file = export_annotations::<Recorder>(b"", "contract.pdf", &store, &config)
            .expect("export should succeed");

        assert_eq!(file.file_name, "edited_contract.pdf");
        assert_eq!(file.mime, "application/pdf");
        assert_eq!(
            recorded(),
            vec![
                text_call(0, 50.0, 712.0, "first"),
                text_call(1, 10.0, 500.0, "second"),
                Call::Image { page: 0, x: 50.0, y: 612.0, width: 200.0, height: 100.0 },
            ]
        );
    }

    #[test]
    fn annotation_on_missing_page_fails_the_whole_export() {
        let mut store = AnnotationStore::new();
        store.push_text(text(3, 0.0, 0.0, "lost"));

        let err = export_annotations::<Recorder>(b"", "a.pdf", &store, &EditorConfig::default())
            .expect_err("page 3 does not exist");
        assert_eq!(err.to_string(), "export failed");
    }

    #[test]
    fn real_document_round_trips_through_lopdf() {
        let source = sample_pdf(&[(612.0, 792.0)]);
        let mut store = AnnotationStore::new();
        store.push_text(text(1, 72.0, 72.0, "Signed"));
        store.push_signature(signature(1, 300.0, 600.0));

        let file = export_annotations::<pdf_engine::LopdfMutator>(
            &source,
            "lease.pdf",
            &store,
            &EditorConfig::default(),
        )
        .expect("export should succeed");

        assert!(file.bytes.starts_with(b"%PDF"));
        assert_ne!(file.bytes, source);
    }

    #[test]
    fn unreadable_source_is_an_export_error() {
        let store = AnnotationStore::new();
        let err = export_annotations::<pdf_engine::LopdfMutator>(
            b"not a pdf",
            "a.pdf",
            &store,
            &EditorConfig::default(),
        )
        .expect_err("garbage cannot be exported");

        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn prefix_comes_from_config() {
        assert_eq!(exported_file_name("signed_", "deed.pdf"), "signed_deed.pdf");
    }
}
