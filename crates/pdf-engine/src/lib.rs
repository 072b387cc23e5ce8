use image::{ImageBuffer, Rgba};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

mod encoding;
mod mutate;
mod pages;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use mutate::{DrawImage, DrawText, LopdfMutator, PdfMutator, RgbColor};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Display handle for a document opened by a [`PdfEngine`].
///
/// Must be handed back through [`PdfEngine::close`] once the document is
/// superseded, otherwise the engine keeps its bytes alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Natural (unscaled) page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// 0-based.
    pub page_index: u32,
    pub zoom: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, zoom: 1.0 }
    }
}

/// A rendered page at one zoom factor.
#[derive(Debug, Clone)]
pub struct PageSurface {
    pub page_index: u32,
    pub zoom: f32,
    pub image: RgbaImage,
}

impl PageSurface {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    pub fn height_px(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("character {0:?} cannot be encoded with the standard fonts")]
    UnencodableText(char),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Page renderer: parses documents and turns pages into pixel surfaces.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<PageSurface, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

/// Surface size for a page at `zoom`, never smaller than one pixel.
pub fn surface_dimensions(size: PageSize, zoom: f32) -> (u32, u32) {
    let zoom = if zoom > 0.0 && zoom.is_finite() { zoom } else { 1.0 };
    let width = (size.width_pt * zoom).round().max(1.0) as u32;
    let height = (size.height_pt * zoom).round().max(1.0) as u32;
    (width, height)
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

/// Pure-Rust engine: real page geometry, blank page surfaces.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents still holding a handle.
    pub fn open_documents(&self) -> usize {
        self.docs.len()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = lopdf::Document::load_mem(bytes)?;
        pages::sizes(&doc)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    #[cfg_attr(not(feature = "pdfium"), allow(dead_code))]
    fn bytes(&self, handle: DocumentHandle) -> Result<&[u8], PdfEngineError> {
        Ok(&self.record(handle)?.bytes)
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_sizes.len(), "opened document");
        self.docs.insert(handle, DocumentRecord { bytes, page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<PageSurface, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let (width, height) = surface_dimensions(page_size, request.zoom);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(PageSurface { page_index: request.page_index, zoom: request.zoom, image })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))?;
        tracing::debug!(handle = handle.raw(), "released document");
        Ok(())
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::*;
    use pdfium_render::prelude::*;

    /// Engine that rasterizes page content with a system PDFium library.
    pub struct PdfiumEngine {
        pdfium: Pdfium,
        inner: LopdfEngine,
    }

    impl PdfiumEngine {
        pub fn from_system_library() -> Result<Self, PdfEngineError> {
            let bindings = Pdfium::bind_to_system_library().map_err(|err| {
                PdfEngineError::Backend(format!("failed to bind pdfium system library: {err}"))
            })?;

            Ok(Self { pdfium: Pdfium::new(bindings), inner: LopdfEngine::default() })
        }
    }

    impl PdfEngine for PdfiumEngine {
        fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            self.inner.open(source)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            self.inner.page_count(handle)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, PdfEngineError> {
            self.inner.page_size(handle, page_index)
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<PageSurface, PdfEngineError> {
            let size = self.inner.page_size(handle, request.page_index)?;
            let (width, height) = surface_dimensions(size, request.zoom);

            let backend = |err: PdfiumError| PdfEngineError::Backend(err.to_string());
            let bytes = self.inner.bytes(handle)?;
            let document = self.pdfium.load_pdf_from_byte_slice(bytes, None).map_err(backend)?;
            let page = document.pages().get(request.page_index as u16).map_err(backend)?;

            let config = PdfRenderConfig::new()
                .set_target_width(width as i32)
                .set_target_height(height as i32);
            let bitmap = page.render_with_config(&config).map_err(backend)?;

            let image = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(
                || PdfEngineError::Backend("pdfium bitmap size mismatch".to_owned()),
            )?;

            Ok(PageSurface { page_index: request.page_index, zoom: request.zoom, image })
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
            self.inner.close(handle)
        }
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_pdf;

    #[test]
    fn opens_pdf_and_reads_page_count_and_sizes() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612.0, 792.0), (842.0, 595.0)])))
            .expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 2);
        assert_eq!(
            engine.page_size(handle, 1).expect("size should succeed"),
            PageSize { width_pt: 842.0, height_pt: 595.0 }
        );
    }

    #[test]
    fn render_page_scales_surface_with_zoom() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612.0, 792.0)])))
            .expect("open should succeed");

        let surface = engine
            .render_page(handle, RenderRequest { page_index: 0, zoom: 1.5 })
            .expect("page should render");

        assert_eq!((surface.width_px(), surface.height_px()), (918, 1188));
    }

    #[test]
    fn page_out_of_range_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612.0, 792.0)])))
            .expect("open should succeed");

        let err = engine.page_size(handle, 3).expect_err("page 3 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 3, page_count: 1 }));
    }

    #[test]
    fn close_releases_the_document() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(sample_pdf(&[(612.0, 792.0)])))
            .expect("open should succeed");
        assert_eq!(engine.open_documents(), 1);

        engine.close(handle).expect("close should succeed");
        assert_eq!(engine.open_documents(), 0);

        let err = engine.page_count(handle).expect_err("closed handle is invalid");
        assert!(matches!(err, PdfEngineError::InvalidHandle(_)));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"definitely not a pdf".to_vec()))
            .expect_err("garbage should not open");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }
}
