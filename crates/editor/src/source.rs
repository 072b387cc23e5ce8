//! The uploaded document and the upload lifecycle around it.

use pdf_engine::{DocumentHandle, PageSize, PdfEngine, PdfEngineError};

pub const PDF_MIME: &str = "application/pdf";

/// A file handed over by a picker or drop target.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime: mime.into(), bytes }
    }
}

/// Whether a declared MIME type is a PDF. Parameters such as `; charset`
/// are ignored and the comparison is case-insensitive.
pub fn is_pdf_mime(mime: &str) -> bool {
    mime.split(';').next().is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
}

/// Issued by `begin_upload`; only the newest ticket may commit a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub(crate) generation: u64,
    pub(crate) name: String,
}

impl LoadTicket {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { page_count: u32 },
    /// A newer upload was started after this one; nothing changed.
    Superseded,
}

/// A parsed document together with the renderer handle that displays it.
#[derive(Debug)]
pub struct LoadedDocument {
    name: String,
    bytes: Vec<u8>,
    handle: DocumentHandle,
    page_sizes: Vec<PageSize>,
}

impl LoadedDocument {
    /// Open `bytes` in `engine` and read the page geometry. The handle is
    /// closed again if the geometry cannot be read.
    pub(crate) fn open<E: PdfEngine>(
        engine: &mut E,
        name: String,
        bytes: Vec<u8>,
    ) -> Result<Self, PdfEngineError> {
        let handle = engine.open(bytes.clone().into())?;

        let page_sizes = engine.page_count(handle).and_then(|count| {
            (0..count).map(|index| engine.page_size(handle, index)).collect::<Result<Vec<_>, _>>()
        });

        match page_sizes {
            Ok(page_sizes) if !page_sizes.is_empty() => {
                Ok(Self { name, bytes, handle, page_sizes })
            }
            Ok(_) => {
                let _ = engine.close(handle);
                Err(PdfEngineError::Backend("document has no pages".to_owned()))
            }
            Err(err) => {
                let _ = engine.close(handle);
                Err(err)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Natural size of a 1-based page.
    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        page.checked_sub(1).and_then(|index| self.page_sizes.get(index as usize)).copied()
    }
}

#[derive(Debug, Default)]
pub enum DocumentSource {
    #[default]
    Empty,
    Ready(LoadedDocument),
    /// The last load failed; no document is displayed.
    Failed { name: String, reason: String },
}

impl DocumentSource {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        match self {
            Self::Ready(doc) => Some(doc),
            _ => None,
        }
    }

    /// Swap in `next`, closing the display handle of the document it replaces.
    pub(crate) fn replace<E: PdfEngine>(&mut self, engine: &mut E, next: DocumentSource) {
        if let Self::Ready(previous) = std::mem::replace(self, next) {
            match engine.close(previous.handle) {
                Ok(()) => tracing::debug!(name = %previous.name, "released document"),
                Err(err) => {
                    tracing::warn!(name = %previous.name, %err, "failed to release document")
                }
            }
        }
    }
}
