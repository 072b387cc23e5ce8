use doc_model::{AnnotationRef, ModelError};
use pdf_engine::PdfEngineError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("unsupported file type `{0}`, expected application/pdf")]
    UnsupportedMime(String),
    #[error("no document is loaded")]
    NoDocument,
    #[error("could not load `{name}`: {source}")]
    Load {
        name: String,
        #[source]
        source: PdfEngineError,
    },
    #[error("no placement is waiting to be committed")]
    NoPendingPlacement,
    #[error("text annotations cannot be empty")]
    EmptyText,
    #[error("signature capture is empty")]
    EmptySignature,
    #[error("invalid signature image: {0}")]
    InvalidSignature(#[source] ModelError),
    #[error("could not rasterize signature: {0}")]
    Capture(#[from] image::ImageError),
    #[error("unknown annotation {0:?}")]
    UnknownAnnotation(AnnotationRef),
    #[error("invalid configuration: {0}")]
    Config(#[from] ModelError),
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// The one failure an export reports. The cause is kept for logs only.
#[derive(Debug, thiserror::Error)]
#[error("export failed")]
pub struct ExportError {
    #[source]
    source: PdfEngineError,
}

impl From<PdfEngineError> for ExportError {
    fn from(source: PdfEngineError) -> Self {
        Self { source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-facing message queued by the editor for the host to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
