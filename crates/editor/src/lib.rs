//! Headless PDF annotation editor: upload a document, place text and
//! signatures over its pages, and export a flattened copy.

mod controller;
mod error;
pub mod export;
mod signature_pad;
pub mod source;

pub use controller::{Editor, Overlay, OverlayKind, PageView};
pub use error::{EditorError, ExportError, Notice, NoticeLevel};
pub use export::{export_annotations, ExportedFile};
pub use signature_pad::SignaturePad;
pub use source::{DocumentSource, LoadOutcome, LoadTicket, LoadedDocument, UploadedFile};

pub use doc_model::{ActiveTool, AnnotationKind, AnnotationRef, PendingPlacement};
pub use viewer_core::{DocPoint, ScreenPoint, Zoom};
