mod annotation;
mod config;
mod signature;
mod store;
mod tool;

pub use annotation::{AnnotationKind, AnnotationRef, SignatureAnnotation, TextAnnotation};
pub use config::{EditorConfig, SignatureRules, TextRules};
pub use signature::SignatureImage;
pub use store::AnnotationStore;
pub use tool::{ActiveTool, DragSession, PendingPlacement};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("signature image is empty")]
    EmptyImage,
    #[error("signature payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    InvalidAnnotation(String),
}
