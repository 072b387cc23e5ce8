use viewer_core::DocPoint;

use crate::annotation::AnnotationRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTool {
    #[default]
    None,
    PlaceText,
    PlaceSignature,
}

/// The annotation currently following the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub target: AnnotationRef,
}

/// A placement waiting on its prompt (text entry or signature pad).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingPlacement {
    Text { page: u32, position: DocPoint },
    /// `position` is `None` when the pad was opened without a page click.
    Signature { page: u32, position: Option<DocPoint> },
}

impl PendingPlacement {
    pub fn page(&self) -> u32 {
        match self {
            Self::Text { page, .. } | Self::Signature { page, .. } => *page,
        }
    }
}
