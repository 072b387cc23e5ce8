use serde::{Deserialize, Serialize};
use viewer_core::DocPoint;

use crate::annotation::{AnnotationKind, AnnotationRef, SignatureAnnotation, TextAnnotation};
use crate::{EditorConfig, ModelError};

/// Ordered text and signature annotations for one document.
///
/// Insertion order is kept and only matters for stable render keys and for
/// deterministic paint order on export. Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStore {
    texts: Vec<TextAnnotation>,
    signatures: Vec<SignatureAnnotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> &[TextAnnotation] {
        &self.texts
    }

    pub fn signatures(&self) -> &[SignatureAnnotation] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.texts.len() + self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.signatures.is_empty()
    }

    pub fn push_text(&mut self, annotation: TextAnnotation) -> AnnotationRef {
        self.texts.push(annotation);
        AnnotationRef::text(self.texts.len() - 1)
    }

    pub fn push_signature(&mut self, annotation: SignatureAnnotation) -> AnnotationRef {
        self.signatures.push(annotation);
        AnnotationRef::signature(self.signatures.len() - 1)
    }

    pub fn text(&self, index: usize) -> Option<&TextAnnotation> {
        self.texts.get(index)
    }

    pub fn text_mut(&mut self, index: usize) -> Option<&mut TextAnnotation> {
        self.texts.get_mut(index)
    }

    pub fn signature(&self, index: usize) -> Option<&SignatureAnnotation> {
        self.signatures.get(index)
    }

    pub fn signature_mut(&mut self, index: usize) -> Option<&mut SignatureAnnotation> {
        self.signatures.get_mut(index)
    }

    pub fn contains(&self, target: AnnotationRef) -> bool {
        self.position(target).is_some()
    }

    pub fn position(&self, target: AnnotationRef) -> Option<DocPoint> {
        match target.kind {
            AnnotationKind::Text => self.texts.get(target.index).map(|text| text.position),
            AnnotationKind::Signature => {
                self.signatures.get(target.index).map(|signature| signature.position)
            }
        }
    }

    /// Move one annotation. Returns `false` when the reference is stale.
    pub fn set_position(&mut self, target: AnnotationRef, position: DocPoint) -> bool {
        let slot = match target.kind {
            AnnotationKind::Text => self.texts.get_mut(target.index).map(|text| &mut text.position),
            AnnotationKind::Signature => {
                self.signatures.get_mut(target.index).map(|signature| &mut signature.position)
            }
        };

        match slot {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    pub fn texts_on_page(&self, page: u32) -> impl Iterator<Item = (usize, &TextAnnotation)> {
        self.texts.iter().enumerate().filter(move |(_, text)| text.page == page)
    }

    pub fn signatures_on_page(
        &self,
        page: u32,
    ) -> impl Iterator<Item = (usize, &SignatureAnnotation)> {
        self.signatures.iter().enumerate().filter(move |(_, signature)| signature.page == page)
    }

    /// Check every entry against the rules the editor enforces when it
    /// creates annotations. Stores built through the editor always pass;
    /// stores deserialized from a manifest may not.
    pub fn validate(&self, config: &EditorConfig) -> Result<(), ModelError> {
        for (index, text) in self.texts.iter().enumerate() {
            let invalid = |reason: String| {
                ModelError::InvalidAnnotation(format!("text annotation {index} {reason}"))
            };

            if text.text.trim().is_empty() {
                return Err(invalid("is empty".to_owned()));
            }
            check_placement(text.page, text.position).map_err(invalid)?;
            if text.font_size < config.text.min_font_size {
                return Err(invalid(format!(
                    "has font size {}, below the floor {}",
                    text.font_size, config.text.min_font_size
                )));
            }
        }

        let rules = &config.signature;
        for (index, signature) in self.signatures.iter().enumerate() {
            let invalid = |reason: String| {
                ModelError::InvalidAnnotation(format!("signature annotation {index} {reason}"))
            };

            check_placement(signature.page, signature.position).map_err(invalid)?;
            let fits = signature.width.is_finite()
                && signature.height.is_finite()
                && signature.width >= rules.min_width
                && signature.height >= rules.min_height;
            if !fits {
                return Err(invalid(format!(
                    "has size {}x{}, below the floor {}x{}",
                    signature.width, signature.height, rules.min_width, rules.min_height
                )));
            }
        }

        Ok(())
    }
}

fn check_placement(page: u32, position: DocPoint) -> Result<(), String> {
    if page == 0 {
        return Err("targets page 0 (pages are 1-based)".to_owned());
    }
    if !(position.x.is_finite() && position.y.is_finite()) {
        return Err(format!("has a non-finite position ({}, {})", position.x, position.y));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignatureImage;

    fn text(page: u32, x: f64) -> TextAnnotation {
        TextAnnotation {
            position: DocPoint::new(x, 10.0),
            text: format!("label {x}"),
            page,
            font_size: 11,
        }
    }

    fn signature(page: u32) -> SignatureAnnotation {
        SignatureAnnotation {
            position: DocPoint::new(20.0, 30.0),
            image: SignatureImage::from_png_bytes(vec![1]).expect("non-empty"),
            width: 200.0,
            height: 100.0,
            page,
        }
    }

    #[test]
    fn push_returns_reference_to_new_entry() {
        let mut store = AnnotationStore::new();

        assert_eq!(store.push_text(text(1, 1.0)), AnnotationRef::text(0));
        assert_eq!(store.push_text(text(1, 2.0)), AnnotationRef::text(1));
        assert_eq!(store.push_signature(signature(1)), AnnotationRef::signature(0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn set_position_moves_only_the_target() {
        let mut store = AnnotationStore::new();
        store.push_text(text(1, 1.0));
        store.push_signature(signature(1));
        store.push_signature(signature(2));

        assert!(store.set_position(AnnotationRef::signature(1), DocPoint::new(300.0, 400.0)));

        assert_eq!(store.signatures()[1].position, DocPoint::new(300.0, 400.0));
        assert_eq!(store.signatures()[0].position, DocPoint::new(20.0, 30.0));
        assert_eq!(store.texts()[0].position, DocPoint::new(1.0, 10.0));
    }

    #[test]
    fn stale_reference_is_reported() {
        let mut store = AnnotationStore::new();
        assert!(!store.set_position(AnnotationRef::text(3), DocPoint::default()));
        assert!(!store.contains(AnnotationRef::signature(0)));
    }

    #[test]
    fn page_filters_keep_store_indices() {
        let mut store = AnnotationStore::new();
        store.push_text(text(1, 1.0));
        store.push_text(text(2, 2.0));
        store.push_text(text(2, 3.0));

        let indices: Vec<usize> = store.texts_on_page(2).map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn manifest_without_signatures_parses() {
        let store: AnnotationStore = serde_json::from_str(
            r#"{"texts":[{"position":{"x":50.0,"y":80.0},"text":"Paid","page":1}]}"#,
        )
        .expect("manifest should parse");

        assert_eq!(store.texts().len(), 1);
        assert!(store.signatures().is_empty());
    }

    #[test]
    fn editor_built_entries_validate() {
        let mut store = AnnotationStore::new();
        store.push_text(text(1, 1.0));
        store.push_signature(signature(2));

        store.validate(&EditorConfig::default()).expect("entries within the rules");
    }

    #[test]
    fn validate_rejects_entries_outside_the_rules() {
        let config = EditorConfig::default();
        let cases: Vec<(AnnotationStore, &str)> = vec![
            (
                single_text(TextAnnotation { font_size: 0, ..text(1, 1.0) }),
                "text annotation 0 has font size 0, below the floor 8",
            ),
            (
                single_text(TextAnnotation { text: " \t".to_owned(), ..text(1, 1.0) }),
                "text annotation 0 is empty",
            ),
            (single_text(text(0, 1.0)), "text annotation 0 targets page 0 (pages are 1-based)"),
            (
                single_text(text(1, f64::NAN)),
                "text annotation 0 has a non-finite position (NaN, 10)",
            ),
            (
                single_signature(SignatureAnnotation { width: 0.0, ..signature(1) }),
                "signature annotation 0 has size 0x100, below the floor 50x25",
            ),
            (
                single_signature(SignatureAnnotation { height: 24.0, ..signature(1) }),
                "signature annotation 0 has size 200x24, below the floor 50x25",
            ),
            (
                single_signature(SignatureAnnotation { width: f64::INFINITY, ..signature(1) }),
                "signature annotation 0 has size infx100, below the floor 50x25",
            ),
        ];

        for (store, expected) in cases {
            let err = store.validate(&config).expect_err("entry should be rejected");
            assert!(matches!(err, ModelError::InvalidAnnotation(_)));
            assert_eq!(err.to_string(), expected);
        }
    }

    fn single_text(annotation: TextAnnotation) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.push_text(annotation);
        store
    }

    fn single_signature(annotation: SignatureAnnotation) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.push_signature(annotation);
        store
    }
}
