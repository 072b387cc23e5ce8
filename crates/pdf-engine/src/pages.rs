use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::{PageSize, PdfEngineError};

// Inheritable page attributes are looked up at most this many levels up.
const MAX_TREE_DEPTH: usize = 32;

const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

/// Page object ids in page order.
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Natural size of a page, following `MediaBox` inheritance through the page
/// tree and falling back to US Letter when nothing usable is found.
pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok().and_then(|array| media_box_size(array)))
        .unwrap_or(LETTER)
}

pub(crate) fn sizes(doc: &Document) -> Result<Vec<PageSize>, PdfEngineError> {
    let sizes: Vec<PageSize> = page_ids(doc).into_iter().map(|id| page_size(doc, id)).collect();

    if sizes.is_empty() {
        return Err(PdfEngineError::Backend("document has no pages".to_owned()));
    }

    Ok(sizes)
}

/// Resources dictionary the page actually uses, inherited ones included.
pub(crate) fn inherited_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj).as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new)
}

fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn media_box_size(array: &[Object]) -> Option<PageSize> {
    if array.len() != 4 {
        return None;
    }

    let x0 = number(&array[0])?;
    let y0 = number(&array[1])?;
    let x1 = number(&array[2])?;
    let y1 = number(&array[3])?;

    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}
