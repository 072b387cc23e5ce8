//! Document mutation: draw text and images onto existing pages and
//! re-serialize. Drawing is buffered per page and flushed into one extra
//! content stream per touched page on save.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};

use crate::encoding::encode_win_ansi;
use crate::{pages, PageSize, PdfEngineError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 0.0 };
}

/// Text drawn in Helvetica (referenced, not embedded) with its first
/// baseline at `(x, y)` in PDF page space.
#[derive(Debug, Clone, Copy)]
pub struct DrawText<'a> {
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: RgbColor,
    pub opacity: f32,
}

/// Encoded image (PNG, JPEG) drawn with its bottom-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy)]
pub struct DrawImage<'a> {
    pub bytes: &'a [u8],
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Writer side of the PDF toolchain. Page indices are 0-based.
pub trait PdfMutator: Sized {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError>;
    fn page_count(&self) -> u32;
    fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError>;
    fn draw_text(&mut self, page_index: u32, text: &DrawText<'_>) -> Result<(), PdfEngineError>;
    fn draw_image(&mut self, page_index: u32, image: &DrawImage<'_>) -> Result<(), PdfEngineError>;
    fn save(self) -> Result<Vec<u8>, PdfEngineError>;
}

#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    font: Option<String>,
    states: HashMap<u32, String>,
}

#[derive(Debug)]
pub struct LopdfMutator {
    doc: Document,
    pages: Vec<ObjectId>,
    sizes: Vec<PageSize>,
    font: Option<ObjectId>,
    overlays: BTreeMap<u32, PageOverlay>,
}

impl LopdfMutator {
    fn page(&self, page_index: u32) -> Result<ObjectId, PdfEngineError> {
        self.pages.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.pages.len() as u32,
        })
    }

    fn font_resource(
        &mut self,
        page_index: u32,
        page_id: ObjectId,
    ) -> Result<String, PdfEngineError> {
        if let Some(name) = self.overlays.get(&page_index).and_then(|o| o.font.clone()) {
            return Ok(name);
        }

        let font_id = match self.font {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                self.font = Some(id);
                id
            }
        };

        let name = register_resource(&mut self.doc, page_id, "Font", "PsF", font_id.into())?;
        self.overlays.entry(page_index).or_default().font = Some(name.clone());
        Ok(name)
    }

    fn opacity_resource(
        &mut self,
        page_index: u32,
        page_id: ObjectId,
        opacity: f32,
    ) -> Result<String, PdfEngineError> {
        let key = opacity.to_bits();
        if let Some(name) = self.overlays.get(&page_index).and_then(|o| o.states.get(&key)) {
            return Ok(name.clone());
        }

        let state_id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(opacity),
            "CA" => Object::Real(opacity),
        });

        let name = register_resource(&mut self.doc, page_id, "ExtGState", "PsGs", state_id.into())?;
        self.overlays.entry(page_index).or_default().states.insert(key, name.clone());
        Ok(name)
    }

    fn embed_image(&mut self, bytes: &[u8]) -> Result<ObjectId, PdfEngineError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in decoded.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        let _ = smask.compress();
        let smask_id = self.doc.add_object(smask);

        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        );
        let _ = image.compress();

        Ok(self.doc.add_object(image))
    }
}

impl PdfMutator for LopdfMutator {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let sizes = pages::sizes(&doc)?;
        let pages = pages::page_ids(&doc);

        Ok(Self { doc, pages, sizes, font: None, overlays: BTreeMap::new() })
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
        self.page(page_index)?;
        Ok(self.sizes[page_index as usize])
    }

    fn draw_text(&mut self, page_index: u32, text: &DrawText<'_>) -> Result<(), PdfEngineError> {
        let page_id = self.page(page_index)?;
        let lines = text.text.lines().map(encode_win_ansi).collect::<Result<Vec<_>, _>>()?;

        if lines.is_empty() {
            return Ok(());
        }

        let font = self.font_resource(page_index, page_id)?;
        let state = if text.opacity < 1.0 {
            Some(self.opacity_resource(page_index, page_id, text.opacity)?)
        } else {
            None
        };

        let ops = &mut self.overlays.entry(page_index).or_default().operations;
        ops.push(Operation::new("q", vec![]));
        if let Some(state) = state {
            ops.push(Operation::new("gs", vec![Object::Name(state.into_bytes())]));
        }
        ops.push(Operation::new(
            "rg",
            vec![real(text.color.r), real(text.color.g), real(text.color.b)],
        ));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![Object::Name(font.into_bytes()), real(text.size)]));
        ops.push(Operation::new("TL", vec![real(text.size * 1.2)]));
        ops.push(Operation::new("Td", vec![real(text.x), real(text.y)]));
        for (index, line) in lines.into_iter().enumerate() {
            if index > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new("Tj", vec![Object::String(line, StringFormat::Literal)]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));

        tracing::trace!(page_index, x = text.x, y = text.y, "queued text");
        Ok(())
    }

    fn draw_image(&mut self, page_index: u32, image: &DrawImage<'_>) -> Result<(), PdfEngineError> {
        let page_id = self.page(page_index)?;
        let image_id = self.embed_image(image.bytes)?;
        let name = register_resource(&mut self.doc, page_id, "XObject", "PsIm", image_id.into())?;

        let ops = &mut self.overlays.entry(page_index).or_default().operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                real(image.width),
                real(0.0),
                real(0.0),
                real(image.height),
                real(image.x),
                real(image.y),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));

        tracing::trace!(page_index, x = image.x, y = image.y, "queued image");
        Ok(())
    }

    fn save(mut self) -> Result<Vec<u8>, PdfEngineError> {
        for (page_index, overlay) in std::mem::take(&mut self.overlays) {
            if overlay.operations.is_empty() {
                continue;
            }

            let content = Content { operations: overlay.operations }.encode()?;
            append_content(&mut self.doc, self.pages[page_index as usize], content)?;
        }

        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, PdfEngineError> {
    Ok(doc.get_object_mut(id).and_then(Object::as_dict_mut)?)
}

/// The page's own resources dictionary, materializing inherited resources
/// onto the page first so additions do not hide them.
fn resources_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfEngineError> {
    let current = doc.get_dictionary(page_id)?.get(b"Resources").ok().cloned();

    let shared = match current {
        Some(Object::Reference(id)) => Some(id),
        Some(Object::Dictionary(_)) => None,
        _ => {
            let inherited = pages::inherited_resources(doc, page_id);
            dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(inherited));
            None
        }
    };

    match shared {
        Some(id) => dict_mut(doc, id),
        None => Ok(dict_mut(doc, page_id)?.get_mut(b"Resources").and_then(Object::as_dict_mut)?),
    }
}

/// Add `value` under a fresh name in one resource category (`Font`,
/// `XObject`, `ExtGState`) of the page and return that name.
fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    value: Object,
) -> Result<String, PdfEngineError> {
    let existing = resources_mut(doc, page_id)?.get(category.as_bytes()).ok().cloned();

    let mut entries = match existing {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => {
            doc.get_dictionary(id).map(Clone::clone).unwrap_or_else(|_| Dictionary::new())
        }
        _ => Dictionary::new(),
    };

    let name = (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !entries.has(candidate.as_bytes()))
        .unwrap_or_else(|| prefix.to_owned());
    entries.set(name.clone(), value);

    resources_mut(doc, page_id)?.set(category, Object::Dictionary(entries));
    Ok(name)
}

/// Append a content stream to the page, isolating the existing content in a
/// `q`/`Q` pair so its graphics state cannot leak into the overlay.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), PdfEngineError> {
    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();

    let mut streams = match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut body = Vec::with_capacity(content.len() + 2);
    if !streams.is_empty() {
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        streams.insert(0, Object::Reference(open_id));
        body.extend_from_slice(b"Q\n");
    }
    body.extend(content);

    let mut stream = Stream::new(Dictionary::new(), body);
    let _ = stream.compress();
    let overlay_id = doc.add_object(stream);
    streams.push(Object::Reference(overlay_id));

    dict_mut(doc, page_id)?.set("Contents", Object::Array(streams));
    Ok(())
}
