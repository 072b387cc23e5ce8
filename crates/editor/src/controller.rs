use doc_model::{
    ActiveTool, AnnotationRef, AnnotationStore, DragSession, EditorConfig, ModelError,
    PendingPlacement, SignatureAnnotation, SignatureImage, TextAnnotation,
};
use pdf_engine::{LopdfMutator, PageSurface, PdfEngine, PdfMutator, RenderRequest};
use viewer_core::{clamp_page, to_document_space, to_screen_length, to_screen_space, DocPoint};
use viewer_core::{ScreenPoint, Zoom};

use crate::error::{EditorError, Notice};
use crate::export::{export_annotations, ExportedFile};
use crate::signature_pad::SignaturePad;
use crate::source::{
    is_pdf_mime, DocumentSource, LoadOutcome, LoadTicket, LoadedDocument, UploadedFile,
};

/// What an overlay draws, in screen units for the zoom it was built at.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    Text { text: String, font_size_px: f64 },
    Signature { width_px: f64, height_px: f64 },
}

/// One annotation positioned over the rendered page surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub target: AnnotationRef,
    pub origin: ScreenPoint,
    pub kind: OverlayKind,
}

#[derive(Debug, Clone)]
pub struct PageView {
    /// 1-based.
    pub page: u32,
    pub zoom: Zoom,
    pub surface: PageSurface,
    pub overlays: Vec<Overlay>,
}

/// One editing session: the loaded document, its annotations and the
/// pointer-driven placement state machine.
///
/// Every state change bumps [`Editor::revision`], which a host compares
/// against the value it last drew to decide whether to redraw.
#[derive(Debug)]
pub struct Editor<E: PdfEngine> {
    engine: E,
    config: EditorConfig,
    source: DocumentSource,
    store: AnnotationStore,
    tool: ActiveTool,
    drag: Option<DragSession>,
    pending: Option<PendingPlacement>,
    page: u32,
    zoom: Zoom,
    generation: u64,
    revision: u64,
    notices: Vec<Notice>,
}

impl<E: PdfEngine> Editor<E> {
    pub fn new(engine: E, config: EditorConfig) -> Result<Self, EditorError> {
        config.validate()?;
        Ok(Self::build(engine, config))
    }

    pub fn with_defaults(engine: E) -> Self {
        Self::build(engine, EditorConfig::default())
    }

    fn build(engine: E, config: EditorConfig) -> Self {
        let zoom = config.zoom.initial_zoom();

        Self {
            engine,
            config,
            source: DocumentSource::Empty,
            store: AnnotationStore::new(),
            tool: ActiveTool::None,
            drag: None,
            pending: None,
            page: 1,
            zoom,
            generation: 0,
            revision: 0,
            notices: Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn active_tool(&self) -> ActiveTool {
        self.tool
    }

    pub fn drag_session(&self) -> Option<DragSession> {
        self.drag
    }

    pub fn pending_placement(&self) -> Option<PendingPlacement> {
        self.pending
    }

    /// 1-based.
    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.source.document().map_or(0, LoadedDocument::page_count)
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn document(&self) -> Result<&LoadedDocument, EditorError> {
        self.source.document().ok_or(EditorError::NoDocument)
    }

    fn reset_session(&mut self) {
        self.store = AnnotationStore::new();
        self.tool = ActiveTool::None;
        self.drag = None;
        self.pending = None;
        self.page = 1;
    }

    // Upload

    /// Validate the declared type of an incoming file and reserve the right
    /// to commit it. A non-PDF is rejected here and nothing else changes.
    pub fn begin_upload(&mut self, name: &str, mime: &str) -> Result<LoadTicket, EditorError> {
        if !is_pdf_mime(mime) {
            tracing::warn!(name, mime, "rejected upload");
            self.notices.push(Notice::error(format!("{name} is not a PDF file")));
            return Err(EditorError::UnsupportedMime(mime.to_owned()));
        }

        self.generation += 1;
        tracing::debug!(name, generation = self.generation, "upload started");
        Ok(LoadTicket { generation: self.generation, name: name.to_owned() })
    }

    /// Parse the bytes behind `ticket` and make them the current document,
    /// unless a newer upload has started since.
    pub fn complete_upload(
        &mut self,
        ticket: LoadTicket,
        bytes: Vec<u8>,
    ) -> Result<LoadOutcome, EditorError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                name = %ticket.name,
                generation = ticket.generation,
                newest = self.generation,
                "discarding superseded upload"
            );
            return Ok(LoadOutcome::Superseded);
        }

        let LoadTicket { name, .. } = ticket;
        match LoadedDocument::open(&mut self.engine, name.clone(), bytes) {
            Ok(doc) => {
                let page_count = doc.page_count();
                self.source.replace(&mut self.engine, DocumentSource::Ready(doc));
                self.reset_session();
                self.touch();

                tracing::info!(name = %name, page_count, "document loaded");
                self.notices.push(Notice::info(format!("Loaded {name} ({page_count} pages)")));
                Ok(LoadOutcome::Loaded { page_count })
            }
            Err(source) => {
                let failed =
                    DocumentSource::Failed { name: name.clone(), reason: source.to_string() };
                self.source.replace(&mut self.engine, failed);
                self.reset_session();
                self.touch();

                tracing::warn!(name = %name, %source, "document failed to load");
                self.notices.push(Notice::error(format!("Could not open {name}: {source}")));
                Err(EditorError::Load { name, source })
            }
        }
    }

    pub fn upload(&mut self, file: UploadedFile) -> Result<LoadOutcome, EditorError> {
        let ticket = self.begin_upload(&file.name, &file.mime)?;
        self.complete_upload(ticket, file.bytes)
    }

    /// Release the document and forget everything placed on it.
    /// Release the document. Uploads begun before this point can no longer
    /// commit.
    pub fn end_session(&mut self) {
        self.generation += 1;
        self.source.replace(&mut self.engine, DocumentSource::Empty);
        self.reset_session();
        self.touch();
    }

    // Placement

    /// Changing tools abandons any placement still waiting on its prompt.
    pub fn select_tool(&mut self, tool: ActiveTool) {
        self.tool = tool;
        self.pending = None;
        self.touch();
    }

    /// A click on the displayed page. Opens the prompt for the active tool,
    /// or does nothing when no tool is active or a prompt is already open.
    pub fn click_page(&mut self, point: ScreenPoint) -> Option<PendingPlacement> {
        if self.pending.is_some() || !self.source.is_ready() {
            return None;
        }

        let position = to_document_space(point, self.zoom);
        let pending = match self.tool {
            ActiveTool::None => return None,
            ActiveTool::PlaceText => PendingPlacement::Text { page: self.page, position },
            ActiveTool::PlaceSignature => {
                PendingPlacement::Signature { page: self.page, position: Some(position) }
            }
        };

        tracing::debug!(?pending, "placement opened");
        self.pending = Some(pending);
        self.touch();
        Some(pending)
    }

    /// Open the signature prompt without a page click. The signature lands
    /// in the middle of the current page when committed.
    pub fn open_signature_capture(&mut self) -> Result<PendingPlacement, EditorError> {
        self.document()?;

        let pending = PendingPlacement::Signature { page: self.page, position: None };
        self.tool = ActiveTool::PlaceSignature;
        self.pending = Some(pending);
        self.touch();
        Ok(pending)
    }

    /// Commit the open text prompt. Blank text cancels the placement.
    pub fn commit_text(&mut self, text: &str) -> Result<AnnotationRef, EditorError> {
        let Some(PendingPlacement::Text { page, position }) = self.pending else {
            return Err(EditorError::NoPendingPlacement);
        };

        if text.trim().is_empty() {
            self.cancel_placement();
            return Err(EditorError::EmptyText);
        }

        let target = self.store.push_text(TextAnnotation {
            position,
            text: text.to_owned(),
            page,
            font_size: self.config.text.default_font_size,
        });
        self.finish_placement(target);
        Ok(target)
    }

    /// Commit the open signature prompt with a `data:image/...` URL. An
    /// empty capture cancels the placement; a malformed URL leaves the
    /// prompt open.
    pub fn commit_signature(&mut self, data_url: &str) -> Result<AnnotationRef, EditorError> {
        if !matches!(self.pending, Some(PendingPlacement::Signature { .. })) {
            return Err(EditorError::NoPendingPlacement);
        }

        match SignatureImage::from_data_url(data_url) {
            Ok(image) => self.place_signature(image),
            Err(ModelError::EmptyImage) => {
                self.cancel_placement();
                Err(EditorError::EmptySignature)
            }
            Err(err) => Err(EditorError::InvalidSignature(err)),
        }
    }

    /// Commit the open signature prompt straight from a pad.
    pub fn commit_signature_pad(
        &mut self,
        pad: &SignaturePad,
    ) -> Result<AnnotationRef, EditorError> {
        if !matches!(self.pending, Some(PendingPlacement::Signature { .. })) {
            return Err(EditorError::NoPendingPlacement);
        }

        if pad.is_empty() {
            self.cancel_placement();
            return Err(EditorError::EmptySignature);
        }

        let image = pad.to_image()?;
        self.place_signature(image)
    }

    fn place_signature(&mut self, image: SignatureImage) -> Result<AnnotationRef, EditorError> {
        let Some(PendingPlacement::Signature { page, position }) = self.pending else {
            return Err(EditorError::NoPendingPlacement);
        };

        let rules = &self.config.signature;
        let position = match position {
            Some(position) => position,
            None => {
                let size = self.document()?.page_size(page).ok_or(EditorError::NoDocument)?;
                DocPoint::new(
                    f64::from(size.width_pt) / 2.0 - rules.default_width / 2.0,
                    f64::from(size.height_pt) / 2.0 - rules.default_height / 2.0,
                )
            }
        };

        let target = self.store.push_signature(SignatureAnnotation {
            position,
            image,
            width: rules.default_width,
            height: rules.default_height,
            page,
        });
        self.finish_placement(target);
        Ok(target)
    }

    fn finish_placement(&mut self, target: AnnotationRef) {
        tracing::debug!(?target, "annotation placed");
        self.pending = None;
        self.tool = ActiveTool::None;
        self.touch();
    }

    pub fn cancel_placement(&mut self) {
        self.pending = None;
        self.tool = ActiveTool::None;
        self.touch();
    }

    // Dragging

    /// Start moving `target`. Works whatever tool is active; a drag that is
    /// still open is replaced.
    pub fn pointer_down_on(&mut self, target: AnnotationRef) -> Result<(), EditorError> {
        if !self.store.contains(target) {
            return Err(EditorError::UnknownAnnotation(target));
        }

        self.drag = Some(DragSession { target });
        self.touch();
        Ok(())
    }

    /// Move the dragged annotation to `point`, given relative to the origin of
    /// the whole document surface. Returns whether anything moved.
    pub fn pointer_move(&mut self, point: ScreenPoint) -> bool {
        let Some(DragSession { target }) = self.drag else {
            return false;
        };

        let moved = self.store.set_position(target, to_document_space(point, self.zoom));
        if moved {
            self.touch();
        }
        moved
    }

    pub fn pointer_up(&mut self) {
        if self.drag.take().is_some() {
            self.touch();
        }
    }

    // Resizing

    pub fn increase_font_size(&mut self, index: usize) -> Result<u32, EditorError> {
        let text = self
            .store
            .text_mut(index)
            .ok_or(EditorError::UnknownAnnotation(AnnotationRef::text(index)))?;
        text.increase_font_size();
        let size = text.font_size;
        self.touch();
        Ok(size)
    }

    pub fn decrease_font_size(&mut self, index: usize) -> Result<u32, EditorError> {
        let text = self
            .store
            .text_mut(index)
            .ok_or(EditorError::UnknownAnnotation(AnnotationRef::text(index)))?;
        text.decrease_font_size(&self.config.text);
        let size = text.font_size;
        self.touch();
        Ok(size)
    }

    pub fn grow_signature(&mut self, index: usize) -> Result<(f64, f64), EditorError> {
        let signature = self
            .store
            .signature_mut(index)
            .ok_or(EditorError::UnknownAnnotation(AnnotationRef::signature(index)))?;
        signature.grow(&self.config.signature);
        let size = (signature.width, signature.height);
        self.touch();
        Ok(size)
    }

    pub fn shrink_signature(&mut self, index: usize) -> Result<(f64, f64), EditorError> {
        let signature = self
            .store
            .signature_mut(index)
            .ok_or(EditorError::UnknownAnnotation(AnnotationRef::signature(index)))?;
        signature.shrink(&self.config.signature);
        let size = (signature.width, signature.height);
        self.touch();
        Ok(size)
    }

    // View

    pub fn zoom_in(&mut self) -> Zoom {
        self.apply_zoom(self.config.zoom.step_in(self.zoom))
    }

    pub fn zoom_out(&mut self) -> Zoom {
        self.apply_zoom(self.config.zoom.step_out(self.zoom))
    }

    /// Out-of-range factors are clamped.
    pub fn set_zoom(&mut self, factor: f64) -> Zoom {
        self.apply_zoom(self.config.zoom.clamp(factor))
    }

    /// Zoom so the current page fills `viewport_width_px`.
    pub fn fit_width(&mut self, viewport_width_px: f64) -> Result<Zoom, EditorError> {
        let size = self.document()?.page_size(self.page).ok_or(EditorError::NoDocument)?;
        let zoom = self.config.zoom.fit_width(viewport_width_px, f64::from(size.width_pt));
        Ok(self.apply_zoom(zoom))
    }

    /// Zoom so the whole current page fits the viewport.
    pub fn fit_page(
        &mut self,
        viewport_width_px: f64,
        viewport_height_px: f64,
    ) -> Result<Zoom, EditorError> {
        let size = self.document()?.page_size(self.page).ok_or(EditorError::NoDocument)?;
        let zoom = self.config.zoom.fit_page(
            viewport_width_px,
            viewport_height_px,
            f64::from(size.width_pt),
            f64::from(size.height_pt),
        );
        Ok(self.apply_zoom(zoom))
    }

    fn apply_zoom(&mut self, zoom: Zoom) -> Zoom {
        if zoom != self.zoom {
            self.zoom = zoom;
            self.touch();
        }
        self.zoom
    }

    /// Jump to a 1-based page, clamped to the document.
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        let page = clamp_page(page, self.page_count());
        if page != self.page {
            self.page = page;
            self.touch();
        }
        self.page
    }

    pub fn next_page(&mut self) -> u32 {
        self.go_to_page(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> u32 {
        self.go_to_page(self.page.saturating_sub(1))
    }

    /// Annotations on the current page, positioned for the current zoom.
    pub fn overlays(&self) -> Vec<Overlay> {
        let zoom = self.zoom;

        let texts = self.store.texts_on_page(self.page).map(|(index, text)| Overlay {
            target: AnnotationRef::text(index),
            origin: to_screen_space(text.position, zoom),
            kind: OverlayKind::Text {
                text: text.text.clone(),
                font_size_px: to_screen_length(f64::from(text.font_size), zoom),
            },
        });

        let signatures = self.store.signatures_on_page(self.page).map(|(index, signature)| Overlay {
            target: AnnotationRef::signature(index),
            origin: to_screen_space(signature.position, zoom),
            kind: OverlayKind::Signature {
                width_px: to_screen_length(signature.width, zoom),
                height_px: to_screen_length(signature.height, zoom),
            },
        });

        texts.chain(signatures).collect()
    }

    /// Render the current page at the current zoom with its overlays.
    pub fn render(&self) -> Result<PageView, EditorError> {
        let doc = self.document()?;
        let surface = self.engine.render_page(
            doc.handle(),
            RenderRequest { page_index: self.page - 1, zoom: self.zoom.factor() as f32 },
        )?;

        Ok(PageView { page: self.page, zoom: self.zoom, surface, overlays: self.overlays() })
    }

    // Export

    pub fn export(&mut self) -> Result<ExportedFile, EditorError> {
        self.export_with::<LopdfMutator>()
    }

    /// Export through a specific mutator. The annotations are left as they
    /// were whatever the outcome, so a failed export can be retried.
    pub fn export_with<M: PdfMutator>(&mut self) -> Result<ExportedFile, EditorError> {
        let doc = self.document()?;
        match export_annotations::<M>(doc.bytes(), doc.name(), &self.store, &self.config) {
            Ok(file) => {
                self.notices.push(Notice::info(format!("Saved {}", file.file_name)));
                Ok(file)
            }
            Err(err) => {
                tracing::warn!(error = ?err, "export failed");
                self.notices.push(Notice::error("Export failed, please try again"));
                Err(err.into())
            }
        }
    }
}

impl<E: PdfEngine> Drop for Editor<E> {
    fn drop(&mut self) {
        self.source.replace(&mut self.engine, DocumentSource::Empty);
    }
}
