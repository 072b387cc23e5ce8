use doc_model::SignatureImage;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::EditorError;

const INK: Rgba<u8> = Rgba([17, 24, 39, 255]);

/// Records pen strokes and rasterizes them onto a transparent PNG.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen_width: f32,
    strokes: Vec<Vec<(f32, f32)>>,
    drawing: bool,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(400, 200)
    }
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pen_width: 2.5,
            strokes: Vec::new(),
            drawing: false,
        }
    }

    pub fn with_pen_width(mut self, pen_width: f32) -> Self {
        self.pen_width = pen_width.max(1.0);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        self.strokes.push(vec![(x, y)]);
        self.drawing = true;
    }

    /// Ignored unless a stroke is in progress.
    pub fn extend_stroke(&mut self, x: f32, y: f32) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push((x, y));
        }
    }

    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    pub fn rasterize(&self) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 0]));
        let radius = self.pen_width / 2.0;
        let bounds = (
            (-radius, -radius),
            (self.width as f32 + radius, self.height as f32 + radius),
        );

        for stroke in &self.strokes {
            let Some(&first) = stroke.first() else { continue };
            stamp(&mut canvas, first, radius);

            for pair in stroke.windows(2) {
                let Some((from, to)) = clip_segment(pair[0], pair[1], bounds) else { continue };
                stamp(&mut canvas, from, radius);

                let length = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
                let steps = (length / 0.5).ceil().max(1.0) as u32;
                for step in 1..=steps {
                    let t = step as f32 / steps as f32;
                    let point = (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
                    stamp(&mut canvas, point, radius);
                }
            }
        }

        canvas
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>, EditorError> {
        if self.is_empty() {
            return Err(EditorError::EmptySignature);
        }

        let mut png = Vec::new();
        self.rasterize().write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    pub fn to_image(&self) -> Result<SignatureImage, EditorError> {
        SignatureImage::from_png_bytes(self.to_png_bytes()?).map_err(EditorError::InvalidSignature)
    }

    /// The capture as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> Result<String, EditorError> {
        Ok(self.to_image()?.to_data_url())
    }
}

/// The part of the segment `from..to` inside the rectangle `bounds`, if any.
fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    ((min_x, min_y), (max_x, max_y)): ((f32, f32), (f32, f32)),
) -> Option<((f32, f32), (f32, f32))> {
    let (x0, y0) = (f64::from(from.0), f64::from(from.1));
    let (x1, y1) = (f64::from(to.0), f64::from(to.1));
    if ![x0, y0, x1, y1].iter().all(|value| value.is_finite()) {
        return None;
    }

    let (dx, dy) = (x1 - x0, y1 - y0);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, x0 - f64::from(min_x)),
        (dx, f64::from(max_x) - x0),
        (-dy, y0 - f64::from(min_y)),
        (dy, f64::from(max_y) - y0),
    ];

    for (direction, distance) in edges {
        if direction == 0.0 {
            if distance < 0.0 {
                return None;
            }
            continue;
        }

        let t = distance / direction;
        if direction < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return None;
        }
    }

    let at = |t: f64| ((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    Some((at(enter), at(exit)))
}

fn stamp(canvas: &mut RgbaImage, (cx, cy): (f32, f32), radius: f32) {
    let (width, height) = canvas.dimensions();
    let min_x = (cx - radius).floor().max(0.0) as u32;
    let min_y = (cy - radius).floor().max(0.0) as u32;
    let max_x = ((cx + radius).ceil().max(0.0) as u32).min(width.saturating_sub(1));
    let max_y = ((cy + radius).ceil().max(0.0) as u32).min(height.saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                canvas.put_pixel(x, y, INK);
            }
        }
    }
}
