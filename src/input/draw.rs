//! Freehand drawing surface
//!
//! Strokes are kept as point lists and only rasterised (with tiny-skia) when
//! the canvas contents are pulled at submit time.

use super::CanvasSource;
use crate::models::ImageData;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform,
};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 400;
pub const LINE_WIDTH: f32 = 4.0;
/// Largest accepted side, in pixels.
pub const MAX_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Rejects zero-sized canvases and anything larger than [`MAX_SIDE`] per side.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
        return Err(Error::Canvas(format!(
            "canvas must be between 1x1 and {}x{} pixels, got {}x{}",
            MAX_SIDE, MAX_SIDE, width, height
        )));
    }
    Ok(())
}

/// Drawing surface: white background, black round-capped ink.
#[derive(Debug, Clone)]
pub struct DrawCanvas {
    width: u32,
    height: u32,
    strokes: Vec<Vec<Point>>,
    /// Stroke under the pointer, not yet committed.
    current: Option<Vec<Point>>,
}

impl Default for DrawCanvas {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl DrawCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
            current: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Starts a new stroke. Non-finite points are ignored.
    pub fn begin_stroke(&mut self, point: Point) {
        self.end_stroke();
        if point.is_finite() {
            self.current = Some(vec![point]);
        }
    }

    /// Extends the stroke in progress. Ignored when no stroke was begun or
    /// the point is non-finite.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(current) = self.current.as_mut() {
            if point.is_finite() {
                current.push(point);
            }
        }
    }

    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.current.take() {
            self.strokes.push(stroke);
        }
    }

    /// Adds a finished stroke in one go. Non-finite points are dropped, and
    /// so is a stroke left with no points.
    pub fn add_stroke(&mut self, mut points: Vec<Point>) {
        points.retain(Point::is_finite);
        if !points.is_empty() {
            self.strokes.push(points);
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len() + usize::from(self.current.is_some())
    }

    /// True when no stroke can leave ink on the canvas.
    pub fn is_blank(&self) -> bool {
        !self
            .strokes
            .iter()
            .chain(self.current.iter())
            .any(|points| self.reaches_canvas(points))
    }

    /// Whether the stroke's bounds, widened by the pen radius, overlap the
    /// canvas.
    fn reaches_canvas(&self, points: &[Point]) -> bool {
        let Some(first) = points.first() else {
            return false;
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let radius = LINE_WIDTH / 2.0;
        max_x + radius > 0.0
            && max_y + radius > 0.0
            && min_x - radius < self.width as f32
            && min_y - radius < self.height as f32
    }

    /// Rasterise every stroke, including the one in progress, to PNG bytes.
    pub fn render_png(&self) -> Result<Vec<u8>> {
        check_dimensions(self.width, self.height)?;
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or_else(|| {
            Error::Canvas(format!(
                "cannot allocate a {}x{} canvas",
                self.width, self.height
            ))
        })?;
        pixmap.fill(Color::WHITE);

        let mut paint = Paint::default();
        paint.set_color(Color::BLACK);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: LINE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        for points in self.strokes.iter().chain(self.current.iter()) {
            match points.as_slice() {
                [] => {}
                [dot] => {
                    // A tap leaves a dot.
                    if let Some(path) = PathBuilder::from_circle(dot.x, dot.y, LINE_WIDTH / 2.0) {
                        pixmap.fill_path(
                            &path,
                            &paint,
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
                [first, rest @ ..] => {
                    let mut builder = PathBuilder::new();
                    builder.move_to(first.x, first.y);
                    for p in rest {
                        builder.line_to(p.x, p.y);
                    }
                    if let Some(path) = builder.finish() {
                        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                    }
                }
            }
        }

        pixmap
            .encode_png()
            .map_err(|e| Error::Canvas(format!("PNG encoding failed: {}", e)))
    }
}

impl CanvasSource for DrawCanvas {
    fn canvas_data(&self) -> Result<Option<ImageData>> {
        if self.is_blank() {
            return Ok(None);
        }

        let png = self.render_png()?;
        tracing::debug!(
            "Captured canvas with {} strokes ({} bytes)",
            self.stroke_count(),
            png.len()
        );
        Ok(Some(ImageData::from_bytes("image/png", &png)))
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

/// Serialized drawing, e.g. `{"strokes": [[[10, 10], [40, 40]]]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sketch {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub strokes: Vec<Vec<[f32; 2]>>,
}

impl Sketch {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let sketch: Sketch = serde_json::from_str(&json)?;
        check_dimensions(sketch.width, sketch.height)?;
        Ok(sketch)
    }

    pub fn into_canvas(self) -> DrawCanvas {
        let mut canvas = DrawCanvas::new(self.width, self.height);
        self.apply_to(&mut canvas);
        canvas
    }

    /// Replays the strokes onto an existing canvas, keeping its size.
    pub fn apply_to(&self, canvas: &mut DrawCanvas) {
        for stroke in &self.strokes {
            canvas.add_stroke(stroke.iter().map(|[x, y]| Point::new(*x, *y)).collect());
        }
    }
}
