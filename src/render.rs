//! Rendering of normalized results onto image copies.
//!
//! This module draws labeled bounding boxes, segmentation polygons, and OCR
//! quad boxes on top of a source image. The source is never mutated: every
//! entry point clones it and annotates the clone at native resolution.
//!
//! Polygon and quad colors are drawn per label group from a fixed palette of
//! 19 named colors. The default picker draws uniformly at random, so repeated
//! renders of the same input need not reproduce the same colors; tests should
//! only assert palette membership. A deterministic picker can be substituted
//! through the [`ColorPicker`] trait.

use crate::error::{AnalyzeError, VizResult};
use crate::geometry::{BoundingBox, Point};
use crate::normalize::{LabeledBox, LabeledQuad, PolygonGroup};
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut,
};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;
use rand::Rng;
use std::path::Path;
use tracing::{debug, info, warn};

/// Stroke color for bounding boxes.
const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Label color for bounding boxes.
const BOX_LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Label offset from a polygon's or quad's first vertex.
const LABEL_OFFSET: (f32, f32) = (8.0, 2.0);

/// The fixed palette of named colors for polygon and quad rendering.
pub const PALETTE: [Rgb<u8>; 19] = [
    Rgb([0, 0, 255]),     // blue
    Rgb([255, 165, 0]),   // orange
    Rgb([0, 128, 0]),     // green
    Rgb([128, 0, 128]),   // purple
    Rgb([165, 42, 42]),   // brown
    Rgb([255, 192, 203]), // pink
    Rgb([128, 128, 128]), // gray
    Rgb([128, 128, 0]),   // olive
    Rgb([0, 255, 255]),   // cyan
    Rgb([255, 0, 0]),     // red
    Rgb([0, 255, 0]),     // lime
    Rgb([75, 0, 130]),    // indigo
    Rgb([238, 130, 238]), // violet
    Rgb([0, 255, 255]),   // aqua
    Rgb([255, 0, 255]),   // magenta
    Rgb([255, 127, 80]),  // coral
    Rgb([255, 215, 0]),   // gold
    Rgb([210, 180, 140]), // tan
    Rgb([135, 206, 235]), // skyblue
];

/// Strategy for choosing a shape color per label group.
pub trait ColorPicker {
    /// Picks the color for the next label group.
    fn pick(&mut self) -> Rgb<u8>;
}

/// Default picker: a uniform random draw from [`PALETTE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformPalette;

impl ColorPicker for UniformPalette {
    fn pick(&mut self) -> Rgb<u8> {
        PALETTE[rand::thread_rng().gen_range(0..PALETTE.len())]
    }
}

/// Configuration for overlay rendering.
///
/// Holds the font and stroke settings that control how annotations are
/// drawn. When no font is available, label text is skipped and only
/// geometry is drawn.
pub struct RenderConfig {
    /// The font to use for label rendering. If None, text rendering is skipped.
    pub font: Option<FontVec>,

    /// The scale factor for the font. Defaults to 16.0.
    pub font_scale: f32,

    /// The stroke width of bounding box outlines. Defaults to 2.
    pub box_thickness: i32,

    /// The stroke width of quad box outlines. Defaults to 3.
    pub quad_thickness: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 16.0,
            box_thickness: 2,
            quad_thickness: 3,
        }
    }
}

impl RenderConfig {
    /// Creates a RenderConfig with a font loaded from the specified path.
    pub fn with_font_path(font_path: &Path) -> VizResult<Self> {
        let font_data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| {
            AnalyzeError::font(format!("failed to parse font file: {}", font_path.display()))
        })?;

        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Creates a RenderConfig with a system font.
    ///
    /// Attempts to load a font from common system locations, falling back
    /// to the default (no font, labels skipped) when none is found.
    pub fn with_system_font() -> Self {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(font_data)
            {
                info!("Loaded system font: {}", path);
                return Self {
                    font: Some(font),
                    ..Self::default()
                };
            }
        }

        debug!("No system font found, label rendering will be skipped");
        Self::default()
    }
}

/// Renders labeled bounding boxes onto a copy of the image.
///
/// Each box is drawn as a hollow red rectangle; a non-empty label is drawn
/// in white at the box's top-left corner.
pub fn render_boxes(image: &RgbImage, boxes: &[LabeledBox], config: &RenderConfig) -> RgbImage {
    let mut canvas = image.clone();
    let bounds = (canvas.width() as i32, canvas.height() as i32);

    for item in boxes {
        draw_box_outline(&mut canvas, &item.bbox, config.box_thickness, bounds);
        if !item.label.is_empty() {
            draw_label(
                &mut canvas,
                config,
                &item.label,
                BOX_LABEL_COLOR,
                item.bbox.x1 as i32,
                item.bbox.y1 as i32,
                bounds,
            );
        }
    }

    canvas
}

/// Renders labeled polygon groups onto a copy of the image.
///
/// One color is picked per label group, so all polygons sharing a label
/// share a color. The boundary is always outlined; `fill` additionally
/// paints the interior with the group color. Degenerate polygons are
/// skipped with a diagnostic.
pub fn render_polygons(
    image: &RgbImage,
    groups: &[PolygonGroup],
    fill: bool,
    config: &RenderConfig,
    colors: &mut dyn ColorPicker,
) -> RgbImage {
    let mut canvas = image.clone();
    let bounds = (canvas.width() as i32, canvas.height() as i32);

    for group in groups {
        let color = colors.pick();
        for polygon in &group.polygons {
            if polygon.is_degenerate() {
                warn!(label = %group.label, "degenerate polygon, not drawn");
                continue;
            }

            if fill {
                fill_polygon(&mut canvas, &polygon.points, color);
            }
            draw_closed_outline(&mut canvas, &polygon.points, 1, color);

            if !group.label.is_empty() {
                let first = polygon.points[0];
                draw_label(
                    &mut canvas,
                    config,
                    &group.label,
                    color,
                    (first.x + LABEL_OFFSET.0) as i32,
                    (first.y + LABEL_OFFSET.1) as i32,
                    bounds,
                );
            }
        }
    }

    canvas
}

/// Renders labeled quad boxes onto a copy of the image.
///
/// Each quad gets its own palette color and a closed 4-point outline with
/// a thicker stroke; the label is drawn near the first vertex.
pub fn render_quad_boxes(
    image: &RgbImage,
    quads: &[LabeledQuad],
    config: &RenderConfig,
    colors: &mut dyn ColorPicker,
) -> RgbImage {
    let mut canvas = image.clone();
    let bounds = (canvas.width() as i32, canvas.height() as i32);

    for item in quads {
        let color = colors.pick();
        draw_closed_outline(&mut canvas, &item.quad.points, config.quad_thickness, color);

        if !item.label.is_empty() {
            let first = item.quad.points[0];
            draw_label(
                &mut canvas,
                config,
                &item.label,
                color,
                (first.x + LABEL_OFFSET.0) as i32,
                (first.y + LABEL_OFFSET.1) as i32,
                bounds,
            );
        }
    }

    canvas
}

/// Draws a hollow rectangle with the given stroke width.
///
/// The rectangle covers both corner coordinates inclusively, matching the
/// half-open-rectangle semantics downstream. The stroke grows outward from
/// the base rectangle; rings that would leave the image are skipped.
/// Zero-area boxes still produce a minimal 1px rect.
fn draw_box_outline(canvas: &mut RgbImage, bbox: &BoundingBox, thickness: i32, bounds: (i32, i32)) {
    let (img_width, img_height) = bounds;
    let width = bbox.width().round() as u32 + 1;
    let height = bbox.height().round() as u32 + 1;
    let base = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(width, height);

    for t in 0..thickness {
        let ring = Rect::at(base.left() - t, base.top() - t)
            .of_size(base.width() + (2 * t) as u32, base.height() + (2 * t) as u32);

        if is_rect_in_bounds(&ring, img_width, img_height) {
            draw_hollow_rect_mut(canvas, ring, BOX_COLOR);
        }
    }
}

/// Draws a closed outline through the given vertices.
///
/// Stroke width is approximated by repeating the segment at one-pixel
/// offsets along both axes; out-of-bounds pixels are clipped by imageproc.
fn draw_closed_outline(canvas: &mut RgbImage, points: &[Point], thickness: i32, color: Rgb<u8>) {
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        for t in 0..thickness.max(1) {
            let off = t as f32;
            draw_line_segment_mut(canvas, (a.x + off, a.y), (b.x + off, b.y), color);
            draw_line_segment_mut(canvas, (a.x, a.y + off), (b.x, b.y + off), color);
        }
    }
}

/// Fills the polygon interior.
fn fill_polygon(canvas: &mut RgbImage, points: &[Point], color: Rgb<u8>) {
    let mut pixels: Vec<PixelPoint<i32>> =
        points.iter().map(Point::to_imageproc_point).collect();
    // imageproc rejects a closing point equal to the first
    if pixels.len() > 1 && pixels.first() == pixels.last() {
        pixels.pop();
    }
    if pixels.len() >= 3 {
        draw_polygon_mut(canvas, &pixels, color);
    }
}

/// Draws label text at the given position when a font is configured and the
/// anchor lies within the image.
fn draw_label(
    canvas: &mut RgbImage,
    config: &RenderConfig,
    text: &str,
    color: Rgb<u8>,
    x: i32,
    y: i32,
    bounds: (i32, i32),
) {
    let Some(ref font) = config.font else { return };
    let (img_width, img_height) = bounds;

    if x >= 0 && y >= 0 && x < img_width && y < img_height {
        draw_text_mut(canvas, color, x, y, config.font_scale, font, text);
    }
}

/// Checks that all sides of a rectangle lie within the image.
fn is_rect_in_bounds(rect: &Rect, img_width: i32, img_height: i32) -> bool {
    rect.left() >= 0
        && rect.top() >= 0
        && rect.right() < img_width
        && rect.bottom() < img_height
}
