//! # Raster Output
//!
//! Composites overlay nodes onto a page image and encodes the result as PNG.
//!
//! ```text
//! page PNG bytes ─▶ decode + resize to page_size(scale) ─┐
//!                   (white page when missing/undecodable) ├─▶ RgbaImage ─▶ PNG
//! Vec<RenderNode> ─▶ text (ab_glyph) / grid / signature ──┘
//! ```
//!
//! Text needs a TTF/OTF font; without one, text nodes are skipped and only
//! grids and images are drawn.

use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use base64::Engine;
use image::{ImageEncoder, Rgba, RgbaImage};
use rayon::prelude::*;

use super::{NodeKind, RenderNode, RenderedPage, TableNode};
use crate::error::DocflowError;
use crate::layout::{ScreenRect, contain, page_size};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: [u8; 3] = [0, 0, 0];
const PLACEHOLDER_INK: [u8; 3] = [156, 163, 175];
const GRID_INK: [u8; 3] = [0, 0, 0];

/// Decode the payload of a `data:image/...;base64,` URI.
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, DocflowError> {
    let (header, payload) = data_uri
        .split_once(',')
        .ok_or_else(|| DocflowError::Image("data URI has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(DocflowError::Image(format!(
            "unsupported data URI encoding: {}",
            header
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DocflowError::Image(e.to_string()))
}

/// Encode an RGBA image as PNG.
pub fn to_png(img: &RgbaImage) -> Result<Vec<u8>, DocflowError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e: image::ImageError| DocflowError::Image(e.to_string()))?;
    Ok(png_bytes)
}

fn pixel_size(scale: f64) -> (u32, u32) {
    let (w, h) = page_size(scale);
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Draws pages with their overlays.
#[derive(Clone, Default)]
pub struct PageCompositor {
    font: Option<FontArc>,
}

impl std::fmt::Debug for PageCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCompositor")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl PageCompositor {
    /// Compositor without a font (text nodes are skipped).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TTF/OTF font from disk.
    pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DocflowError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            DocflowError::Render(format!("invalid font {}: {}", path.display(), e))
        })?;
        tracing::debug!("[raster] loaded font {}", path.display());
        Ok(Self::with_font(font))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Page background at `scale`: the decoded page image resized to the
    /// page size, or a blank white page.
    pub fn background(&self, bytes: Option<&[u8]>, scale: f64) -> RgbaImage {
        let (width, height) = pixel_size(scale);
        let Some(bytes) = bytes else {
            return RgbaImage::from_pixel(width, height, WHITE);
        };
        match image::load_from_memory(bytes) {
            Ok(img) => image::imageops::resize(
                &img.to_rgba8(),
                width,
                height,
                image::imageops::FilterType::Triangle,
            ),
            Err(e) => {
                tracing::warn!("[raster] page image could not be decoded ({}), using blank page", e);
                RgbaImage::from_pixel(width, height, WHITE)
            }
        }
    }

    /// Draw `nodes` over the given page image.
    pub fn compose(&self, background: Option<&[u8]>, scale: f64, nodes: &[RenderNode]) -> RgbaImage {
        let mut canvas = self.background(background, scale);
        for node in nodes {
            match &node.kind {
                NodeKind::Text {
                    text,
                    font_size,
                    placeholder,
                    ..
                } => {
                    let ink = if *placeholder { PLACEHOLDER_INK } else { INK };
                    self.draw_text(&mut canvas, &node.rect, text, *font_size, ink);
                }
                NodeKind::SignaturePlaceholder { text } => {
                    let size = (node.rect.height * 0.35).max(1.0);
                    self.draw_text(&mut canvas, &node.rect, text, size, PLACEHOLDER_INK);
                }
                NodeKind::Image { data_uri } => {
                    if let Err(e) = draw_data_uri(&mut canvas, &node.rect, data_uri) {
                        tracing::warn!("[raster] signature for '{}' not drawn: {}", node.field_id, e);
                    }
                }
                NodeKind::Table(table) => self.draw_table(&mut canvas, table),
            }
        }
        canvas
    }

    /// Composite one page and encode it as PNG.
    pub fn render_png(&self, background: Option<&[u8]>, page: &RenderedPage) -> Result<Vec<u8>, DocflowError> {
        to_png(&self.compose(background, page.scale, &page.nodes))
    }

    /// Render several pages in parallel; results keep page order.
    pub fn render_pages(
        &self,
        pages: &[(Option<Vec<u8>>, RenderedPage)],
    ) -> Vec<Result<Vec<u8>, DocflowError>> {
        pages
            .par_iter()
            .map(|(background, page)| self.render_png(background.as_deref(), page))
            .collect()
    }

    fn draw_table(&self, canvas: &mut RgbaImage, table: &TableNode) {
        for cell in table.header.iter().flatten() {
            stroke_rect(canvas, &cell.rect, GRID_INK);
            self.draw_text(canvas, &cell.rect, &cell.text, table.font_size, INK);
        }
        for cell in table.cells() {
            stroke_rect(canvas, &cell.rect, GRID_INK);
            self.draw_text(canvas, &cell.rect, &cell.text, table.font_size, INK);
        }
    }

    /// Draw `text` centered in `rect`, one line per `\n`, clipped to the rect.
    fn draw_text(&self, canvas: &mut RgbaImage, rect: &ScreenRect, text: &str, size: f64, ink: [u8; 3]) {
        if text.is_empty() || size <= 0.0 {
            return;
        }
        let Some(font) = &self.font else {
            tracing::debug!("[raster] no font configured, skipping text '{}'", text);
            return;
        };

        let px_scale = PxScale::from(size as f32);
        let scaled = font.as_scaled(px_scale);
        let line_height = scaled.ascent() - scaled.descent() + scaled.line_gap();
        let lines: Vec<&str> = text.lines().collect();
        let block_height = line_height * lines.len() as f32;
        let mut top = rect.top as f32 + (rect.height as f32 - block_height) / 2.0;

        let clip = rect.snapped();
        for line in lines {
            let width: f32 = line.chars().map(|ch| scaled.h_advance(font.glyph_id(ch))).sum();
            let mut caret = rect.left as f32 + (rect.width as f32 - width) / 2.0;
            let baseline = top + scaled.ascent();

            for ch in line.chars() {
                let glyph_id = font.glyph_id(ch);
                let glyph = glyph_id.with_scale_and_position(px_scale, ab_glyph::point(caret, baseline));
                caret += scaled.h_advance(glyph_id);

                if let Some(outlined) = font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let x = gx as i64 + bounds.min.x as i64;
                        let y = gy as i64 + bounds.min.y as i64;
                        if (x as f64) < clip.left
                            || (x as f64) >= clip.right()
                            || (y as f64) < clip.top
                            || (y as f64) >= clip.bottom()
                        {
                            return;
                        }
                        blend(canvas, x, y, ink, coverage);
                    });
                }
            }
            top += line_height;
        }
    }
}

fn blend(canvas: &mut RgbaImage, x: i64, y: i64, ink: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for (channel, ink) in pixel.0.iter_mut().take(3).zip(ink) {
        *channel = (*channel as f32 * (1.0 - alpha) + ink as f32 * alpha).round() as u8;
    }
}

/// One-pixel outline of `rect`.
fn stroke_rect(canvas: &mut RgbaImage, rect: &ScreenRect, ink: [u8; 3]) {
    let r = rect.snapped();
    let (left, top) = (r.left as i64, r.top as i64);
    let (right, bottom) = (r.right() as i64 - 1, r.bottom() as i64 - 1);
    if right < left || bottom < top {
        return;
    }
    for x in left..=right {
        blend(canvas, x, top, ink, 1.0);
        blend(canvas, x, bottom, ink, 1.0);
    }
    for y in top..=bottom {
        blend(canvas, left, y, ink, 1.0);
        blend(canvas, right, y, ink, 1.0);
    }
}

/// Decode a signature image and draw it with contain fit inside `rect`.
fn draw_data_uri(canvas: &mut RgbaImage, rect: &ScreenRect, data_uri: &str) -> Result<(), DocflowError> {
    let bytes = decode_data_uri(data_uri)?;
    let img = image::load_from_memory(&bytes).map_err(|e| DocflowError::Image(e.to_string()))?;
    let fitted = contain(rect, img.width() as f64, img.height() as f64).snapped();
    let (w, h) = (fitted.width as u32, fitted.height as u32);
    if w == 0 || h == 0 {
        return Ok(());
    }
    let resized = image::imageops::resize(&img.to_rgba8(), w, h, image::imageops::FilterType::Triangle);
    image::imageops::overlay(canvas, &resized, fitted.left as i64, fitted.top as i64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CellNode;

    fn png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        to_png(&RgbaImage::from_pixel(width, height, color)).unwrap()
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn page(nodes: Vec<RenderNode>) -> RenderedPage {
        RenderedPage {
            page: 1,
            image: None,
            scale: 0.1,
            nodes,
        }
    }

    #[test]
    fn test_blank_page_size() {
        let img = PageCompositor::new().background(None, 0.1);
        assert_eq!(img.dimensions(), (124, 175));
        assert_eq!(*img.get_pixel(50, 50), WHITE);
    }

    #[test]
    fn test_background_resized_to_page() {
        let bytes = png(10, 10, Rgba([200, 10, 10, 255]));
        let img = PageCompositor::new().background(Some(&bytes), 0.1);
        assert_eq!(img.dimensions(), (124, 175));
        assert_eq!(*img.get_pixel(60, 80), Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_undecodable_background_falls_back_to_white() {
        let img = PageCompositor::new().background(Some(b"not an image"), 0.1);
        assert_eq!(img.dimensions(), (124, 175));
        assert_eq!(*img.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(decode_data_uri("data:image/png;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert!(decode_data_uri("data:image/png,raw").is_err());
        assert!(decode_data_uri("no-comma").is_err());
    }

    #[test]
    fn test_signature_image_contained() {
        // 2:1 image in a 40x40 box → 40x20 band centered vertically
        let signature = data_uri(&png(20, 10, Rgba([0, 0, 255, 255])));
        let node = RenderNode {
            field_id: "sig".into(),
            rect: ScreenRect::new(10.0, 10.0, 40.0, 40.0),
            kind: NodeKind::Image { data_uri: signature },
            focus: None,
        };
        let img = PageCompositor::new().compose(None, 0.1, &[node]);
        assert_eq!(*img.get_pixel(30, 30), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(30, 12), WHITE);
        assert_eq!(*img.get_pixel(30, 48), WHITE);
    }

    #[test]
    fn test_broken_signature_is_skipped() {
        let node = RenderNode {
            field_id: "sig".into(),
            rect: ScreenRect::new(0.0, 0.0, 40.0, 40.0),
            kind: NodeKind::Image {
                data_uri: "data:image/png;base64,AAAA".into(),
            },
            focus: None,
        };
        let img = PageCompositor::new().compose(None, 0.1, &[node]);
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_table_grid_lines() {
        let cell = |row, col, left, top| CellNode {
            row,
            col,
            rect: ScreenRect::new(left, top, 20.0, 10.0),
            text: "x".into(),
            focus: None,
        };
        let node = RenderNode {
            field_id: "t".into(),
            rect: ScreenRect::new(10.0, 10.0, 40.0, 10.0),
            kind: NodeKind::Table(TableNode {
                header: None,
                rows: vec![vec![cell(0, 0, 10.0, 10.0), cell(0, 1, 30.0, 10.0)]],
                font_size: 10.0,
                font_family: "Arial".into(),
            }),
            focus: None,
        };
        let img = PageCompositor::new().compose(None, 0.1, &[node]);
        assert_eq!(*img.get_pixel(10, 15), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(30, 15), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(20, 10), Rgba([0, 0, 0, 255]));
        // Interior left blank (no font configured)
        assert_eq!(*img.get_pixel(20, 15), WHITE);
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let node = RenderNode {
            field_id: "f".into(),
            rect: ScreenRect::new(0.0, 0.0, 100.0, 30.0),
            kind: NodeKind::Text {
                text: "hello".into(),
                font_size: 14.0,
                font_family: "Arial".into(),
                placeholder: false,
                required: false,
            },
            focus: None,
        };
        let compositor = PageCompositor::new();
        assert!(!compositor.has_font());
        let img = compositor.compose(None, 0.1, &[node]);
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_missing_font_file() {
        assert!(matches!(
            PageCompositor::with_font_file("/nonexistent/font.ttf"),
            Err(DocflowError::Io(_))
        ));
    }

    #[test]
    fn test_render_pages_in_order() {
        let compositor = PageCompositor::new();
        let pages = vec![
            (None, page(vec![])),
            (Some(png(4, 4, Rgba([1, 2, 3, 255]))), page(vec![])),
        ];
        let results = compositor.render_pages(&pages);
        assert_eq!(results.len(), 2);

        let second = image::load_from_memory(results[1].as_ref().unwrap()).unwrap().to_rgba8();
        assert_eq!(*second.get_pixel(5, 5), Rgba([1, 2, 3, 255]));
        let first = image::load_from_memory(results[0].as_ref().unwrap()).unwrap().to_rgba8();
        assert_eq!(*first.get_pixel(5, 5), WHITE);
    }
}
