//! Single-line text compositing onto an RGB image.
//!
//! The text box is centered on the anchor in both axes: horizontally by
//! advance width, vertically by the midpoint of the ascender and descender
//! lines. Pixels falling outside the image are dropped.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};

use crate::error::CertError;
use crate::fonts::{builtin, FontFace, FontHandle};
use crate::layout::Anchor;

pub fn draw_centered(
    image: &mut RgbImage,
    text: &str,
    font: &FontHandle,
    color: Rgb<u8>,
    anchor: Anchor,
) -> Result<(), CertError> {
    match &font.face {
        FontFace::Outline(face) => {
            draw_outline(image, text, face, font.size, color, anchor);
            Ok(())
        }
        FontFace::Builtin => draw_builtin(image, text, font.size, color, anchor),
    }
}

/// Width and height in pixels of the box `text` is centered by.
pub fn measure(font: &FontHandle, text: &str) -> (f32, f32) {
    match &font.face {
        FontFace::Outline(face) => {
            let scaled = face.as_scaled(em_scale(face, font.size));
            let (_, width) = layout(face, font.size, text);
            (width, scaled.ascent() - scaled.descent())
        }
        FontFace::Builtin => {
            let (cell_w, cell_h) = builtin::cell_size(font.size);
            ((cell_w * text.chars().count()) as f32, cell_h as f32)
        }
    }
}

/// Scale at which one em is `size` pixels.
fn em_scale(font: &FontArc, size: u32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size as f32 * font.height_unscaled() / units_per_em)
}

fn draw_outline(
    image: &mut RgbImage,
    text: &str,
    font: &FontArc,
    size: u32,
    color: Rgb<u8>,
    anchor: Anchor,
) {
    let scale = em_scale(font, size);
    let scaled = font.as_scaled(scale);
    let (glyphs, caret) = layout(font, size, text);

    let origin_x = anchor.x as f32 - caret / 2.0;
    // descent is negative
    let baseline = anchor.y as f32 + (scaled.ascent() + scaled.descent()) / 2.0;

    for (id, x) in glyphs {
        let glyph = id.with_scale_and_position(scale, point(origin_x + x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + gx as i64;
                let py = bounds.min.y as i64 + gy as i64;
                blend_at(image, px, py, color, coverage);
            });
        }
    }
}

/// Glyph ids with their x offset from the text start, plus the total advance.
fn layout(font: &FontArc, size: u32, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(em_scale(font, size));
    let mut glyphs = Vec::with_capacity(text.len());
    let mut caret = 0.0f32;
    let mut previous: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        glyphs.push((id, caret));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }
    (glyphs, caret)
}

fn draw_builtin(
    image: &mut RgbImage,
    text: &str,
    size: u32,
    color: Rgb<u8>,
    anchor: Anchor,
) -> Result<(), CertError> {
    let bitmaps = builtin::glyphs(text).map_err(CertError::Font)?;
    let (cell_w, cell_h) = builtin::cell_size(size);

    let total_width = (cell_w * bitmaps.len()) as f64;
    let left = (anchor.x - total_width / 2.0).round() as i64;
    let top = (anchor.y - cell_h as f64 / 2.0).round() as i64;

    for (index, bitmap) in bitmaps.iter().enumerate() {
        let cell_left = left + (index * cell_w) as i64;
        for dy in 0..cell_h {
            for dx in 0..cell_w {
                if builtin::sample(bitmap, cell_w, cell_h, dx, dy) {
                    blend_at(image, cell_left + dx as i64, top + dy as i64, color, 1.0);
                }
            }
        }
    }
    Ok(())
}

fn blend_at(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color.0) {
        *channel = (*channel as f32 * (1.0 - alpha) + target as f32 * alpha).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontOrigin;

    fn builtin_font(size: u32) -> FontHandle {
        FontHandle {
            family: "builtin".to_string(),
            size,
            origin: FontOrigin::Builtin,
            path: None,
            face: FontFace::Builtin,
        }
    }

    /// Bounding box of every pixel that differs from white.
    fn ink_bounds(image: &RgbImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0 != [255, 255, 255] {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    #[test]
    fn builtin_text_is_centered_on_anchor() {
        let mut image = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
        let anchor = Anchor { x: 200.0, y: 100.0 };
        draw_centered(&mut image, "HH", &builtin_font(48), Rgb([0, 0, 0]), anchor).unwrap();

        let (x0, y0, x1, y1) = ink_bounds(&image).expect("text should leave ink");
        // Two 24×48 cells span x 176..224 and y 76..124.
        assert!(x0 >= 176 && x1 < 224, "x range {}..={}", x0, x1);
        assert!(y0 >= 76 && y1 < 124, "y range {}..={}", y0, y1);
        let mid_x = (x0 + x1) as f32 / 2.0;
        assert!((mid_x - 200.0).abs() <= 4.0, "mid_x {}", mid_x);
    }

    #[test]
    fn uses_fill_color() {
        let mut image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let anchor = Anchor { x: 100.0, y: 50.0 };
        draw_centered(&mut image, "X", &builtin_font(40), Rgb([200, 10, 30]), anchor).unwrap();
        assert!(image.pixels().any(|p| p.0 == [200, 10, 30]));
    }

    #[test]
    fn off_canvas_text_is_clipped_not_an_error() {
        let mut image = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let anchor = Anchor { x: -500.0, y: 900.0 };
        draw_centered(&mut image, "Nobody", &builtin_font(40), Rgb([0, 0, 0]), anchor).unwrap();
        assert!(ink_bounds(&image).is_none());
    }

    #[test]
    fn long_text_clips_at_edges() {
        let mut image = RgbImage::from_pixel(60, 40, Rgb([255, 255, 255]));
        let anchor = Anchor { x: 30.0, y: 20.0 };
        let name = "Maximilian Alexander von Longname";
        draw_centered(&mut image, name, &builtin_font(20), Rgb([0, 0, 0]), anchor).unwrap();
        let (x0, _, x1, _) = ink_bounds(&image).unwrap();
        assert!(x0 <= 5 && x1 >= 50, "ink spans {}..={}", x0, x1);
    }

    fn outline_font(size: u32) -> FontHandle {
        let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/DejaVuSans-ExtraLight.ttf");
        let face = FontArc::try_from_vec(std::fs::read(fixture).unwrap()).unwrap();
        FontHandle {
            family: "DejaVu Sans".to_string(),
            size,
            origin: FontOrigin::Variant,
            path: None,
            face: FontFace::Outline(face),
        }
    }

    #[test]
    fn outline_text_is_centered_on_anchor() {
        let mut image = RgbImage::from_pixel(600, 300, Rgb([255, 255, 255]));
        let anchor = Anchor { x: 300.0, y: 150.0 };
        draw_centered(&mut image, "HHHH", &outline_font(48), Rgb([0, 0, 0]), anchor).unwrap();

        let (x0, y0, x1, y1) = ink_bounds(&image).expect("text should leave ink");
        let mid_x = (x0 + x1) as f64 / 2.0;
        assert!((mid_x - anchor.x).abs() <= 2.0, "ink spans {}..={}", x0, x1);
        assert!((y0 as f64) < anchor.y && (y1 as f64) > anchor.y, "y range {}..={}", y0, y1);
        // Cap height of a 48px em is well under 48px.
        assert!(y1 - y0 < 48);
    }

    #[test]
    fn outline_measure_tracks_em_size() {
        let small = measure(&outline_font(20), "Ada Lovelace");
        let large = measure(&outline_font(40), "Ada Lovelace");
        assert!(small.0 > 0.0 && small.1 > 0.0);
        assert!((large.0 / small.0 - 2.0).abs() < 0.01, "{:?} vs {:?}", small, large);
        assert!((large.1 / small.1 - 2.0).abs() < 0.01);
        // Line height spans ascender to descender, so it exceeds the em.
        assert!(large.1 > 40.0);
    }

    #[test]
    fn builtin_measure_counts_cells() {
        assert_eq!(measure(&builtin_font(48), "Ada"), (72.0, 48.0));
    }

    #[test]
    fn blend_respects_coverage() {
        let mut image = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        blend_at(&mut image, 0, 0, Rgb([0, 0, 0]), 0.5);
        assert_eq!(image.get_pixel(0, 0).0, [128, 128, 128]);
        blend_at(&mut image, 5, 5, Rgb([0, 0, 0]), 1.0);
    }
}
