//! Built-in bitmap font used when no TrueType font can be loaded.
//!
//! Glyphs come from Spleen 12×24 and are scaled nearest-neighbor to the
//! requested pixel height, keeping the 1:2 cell aspect.

use spleen_font::{PSF2Font, FONT_12X24};

pub const GLYPH_WIDTH: usize = 12;
pub const GLYPH_HEIGHT: usize = 24;

/// Confirms the embedded font data parses.
pub fn check() -> Result<(), String> {
    PSF2Font::new(FONT_12X24)
        .map(|_| ())
        .map_err(|e| format!("built-in font unavailable: {:?}", e))
}

/// Cell size in pixels for a requested em size.
pub fn cell_size(size: u32) -> (usize, usize) {
    let height = size.max(1) as usize;
    let width = (height * GLYPH_WIDTH / GLYPH_HEIGHT).max(1);
    (width, height)
}

/// 12×24 on/off bitmap for each character of `text`, in order.
/// Characters Spleen lacks render as an outlined box.
pub fn glyphs(text: &str) -> Result<Vec<Vec<bool>>, String> {
    let mut font = PSF2Font::new(FONT_12X24)
        .map_err(|e| format!("built-in font unavailable: {:?}", e))?;

    Ok(text
        .chars()
        .map(|ch| {
            let mut bitmap = vec![false; GLYPH_WIDTH * GLYPH_HEIGHT];
            let utf8 = ch.to_string();
            match font.glyph_for_utf8(utf8.as_bytes()) {
                Some(glyph) => {
                    for (row_y, row) in glyph.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            if row_y < GLYPH_HEIGHT && col_x < GLYPH_WIDTH {
                                bitmap[row_y * GLYPH_WIDTH + col_x] = on;
                            }
                        }
                    }
                }
                None => draw_box(&mut bitmap),
            }
            bitmap
        })
        .collect())
}

fn draw_box(bitmap: &mut [bool]) {
    for x in 0..GLYPH_WIDTH {
        bitmap[x] = true;
        bitmap[(GLYPH_HEIGHT - 1) * GLYPH_WIDTH + x] = true;
    }
    for y in 0..GLYPH_HEIGHT {
        bitmap[y * GLYPH_WIDTH] = true;
        bitmap[y * GLYPH_WIDTH + GLYPH_WIDTH - 1] = true;
    }
}

/// Nearest-neighbor sample of a 12×24 glyph at cell coordinates `(dx, dy)`
/// of a `cell_w`×`cell_h` cell.
pub fn sample(bitmap: &[bool], cell_w: usize, cell_h: usize, dx: usize, dy: usize) -> bool {
    let sx = dx * GLYPH_WIDTH / cell_w;
    let sy = dy * GLYPH_HEIGHT / cell_h;
    bitmap
        .get(sy * GLYPH_WIDTH + sx)
        .copied()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_font_loads() {
        assert!(check().is_ok());
    }

    #[test]
    fn letters_have_ink_and_space_does_not() {
        let glyphs = glyphs("A ").unwrap();
        assert_eq!(glyphs.len(), 2);
        assert!(glyphs[0].iter().any(|&on| on));
        assert!(glyphs[1].iter().all(|&on| !on));
    }

    #[test]
    fn cell_keeps_aspect() {
        assert_eq!(cell_size(48), (24, 48));
        assert_eq!(cell_size(1), (1, 1));
        assert_eq!(cell_size(0), (1, 1));
    }

    #[test]
    fn sample_scales_up() {
        let mut bitmap = vec![false; GLYPH_WIDTH * GLYPH_HEIGHT];
        bitmap[0] = true;
        // At 2x, the top-left 2×2 block maps to source pixel (0, 0).
        assert!(sample(&bitmap, 24, 48, 1, 1));
        assert!(!sample(&bitmap, 24, 48, 2, 2));
    }
}
