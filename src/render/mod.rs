//! Batch rendering: one copy of the template per name, with the name drawn
//! centered on the anchor.
//!
//! Units are produced lazily and in input order, so packagers can encode
//! each image and drop it before the next one is drawn.

mod text;

pub use text::{draw_centered, measure};

use image::{Rgb, RgbImage};
use std::sync::Arc;

use crate::error::CertError;
use crate::fonts::FontHandle;
use crate::layout::Anchor;

/// One rendered certificate and the name it was rendered for.
#[derive(Debug, Clone)]
pub struct RenderedUnit {
    pub name: String,
    pub image: RgbImage,
}

/// Everything that stays fixed across a batch.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font: Arc<FontHandle>,
    pub color: Rgb<u8>,
    pub anchor: Anchor,
}

pub fn render_one(
    template: &RgbImage,
    name: &str,
    style: &TextStyle,
) -> Result<RenderedUnit, CertError> {
    let mut image = template.clone();
    draw_centered(&mut image, name, &style.font, style.color, style.anchor)?;
    Ok(RenderedUnit {
        name: name.to_string(),
        image,
    })
}

pub fn render_batch<'a>(
    template: &'a RgbImage,
    names: &'a [String],
    style: &'a TextStyle,
) -> impl Iterator<Item = Result<RenderedUnit, CertError>> + 'a {
    names
        .iter()
        .map(move |name| render_one(template, name, style))
}
