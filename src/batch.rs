//! Request-level pipeline: template + names + style in, packaged bytes out.
//!
//! Chunked submissions send a pre-extracted slice of a larger list together
//! with its start offset. The offset only shifts output numbering; layout,
//! font and color are computed exactly as for a single-shot request.

use image::{Rgb, RgbImage};
use std::sync::Arc;

use crate::error::CertError;
use crate::fonts::FontResolver;
use crate::layout::{parse_hex_color, BoundingBox};
use crate::names;
use crate::package::{self, ArchiveNaming, OutputKind, Packaged, PDF_MIME, ZIP_MIME};
use crate::render::{render_batch, TextStyle};

pub const DEFAULT_FONT: &str = "arial.ttf";
pub const DEFAULT_FONT_SIZE: u32 = 40;
pub const DEFAULT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Where the names of a batch come from.
#[derive(Debug, Clone)]
pub enum NamesInput {
    /// A names file, format chosen by its extension.
    Upload { filename: String, data: Vec<u8> },
    /// One slice of a larger, already extracted list.
    Chunk { names: Vec<String>, start_offset: usize },
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub template: Vec<u8>,
    pub names: Option<NamesInput>,
    pub font_family: String,
    pub font_size: u32,
    pub color: Rgb<u8>,
    pub bbox: Option<BoundingBox>,
    pub output: OutputKind,
    pub quantity: Option<u32>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            template: Vec::new(),
            names: None,
            font_family: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR,
            bbox: None,
            output: OutputKind::Pdf,
            quantity: None,
        }
    }
}

impl GenerateRequest {
    /// Set the color from a `#rrggbb` string.
    pub fn with_color(mut self, raw: &str) -> Result<Self, CertError> {
        self.color = parse_hex_color(raw)?;
        Ok(self)
    }
}

/// `YYYYMMDD_xxxxxxxx`, used to correlate log lines of one batch.
pub fn new_batch_id() -> String {
    let date = chrono::Utc::now().format("%Y%m%d");
    let short_uuid = &uuid::Uuid::new_v4().to_string()[..8];
    format!("{}_{}", date, short_uuid)
}

pub fn decode_template(bytes: &[u8]) -> Result<RgbImage, CertError> {
    if bytes.is_empty() {
        return Err(CertError::validation("Template image is required"));
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| CertError::Template(e.to_string()))
}

/// Run one batch to completion. Blocking; call from `spawn_blocking`.
pub fn generate(
    request: GenerateRequest,
    fonts: &FontResolver,
    max_quantity: u32,
) -> Result<Packaged, CertError> {
    let template = decode_template(&request.template)?;
    tracing::info!(
        width = template.width(),
        height = template.height(),
        output = ?request.output,
        "Template decoded"
    );

    if request.output == OutputKind::Void {
        return generate_blank(&template, request.quantity, max_quantity);
    }

    let (names, start_offset) = match request.names {
        Some(NamesInput::Upload { filename, data }) => {
            (names::extract_names(&filename, &data)?, None)
        }
        Some(NamesInput::Chunk {
            names,
            start_offset,
        }) => (chunk_names(names, start_offset)?, Some(start_offset)),
        None => {
            return Err(CertError::validation(
                "A names file or names_list is required",
            ))
        }
    };
    if names.is_empty() {
        return Err(CertError::NoNames);
    }

    let bbox = request
        .bbox
        .ok_or_else(|| CertError::validation("Coordinates are required"))?;
    let anchor = bbox.anchor(template.width(), template.height());
    let font = fonts.resolve(&request.font_family, request.font_size)?;
    tracing::info!(
        names = names.len(),
        start_offset = ?start_offset,
        x = anchor.x,
        y = anchor.y,
        font = %request.font_family,
        origin = ?font.origin,
        "Rendering batch"
    );

    let style = TextStyle {
        font: Arc::clone(&font),
        color: request.color,
        anchor,
    };
    let units = render_batch(&template, &names, &style);

    let (bytes, count, content_type) = match request.output {
        OutputKind::Png => {
            let naming = match start_offset {
                Some(start_offset) => ArchiveNaming::Numbered { start_offset },
                None => ArchiveNaming::Plain,
            };
            let (bytes, count) = package::package_archive(units, naming)?;
            (bytes, count, ZIP_MIME)
        }
        _ => {
            let (bytes, count) = package::package_pdf(units)?;
            (bytes, count, PDF_MIME)
        }
    };

    let range = start_offset.map(|offset| (offset + 1, offset + count));
    Ok(Packaged {
        bytes,
        content_type,
        filename: package::suggested_filename(request.output, range),
        count,
    })
}

/// Positions in a chunk are planned by the caller, so a blank entry cannot
/// be dropped without shifting every later name.
fn chunk_names(names: Vec<String>, start_offset: usize) -> Result<Vec<String>, CertError> {
    if start_offset.checked_add(names.len()).is_none() {
        return Err(CertError::validation(format!(
            "start_offset {} is too large for a chunk of {} names",
            start_offset,
            names.len()
        )));
    }

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let name = name.trim();
            if name.is_empty() {
                Err(CertError::validation(format!(
                    "names_list entry {} is blank",
                    start_offset + index + 1
                )))
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

fn generate_blank(
    template: &RgbImage,
    quantity: Option<u32>,
    max_quantity: u32,
) -> Result<Packaged, CertError> {
    let quantity = quantity.ok_or_else(|| CertError::validation("Quantity is required"))?;
    if quantity == 0 || quantity > max_quantity {
        return Err(CertError::validation(format!(
            "Quantity must be between 1 and {}",
            max_quantity
        )));
    }

    tracing::info!(quantity, "Generating blank certificates");
    Ok(Packaged {
        bytes: package::package_blank(template, quantity)?,
        content_type: PDF_MIME,
        filename: package::suggested_filename(OutputKind::Void, None),
        count: quantity as usize,
    })
}
