//! Output packaging: rendered certificates become either one paged document
//! or a zip archive of individually named PNG files.

use image::{ImageFormat, RgbImage};
use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::str::FromStr;
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::CertError;
use crate::pdf::PdfBuilder;
use crate::render::RenderedUnit;

pub const PDF_MIME: &str = "application/pdf";
pub const ZIP_MIME: &str = "application/zip";

/// Requested output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// One PDF, one page per name
    Pdf,
    /// Zip of PNG files, one per name
    Png,
    /// PDF of unmodified template copies
    Void,
}

impl FromStr for OutputKind {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pdf" => Ok(OutputKind::Pdf),
            "png" | "zip" => Ok(OutputKind::Png),
            "void" | "blank" => Ok(OutputKind::Void),
            other => Err(CertError::validation(format!(
                "Unknown output format '{}' (expected pdf, png or void)",
                other
            ))),
        }
    }
}

/// Finished response payload.
#[derive(Debug)]
pub struct Packaged {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    pub count: usize,
}

/// How archive entries are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveNaming {
    /// `{name}.png`; repeated names get `_1`, `_2`, ... in encounter order.
    Plain,
    /// `{position:05}_{name}.png` with an absolute, 1-based position, so
    /// archives from consecutive chunks combine without clashes.
    Numbered { start_offset: usize },
}

/// Write every unit as a page, in order.
pub fn package_pdf<I>(units: I) -> Result<(Vec<u8>, usize), CertError>
where
    I: IntoIterator<Item = Result<RenderedUnit, CertError>>,
{
    let mut builder = PdfBuilder::new();
    for unit in units {
        builder.add_image_page(&unit?.image)?;
    }
    if builder.page_count() == 0 {
        return Err(CertError::NoNames);
    }
    let count = builder.page_count();
    Ok((builder.finish()?, count))
}

/// `quantity` pages, all showing the unmodified template.
pub fn package_blank(template: &RgbImage, quantity: u32) -> Result<Vec<u8>, CertError> {
    if quantity == 0 {
        return Err(CertError::validation("Quantity must be at least 1"));
    }
    let mut builder = PdfBuilder::new();
    let embedded = builder.embed_image(template)?;
    for _ in 0..quantity {
        builder.add_page(&embedded)?;
    }
    builder.finish()
}

/// Zip every unit as a PNG entry, in order.
pub fn package_archive<I>(units: I, naming: ArchiveNaming) -> Result<(Vec<u8>, usize), CertError>
where
    I: IntoIterator<Item = Result<RenderedUnit, CertError>>,
{
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut namer = EntryNamer::new(naming);

    for unit in units {
        let unit = unit?;
        let entry = namer.next_name(&unit.name);

        let mut png = Vec::new();
        unit.image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CertError::Output(format!("PNG encoding failed for '{}': {}", entry, e)))?;

        zip.start_file(entry.as_str(), options)
            .map_err(|e| CertError::Output(format!("zip: {}", e)))?;
        zip.write_all(&png)
            .map_err(|e| CertError::Output(format!("zip: {}", e)))?;
    }

    if namer.count() == 0 {
        return Err(CertError::NoNames);
    }
    let count = namer.count();
    let bytes = zip
        .finish()
        .map_err(|e| CertError::Output(format!("zip: {}", e)))?
        .into_inner();
    Ok((bytes, count))
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w \-]").unwrap())
}

/// Keep letters, digits, space, hyphen and underscore.
pub fn sanitize(name: &str) -> String {
    unsafe_chars_re().replace_all(name, "").trim().to_string()
}

/// Hands out archive entry names in encounter order.
pub struct EntryNamer {
    naming: ArchiveNaming,
    used: HashSet<String>,
    issued: usize,
}

impl EntryNamer {
    pub fn new(naming: ArchiveNaming) -> Self {
        Self {
            naming,
            used: HashSet::new(),
            issued: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.issued
    }

    pub fn next_name(&mut self, source: &str) -> String {
        self.issued += 1;
        let offset = match self.naming {
            ArchiveNaming::Plain => 0,
            ArchiveNaming::Numbered { start_offset } => start_offset,
        };
        let position = offset + self.issued;

        let mut stem = sanitize(source);
        if stem.is_empty() {
            stem = format!("certificate_{}", position);
        }

        match self.naming {
            ArchiveNaming::Numbered { .. } => format!("{:05}_{}.png", position, stem),
            ArchiveNaming::Plain => {
                let mut candidate = format!("{}.png", stem);
                let mut suffix = 1;
                while self.used.contains(&candidate) {
                    candidate = format!("{}_{}.png", stem, suffix);
                    suffix += 1;
                }
                self.used.insert(candidate.clone());
                candidate
            }
        }
    }
}

/// Suggested download name. Chunked archives carry their absolute range.
pub fn suggested_filename(kind: OutputKind, chunk: Option<(usize, usize)>) -> String {
    let (base, ext) = match kind {
        OutputKind::Pdf => ("Certificates", "pdf"),
        OutputKind::Png => ("Certificates", "zip"),
        OutputKind::Void => ("Blank_Certificates", "pdf"),
    };
    match chunk {
        Some((first, last)) => format!("{}_{}-{}.{}", base, first, last, ext),
        None => format!("{}.{}", base, ext),
    }
}
