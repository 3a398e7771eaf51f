//! Name extraction from uploaded recipient lists.
//!
//! The upload's extension picks a [`NameFormat`] once; each format has its
//! own [`NameSource`] implementation. All of them produce trimmed, non-empty
//! names in source order.

mod document;
mod spreadsheet;
mod text;

pub use document::PagedDocument;
pub use spreadsheet::Spreadsheet;
pub use text::PlainText;

use crate::error::CertError;

/// Formats a names file can come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFormat {
    /// `.txt`, one name per line
    Lines,
    /// `.xlsx`, every cell of the first sheet
    Spreadsheet,
    /// `.pdf`, every text line of every page
    PagedDocument,
}

impl NameFormat {
    /// Resolve the format from an upload's file name. `None` for anything
    /// unrecognized.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.trim().to_lowercase();
        if lower.ends_with(".txt") {
            Some(NameFormat::Lines)
        } else if lower.ends_with(".xlsx") {
            Some(NameFormat::Spreadsheet)
        } else if lower.ends_with(".pdf") {
            Some(NameFormat::PagedDocument)
        } else {
            None
        }
    }

    fn source(self) -> &'static dyn NameSource {
        match self {
            NameFormat::Lines => &PlainText,
            NameFormat::Spreadsheet => &Spreadsheet,
            NameFormat::PagedDocument => &PagedDocument,
        }
    }
}

pub trait NameSource: Sync {
    fn extract(&self, data: &[u8]) -> Result<Vec<String>, CertError>;
}

/// Extract names from an uploaded file. Unknown extensions yield an empty
/// list; the caller decides whether that is an error.
pub fn extract_names(filename: &str, data: &[u8]) -> Result<Vec<String>, CertError> {
    let Some(format) = NameFormat::from_filename(filename) else {
        tracing::warn!("Unrecognized names file extension: {}", filename);
        return Ok(Vec::new());
    };

    let names = format.source().extract(data)?;
    tracing::info!(
        "Extracted {} names from {} ({:?})",
        names.len(),
        filename,
        format
    );
    Ok(names)
}

/// Split text into trimmed, non-empty lines.
pub(crate) fn non_blank_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
