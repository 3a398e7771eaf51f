use super::{non_blank_lines, NameSource};
use crate::error::CertError;

/// Text-bearing PDF. Pages are extracted in order and every non-blank text
/// line is a name; page breaks only ever add blank lines, which are dropped.
pub struct PagedDocument;

impl NameSource for PagedDocument {
    fn extract(&self, data: &[u8]) -> Result<Vec<String>, CertError> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| CertError::parse("PDF", format!("PDF extraction error: {}", e)))?;
        Ok(non_blank_lines(&text).collect())
    }
}
