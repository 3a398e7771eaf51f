use super::{non_blank_lines, NameSource};
use crate::error::CertError;

/// Line-delimited UTF-8 text.
pub struct PlainText;

impl NameSource for PlainText {
    fn extract(&self, data: &[u8]) -> Result<Vec<String>, CertError> {
        let text = std::str::from_utf8(data).map_err(|e| CertError::parse("text file", e))?;
        // A UTF-8 BOM would otherwise stick to the first name.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Ok(non_blank_lines(text).collect())
    }
}
