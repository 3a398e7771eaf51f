//! `.xlsx` reader.
//!
//! An xlsx file is a zip of SpreadsheetML parts. Only the first worksheet is
//! read; every cell of every column is a candidate name, emitted column by
//! column (all rows of A, then all rows of B, ...). The header row is data.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

use super::NameSource;
use crate::error::CertError;

const WHAT: &str = "spreadsheet";
const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";

pub struct Spreadsheet;

impl NameSource for Spreadsheet {
    fn extract(&self, data: &[u8]) -> Result<Vec<String>, CertError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|e| CertError::parse(WHAT, e))?;

        let shared = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let sheet_path = first_sheet_path(&mut archive)?;
        let sheet = read_entry(&mut archive, &sheet_path)?.ok_or_else(|| {
            CertError::parse(WHAT, format!("worksheet {} not found", sheet_path))
        })?;

        let cells = parse_sheet(&sheet, &shared)?;
        Ok(cells
            .into_values()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan"))
            .collect())
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>, CertError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(CertError::parse(WHAT, e)),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| CertError::parse(WHAT, format!("failed to read {}: {}", name, e)))?;
    Ok(Some(data))
}

fn xml_error(e: impl std::fmt::Display) -> CertError {
    CertError::parse(WHAT, format!("malformed xml: {}", e))
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, CertError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

/// Worksheet part of the first sheet in workbook order.
fn first_sheet_path(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String, CertError> {
    let Some(workbook) = read_entry(archive, "xl/workbook.xml")? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let Some(rel_id) = first_sheet_rel_id(&workbook)? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let Some(rels) = read_entry(archive, "xl/_rels/workbook.xml.rels")? else {
        return Ok(DEFAULT_SHEET.to_string());
    };

    let mut reader = Reader::from_reader(Cursor::new(rels.as_slice()));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr_value(&e, b"Id")?.as_deref() == Some(rel_id.as_str()) {
                    if let Some(target) = attr_value(&e, b"Target")? {
                        return Ok(match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("xl/{}", target),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(DEFAULT_SHEET.to_string())
}

fn first_sheet_rel_id(workbook: &[u8]) -> Result<Option<String>, CertError> {
    let mut reader = Reader::from_reader(Cursor::new(workbook));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                // `r:id`; the prefix is whatever the relationships namespace is bound to.
                return attr_value(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Shared string table. Rich-text runs are concatenated; phonetic hints are skipped.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, CertError> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = !in_phonetic,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Default)]
struct PendingCell {
    col: u32,
    row: u32,
    kind: Option<String>,
    value: String,
}

/// Cell values keyed by (column, row), so iteration order is column-major.
fn parse_sheet(xml: &[u8], shared: &[String]) -> Result<BTreeMap<(u32, u32), String>, CertError> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut cells = BTreeMap::new();

    let mut row = 0u32;
    let mut next_col = 0u32;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                row = match attr_value(&e, b"r")?.and_then(|r| r.parse::<u32>().ok()) {
                    Some(r) => r,
                    None => row + 1,
                };
                next_col = 1;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                cell = Some(start_cell(&e, row, next_col)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                // Styled but empty cell: occupies a column, carries no value.
                next_col = start_cell(&e, row, next_col)?.col + 1;
            }
            Event::Start(e) if matches!(e.local_name().as_ref(), b"v" | b"t") => {
                in_value = cell.is_some();
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        next_col = done.col + 1;
                        if let Some(value) = cell_value(&done, shared)? {
                            cells.insert((done.col, done.row), value);
                        }
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}

fn start_cell(e: &BytesStart<'_>, row: u32, next_col: u32) -> Result<PendingCell, CertError> {
    let (col, row) = match attr_value(e, b"r")?.as_deref().and_then(parse_cell_ref) {
        Some(position) => position,
        None => (next_col.max(1), row.max(1)),
    };
    Ok(PendingCell {
        col,
        row,
        kind: attr_value(e, b"t")?,
        value: String::new(),
    })
}

fn cell_value(cell: &PendingCell, shared: &[String]) -> Result<Option<String>, CertError> {
    if cell.value.is_empty() {
        return Ok(None);
    }
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let index: usize = cell.value.trim().parse().map_err(|_| {
                CertError::parse(WHAT, format!("bad shared string index '{}'", cell.value))
            })?;
            shared.get(index).cloned().ok_or_else(|| {
                CertError::parse(WHAT, format!("shared string {} out of range", index))
            })?
        }
        Some("b") => {
            if cell.value.trim() == "1" {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        Some("n") | None => format_number(&cell.value),
        // inlineStr, str (formula result), e (error literal)
        Some(_) => cell.value.clone(),
    };
    Ok(Some(value))
}

/// Integral numbers print without a fractional part ("42", not "42.0").
fn format_number(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Ok(v) if v.is_finite() => format!("{}", v),
        _ => raw.to_string(),
    }
}

/// "AB12" → (28, 12). Columns and rows are 1-based.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters.chars().try_fold(0u32, |acc, c| {
        acc.checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
    })?;
    let row = digits.parse().ok()?;
    Some((col, row))
}
