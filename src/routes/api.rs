use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::batch::{self, GenerateRequest, NamesInput};
use crate::error::CertError;
use crate::layout::BoundingBox;
use crate::names;
use crate::package::{OutputKind, PDF_MIME};
use crate::pdf;
use crate::state::AppState;

const BATCH_ID_HEADER: HeaderName = HeaderName::from_static("x-batch-id");
const MERGED_FILENAME: &str = "Merged_Certificates.pdf";

/// Download response that browsers and proxies must not cache.
fn attachment(content_type: &str, filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, "0".to_string()),
        ],
        bytes,
    )
        .into_response()
}

/// POST /generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, CertError> {
    let batch_id = batch::new_batch_id();
    let span = tracing::info_span!("batch", id = %batch_id);

    let request = read_generate_form(multipart).instrument(span.clone()).await?;

    let fonts = state.fonts.clone();
    let max_quantity = state.config.max_quantity;
    let worker_span = span.clone();
    let packaged = tokio::task::spawn_blocking(move || {
        let _entered = worker_span.enter();
        batch::generate(request, &fonts, max_quantity)
    })
    .await??;

    span.in_scope(|| {
        tracing::info!(
            count = packaged.count,
            bytes = packaged.bytes.len(),
            filename = %packaged.filename,
            "Batch complete"
        )
    });

    let mut response = attachment(packaged.content_type, &packaged.filename, packaged.bytes);
    if let Ok(value) = batch_id.parse() {
        response.headers_mut().insert(BATCH_ID_HEADER, value);
    }
    Ok(response)
}

async fn read_generate_form(mut multipart: Multipart) -> Result<GenerateRequest, CertError> {
    let mut request = GenerateRequest::default();
    let mut upload: Option<NamesInput> = None;
    let mut names_list: Option<Vec<String>> = None;
    let mut start_offset = 0usize;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "template" => {
                request.template = field.bytes().await?.to_vec();
            }
            "names" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?.to_vec();
                if !filename.is_empty() || !data.is_empty() {
                    upload = Some(NamesInput::Upload { filename, data });
                }
            }
            "names_list" => {
                let raw = field.text().await?;
                let list: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
                    CertError::validation(format!("names_list must be a JSON array of strings: {}", e))
                })?;
                names_list = Some(list);
            }
            "start_offset" => {
                start_offset = parse_number(&field.text().await?, "start_offset")?.unwrap_or(0);
            }
            "font_style" => {
                let family = field.text().await?;
                if !family.trim().is_empty() {
                    request.font_family = family.trim().to_string();
                }
            }
            "font_size" => {
                if let Some(size) = parse_number(&field.text().await?, "font_size")? {
                    request.font_size = size;
                }
            }
            "font_color" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    request = request.with_color(&raw)?;
                }
            }
            "coords" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    request.bbox = Some(BoundingBox::parse(&raw)?);
                }
            }
            "output_format" => {
                request.output = field.text().await?.parse::<OutputKind>()?;
            }
            "quantity" => {
                request.quantity = parse_number(&field.text().await?, "quantity")?;
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    // A pre-split list marks this request as one chunk of a larger batch.
    request.names = match names_list {
        Some(names) => Some(NamesInput::Chunk {
            names,
            start_offset,
        }),
        None => upload,
    };
    Ok(request)
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<Option<T>, CertError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|_| {
        CertError::validation(format!("{} must be a non-negative integer, got '{}'", field, raw))
    })
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub names: Vec<String>,
    pub count: usize,
}

/// POST /extract-names
pub async fn extract_names(mut multipart: Multipart) -> Result<Json<ExtractResponse>, CertError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("names") {
            let filename = field.file_name().unwrap_or("").to_string();
            upload = Some((filename, field.bytes().await?.to_vec()));
        }
    }
    let (filename, data) =
        upload.ok_or_else(|| CertError::validation("A names file is required"))?;

    let names =
        tokio::task::spawn_blocking(move || names::extract_names(&filename, &data)).await??;
    if names.is_empty() {
        return Err(CertError::NoNames);
    }

    Ok(Json(ExtractResponse {
        count: names.len(),
        names,
    }))
}

/// POST /merge
pub async fn merge(mut multipart: Multipart) -> Result<Response, CertError> {
    let mut documents = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("files") {
            let data = field.bytes().await?;
            if !data.is_empty() {
                documents.push(data.to_vec());
            }
        }
    }
    tracing::info!("Merging {} documents", documents.len());

    let merged = tokio::task::spawn_blocking(move || pdf::merge_documents(&documents)).await??;
    Ok(attachment(PDF_MIME, MERGED_FILENAME, merged))
}
