use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::batch::{DEFAULT_FONT, DEFAULT_FONT_SIZE};
use crate::error::CertError;
use crate::fonts::{table, FontOrigin};
use crate::render;
use crate::state::AppState;

const PREVIEW_TEXT: &str = "Your Name";

#[derive(Debug, Serialize)]
pub struct FontList {
    pub files: Vec<String>,
    pub families: Vec<&'static str>,
}

/// GET /fonts
pub async fn list(State(state): State<Arc<AppState>>) -> Json<FontList> {
    Json(FontList {
        files: state.fonts.available_fonts(),
        families: table::families().collect(),
    })
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub family: Option<String>,
    pub size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FontPreview {
    pub family: String,
    pub size: u32,
    pub origin: FontOrigin,
    pub file: Option<String>,
    pub sample: &'static str,
    pub sample_width: f32,
    pub sample_height: f32,
}

/// GET /fonts/preview?family=..&size=..
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<FontPreview>, CertError> {
    let family = params
        .family
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FONT.to_string());
    let size = params.size.unwrap_or(DEFAULT_FONT_SIZE);

    let fonts = state.fonts.clone();
    let handle = tokio::task::spawn_blocking(move || fonts.resolve(&family, size)).await??;
    let (sample_width, sample_height) = render::measure(&handle, PREVIEW_TEXT);

    Ok(Json(FontPreview {
        family: handle.family.clone(),
        size: handle.size,
        origin: handle.origin,
        file: handle
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned()),
        sample: PREVIEW_TEXT,
        sample_width,
        sample_height,
    }))
}
