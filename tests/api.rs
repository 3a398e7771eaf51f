use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use certiforge::{config::Config, state::AppState};
use image::{ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "certiforge-test-boundary";

struct Form {
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

fn app(fonts_dir: &std::path::Path) -> Router {
    let config = Config {
        fonts_dir: fonts_dir.to_path_buf(),
        max_quantity: 20,
        ..Config::default()
    };
    certiforge::router(Arc::new(AppState::new(config)))
}

fn template_png() -> Vec<u8> {
    let image = RgbImage::from_pixel(180, 110, Rgb([255, 255, 255]));
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    png
}

fn base_form() -> Form {
    Form::new()
        .file("template", "template.png", &template_png())
        .text("coords", "300,200,600,300")
        .text("font_style", "Great Vibes")
        .text("font_size", "24")
        .text("font_color", "#1a2b3c")
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

async fn generate_pdf(app: Router, names: &str) -> Vec<u8> {
    let request = base_form()
        .file("names", "names.txt", names.as_bytes())
        .into_request("/generate");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_bytes(response).await
}

#[tokio::test]
async fn generate_pdf_from_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .file("names", "names.txt", b"Ada Lovelace\n\nAlan Turing\n  Grace Hopper  \n")
        .text("output_format", "pdf")
        .into_request("/generate");

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "application/pdf");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"Certificates.pdf\""
    );
    assert_eq!(
        header_str(&response, "cache-control"),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(header_str(&response, "x-batch-id").len(), 17);

    let pdf = body_bytes(response).await;
    assert_eq!(certiforge::pdf::page_count(&pdf).unwrap(), 3);
}

#[tokio::test]
async fn blank_names_file_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .file("names", "names.txt", b"\n   \n\r\n")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "No names found in the uploaded file");
}

#[tokio::test]
async fn unknown_extension_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .file("names", "names.csv", b"Ada\nAlan\n")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_coordinates_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new()
        .file("template", "template.png", &template_png())
        .file("names", "names.txt", b"Ada\n")
        .text("coords", "1,2,3")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_template_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new()
        .file("names", "names.txt", b"Ada\n")
        .text("coords", "0,0,900,550")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chunked_png_request_numbers_entries_absolutely() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .text("names_list", r#"["Ada", "Alan", "Ada"]"#)
        .text("start_offset", "40")
        .text("output_format", "png")
        .into_request("/generate");

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "application/zip");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"Certificates_41-43.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["00041_Ada.png", "00042_Alan.png", "00043_Ada.png"]
    );
}

#[tokio::test]
async fn void_mode_returns_quantity_pages() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new()
        .file("template", "template.png", &template_png())
        .text("output_format", "void")
        .text("quantity", "6")
        .into_request("/generate");

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"Blank_Certificates.pdf\""
    );
    let pdf = body_bytes(response).await;
    assert_eq!(certiforge::pdf::page_count(&pdf).unwrap(), 6);
}

#[tokio::test]
async fn void_quantity_above_limit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new()
        .file("template", "template.png", &template_png())
        .text("output_format", "void")
        .text("quantity", "21")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extract_names_returns_json() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new()
        .file("names", "people.TXT", b"Ada\r\n\r\nAlan\nAda\n")
        .into_request("/extract-names");

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "names": ["Ada", "Alan", "Ada"], "count": 3 })
    );
}

#[tokio::test]
async fn merge_concatenates_generated_documents() {
    let dir = tempfile::tempdir().unwrap();
    let first = generate_pdf(app(dir.path()), "A\nB\nC\n").await;
    let second = generate_pdf(app(dir.path()), "D\nE\n").await;

    let request = Form::new()
        .file("files", "part1.pdf", &first)
        .file("files", "part2.pdf", &second)
        .into_request("/merge");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let merged = body_bytes(response).await;
    assert_eq!(certiforge::pdf::page_count(&merged).unwrap(), 5);
}

#[tokio::test]
async fn merge_without_files_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let request = Form::new().text("note", "nothing here").into_request("/merge");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn font_preview_reports_builtin_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .uri("/fonts/preview?family=Great%20Vibes&size=48")
        .body(Body::empty())
        .unwrap();

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["family"], "Great Vibes");
    assert_eq!(json["size"], 48);
    assert_eq!(json["origin"], "builtin");
    assert!(json["file"].is_null());
    assert_eq!(json["sample_height"], 48.0);
}

#[tokio::test]
async fn font_list_includes_family_table() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Custom.ttf"), b"placeholder").unwrap();
    let request = Request::builder()
        .uri("/fonts")
        .body(Body::empty())
        .unwrap();

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["files"], serde_json::json!(["Custom.ttf"]));
    assert!(json["families"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "Great Vibes"));
}

fn fonts_dir_with_fixture(file: &str) -> tempfile::TempDir {
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/DejaVuSans-ExtraLight.ttf");
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture, dir.path().join(file)).unwrap();
    dir
}

#[tokio::test]
async fn chunk_offset_overflow_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .text("names_list", r#"["Ada", "Alan"]"#)
        .text("start_offset", &usize::MAX.to_string())
        .text("output_format", "png")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_chunk_entry_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .text("names_list", r#"["Ada", "   ", "Alan"]"#)
        .text("start_offset", "10")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "names_list entry 12 is blank");
}

#[tokio::test]
async fn oversized_font_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let request = base_form()
        .file("names", "names.txt", b"Ada\n")
        .text("font_size", "4000000000")
        .into_request("/generate");
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let preview = Request::builder()
        .uri("/fonts/preview?family=Anton&size=100000")
        .body(Body::empty())
        .unwrap();
    let response = app(dir.path()).oneshot(preview).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn font_preview_reports_table_font() {
    let dir = fonts_dir_with_fixture("GreatVibes-Regular.ttf");
    let request = Request::builder()
        .uri("/fonts/preview?family=Great%20Vibes&size=48")
        .body(Body::empty())
        .unwrap();

    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["origin"], "table");
    assert_eq!(json["file"], "GreatVibes-Regular.ttf");
    assert!(json["sample_width"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn generate_with_outline_font() {
    let dir = fonts_dir_with_fixture("GreatVibes-Regular.ttf");
    let pdf = generate_pdf(app(dir.path()), "Ada Lovelace\nAlan Turing\n").await;
    assert_eq!(certiforge::pdf::page_count(&pdf).unwrap(), 2);
}
