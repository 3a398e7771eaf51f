// Paged document output and merging.
// Pages are images at 72 dpi, so a page is exactly as many points wide as its
// image is pixels. Images are embedded as JPEG (DCTDecode) XObjects.
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::CertError;

const PDF_VERSION: &str = "1.5";
const JPEG_QUALITY: u8 = 92;
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

fn output_error(e: impl std::fmt::Display) -> CertError {
    CertError::Output(format!("PDF: {}", e))
}

/// Incrementally built image-per-page document.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Embed `image` once; the returned id can back any number of pages.
    pub fn embed_image(&mut self, image: &RgbImage) -> Result<EmbeddedImage, CertError> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(image)
            .map_err(output_error)?;

        let (width, height) = image.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        );
        Ok(EmbeddedImage {
            id: self.doc.add_object(stream),
            width,
            height,
        })
    }

    /// Append a page showing `image` edge to edge.
    pub fn add_page(&mut self, image: &EmbeddedImage) -> Result<(), CertError> {
        let (w, h) = (image.width as f32, image.height as f32);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().map_err(output_error)?));

        let media_box: Vec<Object> = vec![0.into(), 0.into(), w.into(), h.into()];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image.id },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    pub fn add_image_page(&mut self, image: &RgbImage) -> Result<(), CertError> {
        let embedded = self.embed_image(image)?;
        self.add_page(&embedded)
    }

    pub fn finish(self) -> Result<Vec<u8>, CertError> {
        let Self {
            mut doc,
            pages_id,
            kids,
        } = self;

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("certiforge ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(output_error)?;
        Ok(out)
    }
}

/// Handle to an image XObject inside a [`PdfBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    id: ObjectId,
    width: u32,
    height: u32,
}

pub fn page_count(pdf: &[u8]) -> Result<usize, CertError> {
    let doc = Document::load_mem(pdf).map_err(|e| CertError::parse("PDF", e))?;
    Ok(doc.get_pages().len())
}

/// Concatenate documents page by page, in input order.
pub fn merge_documents(inputs: &[Vec<u8>]) -> Result<Vec<u8>, CertError> {
    if inputs.is_empty() {
        return Err(CertError::validation("No PDF documents to merge"));
    }

    let mut merged = Document::with_version(PDF_VERSION);
    let mut next_id = 1;
    let mut page_ids = Vec::new();

    for (index, bytes) in inputs.iter().enumerate() {
        let mut doc = Document::load_mem(bytes)
            .map_err(|e| CertError::parse("PDF", format!("document {}: {}", index + 1, e)))?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        // BTreeMap keyed by page number, so this is page order.
        for page_id in doc.get_pages().into_values() {
            inherit_page_attributes(&mut doc, page_id)
                .map_err(|e| CertError::parse("PDF", format!("document {}: {}", index + 1, e)))?;
            page_ids.push(page_id);
        }
        merged.objects.extend(doc.objects);
    }
    merged.max_id = next_id - 1;

    let pages_id = merged.new_object_id();
    for page_id in &page_ids {
        let page = merged
            .get_object_mut(*page_id)
            .and_then(Object::as_dict_mut)
            .map_err(output_error)?;
        page.set("Parent", pages_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    // Old catalogs and page tree nodes are unreachable now.
    merged.prune_objects();

    tracing::info!(
        "Merged {} documents into {} pages",
        inputs.len(),
        page_ids.len()
    );

    let mut out = Vec::new();
    merged.save_to(&mut out).map_err(output_error)?;
    Ok(out)
}

/// Copy attributes a page inherits from its page-tree ancestors onto the page
/// itself, so it can be re-parented.
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> lopdf::Result<()> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut inherited: Vec<(Vec<u8>, Object)> = Vec::new();

    // Depth bound guards against cyclic page trees.
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if missing.is_empty() || depth > 64 {
            break;
        }
        depth += 1;
        let node = doc.get_dictionary(parent_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if !inherited.is_empty() {
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
    Ok(())
}
