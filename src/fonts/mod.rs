//! Font resolution.
//!
//! A requested family goes through an ordered list of strategies until one
//! yields a drawable face:
//!
//! 1. [`FontOrigin::Table`]: the static family table
//! 2. [`FontOrigin::Variant`]: file names derived from the family name
//! 3. [`FontOrigin::Directory`]: the first loadable font in `FONTS_DIR`
//! 4. [`FontOrigin::Builtin`]: the embedded bitmap font
//!
//! Failures along the way are logged and skipped; only a failure of the last
//! step is an error.

pub mod builtin;
mod cache;
pub mod table;

pub use cache::{FontCache, FontKey};

use ab_glyph::FontArc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::CertError;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Largest em size accepted unless overridden with `MAX_FONT_SIZE`.
pub const DEFAULT_MAX_FONT_SIZE: u32 = 1000;

/// Which resolution step produced a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontOrigin {
    Table,
    Variant,
    Directory,
    Builtin,
}

const STRATEGIES: [FontOrigin; 4] = [
    FontOrigin::Table,
    FontOrigin::Variant,
    FontOrigin::Directory,
    FontOrigin::Builtin,
];

#[derive(Clone)]
pub enum FontFace {
    Outline(FontArc),
    Builtin,
}

/// A resolved font at a specific pixel size, shared by every render in a batch.
pub struct FontHandle {
    pub family: String,
    pub size: u32,
    pub origin: FontOrigin,
    pub path: Option<PathBuf>,
    pub face: FontFace,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("family", &self.family)
            .field("size", &self.size)
            .field("origin", &self.origin)
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Error)]
enum FontError {
    #[error("'{0}' is not in the family table")]
    NotInTable(String),

    #[error("no font file matching {0:?}")]
    NoCandidate(Vec<String>),

    #[error("failed to load {path}: {cause}")]
    Load { path: PathBuf, cause: String },

    #[error("no usable font files in {0}")]
    EmptyDirectory(PathBuf),

    #[error("{0}")]
    Builtin(String),
}

pub struct FontResolver {
    fonts_dir: PathBuf,
    cache: FontCache,
    max_size: u32,
}

impl FontResolver {
    pub fn new(fonts_dir: impl Into<PathBuf>, cache_capacity: usize) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            cache: FontCache::new(cache_capacity),
            max_size: DEFAULT_MAX_FONT_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn fonts_dir(&self) -> &Path {
        &self.fonts_dir
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Resolve `family` at `size` pixels, consulting the cache first.
    pub fn resolve(&self, family: &str, size: u32) -> Result<Arc<FontHandle>, CertError> {
        if size == 0 || size > self.max_size {
            return Err(CertError::validation(format!(
                "Font size must be between 1 and {}, got {}",
                self.max_size, size
            )));
        }

        let key: FontKey = (family.to_string(), size);
        if let Some(handle) = self.cache.get(&key) {
            return Ok(handle);
        }

        // Loaded outside the cache lock; a concurrent miss on the same key
        // just loads it twice.
        let handle = Arc::new(self.load(family, size)?);
        self.cache.insert(key, handle.clone());
        Ok(handle)
    }

    fn load(&self, family: &str, size: u32) -> Result<FontHandle, CertError> {
        let mut last_error = None;

        for origin in STRATEGIES {
            match self.attempt(origin, family) {
                Ok((face, path)) => {
                    if origin == FontOrigin::Table || origin == FontOrigin::Variant {
                        tracing::debug!(family, size, ?origin, "Resolved font");
                    } else {
                        tracing::warn!(family, size, ?origin, "Font not found, using fallback");
                    }
                    return Ok(FontHandle {
                        family: family.to_string(),
                        size,
                        origin,
                        path,
                        face,
                    });
                }
                Err(e) => {
                    tracing::debug!(family, ?origin, error = %e, "Font strategy failed");
                    last_error = Some(e);
                }
            }
        }

        Err(CertError::Font(match last_error {
            Some(e) => e.to_string(),
            None => format!("could not resolve font '{}'", family),
        }))
    }

    fn attempt(
        &self,
        origin: FontOrigin,
        family: &str,
    ) -> Result<(FontFace, Option<PathBuf>), FontError> {
        match origin {
            FontOrigin::Table => {
                let file = table::lookup(family)
                    .ok_or_else(|| FontError::NotInTable(family.to_string()))?;
                self.load_file(file)
            }
            FontOrigin::Variant => {
                let candidates = filename_variants(family);
                let mut last = FontError::NoCandidate(candidates.clone());
                for candidate in &candidates {
                    match self.load_file(candidate) {
                        Ok(found) => return Ok(found),
                        Err(e @ FontError::Load { .. }) => last = e,
                        Err(_) => {}
                    }
                }
                Err(last)
            }
            FontOrigin::Directory => {
                for file in self.available_fonts() {
                    match self.load_file(&file) {
                        Ok(found) => return Ok(found),
                        Err(e) => tracing::debug!(error = %e, "Skipping unusable font file"),
                    }
                }
                Err(FontError::EmptyDirectory(self.fonts_dir.clone()))
            }
            FontOrigin::Builtin => builtin::check()
                .map(|_| (FontFace::Builtin, None))
                .map_err(FontError::Builtin),
        }
    }

    /// Load `file` from the fonts directory. Anything that is not a bare file
    /// name is refused.
    fn load_file(&self, file: &str) -> Result<(FontFace, Option<PathBuf>), FontError> {
        if Path::new(file).file_name().and_then(|n| n.to_str()) != Some(file) {
            return Err(FontError::NoCandidate(vec![file.to_string()]));
        }

        let path = self.fonts_dir.join(file);
        if !path.is_file() {
            return Err(FontError::NoCandidate(vec![file.to_string()]));
        }

        let data = std::fs::read(&path).map_err(|e| FontError::Load {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        let font = FontArc::try_from_vec(data).map_err(|e| FontError::Load {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        Ok((FontFace::Outline(font), Some(path)))
    }

    /// Font files in the fonts directory, sorted by name. Unreadable
    /// directories list as empty.
    pub fn available_fonts(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.fonts_dir) else {
            return Vec::new();
        };

        let mut files: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| has_font_extension(name))
            .collect();
        files.sort();
        files
    }
}

fn has_font_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FONT_EXTENSIONS.iter().any(|f| ext.eq_ignore_ascii_case(f)))
        .unwrap_or(false)
}

/// File names to try for a family: the name itself when it already is a font
/// file, then `{name}.ttf` and its space-free, hyphenated and underscored forms.
pub fn filename_variants(family: &str) -> Vec<String> {
    let family = family.trim();
    let mut variants = Vec::new();
    if family.is_empty() {
        return variants;
    }

    if has_font_extension(family) {
        variants.push(family.to_string());
    }
    for stem in [
        family.to_string(),
        family.replace(' ', ""),
        family.replace(' ', "-"),
        family.replace(' ', "_"),
    ] {
        let candidate = format!("{}.ttf", stem);
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
