use std::path::PathBuf;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub fonts_dir: PathBuf,
    pub font_cache_capacity: usize,
    pub max_upload_bytes: usize,
    pub max_quantity: u32,
    pub max_font_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            fonts_dir: PathBuf::from("static/fonts"),
            font_cache_capacity: 64,
            max_upload_bytes: 50 * MIB,
            max_quantity: 1000,
            max_font_size: crate::fonts::DEFAULT_MAX_FONT_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let fonts_dir = std::env::var("FONTS_DIR")
            .map(|dir| base_dir.join(dir))
            .unwrap_or_else(|_| base_dir.join(&defaults.fonts_dir));

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = env_parse("PORT", defaults.port);
        let font_cache_capacity = env_parse("FONT_CACHE_CAPACITY", defaults.font_cache_capacity).max(1);
        let max_upload_bytes = env_parse("MAX_UPLOAD_MB", defaults.max_upload_bytes / MIB)
            .saturating_mul(MIB);
        let max_quantity = env_parse("MAX_QUANTITY", defaults.max_quantity);
        let max_font_size = env_parse("MAX_FONT_SIZE", defaults.max_font_size).max(1);

        if !fonts_dir.is_dir() {
            tracing::warn!(
                "Fonts directory {} not found; only the built-in font will be available",
                fonts_dir.display()
            );
        }

        Ok(Self {
            host,
            port,
            fonts_dir,
            font_cache_capacity,
            max_upload_bytes,
            max_quantity,
            max_font_size,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
