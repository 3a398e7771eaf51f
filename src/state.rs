use crate::config::Config;
use crate::fonts::FontResolver;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fonts: Arc<FontResolver>,
}

impl AppState {
    /// The font cache lives as long as the state; build this once at startup.
    pub fn new(config: Config) -> Self {
        let fonts = FontResolver::new(config.fonts_dir.clone(), config.font_cache_capacity)
            .with_max_size(config.max_font_size);
        Self {
            config: Arc::new(config),
            fonts: Arc::new(fonts),
        }
    }
}
