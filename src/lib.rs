pub mod batch;
pub mod config;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod names;
pub mod package;
pub mod pdf;
pub mod render;
pub mod routes;
pub mod state;

pub use routes::router;
