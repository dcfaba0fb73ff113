pub mod config;
pub use config::{Config, DisplayConfig, FilterConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacetLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FacetLensError>;
