use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Upstream returned HTTP {status} for brand '{brand}' page {page}")]
    Upstream { status: u16, brand: String, page: u32 },
}

pub type Result<T> = std::result::Result<T, SyncError>;
