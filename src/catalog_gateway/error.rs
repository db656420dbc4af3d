use thiserror::Error;

/// Errors that can occur while talking to the upstream catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing upstream credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("Upstream rejected the credentials (401)")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),
}
