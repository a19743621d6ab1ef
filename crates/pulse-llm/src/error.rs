use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response had no content")]
    EmptyResponse,

    #[error("missing API key: set {0}")]
    MissingApiKey(String),

    #[error("generation failed: {0}")]
    Other(String),
}
