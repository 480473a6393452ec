use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
