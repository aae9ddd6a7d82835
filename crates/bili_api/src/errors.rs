use thiserror::Error;

#[derive(Error, Debug)]
pub enum BiliApiError {
    #[error("Client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response status: {status}")]
    InvalidResponseStatus { status: reqwest::StatusCode },
    #[error("Security control error")]
    SecurityControl,
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// The platform answered with a non-zero `code`
    #[error("API request error: code {code}, message: {message}")]
    ApiRequest { code: i64, message: String },
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },
    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },
    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },
    #[error("No base urls")]
    NoBaseUrls,
}

impl BiliApiError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BiliApiError::Http(_)
                | BiliApiError::InvalidResponseStatus { .. }
                | BiliApiError::Decode(_)
        )
    }

    /// The platform code carried by an application-level failure.
    pub fn code(&self) -> Option<i64> {
        match self {
            BiliApiError::ApiRequest { code, .. } => Some(*code),
            _ => None,
        }
    }
}
