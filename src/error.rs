use thiserror::Error;

/// Failure of one controller operation against the backend API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("empty url")]
    EmptyUrl,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx answer; `message` is the body's `error` field when present
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Server { status: u16, message: Option<String> },
}

impl ApiError {
    /// Text for the error panel: the server's or transport's message, else `default`
    pub fn user_message(&self, default: &str) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            ApiError::Server { .. } | ApiError::EmptyUrl => default.to_string(),
            ApiError::Transport(e) => e.to_string(),
            ApiError::Decode(e) => e.to_string(),
        }
    }
}

/// Failure while saving a finished file to disk
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("file endpoint returned {0}")]
    Status(u16),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
