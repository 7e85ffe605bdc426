use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlifError>;

#[derive(Debug, Error)]
pub enum GlifError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by RPC endpoint")]
    RateLimited,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Empty result for {method}({address})")]
    EmptyResult { method: String, address: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GlifError {
    /// Transient failures worth another attempt. Rate limiting always is.
    pub fn is_retryable(&self) -> bool {
        match self {
            GlifError::RateLimited | GlifError::Network(_) => true,
            GlifError::Api { status, .. } => *status >= 500,
            GlifError::Rpc { .. }
            | GlifError::EmptyResult { .. }
            | GlifError::InvalidAddress(_)
            | GlifError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for GlifError {
    fn from(err: reqwest::Error) -> Self {
        GlifError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GlifError {
    fn from(err: serde_json::Error) -> Self {
        GlifError::Parse(err.to_string())
    }
}
