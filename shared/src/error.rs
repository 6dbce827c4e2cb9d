use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP transport error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// Non-success status; 418/429 are rate-limit bans, 5xx are server side.
    #[error("Exchange returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed exchange payload: {0}")]
    Decode(String),

    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),
}

impl ExchangeError {
    /// Rate-limit rejection (HTTP 418 or 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 418 | 429, .. })
    }
}
