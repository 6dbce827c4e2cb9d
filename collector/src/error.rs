use std::path::PathBuf;

use shared::ExchangeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    /// Network, rate-limit or payload failure while fetching candles.
    #[error("Fetch failed: {source}")]
    Fetch {
        #[from]
        source: ExchangeError,
    },

    /// Store unreachable or write rejected.
    #[error("Persistence failed: {source}")]
    Persistence {
        #[from]
        source: sea_orm::DbErr,
    },

    #[error("Checkpoint I/O failed for {}: {source}", path.display())]
    CheckpointIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Checkpoint is malformed: {0}")]
    CheckpointFormat(String),

    /// A stop was requested while the loop was waiting.
    #[error("Interrupted by stop request")]
    Interrupted,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CollectorError {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { source } if source.is_rate_limited() => "rate_limited",
            Self::Fetch { .. } => "fetch",
            Self::Persistence { .. } => "persistence",
            Self::CheckpointIo { .. } | Self::CheckpointFormat(_) => "checkpoint",
            Self::Interrupted => "interrupted",
            Self::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::CheckpointFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let limited: CollectorError = ExchangeError::Status {
            status: 429,
            body: "Too many requests".to_string(),
        }
        .into();
        assert_eq!(limited.kind(), "rate_limited");

        let server: CollectorError = ExchangeError::Status {
            status: 502,
            body: String::new(),
        }
        .into();
        assert_eq!(server.kind(), "fetch");

        let db: CollectorError = sea_orm::DbErr::Custom("gone".to_string()).into();
        assert_eq!(db.kind(), "persistence");
        assert_eq!(CollectorError::Interrupted.kind(), "interrupted");
    }
}
