//! Interruptible waits used for rate limiting and backoff

use std::time::Duration;

use async_trait::async_trait;
use shared::Shutdown;

use crate::error::CollectorError;
use crate::Result;

#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`; `Err(Interrupted)` when a stop cut the wait short.
    async fn sleep(&self, duration: Duration) -> Result<()>;
}

/// Real-time sleeper that wakes early on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownSleeper {
    shutdown: Shutdown,
}

impl ShutdownSleeper {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl Sleeper for ShutdownSleeper {
    async fn sleep(&self, duration: Duration) -> Result<()> {
        if self.shutdown.sleep(duration).await {
            Ok(())
        } else {
            Err(CollectorError::Interrupted)
        }
    }
}
